//! Market data provider seam.

use super::cache::TimedCache;
use crate::config::AnalyticsConfig;
use crate::types::{PriceSeries, Quote};
use crate::{Error, Result};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Source of current quotes and daily price histories.
///
/// Fallback across several upstream sources belongs in the implementation;
/// callers only see a result per symbol.
pub trait MarketDataProvider {
    /// Current quote for `symbol`.
    fn quote(&self, symbol: &str) -> Result<Quote>;

    /// Up to `days` most recent daily prices for `symbol`.
    fn history(&self, symbol: &str, days: usize) -> Result<PriceSeries>;
}

/// In-memory provider over fixed quotes and histories.
#[derive(Debug, Clone, Default)]
pub struct StaticProvider {
    quotes: HashMap<String, Quote>,
    histories: HashMap<String, PriceSeries>,
}

impl StaticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quote(mut self, quote: Quote) -> Self {
        self.quotes.insert(quote.symbol.to_uppercase(), quote);
        self
    }

    pub fn with_history(mut self, symbol: &str, series: PriceSeries) -> Self {
        self.histories.insert(symbol.to_uppercase(), series);
        self
    }
}

impl MarketDataProvider for StaticProvider {
    fn quote(&self, symbol: &str) -> Result<Quote> {
        self.quotes
            .get(&symbol.to_uppercase())
            .cloned()
            .ok_or_else(|| Error::MissingSymbolData(symbol.to_string()))
    }

    fn history(&self, symbol: &str, days: usize) -> Result<PriceSeries> {
        let series = self
            .histories
            .get(&symbol.to_uppercase())
            .ok_or_else(|| Error::MissingSymbolData(symbol.to_string()))?;

        let points = series.points();
        let start = points.len().saturating_sub(days);
        Ok(PriceSeries::new(points[start..].to_vec()))
    }
}

/// Provider decorator that serves repeated requests from timed caches.
///
/// Failures are not cached.
#[derive(Debug)]
pub struct CachedProvider<P> {
    inner: P,
    quotes: Mutex<TimedCache<String, Quote>>,
    histories: Mutex<TimedCache<(String, usize), PriceSeries>>,
}

impl<P: MarketDataProvider> CachedProvider<P> {
    /// Wrap `inner` with fresh caches expiring after `ttl_minutes`.
    pub fn new(inner: P, ttl_minutes: i64) -> Self {
        Self::with_caches(
            inner,
            TimedCache::with_ttl_minutes(ttl_minutes),
            TimedCache::with_ttl_minutes(ttl_minutes),
        )
    }

    /// Wrap `inner` using the configured cache lifetime.
    pub fn from_config(inner: P, config: &AnalyticsConfig) -> Self {
        Self::new(inner, config.cache_ttl_minutes)
    }

    /// Wrap `inner` with caches owned by the caller.
    pub fn with_caches(
        inner: P,
        quotes: TimedCache<String, Quote>,
        histories: TimedCache<(String, usize), PriceSeries>,
    ) -> Self {
        Self {
            inner,
            quotes: Mutex::new(quotes),
            histories: Mutex::new(histories),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<P: MarketDataProvider> MarketDataProvider for CachedProvider<P> {
    fn quote(&self, symbol: &str) -> Result<Quote> {
        let key = symbol.to_uppercase();
        if let Some(quote) = lock(&self.quotes).get(&key, Utc::now()) {
            tracing::trace!(symbol = %key, "Quote cache hit");
            return Ok(quote.clone());
        }

        let quote = self.inner.quote(&key)?;
        lock(&self.quotes).insert(key, quote.clone(), Utc::now());
        Ok(quote)
    }

    fn history(&self, symbol: &str, days: usize) -> Result<PriceSeries> {
        let key = (symbol.to_uppercase(), days);
        if let Some(series) = lock(&self.histories).get(&key, Utc::now()) {
            tracing::trace!(symbol = %key.0, days, "History cache hit");
            return Ok(series.clone());
        }

        let series = self.inner.history(&key.0, days)?;
        lock(&self.histories).insert(key, series.clone(), Utc::now());
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProvider {
        inner: StaticProvider,
        calls: AtomicUsize,
    }

    impl MarketDataProvider for CountingProvider {
        fn quote(&self, symbol: &str) -> Result<Quote> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.quote(symbol)
        }

        fn history(&self, symbol: &str, days: usize) -> Result<PriceSeries> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.history(symbol, days)
        }
    }

    fn closes() -> PriceSeries {
        PriceSeries::from_closes(
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            &[10.0, 11.0, 12.0, 13.0, 14.0],
        )
    }

    #[test]
    fn test_static_provider() {
        let provider = StaticProvider::new()
            .with_quote(Quote::new("aapl", 175.0, 170.0))
            .with_history("AAPL", closes());

        assert_eq!(provider.quote("AAPL").unwrap().price, 175.0);
        assert_eq!(provider.history("aapl", 3).unwrap().len(), 3);
        assert_eq!(provider.history("AAPL", 100).unwrap().len(), 5);
        assert!(matches!(provider.quote("MSFT"), Err(Error::MissingSymbolData(_))));
    }

    #[test]
    fn test_cached_provider_reuses_results() {
        let provider = CachedProvider::new(
            CountingProvider {
                inner: StaticProvider::new()
                    .with_quote(Quote::new("AAPL", 175.0, 170.0))
                    .with_history("AAPL", closes()),
                calls: AtomicUsize::new(0),
            },
            15,
        );

        provider.quote("AAPL").unwrap();
        provider.quote("aapl").unwrap();
        provider.history("AAPL", 5).unwrap();
        provider.history("AAPL", 5).unwrap();
        assert_eq!(provider.inner().calls.load(Ordering::SeqCst), 2);

        // Different window is a different key
        provider.history("AAPL", 3).unwrap();
        assert_eq!(provider.inner().calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_cached_provider_does_not_cache_failures() {
        let provider = CachedProvider::new(
            CountingProvider {
                inner: StaticProvider::new(),
                calls: AtomicUsize::new(0),
            },
            15,
        );

        assert!(provider.quote("MSFT").is_err());
        assert!(provider.quote("MSFT").is_err());
        assert_eq!(provider.inner().calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_zero_ttl_always_refetches() {
        let provider = CachedProvider::new(
            CountingProvider {
                inner: StaticProvider::new().with_quote(Quote::new("AAPL", 1.0, 1.0)),
                calls: AtomicUsize::new(0),
            },
            0,
        );

        provider.quote("AAPL").unwrap();
        provider.quote("AAPL").unwrap();
        assert_eq!(provider.inner().calls.load(Ordering::SeqCst), 2);
    }
}
