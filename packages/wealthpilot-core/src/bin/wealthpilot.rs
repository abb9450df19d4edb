//! WealthPilot CLI - portfolio analytics from the command line.
//!
//! Prints JSON envelopes on stdout; logs go to stderr.

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use wealthpilot_core::{AnalyticsConfig, AnalyticsEngine, AnalyticsRequest, ApiResponse, Period};

#[derive(Parser)]
#[command(name = "wealthpilot")]
#[command(about = "WealthPilot analytics CLI - portfolio performance and risk")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute analytics for a request file
    Analyze {
        /// JSON file with snapshot, prices, benchmark and optional quotes
        #[arg(short, long)]
        input: PathBuf,
        /// Lookback period (1m, 3m, 6m, ytd, 1y, 3y, 5y, max); overrides the file
        #[arg(short, long)]
        period: Option<Period>,
        /// Configuration file (defaults to $WEALTHPILOT_CONFIG or ~/.wealthpilot/analytics.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Print the effective configuration
    Config {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    // Initialize logging; stdout carries only JSON
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let output = match cli.command {
        Commands::Analyze {
            input,
            period,
            config,
        } => render(analyze(&input, period, config.as_deref())),
        Commands::Config { config } => render(load_config(config.as_deref())),
    };

    match output {
        Ok((json, ok)) => {
            println!("{}", json);
            if ok {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            tracing::error!("Failed to serialize response: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn analyze(
    input: &Path,
    period: Option<Period>,
    config: Option<&Path>,
) -> anyhow::Result<wealthpilot_core::MetricsResult> {
    let engine = AnalyticsEngine::new(load_config(config)?)?;

    let content = fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let mut request: AnalyticsRequest = serde_json::from_str(&content)
        .with_context(|| format!("Invalid request in {}", input.display()))?;
    if let Some(period) = period {
        request.period = period;
    }

    tracing::info!(
        holdings = request.snapshot.holdings.len(),
        period = %request.period,
        "Running analytics"
    );
    Ok(engine.run(&request)?)
}

fn load_config(path: Option<&Path>) -> anyhow::Result<AnalyticsConfig> {
    let config = match path {
        Some(path) => AnalyticsConfig::load_from_path(path),
        None => AnalyticsConfig::load(),
    };
    config.context("Failed to load configuration")
}

/// Wrap a result in the JSON envelope; the flag reports success.
fn render<T: Serialize>(result: anyhow::Result<T>) -> serde_json::Result<(String, bool)> {
    match result {
        Ok(data) => serde_json::to_string_pretty(&ApiResponse::ok(data)).map(|json| (json, true)),
        Err(e) => serde_json::to_string_pretty(&ApiResponse::<()>::err(format!("{:#}", e)))
            .map(|json| (json, false)),
    }
}
