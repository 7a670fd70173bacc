//! # Backtest the last 5 trading days with default parameters
//! straddle-backtest
//!
//! # Override run parameters
//! straddle-backtest --days 10 --quantity 50 --stop-loss-pct 0.25 --target-pct 0.6
//!
//! # Load parameters from a file (flags still win)
//! straddle-backtest --config config/banknifty.toml --output results/banknifty.csv
//!
//! Credentials come from `KITE_API_KEY` / `KITE_ACCESS_TOKEN` (or a `.env` file).

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rust_decimal::Decimal;
use tracing::info;

use straddle_backtest::calendar::{exchange_today, previous_trading_days};
use straddle_backtest::config::credentials_from_env;
use straddle_backtest::{BacktestConfig, BacktestEngine, KiteClient};

const SEPARATOR: &str = "==============================";

#[derive(Parser)]
#[command(name = "straddle-backtest")]
#[command(about = "Backtest an intraday ATM index straddle over recent trading days")]
#[command(version)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of past trading days to backtest
    #[arg(short, long)]
    days: Option<usize>,

    /// Units traded per leg
    #[arg(short, long)]
    quantity: Option<u32>,

    /// Stop loss as a fraction of entry premium
    #[arg(long)]
    stop_loss_pct: Option<Decimal>,

    /// Profit target as a fraction of entry premium
    #[arg(long)]
    target_pct: Option<Decimal>,

    /// CSV output path
    #[arg(short, long, default_value = "backtest_results.csv")]
    output: PathBuf,
}

impl Cli {
    fn into_config(self) -> Result<(BacktestConfig, PathBuf)> {
        let mut config = match &self.config {
            Some(path) => BacktestConfig::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => BacktestConfig::default(),
        };

        if let Some(days) = self.days {
            config.days = days;
        }
        if let Some(quantity) = self.quantity {
            config.quantity = quantity;
        }
        if let Some(pct) = self.stop_loss_pct {
            config.stop_loss_pct = pct;
        }
        if let Some(pct) = self.target_pct {
            config.target_pct = pct;
        }

        config.validate().context("Invalid run parameters")?;
        Ok((config, self.output))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("straddle_backtest=info".parse()?),
        )
        .init();

    // A missing .env file is fine; the variables may already be exported
    dotenvy::dotenv().ok();

    let (config, output) = Cli::parse().into_config()?;
    let credentials = credentials_from_env().context("Kite credentials not configured")?;

    let today = exchange_today(config.tz()?);
    let days = previous_trading_days(config.days, today);
    info!(
        from = %days.first().map(|d| d.to_string()).unwrap_or_default(),
        to = %days.last().map(|d| d.to_string()).unwrap_or_default(),
        quantity = config.quantity,
        stop_loss_pct = %config.stop_loss_pct,
        target_pct = %config.target_pct,
        "Starting straddle backtest"
    );

    let client = KiteClient::new(credentials, &config.option_exchange);
    let engine = BacktestEngine::new(config, client)?;

    let report = engine.run(&days).await.context("Backtest aborted")?;

    report
        .write_csv(&output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!("\n{}", SEPARATOR);
    println!("{}", report.summary());
    println!("Results saved to {}", output.display());
    println!("{}", SEPARATOR);

    Ok(())
}
