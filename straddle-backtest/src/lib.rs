pub mod backtest;
pub mod calendar;
pub mod config;
pub mod data;
pub mod report;

// Re-export commonly used types
pub use backtest::{
    BacktestEngine, BacktestError, DayOutcome, DayResult, ExitReason, ScanOutcome, SkipReason,
};
pub use calendar::{atm_strike, next_weekly_expiry, previous_trading_days};
pub use config::{BacktestConfig, ConfigError};
pub use data::{Candle, GatewayError, KiteClient, KiteCredentials, MarketDataGateway};
pub use report::{Report, ReportError};
