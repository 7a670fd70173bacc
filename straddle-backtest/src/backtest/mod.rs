//! Backtesting engine for intraday option straddles.
//!
//! This module provides:
//! - Leg thresholds (target/stop) and breach detection
//! - The exit scan over paired call/put candles
//! - Day settlement and P&L
//! - The engine driving a run across trading days

pub mod engine;
pub mod leg;
pub mod scan;
pub mod trade;

pub use engine::{BacktestEngine, BacktestError};
pub use leg::{BreachKind, LegResult, LegState};
pub use scan::{scan_for_exit, Breach, ScanOutcome};
pub use trade::{
    settle_day, DayContracts, DayOutcome, DayResult, ExitReason, SkipReason, TradeParams,
};
