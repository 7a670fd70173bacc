//! Straddle trade lifecycle for a single session.
//!
//! Handles:
//! - Entry at the first candle's open on both legs
//! - Exit on the first threshold breach, or at the session's last candle
//! - Per-leg and total P&L

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::leg::{BreachKind, LegResult, LegState};
use super::scan::{scan_for_exit, ScanOutcome};
use crate::calendar::expiry_code;
use crate::data::Candle;

/// Reason both legs were closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    /// Call leg hit its profit target.
    CallTarget,
    /// Call leg hit its stop.
    CallStop,
    /// Put leg hit its profit target.
    PutTarget,
    /// Put leg hit its stop.
    PutStop,
    /// No breach; closed at the session's last candle.
    TimeExit,
}

impl ExitReason {
    pub fn from_scan(outcome: &ScanOutcome) -> Self {
        match outcome {
            ScanOutcome::BreachedCall(b) => match b.kind {
                BreachKind::Target => Self::CallTarget,
                BreachKind::Stop => Self::CallStop,
            },
            ScanOutcome::BreachedPut(b) => match b.kind {
                BreachKind::Target => Self::PutTarget,
                BreachKind::Stop => Self::PutStop,
            },
            ScanOutcome::NoBreach => Self::TimeExit,
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::CallTarget => "CE target",
            Self::CallStop => "CE stop",
            Self::PutTarget => "PE target",
            Self::PutStop => "PE stop",
            Self::TimeExit => "time exit",
        };
        f.write_str(s)
    }
}

/// Contracts traded on one day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayContracts {
    pub date: NaiveDate,
    pub strike: Decimal,
    pub expiry: NaiveDate,
    pub call_symbol: String,
    pub put_symbol: String,
}

/// Parameters applied to every leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradeParams {
    pub quantity: u32,
    pub stop_loss_pct: Decimal,
    pub target_pct: Decimal,
}

/// Outcome of one backtested day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayResult {
    pub date: NaiveDate,
    pub strike: Decimal,
    pub expiry: NaiveDate,
    pub call: LegResult,
    pub put: LegResult,
    pub total_pnl: Decimal,
    pub exit_reason: ExitReason,
    pub exit_time: DateTime<FixedOffset>,
}

impl DayResult {
    /// Expiry in exchange code form, e.g. `25JUL24`.
    pub fn expiry_code(&self) -> String {
        expiry_code(self.expiry)
    }

    pub fn is_winner(&self) -> bool {
        self.total_pnl > Decimal::ZERO
    }
}

/// Why a day produced no result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The broker lists no instrument with this trading symbol.
    InstrumentNotFound(String),
    /// No candles in the session window for this trading symbol.
    EmptyDataSet(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InstrumentNotFound(symbol) => write!(f, "instrument not found: {}", symbol),
            Self::EmptyDataSet(symbol) => write!(f, "no option data for {}", symbol),
        }
    }
}

/// Result of `run_day`: a settled trade, or a recoverable skip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DayOutcome {
    Completed(DayResult),
    Skipped(SkipReason),
}

/// Enter both legs at the first open, scan for an exit and realize P&L.
///
/// Returns `None` if either series is empty.
pub fn settle_day(
    contracts: &DayContracts,
    call_candles: &[Candle],
    put_candles: &[Candle],
    params: TradeParams,
) -> Option<DayResult> {
    let call_first = call_candles.first()?;
    let put_first = put_candles.first()?;
    let call_last = call_candles.last()?;
    let put_last = put_candles.last()?;

    let call_leg = LegState::new(call_first.open, params.target_pct, params.stop_loss_pct);
    let put_leg = LegState::new(put_first.open, params.target_pct, params.stop_loss_pct);

    let outcome = scan_for_exit(call_candles, put_candles, &call_leg, &put_leg);

    let (call_exit, put_exit, exit_time) = match outcome {
        ScanOutcome::BreachedCall(b) | ScanOutcome::BreachedPut(b) => (
            call_candles[b.index].close,
            put_candles[b.index].close,
            call_candles[b.index].timestamp,
        ),
        ScanOutcome::NoBreach => (
            call_last.close,
            put_last.close,
            call_last.timestamp.max(put_last.timestamp),
        ),
    };

    let call = LegResult::new(&contracts.call_symbol, call_leg.entry, call_exit, params.quantity);
    let put = LegResult::new(&contracts.put_symbol, put_leg.entry, put_exit, params.quantity);
    let total_pnl = call.pnl + put.pnl;

    Some(DayResult {
        date: contracts.date,
        strike: contracts.strike,
        expiry: contracts.expiry,
        call,
        put,
        total_pnl,
        exit_reason: ExitReason::from_scan(&outcome),
        exit_time,
    })
}
