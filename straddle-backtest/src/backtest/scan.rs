//! Exit scan over a day's paired call/put candles.
//!
//! Candles are paired by index. Index 0 is the entry bar and is never
//! checked. On each later bar the call leg is checked before the put leg,
//! so when both breach on the same bar the call is reported.

use serde::{Deserialize, Serialize};

use super::leg::{BreachKind, LegState};
use crate::data::Candle;

/// First threshold breach found by the scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breach {
    /// Candle index at which both legs exit.
    pub index: usize,
    pub kind: BreachKind,
}

/// Result of scanning a session for an exit signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanOutcome {
    BreachedCall(Breach),
    BreachedPut(Breach),
    /// Neither leg breached; both exit at their last candle.
    NoBreach,
}

/// Find the first candle where either leg crosses its target or stop.
///
/// Series of different lengths are scanned over their common prefix.
pub fn scan_for_exit(
    call_candles: &[Candle],
    put_candles: &[Candle],
    call: &LegState,
    put: &LegState,
) -> ScanOutcome {
    let common = call_candles.len().min(put_candles.len());

    for index in 1..common {
        if let Some(kind) = call.breach(&call_candles[index]) {
            return ScanOutcome::BreachedCall(Breach { index, kind });
        }
        if let Some(kind) = put.breach(&put_candles[index]) {
            return ScanOutcome::BreachedPut(Breach { index, kind });
        }
    }

    ScanOutcome::NoBreach
}
