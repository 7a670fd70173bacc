//! Per-leg entry, thresholds and realized P&L.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::data::Candle;

/// Which threshold a candle crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BreachKind {
    /// High reached the profit target.
    Target,
    /// Low reached the stop.
    Stop,
}

/// Entry price and exit thresholds for one option leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegState {
    pub entry: Decimal,
    pub target: Decimal,
    pub stop: Decimal,
}

impl LegState {
    /// `target = entry * (1 + target_pct)`, `stop = entry * (1 - stop_pct)`.
    pub fn new(entry: Decimal, target_pct: Decimal, stop_pct: Decimal) -> Self {
        Self {
            entry,
            target: entry * (Decimal::ONE + target_pct),
            stop: entry * (Decimal::ONE - stop_pct),
        }
    }

    /// Threshold crossed by `candle`, if any. Target is checked first.
    pub fn breach(&self, candle: &Candle) -> Option<BreachKind> {
        if candle.high >= self.target {
            Some(BreachKind::Target)
        } else if candle.low <= self.stop {
            Some(BreachKind::Stop)
        } else {
            None
        }
    }
}

/// Realized outcome of one leg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegResult {
    pub symbol: String,
    pub entry: Decimal,
    pub exit: Decimal,
    pub pnl: Decimal,
}

impl LegResult {
    /// P&L = (exit - entry) * quantity.
    pub fn new(symbol: &str, entry: Decimal, exit: Decimal, quantity: u32) -> Self {
        Self {
            symbol: symbol.to_string(),
            entry,
            exit,
            pnl: (exit - entry) * Decimal::from(quantity),
        }
    }
}
