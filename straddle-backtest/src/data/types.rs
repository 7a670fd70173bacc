//! Core data types for intraday option backtesting.
//!
//! These types mirror the shapes returned by Kite Connect (instrument dump,
//! historical candles) while using `Decimal` for every price so P&L
//! arithmetic stays exact.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Option type (call or put).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    /// Exchange suffix used in NSE trading symbols.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Call => "CE",
            Self::Put => "PE",
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Numeric instrument identifier assigned by the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstrumentToken(pub u64);

impl fmt::Display for InstrumentToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One OHLC bar.
///
/// Timestamps keep the exchange offset (`+05:30` for NSE) as delivered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<FixedOffset>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: i64,
}

/// A single weekly index option contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionContract {
    /// Index name as it prefixes trading symbols (e.g., "NIFTY")
    pub underlying: String,

    /// Contract expiry date
    pub expiry: NaiveDate,

    /// Strike price
    pub strike: Decimal,

    /// Option type (call or put)
    pub option_type: OptionType,
}

impl OptionContract {
    pub fn new(
        underlying: &str,
        expiry: NaiveDate,
        strike: Decimal,
        option_type: OptionType,
    ) -> Self {
        Self {
            underlying: underlying.to_string(),
            expiry,
            strike,
            option_type,
        }
    }

    /// Trading symbol in `{INDEX}{DDMMMYY}{STRIKE}{CE|PE}` form.
    pub fn trading_symbol(&self) -> String {
        format!(
            "{}{}{}{}",
            self.underlying,
            crate::calendar::expiry_code(self.expiry),
            self.strike.normalize(),
            self.option_type.as_str()
        )
    }
}
