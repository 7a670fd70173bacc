//! Market data gateway abstraction.
//!
//! The backtest engine only talks to the broker through this trait so it can
//! run against a recorded or synthetic feed in tests.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;
use thiserror::Error;

use super::types::{Candle, InstrumentToken};

/// Market data gateway errors.
///
/// Only `InstrumentNotFound` is expected during a normal run; the engine
/// treats every other variant as fatal.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Instrument not found: {0}")]
    InstrumentNotFound(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Source of instruments, candles and quotes.
#[async_trait]
pub trait MarketDataGateway: Send + Sync {
    /// Resolve a trading symbol to the broker's instrument token.
    async fn resolve_instrument(
        &self,
        trading_symbol: &str,
    ) -> Result<InstrumentToken, GatewayError>;

    /// Time-ordered candles in `[from, to]`. Empty means no data.
    async fn candles(
        &self,
        token: InstrumentToken,
        from: DateTime<FixedOffset>,
        to: DateTime<FixedOffset>,
        interval: &str,
    ) -> Result<Vec<Candle>, GatewayError>;

    /// Latest traded price of an index or instrument (e.g., "NSE:NIFTY 50").
    async fn last_price(&self, symbol: &str) -> Result<Decimal, GatewayError>;
}
