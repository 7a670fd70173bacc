//! Kite Connect REST client for historical option data.
//!
//! Endpoints used:
//! - `GET /instruments/{exchange}`: CSV dump of every tradable instrument
//! - `GET /instruments/historical/{token}/{interval}`: OHLC candles
//! - `GET /quote/ltp?i={symbol}`: last traded price
//!
//! The instrument dump is several megabytes, so it is downloaded once per
//! client and cached.

use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::debug;

use super::gateway::{GatewayError, MarketDataGateway};
use super::types::{Candle, InstrumentToken};

/// Kite Connect API base URL.
pub const BASE_URL: &str = "https://api.kite.trade";

const KITE_VERSION: &str = "3";

/// Candle timestamps, e.g. `2024-07-25T09:20:00+0530`.
const CANDLE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

/// `from`/`to` query parameters, in exchange-local time.
const QUERY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// API key and session token for a logged-in Kite user.
#[derive(Debug, Clone)]
pub struct KiteCredentials {
    pub api_key: String,
    pub access_token: String,
}

/// Kite wraps every JSON response in `{"status": .., "data": ..}`.
#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    status: String,
    data: Option<T>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HistoricalData {
    candles: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct LtpQuote {
    last_price: serde_json::Number,
}

/// One row of the instrument dump. Columns not listed here are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct InstrumentRecord {
    pub instrument_token: u64,
    pub tradingsymbol: String,
}

/// Kite Connect API client.
pub struct KiteClient {
    client: Client,
    credentials: KiteCredentials,
    base_url: String,
    exchange: String,
    instruments: OnceCell<HashMap<String, InstrumentToken>>,
}

impl KiteClient {
    /// Create a client against the production API for the given derivatives exchange.
    pub fn new(credentials: KiteCredentials, exchange: &str) -> Self {
        Self::with_base_url(credentials, exchange, BASE_URL)
    }

    /// Create a client against a different host (sandbox, local mock).
    pub fn with_base_url(credentials: KiteCredentials, exchange: &str, base_url: &str) -> Self {
        Self {
            client: Client::new(),
            credentials,
            base_url: base_url.trim_end_matches('/').to_string(),
            exchange: exchange.to_string(),
            instruments: OnceCell::new(),
        }
    }

    fn auth_header(&self) -> String {
        format!(
            "token {}:{}",
            self.credentials.api_key, self.credentials.access_token
        )
    }

    async fn get_text(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<String, GatewayError> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .get(&url)
            .header(AUTHORIZATION, self.auth_header())
            .header("X-Kite-Version", KITE_VERSION)
            .query(params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiEnvelope<serde_json::Value>>(&body)
                .ok()
                .and_then(|e| match (e.error_type, e.message) {
                    (Some(kind), Some(msg)) => Some(format!("{}: {}", kind, msg)),
                    (None, Some(msg)) => Some(msg),
                    _ => None,
                })
                .unwrap_or(body);
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(body)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, GatewayError> {
        let body = self.get_text(path, params).await?;

        let envelope: ApiEnvelope<T> = serde_json::from_str(&body).map_err(|e| {
            GatewayError::InvalidResponse(format!("Failed to parse response: {}", e))
        })?;

        if envelope.status != "success" {
            return Err(GatewayError::Api {
                status: 200,
                message: envelope
                    .message
                    .unwrap_or_else(|| format!("status {}", envelope.status)),
            });
        }

        envelope
            .data
            .ok_or_else(|| GatewayError::InvalidResponse("Missing data field".to_string()))
    }

    /// Download and parse the instrument dump for the configured exchange.
    pub async fn fetch_instruments(&self) -> Result<Vec<InstrumentRecord>, GatewayError> {
        let path = format!("/instruments/{}", self.exchange);
        let body = self.get_text(&path, &[]).await?;
        parse_instruments(&body)
    }

    async fn instrument_index(&self) -> Result<&HashMap<String, InstrumentToken>, GatewayError> {
        self.instruments
            .get_or_try_init(|| async {
                let records = self.fetch_instruments().await?;
                debug!(
                    exchange = %self.exchange,
                    count = records.len(),
                    "Loaded instrument dump"
                );
                Ok::<_, GatewayError>(
                    records
                        .into_iter()
                        .map(|r| (r.tradingsymbol, InstrumentToken(r.instrument_token)))
                        .collect(),
                )
            })
            .await
    }
}

#[async_trait]
impl MarketDataGateway for KiteClient {
    async fn resolve_instrument(
        &self,
        trading_symbol: &str,
    ) -> Result<InstrumentToken, GatewayError> {
        self.instrument_index()
            .await?
            .get(trading_symbol)
            .copied()
            .ok_or_else(|| GatewayError::InstrumentNotFound(trading_symbol.to_string()))
    }

    async fn candles(
        &self,
        token: InstrumentToken,
        from: DateTime<FixedOffset>,
        to: DateTime<FixedOffset>,
        interval: &str,
    ) -> Result<Vec<Candle>, GatewayError> {
        let path = format!("/instruments/historical/{}/{}", token, interval);
        let params = vec![
            ("from", from.format(QUERY_TIME_FORMAT).to_string()),
            ("to", to.format(QUERY_TIME_FORMAT).to_string()),
        ];

        let data: HistoricalData = self.get_json(&path, &params).await?;
        data.candles.iter().map(|row| parse_candle(row)).collect()
    }

    async fn last_price(&self, symbol: &str) -> Result<Decimal, GatewayError> {
        let params = vec![("i", symbol.to_string())];
        let quotes: HashMap<String, LtpQuote> = self.get_json("/quote/ltp", &params).await?;

        let quote = quotes.get(symbol).ok_or_else(|| {
            GatewayError::InvalidResponse(format!("No quote returned for {}", symbol))
        })?;
        number_to_decimal(&quote.last_price)
    }
}

/// Parse the CSV instrument dump.
pub fn parse_instruments(body: &str) -> Result<Vec<InstrumentRecord>, GatewayError> {
    let mut reader = csv::Reader::from_reader(body.as_bytes());
    reader
        .deserialize()
        .collect::<Result<Vec<InstrumentRecord>, _>>()
        .map_err(|e| GatewayError::InvalidResponse(format!("Bad instrument dump: {}", e)))
}

/// Parse one `[timestamp, open, high, low, close, volume, (oi)]` row.
fn parse_candle(row: &[serde_json::Value]) -> Result<Candle, GatewayError> {
    if row.len() < 5 {
        return Err(GatewayError::InvalidResponse(format!(
            "Candle row has {} fields, expected at least 5",
            row.len()
        )));
    }

    let raw_ts = row[0].as_str().ok_or_else(|| {
        GatewayError::InvalidResponse("Candle timestamp is not a string".to_string())
    })?;
    let timestamp = DateTime::parse_from_str(raw_ts, CANDLE_TIME_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc3339(raw_ts))
        .map_err(|e| {
            GatewayError::InvalidResponse(format!("Bad candle timestamp {}: {}", raw_ts, e))
        })?;

    let price = |idx: usize| -> Result<Decimal, GatewayError> {
        match &row[idx] {
            serde_json::Value::Number(n) => number_to_decimal(n),
            other => Err(GatewayError::InvalidResponse(format!(
                "Candle field {} is not a number: {}",
                idx, other
            ))),
        }
    };

    Ok(Candle {
        timestamp,
        open: price(1)?,
        high: price(2)?,
        low: price(3)?,
        close: price(4)?,
        volume: row.get(5).and_then(|v| v.as_i64()).unwrap_or(0),
    })
}

/// Convert a JSON number without going through `f64`.
fn number_to_decimal(n: &serde_json::Number) -> Result<Decimal, GatewayError> {
    let text = n.to_string();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|e| GatewayError::InvalidResponse(format!("Bad price {}: {}", text, e)))
}
