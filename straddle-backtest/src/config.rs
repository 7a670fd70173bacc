//! Run configuration.
//!
//! Defaults reproduce the standard weekly NIFTY straddle run: 75 qty,
//! 30% stop, 50% target, last 5 trading days, 09:20-15:15 IST on 5-minute bars.

use std::path::Path;

use chrono::NaiveTime;
use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::KiteCredentials;

/// Environment variables holding the Kite API key, newest name first.
pub const API_KEY_VARS: &[&str] = &["KITE_API_KEY", "API_KEY"];

/// Environment variables holding the Kite access token, newest name first.
pub const ACCESS_TOKEN_VARS: &[&str] = &["KITE_ACCESS_TOKEN", "ACCESS_TOKEN"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),

    #[error("Missing environment variable: {}", .0.join(" or "))]
    MissingEnv(&'static [&'static str]),
}

/// Parameters of a straddle backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    /// Index prefix of option trading symbols.
    pub index_name: String,

    /// Quote symbol used to fetch the index spot price.
    pub index_quote_symbol: String,

    /// Exchange segment listing the index options.
    pub option_exchange: String,

    /// Strike interval of the option chain.
    pub strike_step: Decimal,

    /// Units traded per leg.
    pub quantity: u32,

    /// Stop loss as a fraction of entry (0.30 = exit at 70% of entry).
    pub stop_loss_pct: Decimal,

    /// Profit target as a fraction of entry (0.50 = exit at 150% of entry).
    pub target_pct: Decimal,

    /// Number of past trading days to backtest.
    pub days: usize,

    /// Session start, exchange-local.
    pub session_start: NaiveTime,

    /// Session end, exchange-local.
    pub session_end: NaiveTime,

    /// Candle interval as named by the broker API.
    pub interval: String,

    /// IANA timezone of the exchange.
    pub timezone: String,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            index_name: "NIFTY".to_string(),
            index_quote_symbol: "NSE:NIFTY 50".to_string(),
            option_exchange: "NFO".to_string(),
            strike_step: Decimal::from(50),
            quantity: 75,
            stop_loss_pct: Decimal::new(30, 2),
            target_pct: Decimal::new(50, 2),
            days: 5,
            session_start: NaiveTime::from_hms_opt(9, 20, 0).unwrap_or_default(),
            session_end: NaiveTime::from_hms_opt(15, 15, 0).unwrap_or_default(),
            interval: "5minute".to_string(),
            timezone: "Asia/Kolkata".to_string(),
        }
    }
}

impl BacktestConfig {
    /// Load from a TOML file. Missing keys keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parsed exchange timezone.
    pub fn tz(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse()
            .map_err(|_| ConfigError::UnknownTimezone(self.timezone.clone()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let unit = Decimal::ZERO..Decimal::ONE;
        if !unit.contains(&self.stop_loss_pct) || self.stop_loss_pct.is_zero() {
            return Err(ConfigError::Invalid(format!(
                "stop_loss_pct must be in (0, 1), got {}",
                self.stop_loss_pct
            )));
        }
        if !unit.contains(&self.target_pct) || self.target_pct.is_zero() {
            return Err(ConfigError::Invalid(format!(
                "target_pct must be in (0, 1), got {}",
                self.target_pct
            )));
        }
        if self.strike_step <= Decimal::ZERO {
            return Err(ConfigError::Invalid("strike_step must be positive".to_string()));
        }
        if self.quantity == 0 {
            return Err(ConfigError::Invalid("quantity must be positive".to_string()));
        }
        if self.days == 0 {
            return Err(ConfigError::Invalid("days must be positive".to_string()));
        }
        if self.session_start >= self.session_end {
            return Err(ConfigError::Invalid(format!(
                "session_start {} must be before session_end {}",
                self.session_start, self.session_end
            )));
        }
        self.tz()?;
        Ok(())
    }
}

/// Read Kite credentials from the process environment.
///
/// Call `dotenvy::dotenv()` first to pick up a `.env` file.
pub fn credentials_from_env() -> Result<KiteCredentials, ConfigError> {
    Ok(KiteCredentials {
        api_key: first_env(API_KEY_VARS).ok_or(ConfigError::MissingEnv(API_KEY_VARS))?,
        access_token: first_env(ACCESS_TOKEN_VARS)
            .ok_or(ConfigError::MissingEnv(ACCESS_TOKEN_VARS))?,
    })
}

fn first_env(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|value| !value.trim().is_empty())
}
