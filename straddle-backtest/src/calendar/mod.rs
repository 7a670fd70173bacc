//! Trading calendar and contract-selection helpers.
//!
//! Pure functions of (date, price). Exchange holidays are not modelled:
//! a weekday the exchange was closed still counts as a trading day.

pub mod expiry;
pub mod trading_days;

pub use expiry::{atm_strike, expiry_code, next_weekly_expiry};
pub use trading_days::{
    exchange_today, is_weekday, previous_trading_days, session_window, SessionWindow,
};
