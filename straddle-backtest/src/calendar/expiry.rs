//! Weekly expiry and strike selection.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rust_decimal::{Decimal, RoundingStrategy};

/// Weekday index options expire on.
pub const EXPIRY_WEEKDAY: Weekday = Weekday::Thu;

/// Next weekly expiry on or after `date`.
pub fn next_weekly_expiry(date: NaiveDate) -> NaiveDate {
    let target = EXPIRY_WEEKDAY.num_days_from_monday() as i64;
    let current = date.weekday().num_days_from_monday() as i64;
    let days_ahead = (target - current).rem_euclid(7);
    date + Duration::days(days_ahead)
}

/// Exchange expiry code, e.g. `25JUL24`.
pub fn expiry_code(date: NaiveDate) -> String {
    date.format("%d%b%y").to_string().to_uppercase()
}

/// Round `price` to the nearest multiple of `step`.
///
/// Exact halves go to the even multiple (24925 -> 24900, 24975 -> 25000).
/// `step` must be non-zero.
pub fn atm_strike(price: Decimal, step: Decimal) -> Decimal {
    (price / step).round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven) * step
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_expiry_on_thursday_is_same_day() {
        let thursday = date(2024, 7, 25);
        assert_eq!(next_weekly_expiry(thursday), thursday);
    }

    #[test]
    fn test_expiry_from_friday_is_six_days_later() {
        let friday = date(2024, 7, 26);
        assert_eq!(next_weekly_expiry(friday), date(2024, 8, 1));
    }

    #[test]
    fn test_expiry_early_week() {
        assert_eq!(next_weekly_expiry(date(2024, 7, 22)), date(2024, 7, 25));
        assert_eq!(next_weekly_expiry(date(2024, 7, 24)), date(2024, 7, 25));
    }

    #[test]
    fn test_expiry_code() {
        assert_eq!(expiry_code(date(2024, 7, 25)), "25JUL24");
        assert_eq!(expiry_code(date(2024, 8, 1)), "01AUG24");
    }

    #[test]
    fn test_atm_strike_rounding() {
        let step = dec!(50);
        assert_eq!(atm_strike(dec!(24937), step), dec!(24950));
        assert_eq!(atm_strike(dec!(24924), step), dec!(24900));
        assert_eq!(atm_strike(dec!(24937.85), step), dec!(24950));
    }

    #[test]
    fn test_atm_strike_half_goes_to_even() {
        let step = dec!(50);
        // 24925 / 50 = 498.5 -> 498
        assert_eq!(atm_strike(dec!(24925), step), dec!(24900));
        // 24975 / 50 = 499.5 -> 500
        assert_eq!(atm_strike(dec!(24975), step), dec!(25000));
    }

    #[test]
    fn test_atm_strike_custom_step() {
        assert_eq!(atm_strike(dec!(51234), dec!(100)), dec!(51200));
    }
}
