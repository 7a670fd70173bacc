//! Trading day generation and session bounds.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Current calendar date in the exchange timezone.
pub fn exchange_today(tz: Tz) -> NaiveDate {
    Utc::now().with_timezone(&tz).date_naive()
}

/// Monday through Friday.
pub fn is_weekday(date: NaiveDate) -> bool {
    date.weekday().num_days_from_monday() < 5
}

/// The `n` most recent weekdays strictly before `today`, oldest first.
pub fn previous_trading_days(n: usize, today: NaiveDate) -> Vec<NaiveDate> {
    let mut days = Vec::with_capacity(n);
    let mut current = today;
    while days.len() < n {
        current -= Duration::days(1);
        if is_weekday(current) {
            days.push(current);
        }
    }
    days.reverse();
    days
}

/// Intraday window the backtest trades in, localized to the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionWindow {
    pub from: DateTime<FixedOffset>,
    pub to: DateTime<FixedOffset>,
}

/// Localize `[start, end]` on `date` to the exchange timezone.
///
/// Returns `None` when either bound does not map to a single instant
/// (a DST gap or overlap), which never happens for IST.
pub fn session_window(
    date: NaiveDate,
    start: NaiveTime,
    end: NaiveTime,
    tz: Tz,
) -> Option<SessionWindow> {
    let from = tz.from_local_datetime(&date.and_time(start)).single()?;
    let to = tz.from_local_datetime(&date.and_time(end)).single()?;
    Some(SessionWindow {
        from: from.fixed_offset(),
        to: to.fixed_offset(),
    })
}
