//! Run report.
//!
//! Collects settled days in day order, tracks skipped days, and renders
//! the CSV export and console summary.

pub mod csv_export;

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

use crate::backtest::{DayResult, SkipReason};

pub use csv_export::CSV_HEADERS;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Round a rupee amount to paise (half-to-even) with a fixed two-digit scale.
///
/// Every amount shown to the user goes through here so the CSV, the
/// summary and the logs agree.
pub fn money(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven);
    rounded.rescale(2);
    rounded
}

/// Aggregated results of a backtest run.
#[derive(Debug, Clone, Default)]
pub struct Report {
    results: Vec<DayResult>,
    skipped: Vec<(NaiveDate, SkipReason)>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, result: DayResult) {
        self.results.push(result);
    }

    pub fn record_skip(&mut self, date: NaiveDate, reason: SkipReason) {
        self.skipped.push((date, reason));
    }

    /// Settled days, in the order they were run.
    pub fn results(&self) -> &[DayResult] {
        &self.results
    }

    pub fn skipped(&self) -> &[(NaiveDate, SkipReason)] {
        &self.skipped
    }

    /// Sum of every day's total P&L.
    pub fn total_pnl(&self) -> Decimal {
        self.results.iter().map(|r| r.total_pnl).sum()
    }

    /// Sum of the day totals as exported, each rounded to paise.
    ///
    /// Equals the sum of the CSV `Total P&L` column.
    pub fn reported_total_pnl(&self) -> Decimal {
        self.results.iter().map(|r| money(r.total_pnl)).sum()
    }

    pub fn winning_days(&self) -> usize {
        self.results.iter().filter(|r| r.is_winner()).count()
    }

    pub fn losing_days(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.total_pnl < Decimal::ZERO)
            .count()
    }

    /// Days closed at exactly zero P&L.
    pub fn flat_days(&self) -> usize {
        self.results.len() - self.winning_days() - self.losing_days()
    }

    /// Fraction of settled days with positive P&L.
    pub fn win_rate(&self) -> f64 {
        if self.results.is_empty() {
            return 0.0;
        }
        self.winning_days() as f64 / self.results.len() as f64
    }

    pub fn best_day(&self) -> Option<&DayResult> {
        self.results.iter().max_by_key(|r| r.total_pnl)
    }

    pub fn worst_day(&self) -> Option<&DayResult> {
        self.results.iter().min_by_key(|r| r.total_pnl)
    }

    /// Generate summary string.
    pub fn summary(&self) -> String {
        let day_line = |day: Option<&DayResult>| match day {
            Some(r) => format!("{} (₹{})", r.date, money(r.total_pnl)),
            None => "-".to_string(),
        };

        format!(
            "Straddle Backtest Summary\n\
             ==============================\n\
             Days traded: {} (W: {}, L: {}, Flat: {})\n\
             Days skipped: {}\n\
             Win Rate: {:.1}%\n\
             Best Day: {}\n\
             Worst Day: {}\n\
             \n\
             {}-Day Total P&L: ₹{}",
            self.results.len(),
            self.winning_days(),
            self.losing_days(),
            self.flat_days(),
            self.skipped.len(),
            self.win_rate() * 100.0,
            day_line(self.best_day()),
            day_line(self.worst_day()),
            self.results.len() + self.skipped.len(),
            money(self.reported_total_pnl()),
        )
    }
}
