//! Row-per-day CSV export.

use std::io::Write;
use std::path::Path;

use super::{money, Report, ReportError};
use crate::backtest::DayResult;

pub const CSV_HEADERS: [&str; 10] = [
    "Date",
    "ATM Strike",
    "Expiry",
    "CE Entry",
    "CE Exit",
    "PE Entry",
    "PE Exit",
    "CE P&L",
    "PE P&L",
    "Total P&L",
];

fn record(result: &DayResult) -> [String; 10] {
    [
        result.date.format("%Y-%m-%d").to_string(),
        result.strike.normalize().to_string(),
        result.expiry_code(),
        money(result.call.entry).to_string(),
        money(result.call.exit).to_string(),
        money(result.put.entry).to_string(),
        money(result.put.exit).to_string(),
        money(result.call.pnl).to_string(),
        money(result.put.pnl).to_string(),
        money(result.total_pnl).to_string(),
    ]
}

impl Report {
    /// Write the report to `path`, replacing any existing file.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<(), ReportError> {
        let file = std::fs::File::create(path)?;
        self.write_csv_to(file)
    }

    /// Write the report as CSV to any writer.
    pub fn write_csv_to<W: Write>(&self, writer: W) -> Result<(), ReportError> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(CSV_HEADERS)?;
        for result in self.results() {
            wtr.write_record(record(result))?;
        }
        wtr.flush()?;
        Ok(())
    }
}
