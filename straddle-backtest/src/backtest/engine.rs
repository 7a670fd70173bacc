//! Core backtesting engine.
//!
//! For each trading day:
//! 1. Fetch the index spot price and pick the ATM strike
//! 2. Build the weekly call/put contracts and resolve their instruments
//! 3. Fetch both legs' candles over the session window
//! 4. Settle the straddle (entry, exit scan, P&L)
//!
//! Unknown instruments and empty candle sets skip the day. Any other
//! gateway failure aborts the run.

use chrono::NaiveDate;
use chrono_tz::Tz;
use thiserror::Error;
use tracing::{info, warn};

use super::trade::{settle_day, DayContracts, DayOutcome, SkipReason, TradeParams};
use crate::calendar::{atm_strike, next_weekly_expiry, session_window};
use crate::config::{BacktestConfig, ConfigError};
use crate::data::{GatewayError, InstrumentToken, MarketDataGateway, OptionContract, OptionType};
use crate::report::{money, Report};

/// Errors that abort a backtest run.
#[derive(Error, Debug)]
pub enum BacktestError {
    #[error("Market data error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Session window does not exist on {0} in the exchange timezone")]
    InvalidSession(NaiveDate),
}

/// The straddle backtesting engine.
pub struct BacktestEngine<G> {
    config: BacktestConfig,
    tz: Tz,
    gateway: G,
}

impl<G: MarketDataGateway> BacktestEngine<G> {
    /// Create a new engine. Fails if the configuration is invalid.
    pub fn new(config: BacktestConfig, gateway: G) -> Result<Self, ConfigError> {
        config.validate()?;
        let tz = config.tz()?;
        Ok(Self { config, tz, gateway })
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    fn trade_params(&self) -> TradeParams {
        TradeParams {
            quantity: self.config.quantity,
            stop_loss_pct: self.config.stop_loss_pct,
            target_pct: self.config.target_pct,
        }
    }

    /// Backtest every day in order and collect the results.
    pub async fn run(&self, days: &[NaiveDate]) -> Result<Report, BacktestError> {
        let mut report = Report::new();

        for &date in days {
            match self.run_day(date).await? {
                DayOutcome::Completed(result) => {
                    info!(
                        %date,
                        symbol = %result.call.symbol,
                        entry = %money(result.call.entry),
                        exit = %money(result.call.exit),
                        pnl = %money(result.call.pnl),
                        "CE leg"
                    );
                    info!(
                        %date,
                        symbol = %result.put.symbol,
                        entry = %money(result.put.entry),
                        exit = %money(result.put.exit),
                        pnl = %money(result.put.pnl),
                        "PE leg"
                    );
                    info!(
                        %date,
                        reason = %result.exit_reason,
                        total = %money(result.total_pnl),
                        "Day P&L"
                    );
                    report.push(result);
                }
                DayOutcome::Skipped(reason) => {
                    warn!(%date, %reason, "Skipping day");
                    report.record_skip(date, reason);
                }
            }
        }

        Ok(report)
    }

    /// Backtest a single day.
    pub async fn run_day(&self, date: NaiveDate) -> Result<DayOutcome, BacktestError> {
        info!(%date, "Backtesting day");

        let spot = self.gateway.last_price(&self.config.index_quote_symbol).await?;
        let strike = atm_strike(spot, self.config.strike_step);
        let expiry = next_weekly_expiry(date);

        let symbol = |option_type| {
            OptionContract::new(&self.config.index_name, expiry, strike, option_type)
                .trading_symbol()
        };
        let contracts = DayContracts {
            date,
            strike,
            expiry,
            call_symbol: symbol(OptionType::Call),
            put_symbol: symbol(OptionType::Put),
        };

        let Some(call_token) = self.resolve(&contracts.call_symbol).await? else {
            return Ok(DayOutcome::Skipped(SkipReason::InstrumentNotFound(contracts.call_symbol)));
        };
        let Some(put_token) = self.resolve(&contracts.put_symbol).await? else {
            return Ok(DayOutcome::Skipped(SkipReason::InstrumentNotFound(contracts.put_symbol)));
        };

        let window = session_window(
            date,
            self.config.session_start,
            self.config.session_end,
            self.tz,
        )
        .ok_or(BacktestError::InvalidSession(date))?;

        let (call_candles, put_candles) = tokio::try_join!(
            self.gateway
                .candles(call_token, window.from, window.to, &self.config.interval),
            self.gateway
                .candles(put_token, window.from, window.to, &self.config.interval),
        )?;

        if call_candles.is_empty() {
            return Ok(DayOutcome::Skipped(SkipReason::EmptyDataSet(contracts.call_symbol)));
        }
        if put_candles.is_empty() {
            return Ok(DayOutcome::Skipped(SkipReason::EmptyDataSet(contracts.put_symbol)));
        }
        if call_candles.len() != put_candles.len() {
            warn!(
                %date,
                call = call_candles.len(),
                put = put_candles.len(),
                "Leg candle counts differ; scanning the common range"
            );
        }

        let settled = settle_day(&contracts, &call_candles, &put_candles, self.trade_params());
        let outcome = match settled {
            Some(result) => DayOutcome::Completed(result),
            None => DayOutcome::Skipped(SkipReason::EmptyDataSet(contracts.call_symbol)),
        };
        Ok(outcome)
    }

    /// Resolve a trading symbol, mapping "not found" to `None`.
    async fn resolve(&self, symbol: &str) -> Result<Option<InstrumentToken>, BacktestError> {
        match self.gateway.resolve_instrument(symbol).await {
            Ok(token) => Ok(Some(token)),
            Err(GatewayError::InstrumentNotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backtest::trade::ExitReason;
    use crate::data::Candle;
    use async_trait::async_trait;
    use chrono::{DateTime, Duration, FixedOffset};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;
    use std::sync::Mutex;

    type CandleRequest = (InstrumentToken, DateTime<FixedOffset>, DateTime<FixedOffset>, String);

    /// In-memory gateway keyed by trading symbol.
    struct FakeGateway {
        spot: Decimal,
        tokens: HashMap<String, InstrumentToken>,
        candles: HashMap<(InstrumentToken, NaiveDate), Vec<Candle>>,
        fail_candles: bool,
        requests: Mutex<Vec<CandleRequest>>,
    }

    impl FakeGateway {
        fn new(spot: Decimal) -> Self {
            Self {
                spot,
                tokens: HashMap::new(),
                candles: HashMap::new(),
                fail_candles: false,
                requests: Mutex::new(Vec::new()),
            }
        }

        /// List `symbol` (reusing its token if already listed) with bars for `date`.
        fn with_series(mut self, symbol: &str, date: NaiveDate, bars: Vec<Candle>) -> Self {
            let next = InstrumentToken(self.tokens.len() as u64 + 1);
            let token = *self.tokens.entry(symbol.to_string()).or_insert(next);
            self.candles.insert((token, date), bars);
            self
        }
    }

    #[async_trait]
    impl MarketDataGateway for FakeGateway {
        async fn resolve_instrument(
            &self,
            trading_symbol: &str,
        ) -> Result<InstrumentToken, GatewayError> {
            self.tokens
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
            if self.fail_candles {
                return Err(GatewayError::Api {
                    status: 500,
                    message: "upstream down".to_string(),
                });
            }
            self.requests
                .lock()
                .unwrap()
                .push((token, from, to, interval.to_string()));
            Ok(self
                .candles
                .get(&(token, from.date_naive()))
                .cloned()
                .unwrap_or_default())
        }

        async fn last_price(&self, _symbol: &str) -> Result<Decimal, GatewayError> {
            Ok(self.spot)
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Flat bars at `price`, with a close override on the final bar.
    fn bars(day: NaiveDate, n: usize, price: Decimal, last_close: Decimal) -> Vec<Candle> {
        let start = DateTime::parse_from_rfc3339(&format!("{}T09:20:00+05:30", day)).unwrap();
        (0..n)
            .map(|i| Candle {
                timestamp: start + Duration::minutes(5 * i as i64),
                open: price,
                high: price,
                low: price,
                close: if i + 1 == n { last_close } else { price },
                volume: 10,
            })
            .collect()
    }

    fn engine(gateway: FakeGateway) -> BacktestEngine<FakeGateway> {
        BacktestEngine::new(BacktestConfig::default(), gateway).unwrap()
    }

    #[tokio::test]
    async fn test_run_day_builds_weekly_atm_contracts() {
        let monday = date(2024, 7, 22);
        let gateway = FakeGateway::new(dec!(24937.4))
            .with_series("NIFTY25JUL2424950CE", monday, bars(monday, 4, dec!(100), dec!(110)))
            .with_series("NIFTY25JUL2424950PE", monday, bars(monday, 4, dec!(90), dec!(85)));
        let engine = engine(gateway);

        let outcome = engine.run_day(monday).await.unwrap();
        let DayOutcome::Completed(result) = outcome else {
            panic!("expected a completed day, got {outcome:?}");
        };

        assert_eq!(result.strike, dec!(24950));
        assert_eq!(result.expiry, date(2024, 7, 25));
        assert_eq!(result.exit_reason, ExitReason::TimeExit);
        assert_eq!(result.call.pnl, dec!(750)); // (110 - 100) * 75
        assert_eq!(result.put.pnl, dec!(-375)); // (85 - 90) * 75
        assert_eq!(result.total_pnl, dec!(375));

        let requests = engine.gateway().requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        for (_, from, to, interval) in requests.iter() {
            assert_eq!(from.to_rfc3339(), "2024-07-22T09:20:00+05:30");
            assert_eq!(to.to_rfc3339(), "2024-07-22T15:15:00+05:30");
            assert_eq!(interval, "5minute");
        }
    }

    #[tokio::test]
    async fn test_missing_instrument_skips_day() {
        let monday = date(2024, 7, 22);
        // Only the call is listed
        let gateway = FakeGateway::new(dec!(24950))
            .with_series("NIFTY25JUL2424950CE", monday, bars(monday, 4, dec!(100), dec!(110)));

        let outcome = engine(gateway).run_day(monday).await.unwrap();
        assert_eq!(
            outcome,
            DayOutcome::Skipped(SkipReason::InstrumentNotFound("NIFTY25JUL2424950PE".to_string()))
        );
    }

    #[tokio::test]
    async fn test_empty_candles_skip_day() {
        let monday = date(2024, 7, 22);
        let gateway = FakeGateway::new(dec!(24950))
            .with_series("NIFTY25JUL2424950CE", monday, Vec::new())
            .with_series("NIFTY25JUL2424950PE", monday, bars(monday, 4, dec!(90), dec!(85)));

        let outcome = engine(gateway).run_day(monday).await.unwrap();
        assert_eq!(
            outcome,
            DayOutcome::Skipped(SkipReason::EmptyDataSet("NIFTY25JUL2424950CE".to_string()))
        );
    }

    #[tokio::test]
    async fn test_gateway_failure_is_fatal() {
        let monday = date(2024, 7, 22);
        let mut gateway = FakeGateway::new(dec!(24950))
            .with_series("NIFTY25JUL2424950CE", monday, bars(monday, 4, dec!(100), dec!(110)))
            .with_series("NIFTY25JUL2424950PE", monday, bars(monday, 4, dec!(90), dec!(85)));
        gateway.fail_candles = true;

        let err = engine(gateway).run(&[monday]).await.unwrap_err();
        assert!(matches!(err, BacktestError::Gateway(GatewayError::Api { status: 500, .. })));
    }

    #[tokio::test]
    async fn test_run_collects_completed_days_and_skips() {
        let days: Vec<NaiveDate> = crate::calendar::previous_trading_days(5, date(2024, 7, 29));
        let mut gateway = FakeGateway::new(dec!(24950));

        // Wednesday returns no candles; every other day trades
        for (i, &day) in days.iter().enumerate() {
            let expiry = crate::calendar::expiry_code(next_weekly_expiry(day));
            let (call_bars, put_bars) = if day == date(2024, 7, 24) {
                (Vec::new(), Vec::new())
            } else {
                let close = Decimal::from(100 + i as i64 * 5);
                (bars(day, 6, dec!(100), close), bars(day, 6, dec!(100), dec!(95)))
            };
            gateway = gateway
                .with_series(&format!("NIFTY{expiry}24950CE"), day, call_bars)
                .with_series(&format!("NIFTY{expiry}24950PE"), day, put_bars);
        }

        let report = engine(gateway).run(&days).await.unwrap();

        assert_eq!(report.results().len(), 4);
        assert_eq!(report.skipped().len(), 1);
        assert_eq!(report.skipped()[0].0, date(2024, 7, 24));

        let column_sum: Decimal = report.results().iter().map(|r| r.total_pnl).sum();
        assert_eq!(report.total_pnl(), column_sum);
        assert!(report.results().windows(2).all(|w| w[0].date < w[1].date));
    }

    #[tokio::test]
    async fn test_exported_rows_sum_to_printed_total() {
        let days = [date(2024, 7, 22), date(2024, 7, 23)];
        let mut gateway = FakeGateway::new(dec!(24950));
        for &day in &days {
            // Call gains 0.0001 per unit: 0.0075 for the day at 75 qty
            gateway = gateway
                .with_series(
                    "NIFTY25JUL2424950CE",
                    day,
                    bars(day, 4, dec!(100), dec!(100.0001)),
                )
                .with_series("NIFTY25JUL2424950PE", day, bars(day, 4, dec!(90), dec!(90)));
        }

        let report = engine(gateway).run(&days).await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backtest_results.csv");
        report.write_csv(&path).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let totals: Vec<String> = reader
            .records()
            .map(|row| row.unwrap()[9].to_string())
            .collect();
        assert_eq!(totals, vec!["0.01", "0.01"]);

        let column_sum: Decimal = totals.iter().map(|t| t.parse::<Decimal>().unwrap()).sum();
        assert_eq!(column_sum, dec!(0.02));
        assert!(report
            .summary()
            .contains(&format!("2-Day Total P&L: ₹{}", crate::report::money(column_sum))));
    }

    #[test]
    fn test_engine_rejects_invalid_config() {
        let config = BacktestConfig {
            quantity: 0,
            ..Default::default()
        };
        assert!(BacktestEngine::new(config, FakeGateway::new(dec!(1))).is_err());
    }
}
