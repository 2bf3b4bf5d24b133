//! Scripted in-memory `PriceHistorySource` and series builders for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{Days, NaiveDate};

use super::{DailyBar, PriceHistorySource, SourceError, SymbolSeries};
use crate::types::MarketId;

/// Build a series with one bar per calendar day ending on 2024-06-28 and a
/// constant volume.
pub fn series_from(closes: &[f64], volume: f64) -> SymbolSeries {
    let end = NaiveDate::from_ymd_opt(2024, 6, 28).unwrap();
    let volumes = vec![volume; closes.len()];
    SymbolSeries::new("TEST", bars_ending(end, closes, &volumes)).unwrap()
}

/// Bars for consecutive calendar days, the last one dated `end`.
pub fn bars_ending(end: NaiveDate, closes: &[f64], volumes: &[f64]) -> Vec<DailyBar> {
    let n = closes.len() as u64;
    closes
        .iter()
        .zip(volumes)
        .enumerate()
        .map(|(i, (&close, &volume))| DailyBar {
            date: end - Days::new(n - 1 - i as u64),
            close,
            volume: volume as u64,
        })
        .collect()
}

/// Linear ramp `start + step * i` for `n` bars.
pub fn ramp(start: f64, step: f64, n: usize) -> Vec<f64> {
    (0..n).map(|i| start + step * i as f64).collect()
}

/// Fifty bars falling 100 per bar from 20 000, then one rebound bar to
/// 15 400. MACD(12, 26, 9) crosses above its signal on that last bar.
pub fn closes_crossing_on_last_bar() -> Vec<f64> {
    let mut closes = ramp(20_000.0, -100.0, 50);
    closes.push(15_400.0);
    closes
}

/// Scripted behaviour of one ticker.
#[derive(Debug, Clone)]
pub struct FixtureSymbol {
    pub name: Option<String>,
    pub closes: Vec<f64>,
    pub volumes: Vec<f64>,
    pub history_error: Option<SourceError>,
}

impl FixtureSymbol {
    pub fn new(name: &str, closes: Vec<f64>, volume: f64) -> Self {
        let volumes = vec![volume; closes.len()];
        Self {
            name: Some(name.to_string()),
            closes,
            volumes,
            history_error: None,
        }
    }

    pub fn without_name(mut self) -> Self {
        self.name = None;
        self
    }

    pub fn failing_history(mut self, err: SourceError) -> Self {
        self.history_error = Some(err);
        self
    }
}

/// In-memory source with failure injection and call counters.
pub struct ScriptedSource {
    universe: Vec<String>,
    symbols: HashMap<String, FixtureSymbol>,
    /// `list_symbols` fails this many times before succeeding.
    list_failures: usize,
    trading_day: Option<NaiveDate>,
    pub list_calls: AtomicUsize,
    pub history_calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self {
            universe: Vec::new(),
            symbols: HashMap::new(),
            list_failures: 0,
            trading_day: None,
            list_calls: AtomicUsize::new(0),
            history_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_symbol(mut self, ticker: &str, symbol: FixtureSymbol) -> Self {
        self.universe.push(ticker.to_string());
        self.symbols.insert(ticker.to_string(), symbol);
        self
    }

    pub fn failing_listing(mut self, failures: usize) -> Self {
        self.list_failures = failures;
        self
    }

    pub fn with_trading_day(mut self, day: NaiveDate) -> Self {
        self.trading_day = Some(day);
        self
    }
}

#[async_trait]
impl PriceHistorySource for ScriptedSource {
    async fn resolve_trading_day(&self, reference: NaiveDate) -> Result<NaiveDate, SourceError> {
        self.trading_day
            .ok_or_else(|| SourceError::Transient(format!("calendar unavailable for {reference}")))
    }

    async fn list_symbols(
        &self,
        _market: MarketId,
        _as_of: NaiveDate,
    ) -> Result<Vec<String>, SourceError> {
        let call = self.list_calls.fetch_add(1, Ordering::SeqCst);
        if call < self.list_failures {
            return Err(SourceError::Transient("listing endpoint timed out".into()));
        }
        Ok(self.universe.clone())
    }

    async fn daily_history(
        &self,
        ticker: &str,
        _from: NaiveDate,
        to: NaiveDate,
    ) -> Result<SymbolSeries, SourceError> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        let symbol = self
            .symbols
            .get(ticker)
            .ok_or_else(|| SourceError::UnknownSymbol(ticker.to_string()))?;
        if let Some(err) = &symbol.history_error {
            return Err(err.clone());
        }
        SymbolSeries::new(ticker, bars_ending(to, &symbol.closes, &symbol.volumes))
    }

    async fn display_name(&self, ticker: &str) -> Result<String, SourceError> {
        self.symbols
            .get(ticker)
            .and_then(|s| s.name.clone())
            .ok_or_else(|| SourceError::UnknownSymbol(ticker.to_string()))
    }
}
