// =============================================================================
// Universe Screener — per-symbol indicator pass over a whole market
// =============================================================================
//
// For every ticker of the market listing:
//   1. fetch daily history for [today - N calendar days, analysis date];
//   2. compute the indicator snapshot, which rejects series shorter than
//      `min_history` and a zero prior close;
//   3. skip illiquid or low-priced symbols (N-bar average volume / price);
//   4. fetch the display name;
//   5. keep the row.
//
// Any failure in 1-4 skips that ticker only. The only fatal condition is a
// universe that cannot be listed even after retries (and the optional sample
// fallback).
//
// Symbols are processed by a bounded pool (`max_concurrency`) whose results
// are merged in listing order, so discovery order is deterministic. Request
// spacing toward the data provider is the source's concern.
// =============================================================================

use std::time::Duration;

use chrono::{Days, NaiveDate};
use futures_util::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::indicators::{IndicatorError, IndicatorSnapshot};
use crate::market_data::{PriceHistorySource, SourceError};
use crate::runtime_config::RuntimeConfig;
use crate::types::{BbSignal, MacdSignal, MarketId};

/// Progress is logged every this many symbols.
const PROGRESS_EVERY: usize = 100;

// =============================================================================
// Types
// =============================================================================

/// One eligible symbol with its screening figures.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenedStock {
    pub ticker: String,
    pub name: String,
    pub close: f64,
    pub change_5d_pct: f64,
    pub avg_volume_5d: f64,
    pub macd_signal: MacdSignal,
    pub bb_signal: BbSignal,
}

/// Where the screened universe came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UniverseSource {
    /// The full market listing.
    Market,
    /// The configured sample set, used after listing failed.
    Sample,
}

#[derive(Debug, Clone)]
pub struct Universe {
    pub tickers: Vec<String>,
    pub source: UniverseSource,
}

/// Request-level failures.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("symbol universe for {market} unavailable after {attempts} attempts: {last_error}")]
    UniverseUnavailable {
        market: MarketId,
        attempts: u32,
        last_error: String,
    },

    #[error("analysis did not finish within {0:?}")]
    Timeout(Duration),
}

/// Why a ticker did not make it into the result set.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    InsufficientHistory,
    DegenerateInput,
    Illiquid,
    Failed(String),
}

impl From<IndicatorError> for SkipReason {
    fn from(e: IndicatorError) -> Self {
        match e {
            IndicatorError::InsufficientHistory { .. } => Self::InsufficientHistory,
            IndicatorError::DivisionByZero => Self::DegenerateInput,
        }
    }
}

impl From<SourceError> for SkipReason {
    fn from(e: SourceError) -> Self {
        Self::Failed(e.to_string())
    }
}

/// Per-reason skip counters of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SkipCounts {
    pub insufficient_history: usize,
    pub degenerate_input: usize,
    pub illiquid: usize,
    pub failed: usize,
}

impl SkipCounts {
    fn record(&mut self, reason: &SkipReason) {
        match reason {
            SkipReason::InsufficientHistory => self.insufficient_history += 1,
            SkipReason::DegenerateInput => self.degenerate_input += 1,
            SkipReason::Illiquid => self.illiquid += 1,
            SkipReason::Failed(_) => self.failed += 1,
        }
    }
}

/// Everything the ranking step needs from one screener run.
#[derive(Debug, Clone)]
pub struct ScreenOutcome {
    pub analysis_date: NaiveDate,
    pub market: MarketId,
    pub universe_source: UniverseSource,
    pub universe_size: usize,
    /// Eligible symbols in listing order.
    pub stocks: Vec<ScreenedStock>,
    pub skipped: SkipCounts,
}

// =============================================================================
// Screener
// =============================================================================

pub struct Screener<'a> {
    source: &'a dyn PriceHistorySource,
    config: &'a RuntimeConfig,
}

impl<'a> Screener<'a> {
    pub fn new(source: &'a dyn PriceHistorySource, config: &'a RuntimeConfig) -> Self {
        Self { source, config }
    }

    /// Screen `market` as of `today` (local exchange date).
    pub async fn run(&self, market: MarketId, today: NaiveDate) -> Result<ScreenOutcome, AnalysisError> {
        let analysis_date = self.resolve_analysis_date(today).await;
        let universe = self.load_universe(market, analysis_date).await?;
        let from = today - Days::new(self.config.history_calendar_days);
        let total = universe.tickers.len();

        info!(
            %market,
            %analysis_date,
            %from,
            total,
            source = ?universe.source,
            "screening universe"
        );

        // Futures are lazy; `buffered` polls at most `max_concurrency` of
        // them and yields results in listing order.
        let tasks: Vec<_> = universe
            .tickers
            .iter()
            .enumerate()
            .map(|(i, ticker)| self.screen_with_progress(i, total, ticker, from, analysis_date))
            .collect();
        let results: Vec<(&str, Result<ScreenedStock, SkipReason>)> = stream::iter(tasks)
            .buffered(self.config.max_concurrency.max(1))
            .collect()
            .await;

        let mut stocks = Vec::new();
        let mut skipped = SkipCounts::default();
        for (ticker, result) in results {
            match result {
                Ok(stock) => stocks.push(stock),
                Err(reason) => {
                    if let SkipReason::Failed(detail) = &reason {
                        debug!(ticker = %ticker, error = %detail, "symbol analysis failed");
                    }
                    skipped.record(&reason);
                }
            }
        }

        info!(
            eligible = stocks.len(),
            total,
            skipped = ?skipped,
            "screening finished"
        );

        Ok(ScreenOutcome {
            analysis_date,
            market,
            universe_source: universe.source,
            universe_size: total,
            stocks,
            skipped,
        })
    }

    /// Nearest trading day, or `today` itself when the calendar lookup fails.
    pub async fn resolve_analysis_date(&self, today: NaiveDate) -> NaiveDate {
        match self.source.resolve_trading_day(today).await {
            Ok(day) => day,
            Err(e) => {
                warn!(error = %e, %today, "trading-day lookup failed, using reference date");
                today
            }
        }
    }

    /// List the market with bounded retries and linear backoff.
    pub async fn load_universe(
        &self,
        market: MarketId,
        as_of: NaiveDate,
    ) -> Result<Universe, AnalysisError> {
        let attempts = self.config.universe_max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            if attempt > 1 {
                let wait = self.config.universe_backoff() * (attempt - 1);
                info!(attempt, attempts, wait_secs = wait.as_secs(), "retrying universe listing");
                tokio::time::sleep(wait).await;
            }

            match self.source.list_symbols(market, as_of).await {
                Ok(tickers) if !tickers.is_empty() => {
                    info!(%market, count = tickers.len(), "universe listed");
                    return Ok(Universe {
                        tickers,
                        source: UniverseSource::Market,
                    });
                }
                Ok(_) => {
                    warn!(%market, attempt, attempts, "provider returned an empty listing");
                    last_error = "provider returned an empty listing".to_string();
                }
                Err(e) => {
                    warn!(%market, attempt, attempts, error = %e, "universe listing failed");
                    last_error = e.to_string();
                }
            }
        }

        if self.config.sample_fallback && !self.config.sample_universe.is_empty() {
            warn!(
                %market,
                count = self.config.sample_universe.len(),
                "universe listing exhausted, screening the sample set (degraded)"
            );
            return Ok(Universe {
                tickers: self.config.sample_universe.clone(),
                source: UniverseSource::Sample,
            });
        }

        Err(AnalysisError::UniverseUnavailable {
            market,
            attempts,
            last_error,
        })
    }

    /// Steps 1-4 for one ticker.
    pub async fn screen_symbol(
        &self,
        ticker: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<ScreenedStock, SkipReason> {
        let series = self.source.daily_history(ticker, from, to).await?;
        let snapshot = IndicatorSnapshot::compute(&series, self.config.indicator_params())?;
        if snapshot.avg_volume_5d() < self.config.min_avg_volume
            || snapshot.avg_price_5d() < self.config.min_avg_price
        {
            return Err(SkipReason::Illiquid);
        }

        let name = self.source.display_name(ticker).await?;

        Ok(ScreenedStock {
            ticker: ticker.to_string(),
            name,
            close: snapshot.latest_close(),
            change_5d_pct: snapshot.change_5d(),
            avg_volume_5d: snapshot.avg_volume_5d(),
            macd_signal: snapshot.macd_signal(),
            bb_signal: snapshot.bb_signal(),
        })
    }

    async fn screen_with_progress<'t>(
        &self,
        index: usize,
        total: usize,
        ticker: &'t str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> (&'t str, Result<ScreenedStock, SkipReason>) {
        if (index + 1) % PROGRESS_EVERY == 0 {
            info!(progress = index + 1, total, ticker, "screening in progress");
        }
        (ticker, self.screen_symbol(ticker, from, to).await)
    }
}
