// =============================================================================
// Market data — daily series and the price-history source seam
// =============================================================================
//
// The screener consumes market data exclusively through `PriceHistorySource`.
// The production implementation talks to the KRX market-data endpoint; tests
// use a scripted in-memory source.

pub mod krx;
pub mod pacing;

#[cfg(test)]
pub mod fixture;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::MarketId;

pub use pacing::RequestPacer;

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// One trading day of one symbol.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub close: f64,
    pub volume: u64,
}

/// Daily bars of one symbol, ascending by date with no duplicate dates.
#[derive(Debug, Clone)]
pub struct SymbolSeries {
    bars: Vec<DailyBar>,
}

impl SymbolSeries {
    /// Build a series from bars in any order.
    ///
    /// Bars are sorted ascending by date. Duplicate dates and non-finite or
    /// negative closes are rejected as malformed provider data.
    pub fn new(ticker: &str, mut bars: Vec<DailyBar>) -> Result<Self, SourceError> {
        bars.sort_by_key(|b| b.date);

        if let Some(pair) = bars.windows(2).find(|w| w[0].date == w[1].date) {
            return Err(SourceError::Malformed(format!(
                "{ticker}: duplicate bar for {}",
                pair[0].date
            )));
        }
        if let Some(bad) = bars.iter().find(|b| !b.close.is_finite() || b.close < 0.0) {
            return Err(SourceError::Malformed(format!(
                "{ticker}: invalid close {} on {}",
                bad.close, bad.date
            )));
        }

        Ok(Self { bars })
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume as f64).collect()
    }
}

// ---------------------------------------------------------------------------
// Source seam
// ---------------------------------------------------------------------------

/// Failures reported by a price-history source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// Network or provider hiccup; may succeed on retry.
    #[error("provider request failed: {0}")]
    Transient(String),

    /// The provider answered, but the payload could not be understood.
    #[error("malformed provider data: {0}")]
    Malformed(String),

    #[error("unknown symbol '{0}'")]
    UnknownSymbol(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Malformed(e.to_string())
        } else {
            Self::Transient(e.to_string())
        }
    }
}

/// Upstream market-data provider consumed by the screener.
#[async_trait]
pub trait PriceHistorySource: Send + Sync {
    /// Nearest valid trading day at or before `reference`.
    async fn resolve_trading_day(&self, reference: NaiveDate) -> Result<NaiveDate, SourceError>;

    /// Every ticker listed on `market` as of `as_of`.
    async fn list_symbols(
        &self,
        market: MarketId,
        as_of: NaiveDate,
    ) -> Result<Vec<String>, SourceError>;

    /// Daily bars of `ticker` within `[from, to]`.
    async fn daily_history(
        &self,
        ticker: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<SymbolSeries, SourceError>;

    /// Human-readable name of `ticker`.
    async fn display_name(&self, ticker: &str) -> Result<String, SourceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(day: u32, close: f64) -> DailyBar {
        DailyBar {
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            close,
            volume: 1_000,
        }
    }

    #[test]
    fn series_sorted_ascending() {
        let s = SymbolSeries::new("005930", vec![bar(5, 3.0), bar(1, 1.0), bar(3, 2.0)]).unwrap();
        assert_eq!(s.closes(), vec![1.0, 2.0, 3.0]);
        assert_eq!(s.len(), 3);
    }

    #[test]
    fn series_rejects_duplicate_dates() {
        let err = SymbolSeries::new("005930", vec![bar(1, 1.0), bar(1, 2.0)]).unwrap_err();
        assert!(matches!(err, SourceError::Malformed(_)));
    }

    #[test]
    fn series_rejects_non_finite_close() {
        let err = SymbolSeries::new("005930", vec![bar(1, f64::NAN)]).unwrap_err();
        assert!(matches!(err, SourceError::Malformed(_)));
    }

    #[test]
    fn empty_series_is_valid() {
        let s = SymbolSeries::new("005930", Vec::new()).unwrap();
        assert_eq!(s.len(), 0);
        assert!(s.closes().is_empty());
    }
}
