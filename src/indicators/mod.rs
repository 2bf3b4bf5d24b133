// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free indicator computation over one symbol's daily
// series. Nothing here performs I/O or keeps state between symbols; a
// snapshot is computed, read for its signals and dropped.
//
// Every indicator runs over the full retrieved window. Only the last one or
// two bars are read for signal decisions, but the warm-up history changes
// their values, so the input must never be truncated to a short tail.

pub mod bollinger;
pub mod ema;
pub mod momentum;

use thiserror::Error;

use crate::market_data::SymbolSeries;
use crate::types::{BbSignal, MacdSignal};

pub use bollinger::BollingerBands;
pub use ema::Macd;
pub use momentum::MomentumStats;

/// Minimum number of bars for a meaningful snapshot: a 26-span EMA, signal
/// smoothing and the 5-bar look-back.
pub const MIN_HISTORY: usize = 35;

/// Expected, per-symbol computation failures. Callers skip the symbol.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndicatorError {
    #[error("insufficient history: need {required} bars, have {actual}")]
    InsufficientHistory { required: usize, actual: usize },

    #[error("prior close is zero")]
    DivisionByZero,
}

/// Window parameters of the indicator pass.
#[derive(Debug, Clone, Copy)]
pub struct IndicatorParams {
    pub lookback: usize,
    pub min_history: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            lookback: momentum::DEFAULT_LOOKBACK,
            min_history: MIN_HISTORY,
        }
    }
}

/// Fail with `InsufficientHistory` unless `series` has at least
/// `min_history` bars.
pub fn ensure_history(series: &SymbolSeries, min_history: usize) -> Result<(), IndicatorError> {
    if series.len() < min_history {
        return Err(IndicatorError::InsufficientHistory {
            required: min_history,
            actual: series.len(),
        });
    }
    Ok(())
}

/// All indicators of one symbol, derived from its full series.
#[derive(Debug, Clone)]
pub struct IndicatorSnapshot {
    pub momentum: MomentumStats,
    pub macd: Macd,
    pub bands: BollingerBands,
}

impl IndicatorSnapshot {
    /// Validate the history length and compute every indicator.
    pub fn compute(series: &SymbolSeries, params: IndicatorParams) -> Result<Self, IndicatorError> {
        ensure_history(series, params.min_history)?;
        let closes = series.closes();
        let momentum = MomentumStats::compute(&closes, &series.volumes(), params.lookback)?;
        Ok(Self {
            momentum,
            macd: Macd::standard(&closes),
            bands: BollingerBands::standard(&closes),
        })
    }

    pub fn latest_close(&self) -> f64 {
        self.momentum.latest_close
    }

    pub fn change_5d(&self) -> f64 {
        self.momentum.change_pct
    }

    pub fn avg_volume_5d(&self) -> f64 {
        self.momentum.avg_volume
    }

    pub fn avg_price_5d(&self) -> f64 {
        self.momentum.avg_price
    }

    pub fn macd_golden_cross(&self) -> bool {
        self.macd.golden_cross()
    }

    pub fn bb_breakout(&self) -> bool {
        bollinger::is_breakout(self.momentum.latest_close, self.bands.latest_upper())
    }

    pub fn macd_signal(&self) -> MacdSignal {
        MacdSignal::from_cross(self.macd_golden_cross())
    }

    pub fn bb_signal(&self) -> BbSignal {
        BbSignal::from_breakout(self.bb_breakout())
    }
}
