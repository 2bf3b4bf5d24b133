// =============================================================================
// Short-horizon momentum — N-bar change and trailing averages
// =============================================================================
//
// change = ((close_t - close_{t-n}) / close_{t-n}) * 100
//
// close_{t-n} is the close `n` bars before the latest bar. A zero prior close
// is degenerate input and reported as an error rather than clamped.

use super::IndicatorError;

/// Look-back used by the 5-day screens.
pub const DEFAULT_LOOKBACK: usize = 5;

/// Percentage change of the latest value against the one `lookback` bars
/// earlier.
pub fn change_pct(closes: &[f64], lookback: usize) -> Result<f64, IndicatorError> {
    if lookback == 0 || closes.len() <= lookback {
        return Err(IndicatorError::InsufficientHistory {
            required: lookback + 1,
            actual: closes.len(),
        });
    }

    let now = closes[closes.len() - 1];
    let prior = closes[closes.len() - 1 - lookback];
    if prior == 0.0 {
        return Err(IndicatorError::DivisionByZero);
    }

    Ok((now - prior) / prior * 100.0)
}

/// Arithmetic mean of the last `n` values, `None` when fewer are available.
pub fn trailing_mean(values: &[f64], n: usize) -> Option<f64> {
    if n == 0 || values.len() < n {
        return None;
    }
    let window = &values[values.len() - n..];
    Some(window.iter().sum::<f64>() / n as f64)
}

/// Momentum figures of one symbol used both for screening and ranking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MomentumStats {
    pub latest_close: f64,
    pub change_pct: f64,
    pub avg_volume: f64,
    pub avg_price: f64,
}

impl MomentumStats {
    /// Compute the N-bar change plus N-bar average volume and price.
    pub fn compute(
        closes: &[f64],
        volumes: &[f64],
        lookback: usize,
    ) -> Result<Self, IndicatorError> {
        let change_pct = change_pct(closes, lookback)?;
        let insufficient = || IndicatorError::InsufficientHistory {
            required: lookback,
            actual: volumes.len().min(closes.len()),
        };
        let avg_volume = trailing_mean(volumes, lookback).ok_or_else(insufficient)?;
        let avg_price = trailing_mean(closes, lookback).ok_or_else(insufficient)?;

        Ok(Self {
            latest_close: closes[closes.len() - 1],
            change_pct,
            avg_volume,
            avg_price,
        })
    }
}
