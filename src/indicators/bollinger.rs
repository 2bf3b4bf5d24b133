// =============================================================================
// Bollinger Bands (rolling)
// =============================================================================
//
// Bollinger Bands consist of a middle band (SMA) and an upper band
// (SMA + k*σ) evaluated over a trailing window at every bar:
//
//   mid_t   = mean(close_{t-period+1 ..= t})
//   std_t   = sample standard deviation over the same window (n - 1)
//   upper_t = mid_t + k * std_t
//
// Bars before the first full window carry NaN.

/// Trailing window length of the middle band.
pub const BB_PERIOD: usize = 20;
/// Standard-deviation multiplier of the upper band.
pub const BB_NUM_STD: f64 = 2.0;

/// Upper band series aligned index-for-index with the input closes.
#[derive(Debug, Clone)]
pub struct BollingerBands {
    pub upper: Vec<f64>,
}

/// Mean and sample standard deviation (n - 1) of one window.
fn window_stats(window: &[f64]) -> (f64, f64) {
    let n = window.len() as f64;
    let mean = window.iter().sum::<f64>() / n;
    let variance = window.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
    (mean, variance.sqrt())
}

impl BollingerBands {
    /// Compute rolling bands for `closes`.
    ///
    /// `period < 2` produces all-NaN bands: a one-point sample has no standard
    /// deviation.
    pub fn calculate(closes: &[f64], period: usize, num_std: f64) -> Self {
        let n = closes.len();
        let mut upper = vec![f64::NAN; n];

        if period < 2 || n < period {
            return Self { upper };
        }

        for t in (period - 1)..n {
            let (mean, std) = window_stats(&closes[t + 1 - period..=t]);
            upper[t] = mean + num_std * std;
        }

        Self { upper }
    }

    /// 20-period, 2σ bands.
    pub fn standard(closes: &[f64]) -> Self {
        Self::calculate(closes, BB_PERIOD, BB_NUM_STD)
    }

    /// Upper band at the latest bar (NaN when undefined).
    pub fn latest_upper(&self) -> f64 {
        self.upper.last().copied().unwrap_or(f64::NAN)
    }
}

/// `true` iff `close` strictly exceeds `upper`. Equality and NaN are inside.
pub fn is_breakout(close: f64, upper: f64) -> bool {
    close > upper
}
