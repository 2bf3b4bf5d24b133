// =============================================================================
// Exponential Moving Average (EMA) and MACD
// =============================================================================
//
// EMA gives more weight to recent prices, making it more responsive to new
// information than the Simple Moving Average (SMA).
//
// Formula (recursive, no bias adjustment):
//   alpha  = 2 / (span + 1)
//   EMA_0  = x_0
//   EMA_t  = x_t * alpha + EMA_{t-1} * (1 - alpha)
//
// The series is seeded with the first observation rather than an SMA, so the
// output has the same length as the input. Early values are only approximate
// while the average warms up; callers must feed the full history window.
//
// MACD:
//   line_t   = EMA_fast_t - EMA_slow_t
//   signal_t = EMA(line, signal_span)_t
// =============================================================================

/// Fast EMA span used by the MACD line.
pub const MACD_FAST_SPAN: usize = 12;
/// Slow EMA span used by the MACD line.
pub const MACD_SLOW_SPAN: usize = 26;
/// EMA span applied to the MACD line to obtain the signal line.
pub const MACD_SIGNAL_SPAN: usize = 9;

/// Compute the EMA series for `values` with the given `span`.
///
/// Returns an empty `Vec` when the input is empty or `span == 0`; otherwise one
/// output per input element. A non-finite input poisons every later value,
/// which downstream comparisons treat as "no signal".
pub fn calculate_ema(values: &[f64], span: usize) -> Vec<f64> {
    if span == 0 || values.is_empty() {
        return Vec::new();
    }

    let alpha = 2.0 / (span as f64 + 1.0);

    let mut result = Vec::with_capacity(values.len());
    let mut prev = values[0];
    result.push(prev);

    for &x in &values[1..] {
        let ema = x * alpha + prev * (1.0 - alpha);
        result.push(ema);
        prev = ema;
    }

    result
}

/// MACD line and its signal line, both aligned index-for-index with the closes
/// they were computed from.
#[derive(Debug, Clone)]
pub struct Macd {
    pub line: Vec<f64>,
    pub signal: Vec<f64>,
}

impl Macd {
    /// Compute MACD(fast, slow, signal) over `closes`.
    pub fn calculate(closes: &[f64], fast: usize, slow: usize, signal: usize) -> Self {
        let fast_ema = calculate_ema(closes, fast);
        let slow_ema = calculate_ema(closes, slow);

        let line: Vec<f64> = fast_ema
            .iter()
            .zip(slow_ema.iter())
            .map(|(f, s)| f - s)
            .collect();
        let signal = calculate_ema(&line, signal);

        Self { line, signal }
    }

    /// MACD(12, 26, 9).
    pub fn standard(closes: &[f64]) -> Self {
        Self::calculate(closes, MACD_FAST_SPAN, MACD_SLOW_SPAN, MACD_SIGNAL_SPAN)
    }

    /// `true` iff the line crossed the signal from below to above between the
    /// last two bars. Only the final pair is inspected.
    pub fn golden_cross(&self) -> bool {
        is_golden_cross(&self.line, &self.signal)
    }
}

/// Strict upward crossover test on the two most recent points.
///
/// `line[t-1] < signal[t-1] && line[t] > signal[t]`; fewer than two points or
/// mismatched lengths yield `false`. NaN comparisons are `false` as well.
pub fn is_golden_cross(line: &[f64], signal: &[f64]) -> bool {
    let n = line.len();
    if n < 2 || signal.len() != n {
        return false;
    }
    line[n - 2] < signal[n - 2] && line[n - 1] > signal[n - 1]
}
