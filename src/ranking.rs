// =============================================================================
// Ranking & Aggregation — five screens over the eligible result set
// =============================================================================
//
// Ranked screens use a stable sort, so equal keys keep discovery order. The
// two signal screens are plain filters in discovery order.
// =============================================================================

use chrono::{DateTime, FixedOffset, NaiveDate};

use crate::screener::{ScreenOutcome, ScreenedStock, UniverseSource};
use crate::types::{BbSignal, MacdSignal, MarketId};

/// Informational marker of a report without eligible symbols.
pub const EMPTY_RESULT_MESSAGE: &str = "no symbols satisfied the screening conditions";

/// Sort direction of a ranked screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Ascending,
    Descending,
}

/// Final product of one analysis request.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub analysis_date: NaiveDate,
    pub generated_at: DateTime<FixedOffset>,
    pub market: MarketId,
    pub universe_source: UniverseSource,
    pub universe_size: usize,
    pub screened_count: usize,
    pub message: Option<String>,

    pub top_risers: Vec<ScreenedStock>,
    pub top_fallers: Vec<ScreenedStock>,
    pub top_volume: Vec<ScreenedStock>,
    pub macd_golden_cross: Vec<ScreenedStock>,
    pub bb_breakout: Vec<ScreenedStock>,
}

impl AnalysisReport {
    /// The universe was the configured sample set, not the market listing.
    pub fn degraded(&self) -> bool {
        self.universe_source == UniverseSource::Sample
    }
}

/// First `n` stocks ordered by `key`; ties keep input order.
pub fn top_by<F>(stocks: &[ScreenedStock], n: usize, order: Order, key: F) -> Vec<ScreenedStock>
where
    F: Fn(&ScreenedStock) -> f64,
{
    let mut ranked: Vec<&ScreenedStock> = stocks.iter().collect();
    // `sort_by` is stable.
    ranked.sort_by(|a, b| match order {
        Order::Ascending => key(a).total_cmp(&key(b)),
        Order::Descending => key(b).total_cmp(&key(a)),
    });
    ranked.into_iter().take(n).cloned().collect()
}

/// Build the report from one screener run.
pub fn aggregate(outcome: ScreenOutcome, top_n: usize, generated_at: DateTime<FixedOffset>) -> AnalysisReport {
    let stocks = &outcome.stocks;

    let top_risers = top_by(stocks, top_n, Order::Descending, |s| s.change_5d_pct);
    let top_fallers = top_by(stocks, top_n, Order::Ascending, |s| s.change_5d_pct);
    let top_volume = top_by(stocks, top_n, Order::Descending, |s| s.avg_volume_5d);
    let macd_golden_cross = stocks
        .iter()
        .filter(|s| s.macd_signal == MacdSignal::GoldenCross)
        .cloned()
        .collect();
    let bb_breakout = stocks
        .iter()
        .filter(|s| s.bb_signal == BbSignal::Breakout)
        .cloned()
        .collect();

    let message = stocks.is_empty().then(|| EMPTY_RESULT_MESSAGE.to_string());

    AnalysisReport {
        analysis_date: outcome.analysis_date,
        generated_at,
        market: outcome.market,
        universe_source: outcome.universe_source,
        universe_size: outcome.universe_size,
        screened_count: stocks.len(),
        message,
        top_risers,
        top_fallers,
        top_volume,
        macd_golden_cross,
        bb_breakout,
    }
}
