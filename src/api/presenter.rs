// =============================================================================
// Result Presenter — wire shape of the analysis report
// =============================================================================
//
// Every float leaves the service through `finite()`: NaN and infinities
// become `null` instead of a non-standard JSON literal.
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::ranking::AnalysisReport;
use crate::screener::{ScreenedStock, UniverseSource};
use crate::types::{BbSignal, MacdSignal, MarketId};

/// `Some(v)` for finite `v`, `None` otherwise.
pub fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

/// One row of a screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenEntry {
    pub ticker: String,
    pub name: String,
    pub close: Option<f64>,
    #[serde(rename = "change5D")]
    pub change_5d: Option<f64>,
    #[serde(rename = "avgVol5D")]
    pub avg_vol_5d: Option<f64>,
    #[serde(rename = "macdSignal")]
    pub macd_signal: MacdSignal,
    #[serde(rename = "bbSignal")]
    pub bb_signal: BbSignal,
}

impl From<&ScreenedStock> for ScreenEntry {
    fn from(s: &ScreenedStock) -> Self {
        Self {
            ticker: s.ticker.clone(),
            name: s.name.clone(),
            close: finite(s.close),
            change_5d: finite(s.change_5d_pct),
            avg_vol_5d: finite(s.avg_volume_5d),
            macd_signal: s.macd_signal,
            bb_signal: s.bb_signal,
        }
    }
}

/// Body of `GET /api/stock-analysis`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportResponse {
    /// `YYYYMMDD`.
    pub analysis_date: String,
    /// RFC 3339 in exchange-local time.
    pub generated_at: String,
    pub market: MarketId,
    pub universe_size: usize,
    pub screened_count: usize,
    pub degraded: bool,
    pub universe_source: UniverseSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    pub top_risers: Vec<ScreenEntry>,
    pub top_fallers: Vec<ScreenEntry>,
    pub top_volume: Vec<ScreenEntry>,
    pub macd_golden_cross: Vec<ScreenEntry>,
    pub bb_breakout: Vec<ScreenEntry>,
}

fn entries(stocks: &[ScreenedStock]) -> Vec<ScreenEntry> {
    stocks.iter().map(ScreenEntry::from).collect()
}

impl From<&AnalysisReport> for ReportResponse {
    fn from(r: &AnalysisReport) -> Self {
        Self {
            analysis_date: r.analysis_date.format("%Y%m%d").to_string(),
            generated_at: r.generated_at.to_rfc3339(),
            market: r.market,
            universe_size: r.universe_size,
            screened_count: r.screened_count,
            degraded: r.degraded(),
            universe_source: r.universe_source,
            message: r.message.clone(),
            top_risers: entries(&r.top_risers),
            top_fallers: entries(&r.top_fallers),
            top_volume: entries(&r.top_volume),
            macd_golden_cross: entries(&r.macd_golden_cross),
            bb_breakout: entries(&r.bb_breakout),
        }
    }
}

/// Error body: `{ "detail": "..." }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}
