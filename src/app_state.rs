// =============================================================================
// Central Application State — Momentum Pick
// =============================================================================
//
// Shared by every request handler via `Arc<AppState>`. Reports are computed
// per request and never retained, so the state is just configuration plus
// the two long-lived collaborators:
//   - the price-history source (one HTTP client and listing cache);
//   - the request pacer the source spaces its HTTP calls with, shared so
//     concurrent requests stay within one provider budget.
// =============================================================================

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, FixedOffset, Utc};
use tracing::{info, warn};

use crate::market_data::{PriceHistorySource, RequestPacer};
use crate::ranking::{self, AnalysisReport};
use crate::runtime_config::RuntimeConfig;
use crate::screener::{AnalysisError, Screener};
use crate::types::MarketId;

/// Korea Standard Time, UTC+9.
const KST_OFFSET_SECS: i32 = 9 * 3600;

/// Current wall-clock time at the exchange.
pub fn kst_now() -> DateTime<FixedOffset> {
    let kst = FixedOffset::east_opt(KST_OFFSET_SECS).expect("KST offset is within range");
    Utc::now().with_timezone(&kst)
}

pub struct AppState {
    pub config: RuntimeConfig,
    pub source: Arc<dyn PriceHistorySource>,
    pub pacer: Arc<RequestPacer>,
}

impl AppState {
    pub fn new(
        config: RuntimeConfig,
        source: Arc<dyn PriceHistorySource>,
        pacer: Arc<RequestPacer>,
    ) -> Self {
        Self {
            config,
            source,
            pacer,
        }
    }

    /// Screen `market` and rank the result, bounded by the request timeout.
    /// Dropping the screener future on timeout abandons its in-flight
    /// provider calls; nothing partial is returned.
    pub async fn run_analysis(&self, market: MarketId) -> Result<AnalysisReport, AnalysisError> {
        let started = Instant::now();
        let now = kst_now();
        let limit = self.config.request_timeout();
        let screener = Screener::new(self.source.as_ref(), &self.config);

        let outcome = match tokio::time::timeout(limit, screener.run(market, now.date_naive())).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(%market, timeout_secs = limit.as_secs(), "analysis timed out");
                return Err(AnalysisError::Timeout(limit));
            }
        };

        let report = ranking::aggregate(outcome, self.config.top_n, kst_now());
        info!(
            %market,
            analysis_date = %report.analysis_date,
            screened = report.screened_count,
            universe = report.universe_size,
            degraded = report.degraded(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            pacer = ?self.pacer.snapshot(),
            "analysis complete"
        );
        Ok(report)
    }
}
