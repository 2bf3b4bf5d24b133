// =============================================================================
// Runtime Configuration — screening thresholds, pacing and server settings
// =============================================================================
//
// Every tunable parameter of the screener lives here. The file is optional:
// all fields carry `#[serde(default)]`, so an empty or partial JSON document
// yields the documented defaults. A few deployment knobs may also be
// overridden from the environment.
// =============================================================================

use std::path::Path;
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::indicators::{momentum, IndicatorParams, MIN_HISTORY};
use crate::market_data::krx;
use crate::types::MarketId;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_top_n() -> usize {
    5
}

fn default_lookback_days() -> usize {
    momentum::DEFAULT_LOOKBACK
}

fn default_min_history() -> usize {
    MIN_HISTORY
}

fn default_history_calendar_days() -> u64 {
    90
}

fn default_min_avg_volume() -> f64 {
    50_000.0
}

fn default_min_avg_price() -> f64 {
    1_000.0
}

fn default_max_concurrency() -> usize {
    4
}

fn default_min_request_interval_ms() -> u64 {
    100
}

fn default_universe_max_attempts() -> u32 {
    3
}

fn default_universe_backoff_secs() -> u64 {
    2
}

fn default_sample_universe() -> Vec<String> {
    [
        "005930", "000660", "035420", "051910", "068270", "005380", "035720", "006400",
        "105560", "055550",
    ]
    .iter()
    .map(|t| t.to_string())
    .collect()
}

fn default_request_timeout_secs() -> u64 {
    900
}

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_krx_base_url() -> String {
    krx::DEFAULT_BASE_URL.to_string()
}

fn default_http_timeout_secs() -> u64 {
    10
}

// =============================================================================
// RuntimeConfig
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    // --- Universe -----------------------------------------------------------

    /// Market screened when the request does not name one.
    #[serde(default)]
    pub market: MarketId,

    /// Listing attempts before the universe is declared unavailable.
    #[serde(default = "default_universe_max_attempts")]
    pub universe_max_attempts: u32,

    /// Backoff unit; the wait before attempt `k + 1` is `k` units.
    #[serde(default = "default_universe_backoff_secs")]
    pub universe_backoff_secs: u64,

    /// Screen `sample_universe` when listing fails instead of failing the
    /// request. The report is then flagged as degraded.
    #[serde(default)]
    pub sample_fallback: bool,

    #[serde(default = "default_sample_universe")]
    pub sample_universe: Vec<String>,

    // --- Screening ----------------------------------------------------------

    /// Entries per ranked screen.
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Bars of the change / average look-back.
    #[serde(default = "default_lookback_days")]
    pub lookback_days: usize,

    /// Shortest series that is screened at all.
    #[serde(default = "default_min_history")]
    pub min_history: usize,

    /// Calendar days of history requested per symbol.
    #[serde(default = "default_history_calendar_days")]
    pub history_calendar_days: u64,

    #[serde(default = "default_min_avg_volume")]
    pub min_avg_volume: f64,

    #[serde(default = "default_min_avg_price")]
    pub min_avg_price: f64,

    // --- Provider pacing ----------------------------------------------------

    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    #[serde(default = "default_min_request_interval_ms")]
    pub min_request_interval_ms: u64,

    #[serde(default = "default_krx_base_url")]
    pub krx_base_url: String,

    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    // --- Server -------------------------------------------------------------

    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Upper bound of one analysis request; in-flight fetches are abandoned
    /// when it elapses.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            market: MarketId::default(),
            universe_max_attempts: default_universe_max_attempts(),
            universe_backoff_secs: default_universe_backoff_secs(),
            sample_fallback: false,
            sample_universe: default_sample_universe(),
            top_n: default_top_n(),
            lookback_days: default_lookback_days(),
            min_history: default_min_history(),
            history_calendar_days: default_history_calendar_days(),
            min_avg_volume: default_min_avg_volume(),
            min_avg_price: default_min_avg_price(),
            max_concurrency: default_max_concurrency(),
            min_request_interval_ms: default_min_request_interval_ms(),
            krx_base_url: default_krx_base_url(),
            http_timeout_secs: default_http_timeout_secs(),
            bind_addr: default_bind_addr(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read runtime config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse runtime config from {}", path.display()))?;

        info!(
            path = %path.display(),
            market = %config.market,
            top_n = config.top_n,
            "runtime config loaded"
        );

        Ok(config)
    }

    /// Apply `MOMENTUM_*` environment overrides.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(addr) = lookup("MOMENTUM_BIND_ADDR").filter(|a| !a.trim().is_empty()) {
            self.bind_addr = addr.trim().to_string();
        }
        if let Some(raw) = lookup("MOMENTUM_MARKET") {
            match raw.parse::<MarketId>() {
                Ok(market) => self.market = market,
                Err(e) => warn!(error = %e, "ignoring MOMENTUM_MARKET"),
            }
        }
        if let Some(raw) = lookup("MOMENTUM_SAMPLE_FALLBACK") {
            match raw.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" => self.sample_fallback = true,
                "0" | "false" | "no" => self.sample_fallback = false,
                other => warn!(value = other, "ignoring MOMENTUM_SAMPLE_FALLBACK"),
            }
        }
    }

    /// Reject settings the screener cannot run with.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.top_n > 0, "top_n must be at least 1");
        ensure!(self.lookback_days > 0, "lookback_days must be at least 1");
        ensure!(
            self.min_history > self.lookback_days,
            "min_history ({}) must exceed lookback_days ({})",
            self.min_history,
            self.lookback_days
        );
        ensure!(self.max_concurrency > 0, "max_concurrency must be at least 1");
        ensure!(
            self.universe_max_attempts > 0,
            "universe_max_attempts must be at least 1"
        );
        ensure!(
            !self.sample_fallback || !self.sample_universe.is_empty(),
            "sample_fallback requires a non-empty sample_universe"
        );
        Ok(())
    }

    /// Window parameters handed to the indicator pass.
    pub fn indicator_params(&self) -> IndicatorParams {
        IndicatorParams {
            lookback: self.lookback_days,
            min_history: self.min_history,
        }
    }

    pub fn min_request_interval(&self) -> Duration {
        Duration::from_millis(self.min_request_interval_ms)
    }

    pub fn universe_backoff(&self) -> Duration {
        Duration::from_secs(self.universe_backoff_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}
