// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
//   GET /healthz               liveness probe
//   GET /api/stock-analysis    full-market momentum report
//
// The analysis endpoint accepts an optional `market` query parameter
// (KOSPI / KOSDAQ / KONEX); without it the configured market is screened.
// Failures return `{ "detail": "..." }` with:
//   400  unknown market
//   500  symbol universe unavailable
//   504  analysis exceeded the request timeout
//
// CORS is configured permissively; the endpoints carry no credentials.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::api::presenter::{ErrorBody, ReportResponse};
use crate::app_state::AppState;
use crate::screener::AnalysisError;
use crate::types::MarketId;

type ApiError = (StatusCode, Json<ErrorBody>);

fn api_error(status: StatusCode, detail: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorBody {
            detail: detail.into(),
        }),
    )
}

fn analysis_error(e: &AnalysisError) -> ApiError {
    let status = match e {
        AnalysisError::UniverseUnavailable { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        AnalysisError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
    };
    api_error(status, format!("stock analysis failed: {e}"))
}

// =============================================================================
// Router construction
// =============================================================================

/// Build the REST router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/healthz", get(health))
        .route("/api/stock-analysis", get(stock_analysis))
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Stock analysis
// =============================================================================

#[derive(Debug, Default, Deserialize)]
struct AnalysisQuery {
    #[serde(default)]
    market: Option<String>,
}

async fn stock_analysis(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AnalysisQuery>,
) -> Result<Json<ReportResponse>, ApiError> {
    let market = match query.market.as_deref() {
        Some(raw) => raw
            .parse::<MarketId>()
            .map_err(|e| api_error(StatusCode::BAD_REQUEST, e))?,
        None => state.config.market,
    };

    info!(%market, "stock analysis requested");
    let report = state.run_analysis(market).await.map_err(|e| {
        error!(%market, error = %e, "stock analysis failed");
        analysis_error(&e)
    })?;

    Ok(Json(ReportResponse::from(&report)))
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::fixture::{closes_crossing_on_last_bar, ramp, FixtureSymbol, ScriptedSource};
    use crate::market_data::{PriceHistorySource, RequestPacer, SourceError};
    use crate::runtime_config::RuntimeConfig;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use axum::response::Response;
    use tower::ServiceExt;

    fn config() -> RuntimeConfig {
        RuntimeConfig {
            min_request_interval_ms: 0,
            ..RuntimeConfig::default()
        }
    }

    fn app(source: ScriptedSource, config: RuntimeConfig) -> Router {
        let source: Arc<dyn PriceHistorySource> = Arc::new(source);
        let pacer = Arc::new(RequestPacer::new(
            config.max_concurrency,
            config.min_request_interval(),
        ));
        router(Arc::new(AppState::new(config, source, pacer)))
    }

    async fn get(app: Router, uri: &str) -> Response {
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn tickers(screen: &serde_json::Value) -> Vec<&str> {
        screen
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["ticker"].as_str().unwrap())
            .collect()
    }

    /// Ten-symbol universe: six eligible, four skipped for different reasons.
    fn ten_symbol_market() -> ScriptedSource {
        let mut breakout = ramp(10_000.0, 100.0, 59);
        breakout.push(breakout[58] + 3_000.0);

        ScriptedSource::new()
            // +4.81%
            .with_symbol("A", FixtureSymbol::new("Alpha", ramp(10_000.0, 200.0, 60), 300_000.0))
            // +1.97%
            .with_symbol("B", FixtureSymbol::new("Bravo", ramp(10_000.0, 50.0, 60), 200_000.0))
            // -10.87%
            .with_symbol("C", FixtureSymbol::new("Charlie", ramp(20_000.0, -200.0, 60), 150_000.0))
            // -1.45%
            .with_symbol("D", FixtureSymbol::new("Delta", ramp(20_000.0, -50.0, 60), 100_000.0))
            // +22.08%, closes above the upper band
            .with_symbol("E", FixtureSymbol::new("Echo", breakout, 120_000.0))
            // -0.65%, MACD crosses on the last bar
            .with_symbol("F", FixtureSymbol::new("Foxtrot", closes_crossing_on_last_bar(), 80_000.0))
            .with_symbol("G", FixtureSymbol::new("Golf", ramp(10_000.0, 500.0, 20), 500_000.0))
            .with_symbol("H", FixtureSymbol::new("Hotel", ramp(10_000.0, 500.0, 60), 49_999.0))
            .with_symbol("I", FixtureSymbol::new("India", ramp(500.0, 1.0, 60), 500_000.0))
            .with_symbol(
                "J",
                FixtureSymbol::new("Juliett", ramp(10_000.0, 500.0, 60), 500_000.0)
                    .failing_history(SourceError::Malformed("truncated payload".into())),
            )
    }

    #[tokio::test]
    async fn healthz_reports_ok() {
        let response = get(app(ScriptedSource::new(), config()), "/healthz").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json(response).await, serde_json::json!({ "status": "ok" }));
    }

    #[tokio::test(start_paused = true)]
    async fn analysis_end_to_end() {
        let response = get(app(ten_symbol_market(), config()), "/api/stock-analysis").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json(response).await;

        assert_eq!(tickers(&body["topRisers"]), vec!["E", "A", "B", "F", "D"]);
        assert_eq!(tickers(&body["topFallers"]), vec!["C", "D", "F", "B", "A"]);
        assert_eq!(tickers(&body["topVolume"]), vec!["A", "B", "C", "E", "D"]);
        assert_eq!(tickers(&body["macdGoldenCross"]), vec!["F"]);
        assert_eq!(tickers(&body["bbBreakout"]), vec!["E"]);

        assert_eq!(body["market"], "KOSPI");
        assert_eq!(body["universeSize"], 10);
        assert_eq!(body["screenedCount"], 6);
        assert_eq!(body["degraded"], false);
        assert_eq!(body["universeSource"], "market");
        assert!(body.get("message").is_none());
        assert_eq!(body["analysisDate"].as_str().unwrap().len(), 8);

        let echo = &body["topRisers"][0];
        assert_eq!(echo["name"], "Echo");
        assert_eq!(echo["close"], 18_800.0);
        assert_eq!(echo["avgVol5D"], 120_000.0);
        assert_eq!(echo["bbSignal"], "Breakout");
        assert_eq!(echo["macdSignal"], "-");
        let change = echo["change5D"].as_f64().unwrap();
        assert!((change - 3_400.0 / 15_400.0 * 100.0).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn market_query_selects_market() {
        let source = ScriptedSource::new()
            .with_symbol("A", FixtureSymbol::new("Alpha", vec![5_000.0; 40], 100_000.0));
        let response = get(app(source, config()), "/api/stock-analysis?market=kosdaq").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json(response).await["market"], "KOSDAQ");
    }

    #[tokio::test]
    async fn unknown_market_is_bad_request() {
        let response = get(app(ScriptedSource::new(), config()), "/api/stock-analysis?market=NYSE").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let detail = json(response).await["detail"].as_str().unwrap().to_string();
        assert!(detail.contains("NYSE"));
    }

    #[tokio::test(start_paused = true)]
    async fn no_eligible_symbols_is_ok_with_message() {
        let source = ScriptedSource::new()
            .with_symbol("THIN", FixtureSymbol::new("Thin", vec![5_000.0; 40], 10.0));
        let response = get(app(source, config()), "/api/stock-analysis").await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json(response).await;
        assert!(!body["message"].as_str().unwrap().is_empty());
        assert_eq!(body["screenedCount"], 0);
        for screen in ["topRisers", "topFallers", "topVolume", "macdGoldenCross", "bbBreakout"] {
            assert!(body[screen].as_array().unwrap().is_empty(), "{screen} not empty");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failing_listing_is_server_error() {
        let source = ten_symbol_market().failing_listing(usize::MAX);
        let response = get(app(source, config()), "/api/stock-analysis").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let detail = json(response).await["detail"].as_str().unwrap().to_string();
        assert!(!detail.is_empty());
        assert!(detail.contains("unavailable"));
    }

    #[tokio::test(start_paused = true)]
    async fn failing_listing_with_fallback_is_degraded() {
        let source = ten_symbol_market().failing_listing(usize::MAX);
        let config = RuntimeConfig {
            sample_fallback: true,
            sample_universe: vec!["A".to_string(), "C".to_string()],
            ..config()
        };
        let response = get(app(source, config), "/api/stock-analysis").await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json(response).await;
        assert_eq!(body["degraded"], true);
        assert_eq!(body["universeSource"], "sample");
        assert_eq!(body["universeSize"], 2);
        assert_eq!(tickers(&body["topRisers"]), vec!["A", "C"]);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_analysis_times_out() {
        let source = ten_symbol_market().failing_listing(usize::MAX);
        let config = RuntimeConfig {
            request_timeout_secs: 1,
            universe_backoff_secs: 30,
            ..config()
        };
        let response = get(app(source, config), "/api/stock-analysis").await;
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        assert!(!json(response).await["detail"].as_str().unwrap().is_empty());
    }
}
