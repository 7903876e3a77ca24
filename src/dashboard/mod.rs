//! Dashboard: Axum JSON API for triggering scans.
//!
//! CORS enabled for local development.

pub mod routes;

use anyhow::{Context, Result};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tracing::info;

pub use routes::{AppState, DashboardState};

/// Bind `port` on all interfaces and serve until the process exits.
pub async fn serve(state: AppState, port: u16) -> Result<()> {
    let app = build_router(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind dashboard port {port}"))?;
    info!(port, "Dashboard server listening on http://localhost:{port}");

    axum::serve(listener, app).await.context("Dashboard server error")
}

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(HeaderValue::from_static("*"))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(routes::health))
        .route("/api/timeframes", get(routes::get_timeframes))
        .route("/api/scan", post(routes::post_scan))
        .route("/api/scan/latest", get(routes::get_latest))
        .layer(cors)
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AnalysisConfig, ScanConfig};
    use crate::engine::scanner::Screener;
    use crate::exchange::SeriesSource;
    use crate::types::{CandleSeries, MarketInfo, MarketType, Timeframe};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::collections::HashMap;
    use std::sync::Arc;
    use tower::ServiceExt;

    /// One listed market whose series is always empty.
    struct QuietSource;

    #[async_trait]
    impl SeriesSource for QuietSource {
        async fn fetch_candles(
            &self,
            symbol: &str,
            timeframe: Timeframe,
            _limit: usize,
        ) -> anyhow::Result<CandleSeries> {
            Ok(CandleSeries::new(symbol, timeframe, Vec::new()))
        }

        async fn list_markets(&self) -> anyhow::Result<HashMap<String, MarketInfo>> {
            let btc = MarketInfo {
                symbol: "BTC/USDT:USDT".into(),
                id: "BTCUSDT".into(),
                base: "BTC".into(),
                quote: "USDT".into(),
                settle: Some("USDT".into()),
                market_type: MarketType::Swap,
            };
            Ok(HashMap::from([(btc.symbol.clone(), btc)]))
        }
    }

    fn test_state() -> AppState {
        let scan = ScanConfig {
            request_interval_ms: 0,
            ..ScanConfig::default()
        };
        let screener = Screener::new(Arc::new(QuietSource), scan, AnalysisConfig::default());
        Arc::new(DashboardState::new(screener, Timeframe::DEFAULT_SCAN.to_vec()))
    }

    fn post_scan(body: &'static str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/scan")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_json(resp: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(resp.into_body(), 100_000).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = build_router(test_state());
        let resp = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_timeframes_endpoint() {
        let app = build_router(test_state());
        let resp = app
            .oneshot(Request::builder().uri("/api/timeframes").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let json = body_json(resp).await;
        assert_eq!(json["available"].as_array().unwrap().len(), Timeframe::ALL.len());
        assert_eq!(json["defaults"], serde_json::json!(["1h", "4h", "1d"]));
    }

    #[tokio::test]
    async fn test_scan_with_defaults() {
        let state = test_state();
        let app = build_router(state.clone());
        let resp = app.oneshot(post_scan("")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let json = body_json(resp).await;
        assert_eq!(json["symbols_scanned"], 1);
        assert_eq!(json["pairs_evaluated"], 3);
        assert_eq!(json["skipped"]["insufficient_data"], 3);
        assert_eq!(json["notice"], "No valid setups found.");
        assert!(state.last_report.read().await.is_some());
    }

    #[tokio::test]
    async fn test_scan_with_explicit_timeframes() {
        let app = build_router(test_state());
        let resp = app.oneshot(post_scan(r#"{"timeframes":["15m","1w"]}"#)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let json = body_json(resp).await;
        assert_eq!(json["timeframes"], serde_json::json!(["15m", "1w"]));
        assert_eq!(json["pairs_evaluated"], 2);
    }

    #[tokio::test]
    async fn test_scan_rejects_unknown_timeframe() {
        let app = build_router(test_state());
        let resp = app.oneshot(post_scan(r#"{"timeframes":["7m"]}"#)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_scan_rejects_empty_timeframes() {
        let app = build_router(test_state());
        let resp = app.oneshot(post_scan(r#"{"timeframes":[]}"#)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_concurrent_scan_conflicts() {
        let state = test_state();
        let _running = state.scan_lock.lock().await;
        let app = build_router(state.clone());
        let resp = app.oneshot(post_scan("")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_latest_before_any_scan() {
        let app = build_router(test_state());
        let resp = app
            .oneshot(Request::builder().uri("/api/scan/latest").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
