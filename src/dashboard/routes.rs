//! HTTP route handlers.
//!
//! All endpoints return JSON. State is shared via `Arc<DashboardState>`.

use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use crate::engine::scanner::Screener;
use crate::report::GroupedReport;
use crate::types::Timeframe;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct DashboardState {
    pub screener: Screener,
    pub default_timeframes: Vec<Timeframe>,
    /// Held for the duration of a scan.
    pub scan_lock: Mutex<()>,
    pub last_report: RwLock<Option<GroupedReport>>,
}

impl DashboardState {
    pub fn new(screener: Screener, default_timeframes: Vec<Timeframe>) -> Self {
        Self {
            screener,
            default_timeframes,
            scan_lock: Mutex::new(()),
            last_report: RwLock::new(None),
        }
    }
}

pub type AppState = Arc<DashboardState>;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScanRequest {
    #[serde(default)]
    pub timeframes: Option<Vec<Timeframe>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimeframesResponse {
    pub available: Vec<Timeframe>,
    pub defaults: Vec<Timeframe>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// GET /api/timeframes
pub async fn get_timeframes(State(state): State<AppState>) -> Json<TimeframesResponse> {
    Json(TimeframesResponse {
        available: Timeframe::ALL.to_vec(),
        defaults: state.default_timeframes.clone(),
    })
}

/// GET /api/scan/latest
pub async fn get_latest(State(state): State<AppState>) -> Result<Json<GroupedReport>, ApiError> {
    let last = state.last_report.read().await;
    last.clone()
        .map(Json)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "no scan has completed yet"))
}

/// POST /api/scan
///
/// Body is optional; `{"timeframes": ["1h", "4h"]}` overrides the defaults.
pub async fn post_scan(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<GroupedReport>, ApiError> {
    let request: ScanRequest = if body.iter().all(u8::is_ascii_whitespace) {
        ScanRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| {
            api_error(StatusCode::UNPROCESSABLE_ENTITY, format!("invalid scan request: {e}"))
        })?
    };

    let timeframes = match request.timeframes {
        Some(tfs) if tfs.is_empty() => {
            return Err(api_error(StatusCode::BAD_REQUEST, "timeframes must not be empty"));
        }
        Some(tfs) => tfs,
        None => state.default_timeframes.clone(),
    };

    let Ok(_guard) = state.scan_lock.try_lock() else {
        warn!("Scan requested while another is running");
        return Err(api_error(StatusCode::CONFLICT, "a scan is already running"));
    };

    info!(timeframes = ?timeframes, "Scan requested over HTTP");
    let report = GroupedReport::from(state.screener.run_scan(&timeframes).await);
    *state.last_report.write().await = Some(report.clone());
    Ok(Json(report))
}
