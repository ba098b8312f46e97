use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;

use crate::middleware::{ApiResponse, ApiResult};
use crate::platform::PlatformStatus;
use crate::server::AppState;

/// GET /health - Gateway liveness plus the last observed platform status
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();
    let platform = state.platform.current().await;

    (
        axum::http::StatusCode::OK,
        Json(json!({
            "success": true,
            "data": {
                "status": "ok",
                "timestamp": now,
                "platform_operational": platform.status.operational,
                "platform_status_loading": platform.loading
            }
        })),
    )
}

/// GET /platform/status - Global operational flag and maintenance message
///
/// Public: clients poll this to drive the maintenance screen. The gateway
/// serves its cached value; it never blocks a request on an upstream fetch.
pub async fn status(State(state): State<AppState>) -> ApiResult<PlatformStatus> {
    let platform = state.platform.current().await;
    Ok(ApiResponse::success(platform.status))
}
