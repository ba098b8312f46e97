use axum::{extract::State, http::HeaderMap, Json};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::gates::NavState;
use crate::middleware::{self, ApiResponse, ApiResult};
use crate::server::AppState;
use crate::session::SessionState;

#[derive(Debug, Deserialize)]
pub struct NavigateRequest {
    pub path: String,
    /// Browser context for cancellation bookkeeping. Falls back to the
    /// session's context; with neither, the navigation resolves one-shot
    /// with no cancellation tracking.
    pub context_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NavigateResponse {
    pub path: String,
    #[serde(flatten)]
    pub outcome: NavState,
    /// Redirect outcomes must be applied with replace semantics: a failed
    /// gate must not leave a back-button trap into the blocked page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replace: Option<bool>,
}

/// POST /api/navigate - Resolve a navigation to a gate decision
///
/// Accepts both anonymous and authenticated callers; an expired or revoked
/// bearer token resolves like an absent session (the decision will be the
/// login redirect for gated routes).
///
/// Expected Input:
/// ```json
/// { "path": "/admin/dashboard", "context_id": "tab-1" }
/// ```
///
/// Expected Output (Success):
/// ```json
/// {
///   "success": true,
///   "data": {
///     "path": "/admin/dashboard",
///     "state": "permission_redirect",
///     "to": "/dashboard",
///     "replace": true
///   }
/// }
/// ```
pub async fn navigate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<NavigateRequest>,
) -> ApiResult<NavigateResponse> {
    if !payload.path.starts_with('/') {
        return Err(ApiError::bad_request("path must start with '/'"));
    }

    let session = middleware::resolve_session(&state.sessions, &headers);

    let context_id = payload.context_id.clone().or_else(|| match &session {
        SessionState::Present(s) => Some(s.context_id.clone()),
        _ => None,
    });

    let outcome = match context_id {
        Some(ctx) => {
            let ticket = state.navigator.begin(&ctx, &payload.path);
            state
                .navigator
                .resolve(&ticket, session)
                .await
                .ok_or_else(|| ApiError::conflict("navigation superseded by a newer one"))?
        }
        None => state.navigator.resolve_detached(&payload.path, session).await,
    };

    let replace = outcome.redirect_target().map(|_| true);

    Ok(ApiResponse::success(NavigateResponse {
        path: payload.path,
        outcome,
        replace,
    }))
}
