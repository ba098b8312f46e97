use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, CurrentSession};
use crate::profile::Profile;
use crate::server::AppState;
use crate::session::Session;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    /// Browser context the session belongs to. A second login from the same
    /// context replaces the first session.
    pub context_id: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub refresh_token: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

impl From<Session> for SessionResponse {
    fn from(s: Session) -> Self {
        Self {
            token: s.access_token,
            refresh_token: s.refresh_token,
            user_id: s.user_id,
            expires_at: s.expires_at,
        }
    }
}

/// POST /auth/login - Authenticate and receive a session token
///
/// Expected Input:
/// ```json
/// {
///   "username": "string",     // Required
///   "password": "string",     // Required
///   "context_id": "string"    // Required: browser context identifier
/// }
/// ```
///
/// Expected Output (Success):
/// ```json
/// {
///   "success": true,
///   "data": {
///     "token": "eyJhbGciOiJIUzI1NiI...",
///     "refresh_token": "uuid",
///     "user_id": "user_uuid",
///     "expires_at": "2025-01-01T00:00:00Z"
///   }
/// }
/// ```
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<SessionResponse> {
    if payload.username.trim().is_empty() || payload.context_id.trim().is_empty() {
        return Err(ApiError::bad_request("username and context_id are required"));
    }

    let user_id = state
        .credentials
        .authenticate(&payload.username, &payload.password)
        .await?;

    let session = state.sessions.login(user_id, &payload.context_id)?;
    tracing::info!(user = %user_id, context = %payload.context_id, "session created");

    Ok(ApiResponse::created(session.into()))
}

/// PUT /auth/refresh - Exchange a refresh token for a renewed session
///
/// The refresh token is single-use; both tokens rotate on success.
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> ApiResult<SessionResponse> {
    let session = state.sessions.refresh(&payload.refresh_token)?;
    Ok(ApiResponse::success(session.into()))
}

#[derive(Debug, Serialize)]
pub struct WhoamiResponse {
    pub user_id: Uuid,
    pub context_id: String,
    pub expires_at: DateTime<Utc>,
    pub profile: Option<Profile>,
}

/// GET /api/auth/whoami - Current session and profile
///
/// The profile half comes from the backend; if that fetch fails the session
/// half is still returned with `profile: null` so the client can retry.
pub async fn whoami(
    State(state): State<AppState>,
    Extension(CurrentSession(session)): Extension<CurrentSession>,
) -> ApiResult<WhoamiResponse> {
    let profile = match state.profiles.fetch(session.user_id).await {
        Ok(p) => Some(p),
        Err(e) => {
            tracing::warn!(user = %session.user_id, "whoami profile fetch failed: {}", e);
            None
        }
    };

    Ok(ApiResponse::success(WhoamiResponse {
        user_id: session.user_id,
        context_id: session.context_id,
        expires_at: session.expires_at,
        profile,
    }))
}

/// DELETE /api/auth/session - Log out, revoking the session
pub async fn logout(
    State(state): State<AppState>,
    Extension(CurrentSession(session)): Extension<CurrentSession>,
) -> ApiResult<()> {
    state.sessions.logout(session.session_id);
    tracing::info!(user = %session.user_id, "session revoked");
    Ok(ApiResponse::<()>::no_content())
}
