use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::error::ApiError;
use crate::server::AppState;
use crate::session::{Session, SessionState, SessionStore};

/// Live session for the authenticated caller, injected by `session_auth`.
#[derive(Clone, Debug)]
pub struct CurrentSession(pub Session);

/// Middleware for protected routes: resolves the bearer token against the
/// session store (so logout actually revokes) and injects the session.
pub async fn session_auth(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(&headers).map_err(ApiError::unauthorized)?;
    let session = state.sessions.resolve(&token)?;

    request.extensions_mut().insert(CurrentSession(session));
    Ok(next.run(request).await)
}

/// Session state for endpoints that serve both anonymous and authenticated
/// callers. A missing header is an absent session; a token that no longer
/// resolves is treated the same way, since the correct client reaction to
/// either is the login redirect, not an error page.
pub fn resolve_session(store: &SessionStore, headers: &HeaderMap) -> SessionState {
    match extract_bearer_token(headers) {
        Err(_) => SessionState::Absent,
        Ok(token) => match store.resolve(&token) {
            Ok(session) => SessionState::Present(session),
            Err(e) => {
                tracing::debug!("stale session token treated as anonymous: {}", e);
                SessionState::Absent
            }
        },
    }
}

/// Extract the bearer token from the Authorization header
fn extract_bearer_token(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get("authorization")
        .or_else(|| headers.get("Authorization"))
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    if let Some(token) = auth_str.strip_prefix("Bearer ") {
        if token.trim().is_empty() {
            return Err("Empty bearer token".to_string());
        }
        Ok(token.to_string())
    } else {
        Err("Authorization header must use Bearer token format".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn missing_header_is_absent() {
        let store = SessionStore::new();
        let headers = HeaderMap::new();
        assert!(matches!(
            resolve_session(&store, &headers),
            SessionState::Absent
        ));
    }

    #[test]
    fn valid_token_is_present() {
        let store = SessionStore::new();
        let session = store.login(Uuid::new_v4(), "ctx").expect("login");

        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            format!("Bearer {}", session.access_token).parse().expect("header"),
        );

        match resolve_session(&store, &headers) {
            SessionState::Present(s) => assert_eq!(s.session_id, session.session_id),
            other => panic!("expected present session, got {:?}", other),
        }
    }

    #[test]
    fn revoked_token_is_absent() {
        let store = SessionStore::new();
        let session = store.login(Uuid::new_v4(), "ctx").expect("login");
        store.logout(session.session_id);

        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            format!("Bearer {}", session.access_token).parse().expect("header"),
        );

        assert!(matches!(
            resolve_session(&store, &headers),
            SessionState::Absent
        ));
    }
}
