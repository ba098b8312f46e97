use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::auth::{self, Claims, JwtError};
use crate::config;

/// An authenticated session: identity reference plus token lifecycle state.
#[derive(Debug, Clone)]
pub struct Session {
    pub session_id: Uuid,
    pub user_id: Uuid,
    /// Browser context (tab/device) this session belongs to. At most one
    /// active session exists per context; a new login evicts the old one.
    pub context_id: String,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

/// What the gates see. `Loading` must never produce a redirect decision.
#[derive(Debug, Clone)]
pub enum SessionState {
    Loading,
    Absent,
    Present(Session),
}

impl SessionState {
    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::Present(s) => Some(s),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid session token: {0}")]
    InvalidToken(String),
    #[error("session expired")]
    Expired,
    #[error("session revoked")]
    Revoked,
    #[error(transparent)]
    Jwt(#[from] JwtError),
}

/// Process-wide session registry. Mutation happens only through the explicit
/// operations here; gates read a consistent snapshot via `resolve`.
#[derive(Debug, Default)]
pub struct SessionStore {
    inner: RwLock<StoreInner>,
}

#[derive(Debug, Default)]
struct StoreInner {
    by_id: HashMap<Uuid, Session>,
    by_context: HashMap<String, Uuid>,
    by_refresh: HashMap<String, Uuid>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session for an authenticated identity. Any existing session
    /// for the same browser context is evicted first.
    pub fn login(&self, user_id: Uuid, context_id: &str) -> Result<Session, SessionError> {
        let session = Self::mint(user_id, context_id)?;

        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        if let Some(old_id) = inner.by_context.remove(context_id) {
            if let Some(old) = inner.by_id.remove(&old_id) {
                inner.by_refresh.remove(&old.refresh_token);
                tracing::debug!(context = context_id, "evicted prior session for context");
            }
        }
        inner.by_context.insert(context_id.to_string(), session.session_id);
        inner
            .by_refresh
            .insert(session.refresh_token.clone(), session.session_id);
        inner.by_id.insert(session.session_id, session.clone());

        Ok(session)
    }

    /// Exchange a refresh token for a fresh session. The session id is
    /// preserved; both tokens rotate.
    pub fn refresh(&self, refresh_token: &str) -> Result<Session, SessionError> {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());

        let session_id = *inner
            .by_refresh
            .get(refresh_token)
            .ok_or(SessionError::Revoked)?;
        let old = inner.by_id.get(&session_id).ok_or(SessionError::Revoked)?.clone();

        let mut renewed = Self::mint(old.user_id, &old.context_id)?;
        renewed.session_id = session_id;

        inner.by_refresh.remove(refresh_token);
        inner
            .by_refresh
            .insert(renewed.refresh_token.clone(), session_id);
        inner.by_id.insert(session_id, renewed.clone());

        Ok(renewed)
    }

    /// Tear down a session. Idempotent.
    pub fn logout(&self, session_id: Uuid) {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        if let Some(session) = inner.by_id.remove(&session_id) {
            inner.by_context.remove(&session.context_id);
            inner.by_refresh.remove(&session.refresh_token);
        }
    }

    /// Resolve an access token to its live session. Fails if the token is
    /// malformed, the session was logged out, or it has expired. An expired
    /// session is evicted on detection; it can never resolve again, so its
    /// entries would otherwise sit in the maps until process exit.
    pub fn resolve(&self, access_token: &str) -> Result<Session, SessionError> {
        let claims =
            auth::validate_jwt(access_token).map_err(|e| SessionError::InvalidToken(e.to_string()))?;

        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let expired = inner
            .by_id
            .get(&claims.session_id)
            .ok_or(SessionError::Revoked)?
            .is_expired();

        if expired {
            if let Some(dead) = inner.by_id.remove(&claims.session_id) {
                inner.by_context.remove(&dead.context_id);
                inner.by_refresh.remove(&dead.refresh_token);
            }
            return Err(SessionError::Expired);
        }

        let session = inner
            .by_id
            .get(&claims.session_id)
            .ok_or(SessionError::Revoked)?;
        if session.access_token != access_token {
            // Token predates a refresh for the same session
            return Err(SessionError::Revoked);
        }

        Ok(session.clone())
    }

    pub fn get(&self, session_id: Uuid) -> Option<Session> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.by_id.get(&session_id).cloned()
    }

    #[cfg(test)]
    fn install(&self, session: Session) {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner
            .by_context
            .insert(session.context_id.clone(), session.session_id);
        inner
            .by_refresh
            .insert(session.refresh_token.clone(), session.session_id);
        inner.by_id.insert(session.session_id, session);
    }

    fn mint(user_id: Uuid, context_id: &str) -> Result<Session, SessionError> {
        let session_id = Uuid::new_v4();
        let claims = Claims::new(session_id, user_id, context_id.to_string());
        let access_token = auth::generate_jwt(&claims)?;
        let expiry_hours = config::config().security.jwt_expiry_hours;

        Ok(Session {
            session_id,
            user_id,
            context_id: context_id.to_string(),
            access_token,
            refresh_token: Uuid::new_v4().to_string(),
            expires_at: Utc::now() + Duration::hours(expiry_hours as i64),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_then_resolve() {
        let store = SessionStore::new();
        let user = Uuid::new_v4();

        let session = store.login(user, "ctx-a").expect("login");
        let resolved = store.resolve(&session.access_token).expect("resolve");
        assert_eq!(resolved.user_id, user);
        assert_eq!(resolved.session_id, session.session_id);
    }

    #[test]
    fn one_session_per_context() {
        let store = SessionStore::new();
        let first = store.login(Uuid::new_v4(), "ctx-a").expect("login");
        let second = store.login(Uuid::new_v4(), "ctx-a").expect("login");

        assert!(matches!(
            store.resolve(&first.access_token),
            Err(SessionError::Revoked)
        ));
        assert!(store.resolve(&second.access_token).is_ok());
    }

    #[test]
    fn distinct_contexts_coexist() {
        let store = SessionStore::new();
        let a = store.login(Uuid::new_v4(), "ctx-a").expect("login");
        let b = store.login(Uuid::new_v4(), "ctx-b").expect("login");

        assert!(store.resolve(&a.access_token).is_ok());
        assert!(store.resolve(&b.access_token).is_ok());
    }

    #[test]
    fn logout_revokes() {
        let store = SessionStore::new();
        let session = store.login(Uuid::new_v4(), "ctx-a").expect("login");

        store.logout(session.session_id);
        assert!(matches!(
            store.resolve(&session.access_token),
            Err(SessionError::Revoked)
        ));

        // idempotent
        store.logout(session.session_id);
    }

    #[test]
    fn expired_session_is_evicted_on_resolve() {
        let store = SessionStore::new();
        let mut session = SessionStore::mint(Uuid::new_v4(), "ctx-a").expect("mint");
        session.expires_at = Utc::now() - Duration::minutes(1);
        store.install(session.clone());

        assert!(matches!(
            store.resolve(&session.access_token),
            Err(SessionError::Expired)
        ));

        // The entries are gone: a second resolve reports revoked, the
        // refresh token no longer exchanges, and the context is free again.
        assert!(matches!(
            store.resolve(&session.access_token),
            Err(SessionError::Revoked)
        ));
        assert!(store.refresh(&session.refresh_token).is_err());
        assert!(store.get(session.session_id).is_none());
    }

    #[test]
    fn refresh_rotates_tokens() {
        let store = SessionStore::new();
        let session = store.login(Uuid::new_v4(), "ctx-a").expect("login");

        let renewed = store.refresh(&session.refresh_token).expect("refresh");
        assert_eq!(renewed.session_id, session.session_id);
        assert_ne!(renewed.refresh_token, session.refresh_token);

        // old refresh token is single-use
        assert!(store.refresh(&session.refresh_token).is_err());
        // old access token no longer resolves
        assert!(store.resolve(&session.access_token).is_err());
        assert!(store.resolve(&renewed.access_token).is_ok());
    }
}
