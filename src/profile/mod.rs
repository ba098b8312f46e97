use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config;

/// Named capabilities a profile can hold. Closed set: a role name that is
/// not listed here cannot appear in a route policy, so a typo fails to
/// compile instead of silently denying at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Filmmaker,
    Partner,
    Crm,
    Order,
    Gear,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::Admin,
        Role::Filmmaker,
        Role::Partner,
        Role::Crm,
        Role::Order,
        Role::Gear,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Filmmaker => "filmmaker",
            Role::Partner => "partner",
            Role::Crm => "crm",
            Role::Order => "order",
            Role::Gear => "gear",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionTier {
    Free,
    Member,
    Pro,
}

/// The authenticated user's platform metadata, distinct from the raw
/// session/token. Fetched from the backend once a session exists and
/// re-fetched on mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: Uuid,
    pub roles: HashSet<Role>,
    pub subscription: SubscriptionTier,
    pub onboarding_complete: bool,
}

impl Profile {
    pub fn has_any_role(&self, required: &[Role]) -> bool {
        required.iter().any(|r| self.roles.contains(r))
    }
}

/// Profile as the gates see it. Loading and error are distinct from absence:
/// a redirect must never be decided off a profile that has not resolved.
#[derive(Debug, Clone, Default)]
pub struct ProfileState {
    pub loading: bool,
    pub profile: Option<Profile>,
    pub error: Option<String>,
}

impl ProfileState {
    pub fn loading() -> Self {
        Self {
            loading: true,
            ..Default::default()
        }
    }

    /// No session, so no profile to fetch.
    pub fn absent() -> Self {
        Self::default()
    }

    pub fn loaded(profile: Profile) -> Self {
        Self {
            loading: false,
            profile: Some(profile),
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            loading: false,
            profile: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{0}")]
    NotFound(String),
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("backend error: {0}")]
    Backend(String),
}

/// Verifies login credentials against the backend user directory.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn authenticate(&self, username: &str, password: &str) -> Result<Uuid, SourceError>;
}

/// Fetches the profile for an authenticated identity, keyed by user id.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    async fn fetch(&self, user_id: Uuid) -> Result<Profile, SourceError>;
}

/// Backend-API-backed implementation of both source traits.
pub struct HttpProfileSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpProfileSource {
    pub fn new() -> Self {
        let cfg = config::config();
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(cfg.backend.request_timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: cfg.backend.base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl Default for HttpProfileSource {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct AuthenticateData {
    user_id: Uuid,
}

#[async_trait]
impl CredentialSource for HttpProfileSource {
    async fn authenticate(&self, username: &str, password: &str) -> Result<Uuid, SourceError> {
        let url = format!("{}/internal/auth/verify", self.base_url);
        let res = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "username": username, "password": password }))
            .send()
            .await
            .map_err(|e| SourceError::Backend(e.to_string()))?;

        let status = res.status();
        if status.is_success() {
            let body: Envelope<AuthenticateData> = res
                .json()
                .await
                .map_err(|e| SourceError::Backend(e.to_string()))?;
            Ok(body.data.user_id)
        } else if status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::FORBIDDEN
        {
            Err(SourceError::InvalidCredentials)
        } else {
            Err(SourceError::Backend(format!("verify returned {}", status)))
        }
    }
}

#[async_trait]
impl ProfileSource for HttpProfileSource {
    async fn fetch(&self, user_id: Uuid) -> Result<Profile, SourceError> {
        let url = format!("{}/internal/profiles/{}", self.base_url, user_id);
        let res = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SourceError::Backend(e.to_string()))?;

        let status = res.status();
        if status.is_success() {
            let body: Envelope<Profile> = res
                .json()
                .await
                .map_err(|e| SourceError::Backend(e.to_string()))?;
            Ok(body.data)
        } else if status == reqwest::StatusCode::NOT_FOUND {
            Err(SourceError::NotFound(format!("no profile for user {}", user_id)))
        } else {
            Err(SourceError::Backend(format!(
                "profile fetch returned {}",
                status
            )))
        }
    }
}

/// In-memory implementation used by tests and fixture mode. Seeded with one
/// user per interesting role shape; all fixture passwords are "backlot".
pub struct FixtureProfileSource {
    users: RwLock<HashMap<String, Profile>>,
}

pub const FIXTURE_PASSWORD: &str = "backlot";

impl FixtureProfileSource {
    pub fn seeded() -> Self {
        let mut users = HashMap::new();
        users.insert(
            "ada.admin".to_string(),
            fixture_profile(&[Role::Admin, Role::Filmmaker], SubscriptionTier::Pro, true),
        );
        users.insert(
            "frank.filmmaker".to_string(),
            fixture_profile(&[Role::Filmmaker], SubscriptionTier::Member, true),
        );
        users.insert(
            "nina.newcomer".to_string(),
            fixture_profile(&[Role::Filmmaker], SubscriptionTier::Free, false),
        );
        users.insert(
            "paula.partner".to_string(),
            fixture_profile(&[Role::Partner, Role::Filmmaker], SubscriptionTier::Pro, true),
        );
        users.insert(
            "carl.crm".to_string(),
            fixture_profile(&[Role::Crm], SubscriptionTier::Member, true),
        );

        Self {
            users: RwLock::new(users),
        }
    }

    pub fn insert(&self, username: &str, profile: Profile) {
        let mut users = self.users.write().unwrap_or_else(|e| e.into_inner());
        users.insert(username.to_string(), profile);
    }
}

fn fixture_profile(roles: &[Role], subscription: SubscriptionTier, onboarded: bool) -> Profile {
    Profile {
        user_id: Uuid::new_v4(),
        roles: roles.iter().copied().collect(),
        subscription,
        onboarding_complete: onboarded,
    }
}

#[async_trait]
impl CredentialSource for FixtureProfileSource {
    async fn authenticate(&self, username: &str, password: &str) -> Result<Uuid, SourceError> {
        if password != FIXTURE_PASSWORD {
            return Err(SourceError::InvalidCredentials);
        }
        let users = self.users.read().unwrap_or_else(|e| e.into_inner());
        users
            .get(username)
            .map(|p| p.user_id)
            .ok_or(SourceError::InvalidCredentials)
    }
}

#[async_trait]
impl ProfileSource for FixtureProfileSource {
    async fn fetch(&self, user_id: Uuid) -> Result<Profile, SourceError> {
        let users = self.users.read().unwrap_or_else(|e| e.into_inner());
        users
            .values()
            .find(|p| p.user_id == user_id)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(format!("no profile for user {}", user_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixture_authenticate_and_fetch() {
        let source = FixtureProfileSource::seeded();
        let user_id = source
            .authenticate("frank.filmmaker", FIXTURE_PASSWORD)
            .await
            .expect("auth");

        let profile = source.fetch(user_id).await.expect("profile");
        assert!(profile.roles.contains(&Role::Filmmaker));
        assert!(profile.onboarding_complete);
        assert!(!profile.roles.is_empty(), "authenticated role set is never empty");
    }

    #[tokio::test]
    async fn fixture_rejects_bad_password() {
        let source = FixtureProfileSource::seeded();
        assert!(matches!(
            source.authenticate("frank.filmmaker", "wrong").await,
            Err(SourceError::InvalidCredentials)
        ));
    }

    #[test]
    fn role_intersection() {
        let profile = fixture_profile(&[Role::Filmmaker], SubscriptionTier::Free, true);
        assert!(profile.has_any_role(&[Role::Filmmaker, Role::Admin]));
        assert!(!profile.has_any_role(&[Role::Admin]));
        assert!(!profile.has_any_role(&[]));
    }
}
