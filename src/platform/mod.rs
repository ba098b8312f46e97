use std::sync::RwLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config;

/// Global operational flag, independent of any individual user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformStatus {
    pub operational: bool,
    pub message: Option<String>,
}

impl PlatformStatus {
    pub fn operational() -> Self {
        Self {
            operational: true,
            message: None,
        }
    }

    pub fn down(message: impl Into<String>) -> Self {
        Self {
            operational: false,
            message: Some(message.into()),
        }
    }
}

/// Status as the gate sees it. While the first poll is still in flight the
/// gate is optimistic: only a positive "down" signal blocks the app.
#[derive(Debug, Clone)]
pub struct PlatformState {
    pub loading: bool,
    pub status: PlatformStatus,
}

impl PlatformState {
    pub fn loading() -> Self {
        Self {
            loading: true,
            status: PlatformStatus::operational(),
        }
    }

    pub fn resolved(status: PlatformStatus) -> Self {
        Self {
            loading: false,
            status,
        }
    }
}

#[async_trait]
pub trait PlatformSource: Send + Sync {
    async fn current(&self) -> PlatformState;
}

/// Polls the backend status endpoint on an interval and serves the last
/// observed value. A failed poll keeps the prior value; an app-wide lockout
/// must come from an explicit "down" response, never from a status outage.
pub struct PolledPlatformSource {
    client: reqwest::Client,
    url: String,
    state: RwLock<PlatformState>,
}

impl PolledPlatformSource {
    pub fn new() -> Self {
        let cfg = config::config();
        Self::with_endpoint(
            format!(
                "{}/internal/platform/status",
                cfg.backend.base_url.trim_end_matches('/')
            ),
            cfg.backend.request_timeout_secs,
        )
    }

    pub fn with_endpoint(url: impl Into<String>, timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            client,
            url: url.into(),
            state: RwLock::new(PlatformState::loading()),
        }
    }

    /// Fetch once and fold the result into the cached state.
    pub async fn poll_once(&self) {
        match self.fetch().await {
            Ok(status) => {
                let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
                *state = PlatformState::resolved(status);
            }
            Err(e) => {
                tracing::warn!("platform status poll failed, keeping last value: {}", e);
                let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
                // First poll failing still counts as resolved: fail open
                if state.loading {
                    *state = PlatformState::resolved(PlatformStatus::operational());
                }
            }
        }
    }

    /// Run the poll loop forever. Spawned as a background task at startup.
    pub async fn run(&self) {
        let interval_secs = config::config().platform.poll_interval_secs;
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(interval_secs));
        loop {
            interval.tick().await;
            self.poll_once().await;
        }
    }

    async fn fetch(&self) -> Result<PlatformStatus, reqwest::Error> {
        #[derive(Deserialize)]
        struct Envelope {
            data: PlatformStatus,
        }

        let res = self.client.get(&self.url).send().await?;
        let body: Envelope = res.error_for_status()?.json().await?;
        Ok(body.data)
    }
}

impl Default for PolledPlatformSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PlatformSource for PolledPlatformSource {
    async fn current(&self) -> PlatformState {
        self.state.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

/// Fixed status for tests and fixture mode. Mutable so a test can take the
/// platform down mid-run.
pub struct StaticPlatformSource {
    state: RwLock<PlatformState>,
}

impl StaticPlatformSource {
    pub fn operational() -> Self {
        Self {
            state: RwLock::new(PlatformState::resolved(PlatformStatus::operational())),
        }
    }

    pub fn set(&self, status: PlatformStatus) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        *state = PlatformState::resolved(status);
    }
}

#[async_trait]
impl PlatformSource for StaticPlatformSource {
    async fn current(&self) -> PlatformState {
        self.state.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn failed_poll_fails_open() {
        // Port 1 refuses the connection, so the first poll fails fast.
        let source =
            PolledPlatformSource::with_endpoint("http://127.0.0.1:1/internal/platform/status", 1);
        assert!(source.current().await.loading);

        source.poll_once().await;
        let state = source.current().await;
        assert!(!state.loading);
        assert!(state.status.operational, "a status outage must not read as down");
    }

    #[tokio::test]
    async fn static_source_flips() {
        let source = StaticPlatformSource::operational();
        assert!(source.current().await.status.operational);

        source.set(PlatformStatus::down("scheduled maintenance"));
        let state = source.current().await;
        assert!(!state.status.operational);
        assert_eq!(state.status.message.as_deref(), Some("scheduled maintenance"));
    }
}
