//! Navigation orchestration: loads the async inputs a gate decision needs,
//! then runs the pure resolver in `gates`. Each browser context carries an
//! epoch counter so a navigation superseded by a newer one from the same
//! context discards its outcome instead of firing a stale redirect.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::gates::{self, NavSnapshot, NavState};
use crate::platform::PlatformSource;
use crate::profile::{ProfileSource, ProfileState};
use crate::routes::RouteTable;
use crate::session::SessionState;

/// Handle for one in-flight navigation. Valid until the same context
/// begins another navigation.
#[derive(Debug, Clone)]
pub struct NavigationTicket {
    context_id: String,
    epoch: u64,
    pub path: String,
}

pub struct NavigationController {
    table: Arc<RouteTable>,
    profiles: Arc<dyn ProfileSource>,
    platform: Arc<dyn PlatformSource>,
    epochs: RwLock<HashMap<String, u64>>,
}

impl NavigationController {
    pub fn new(
        table: Arc<RouteTable>,
        profiles: Arc<dyn ProfileSource>,
        platform: Arc<dyn PlatformSource>,
    ) -> Self {
        Self {
            table,
            profiles,
            platform,
            epochs: RwLock::new(HashMap::new()),
        }
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Start a navigation for a context, invalidating any still-pending one
    /// from the same context.
    pub fn begin(&self, context_id: &str, path: &str) -> NavigationTicket {
        let mut epochs = self.epochs.write().unwrap_or_else(|e| e.into_inner());
        let epoch = epochs
            .entry(context_id.to_string())
            .and_modify(|e| *e += 1)
            .or_insert(1);

        NavigationTicket {
            context_id: context_id.to_string(),
            epoch: *epoch,
            path: path.to_string(),
        }
    }

    pub fn is_current(&self, ticket: &NavigationTicket) -> bool {
        let epochs = self.epochs.read().unwrap_or_else(|e| e.into_inner());
        epochs.get(&ticket.context_id) == Some(&ticket.epoch)
    }

    /// Load profile and platform state for the given session, then resolve.
    /// Returns `None` when the ticket was superseded while its inputs were
    /// loading; the caller must not act on a discarded navigation.
    pub async fn resolve(
        &self,
        ticket: &NavigationTicket,
        session: SessionState,
    ) -> Option<NavState> {
        let snap = self.load_snapshot(session).await;

        if !self.is_current(ticket) {
            tracing::debug!(path = %ticket.path, "navigation superseded, outcome discarded");
            return None;
        }

        Some(gates::resolve(&self.table, &ticket.path, &snap))
    }

    /// Resolve without cancellation bookkeeping, for callers with no stable
    /// context to track (anonymous, one-shot). Registering a throwaway
    /// context would grow the epoch map by one entry per request while
    /// cancelling nothing.
    pub async fn resolve_detached(&self, path: &str, session: SessionState) -> NavState {
        let snap = self.load_snapshot(session).await;
        gates::resolve(&self.table, path, &snap)
    }

    async fn load_snapshot(&self, session: SessionState) -> NavSnapshot {
        let profile = match session.session() {
            Some(s) => match self.profiles.fetch(s.user_id).await {
                Ok(p) => ProfileState::loaded(p),
                Err(e) => {
                    tracing::warn!(user = %s.user_id, "profile fetch failed: {}", e);
                    ProfileState::failed(e.to_string())
                }
            },
            None => ProfileState::absent(),
        };

        let platform = self.platform.current().await;

        NavSnapshot {
            platform,
            session,
            profile,
        }
    }

    #[cfg(test)]
    fn tracked_contexts(&self) -> usize {
        self.epochs.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::StaticPlatformSource;
    use crate::profile::FixtureProfileSource;
    use crate::routes::table::application_routes;

    fn controller() -> NavigationController {
        NavigationController::new(
            Arc::new(application_routes()),
            Arc::new(FixtureProfileSource::seeded()),
            Arc::new(StaticPlatformSource::operational()),
        )
    }

    #[tokio::test]
    async fn resolves_current_navigation() {
        let nav = controller();
        let ticket = nav.begin("ctx-a", "/login");

        let state = nav.resolve(&ticket, SessionState::Absent).await;
        assert!(matches!(state, Some(NavState::Rendered { .. })));
    }

    #[tokio::test]
    async fn superseded_navigation_is_discarded() {
        let nav = controller();
        let stale = nav.begin("ctx-a", "/dashboard");
        let fresh = nav.begin("ctx-a", "/watch");

        assert!(!nav.is_current(&stale));
        assert!(nav.resolve(&stale, SessionState::Absent).await.is_none());
        assert!(nav.resolve(&fresh, SessionState::Absent).await.is_some());
    }

    #[tokio::test]
    async fn detached_resolution_tracks_no_context() {
        let nav = controller();

        let state = nav.resolve_detached("/login", SessionState::Absent).await;
        assert!(matches!(state, NavState::Rendered { .. }));
        assert_eq!(nav.tracked_contexts(), 0);
    }

    #[tokio::test]
    async fn contexts_do_not_cancel_each_other() {
        let nav = controller();
        let a = nav.begin("ctx-a", "/dashboard");
        let b = nav.begin("ctx-b", "/watch");

        assert!(nav.is_current(&a));
        assert!(nav.resolve(&a, SessionState::Absent).await.is_some());
        assert!(nav.resolve(&b, SessionState::Absent).await.is_some());
    }
}
