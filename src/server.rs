use std::sync::Arc;

use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config;
use crate::handlers;
use crate::middleware::session_auth;
use crate::navigation::NavigationController;
use crate::platform::{PlatformSource, PolledPlatformSource, StaticPlatformSource};
use crate::profile::{CredentialSource, FixtureProfileSource, HttpProfileSource, ProfileSource};
use crate::routes::{table::application_routes, RouteTable};
use crate::session::SessionStore;

/// Everything the handlers need, dependency-injected so tests can swap the
/// sources for fixtures. Session and profile state have a single owner each;
/// gates and handlers only read through these handles.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionStore>,
    pub credentials: Arc<dyn CredentialSource>,
    pub profiles: Arc<dyn ProfileSource>,
    pub platform: Arc<dyn PlatformSource>,
    pub navigator: Arc<NavigationController>,
    pub table: Arc<RouteTable>,
    /// Concrete handle for the poll loop; `None` in fixture mode and tests.
    poller: Option<Arc<PolledPlatformSource>>,
}

impl AppState {
    /// Wire up sources per config: the real backend client, or the seeded
    /// in-memory fixtures when fixture mode is on.
    pub fn from_config() -> Self {
        if config::config().backend.fixture_mode {
            tracing::info!("fixture mode: serving in-memory profiles and platform status");
            let fixtures = Arc::new(FixtureProfileSource::seeded());
            let platform = Arc::new(StaticPlatformSource::operational());
            Self::assemble(fixtures.clone(), fixtures, platform, None)
        } else {
            let backend = Arc::new(HttpProfileSource::new());
            let polled = Arc::new(PolledPlatformSource::new());
            Self::assemble(backend.clone(), backend, polled.clone(), Some(polled))
        }
    }

    pub fn with_sources(
        credentials: Arc<dyn CredentialSource>,
        profiles: Arc<dyn ProfileSource>,
        platform: Arc<dyn PlatformSource>,
    ) -> Self {
        Self::assemble(credentials, profiles, platform, None)
    }

    fn assemble(
        credentials: Arc<dyn CredentialSource>,
        profiles: Arc<dyn ProfileSource>,
        platform: Arc<dyn PlatformSource>,
        poller: Option<Arc<PolledPlatformSource>>,
    ) -> Self {
        let table = Arc::new(application_routes());
        let navigator = Arc::new(NavigationController::new(
            table.clone(),
            profiles.clone(),
            platform.clone(),
        ));

        Self {
            sessions: Arc::new(SessionStore::new()),
            credentials,
            profiles,
            platform,
            navigator,
            table,
            poller,
        }
    }

    /// Start the platform status poll loop, if this state has one.
    pub fn spawn_platform_poller(&self) {
        if let Some(polled) = self.poller.clone() {
            tokio::spawn(async move { polled.run().await });
        }
    }
}

pub fn app(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/auth/whoami", get(handlers::session::whoami))
        .route("/api/auth/session", delete(handlers::session::logout))
        .layer(from_fn_with_state(state.clone(), session_auth));

    let mut router = Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(handlers::platform::health))
        .route("/platform/status", get(handlers::platform::status))
        // Public auth routes
        .route("/auth/login", post(handlers::session::login))
        .route("/auth/refresh", put(handlers::session::refresh))
        // Navigation resolution (anonymous or authenticated)
        .route("/api/navigate", post(handlers::navigate::navigate))
        .merge(protected);

    // Global middleware
    if config::config().security.enable_cors {
        router = router.layer(CorsLayer::permissive());
    }
    router.layer(TraceLayer::new_for_http()).with_state(state)
}

async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Backlot Gateway",
            "version": version,
            "description": "Route access-control gateway for the Backlot media production platform",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "platform": "/platform/status (public)",
                "public_auth": "/auth/login, /auth/refresh (public - token acquisition)",
                "auth": "/api/auth/* (protected - session management)",
                "navigate": "/api/navigate (anonymous or authenticated)",
            }
        }
    }))
}
