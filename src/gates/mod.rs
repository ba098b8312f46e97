//! The gate pipeline: the ordered access-control chain every navigation
//! passes through. Evaluation is a pure function of the route table, the
//! requested path, and a snapshot of session/profile/platform state, so
//! every outcome is reproducible and unit-testable.
//!
//! Order is fixed and significant: platform -> auth -> onboarding ->
//! permission. A later gate is never consulted once an earlier one has
//! produced a terminal outcome.

use std::collections::HashMap;

use serde::Serialize;

use crate::platform::PlatformState;
use crate::profile::ProfileState;
use crate::routes::{Layout, RouteAction, RouteEntry, RouteMatch, RouteTable};
use crate::session::SessionState;

/// Everything a navigation decision depends on, captured at one instant.
/// Gates read this snapshot only; they never reach back into live state.
#[derive(Debug, Clone)]
pub struct NavSnapshot {
    pub platform: PlatformState,
    pub session: SessionState,
    pub profile: ProfileState,
}

impl NavSnapshot {
    /// Snapshot for an anonymous visitor on a healthy platform.
    pub fn anonymous() -> Self {
        Self {
            platform: PlatformState::resolved(crate::platform::PlatformStatus::operational()),
            session: SessionState::Absent,
            profile: ProfileState::absent(),
        }
    }
}

/// A single gate's verdict for one navigation. Transient: recomputed on
/// every evaluation, never cached across navigations.
#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    Allow,
    RedirectTo(String),
    Block(String),
}

/// Terminal (or pending) state of one navigation's evaluation. Redirect
/// terminals restart the machine against the new path; the client applies
/// them with replace semantics so the blocked page never enters history.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum NavState {
    /// Inputs still loading; render a neutral affordance, decide nothing.
    Pending,
    PlatformBlocked {
        message: Option<String>,
    },
    AuthRedirect {
        to: String,
    },
    OnboardingRedirect {
        to: String,
    },
    PermissionRedirect {
        to: String,
    },
    /// Profile fetch failed where a role decision was required. Surfaced as
    /// a retryable error rather than a false redirect.
    ProfileError {
        message: String,
    },
    Rendered {
        layout: Layout,
        page: String,
        params: HashMap<String, String>,
    },
}

impl NavState {
    pub fn redirect_target(&self) -> Option<&str> {
        match self {
            NavState::AuthRedirect { to }
            | NavState::OnboardingRedirect { to }
            | NavState::PermissionRedirect { to } => Some(to),
            _ => None,
        }
    }

    /// Collapse a terminal state to the gate decision that produced it.
    /// `None` while inputs are still loading: no decision has been made.
    pub fn decision(&self) -> Option<GateDecision> {
        match self {
            NavState::Pending => None,
            NavState::Rendered { .. } => Some(GateDecision::Allow),
            NavState::AuthRedirect { to }
            | NavState::OnboardingRedirect { to }
            | NavState::PermissionRedirect { to } => Some(GateDecision::RedirectTo(to.clone())),
            NavState::PlatformBlocked { message } => Some(GateDecision::Block(
                message.clone().unwrap_or_else(|| "platform unavailable".to_string()),
            )),
            NavState::ProfileError { message } => Some(GateDecision::Block(message.clone())),
        }
    }
}

pub const LOGIN_PATH: &str = "/login";

/// Maximum redirect-alias hops followed inside a single resolution. The
/// table integrity check forbids alias chains, so one hop is the norm.
const MAX_ALIAS_HOPS: usize = 8;

/// Resolve one navigation. Alias redirects are followed internally so an
/// aliased path renders identically to its target; gate redirects are
/// returned to the caller, which starts a new navigation.
pub fn resolve(table: &RouteTable, path: &str, snap: &NavSnapshot) -> NavState {
    let mut current = path.to_string();

    for _ in 0..MAX_ALIAS_HOPS {
        // Platform gate runs first, before the path is even matched: with
        // the platform down no route renders, known or not.
        if let Some(message) = platform_gate(snap) {
            return NavState::PlatformBlocked {
                message: Some(message),
            };
        }

        let Some(matched) = table.resolve(&current) else {
            // Unreachable with a catch-all entry present; treat a missing
            // catch-all as a plain not-found rather than a crash.
            tracing::warn!(path = %current, "no route entry matched and no catch-all present");
            return NavState::Rendered {
                layout: Layout::Public,
                page: "not-found".to_string(),
                params: HashMap::new(),
            };
        };

        if let RouteAction::Redirect { to } = matched.entry.action {
            current = to.to_string();
            continue;
        }

        return evaluate_gates(&matched, &current, snap);
    }

    tracing::error!(path, "alias redirect chain exceeded {} hops", MAX_ALIAS_HOPS);
    NavState::Rendered {
        layout: Layout::Public,
        page: "not-found".to_string(),
        params: HashMap::new(),
    }
}

fn evaluate_gates(matched: &RouteMatch<'_>, path: &str, snap: &NavSnapshot) -> NavState {
    let entry = matched.entry;

    // Auth gate
    if entry.requires_auth {
        match &snap.session {
            SessionState::Loading => return NavState::Pending,
            SessionState::Absent => {
                return NavState::AuthRedirect {
                    to: LOGIN_PATH.to_string(),
                }
            }
            SessionState::Present(_) => {}
        }
    }

    // Onboarding gate: applies whenever a profile exists, not only on
    // authenticated routes. Absent profile passes through (auth enforcement
    // lives in the auth gate); fetch errors fail open.
    if !entry.onboarding_exempt {
        match onboarding_gate(&snap.profile, path) {
            OnboardingVerdict::Pending => return NavState::Pending,
            OnboardingVerdict::Redirect(to) => return NavState::OnboardingRedirect { to },
            OnboardingVerdict::Pass => {}
        }
    }

    // Permission gate: policy layers in declaration order, outer first.
    for policy in &entry.policies {
        match permission_gate(policy.required_roles, policy.redirect_to, entry, snap) {
            PermissionVerdict::Pending => return NavState::Pending,
            PermissionVerdict::Redirect(to) => {
                tracing::debug!(path, to = %to, "permission gate redirect");
                return NavState::PermissionRedirect { to };
            }
            PermissionVerdict::Error(message) => return NavState::ProfileError { message },
            PermissionVerdict::Pass => {}
        }
    }

    let RouteAction::Page { layout, page } = &entry.action else {
        unreachable!("redirect entries are resolved before gate evaluation");
    };

    NavState::Rendered {
        layout: *layout,
        page: (*page).to_string(),
        params: matched.params.clone(),
    }
}

/// `Some(message)` when the platform is positively known to be down.
/// Optimistic while the first status poll is in flight: a loading status
/// must never lock out the first paint.
fn platform_gate(snap: &NavSnapshot) -> Option<String> {
    if !snap.platform.loading && !snap.platform.status.operational {
        return Some(
            snap.platform
                .status
                .message
                .clone()
                .unwrap_or_else(|| "The platform is down for maintenance".to_string()),
        );
    }
    None
}

enum OnboardingVerdict {
    Pass,
    Pending,
    Redirect(String),
}

fn onboarding_gate(profile: &ProfileState, resume_path: &str) -> OnboardingVerdict {
    if profile.loading {
        return OnboardingVerdict::Pending;
    }
    if profile.error.is_some() {
        // Fail open: a fetch error must not trap the user in a redirect
        // loop toward onboarding. The permission gate surfaces the error
        // where a role decision actually depends on the profile.
        return OnboardingVerdict::Pass;
    }
    match &profile.profile {
        None => OnboardingVerdict::Pass,
        Some(p) if p.onboarding_complete => OnboardingVerdict::Pass,
        Some(p) => {
            // The requested path may carry its own query string; embedding
            // it verbatim would put a second '?' into the redirect target.
            let resume = resume_path.split('?').next().unwrap_or(resume_path);
            OnboardingVerdict::Redirect(format!("/onboarding/{}?resume={}", p.user_id, resume))
        }
    }
}

enum PermissionVerdict {
    Pass,
    Pending,
    Redirect(String),
    Error(String),
}

fn permission_gate(
    required: &[crate::profile::Role],
    redirect_to: &str,
    entry: &RouteEntry,
    snap: &NavSnapshot,
) -> PermissionVerdict {
    if required.is_empty() {
        return PermissionVerdict::Pass;
    }

    if snap.profile.loading {
        return PermissionVerdict::Pending;
    }

    match &snap.profile.profile {
        Some(profile) => {
            if profile.has_any_role(required) {
                PermissionVerdict::Pass
            } else {
                PermissionVerdict::Redirect(redirect_to.to_string())
            }
        }
        None => {
            if let Some(err) = &snap.profile.error {
                // A role decision is required and the inputs are broken;
                // blocking with a retry affordance beats a false redirect.
                PermissionVerdict::Error(err.clone())
            } else if entry.requires_auth {
                // Session present but profile never loaded: same treatment.
                PermissionVerdict::Error("profile unavailable".to_string())
            } else {
                PermissionVerdict::Redirect(redirect_to.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::PlatformStatus;
    use crate::profile::Role;
    use crate::routes::table::application_routes;
    use crate::testing::{authed, profile_with, session_for};
    use uuid::Uuid;

    fn rendered_page(state: &NavState) -> Option<&str> {
        match state {
            NavState::Rendered { page, .. } => Some(page),
            _ => None,
        }
    }

    // Public routes render for any session state when the platform is up
    // and no onboarding is pending.
    #[test]
    fn public_route_renders_without_session() {
        let table = application_routes();
        let state = resolve(&table, "/login", &NavSnapshot::anonymous());
        assert_eq!(rendered_page(&state), Some("login"));

        let onboarded = authed(profile_with(&[Role::Filmmaker], true));
        let state = resolve(&table, "/login", &onboarded);
        assert_eq!(rendered_page(&state), Some("login"));
    }

    #[test]
    fn role_mismatch_always_redirects_to_fallback() {
        let table = application_routes();
        let snap = authed(profile_with(&[Role::Filmmaker], true));

        let state = resolve(&table, "/admin/dashboard", &snap);
        assert_eq!(
            state,
            NavState::PermissionRedirect {
                to: "/dashboard".to_string()
            }
        );
    }

    #[test]
    fn evaluation_is_idempotent() {
        let table = application_routes();
        let snap = authed(profile_with(&[Role::Filmmaker], false));

        let first = resolve(&table, "/backlot/projects", &snap);
        let second = resolve(&table, "/backlot/projects", &snap);
        assert_eq!(first, second);
    }

    // Ancestor gate wins: incomplete onboarding AND mismatched role goes to
    // onboarding, never the permission fallback.
    #[test]
    fn onboarding_outranks_permission() {
        let table = application_routes();
        let profile = profile_with(&[Role::Filmmaker], false);
        let user_id = profile.user_id;
        let snap = authed(profile);

        let state = resolve(&table, "/admin/dashboard", &snap);
        assert_eq!(
            state,
            NavState::OnboardingRedirect {
                to: format!("/onboarding/{}?resume=/admin/dashboard", user_id)
            }
        );
    }

    #[test]
    fn platform_down_blocks_everything() {
        let table = application_routes();
        let down = PlatformState::resolved(PlatformStatus::down("maintenance window"));

        for (path, snap) in [
            ("/login", NavSnapshot::anonymous()),
            ("/dashboard", authed(profile_with(&[Role::Filmmaker], true))),
            ("/admin/dashboard", authed(profile_with(&[Role::Admin], true))),
        ] {
            let snap = NavSnapshot {
                platform: down.clone(),
                ..snap
            };
            let state = resolve(&table, path, &snap);
            assert!(
                matches!(state, NavState::PlatformBlocked { .. }),
                "{} was not blocked: {:?}",
                path,
                state
            );
        }
    }

    #[test]
    fn incomplete_onboarding_redirects_from_dashboard() {
        let table = application_routes();
        let profile = profile_with(&[Role::Filmmaker], false);
        let user_id = profile.user_id;
        let snap = authed(profile);

        let state = resolve(&table, "/dashboard", &snap);
        assert_eq!(
            state,
            NavState::OnboardingRedirect {
                to: format!("/onboarding/{}?resume=/dashboard", user_id)
            }
        );

        // The onboarding flow itself is exempt; the redirect terminates.
        let state = resolve(&table, &format!("/onboarding/{}", user_id), &snap);
        assert_eq!(rendered_page(&state), Some("onboarding/steps"));
    }

    #[test]
    fn resume_parameter_drops_the_requested_query() {
        let table = application_routes();
        let profile = profile_with(&[Role::Filmmaker], false);
        let user_id = profile.user_id;
        let snap = authed(profile);

        let state = resolve(&table, "/dashboard?tab=projects", &snap);
        match state {
            NavState::OnboardingRedirect { to } => {
                assert_eq!(to, format!("/onboarding/{}?resume=/dashboard", user_id));
                assert_eq!(to.matches('?').count(), 1);
            }
            other => panic!("expected onboarding redirect, got {:?}", other),
        }
    }

    #[test]
    fn anonymous_user_on_authenticated_route_goes_to_login() {
        let table = application_routes();
        let state = resolve(&table, "/dashboard", &NavSnapshot::anonymous());
        assert_eq!(
            state,
            NavState::AuthRedirect {
                to: LOGIN_PATH.to_string()
            }
        );
    }

    #[test]
    fn legacy_alias_renders_like_its_target() {
        let table = application_routes();
        let snap = authed(profile_with(&[Role::Filmmaker], true));

        let via_alias = resolve(&table, "/account/subscription-settings", &snap);
        let direct = resolve(&table, "/account/billing", &snap);
        assert_eq!(via_alias, direct);
        assert_eq!(rendered_page(&direct), Some("account/billing"));
    }

    #[test]
    fn unknown_path_renders_not_found_in_any_session_state() {
        let table = application_routes();

        for snap in [
            NavSnapshot::anonymous(),
            authed(profile_with(&[Role::Admin], true)),
        ] {
            let state = resolve(&table, "/this-does-not-exist", &snap);
            assert_eq!(rendered_page(&state), Some("not-found"));
        }
    }

    #[test]
    fn loading_session_is_pending_not_a_redirect() {
        let table = application_routes();
        let snap = NavSnapshot {
            platform: PlatformState::resolved(PlatformStatus::operational()),
            session: SessionState::Loading,
            profile: ProfileState::loading(),
        };
        assert_eq!(resolve(&table, "/dashboard", &snap), NavState::Pending);
    }

    #[test]
    fn loading_platform_is_optimistic() {
        let table = application_routes();
        let snap = NavSnapshot {
            platform: PlatformState::loading(),
            ..NavSnapshot::anonymous()
        };
        assert_eq!(rendered_page(&resolve(&table, "/login", &snap)), Some("login"));
    }

    #[test]
    fn profile_error_fails_open_for_onboarding_but_blocks_role_routes() {
        let table = application_routes();
        let user_id = Uuid::new_v4();
        let snap = NavSnapshot {
            platform: PlatformState::resolved(PlatformStatus::operational()),
            session: SessionState::Present(session_for(user_id)),
            profile: ProfileState::failed("backend timeout"),
        };

        // No false onboarding redirect on a plain authenticated route
        let state = resolve(&table, "/dashboard", &snap);
        assert_eq!(rendered_page(&state), Some("dashboard"));

        // A role decision cannot be made: retryable error, not a redirect
        let state = resolve(&table, "/admin/dashboard", &snap);
        assert!(matches!(state, NavState::ProfileError { .. }));
    }

    #[test]
    fn nested_policy_layers_fail_outermost_first() {
        let table = application_routes();

        // Admin without Order membership fails the outer (membership) layer
        let snap = authed(profile_with(&[Role::Admin], true));
        let state = resolve(&table, "/order/admin", &snap);
        assert_eq!(
            state,
            NavState::PermissionRedirect {
                to: "/dashboard".to_string()
            }
        );

        // Order member without admin fails the inner layer
        let snap = authed(profile_with(&[Role::Order], true));
        let state = resolve(&table, "/order/admin", &snap);
        assert_eq!(
            state,
            NavState::PermissionRedirect {
                to: "/order".to_string()
            }
        );

        // Both roles pass both layers
        let snap = authed(profile_with(&[Role::Order, Role::Admin], true));
        let state = resolve(&table, "/order/admin", &snap);
        assert_eq!(rendered_page(&state), Some("order/admin"));
    }

    #[test]
    fn role_match_renders_admin_dashboard() {
        let table = application_routes();
        let snap = authed(profile_with(&[Role::Admin], true));

        let state = resolve(&table, "/admin/dashboard", &snap);
        assert_eq!(rendered_page(&state), Some("admin/dashboard"));
    }

    #[test]
    fn terminal_states_collapse_to_gate_decisions() {
        assert_eq!(NavState::Pending.decision(), None);

        let redirect = NavState::PermissionRedirect {
            to: "/dashboard".to_string(),
        };
        assert_eq!(
            redirect.decision(),
            Some(GateDecision::RedirectTo("/dashboard".to_string()))
        );

        let blocked = NavState::PlatformBlocked { message: None };
        assert!(matches!(blocked.decision(), Some(GateDecision::Block(_))));

        let rendered = NavState::Rendered {
            layout: Layout::Public,
            page: "home".to_string(),
            params: HashMap::new(),
        };
        assert_eq!(rendered.decision(), Some(GateDecision::Allow));
    }

    #[test]
    fn index_redirects_resolve_to_default_child() {
        let table = application_routes();
        let snap = authed(profile_with(&[Role::Admin], true));

        let state = resolve(&table, "/admin", &snap);
        assert_eq!(rendered_page(&state), Some("admin/dashboard"));
    }
}
