//! Shared fixture builders for unit tests.

use chrono::Utc;
use uuid::Uuid;

use crate::gates::NavSnapshot;
use crate::platform::{PlatformState, PlatformStatus};
use crate::profile::{Profile, ProfileState, Role, SubscriptionTier};
use crate::session::{Session, SessionState};

pub fn profile_with(roles: &[Role], onboarded: bool) -> Profile {
    Profile {
        user_id: Uuid::new_v4(),
        roles: roles.iter().copied().collect(),
        subscription: SubscriptionTier::Member,
        onboarding_complete: onboarded,
    }
}

pub fn session_for(user_id: Uuid) -> Session {
    Session {
        session_id: Uuid::new_v4(),
        user_id,
        context_id: "test-ctx".to_string(),
        access_token: "token".to_string(),
        refresh_token: "refresh".to_string(),
        expires_at: Utc::now() + chrono::Duration::hours(1),
    }
}

/// Snapshot for an onboarded (or not) identity on a healthy platform.
pub fn authed(profile: Profile) -> NavSnapshot {
    NavSnapshot {
        platform: PlatformState::resolved(PlatformStatus::operational()),
        session: SessionState::Present(session_for(profile.user_id)),
        profile: ProfileState::loaded(profile),
    }
}
