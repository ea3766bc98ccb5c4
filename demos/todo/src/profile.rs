//! Deferred user profile.
//!
//! The profile is fetched once and consumed while still loading. Instead of
//! suspending rendering, the state carries an explicit [`Resource`] that the
//! renderer matches on: a fallback while pending, the profile once resolved,
//! or the error.

use crate::api::Backend;
use optimist_core::effect::{Effect, EffectId};
use optimist_core::reducer::Reducer;
use optimist_core::{SmallVec, smallvec};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// A user's public profile
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// User id
    pub id: u64,
    /// Display name
    pub name: String,
    /// Contact address
    pub email: String,
    /// Job title
    pub role: String,
}

impl UserProfile {
    /// The profile served by the simulated backend
    #[must_use]
    pub fn demo() -> Self {
        Self {
            id: 1,
            name: "John Doe".to_string(),
            email: "john@example.com".to_string(),
            role: "Developer".to_string(),
        }
    }
}

/// An asynchronously loaded value
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resource<T> {
    /// Requested, not yet resolved
    Pending,
    /// Loaded successfully
    Resolved(T),
    /// Loading failed
    Failed(String),
}

impl<T> Resource<T> {
    /// The loaded value, if any
    #[must_use]
    pub const fn value(&self) -> Option<&T> {
        match self {
            Self::Resolved(value) => Some(value),
            Self::Pending | Self::Failed(_) => None,
        }
    }

    /// Whether the value is still loading
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// Profile page state
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileState {
    /// `None` until a load is requested
    pub profile: Option<Resource<UserProfile>>,
}

/// Profile actions
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProfileAction {
    /// Start (or restart) loading a profile
    Load {
        /// User to fetch
        user_id: u64,
    },
    /// The fetch resolved
    Loaded {
        /// Fetched profile
        profile: UserProfile,
    },
    /// The fetch failed
    LoadFailed {
        /// Error message
        error: String,
    },
}

/// Environment for the profile reducer
#[derive(Clone)]
pub struct ProfileEnvironment {
    /// Where profiles come from
    pub backend: Arc<dyn Backend>,
    /// Simulated latency
    pub delay: Duration,
}

impl ProfileEnvironment {
    /// Creates a new `ProfileEnvironment`
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>, delay: Duration) -> Self {
        Self { backend, delay }
    }
}

fn load_effect_id() -> EffectId {
    EffectId::new("profile-load")
}

/// Reducer for the profile resource
#[derive(Clone, Debug, Default)]
pub struct ProfileReducer;

impl Reducer for ProfileReducer {
    type State = ProfileState;
    type Action = ProfileAction;
    type Environment = ProfileEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            ProfileAction::Load { user_id } => {
                state.profile = Some(Resource::Pending);
                let fetch = env.backend.fetch_user(user_id, env.delay);

                // A reload supersedes any fetch still running
                smallvec![
                    Effect::Cancel(load_effect_id()),
                    Effect::Future(Box::pin(async move {
                        Some(match fetch.await {
                            Ok(profile) => ProfileAction::Loaded { profile },
                            Err(error) => ProfileAction::LoadFailed {
                                error: error.to_string(),
                            },
                        })
                    }))
                    .cancellable(load_effect_id()),
                ]
            },
            ProfileAction::Loaded { profile } => {
                state.profile = Some(Resource::Resolved(profile));
                SmallVec::new()
            },
            ProfileAction::LoadFailed { error } => {
                tracing::warn!(%error, "Profile load failed");
                state.profile = Some(Resource::Failed(error));
                SmallVec::new()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::SimulatedBackend;
    use optimist_testing::{ReducerTest, assertions};

    fn env() -> ProfileEnvironment {
        ProfileEnvironment::new(Arc::new(SimulatedBackend::new()), Duration::from_millis(1500))
    }

    #[test]
    fn load_marks_pending_and_fetches() {
        ReducerTest::new(ProfileReducer)
            .with_env(env())
            .given_state(ProfileState::default())
            .when_action(ProfileAction::Load { user_id: 1 })
            .then_state(|state| {
                assert_eq!(state.profile, Some(Resource::Pending));
            })
            .then_effects(|effects| {
                assertions::assert_cancels(effects, &load_effect_id());
                assertions::assert_has_cancellable_effect(effects, &load_effect_id());
                assertions::assert_has_future_effect(effects);
            })
            .run();
    }

    #[test]
    fn loaded_resolves_resource() {
        ReducerTest::new(ProfileReducer)
            .with_env(env())
            .given_state(ProfileState {
                profile: Some(Resource::Pending),
            })
            .when_action(ProfileAction::Loaded {
                profile: UserProfile::demo(),
            })
            .then_state(|state| {
                let profile = state.profile.as_ref().and_then(Resource::value).unwrap();
                assert_eq!(profile.name, "John Doe");
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn failure_is_kept_in_resource() {
        ReducerTest::new(ProfileReducer)
            .with_env(env())
            .given_state(ProfileState::default())
            .when_action(ProfileAction::LoadFailed {
                error: "user 7 not found".to_string(),
            })
            .then_state(|state| {
                assert_eq!(
                    state.profile,
                    Some(Resource::Failed("user 7 not found".to_string()))
                );
            })
            .run();
    }

    #[test]
    fn resource_accessors() {
        let pending: Resource<u8> = Resource::Pending;
        assert!(pending.is_pending());
        assert_eq!(pending.value(), None);
        assert_eq!(Resource::Resolved(3).value(), Some(&3));
    }
}
