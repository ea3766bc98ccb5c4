//! # Optimist Core
//!
//! Core traits and types for optimistic, reducer-driven state stores.
//!
//! ## Core Concepts
//!
//! - **State**: Domain state owned by a store
//! - **Action**: All possible inputs to a reducer (user intents and effect feedback)
//! - **Reducer**: Pure function `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: Side effect descriptions (not execution)
//! - **Environment**: Injected dependencies via traits
//!
//! Reducers never perform I/O. They stage state changes immediately and
//! describe the asynchronous confirmation work as [`effect::Effect`] values,
//! which the runtime executes and feeds back as new actions.
//!
//! ## Example
//!
//! ```
//! use optimist_core::{effect::Effect, reducer::Reducer, SmallVec, smallvec};
//! use std::time::Duration;
//!
//! #[derive(Clone, Debug)]
//! enum LampAction {
//!     SwitchOn,
//!     Confirmed,
//! }
//!
//! #[derive(Default)]
//! struct LampState {
//!     on: bool,
//!     confirmed: bool,
//! }
//!
//! struct LampReducer;
//!
//! impl Reducer for LampReducer {
//!     type State = LampState;
//!     type Action = LampAction;
//!     type Environment = ();
//!
//!     fn reduce(
//!         &self,
//!         state: &mut LampState,
//!         action: LampAction,
//!         _env: &(),
//!     ) -> SmallVec<[Effect<LampAction>; 4]> {
//!         match action {
//!             LampAction::SwitchOn => {
//!                 state.on = true;
//!                 smallvec![Effect::Delay {
//!                     duration: Duration::from_millis(100),
//!                     action: Box::new(LampAction::Confirmed),
//!                 }]
//!             },
//!             LampAction::Confirmed => {
//!                 state.confirmed = true;
//!                 SmallVec::new()
//!             },
//!         }
//!     }
//! }
//!
//! let mut state = LampState::default();
//! let effects = LampReducer.reduce(&mut state, LampAction::SwitchOn, &());
//! assert!(state.on);
//! assert_eq!(effects.len(), 1);
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use smallvec::{SmallVec, smallvec};

/// Reducer module - The core trait for business logic
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`
///
/// They contain all business logic and are deterministic and testable.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait - core abstraction for business logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The domain state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// This is a pure function that:
        /// 1. Validates the action
        /// 2. Updates state in place
        /// 3. Returns effect descriptions to be executed
        ///
        /// Most actions produce zero or one effect, so the return type keeps
        /// up to four effects inline without allocating.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - Side effect descriptions
///
/// Effects describe side effects to be performed by the runtime.
/// They are values (not execution) and are composable and cancellable.
pub mod effect {
    use std::fmt;
    use std::future::Future;
    use std::pin::Pin;
    use std::time::Duration;

    /// Identifier used to cancel an in-flight effect
    ///
    /// Several effects may share one id; cancelling the id aborts all of them.
    #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct EffectId(String);

    impl EffectId {
        /// Creates a new effect identifier
        #[must_use]
        pub fn new(id: impl Into<String>) -> Self {
            Self(id.into())
        }

        /// Returns the identifier as a string slice
        #[must_use]
        pub fn as_str(&self) -> &str {
            &self.0
        }
    }

    impl fmt::Display for EffectId {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(&self.0)
        }
    }

    /// Boxed future produced by [`Effect::Future`]
    pub type EffectFuture<Action> = Pin<Box<dyn Future<Output = Option<Action>> + Send>>;

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed immediately. They are descriptions of what should happen,
    /// returned from reducers and executed by the Store runtime.
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Run effects in parallel
        Parallel(Vec<Effect<Action>>),

        /// Delayed action (for timeouts, simulated latency)
        Delay {
            /// How long to wait
            duration: Duration,
            /// Action to dispatch after delay
            action: Box<Action>,
        },

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if Some, the action is fed back into the reducer
        Future(EffectFuture<Action>),

        /// An effect that can later be aborted with [`Effect::Cancel`]
        ///
        /// If cancelled before it completes, the wrapped effect never feeds
        /// an action back to the store.
        Cancellable {
            /// Identifier used for cancellation
            id: EffectId,
            /// The wrapped effect
            effect: Box<Effect<Action>>,
        },

        /// Abort every in-flight effect registered under this id
        Cancel(EffectId),
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action> fmt::Debug for Effect<Action>
    where
        Action: fmt::Debug,
    {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Parallel(effects) => {
                    f.debug_tuple("Effect::Parallel").field(effects).finish()
                },
                Effect::Delay { duration, action } => f
                    .debug_struct("Effect::Delay")
                    .field("duration", duration)
                    .field("action", action)
                    .finish(),
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
                Effect::Cancellable { id, effect } => f
                    .debug_struct("Effect::Cancellable")
                    .field("id", id)
                    .field("effect", effect)
                    .finish(),
                Effect::Cancel(id) => f.debug_tuple("Effect::Cancel").field(id).finish(),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Combine effects to run in parallel
        #[must_use]
        pub const fn merge(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Parallel(effects)
        }

        /// Wrap this effect so it can be cancelled under `id`
        #[must_use]
        pub fn cancellable(self, id: EffectId) -> Effect<Action> {
            Effect::Cancellable {
                id,
                effect: Box::new(self),
            }
        }

        /// Returns `true` for [`Effect::None`]
        #[must_use]
        pub const fn is_none(&self) -> bool {
            matches!(self, Effect::None)
        }

        /// Returns the cancellation id if this is a cancellable effect
        #[must_use]
        pub const fn cancellation_id(&self) -> Option<&EffectId> {
            match self {
                Effect::Cancellable { id, .. } => Some(id),
                _ => None,
            }
        }
    }
}

/// Environment module - Dependency injection traits
///
/// All external dependencies are abstracted behind traits and injected
/// via the Environment parameter.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// Production code uses [`SystemClock`]; tests inject a fixed clock so
    /// that timestamp-derived identifiers are deterministic.
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall clock backed by [`Utc::now`]
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
