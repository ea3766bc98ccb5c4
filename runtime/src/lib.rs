//! # Optimist Runtime
//!
//! Runtime implementation for optimistic reducer stores.
//!
//! This crate provides the [`Store`] runtime that coordinates reducer
//! execution and effect handling.
//!
//! ## Core Components
//!
//! - **Store**: Owns state, serialises reducer calls and executes effects
//! - **Effect Executor**: Spawns effect descriptions on tokio and feeds actions back
//! - **Cancellation registry**: Tracks every in-flight effect so it can be
//!   aborted by id or during teardown
//!
//! ## Example
//!
//! ```ignore
//! use optimist_runtime::Store;
//!
//! let store = Store::new(initial_state, my_reducer, environment);
//!
//! // Send an action
//! store.send(Action::DoSomething).await?;
//!
//! // Read state
//! let value = store.state(|s| s.some_field).await;
//! ```

use optimist_core::{effect::Effect, effect::EffectId, reducer::Reducer};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{RwLock, watch};
use tokio::task::AbortHandle;

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug, PartialEq, Eq)]
    pub enum StoreError {
        /// Store is shutting down (or was torn down) and not accepting new actions
        ///
        /// This error is returned when `send()` is called after `shutdown()`
        /// or `teardown()` was initiated.
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for effects to complete
        ///
        /// Some effects were still running when the timeout elapsed.
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),
    }
}

pub use error::StoreError;

/// Configuration for Store instances
///
/// # Example
///
/// ```
/// use optimist_runtime::StoreConfig;
/// use std::time::Duration;
///
/// let config = StoreConfig::default()
///     .with_broadcast_capacity(64)
///     .with_shutdown_timeout(Duration::from_secs(5));
/// assert_eq!(config.broadcast_capacity, 64);
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Capacity of the broadcast channel for effect-produced actions
    pub broadcast_capacity: usize,
    /// Default timeout for graceful shutdown
    pub default_shutdown_timeout: Duration,
}

impl StoreConfig {
    /// Create a new configuration with custom values
    #[must_use]
    pub const fn new(broadcast_capacity: usize, default_shutdown_timeout: Duration) -> Self {
        Self {
            broadcast_capacity,
            default_shutdown_timeout,
        }
    }

    /// Set the action broadcast capacity
    #[must_use]
    pub const fn with_broadcast_capacity(mut self, capacity: usize) -> Self {
        self.broadcast_capacity = capacity;
        self
    }

    /// Set the default shutdown timeout
    #[must_use]
    pub const fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.default_shutdown_timeout = timeout;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            broadcast_capacity: 16,
            default_shutdown_timeout: Duration::from_secs(30),
        }
    }
}

/// Handle for tracking effect completion
///
/// Returned by [`Store::send()`] to allow waiting for the effects spawned by
/// that action. Effects that are cancelled count as complete.
///
/// # Example
///
/// ```ignore
/// let mut handle = store.send(Action::Start).await?;
/// handle.wait_with_timeout(Duration::from_secs(5)).await?;
/// // All effects from Action::Start are now complete
/// ```
#[derive(Clone)]
pub struct EffectHandle {
    effects: Arc<AtomicUsize>,
    completion: watch::Receiver<()>,
}

impl EffectHandle {
    /// Create a handle and the tracking context used by effect execution
    fn new() -> (Self, EffectTracking) {
        let counter = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = watch::channel(());

        let handle = Self {
            effects: Arc::clone(&counter),
            completion: rx,
        };
        let tracking = EffectTracking {
            counter,
            notifier: tx,
        };

        (handle, tracking)
    }

    /// Create a handle that's already complete
    #[must_use]
    pub fn completed() -> Self {
        let (tx, rx) = watch::channel(());
        let _ = tx.send(());

        Self {
            effects: Arc::new(AtomicUsize::new(0)),
            completion: rx,
        }
    }

    /// Number of effects from this action that are still running
    #[must_use]
    pub fn pending(&self) -> usize {
        self.effects.load(Ordering::SeqCst)
    }

    /// Wait for all effects to complete
    pub async fn wait(&mut self) {
        while self.effects.load(Ordering::SeqCst) > 0 {
            if self.completion.changed().await.is_err() {
                // Every tracker is gone, so nothing can still be running
                break;
            }
        }
    }

    /// Wait for all effects to complete with a timeout
    ///
    /// # Errors
    ///
    /// Returns `Err(())` if the timeout expires before all effects complete.
    pub async fn wait_with_timeout(&mut self, timeout: Duration) -> Result<(), ()> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| ())
    }
}

impl std::fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandle")
            .field("pending_effects", &self.effects.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// Internal: Effect tracking context passed through effect execution
#[derive(Clone)]
struct EffectTracking {
    counter: Arc<AtomicUsize>,
    notifier: watch::Sender<()>,
}

impl EffectTracking {
    fn increment(&self) {
        self.counter.fetch_add(1, Ordering::SeqCst);
    }

    fn decrement(&self) {
        if self.counter.fetch_sub(1, Ordering::SeqCst) == 1 {
            let _ = self.notifier.send(());
        }
    }
}

/// Internal: RAII guard that decrements the effect counter on drop
///
/// Runs on normal completion, on panic and when the task is aborted.
struct DecrementGuard(EffectTracking);

impl Drop for DecrementGuard {
    fn drop(&mut self) {
        self.0.decrement();
    }
}

/// Internal: a spawned effect task that can be aborted
///
/// `abort` is filled in right after the spawn. A cancel that lands before
/// then sets `cancelled`, and the spawner aborts the task itself.
struct Registration {
    id: Option<EffectId>,
    abort: Option<AbortHandle>,
    cancelled: bool,
}

/// Internal: every effect task that has not finished yet
#[derive(Default)]
struct InFlight {
    next_key: u64,
    tasks: HashMap<u64, Registration>,
}

impl InFlight {
    /// Marks matching tasks cancelled and collects the handles to abort
    fn cancel_where<F>(&mut self, matches: F) -> (usize, Vec<AbortHandle>)
    where
        F: Fn(&Registration) -> bool,
    {
        let mut count = 0;
        let mut handles = Vec::new();
        for registration in self.tasks.values_mut().filter(|r| matches(r)) {
            count += 1;
            match &registration.abort {
                Some(handle) => handles.push(handle.clone()),
                None => registration.cancelled = true,
            }
        }
        (count, handles)
    }
}

fn lock(registry: &Mutex<InFlight>) -> MutexGuard<'_, InFlight> {
    // The registry holds no invariants that a panic could break
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Internal: removes a task from the registry when it finishes or is aborted
struct RegistrationGuard {
    registry: Arc<Mutex<InFlight>>,
    key: u64,
}

impl Drop for RegistrationGuard {
    fn drop(&mut self) {
        lock(&self.registry).tasks.remove(&self.key);
    }
}

/// Store module - The runtime for reducers
pub mod store {
    use super::{
        Arc, AtomicBool, DecrementGuard, Duration, Effect, EffectHandle, EffectId,
        EffectTracking, InFlight, Mutex, Ordering, Reducer, Registration, RegistrationGuard,
        RwLock, StoreConfig, StoreError, lock,
    };
    use std::future::Future;
    use tokio::sync::{broadcast, watch};

    /// The Store - runtime coordinator for a reducer
    ///
    /// The Store manages:
    /// 1. State (behind `RwLock`; every reducer call holds the write lock, so
    ///    all mutations are applied one at a time)
    /// 2. Reducer (business logic)
    /// 3. Environment (injected dependencies)
    /// 4. Effect execution (with feedback loop and cancellation)
    ///
    /// Cloning a store is cheap; clones share state and in-flight effects.
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        state: Arc<RwLock<S>>,
        reducer: R,
        environment: E,
        config: StoreConfig,
        shutdown: Arc<AtomicBool>,
        /// Set by `teardown()`; feedback is dropped from then on
        torn_down: Arc<AtomicBool>,
        in_flight: Arc<Mutex<InFlight>>,
        /// Incremented after every reduced action
        changes: Arc<watch::Sender<u64>>,
        /// Actions produced by effects, for observers
        action_broadcast: broadcast::Sender<A>,
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
        A: Send + Clone + 'static,
        S: Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        /// Create a new store with initial state, reducer, and environment
        ///
        /// Uses [`StoreConfig::default`].
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self::with_config(initial_state, reducer, environment, StoreConfig::default())
        }

        /// Create a new Store with custom configuration
        #[must_use]
        pub fn with_config(
            initial_state: S,
            reducer: R,
            environment: E,
            config: StoreConfig,
        ) -> Self {
            let (action_broadcast, _) = broadcast::channel(config.broadcast_capacity.max(1));
            let (changes, _) = watch::channel(0);

            Self {
                state: Arc::new(RwLock::new(initial_state)),
                reducer,
                environment,
                config,
                shutdown: Arc::new(AtomicBool::new(false)),
                torn_down: Arc::new(AtomicBool::new(false)),
                in_flight: Arc::new(Mutex::new(InFlight::default())),
                changes: Arc::new(changes),
                action_broadcast,
            }
        }

        /// Send an action to the store
        ///
        /// 1. Acquires write lock on state
        /// 2. Calls reducer with (state, action, environment)
        /// 3. Spawns the returned effects
        /// 4. Effects may produce more actions (feedback loop)
        ///
        /// `send()` returns once the reducer has run and its effects are
        /// spawned, not when they complete. Effects may complete in any order.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting
        /// down or was torn down.
        #[tracing::instrument(skip(self, action), name = "store_send")]
        pub async fn send(&self, action: A) -> Result<EffectHandle, StoreError>
        where
            R: Clone,
            E: Clone,
        {
            if self.shutdown.load(Ordering::Acquire) {
                tracing::warn!("Rejected action: store is shutting down");
                metrics::counter!("store.shutdown.rejected_actions").increment(1);
                return Err(StoreError::ShutdownInProgress);
            }

            Ok(self.dispatch(action).await)
        }

        /// Reduce an action and spawn its effects
        ///
        /// Unlike [`Store::send`] this ignores the shutdown flag; only a
        /// teardown stops it.
        ///
        /// Actions fed back by running effects come through here, so effects
        /// drained by [`Store::shutdown`] still reach the reducer.
        async fn dispatch(&self, action: A) -> EffectHandle
        where
            R: Clone,
            E: Clone,
        {
            if self.torn_down.load(Ordering::Acquire) {
                tracing::debug!("Dropped feedback: store was torn down");
                return EffectHandle::completed();
            }

            tracing::debug!("Processing action");
            metrics::counter!("store.actions.total").increment(1);

            let (handle, tracking) = EffectHandle::new();

            let effects = {
                let mut state = self.state.write().await;

                let start = std::time::Instant::now();
                let effects = self.reducer.reduce(&mut *state, action, &self.environment);
                metrics::histogram!("store.reducer.duration_seconds")
                    .record(start.elapsed().as_secs_f64());

                tracing::trace!("Reducer completed, returned {} effects", effects.len());
                effects
            };

            self.changes.send_modify(|version| *version += 1);

            for effect in effects {
                self.execute_effect(effect, &tracking, None);
            }

            handle
        }

        /// Read current state via a closure
        ///
        /// ```ignore
        /// let todo_count = store.state(|s| s.committed.len()).await;
        /// ```
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.state.read().await;
            f(&*state)
        }

        /// Subscribe to state change notifications
        ///
        /// The value is a version number that increases after every reduced
        /// action. Renderers wait on `changed()` and then re-read state.
        #[must_use]
        pub fn subscribe_changes(&self) -> watch::Receiver<u64> {
            self.changes.subscribe()
        }

        /// Subscribe to actions produced by effects
        ///
        /// Only feedback actions are broadcast, not the actions passed to
        /// [`Store::send`]. Slow observers may observe `Lagged` errors.
        #[must_use]
        pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
            self.action_broadcast.subscribe()
        }

        /// Number of effect tasks that have not finished yet
        #[must_use]
        pub fn in_flight(&self) -> usize {
            lock(&self.in_flight).tasks.len()
        }

        /// Whether `shutdown()` or `teardown()` has been called
        #[must_use]
        pub fn is_shut_down(&self) -> bool {
            self.shutdown.load(Ordering::Acquire)
        }

        /// Abort every in-flight effect registered under `id`
        ///
        /// Aborted effects never feed an action back. Returns how many tasks
        /// were aborted.
        pub fn cancel(&self, id: &EffectId) -> usize {
            let (cancelled, handles) = lock(&self.in_flight)
                .cancel_where(|registration| registration.id.as_ref() == Some(id));

            for handle in &handles {
                handle.abort();
            }

            if cancelled > 0 {
                tracing::debug!(effect_id = %id, cancelled, "Cancelled effects");
                metrics::counter!("store.effects.cancelled").increment(cancelled as u64);
            }
            cancelled
        }

        /// Tear the store down immediately
        ///
        /// Rejects new actions and aborts every in-flight effect. Their
        /// pending mutations are dropped. Returns how many effects were
        /// cancelled.
        pub fn teardown(&self) -> usize {
            self.shutdown.store(true, Ordering::Release);
            self.torn_down.store(true, Ordering::Release);

            let (cancelled, handles) = lock(&self.in_flight).cancel_where(|_| true);

            for handle in &handles {
                handle.abort();
            }

            tracing::info!(cancelled, "Store torn down");
            metrics::counter!("store.effects.cancelled").increment(cancelled as u64);
            cancelled
        }

        /// Initiate graceful shutdown of the store
        ///
        /// Rejects new actions, then waits for in-flight effects to finish.
        /// Actions those effects feed back are still reduced, along with any
        /// effects they spawn, so confirmations already running are applied.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownTimeout`] if the timeout expires
        /// before all effects complete.
        pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
            tracing::info!("Initiating graceful shutdown");
            self.shutdown.store(true, Ordering::Release);

            let poll_interval = Duration::from_millis(10);
            let drained = tokio::time::timeout(timeout, async {
                while self.in_flight() > 0 {
                    tokio::time::sleep(poll_interval).await;
                }
            })
            .await;

            if drained.is_ok() {
                tracing::info!("All effects completed, shutdown successful");
                Ok(())
            } else {
                let pending = self.in_flight();
                tracing::error!(pending_effects = pending, "Shutdown timeout");
                Err(StoreError::ShutdownTimeout(pending))
            }
        }

        /// Graceful shutdown using the configured default timeout
        ///
        /// # Errors
        ///
        /// See [`Store::shutdown`].
        pub async fn shutdown_default(&self) -> Result<(), StoreError> {
            self.shutdown(self.config.default_shutdown_timeout).await
        }

        /// Spawn an effect task, registering it for cancellation
        fn spawn_tracked<F>(&self, id: Option<EffectId>, tracking: &EffectTracking, work: F)
        where
            F: Future<Output = ()> + Send + 'static,
        {
            let key = {
                let mut registry = lock(&self.in_flight);
                let key = registry.next_key;
                registry.next_key += 1;
                registry.tasks.insert(
                    key,
                    Registration {
                        id,
                        abort: None,
                        cancelled: false,
                    },
                );
                key
            };

            tracking.increment();
            let guards = (
                DecrementGuard(tracking.clone()),
                RegistrationGuard {
                    registry: Arc::clone(&self.in_flight),
                    key,
                },
            );

            // No lock is held here: a runtime that is shutting down drops
            // the future, and with it the guards, inside `spawn`.
            let task = tokio::spawn(async move {
                let _guards = guards;
                work.await;
            });

            let abort = task.abort_handle();
            let cancelled = match lock(&self.in_flight).tasks.get_mut(&key) {
                Some(registration) => {
                    registration.abort = Some(abort.clone());
                    registration.cancelled
                },
                None => false,
            };
            if cancelled {
                abort.abort();
            }
        }

        /// Execute an effect with tracking
        ///
        /// - `None`: No-op
        /// - `Future`: Executes async computation, sends resulting action if `Some`
        /// - `Delay`: Waits for duration, then sends action
        /// - `Parallel`: Executes effects concurrently
        /// - `Cancellable`: Executes the inner effect under a cancellation id
        /// - `Cancel`: Aborts in-flight effects with the given id
        ///
        /// Effect panics are isolated in their task; the store keeps running.
        #[tracing::instrument(skip(self, effect, tracking), name = "execute_effect")]
        fn execute_effect(
            &self,
            effect: Effect<A>,
            tracking: &EffectTracking,
            cancel_id: Option<EffectId>,
        ) where
            R: Clone,
            E: Clone,
        {
            match effect {
                Effect::None => {
                    tracing::trace!("Executing Effect::None (no-op)");
                },
                Effect::Future(fut) => {
                    metrics::counter!("store.effects.executed", "type" => "future").increment(1);
                    let store = self.clone();

                    self.spawn_tracked(cancel_id, tracking, async move {
                        if let Some(action) = fut.await {
                            tracing::trace!("Effect::Future produced an action, sending to store");
                            let _ = store.action_broadcast.send(action.clone());
                            store.dispatch(action).await;
                        }
                    });
                },
                Effect::Delay { duration, action } => {
                    tracing::trace!("Executing Effect::Delay (duration: {:?})", duration);
                    metrics::counter!("store.effects.executed", "type" => "delay").increment(1);
                    let store = self.clone();

                    self.spawn_tracked(cancel_id, tracking, async move {
                        tokio::time::sleep(duration).await;
                        let _ = store.action_broadcast.send((*action).clone());
                        store.dispatch(*action).await;
                    });
                },
                Effect::Parallel(effects) => {
                    tracing::trace!("Executing Effect::Parallel with {} effects", effects.len());
                    for effect in effects {
                        self.execute_effect(effect, tracking, cancel_id.clone());
                    }
                },
                Effect::Cancellable { id, effect } => {
                    self.execute_effect(*effect, tracking, Some(id));
                },
                Effect::Cancel(id) => {
                    self.cancel(&id);
                },
            }
        }
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Clone,
        E: Clone,
    {
        fn clone(&self) -> Self {
            Self {
                state: Arc::clone(&self.state),
                reducer: self.reducer.clone(),
                environment: self.environment.clone(),
                config: self.config.clone(),
                shutdown: Arc::clone(&self.shutdown),
                torn_down: Arc::clone(&self.torn_down),
                in_flight: Arc::clone(&self.in_flight),
                changes: Arc::clone(&self.changes),
                action_broadcast: self.action_broadcast.clone(),
            }
        }
    }
}

// Re-export for convenience
pub use store::Store;
