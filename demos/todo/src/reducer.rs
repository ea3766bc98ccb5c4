//! Reducer logic for the optimistic todo list.
//!
//! Every intent is applied to state synchronously. Additions are staged in
//! `in_flight` and confirmed by a backend effect; deletions hit `committed`
//! at once and only the "deleting" indicator waits for the backend.

use crate::api::{Backend, SimulatedBackend};
use crate::config::{DEFAULT_ADD_DELAY, DEFAULT_DELETE_DELAY, TodoConfig};
use crate::types::{Todo, TodoAction, TodoId, TodoState};
use optimist_core::{
    SmallVec, effect::Effect, effect::EffectId, environment::Clock, reducer::Reducer, smallvec,
};
use std::sync::Arc;
use std::time::Duration;

/// Environment dependencies for the todo reducer
#[derive(Clone)]
pub struct TodoEnvironment {
    /// Clock used to derive todo ids
    pub clock: Arc<dyn Clock>,
    /// Backend that confirms additions and deletions
    pub backend: Arc<dyn Backend>,
    /// Default confirmation delay for additions
    pub add_delay: Duration,
    /// Default confirmation delay for deletions
    pub delete_delay: Duration,
}

impl TodoEnvironment {
    /// Creates a new `TodoEnvironment` with the default delays
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, backend: Arc<dyn Backend>) -> Self {
        Self {
            clock,
            backend,
            add_delay: DEFAULT_ADD_DELAY,
            delete_delay: DEFAULT_DELETE_DELAY,
        }
    }

    /// Creates an environment backed by [`SimulatedBackend`]
    #[must_use]
    pub fn simulated(clock: Arc<dyn Clock>) -> Self {
        Self::new(clock, Arc::new(SimulatedBackend::new()))
    }

    /// Takes the delays from `config`
    #[must_use]
    pub fn with_config(mut self, config: &TodoConfig) -> Self {
        self.add_delay = config.add_delay;
        self.delete_delay = config.delete_delay;
        self
    }
}

/// Cancellation id of an addition's confirmation
#[must_use]
pub fn add_effect_id(id: TodoId) -> EffectId {
    EffectId::new(format!("todo-add-{id}"))
}

/// Reducer for the optimistic todo list
#[derive(Clone, Debug, Default)]
pub struct TodoReducer;

impl TodoReducer {
    /// Creates a new `TodoReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn submit(
        state: &mut TodoState,
        text: &str,
        confirm_after: Option<Duration>,
        env: &TodoEnvironment,
    ) -> SmallVec<[Effect<TodoAction>; 4]> {
        let text = text.trim();
        if text.is_empty() {
            tracing::debug!("Ignoring empty submission");
            return SmallVec::new();
        }

        let id = state.allocate_id(env.clock.now().timestamp_millis());
        let todo = Todo::new(id, text);

        state.in_flight.push(todo.clone());
        state.form.input.clear();
        state.form.outstanding += 1;

        let delay = confirm_after.unwrap_or(env.add_delay);
        tracing::debug!(%id, ?delay, "Staged optimistic todo");

        let confirmation = env.backend.create_todo(todo, delay);
        smallvec![
            Effect::Future(Box::pin(async move {
                Some(match confirmation.await {
                    Ok(todo) => TodoAction::AddConfirmed { todo },
                    Err(error) => TodoAction::AddFailed {
                        id,
                        reason: error.to_string(),
                    },
                })
            }))
            .cancellable(add_effect_id(id))
        ]
    }

    fn delete(
        state: &mut TodoState,
        id: TodoId,
        confirm_after: Option<Duration>,
        env: &TodoEnvironment,
    ) -> SmallVec<[Effect<TodoAction>; 4]> {
        if let Some(index) = state.committed.iter().position(|t| t.id == id) {
            let todo = state.committed.remove(index);
            state.deleting.insert(id, todo);

            let delay = confirm_after.unwrap_or(env.delete_delay);
            let confirmation = env.backend.delete_todo(id, delay);
            return smallvec![Effect::Future(Box::pin(async move {
                Some(match confirmation.await {
                    Ok(id) => TodoAction::DeleteConfirmed { id },
                    Err(error) => TodoAction::DeleteFailed {
                        id,
                        reason: error.to_string(),
                    },
                })
            }))];
        }

        if let Some(index) = state.in_flight.iter().position(|t| t.id == id) {
            // Deleting an unconfirmed addition withdraws it
            state.in_flight.remove(index);
            state.form.settle_one();
            tracing::debug!(%id, "Withdrew pending todo");
            return smallvec![Effect::Cancel(add_effect_id(id))];
        }

        tracing::debug!(%id, "Ignoring delete of unknown todo");
        SmallVec::new()
    }
}

impl Reducer for TodoReducer {
    type State = TodoState;
    type Action = TodoAction;
    type Environment = TodoEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ========== Form ==========
            TodoAction::InputChanged { text } => {
                state.form.input = text;
                SmallVec::new()
            },

            TodoAction::SubmitForm => {
                let text = state.form.input.clone();
                Self::submit(state, &text, None, env)
            },

            // ========== Intents ==========
            TodoAction::Submit {
                text,
                confirm_after,
            } => Self::submit(state, &text, confirm_after, env),

            TodoAction::ToggleCompleted { id } => {
                match state.committed.iter_mut().find(|t| t.id == id) {
                    Some(todo) => todo.completed = !todo.completed,
                    None => tracing::debug!(%id, "Ignoring toggle of unknown or pending todo"),
                }
                SmallVec::new()
            },

            TodoAction::Delete { id, confirm_after } => Self::delete(state, id, confirm_after, env),

            // ========== Confirmations ==========
            TodoAction::AddConfirmed { mut todo } => {
                let Some(index) = state.in_flight.iter().position(|t| t.id == todo.id) else {
                    tracing::debug!(id = %todo.id, "Ignoring confirmation of withdrawn todo");
                    return SmallVec::new();
                };
                state.in_flight.remove(index);
                state.form.settle_one();

                if state.committed.iter().any(|t| t.id == todo.id) {
                    tracing::warn!(id = %todo.id, "Confirmed todo already committed");
                } else {
                    todo.pending = false;
                    tracing::info!(id = %todo.id, "Todo confirmed");
                    state.committed.push(todo);
                }
                SmallVec::new()
            },

            TodoAction::AddFailed { id, reason } => {
                if let Some(index) = state.in_flight.iter().position(|t| t.id == id) {
                    state.in_flight.remove(index);
                    state.form.settle_one();
                }
                tracing::warn!(%id, %reason, "Rolled back pending todo");
                state.last_error = Some(format!("Failed to add todo {id}: {reason}"));
                SmallVec::new()
            },

            TodoAction::DeleteConfirmed { id } => {
                state.deleting.remove(&id);
                SmallVec::new()
            },

            TodoAction::DeleteFailed { id, reason } => {
                state.deleting.remove(&id);
                tracing::warn!(%id, %reason, "Delete confirmation failed");
                state.last_error = Some(format!("Failed to delete todo {id}: {reason}"));
                SmallVec::new()
            },
        }
    }
}
