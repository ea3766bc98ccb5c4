//! Backend seam for confirmations.
//!
//! The reducers never talk to a network. They ask a [`Backend`] for a future
//! and wrap it in an effect. [`SimulatedBackend`] stands in for a real server:
//! every call resolves with its input after a fixed delay.

use crate::profile::UserProfile;
use crate::types::{Todo, TodoId};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;

/// Errors a backend call can resolve with
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The backend refused the request
    #[error("request rejected: {reason}")]
    Rejected {
        /// Backend message
        reason: String,
    },

    /// The requested resource does not exist
    #[error("{what} not found")]
    NotFound {
        /// Description of the missing resource
        what: String,
    },
}

/// Boxed future returned by every [`Backend`] call
pub type ApiFuture<T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send>>;

/// Remote operations the stores confirm against
///
/// Each call takes the latency to simulate; a networked implementation may
/// ignore it.
pub trait Backend: Send + Sync {
    /// Persist a new todo, resolving with the stored record
    fn create_todo(&self, todo: Todo, delay: Duration) -> ApiFuture<Todo>;

    /// Delete a todo, resolving with its id
    fn delete_todo(&self, id: TodoId, delay: Duration) -> ApiFuture<TodoId>;

    /// Fetch a user profile
    fn fetch_user(&self, user_id: u64, delay: Duration) -> ApiFuture<UserProfile>;
}

/// Resolves with `data` once `delay` has elapsed. Never fails.
pub async fn simulate_api_call<T>(data: T, delay: Duration) -> T {
    tokio::time::sleep(delay).await;
    data
}

/// In-process backend that answers after a delay
///
/// By default every call succeeds. [`SimulatedBackend::rejecting`] builds one
/// whose calls all fail after the delay, for exercising rollback.
#[derive(Debug, Clone, Default)]
pub struct SimulatedBackend {
    rejection: Option<String>,
}

impl SimulatedBackend {
    /// A backend whose calls always succeed
    #[must_use]
    pub const fn new() -> Self {
        Self { rejection: None }
    }

    /// A backend whose calls always fail with `reason`
    #[must_use]
    pub fn rejecting(reason: impl Into<String>) -> Self {
        Self {
            rejection: Some(reason.into()),
        }
    }

    fn respond<T>(&self, data: T, delay: Duration) -> ApiFuture<T>
    where
        T: Send + 'static,
    {
        let rejection = self.rejection.clone();
        Box::pin(async move {
            let data = simulate_api_call(data, delay).await;
            match rejection {
                Some(reason) => Err(ApiError::Rejected { reason }),
                None => Ok(data),
            }
        })
    }
}

impl Backend for SimulatedBackend {
    fn create_todo(&self, todo: Todo, delay: Duration) -> ApiFuture<Todo> {
        tracing::debug!(id = %todo.id, ?delay, "Simulating create_todo");
        self.respond(todo, delay)
    }

    fn delete_todo(&self, id: TodoId, delay: Duration) -> ApiFuture<TodoId> {
        tracing::debug!(%id, ?delay, "Simulating delete_todo");
        self.respond(id, delay)
    }

    fn fetch_user(&self, user_id: u64, delay: Duration) -> ApiFuture<UserProfile> {
        tracing::debug!(user_id, ?delay, "Simulating fetch_user");
        if user_id == UserProfile::demo().id {
            return self.respond(UserProfile::demo(), delay);
        }
        Box::pin(async move {
            tokio::time::sleep(delay).await;
            Err(ApiError::NotFound {
                what: format!("user {user_id}"),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn simulate_api_call_waits_then_returns_input() {
        let start = tokio::time::Instant::now();
        let value = simulate_api_call("payload", Duration::from_millis(1500)).await;

        assert_eq!(value, "payload");
        assert!(start.elapsed() >= Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn simulated_backend_echoes_todo() {
        let backend = SimulatedBackend::new();
        let todo = Todo::new(TodoId::new(9), "Buy milk");

        let stored = backend
            .create_todo(todo.clone(), Duration::from_millis(10))
            .await;

        assert_eq!(stored, Ok(todo));
    }

    #[tokio::test(start_paused = true)]
    async fn rejecting_backend_fails_after_delay() {
        let backend = SimulatedBackend::rejecting("offline");
        let start = tokio::time::Instant::now();

        let result = backend.delete_todo(TodoId::new(1), Duration::from_millis(20)).await;

        assert_eq!(
            result,
            Err(ApiError::Rejected {
                reason: "offline".to_string()
            })
        );
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_user_is_not_found() {
        let backend = SimulatedBackend::new();
        let result = backend.fetch_user(99, Duration::from_millis(5)).await;
        assert!(matches!(result, Err(ApiError::NotFound { .. })));
    }
}
