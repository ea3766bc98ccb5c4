//! Optimistic todo list.
//!
//! Submitted todos show up immediately, marked pending, and are committed
//! once a (simulated) backend confirms them. Confirmations may arrive in any
//! order; the list always reads committed todos first, then pending ones in
//! submission order.
//!
//! - [`types`]: domain model and the overlay projection
//! - [`reducer`]: intents and confirmations
//! - [`api`]: the backend seam and its simulated implementation
//! - [`profile`]: a deferred user profile resource
//! - [`render`]: plain-text views
//! - [`config`]: environment-driven settings
//!
//! # Quick Start
//!
//! ```no_run
//! use optimistic_todo::{TodoAction, TodoEnvironment, TodoReducer, TodoState};
//! use optimist_core::environment::SystemClock;
//! use optimist_runtime::Store;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let env = TodoEnvironment::simulated(Arc::new(SystemClock));
//! let store = Store::new(TodoState::seeded(), TodoReducer::new(), env);
//!
//! store.send(TodoAction::submit("Buy milk")).await?;
//!
//! // Visible at once, marked pending
//! let visible = store.state(TodoState::visible_list).await;
//! assert!(visible.last().is_some_and(|t| t.pending));
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod profile;
pub mod reducer;
pub mod render;
pub mod types;

pub use api::{ApiError, Backend, SimulatedBackend, simulate_api_call};
pub use config::{ConfigError, TodoConfig};
pub use profile::{ProfileAction, ProfileEnvironment, ProfileReducer, ProfileState, Resource, UserProfile};
pub use reducer::{TodoEnvironment, TodoReducer, add_effect_id};
pub use types::{FormState, Todo, TodoAction, TodoId, TodoState, project};
