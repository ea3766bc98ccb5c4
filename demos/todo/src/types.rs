//! Domain types for the optimistic todo list.
//!
//! The list is split in two: `committed` holds todos the backend has
//! confirmed, `in_flight` holds additions that were submitted but not yet
//! confirmed. Readers never look at either directly; they read the overlay
//! produced by [`project`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Unique identifier for a todo item
///
/// Derived from the creation timestamp in milliseconds, bumped past the last
/// issued id when two todos are created in the same millisecond.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TodoId(i64);

impl TodoId {
    /// Creates a `TodoId` from a raw value
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw value
    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for TodoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TodoId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().trim_start_matches('#').parse().map(Self)
    }
}

/// A single todo item
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    /// Unique identifier
    pub id: TodoId,
    /// Trimmed, non-empty description
    pub text: String,
    /// Whether the todo is completed
    pub completed: bool,
    /// Set only on overlay entries whose addition is not yet confirmed
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub pending: bool,
}

impl Todo {
    /// Creates a new, uncompleted todo
    #[must_use]
    pub fn new(id: TodoId, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            completed: false,
            pending: false,
        }
    }

    /// Returns a copy marked as not yet confirmed
    #[must_use]
    pub fn as_pending(&self) -> Self {
        Self {
            pending: true,
            ..self.clone()
        }
    }
}

/// Builds the optimistic view: every committed todo, then every in-flight
/// addition in submission order, marked pending.
#[must_use]
pub fn project(committed: &[Todo], in_flight: &[Todo]) -> Vec<Todo> {
    committed
        .iter()
        .cloned()
        .chain(in_flight.iter().map(Todo::as_pending))
        .collect()
}

/// State of the "add todo" form
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormState {
    /// Current contents of the text field
    pub input: String,
    /// Submissions whose confirmation has not resolved yet
    pub outstanding: usize,
}

impl FormState {
    /// Form-scoped busy indicator
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.outstanding > 0
    }

    pub(crate) fn settle_one(&mut self) {
        self.outstanding = self.outstanding.saturating_sub(1);
    }
}

/// State of the optimistic todo list
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TodoState {
    /// Confirmed todos in display order
    pub committed: Vec<Todo>,
    /// Submitted additions awaiting confirmation, in submission order
    pub in_flight: Vec<Todo>,
    /// Deleted todos whose delete confirmation is still outstanding
    pub deleting: BTreeMap<TodoId, Todo>,
    /// The add form
    pub form: FormState,
    /// Highest id handed out so far
    pub last_issued_id: i64,
    /// Last confirmation failure (if any)
    pub last_error: Option<String>,
}

impl TodoState {
    /// Creates a new empty todo state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a state holding the given committed todos
    #[must_use]
    pub fn with_todos(todos: Vec<Todo>) -> Self {
        let last_issued_id = todos.iter().map(|t| t.id.value()).max().unwrap_or(0);
        Self {
            committed: todos,
            last_issued_id,
            ..Self::default()
        }
    }

    /// The list the demo starts with
    #[must_use]
    pub fn seeded() -> Self {
        Self::with_todos(vec![
            Todo::new(TodoId::new(1), "Learn React 19 Actions"),
            Todo::new(TodoId::new(2), "Build a demo app"),
            Todo::new(TodoId::new(3), "Share with the community"),
        ])
    }

    /// The optimistic view shown to users
    #[must_use]
    pub fn visible_list(&self) -> Vec<Todo> {
        project(&self.committed, &self.in_flight)
    }

    /// Returns a committed todo by ID
    #[must_use]
    pub fn get(&self, id: TodoId) -> Option<&Todo> {
        self.committed.iter().find(|t| t.id == id)
    }

    /// Whether `id` is an unconfirmed addition
    #[must_use]
    pub fn is_pending(&self, id: TodoId) -> bool {
        self.in_flight.iter().any(|t| t.id == id)
    }

    /// Whether a delete of `id` is awaiting confirmation
    #[must_use]
    pub fn is_deleting(&self, id: TodoId) -> bool {
        self.deleting.contains_key(&id)
    }

    /// Whether any addition is awaiting confirmation
    #[must_use]
    pub fn is_updating(&self) -> bool {
        !self.in_flight.is_empty()
    }

    /// Number of committed todos
    #[must_use]
    pub fn count(&self) -> usize {
        self.committed.len()
    }

    /// Number of completed committed todos
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.committed.iter().filter(|t| t.completed).count()
    }

    /// Hands out an id greater than every id issued or held so far
    pub(crate) fn allocate_id(&mut self, now_millis: i64) -> TodoId {
        let floor = self
            .committed
            .iter()
            .chain(&self.in_flight)
            .map(|t| t.id.value())
            .fold(self.last_issued_id, i64::max);
        let id = now_millis.max(floor.saturating_add(1));
        self.last_issued_id = id;
        TodoId::new(id)
    }
}

/// Actions for the todo list
///
/// User intents (`Submit`, `ToggleCompleted`, `Delete`, form edits) and the
/// confirmation results the backend feeds back.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TodoAction {
    // ========== Form ==========
    /// The text field was edited
    InputChanged {
        /// New field contents
        text: String,
    },

    /// Submit whatever the text field holds
    SubmitForm,

    // ========== Intents ==========
    /// Add a todo optimistically
    Submit {
        /// Raw text, trimmed before use
        text: String,
        /// Override for the confirmation delay
        confirm_after: Option<Duration>,
    },

    /// Flip `completed` on a committed todo
    ToggleCompleted {
        /// Todo to toggle
        id: TodoId,
    },

    /// Remove a todo
    Delete {
        /// Todo to delete
        id: TodoId,
        /// Override for the confirmation delay
        confirm_after: Option<Duration>,
    },

    // ========== Confirmations ==========
    /// The backend accepted an addition
    AddConfirmed {
        /// The confirmed todo
        todo: Todo,
    },

    /// The backend rejected an addition
    AddFailed {
        /// Rejected todo
        id: TodoId,
        /// Backend message
        reason: String,
    },

    /// The backend finished a delete
    DeleteConfirmed {
        /// Deleted todo
        id: TodoId,
    },

    /// The backend rejected a delete
    DeleteFailed {
        /// Todo whose delete failed
        id: TodoId,
        /// Backend message
        reason: String,
    },
}

impl TodoAction {
    /// Submit `text` with the default confirmation delay
    #[must_use]
    pub fn submit(text: impl Into<String>) -> Self {
        Self::Submit {
            text: text.into(),
            confirm_after: None,
        }
    }

    /// Submit `text`, confirming after `delay`
    #[must_use]
    pub fn submit_after(text: impl Into<String>, delay: Duration) -> Self {
        Self::Submit {
            text: text.into(),
            confirm_after: Some(delay),
        }
    }

    /// Delete `id` with the default confirmation delay
    #[must_use]
    pub const fn delete(id: TodoId) -> Self {
        Self::Delete {
            id,
            confirm_after: None,
        }
    }

    /// Toggle `id`
    #[must_use]
    pub const fn toggle(id: TodoId) -> Self {
        Self::ToggleCompleted { id }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn todo_id_parses_with_hash_prefix() {
        assert_eq!("#42".parse::<TodoId>().unwrap(), TodoId::new(42));
        assert_eq!(" 7 ".parse::<TodoId>().unwrap(), TodoId::new(7));
        assert!("seven".parse::<TodoId>().is_err());
    }

    #[test]
    fn project_appends_pending_after_committed() {
        let committed = vec![Todo::new(TodoId::new(1), "a")];
        let in_flight = vec![Todo::new(TodoId::new(5), "b"), Todo::new(TodoId::new(3), "c")];

        let overlay = project(&committed, &in_flight);

        let texts: Vec<_> = overlay.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, ["a", "b", "c"]);
        assert!(!overlay[0].pending);
        assert!(overlay[1].pending && overlay[2].pending);
    }

    #[test]
    fn seeded_state_has_three_todos() {
        let state = TodoState::seeded();
        assert_eq!(state.count(), 3);
        assert_eq!(state.completed_count(), 0);
        assert_eq!(state.last_issued_id, 3);
    }

    #[test]
    fn allocate_id_never_repeats() {
        let mut state = TodoState::new();
        let first = state.allocate_id(1_000);
        let second = state.allocate_id(1_000);
        let third = state.allocate_id(999);

        assert_eq!(first, TodoId::new(1_000));
        assert_eq!(second, TodoId::new(1_001));
        assert_eq!(third, TodoId::new(1_002));
    }

    #[test]
    fn allocate_id_skips_existing_ids() {
        let mut state = TodoState::with_todos(vec![Todo::new(TodoId::new(50), "x")]);
        assert_eq!(state.allocate_id(10), TodoId::new(51));
    }

    #[test]
    fn pending_flag_is_omitted_when_false() {
        let todo = Todo::new(TodoId::new(1), "Buy milk");
        let json = serde_json::to_string(&todo).unwrap();
        assert!(!json.contains("pending"));

        let json = serde_json::to_string(&todo.as_pending()).unwrap();
        assert!(json.contains("\"pending\":true"));
    }

    #[test]
    fn form_pending_tracks_outstanding() {
        let mut form = FormState::default();
        assert!(!form.is_pending());
        form.outstanding = 1;
        assert!(form.is_pending());
        form.settle_one();
        form.settle_one();
        assert_eq!(form.outstanding, 0);
    }
}
