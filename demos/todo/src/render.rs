//! Plain-text rendering of todo and profile state.

use crate::profile::{ProfileState, Resource};
use crate::types::{FormState, Todo, TodoState};
use std::fmt::Write as _;

/// Shown when the overlay is empty
pub const EMPTY_LIST: &str = "No todos yet. Add one above!";

/// Shown while the profile is loading
pub const PROFILE_FALLBACK: &str = "Loading user profile...";

/// Renders one row of the list
#[must_use]
pub fn todo_row(todo: &Todo, deleting: bool) -> String {
    let check = if todo.completed { "[x]" } else { "[ ]" };
    let mut row = format!("{check} #{} {}", todo.id, todo.text);
    if todo.pending {
        row.push_str(" (adding...)");
    }
    if deleting {
        row.push_str(" (deleting...)");
    }
    row
}

/// Renders the list header, every visible row, then the todos whose delete
/// is still being confirmed
#[must_use]
pub fn todo_list(state: &TodoState) -> String {
    let visible = state.visible_list();
    let mut out = String::from("Todos");
    if state.is_updating() {
        out.push_str(" (Updating...)");
    }
    out.push('\n');

    if visible.is_empty() {
        let _ = writeln!(out, "  {EMPTY_LIST}");
    }
    for todo in &visible {
        let _ = writeln!(out, "  {}", todo_row(todo, false));
    }
    for todo in state.deleting.values() {
        let _ = writeln!(out, "  {}", todo_row(todo, true));
    }

    if !visible.is_empty() {
        let _ = writeln!(
            out,
            "  {}/{} completed",
            state.completed_count(),
            state.count()
        );
    }
    if let Some(error) = &state.last_error {
        let _ = writeln!(out, "  error: {error}");
    }
    out
}

/// Renders the add form's button label
#[must_use]
pub fn form(form: &FormState) -> String {
    if form.is_pending() {
        "Adding...".to_string()
    } else {
        "Add Todo".to_string()
    }
}

/// Renders the profile card, or the fallback while loading
#[must_use]
pub fn profile(state: &ProfileState) -> String {
    match &state.profile {
        None | Some(Resource::Pending) => PROFILE_FALLBACK.to_string(),
        Some(Resource::Resolved(user)) => format!(
            "{} <{}>\n  {} (user #{})",
            user.name, user.email, user.role, user.id
        ),
        Some(Resource::Failed(error)) => format!("Profile unavailable: {error}"),
    }
}
