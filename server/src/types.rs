//! Shared data types for the to-do list server.
//!
//! This module defines the records held in a browser session: the lists,
//! their todos, and the one-shot flash messages shown on the next page.

use serde::{Deserialize, Serialize};

/// A single item within a [`TodoList`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    /// Unique within the owning list, assigned as `max + 1`.
    pub id: u64,
    pub name: String,
    pub completed: bool,
}

/// A named to-do list owned by one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoList {
    /// Unique within the session, assigned as `max + 1`.
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub todos: Vec<Todo>,
}

/// One-shot messages displayed by the next rendered page.
///
/// Handlers set a message before redirecting or rendering; the render step
/// consumes it with [`Flash::take`], so it never appears twice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<String>,
}

impl Flash {
    /// Records an error message, replacing any pending one.
    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    /// Records a success message, replacing any pending one.
    pub fn set_success(&mut self, message: impl Into<String>) {
        self.success = Some(message.into());
    }

    /// Returns the pending messages and clears them.
    pub fn take(&mut self) -> Flash {
        std::mem::take(self)
    }

    /// Returns true if no message is pending.
    pub fn is_empty(&self) -> bool {
        self.error.is_none() && self.success.is_none()
    }
}

/// Everything a browser session owns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    #[serde(default)]
    pub lists: Vec<TodoList>,
    #[serde(default)]
    pub flash: Flash,
}
