//! Error types for the to-do list domain.
//!
//! Both error kinds are recovered inside the request handler that produced
//! them; neither ever becomes an HTTP error status.
//!
//! # Error Types
//!
//! - [`TodoError::Validation`] - A list or todo name was rejected. The handler
//!   stores the message as an error flash and re-renders the originating form.
//! - [`TodoError::NotFound`] - A referenced list or todo does not exist. The handler
//!   stores the message as an error flash and redirects to the list index.
//!
//! # Example
//!
//! ```rust
//! use todo_lists_server::error::TodoError;
//!
//! let err = TodoError::validation("The list name must be unique.");
//! assert!(err.is_validation());
//! assert_eq!(err.message(), "The list name must be unique.");
//! ```

use thiserror::Error;

/// Flash message for list names outside the allowed length range.
pub const LIST_NAME_LENGTH_MESSAGE: &str = "The list name must be between 1 and 100 characters.";

/// Flash message for list names already used in the session.
pub const LIST_NAME_UNIQUE_MESSAGE: &str = "The list name must be unique.";

/// Flash message for todo names outside the allowed length range.
pub const TODO_NAME_LENGTH_MESSAGE: &str = "Todo name must be between 1 and 100 characters.";

/// Flash message for a list id that does not resolve.
pub const LIST_NOT_FOUND_MESSAGE: &str = "The specified list was not found.";

/// Flash message for a todo id that does not resolve.
pub const TODO_NOT_FOUND_MESSAGE: &str = "The specified todo was not found.";

/// Errors produced by the to-do list domain operations.
///
/// The `Display` output is the user-facing message, so it can be placed
/// into a flash without further formatting.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TodoError {
    /// Invalid, duplicate, or out-of-range name.
    #[error("{0}")]
    Validation(String),

    /// The referenced list or todo id is absent from the session.
    #[error("{0}")]
    NotFound(String),
}

impl TodoError {
    /// Creates a new validation error.
    ///
    /// # Example
    ///
    /// ```rust
    /// use todo_lists_server::error::TodoError;
    ///
    /// let err = TodoError::validation("name too long");
    /// assert!(matches!(err, TodoError::Validation(_)));
    /// ```
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a new not-found error.
    ///
    /// # Example
    ///
    /// ```rust
    /// use todo_lists_server::error::TodoError;
    ///
    /// let err = TodoError::not_found("no such list");
    /// assert!(matches!(err, TodoError::NotFound(_)));
    /// ```
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// The not-found error raised when a list id does not resolve.
    pub fn list_not_found() -> Self {
        Self::not_found(LIST_NOT_FOUND_MESSAGE)
    }

    /// The not-found error raised when a todo id does not resolve.
    pub fn todo_not_found() -> Self {
        Self::not_found(TODO_NOT_FOUND_MESSAGE)
    }

    /// Returns the user-facing message carried by this error.
    pub fn message(&self) -> &str {
        match self {
            Self::Validation(msg) | Self::NotFound(msg) => msg,
        }
    }

    /// Returns `true` if this error should re-render a form rather than redirect.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// A specialized Result type for domain operations.
pub type Result<T> = std::result::Result<T, TodoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_displays_message_verbatim() {
        let err = TodoError::validation(LIST_NAME_UNIQUE_MESSAGE);
        assert_eq!(err.to_string(), "The list name must be unique.");
    }

    #[test]
    fn not_found_error_displays_message_verbatim() {
        let err = TodoError::list_not_found();
        assert_eq!(err.to_string(), "The specified list was not found.");
    }

    #[test]
    fn message_matches_display() {
        let err = TodoError::validation(TODO_NAME_LENGTH_MESSAGE);
        assert_eq!(err.message(), err.to_string());

        let err = TodoError::not_found("gone");
        assert_eq!(err.message(), "gone");
    }

    #[test]
    fn is_validation_distinguishes_kinds() {
        assert!(TodoError::validation("bad").is_validation());
        assert!(!TodoError::list_not_found().is_validation());
    }

    #[test]
    fn from_error_works_with_question_mark() {
        fn inner() -> Result<()> {
            let _: () = Err(TodoError::validation("bad"))?;
            Ok(())
        }

        assert!(matches!(inner(), Err(TodoError::Validation(_))));
    }

    #[test]
    fn todo_error_is_clone_and_eq() {
        let err1 = TodoError::list_not_found();
        let err2 = err1.clone();
        assert_eq!(err1, err2);
    }
}
