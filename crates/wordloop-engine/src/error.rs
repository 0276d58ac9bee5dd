//! Error types for the Wordloop study engine.
//!
//! This module defines the error hierarchy for all engine operations,
//! including configuration loading, queue building, session actions and
//! persistence through a [`crate::WordStore`].

use std::path::PathBuf;

/// A specialized `Result` type for Wordloop engine operations.
pub type Result<T> = std::result::Result<T, WordloopError>;

/// Errors that can occur while building queues or driving a study session.
///
/// Error variants are organized by subsystem and include actionable suggestions
/// where possible to help users resolve issues.
#[derive(Debug, thiserror::Error)]
pub enum WordloopError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Invalid JSON syntax in configuration file.
    #[error("Invalid JSON in config file '{path}': {message}\n\nSuggestion: Validate your wordloop.json with a JSON linter")]
    ConfigParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    /// Configuration validation failed.
    #[error("Invalid configuration: {message}\n\nSuggestion: {suggestion}")]
    ConfigValidationError {
        /// Description of the validation failure.
        message: String,
        /// Actionable suggestion for the user.
        suggestion: String,
    },

    // ========================================================================
    // Session Errors
    // ========================================================================
    /// There are no due reviews and no new words; the session never starts.
    #[error("Nothing to study today: no due reviews and no new words\n\nSuggestion: Add words to your word list or come back tomorrow")]
    EmptyQueue,

    /// The submitted input was rejected without touching session state.
    #[error("Malformed input: {message}")]
    MalformedInput {
        /// Why the input was rejected.
        message: String,
    },

    /// The action is not valid for the current phase or step.
    #[error("Invalid action '{action}' while {state}")]
    InvalidAction {
        /// The attempted action (e.g. "submit_spelling").
        action: String,
        /// Description of the current session position.
        state: String,
    },

    /// No study session is active.
    #[error("No active study session\n\nSuggestion: Start a session first")]
    NoActiveSession,

    // ========================================================================
    // Persistence Errors
    // ========================================================================
    /// A read or write against the word-state store, catalog or session log failed.
    #[error("Persistence failure during {operation}: {message}\n\nSuggestion: Check the store location and retry; in-memory progress was kept")]
    Persistence {
        /// The store operation that failed (e.g. "upsert_word_states").
        operation: String,
        /// Description of the underlying failure.
        message: String,
    },

    // ========================================================================
    // General I/O Errors
    // ========================================================================
    /// General I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WordloopError {
    /// Creates a new `ConfigParseError` with the given path and message.
    #[must_use]
    pub fn config_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ConfigParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new `ConfigValidationError` with the given message and suggestion.
    #[must_use]
    pub fn config_validation(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::ConfigValidationError {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Creates a new `MalformedInput` error.
    #[must_use]
    pub fn malformed_input(message: impl Into<String>) -> Self {
        Self::MalformedInput {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidAction` error.
    #[must_use]
    pub fn invalid_action(action: impl Into<String>, state: impl std::fmt::Display) -> Self {
        Self::InvalidAction {
            action: action.into(),
            state: state.to_string(),
        }
    }

    /// Creates a new `Persistence` error for the named store operation.
    #[must_use]
    pub fn persistence(operation: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Persistence {
            operation: operation.into(),
            message: message.to_string(),
        }
    }

    /// Returns `true` if this error is transient and the operation may be retried.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Persistence { .. } | Self::Io(_))
    }

    /// Returns `true` if this error was caused by the user rather than the system.
    ///
    /// User errors leave the session untouched.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedInput { .. } | Self::InvalidAction { .. } | Self::NoActiveSession
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = WordloopError::EmptyQueue;
        let msg = err.to_string();
        assert!(msg.contains("Nothing to study"));
        assert!(msg.contains("Suggestion"));
    }

    #[test]
    fn test_persistence_display() {
        let err = WordloopError::persistence("upsert_word_states", "disk full");
        let msg = err.to_string();
        assert!(msg.contains("upsert_word_states"));
        assert!(msg.contains("disk full"));
    }

    #[test]
    fn test_invalid_action_display() {
        let err = WordloopError::invalid_action("proceed", "phase review, step recall");
        assert_eq!(
            err.to_string(),
            "Invalid action 'proceed' while phase review, step recall"
        );
    }

    #[test]
    fn test_is_transient() {
        assert!(WordloopError::persistence("insert_session_record", "timeout").is_transient());
        assert!(!WordloopError::EmptyQueue.is_transient());
        assert!(!WordloopError::malformed_input("empty").is_transient());
    }

    #[test]
    fn test_is_user_error() {
        assert!(WordloopError::malformed_input("empty spelling").is_user_error());
        assert!(WordloopError::NoActiveSession.is_user_error());
        assert!(!WordloopError::persistence("word_state", "gone").is_user_error());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: WordloopError = io_err.into();
        assert!(matches!(err, WordloopError::Io(_)));
    }
}
