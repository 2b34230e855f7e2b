//! Error types for the chatdesk core

use crate::types::intake::FieldError;
use thiserror::Error;

/// Main error type for chatdesk operations
#[derive(Debug, Error)]
pub enum ChatError {
    /// Intake form failed validation; the form stays open
    #[error("Invalid intake form: {}", format_field_errors(.0))]
    Intake(Vec<FieldError>),

    /// Operation not allowed in the current conversation mode
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Response engine failure
    #[error("Engine error: {0}")]
    Engine(String),

    /// Relay connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Malformed or unexpected relay frame
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Cookie or local storage failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenient Result type using ChatError
pub type Result<T> = std::result::Result<T, ChatError>;

fn format_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl ChatError {
    /// Create an invalid state error
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        ChatError::InvalidState(msg.into())
    }

    /// Create an engine error
    pub fn engine(msg: impl Into<String>) -> Self {
        ChatError::Engine(msg.into())
    }

    /// Create a connection error
    pub fn connection(msg: impl Into<String>) -> Self {
        ChatError::Connection(msg.into())
    }

    /// Create a protocol error
    pub fn protocol(msg: impl Into<String>) -> Self {
        ChatError::Protocol(msg.into())
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        ChatError::Storage(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        ChatError::Config(msg.into())
    }

    /// Field errors carried by an intake rejection, empty otherwise
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            ChatError::Intake(errors) => errors,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = ChatError::connection("refused");
        assert_eq!(err.to_string(), "Connection error: refused");

        let err = ChatError::invalid_state("no active form");
        assert_eq!(err.to_string(), "Invalid state: no active form");
    }

    #[test]
    fn test_intake_error_lists_fields() {
        let err = ChatError::Intake(vec![FieldError::MissingName, FieldError::MissingPhone]);
        let text = err.to_string();
        assert!(text.starts_with("Invalid intake form: "));
        assert!(text.contains(&FieldError::MissingName.to_string()));
        assert!(text.contains(&FieldError::MissingPhone.to_string()));
        assert_eq!(err.field_errors().len(), 2);
    }

    #[test]
    fn test_result_type() {
        fn returns_result() -> Result<i32> {
            Ok(42)
        }

        assert_eq!(returns_result().unwrap(), 42);
    }
}
