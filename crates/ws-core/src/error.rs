//! Error types for the ws client.

use thiserror::Error;

/// A shared error type for every ws crate.
///
/// All variants are terminal at the process level: the binary reports the
/// message on stderr and exits with status 1.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WsError {
    /// Malformed or missing command-line arguments
    #[error("Usage error: {0}")]
    Usage(String),

    /// The destination argument is not a usable websocket URL
    #[error("Invalid URL '{input}': {message}")]
    Parse { input: String, message: String },

    /// The transport could not establish or maintain the connection
    #[error("Connection error: {reason}")]
    Connection { reason: String },

    /// Reading user input failed
    #[error("Input error: {message}")]
    Input { message: String },

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl WsError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a Usage error
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage(message.into())
    }

    /// Creates a Parse error for the given input
    pub fn parse(input: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            input: input.into(),
            message: message.into(),
        }
    }

    /// Creates a Connection error
    pub fn connection(reason: impl Into<String>) -> Self {
        Self::Connection {
            reason: reason.into(),
        }
    }

    /// Creates an Input error
    pub fn input(message: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
        }
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a Usage error
    pub fn is_usage(&self) -> bool {
        matches!(self, Self::Usage(_))
    }

    /// Check if this is a Parse error
    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse { .. })
    }

    /// Check if this is a Connection error
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }

    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        1
    }
}

impl From<std::io::Error> for WsError {
    fn from(err: std::io::Error) -> Self {
        Self::input(err.to_string())
    }
}

/// Convenience alias used across the ws crates.
pub type Result<T> = std::result::Result<T, WsError>;
