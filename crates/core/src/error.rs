//! Error types for Quarry
//!
//! Every failure a caller can observe falls into one of five kinds:
//!
//! | Kind | Raised by | Meaning |
//! |------|-----------|---------|
//! | `Validation` | compiler, options | Identifier or operator rejected before any SQL is built |
//! | `Compile` | compiler | Structurally invalid descriptor |
//! | `Engine` | engine session | The database refused the statement |
//! | `Transport` | proxy | Host died, channel closed or frame undecodable |
//! | `Timeout` | proxy | A bounded wait (close) ran out |
//!
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use thiserror::Error;

/// Result type alias for Quarry operations
pub type QuarryResult<T> = std::result::Result<T, QuarryError>;

/// Closed error taxonomy shared by the compiler, the engine and the proxy.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QuarryError {
    /// Identifier, operator or option rejected
    #[error("validation error: {message}")]
    Validation {
        /// Human readable reason
        message: String,
    },

    /// Descriptor shape cannot be compiled
    #[error("compile error: {message}")]
    Compile {
        /// Human readable reason
        message: String,
    },

    /// Engine rejected a statement
    #[error("engine error: {message}")]
    Engine {
        /// Engine message
        message: String,
        /// Engine or SQLSTATE code when known
        code: Option<String>,
    },

    /// Channel to the execution host failed
    #[error("transport error: {message}")]
    Transport {
        /// Human readable reason
        message: String,
    },

    /// A bounded wait expired
    #[error("timeout: {message}")]
    Timeout {
        /// Human readable reason
        message: String,
    },
}

impl QuarryError {
    /// Validation failure.
    pub fn validation(message: impl Into<String>) -> Self {
        QuarryError::Validation {
            message: message.into(),
        }
    }

    /// Compile failure.
    pub fn compile(message: impl Into<String>) -> Self {
        QuarryError::Compile {
            message: message.into(),
        }
    }

    /// Engine failure.
    pub fn engine(message: impl Into<String>, code: Option<String>) -> Self {
        QuarryError::Engine {
            message: message.into(),
            code,
        }
    }

    /// Transport failure.
    pub fn transport(message: impl Into<String>) -> Self {
        QuarryError::Transport {
            message: message.into(),
        }
    }

    /// Timeout.
    pub fn timeout(message: impl Into<String>) -> Self {
        QuarryError::Timeout {
            message: message.into(),
        }
    }

    /// Short kind name, stable across the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            QuarryError::Validation { .. } => "validation",
            QuarryError::Compile { .. } => "compile",
            QuarryError::Engine { .. } => "engine",
            QuarryError::Transport { .. } => "transport",
            QuarryError::Timeout { .. } => "timeout",
        }
    }

    /// Message without the kind prefix.
    pub fn message(&self) -> &str {
        match self {
            QuarryError::Validation { message }
            | QuarryError::Compile { message }
            | QuarryError::Engine { message, .. }
            | QuarryError::Transport { message }
            | QuarryError::Timeout { message } => message,
        }
    }
}
