//! Error types for command execution.
//!
//! All errors a caller of the executor (or of a proxied connection) can see
//! are represented by the [`Error`] enum. These errors are:
//! - **Structured**: each variant has typed fields
//! - **Serializable**: they cross the host boundary as a [`Failure`](crate::Failure)
//! - **Lossless**: kind, message, code and trace survive the round trip

use serde::{Deserialize, Serialize};

/// Command execution errors.
///
/// # Categories
///
/// | Category | Variants | Description |
/// |----------|----------|-------------|
/// | Input | `Validation`, `Compile` | Descriptor rejected before any SQL runs |
/// | Engine | `Engine` | The database refused the statement |
/// | Channel | `Transport`, `Timeout` | Host unreachable or too slow to close |
/// | Transaction | `TransactionNotActive`, `TransactionAlreadyActive` | Transaction state |
/// | System | `Internal` | Host panic or protocol violation |
///
/// # Example
///
/// ```ignore
/// match conn.select(query).await {
///     Ok(rows) => { /* … */ }
///     Err(Error::Engine { reason, code, .. }) => {
///         println!("engine said {reason} ({code:?})");
///     }
///     Err(e) => println!("Error: {}", e),
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
pub enum Error {
    // ==================== Input ====================
    /// Identifier, operator or option rejected
    #[error("validation error: {reason}")]
    Validation { reason: String },

    /// Descriptor shape cannot be compiled
    #[error("compile error: {reason}")]
    Compile { reason: String },

    // ==================== Engine ====================
    /// Engine rejected a statement
    #[error("engine error: {reason}")]
    Engine {
        reason: String,
        code: Option<String>,
        trace: Option<String>,
    },

    // ==================== Channel ====================
    /// Host died, channel closed or frame undecodable
    #[error("transport error: {reason}")]
    Transport { reason: String },

    /// A bounded wait expired
    #[error("timeout: {reason}")]
    Timeout { reason: String },

    // ==================== Transaction ====================
    /// No active transaction
    #[error("no active transaction")]
    TransactionNotActive,

    /// Transaction already active
    #[error("transaction already active")]
    TransactionAlreadyActive,

    // ==================== System ====================
    /// Internal error (host panic or protocol violation)
    #[error("internal error: {reason}")]
    Internal { reason: String },
}

/// Error kind tag carried by a [`Failure`](crate::Failure).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// See [`Error::Validation`]
    Validation,
    /// See [`Error::Compile`]
    Compile,
    /// See [`Error::Engine`]
    Engine,
    /// See [`Error::Transport`]
    Transport,
    /// See [`Error::Timeout`]
    Timeout,
    /// See [`Error::TransactionNotActive`]
    TransactionNotActive,
    /// See [`Error::TransactionAlreadyActive`]
    TransactionAlreadyActive,
    /// See [`Error::Internal`]
    Internal,
}

impl Error {
    /// Kind tag of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation { .. } => ErrorKind::Validation,
            Error::Compile { .. } => ErrorKind::Compile,
            Error::Engine { .. } => ErrorKind::Engine,
            Error::Transport { .. } => ErrorKind::Transport,
            Error::Timeout { .. } => ErrorKind::Timeout,
            Error::TransactionNotActive => ErrorKind::TransactionNotActive,
            Error::TransactionAlreadyActive => ErrorKind::TransactionAlreadyActive,
            Error::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Human readable reason without the kind prefix.
    pub fn reason(&self) -> String {
        match self {
            Error::Validation { reason }
            | Error::Compile { reason }
            | Error::Engine { reason, .. }
            | Error::Transport { reason }
            | Error::Timeout { reason }
            | Error::Internal { reason } => reason.clone(),
            other => other.to_string(),
        }
    }

    /// Transport failure shorthand.
    pub fn transport(reason: impl Into<String>) -> Self {
        Error::Transport {
            reason: reason.into(),
        }
    }

    /// Internal failure shorthand.
    pub fn internal(reason: impl Into<String>) -> Self {
        Error::Internal {
            reason: reason.into(),
        }
    }
}
