//! Request/response protocol between a connection and its host.
//!
//! | Direction | Message | When |
//! |-----------|---------|------|
//! | caller → host | `Request::Configure` | exactly once, first |
//! | host → caller | `Response::Ready` / `Response::Failure` | reply to `Configure` |
//! | caller → host | `Request::Call` | any number, one in flight |
//! | host → caller | `Response::Success` / `Response::Failure` | reply to each `Call` |
//!
//! Live engine objects never cross the boundary: statements travel as
//! [`StatementMeta`](quarry_engine::StatementMeta) and errors as [`Failure`].

use std::backtrace::Backtrace;

use quarry_engine::ConnectOptions;
use serde::{Deserialize, Serialize};

use crate::{Command, Error, ErrorKind, Output};

/// Message sent to a host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Request {
    /// Open the database; first message only
    Configure(ConnectOptions),
    /// Run one command
    Call(Command),
}

/// Message sent back by a host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Response {
    /// Database opened
    Ready,
    /// Command succeeded
    Success(Output),
    /// Configuration or command failed
    Failure(Failure),
}

/// Serializable description of an error raised inside a host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Failure {
    /// Error kind
    pub kind: ErrorKind,
    /// Human readable reason
    pub message: String,
    /// Engine code when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Where the failure happened (`host-id/command`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,
    /// `command: statement` for engine failures, backtrace for panics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
}

impl Failure {
    /// Describe `err`, raised while serving `site`.
    pub fn from_error(err: Error, site: Option<String>) -> Self {
        let kind = err.kind();
        let message = err.reason();
        let (code, trace) = match err {
            Error::Engine { code, trace, .. } => (code, trace),
            _ => (None, None),
        };
        Self {
            kind,
            message,
            code,
            site,
            trace,
        }
    }

    /// Describe a panic payload caught while serving `site`.
    pub fn from_panic(payload: Box<dyn std::any::Any + Send>, site: Option<String>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self {
            kind: ErrorKind::Internal,
            message: format!("host panicked: {message}"),
            code: None,
            site,
            trace: Some(Backtrace::force_capture().to_string()),
        }
    }
}

/// Rebuild the closed error from its wire description.
impl From<Failure> for Error {
    fn from(failure: Failure) -> Self {
        let Failure {
            kind,
            message: reason,
            code,
            trace,
            ..
        } = failure;
        match kind {
            ErrorKind::Validation => Error::Validation { reason },
            ErrorKind::Compile => Error::Compile { reason },
            ErrorKind::Engine => Error::Engine {
                reason,
                code,
                trace,
            },
            ErrorKind::Transport => Error::Transport { reason },
            ErrorKind::Timeout => Error::Timeout { reason },
            ErrorKind::TransactionNotActive => Error::TransactionNotActive,
            ErrorKind::TransactionAlreadyActive => Error::TransactionAlreadyActive,
            ErrorKind::Internal => Error::Internal { reason },
        }
    }
}
