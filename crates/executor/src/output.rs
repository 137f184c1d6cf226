//! Output enum for command execution results.
//!
//! Every command produces exactly one output variant; the mapping is
//! documented on each [`Command`](crate::Command) variant.

use quarry_core::Value;
use quarry_engine::{EngineInfo, StatementMeta};
use serde::{Deserialize, Serialize};

/// Successful command execution results.
///
/// # Example
///
/// ```text
/// match executor.execute(Command::Has { query })? {
///     Output::Bool(found) => println!("found: {found}"),
///     _ => unreachable!("Has always returns Bool"),
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Output {
    // ==================== Primitive Results ====================
    /// No return value (transaction control)
    Unit,

    /// Projected rows or a single projected row
    Value(Value),

    /// Optional scalar (aggregate, id, property)
    Maybe(Option<Value>),

    /// Boolean result
    Bool(bool),

    // ==================== Statements ====================
    /// Executed statement, or `None` under dry-run
    Statement(Option<StatementMeta>),

    // ==================== Session ====================
    /// Connection attributes
    Info(EngineInfo),

    /// Optional text (last statement)
    Text(Option<String>),

    /// List of texts (statement log)
    Texts(Vec<String>),

    /// Liveness answer
    Pong {
        /// Host crate version
        version: String,
    },
}

impl Output {
    /// Variant name for mismatch messages.
    pub fn variant(&self) -> &'static str {
        match self {
            Output::Unit => "Unit",
            Output::Value(_) => "Value",
            Output::Maybe(_) => "Maybe",
            Output::Bool(_) => "Bool",
            Output::Statement(_) => "Statement",
            Output::Info(_) => "Info",
            Output::Text(_) => "Text",
            Output::Texts(_) => "Texts",
            Output::Pong { .. } => "Pong",
        }
    }
}
