//! Command enum defining every Quarry action.
//!
//! Commands are the instruction set a connection sends to its host.
//! Every action a caller can invoke on a database is a variant here.
//!
//! Commands are:
//! - **Self-contained**: descriptors travel whole; the host compiles them
//! - **Serializable**: MessagePack on the wire, JSON in fixtures
//! - **Closed**: the executor matches exhaustively, there is no lookup by name

use quarry_compiler::{Aggregate, Query};
use quarry_core::{Map, ParamMap, Raw, Value};
use serde::{Deserialize, Serialize};

/// Readable database properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Property {
    /// Engine dialect name
    Engine,
    /// Table prefix
    Prefix,
    /// Message of the last engine failure
    Error,
    /// `{code, message}` of the last engine failure
    ErrorInfo,
    /// Readable SQL recorded by the last dry-run statement
    QueryString,
    /// Whether every statement is logged
    Logging,
    /// Whether statements are compiled only
    DryRun,
    /// Whether statements are collected instead of executed
    DebugLog,
}

/// A self-contained, serializable database action.
///
/// # Command Categories
///
/// | Category | Count | Returns |
/// |----------|-------|---------|
/// | Read | 5 | `Value`, `Bool`, `Maybe` |
/// | Write | 4 | `Statement` |
/// | Schema | 2 | `Statement` |
/// | Raw | 3 | `Statement`, `Bool` |
/// | Transaction | 3 | `Unit` |
/// | Session | 7 | `Maybe`, `Info`, `Text`, `Texts`, `Pong` |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub enum Command {
    // ==================== Read (5) ====================
    /// Projected rows.
    /// Returns: `Output::Value` (list, or map for grouped specs)
    Select { query: Query },

    /// First projected row or single value.
    /// Returns: `Output::Value` (null when nothing matches)
    Get { query: Query },

    /// Projected rows in random order.
    /// Returns: `Output::Value`
    Rand { query: Query },

    /// Whether any row matches.
    /// Returns: `Output::Bool`
    Has { query: Query },

    /// Aggregate over the column spec.
    /// Returns: `Output::Maybe`
    Aggregate { function: Aggregate, query: Query },

    // ==================== Write (4) ====================
    /// Insert one map or a list of maps.
    /// Returns: `Output::Statement`
    Insert { table: String, rows: Value },

    /// Update matching rows.
    /// Returns: `Output::Statement`
    Update {
        table: String,
        data: Map,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        conditions: Option<Value>,
    },

    /// Delete matching rows.
    /// Returns: `Output::Statement`
    Delete {
        table: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        conditions: Option<Value>,
    },

    /// `REPLACE(column, old, new)` updates.
    /// Returns: `Output::Statement`
    Replace {
        table: String,
        columns: Map,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        conditions: Option<Value>,
    },

    // ==================== Schema (2) ====================
    /// `CREATE TABLE`.
    /// Returns: `Output::Statement`
    Create {
        table: String,
        columns: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        options: Option<Value>,
    },

    /// `DROP TABLE IF EXISTS`.
    /// Returns: `Output::Statement`
    Drop { table: String },

    // ==================== Raw (3) ====================
    /// Raw fragment with `<table.column>` markers.
    /// Returns: `Output::Statement`
    Query { raw: Raw },

    /// SQL text with an explicit parameter map.
    /// Returns: `Output::Statement`
    Exec {
        sql: String,
        #[serde(default)]
        params: ParamMap,
    },

    /// Run the SQL script at a path on the host's filesystem.
    /// Returns: `Output::Bool` (`false` when the file is missing)
    Import { path: String },

    // ==================== Transaction (3) ====================
    /// Start a transaction.
    /// Returns: `Output::Unit`
    Begin,

    /// Commit the open transaction.
    /// Returns: `Output::Unit`
    Commit,

    /// Roll back the open transaction.
    /// Returns: `Output::Unit`
    Rollback,

    // ==================== Session (7) ====================
    /// Identifier generated by the last insert.
    /// Returns: `Output::Maybe`
    Id {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },

    /// Connection attributes.
    /// Returns: `Output::Info`
    Info,

    /// Readable text of the last executed statement.
    /// Returns: `Output::Text`
    Last,

    /// Readable text of every logged statement.
    /// Returns: `Output::Texts`
    Log,

    /// Drain the statements collected under the `debug_log` option.
    /// Returns: `Output::Texts`
    DebugLog,

    /// Read one property.
    /// Returns: `Output::Maybe`
    Property { name: Property },

    /// Liveness probe.
    /// Returns: `Output::Pong`
    Ping,
}

impl Command {
    /// Short action name for logs and failure sites.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Select { .. } => "select",
            Command::Get { .. } => "get",
            Command::Rand { .. } => "rand",
            Command::Has { .. } => "has",
            Command::Aggregate { .. } => "aggregate",
            Command::Insert { .. } => "insert",
            Command::Update { .. } => "update",
            Command::Delete { .. } => "delete",
            Command::Replace { .. } => "replace",
            Command::Create { .. } => "create",
            Command::Drop { .. } => "drop",
            Command::Query { .. } => "query",
            Command::Exec { .. } => "exec",
            Command::Import { .. } => "import",
            Command::Begin => "begin",
            Command::Commit => "commit",
            Command::Rollback => "rollback",
            Command::Id { .. } => "id",
            Command::Info => "info",
            Command::Last => "last",
            Command::Log => "log",
            Command::DebugLog => "debug_log",
            Command::Property { .. } => "property",
            Command::Ping => "ping",
        }
    }

    /// Whether the command runs a statement against the engine, and so can
    /// leave a soft engine error behind.
    pub fn executes_statement(&self) -> bool {
        matches!(
            self,
            Command::Select { .. }
                | Command::Get { .. }
                | Command::Rand { .. }
                | Command::Has { .. }
                | Command::Aggregate { .. }
                | Command::Insert { .. }
                | Command::Update { .. }
                | Command::Delete { .. }
                | Command::Replace { .. }
                | Command::Create { .. }
                | Command::Drop { .. }
                | Command::Query { .. }
                | Command::Exec { .. }
                | Command::Import { .. }
        )
    }
}
