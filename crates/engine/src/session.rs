//! Engine session seam
//!
//! An [`EngineSession`] is one live connection to a relational engine. It
//! receives fully compiled SQL with its parameter map and hands back
//! materialized rows; it never sees descriptors. The bundled implementation
//! is [`SqliteSession`](crate::SqliteSession); other engines plug in through
//! [`Database::with_session`](crate::Database::with_session).

use quarry_core::{Map, ParamMap, QuarryResult, Value};
use serde::{Deserialize, Serialize};

/// Materialized outcome of one statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatementResult {
    /// Result column names in engine order
    pub columns: Vec<String>,
    /// Rows keyed by column name
    pub rows: Vec<Map>,
    /// Rows changed by a write
    pub affected: u64,
}

impl StatementResult {
    /// First column of the first row.
    pub fn first_value(&self) -> Option<&Value> {
        self.rows.first().and_then(|row| row.first()).map(|(_, v)| v)
    }
}

/// Connection attributes reported by `info`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineInfo {
    /// Server version string
    pub server: String,
    /// Driver name
    pub driver: String,
    /// Client library version
    pub client: String,
    /// Engine version
    pub version: String,
    /// Connection description
    pub connection: String,
    /// Data source name
    pub dsn: String,
}

/// One live engine connection.
pub trait EngineSession: Send {
    /// Run one statement with its bindings.
    fn execute(&mut self, sql: &str, params: &ParamMap) -> QuarryResult<StatementResult>;

    /// Run a parameterless script (init commands, transaction control).
    fn execute_batch(&mut self, sql: &str) -> QuarryResult<()>;

    /// Start a transaction.
    fn begin(&mut self) -> QuarryResult<()> {
        self.execute_batch("BEGIN")
    }

    /// Commit the open transaction.
    fn commit(&mut self) -> QuarryResult<()> {
        self.execute_batch("COMMIT")
    }

    /// Roll back the open transaction.
    fn rollback(&mut self) -> QuarryResult<()> {
        self.execute_batch("ROLLBACK")
    }

    /// Identifier generated by the last insert, optionally for a named sequence.
    fn last_insert_id(&mut self, name: Option<&str>) -> QuarryResult<Value>;

    /// Connection attributes.
    fn info(&self) -> EngineInfo;
}
