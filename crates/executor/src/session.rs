//! Stateful session for transaction support.
//!
//! The [`Session`] wraps an [`Executor`] and tracks whether a transaction is
//! open, so `Begin`/`Commit`/`Rollback` are rejected when they do not fit the
//! current state instead of reaching the engine.
//!
//! # Usage
//!
//! ```ignore
//! use quarry_executor::Session;
//!
//! let mut session = Session::new(db);
//!
//! session.execute(Command::Begin)?;
//! session.execute(Command::Insert { table: "t".into(), rows })?;
//! session.execute(Command::Commit)?;
//! ```

use std::sync::Arc;

use parking_lot::Mutex;
use quarry_engine::Database;
use tracing::warn;

use crate::{Command, Error, Executor, Output, Result};

/// A stateful session that wraps an [`Executor`] and owns the transaction
/// flag for its database.
pub struct Session {
    executor: Executor,
    db: Arc<Mutex<Database>>,
    in_transaction: bool,
}

impl Session {
    /// Create a new session owning `db`.
    pub fn new(db: Database) -> Self {
        let db = Arc::new(Mutex::new(db));
        Self {
            executor: Executor::new(db.clone()),
            db,
            in_transaction: false,
        }
    }

    /// Returns whether a transaction is currently active.
    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    /// Execute a command, enforcing transaction state.
    pub fn execute(&mut self, cmd: Command) -> Result<Output> {
        match cmd {
            Command::Begin => {
                if self.in_transaction {
                    return Err(Error::TransactionAlreadyActive);
                }
                let output = self.executor.execute(Command::Begin)?;
                self.in_transaction = true;
                Ok(output)
            }
            Command::Commit | Command::Rollback => {
                if !self.in_transaction {
                    return Err(Error::TransactionNotActive);
                }
                // The engine ends the transaction even when commit fails.
                self.in_transaction = false;
                self.executor.execute(cmd)
            }
            other => self.executor.execute(other),
        }
    }

    /// Get a reference to the underlying executor.
    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// Shared handle to the database.
    pub fn database(&self) -> Arc<Mutex<Database>> {
        self.db.clone()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.in_transaction {
            warn!(target: "quarry::host", "Session dropped with an open transaction; rolling back");
            if let Err(e) = self.db.lock().rollback() {
                warn!(target: "quarry::host", error = %e, "Rollback on drop failed");
            }
        }
    }
}
