//! Execution engine for Quarry
//!
//! This crate joins the compiler to a live engine:
//! - ConnectOptions: connection configuration, init commands, `quarry.toml`
//! - EngineSession: the seam every engine connection implements
//! - SqliteSession: the bundled rusqlite session
//! - Database: compile + execute + project, with soft-fail error state,
//!   statement logs and dry-run
//!
//! The engine is synchronous. Asynchrony and isolation live one layer up,
//! in the execution host and the proxy.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod database;
pub mod options;
pub mod session;
pub mod sqlite;

pub use database::{Database, ErrorInfo, StatementMeta};
pub use options::{ConnectOptions, Isolation, CONFIG_FILE_NAME};
pub use session::{EngineInfo, EngineSession, StatementResult};
pub use sqlite::SqliteSession;
