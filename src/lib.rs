//! Quarry - structured SQL compiler with an isolated execution proxy
//!
//! Quarry turns structured query descriptors into dialect-correct,
//! parameterized SQL and runs them against an engine session that lives
//! outside the caller: on a dedicated host thread or in a `quarry-worker`
//! child process.
//!
//! # Quick Start
//!
//! ```ignore
//! use quarry::{connect, ConnectOptions, Query};
//!
//! let conn = connect(ConnectOptions::sqlite("app.db")).await?;
//! let adults = conn
//!     .select(Query::table("users").columns(json_columns).filter(json_where))
//!     .await?;
//! conn.close().await?;
//! ```
//!
//! # Architecture
//!
//! | Layer | Crate | Role |
//! |-------|-------|------|
//! | values, errors | `quarry-core` | `Value`, `Raw`, `Dialect`, `QuarryError` |
//! | compiler | `quarry-compiler` | descriptors → `Compiled { sql, params }` |
//! | engine | `quarry-engine` | `Database` over an `EngineSession` |
//! | executor | `quarry-executor` | `Command` dispatch, host loop, wire frames |
//! | proxy | `quarry-proxy` | async `Connection`, transports, `Registry` |
//!
//! The compiler and `Database` are usable on their own for synchronous,
//! in-process work.

pub use quarry_compiler::{Aggregate, Compiled, Compiler, Projector, Query};
pub use quarry_core::{Dialect, Map, Param, ParamMap, QuarryError, QuarryResult, Raw, ScalarKind, Value};
pub use quarry_engine::{
    ConnectOptions, Database, EngineInfo, EngineSession, ErrorInfo, Isolation, StatementMeta,
    StatementResult, CONFIG_FILE_NAME,
};
pub use quarry_executor::{Command, Error, ErrorKind, Output, Property, Result};
pub use quarry_proxy::{Connection, ConnectionState, Registry, Shutdown};

/// Start a host for `options` and return a connected proxy.
pub async fn connect(options: ConnectOptions) -> Result<Connection> {
    Connection::connect(options).await
}

/// Raw SQL fragment with `<table.column>` markers and `:name` bindings.
pub fn raw(sql: impl Into<String>) -> Raw {
    Raw::new(sql)
}
