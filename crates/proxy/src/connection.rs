//! Asynchronous connection proxy
//!
//! A [`Connection`] is the caller-side handle to one execution host. It is
//! cheap to clone; clones share the same host and the same single-flight
//! link.
//!
//! ## Lifecycle
//!
//! ```text
//! Unconnected ──connect──▶ Connecting ──Ready──▶ Connected ──close──▶ Closed
//!                               │
//!                               └──Failure──▶ Closed
//! ```
//!
//! `Closed` is terminal: every call fails fast with a transport error
//! without touching a host, and `close()` again is a no-op.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use quarry_compiler::{Aggregate, Query};
use quarry_core::{Map, ParamMap, Raw, Value};
use quarry_engine::{ConnectOptions, EngineInfo, StatementMeta};
use quarry_executor::{Command, Error, Output, Property, Result};
use tracing::{info, warn};

use crate::link::Link;
use crate::transport::{self, Shutdown, Transport};

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not started
    Unconnected,
    /// Host spawned, waiting for `Ready`
    Connecting,
    /// Ready for commands
    Connected,
    /// Terminal
    Closed,
}

struct Inner {
    options: ConnectOptions,
    state: Mutex<ConnectionState>,
    link: Mutex<Option<Arc<Link>>>,
}

/// Caller-side handle to one execution host.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("engine", &self.inner.options.engine)
            .field("database", &self.inner.options.database)
            .field("state", &self.state())
            .finish()
    }
}

impl Connection {
    /// A connection that has not started its host yet.
    pub fn new(options: ConnectOptions) -> Self {
        Self {
            inner: Arc::new(Inner {
                options,
                state: Mutex::new(ConnectionState::Unconnected),
                link: Mutex::new(None),
            }),
        }
    }

    /// Start a host for `options` and wait until it is ready.
    pub async fn connect(options: ConnectOptions) -> Result<Self> {
        let conn = Self::new(options);
        let transport = transport::spawn(&conn.inner.options)?;
        conn.start(transport).await?;
        Ok(conn)
    }

    /// Connect over an already spawned transport.
    pub async fn connect_with(options: ConnectOptions, transport: Box<dyn Transport>) -> Result<Self> {
        let conn = Self::new(options);
        conn.start(transport).await?;
        Ok(conn)
    }

    async fn start(&self, transport: Box<dyn Transport>) -> Result<()> {
        {
            let mut state = self.inner.state.lock();
            if *state != ConnectionState::Unconnected {
                return Err(Error::internal(format!("cannot connect from state {:?}", *state)));
            }
            *state = ConnectionState::Connecting;
        }

        let link = Arc::new(Link::new(transport));
        *self.inner.link.lock() = Some(link.clone());

        match link.configure(self.inner.options.clone()).await {
            Ok(()) => {
                *self.inner.state.lock() = ConnectionState::Connected;
                info!(
                    target: "quarry::proxy",
                    engine = %self.inner.options.engine,
                    database = %self.inner.options.database,
                    "Connected"
                );
                Ok(())
            }
            Err(e) => {
                warn!(target: "quarry::proxy", error = %e, "Host configuration failed");
                *self.inner.state.lock() = ConnectionState::Closed;
                self.inner.link.lock().take();
                if let Err(close) = link.shutdown(self.inner.options.close_timeout_duration()).await {
                    warn!(target: "quarry::proxy", error = %close, "Shutdown after failed configuration failed");
                }
                Err(e)
            }
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        *self.inner.state.lock()
    }

    /// Options the host was configured with.
    pub fn options(&self) -> &ConnectOptions {
        &self.inner.options
    }

    /// Whether the host can take commands.
    pub fn is_alive(&self) -> bool {
        self.state() == ConnectionState::Connected
            && self
                .inner
                .link
                .lock()
                .as_ref()
                .map(|link| link.is_alive())
                .unwrap_or(false)
    }

    /// When the last command completed.
    pub fn last_used_at(&self) -> Option<DateTime<Utc>> {
        self.inner.link.lock().as_ref().map(|link| link.last_used_at())
    }

    /// Shut the host down, bounded by the configured close timeout.
    /// Idempotent; a host that overruns is killed (process) or detached
    /// (thread).
    pub async fn close(&self) -> Result<()> {
        let link = {
            let mut state = self.inner.state.lock();
            if *state == ConnectionState::Closed {
                return Ok(());
            }
            *state = ConnectionState::Closed;
            self.inner.link.lock().take()
        };

        let Some(link) = link else {
            return Ok(());
        };
        match link.shutdown(self.inner.options.close_timeout_duration()).await? {
            Shutdown::Forced => {
                warn!(target: "quarry::proxy", "Host forced down after close timeout")
            }
            Shutdown::Graceful | Shutdown::AlreadyExited => {
                info!(target: "quarry::proxy", "Connection closed")
            }
        }
        Ok(())
    }

    // =========================================================================
    // Generic access
    // =========================================================================

    /// Run any command.
    pub async fn call(&self, cmd: Command) -> Result<Output> {
        let link = self.link()?;
        link.call(cmd).await
    }

    /// Read one property.
    pub async fn property(&self, name: Property) -> Result<Option<Value>> {
        match self.call(Command::Property { name }).await? {
            Output::Maybe(value) => Ok(value),
            other => Err(mismatch("property", &other)),
        }
    }

    fn link(&self) -> Result<Arc<Link>> {
        match self.state() {
            ConnectionState::Connected => {}
            ConnectionState::Closed => return Err(Error::transport("connection is closed")),
            other => return Err(Error::transport(format!("connection is {other:?}"))),
        }
        self.inner
            .link
            .lock()
            .clone()
            .ok_or_else(|| Error::transport("connection is closed"))
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Projected rows.
    pub async fn select(&self, query: Query) -> Result<Value> {
        self.value(Command::Select { query }).await
    }

    /// First projected row, or single value; null when nothing matches.
    pub async fn get(&self, query: Query) -> Result<Value> {
        self.value(Command::Get { query }).await
    }

    /// Projected rows in random order.
    pub async fn rand(&self, query: Query) -> Result<Value> {
        self.value(Command::Rand { query }).await
    }

    async fn value(&self, cmd: Command) -> Result<Value> {
        let name = cmd.name();
        match self.call(cmd).await? {
            Output::Value(value) => Ok(value),
            other => Err(mismatch(name, &other)),
        }
    }

    /// Whether any row matches.
    pub async fn has(&self, query: Query) -> Result<bool> {
        match self.call(Command::Has { query }).await? {
            Output::Bool(found) => Ok(found),
            other => Err(mismatch("has", &other)),
        }
    }

    /// Aggregate over the column spec.
    pub async fn aggregate(&self, function: Aggregate, query: Query) -> Result<Option<Value>> {
        match self.call(Command::Aggregate { function, query }).await? {
            Output::Maybe(value) => Ok(value),
            other => Err(mismatch("aggregate", &other)),
        }
    }

    /// Matching row count.
    pub async fn count(&self, query: Query) -> Result<i64> {
        Ok(self
            .aggregate(Aggregate::Count, query)
            .await?
            .and_then(|v| v.to_i64())
            .unwrap_or(0))
    }

    /// `SUM` of the column spec.
    pub async fn sum(&self, query: Query) -> Result<Option<Value>> {
        self.aggregate(Aggregate::Sum, query).await
    }

    /// `AVG` of the column spec.
    pub async fn avg(&self, query: Query) -> Result<Option<Value>> {
        self.aggregate(Aggregate::Avg, query).await
    }

    /// `MAX` of the column spec.
    pub async fn max(&self, query: Query) -> Result<Option<Value>> {
        self.aggregate(Aggregate::Max, query).await
    }

    /// `MIN` of the column spec.
    pub async fn min(&self, query: Query) -> Result<Option<Value>> {
        self.aggregate(Aggregate::Min, query).await
    }

    // =========================================================================
    // Writes, schema and raw statements
    // =========================================================================

    async fn statement(&self, cmd: Command) -> Result<Option<StatementMeta>> {
        let name = cmd.name();
        match self.call(cmd).await? {
            Output::Statement(meta) => Ok(meta),
            other => Err(mismatch(name, &other)),
        }
    }

    /// Insert one map or a list of maps.
    pub async fn insert(&self, table: &str, rows: impl Into<Value>) -> Result<Option<StatementMeta>> {
        self.statement(Command::Insert {
            table: table.to_string(),
            rows: rows.into(),
        })
        .await
    }

    /// Update matching rows.
    pub async fn update(
        &self,
        table: &str,
        data: Map,
        conditions: Option<Value>,
    ) -> Result<Option<StatementMeta>> {
        self.statement(Command::Update {
            table: table.to_string(),
            data,
            conditions,
        })
        .await
    }

    /// Delete matching rows.
    pub async fn delete(&self, table: &str, conditions: Option<Value>) -> Result<Option<StatementMeta>> {
        self.statement(Command::Delete {
            table: table.to_string(),
            conditions,
        })
        .await
    }

    /// `REPLACE(column, old, new)` updates.
    pub async fn replace(
        &self,
        table: &str,
        columns: Map,
        conditions: Option<Value>,
    ) -> Result<Option<StatementMeta>> {
        self.statement(Command::Replace {
            table: table.to_string(),
            columns,
            conditions,
        })
        .await
    }

    /// `CREATE TABLE`.
    pub async fn create(
        &self,
        table: &str,
        columns: impl Into<Value>,
        options: Option<Value>,
    ) -> Result<Option<StatementMeta>> {
        self.statement(Command::Create {
            table: table.to_string(),
            columns: columns.into(),
            options,
        })
        .await
    }

    /// `DROP TABLE IF EXISTS`.
    pub async fn drop(&self, table: &str) -> Result<Option<StatementMeta>> {
        self.statement(Command::Drop {
            table: table.to_string(),
        })
        .await
    }

    /// Raw fragment with `<table.column>` markers.
    pub async fn query(&self, raw: Raw) -> Result<Option<StatementMeta>> {
        self.statement(Command::Query { raw }).await
    }

    /// SQL text with an explicit parameter map.
    pub async fn exec(&self, sql: impl Into<String>, params: ParamMap) -> Result<Option<StatementMeta>> {
        self.statement(Command::Exec {
            sql: sql.into(),
            params,
        })
        .await
    }

    /// Run the SQL script at `path`, read on the host side. `false` when
    /// the file is missing.
    pub async fn import(&self, path: impl Into<String>) -> Result<bool> {
        match self.call(Command::Import { path: path.into() }).await? {
            Output::Bool(imported) => Ok(imported),
            other => Err(mismatch("import", &other)),
        }
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Identifier generated by the last insert.
    pub async fn id(&self, name: Option<&str>) -> Result<Option<Value>> {
        match self
            .call(Command::Id {
                name: name.map(str::to_string),
            })
            .await?
        {
            Output::Maybe(value) => Ok(value),
            other => Err(mismatch("id", &other)),
        }
    }

    /// Connection attributes.
    pub async fn info(&self) -> Result<EngineInfo> {
        match self.call(Command::Info).await? {
            Output::Info(info) => Ok(info),
            other => Err(mismatch("info", &other)),
        }
    }

    /// Readable text of the last executed statement.
    pub async fn last(&self) -> Result<Option<String>> {
        match self.call(Command::Last).await? {
            Output::Text(text) => Ok(text),
            other => Err(mismatch("last", &other)),
        }
    }

    /// Readable text of every logged statement.
    pub async fn log(&self) -> Result<Vec<String>> {
        match self.call(Command::Log).await? {
            Output::Texts(texts) => Ok(texts),
            other => Err(mismatch("log", &other)),
        }
    }

    /// Drain the statements the host collected under the `debug_log`
    /// option.
    pub async fn debug_log(&self) -> Result<Vec<String>> {
        match self.call(Command::DebugLog).await? {
            Output::Texts(texts) => Ok(texts),
            other => Err(mismatch("debug_log", &other)),
        }
    }

    /// Message of the last engine failure.
    pub async fn error(&self) -> Result<Option<String>> {
        Ok(self
            .property(Property::Error)
            .await?
            .and_then(|v| v.as_str().map(str::to_string)))
    }

    /// Readable SQL recorded by the last dry-run statement.
    pub async fn query_string(&self) -> Result<Option<String>> {
        Ok(self
            .property(Property::QueryString)
            .await?
            .and_then(|v| v.as_str().map(str::to_string)))
    }

    /// Liveness round trip; returns the host version.
    pub async fn ping(&self) -> Result<String> {
        match self.call(Command::Ping).await? {
            Output::Pong { version } => Ok(version),
            other => Err(mismatch("ping", &other)),
        }
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Start a transaction.
    pub async fn begin(&self) -> Result<()> {
        self.unit(Command::Begin).await
    }

    /// Commit the open transaction.
    pub async fn commit(&self) -> Result<()> {
        self.unit(Command::Commit).await
    }

    /// Roll back the open transaction.
    pub async fn rollback(&self) -> Result<()> {
        self.unit(Command::Rollback).await
    }

    async fn unit(&self, cmd: Command) -> Result<()> {
        let name = cmd.name();
        match self.call(cmd).await? {
            Output::Unit => Ok(()),
            other => Err(mismatch(name, &other)),
        }
    }

    /// Run `f` inside a transaction.
    ///
    /// Commits unless `f` resolves to exactly `Value::Bool(false)`, which
    /// rolls back. An error from `f` rolls back and is returned.
    ///
    /// ```ignore
    /// conn.action(|tx| async move {
    ///     tx.insert("account", json_row).await?;
    ///     Ok(Value::Null)
    /// })
    /// .await?;
    /// ```
    pub async fn action<F, Fut>(&self, f: F) -> Result<()>
    where
        F: FnOnce(Connection) -> Fut,
        Fut: Future<Output = Result<Value>>,
    {
        self.begin().await?;
        match f(self.clone()).await {
            Ok(Value::Bool(false)) => self.rollback().await,
            Ok(_) => self.commit().await,
            Err(e) => {
                if let Err(rollback) = self.rollback().await {
                    warn!(target: "quarry::proxy", error = %rollback, "Rollback after failed action failed");
                }
                Err(e)
            }
        }
    }
}

fn mismatch(command: &str, output: &Output) -> Error {
    Error::internal(format!("host answered {command} with {}", output.variant()))
}
