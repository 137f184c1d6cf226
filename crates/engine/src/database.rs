//! Database: compile, execute, project
//!
//! A [`Database`] owns one engine session and one [`Compiler`]. Every
//! statement builder goes through the same path:
//!
//! 1. compile the descriptor (validation and compile errors are returned
//!    immediately as `Err`)
//! 2. [`Database::run`] the compiled statement
//! 3. project the rows into the shape the descriptor asked for
//!
//! ## Soft failures
//!
//! Engine failures do not surface as `Err`. They reset nothing but the
//! previous error, set [`Database::error`] / [`Database::error_info`], and
//! the operation returns its "nothing" value:
//!
//! | Operation | On engine failure |
//! |-----------|-------------------|
//! | `select` / `rand` | empty list |
//! | `get` | null |
//! | `has` | `false` |
//! | `aggregate` | `None` |
//! | `count` | `0` |
//! | writes, `query`, `exec` | `None` |
//! | `import` | `false` |
//!
//! Callers that prefer exceptions check [`Database::engine_error`] after the
//! call; the execution host does exactly that.
//!
//! ## Dry run
//!
//! With `dry_run` set no session is opened. Each statement is compiled,
//! interpolated into readable SQL and stored as [`Database::query_string`];
//! nothing is logged and every operation returns its "nothing" value.
//!
//! ## Debug log
//!
//! With `debug_log` set a session is opened but statements are not run:
//! each one is interpolated and appended to a log drained by
//! [`Database::debug_log`]. Operations return their "nothing" value.

use std::fs;
use std::io;
use std::path::Path;

use quarry_compiler::{Aggregate, Compiled, Compiler, Projector, Query};
use quarry_core::{Dialect, Map, ParamMap, QuarryError, QuarryResult, Raw, Value};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::options::ConnectOptions;
use crate::session::{EngineInfo, EngineSession, StatementResult};
use crate::sqlite::SqliteSession;

/// Serializable stand-in for an executed statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementMeta {
    /// Prepared SQL text, placeholders included
    pub query_string: String,
    /// Result column names
    pub columns: Vec<String>,
    /// Result rows, unprojected
    pub rows: Vec<Map>,
    /// Rows changed by a write
    pub affected_rows: u64,
}

/// Engine error recorded by the last failed statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Engine or SQLSTATE code when known
    pub code: Option<String>,
    /// Engine message
    pub message: String,
}

/// Compiler plus engine session with soft-fail error state.
pub struct Database {
    options: ConnectOptions,
    compiler: Compiler,
    session: Option<Box<dyn EngineSession>>,
    logs: Vec<Compiled>,
    query_string: Option<String>,
    debug_logs: Vec<String>,
    error_info: Option<ErrorInfo>,
    in_transaction: bool,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("engine", &self.options.engine)
            .field("database", &self.options.database)
            .field("dry_run", &self.options.dry_run)
            .field("logs", &self.logs.len())
            .finish()
    }
}

impl Database {
    /// Open a database for `options`.
    ///
    /// SQLite sessions are opened here. Other engines need a session from
    /// [`Database::with_session`] unless `dry_run` is set.
    pub fn open(options: ConnectOptions) -> QuarryResult<Self> {
        if options.dry_run {
            return Self::build(options, None);
        }
        match options.engine {
            Dialect::Sqlite => {
                let session = SqliteSession::open(&options.database)?;
                Self::build(options, Some(Box::new(session)))
            }
            other => Err(QuarryError::validation(format!(
                "no bundled engine session for {other}; open it with Database::with_session"
            ))),
        }
    }

    /// Wrap an externally opened session.
    pub fn with_session(
        options: ConnectOptions,
        session: Box<dyn EngineSession>,
    ) -> QuarryResult<Self> {
        Self::build(options, Some(session))
    }

    fn build(options: ConnectOptions, session: Option<Box<dyn EngineSession>>) -> QuarryResult<Self> {
        let compiler = Compiler::new(options.engine).with_prefix(options.prefix.clone());
        let mut db = Self {
            options,
            compiler,
            session,
            logs: Vec::new(),
            query_string: None,
            debug_logs: Vec::new(),
            error_info: None,
            in_transaction: false,
        };

        if let Some(session) = db.session.as_mut() {
            for command in db.options.init_commands() {
                session.execute_batch(&command)?;
            }
        }

        info!(
            target: "quarry::db",
            engine = %db.options.engine,
            database = %db.options.database,
            dry_run = db.options.dry_run,
            "Database opened"
        );
        Ok(db)
    }

    /// Options this database was opened with.
    pub fn options(&self) -> &ConnectOptions {
        &self.options
    }

    /// Compiler bound to this database's dialect and prefix.
    pub fn compiler(&self) -> &Compiler {
        &self.compiler
    }

    // =========================================================================
    // Execution
    // =========================================================================

    /// Execute one compiled statement, recording logs and soft errors.
    pub fn run(&mut self, compiled: Compiled) -> Option<StatementResult> {
        self.error_info = None;

        if self.options.dry_run {
            self.query_string = Some(self.compiler.interpolate(&compiled));
            return None;
        }
        if self.options.debug_log {
            let text = self.compiler.interpolate(&compiled);
            self.debug_logs.push(text);
            return None;
        }

        debug!(
            target: "quarry::db",
            sql = %compiled.sql,
            params = compiled.params.len(),
            "Executing statement"
        );

        let outcome = match self.session.as_mut() {
            Some(session) => session.execute(&compiled.sql, &compiled.params),
            None => Err(QuarryError::engine("no engine session", None)),
        };

        if !self.options.logging {
            self.logs.clear();
        }
        self.logs.push(compiled);

        match outcome {
            Ok(result) => Some(result),
            Err(e) => {
                let info = match e {
                    QuarryError::Engine { message, code } => ErrorInfo { code, message },
                    other => ErrorInfo {
                        code: None,
                        message: other.message().to_string(),
                    },
                };
                warn!(target: "quarry::db", code = ?info.code, error = %info.message, "Statement failed");
                self.error_info = Some(info);
                None
            }
        }
    }

    fn run_meta(&mut self, compiled: Compiled) -> Option<StatementMeta> {
        let query_string = compiled.sql.clone();
        self.run(compiled).map(|result| StatementMeta {
            query_string,
            columns: result.columns,
            rows: result.rows,
            affected_rows: result.affected,
        })
    }

    /// Execute SQL text with an explicit parameter map.
    pub fn exec(&mut self, sql: impl Into<String>, params: ParamMap) -> Option<StatementMeta> {
        self.run_meta(Compiled {
            sql: sql.into(),
            params,
        })
    }

    /// Like [`exec`](Self::exec), with a hook that may amend the bindings
    /// right before execution. Hook and statement share one transaction,
    /// rolled back when the statement fails. Inside an open transaction
    /// they join it and leave commit or rollback to the caller.
    pub fn exec_with<F>(
        &mut self,
        sql: impl Into<String>,
        mut params: ParamMap,
        hook: F,
    ) -> QuarryResult<Option<StatementMeta>>
    where
        F: FnOnce(&mut ParamMap),
    {
        if self.session.is_none() || self.in_transaction {
            hook(&mut params);
            return Ok(self.exec(sql, params));
        }

        self.begin()?;
        hook(&mut params);
        let meta = self.exec(sql, params);
        if self.error_info.is_some() {
            self.rollback()?;
        } else {
            self.commit()?;
        }
        Ok(meta)
    }

    /// Run every statement of the SQL script at `path`.
    ///
    /// Returns `false` when the file does not exist, and when the script
    /// was only recorded (dry run, debug log) or failed in the engine.
    pub fn import(&mut self, path: impl AsRef<Path>) -> QuarryResult<bool> {
        let path = path.as_ref();
        let script = match fs::read_to_string(path) {
            Ok(script) => script,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(target: "quarry::db", path = %path.display(), "Import file not found");
                return Ok(false);
            }
            Err(e) => {
                return Err(QuarryError::validation(format!(
                    "cannot read {}: {e}",
                    path.display()
                )))
            }
        };
        info!(target: "quarry::db", path = %path.display(), bytes = script.len(), "Importing script");
        Ok(self.run_script(script))
    }

    fn run_script(&mut self, script: String) -> bool {
        self.error_info = None;

        if self.options.dry_run {
            self.query_string = Some(script);
            return false;
        }
        if self.options.debug_log {
            self.debug_logs.push(script);
            return false;
        }

        let outcome = match self.session.as_mut() {
            Some(session) => session.execute_batch(&script),
            None => Err(QuarryError::engine("no engine session", None)),
        };

        if !self.options.logging {
            self.logs.clear();
        }
        self.logs.push(Compiled {
            sql: script,
            params: ParamMap::new(),
        });

        match outcome {
            Ok(()) => true,
            Err(e) => {
                let info = match e {
                    QuarryError::Engine { message, code } => ErrorInfo { code, message },
                    other => ErrorInfo {
                        code: None,
                        message: other.message().to_string(),
                    },
                };
                warn!(target: "quarry::db", code = ?info.code, error = %info.message, "Script failed");
                self.error_info = Some(info);
                false
            }
        }
    }

    /// Execute a raw fragment after rewriting its `<table.column>` markers.
    pub fn query(&mut self, raw: &Raw) -> QuarryResult<Option<StatementMeta>> {
        let compiled = self.compiler.raw(raw)?;
        Ok(self.run_meta(compiled))
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Rows projected through the column spec. An aggregate-tagged query
    /// returns the aggregate value instead, null when the engine fails.
    pub fn select(&mut self, query: &Query) -> QuarryResult<Value> {
        if let Some(function) = query.aggregate {
            return Ok(self.aggregate(function, query)?.unwrap_or(Value::Null));
        }
        let compiled = self.compiler.select(query)?;
        self.project_all(query, compiled)
    }

    /// Like [`select`](Self::select) but hands each projected row to `f`
    /// instead of collecting them. Grouped column specs are not supported.
    pub fn select_each<F>(&mut self, query: &Query, mut f: F) -> QuarryResult<()>
    where
        F: FnMut(Value),
    {
        let projector = Projector::new(&query.column_spec())?;
        let compiled = self.compiler.select(query)?;
        if let Some(result) = self.run(compiled) {
            for row in result.rows {
                f(projector.project_row(Some(row)));
            }
        }
        Ok(())
    }

    /// First row, or a single value for a single-column spec; null when no
    /// row matches.
    pub fn get(&mut self, query: &Query) -> QuarryResult<Value> {
        let projector = Projector::new(&query.column_spec())?;
        let compiled = self.compiler.get(query)?;
        Ok(match self.run(compiled) {
            Some(result) => projector.project_row(result.rows.into_iter().next()),
            None => Value::Null,
        })
    }

    /// Rows in random order.
    pub fn rand(&mut self, query: &Query) -> QuarryResult<Value> {
        let compiled = self.compiler.rand(query)?;
        self.project_all(query, compiled)
    }

    fn project_all(&mut self, query: &Query, compiled: Compiled) -> QuarryResult<Value> {
        let projector = Projector::new(&query.column_spec())?;
        Ok(match self.run(compiled) {
            Some(result) => projector.project_rows(result.rows),
            None => Value::Array(Vec::new()),
        })
    }

    /// Whether any row matches.
    pub fn has(&mut self, query: &Query) -> QuarryResult<bool> {
        let compiled = self.compiler.exists(query)?;
        Ok(match self.run(compiled) {
            Some(result) => matches!(
                result.first_value(),
                Some(Value::Int(1)) | Some(Value::Bool(true))
            ) || matches!(result.first_value(), Some(Value::String(s)) if s == "1"),
            None => false,
        })
    }

    /// First column of an aggregate query.
    pub fn aggregate(&mut self, function: Aggregate, query: &Query) -> QuarryResult<Option<Value>> {
        let compiled = self.compiler.aggregate(function, query)?;
        Ok(self
            .run(compiled)
            .and_then(|result| result.first_value().cloned()))
    }

    /// Matching row count; `0` when the engine fails.
    pub fn count(&mut self, query: &Query) -> QuarryResult<i64> {
        Ok(self
            .aggregate(Aggregate::Count, query)?
            .and_then(|v| v.to_i64())
            .unwrap_or(0))
    }

    // =========================================================================
    // Writes and schema
    // =========================================================================

    /// Insert one map or a list of maps.
    pub fn insert(&mut self, table: &str, rows: &Value) -> QuarryResult<Option<StatementMeta>> {
        let compiled = self.compiler.insert(table, rows)?;
        Ok(self.run_meta(compiled))
    }

    /// Update matching rows.
    pub fn update(
        &mut self,
        table: &str,
        data: &Map,
        conditions: Option<&Value>,
    ) -> QuarryResult<Option<StatementMeta>> {
        let compiled = self.compiler.update(table, data, conditions)?;
        Ok(self.run_meta(compiled))
    }

    /// Delete matching rows.
    pub fn delete(&mut self, table: &str, conditions: Option<&Value>) -> QuarryResult<Option<StatementMeta>> {
        let compiled = self.compiler.delete(table, conditions)?;
        Ok(self.run_meta(compiled))
    }

    /// In-place `REPLACE(column, old, new)` updates.
    pub fn replace(
        &mut self,
        table: &str,
        columns: &Map,
        conditions: Option<&Value>,
    ) -> QuarryResult<Option<StatementMeta>> {
        let compiled = self.compiler.replace(table, columns, conditions)?;
        Ok(self.run_meta(compiled))
    }

    /// `CREATE TABLE`.
    pub fn create(
        &mut self,
        table: &str,
        columns: &Value,
        options: Option<&Value>,
    ) -> QuarryResult<Option<StatementMeta>> {
        let compiled = self.compiler.create(table, columns, options)?;
        Ok(self.run_meta(compiled))
    }

    /// `DROP TABLE IF EXISTS`.
    pub fn drop(&mut self, table: &str) -> QuarryResult<Option<StatementMeta>> {
        let compiled = self.compiler.drop(table)?;
        Ok(self.run_meta(compiled))
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Identifier generated by the last insert.
    pub fn id(&mut self, name: Option<&str>) -> QuarryResult<Option<Value>> {
        match self.session.as_mut() {
            Some(session) => session.last_insert_id(name).map(Some),
            None => Ok(None),
        }
    }

    /// Connection attributes.
    pub fn info(&self) -> EngineInfo {
        match &self.session {
            Some(session) => {
                let mut info = session.info();
                if info.dsn.is_empty() {
                    info.dsn = self.options.dsn();
                }
                info
            }
            None => EngineInfo {
                driver: self.options.engine.name().to_string(),
                dsn: self.options.dsn(),
                ..Default::default()
            },
        }
    }

    /// Start a transaction.
    pub fn begin(&mut self) -> QuarryResult<()> {
        debug!(target: "quarry::db", "BEGIN");
        if let Some(session) = self.session.as_mut() {
            session.begin()?;
            self.in_transaction = true;
        }
        Ok(())
    }

    /// Commit the open transaction.
    pub fn commit(&mut self) -> QuarryResult<()> {
        debug!(target: "quarry::db", "COMMIT");
        self.in_transaction = false;
        match self.session.as_mut() {
            Some(session) => session.commit(),
            None => Ok(()),
        }
    }

    /// Roll back the open transaction.
    pub fn rollback(&mut self) -> QuarryResult<()> {
        debug!(target: "quarry::db", "ROLLBACK");
        self.in_transaction = false;
        match self.session.as_mut() {
            Some(session) => session.rollback(),
            None => Ok(()),
        }
    }

    /// Whether a transaction opened through [`begin`](Self::begin) is still
    /// open.
    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    /// Statements collected under the `debug_log` option since the last
    /// call, oldest first.
    pub fn debug_log(&mut self) -> Vec<String> {
        std::mem::take(&mut self.debug_logs)
    }

    /// Run `f` inside a transaction.
    ///
    /// Commits unless `f` returns exactly `Value::Bool(false)`, which rolls
    /// back. An error from `f` rolls back and is returned.
    pub fn action<F>(&mut self, f: F) -> QuarryResult<()>
    where
        F: FnOnce(&mut Database) -> QuarryResult<Value>,
    {
        self.begin()?;
        match f(self) {
            Ok(Value::Bool(false)) => self.rollback(),
            Ok(_) => self.commit(),
            Err(e) => {
                if let Err(rollback) = self.rollback() {
                    warn!(target: "quarry::db", error = %rollback, "Rollback after failed action failed");
                }
                Err(e)
            }
        }
    }

    // =========================================================================
    // Properties
    // =========================================================================

    /// Readable text of the last executed statement.
    pub fn last(&self) -> Option<String> {
        self.logs.last().map(|c| self.compiler.interpolate(c))
    }

    /// Readable text of every logged statement.
    pub fn log(&self) -> Vec<String> {
        self.logs.iter().map(|c| self.compiler.interpolate(c)).collect()
    }

    /// Message of the last engine failure.
    pub fn error(&self) -> Option<&str> {
        self.error_info.as_ref().map(|i| i.message.as_str())
    }

    /// Code and message of the last engine failure.
    pub fn error_info(&self) -> Option<&ErrorInfo> {
        self.error_info.as_ref()
    }

    /// Last engine failure as an error value.
    pub fn engine_error(&self) -> Option<QuarryError> {
        self.error_info
            .as_ref()
            .map(|i| QuarryError::engine(i.message.clone(), i.code.clone()))
    }

    /// Readable SQL recorded by the last dry-run statement.
    pub fn query_string(&self) -> Option<&str> {
        self.query_string.as_deref()
    }
}
