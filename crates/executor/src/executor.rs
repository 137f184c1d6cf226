//! The Executor - single dispatch point into a Quarry database.
//!
//! The Executor is a stateless dispatcher that routes commands to the
//! matching [`Database`] operation and wraps the results as outputs. Soft
//! engine failures left by a statement are turned into
//! [`Error::Engine`](crate::Error::Engine).

use std::sync::Arc;

use parking_lot::Mutex;
use quarry_core::{Map, Value};
use quarry_engine::Database;
use tracing::debug;

use crate::{Command, Error, Output, Property, Result};

/// The command executor.
///
/// The Executor holds a shared handle to the database but maintains no state
/// of its own. Transaction bookkeeping lives in [`Session`](crate::Session).
///
/// # Example
///
/// ```ignore
/// let executor = Executor::new(Arc::new(Mutex::new(db)));
///
/// let rows = executor.execute(Command::Select {
///     query: Query::table("users").columns("name"),
/// })?;
///
/// let results = executor.execute_many(vec![
///     Command::Ping,
///     Command::Last,
/// ]);
/// ```
pub struct Executor {
    db: Arc<Mutex<Database>>,
}

impl Executor {
    /// Create a new executor over a shared database.
    pub fn new(db: Arc<Mutex<Database>>) -> Self {
        Self { db }
    }

    /// Execute a single command.
    pub fn execute(&self, cmd: Command) -> Result<Output> {
        let name = cmd.name();
        let surfaces_engine_error = cmd.executes_statement();
        let mut db = self.db.lock();

        debug!(target: "quarry::host", command = name, "Dispatching command");
        let output = dispatch(&mut db, cmd)?;

        if surfaces_engine_error {
            if let Some(err) = db.engine_error() {
                return Err(match Error::from(err) {
                    Error::Engine { reason, code, .. } => Error::Engine {
                        reason,
                        code,
                        trace: Some(engine_trace(&db, name)),
                    },
                    other => other,
                });
            }
        }
        Ok(output)
    }

    /// Execute commands in order, collecting every result.
    pub fn execute_many(&self, cmds: Vec<Command>) -> Vec<Result<Output>> {
        cmds.into_iter().map(|cmd| self.execute(cmd)).collect()
    }
}

fn dispatch(db: &mut Database, cmd: Command) -> Result<Output> {
    Ok(match cmd {
        // Read
        Command::Select { query } => Output::Value(db.select(&query)?),
        Command::Get { query } => Output::Value(db.get(&query)?),
        Command::Rand { query } => Output::Value(db.rand(&query)?),
        Command::Has { query } => Output::Bool(db.has(&query)?),
        Command::Aggregate { function, query } => Output::Maybe(db.aggregate(function, &query)?),

        // Write
        Command::Insert { table, rows } => Output::Statement(db.insert(&table, &rows)?),
        Command::Update {
            table,
            data,
            conditions,
        } => Output::Statement(db.update(&table, &data, conditions.as_ref())?),
        Command::Delete { table, conditions } => {
            Output::Statement(db.delete(&table, conditions.as_ref())?)
        }
        Command::Replace {
            table,
            columns,
            conditions,
        } => Output::Statement(db.replace(&table, &columns, conditions.as_ref())?),

        // Schema
        Command::Create {
            table,
            columns,
            options,
        } => Output::Statement(db.create(&table, &columns, options.as_ref())?),
        Command::Drop { table } => Output::Statement(db.drop(&table)?),

        // Raw
        Command::Query { raw } => Output::Statement(db.query(&raw)?),
        Command::Exec { sql, params } => Output::Statement(db.exec(sql, params)),
        Command::Import { path } => Output::Bool(db.import(&path)?),

        // Transaction
        Command::Begin => {
            db.begin()?;
            Output::Unit
        }
        Command::Commit => {
            db.commit()?;
            Output::Unit
        }
        Command::Rollback => {
            db.rollback()?;
            Output::Unit
        }

        // Session
        Command::Id { name } => Output::Maybe(db.id(name.as_deref())?),
        Command::Info => Output::Info(db.info()),
        Command::Last => Output::Text(db.last()),
        Command::Log => Output::Texts(db.log()),
        Command::DebugLog => Output::Texts(db.debug_log()),
        Command::Property { name } => Output::Maybe(property(db, name)),
        Command::Ping => Output::Pong {
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
    })
}

/// Failing command and the statement it ran, as `command: sql`.
fn engine_trace(db: &Database, command: &str) -> String {
    match db.last() {
        Some(sql) => format!("{command}: {sql}"),
        None => command.to_string(),
    }
}

fn property(db: &Database, name: Property) -> Option<Value> {
    let options = db.options();
    match name {
        Property::Engine => Some(Value::from(options.engine.name())),
        Property::Prefix => Some(Value::from(options.prefix.clone())),
        Property::Error => db.error().map(Value::from),
        Property::ErrorInfo => db.error_info().map(|info| {
            Value::Object(
                Map::new()
                    .with("code", info.code.clone())
                    .with("message", info.message.clone()),
            )
        }),
        Property::QueryString => db.query_string().map(Value::from),
        Property::Logging => Some(Value::Bool(options.logging)),
        Property::DryRun => Some(Value::Bool(options.dry_run)),
        Property::DebugLog => Some(Value::Bool(options.debug_log)),
    }
}

