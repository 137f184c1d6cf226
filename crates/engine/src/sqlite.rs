//! SQLite engine session backed by rusqlite.

use quarry_core::{Map, ParamMap, QuarryError, QuarryResult, ScalarKind, Value};
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::Connection;
use tracing::debug;

use crate::options::MEMORY_DATABASE;
use crate::session::{EngineInfo, EngineSession, StatementResult};

/// SQLite connection owned by exactly one host.
pub struct SqliteSession {
    conn: Connection,
    path: String,
}

impl std::fmt::Debug for SqliteSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteSession")
            .field("path", &self.path)
            .finish()
    }
}

impl SqliteSession {
    /// Open `path`, or a private in-memory database for `:memory:`.
    pub fn open(path: &str) -> QuarryResult<Self> {
        let conn = if path == MEMORY_DATABASE {
            Connection::open_in_memory()
        } else {
            Connection::open(path)
        }
        .map_err(engine_error)?;
        debug!(target: "quarry::db", path, "Opened SQLite session");
        Ok(Self {
            conn,
            path: path.to_string(),
        })
    }
}

impl EngineSession for SqliteSession {
    fn execute(&mut self, sql: &str, params: &ParamMap) -> QuarryResult<StatementResult> {
        let mut stmt = self.conn.prepare(sql).map_err(engine_error)?;

        for (key, param) in params.iter() {
            // Keys the statement never mentions are ignored.
            let Some(index) = stmt.parameter_index(key).map_err(engine_error)? else {
                continue;
            };
            stmt.raw_bind_parameter(index, to_sql(&param.value, param.kind))
                .map_err(engine_error)?;
        }

        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();

        if columns.is_empty() {
            let affected = stmt.raw_execute().map_err(engine_error)?;
            return Ok(StatementResult {
                columns,
                rows: Vec::new(),
                affected: affected as u64,
            });
        }

        let mut rows = Vec::new();
        let mut cursor = stmt.raw_query();
        while let Some(row) = cursor.next().map_err(engine_error)? {
            let mut map = Map::new();
            for (i, name) in columns.iter().enumerate() {
                let cell = row.get_ref(i).map_err(engine_error)?;
                map.insert(name.clone(), from_sql(cell));
            }
            rows.push(map);
        }

        Ok(StatementResult {
            columns,
            rows,
            affected: 0,
        })
    }

    fn execute_batch(&mut self, sql: &str) -> QuarryResult<()> {
        self.conn.execute_batch(sql).map_err(engine_error)
    }

    fn last_insert_id(&mut self, _name: Option<&str>) -> QuarryResult<Value> {
        Ok(Value::Int(self.conn.last_insert_rowid()))
    }

    fn info(&self) -> EngineInfo {
        let version = rusqlite::version().to_string();
        EngineInfo {
            server: String::new(),
            driver: "sqlite".to_string(),
            client: version.clone(),
            version,
            connection: String::new(),
            dsn: format!("sqlite:{}", self.path),
        }
    }
}

fn to_sql(value: &Value, kind: ScalarKind) -> SqlValue {
    match (kind, value) {
        (ScalarKind::Null, _) | (_, Value::Null) => SqlValue::Null,
        (ScalarKind::Bool, v) => SqlValue::Integer(i64::from(v.is_truthy())),
        (ScalarKind::Int, v) => match v.to_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Text(v.to_text()),
        },
        (ScalarKind::Float, v) => match v.to_f64() {
            Some(f) => SqlValue::Real(f),
            None => SqlValue::Text(v.to_text()),
        },
        (ScalarKind::Blob, Value::Bytes(b)) => SqlValue::Blob(b.clone()),
        (ScalarKind::Blob, v) => SqlValue::Blob(v.to_text().into_bytes()),
        (ScalarKind::String, v) => SqlValue::Text(v.to_text()),
    }
}

fn from_sql(cell: ValueRef<'_>) -> Value {
    match cell {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int(i),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::Bytes(b.to_vec()),
    }
}

fn engine_error(e: rusqlite::Error) -> QuarryError {
    let code = match &e {
        rusqlite::Error::SqliteFailure(err, _) => Some(err.extended_code.to_string()),
        _ => None,
    };
    QuarryError::engine(e.to_string(), code)
}
