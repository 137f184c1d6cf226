//! Query descriptors.
//!
//! A [`Query`] names a table (optionally `table (alias)`), an optional join
//! map, a column spec and a condition tree. Builders keep call sites short:
//!
//! ```ignore
//! let q = Query::table("users")
//!     .columns(json!(["id", "name"]))
//!     .filter(json!({"age[>]": 18}));
//! ```

use quarry_core::{Map, QuarryError, QuarryResult, Value};
use serde::{Deserialize, Serialize};

/// Aggregate function tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Aggregate {
    /// `COUNT(...)`
    Count,
    /// `SUM(...)`
    Sum,
    /// `AVG(...)`
    Avg,
    /// `MAX(...)`
    Max,
    /// `MIN(...)`
    Min,
}

impl Aggregate {
    /// SQL function name.
    pub fn sql(&self) -> &'static str {
        match self {
            Aggregate::Count => "COUNT",
            Aggregate::Sum => "SUM",
            Aggregate::Avg => "AVG",
            Aggregate::Max => "MAX",
            Aggregate::Min => "MIN",
        }
    }
}

/// Structured description of a read.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Query {
    /// `table` or `table (alias)`
    pub table: String,
    /// Join map keyed by `[>]table (alias)` style keys
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join: Option<Map>,
    /// Column spec; `None` means `*`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Value>,
    /// Condition tree (map) or raw fragment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Value>,
    /// Aggregate wrapped around the column spec
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregate: Option<Aggregate>,
}

impl Query {
    /// Query over `table`.
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Default::default()
        }
    }

    /// Set the join map.
    pub fn join(mut self, join: impl Into<Value>) -> Self {
        self.join = match join.into() {
            Value::Object(map) => Some(map),
            _ => None,
        };
        self
    }

    /// Set the column spec.
    pub fn columns(mut self, columns: impl Into<Value>) -> Self {
        self.columns = Some(columns.into());
        self
    }

    /// Set the condition tree.
    pub fn filter(mut self, conditions: impl Into<Value>) -> Self {
        self.conditions = Some(conditions.into());
        self
    }

    /// Wrap the column spec in an aggregate.
    pub fn aggregate(mut self, function: Aggregate) -> Self {
        self.aggregate = Some(function);
        self
    }

    /// Column spec with the `*` default applied.
    pub fn column_spec(&self) -> Value {
        self.columns.clone().unwrap_or_else(|| Value::from("*"))
    }

    /// Set a modifier (`LIMIT`, `ORDER`, …) on the condition tree. A raw
    /// condition tree is left alone.
    pub fn set_modifier(&mut self, key: &str, value: impl Into<Value>) {
        match &mut self.conditions {
            Some(Value::Object(map)) => {
                map.insert(key, value);
            }
            Some(_) => {}
            None => self.conditions = Some(Value::Object(Map::new().with(key, value))),
        }
    }

    /// Resolve a classic positional argument list `(join?, columns, where?)`.
    ///
    /// The first argument is a join only when it is a map whose first key
    /// starts with `[`. Without a join, `(columns)` and `(columns, where)`
    /// are accepted; with one, `(join, columns)` and `(join, columns, where)`.
    pub fn positional(table: impl Into<String>, args: Vec<Value>) -> QuarryResult<Self> {
        let mut query = Query::table(table);
        let mut args = args.into_iter();
        let first = args.next();

        match first {
            Some(Value::Object(map)) if is_join(&map) => {
                query.join = Some(map);
                query.columns = args.next();
                query.conditions = args.next();
            }
            other => {
                query.columns = other;
                query.conditions = args.next();
            }
        }

        if args.next().is_some() {
            return Err(QuarryError::compile(format!(
                "too many arguments for table {}",
                query.table
            )));
        }
        Ok(query)
    }
}

/// A join map's first key starts with `[`.
pub fn is_join(map: &Map) -> bool {
    map.first().map(|(k, _)| k.starts_with('[')).unwrap_or(false)
}
