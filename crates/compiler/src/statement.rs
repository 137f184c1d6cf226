//! Statement builders.
//!
//! | Builder | Statement |
//! |---------|-----------|
//! | `select` / `get` / `rand` | `SELECT cols FROM t [joins] clauses` |
//! | `aggregate` | `SELECT FN(col) FROM …` |
//! | `exists` | `SELECT EXISTS(SELECT 1 FROM …)`, MSSQL `SELECT TOP 1 1 FROM …` |
//! | `insert` | `INSERT INTO t (cols) VALUES (…), (…)` |
//! | `update` / `replace` | `UPDATE t SET … clauses` |
//! | `delete` | `DELETE FROM t clauses` |
//! | `create` / `drop` | DDL |
//! | `raw` | marker expansion only |

use once_cell::sync::Lazy;
use quarry_core::{Dialect, Map, Param, QuarryError, QuarryResult, Raw, ScalarKind, Value};
use regex::Regex;

use crate::compiler::{Compiled, Compiler, Ctx};
use crate::encode;
use crate::query::{Aggregate, Query};

static UPDATE_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.*?)\s*\[(JSON|\+|-|\*|/)\]$").expect("update key pattern"));

static DEFINITION_MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<([\p{L}_][\p{L}\p{N}@$#\-_]*)>").expect("definition marker pattern"));

/// What goes between `SELECT` and `FROM`.
#[derive(Debug, Clone, Copy)]
enum Head {
    Columns,
    Function(Aggregate),
    One,
    Top,
}

impl Compiler {
    /// `SELECT` over the descriptor. A query tagged with an aggregate
    /// compiles to the aggregate form.
    pub fn select(&self, query: &Query) -> QuarryResult<Compiled> {
        match query.aggregate {
            Some(function) => self.select_context(query, Head::Function(function)),
            None => self.select_context(query, Head::Columns),
        }
    }

    /// `SELECT` limited to one row.
    pub fn get(&self, query: &Query) -> QuarryResult<Compiled> {
        let mut query = query.clone();
        query.set_modifier("LIMIT", 1);
        self.select_context(&query, Head::Columns)
    }

    /// `SELECT` in random order.
    pub fn rand(&self, query: &Query) -> QuarryResult<Compiled> {
        let mut query = query.clone();
        query.set_modifier("ORDER", Value::raw(self.dialect().random_function()));
        self.select_context(&query, Head::Columns)
    }

    /// Existence probe.
    pub fn exists(&self, query: &Query) -> QuarryResult<Compiled> {
        if self.dialect() == Dialect::MsSql {
            return self.select_context(query, Head::Top);
        }
        let inner = self.select_context(query, Head::One)?;
        Ok(Compiled {
            sql: format!("SELECT EXISTS({})", inner.sql),
            params: inner.params,
        })
    }

    /// `SELECT FN(column)`; a missing column spec aggregates `*`.
    pub fn aggregate(&self, function: Aggregate, query: &Query) -> QuarryResult<Compiled> {
        self.select_context(query, Head::Function(function))
    }

    fn select_context(&self, query: &Query, head: Head) -> QuarryResult<Compiled> {
        let mut ctx = self.context();
        let (mut from, qualifier) = self.quote_table_ref(&query.table)?;

        let joining = match &query.join {
            Some(join) if !join.is_empty() => {
                let joins = ctx.joins(&qualifier, join)?;
                from = format!("{from} {joins}");
                true
            }
            _ => false,
        };

        let column = match head {
            Head::Columns => ctx.column_list(&query.column_spec(), true, joining)?,
            Head::Function(function) => {
                let inner = match &query.columns {
                    None | Some(Value::Null) => "*".to_string(),
                    Some(spec) => ctx.column_list(spec, true, false)?,
                };
                format!("{}({inner})", function.sql())
            }
            Head::One => "1".to_string(),
            Head::Top => "TOP 1 1".to_string(),
        };

        let clauses = ctx.where_clause(query.conditions.as_ref())?;
        Ok(ctx.finish(format!("SELECT {column} FROM {from}{clauses}")))
    }

    /// Multi-row `INSERT`. `rows` is one map or a list of maps; the column
    /// list is the union of every row's keys in first-seen order and missing
    /// cells bind `NULL`.
    pub fn insert(&self, table: &str, rows: &Value) -> QuarryResult<Compiled> {
        let rows: Vec<&Map> = match rows {
            Value::Object(row) => vec![row],
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_object().ok_or_else(|| {
                        QuarryError::compile(format!("insert rows must be maps, got {}", item.type_name()))
                    })
                })
                .collect::<QuarryResult<_>>()?,
            other => {
                return Err(QuarryError::compile(format!(
                    "insert expects a map or a list of maps, got {}",
                    other.type_name()
                )))
            }
        };

        let mut columns: Vec<&str> = Vec::new();
        for row in &rows {
            for key in row.keys() {
                if !columns.contains(&key) {
                    columns.push(key);
                }
            }
        }
        if columns.is_empty() {
            return Err(QuarryError::compile("insert needs at least one column"));
        }

        let table = self.quote_table(table)?;
        let fields = columns
            .iter()
            .map(|key| self.quote_column(encode::strip_json_marker(key)))
            .collect::<QuarryResult<Vec<_>>>()?;

        let mut ctx = self.context();
        let mut groups = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut values = Vec::with_capacity(columns.len());
            for key in &columns {
                let value = row.get(key).unwrap_or(&Value::Null);
                values.push(ctx.store(key, value)?);
            }
            groups.push(format!("({})", values.join(", ")));
        }

        Ok(ctx.finish(format!(
            "INSERT INTO {table} ({}) VALUES {}",
            fields.join(", "),
            groups.join(", ")
        )))
    }

    /// `UPDATE … SET`. Keys may end in `[+]`, `[-]`, `[*]`, `[/]` for
    /// in-place arithmetic with a numeric operand, or `[JSON]`.
    pub fn update(&self, table: &str, data: &Map, conditions: Option<&Value>) -> QuarryResult<Compiled> {
        if data.is_empty() {
            return Err(QuarryError::compile("update needs at least one column"));
        }
        let table = self.quote_table(table)?;
        let mut ctx = self.context();
        let mut fields = Vec::with_capacity(data.len());

        for (key, value) in data.iter() {
            let (name, marker) = match UPDATE_KEY_RE.captures(key) {
                Some(caps) => (
                    caps.get(1).map_or("", |m| m.as_str()).to_string(),
                    caps.get(2).map(|m| m.as_str().to_string()),
                ),
                None => (key.to_string(), None),
            };
            let column = self.quote_column(&name)?;

            if let Value::Raw(raw) = value {
                fields.push(format!("{column} = {}", ctx.raw(raw)?));
                continue;
            }

            match marker.as_deref() {
                Some(op @ ("+" | "-" | "*" | "/")) => {
                    if !value.is_numeric() {
                        return Err(QuarryError::compile(format!(
                            "arithmetic update of {name} needs a numeric operand, got {}",
                            value.type_name()
                        )));
                    }
                    let operand = match value {
                        Value::String(s) => s.trim().to_string(),
                        other => other.to_text(),
                    };
                    fields.push(format!("{column} = {column} {op} {operand}"));
                }
                _ => {
                    let placeholder = ctx.store(key, value)?;
                    fields.push(format!("{column} = {placeholder}"));
                }
            }
        }

        let clauses = ctx.where_clause(conditions)?;
        Ok(ctx.finish(format!("UPDATE {table} SET {}{clauses}", fields.join(", "))))
    }

    /// `DELETE FROM`.
    pub fn delete(&self, table: &str, conditions: Option<&Value>) -> QuarryResult<Compiled> {
        let table = self.quote_table(table)?;
        let mut ctx = self.context();
        let clauses = ctx.where_clause(conditions)?;
        Ok(ctx.finish(format!("DELETE FROM {table}{clauses}")))
    }

    /// In-place substring replacement: `{column: {old: new, …}, …}`.
    pub fn replace(&self, table: &str, columns: &Map, conditions: Option<&Value>) -> QuarryResult<Compiled> {
        let table = self.quote_table(table)?;
        let mut ctx = self.context();
        let mut stack = Vec::new();

        for (column, replacements) in columns.iter() {
            let Value::Object(pairs) = replacements else {
                continue;
            };
            let quoted = self.quote_column(column)?;
            for (old, new) in pairs.iter() {
                let from = ctx.bind_text(old);
                let to = ctx.bind_text(new.to_text());
                stack.push(format!("{quoted} = REPLACE({quoted}, {from}, {to})"));
            }
        }

        if stack.is_empty() {
            return Err(QuarryError::validation("Invalid columns supplied"));
        }

        let clauses = ctx.where_clause(conditions)?;
        Ok(ctx.finish(format!("UPDATE {table} SET {}{clauses}", stack.join(", "))))
    }

    /// `CREATE TABLE`. `columns` is a map of `name → [definition parts]` or
    /// `name → "definition"`, or a list of full definitions where `<name>`
    /// markers become quoted column names. `options` is a map rendered as
    /// `key = value` pairs or a literal string.
    pub fn create(&self, table: &str, columns: &Value, options: Option<&Value>) -> QuarryResult<Compiled> {
        let table = self.quote_table(table)?;
        let mut ctx = self.context();
        let mut stack = Vec::new();

        match columns {
            Value::Object(map) => {
                for (name, definition) in map.iter() {
                    let column = self.quote_column(name)?;
                    match definition {
                        Value::Array(parts) => {
                            let parts = parts.iter().map(Value::to_text).collect::<Vec<_>>();
                            stack.push(format!("{column} {}", parts.join(" ")));
                        }
                        Value::String(text) => stack.push(format!("{column} {text}")),
                        Value::Raw(raw) => stack.push(format!("{column} {}", ctx.raw(raw)?)),
                        other => {
                            return Err(QuarryError::compile(format!(
                                "definition of column {name} must be a list or a string, got {}",
                                other.type_name()
                            )))
                        }
                    }
                }
            }
            Value::Array(definitions) => {
                for definition in definitions {
                    match definition {
                        Value::String(text) => {
                            stack.push(DEFINITION_MARKER_RE.replace_all(text, "\"$1\"").into_owned())
                        }
                        Value::Raw(raw) => stack.push(ctx.raw(raw)?),
                        other => {
                            return Err(QuarryError::compile(format!(
                                "table definitions must be strings, got {}",
                                other.type_name()
                            )))
                        }
                    }
                }
            }
            other => {
                return Err(QuarryError::compile(format!(
                    "create expects a map or a list of definitions, got {}",
                    other.type_name()
                )))
            }
        }

        if stack.is_empty() {
            return Err(QuarryError::compile("create needs at least one column"));
        }

        let table_options = match options {
            None | Some(Value::Null) => String::new(),
            Some(Value::Object(map)) => {
                let pairs = map
                    .iter()
                    .filter(|(_, v)| matches!(v, Value::String(_) | Value::Int(_)))
                    .map(|(k, v)| format!("{k} = {}", v.to_text()))
                    .collect::<Vec<_>>();
                format!(" {}", pairs.join(", "))
            }
            Some(Value::String(text)) => format!(" {text}"),
            Some(other) => {
                return Err(QuarryError::compile(format!(
                    "table options must be a map or a string, got {}",
                    other.type_name()
                )))
            }
        };

        let command = if self.dialect().supports_if_not_exists() {
            "CREATE TABLE IF NOT EXISTS"
        } else {
            "CREATE TABLE"
        };

        Ok(ctx.finish(format!("{command} {table} ({}){table_options}", stack.join(", "))))
    }

    /// `DROP TABLE IF EXISTS`.
    pub fn drop(&self, table: &str) -> QuarryResult<Compiled> {
        Ok(Compiled::plain(format!("DROP TABLE IF EXISTS {}", self.quote_table(table)?)))
    }

    /// Expand a raw statement's markers; its own bindings pass through.
    pub fn raw(&self, raw: &Raw) -> QuarryResult<Compiled> {
        let mut ctx = self.context();
        let sql = ctx.raw(raw)?;
        Ok(ctx.finish(sql))
    }
}

impl Ctx<'_> {
    /// Bind a stored cell: raw is spliced, containers are encoded per the
    /// column key, scalars bind with their natural kind.
    fn store(&mut self, key: &str, value: &Value) -> QuarryResult<String> {
        match value {
            Value::Raw(raw) => self.raw(raw),
            Value::Array(_) | Value::Object(_) => {
                let encoded = encode::encode_container(key, value);
                Ok(self.placeholder(Param::new(encoded, ScalarKind::String)))
            }
            scalar => self.bind(scalar),
        }
    }
}
