//! Column projection.
//!
//! Column items read `@table.column (alias) [Type]`:
//!
//! | Part | Effect |
//! |------|--------|
//! | `@` | `DISTINCT`, first marked column only, moved to the front |
//! | `table.` | qualified, prefixed table reference |
//! | `(alias)` | `AS "alias"`, also the result key |
//! | `[Type]` | cast applied by the projector |
//!
//! A map with a single key whose value is itself a spec groups results by
//! that key; raw values under map keys are spliced as `raw AS "key"`.

use once_cell::sync::Lazy;
use quarry_core::{QuarryError, QuarryResult, Value};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::compiler::Ctx;

static ITEM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(@)?\s*([\p{L}_][\p{L}\p{N}@$#\-_]*(?:\.[\p{L}_][\p{L}\p{N}@$#\-_]*)?)(?:\s*\(([\p{L}_][\p{L}\p{N}@$#\-_]*)\))?(?:\s*\[(String|Bool|Int|Number|Object|JSON)\])?\s*$",
    )
    .expect("column item pattern")
});

static KEYED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^([\p{L}_][\p{L}\p{N}@$#\-_]*(?:\.[\p{L}_][\p{L}\p{N}@$#\-_]*)?)(?:\s*\[(String|Bool|Int|Number|Object|JSON)\])?\s*$",
    )
    .expect("keyed column pattern")
});

/// Declared result type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    /// Left as returned
    String,
    /// Truthiness
    Bool,
    /// Integer
    Int,
    /// Float
    Number,
    /// Structured-text decoded
    Object,
    /// JSON decoded
    Json,
}

impl ColumnType {
    fn parse(tag: &str) -> Option<Self> {
        match tag {
            "String" => Some(ColumnType::String),
            "Bool" => Some(ColumnType::Bool),
            "Int" => Some(ColumnType::Int),
            "Number" => Some(ColumnType::Number),
            "Object" => Some(ColumnType::Object),
            "JSON" => Some(ColumnType::Json),
            _ => None,
        }
    }
}

/// A parsed column item.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnItem {
    /// Possibly qualified column name
    pub column: String,
    /// Output alias
    pub alias: Option<String>,
    /// Declared type
    pub ty: Option<ColumnType>,
    /// `@` marker present
    pub distinct: bool,
}

impl ColumnItem {
    /// Parse `@table.column (alias) [Type]`.
    pub fn parse(item: &str) -> QuarryResult<Self> {
        let caps = ITEM_RE
            .captures(item)
            .ok_or_else(|| QuarryError::validation(format!("Incorrect column name: {item}")))?;
        Ok(Self {
            distinct: caps.get(1).is_some(),
            column: caps[2].to_string(),
            alias: caps.get(3).map(|m| m.as_str().to_string()),
            ty: caps.get(4).and_then(|m| ColumnType::parse(m.as_str())),
        })
    }

    /// Parse the key of a raw-valued entry: `column [Type]`.
    pub fn parse_key(key: &str) -> QuarryResult<Self> {
        let caps = KEYED_RE
            .captures(key)
            .ok_or_else(|| QuarryError::validation(format!("Incorrect column name: {key}")))?;
        Ok(Self {
            distinct: false,
            column: caps[1].to_string(),
            alias: None,
            ty: caps.get(2).and_then(|m| ColumnType::parse(m.as_str())),
        })
    }

    /// Key the engine reports the column under: the alias, else the bare
    /// column name.
    pub fn result_key(&self) -> &str {
        match &self.alias {
            Some(alias) => alias,
            None => strip_qualifier(&self.column),
        }
    }
}

/// `table.column` → `column`.
pub fn strip_qualifier(column: &str) -> &str {
    column.rsplit_once('.').map(|(_, c)| c).unwrap_or(column)
}

impl Ctx<'_> {
    /// Render a column spec for the SELECT list.
    pub(crate) fn column_list(&mut self, columns: &Value, root: bool, joining: bool) -> QuarryResult<String> {
        match columns {
            Value::String(s) if s == "*" => Ok("*".to_string()),
            Value::String(_) => self.column_items(std::slice::from_ref(columns), joining),
            Value::Array(items) => self.column_items(items, joining),
            Value::Object(map) => {
                if root && map.len() == 1 {
                    if let Some((key, spec)) = map.first() {
                        if spec.is_container() {
                            let index = self.compiler.quote_column(key)?;
                            let nested = self.column_list(spec, false, joining)?;
                            return Ok(format!("{index},{nested}"));
                        }
                    }
                }

                let mut stack = Vec::with_capacity(map.len());
                for (key, value) in map.iter() {
                    match value {
                        Value::Array(_) | Value::Object(_) => {
                            stack.push(self.column_list(value, false, joining)?)
                        }
                        Value::Raw(raw) => {
                            let item = ColumnItem::parse_key(key)?;
                            let sql = self.raw(raw)?;
                            let alias = self.compiler.quote_column(&item.column)?;
                            stack.push(format!("{sql} AS {alias}"));
                        }
                        other => {
                            return Err(QuarryError::compile(format!(
                                "column key {key} must map to a raw fragment or a nested spec, got {}",
                                other.type_name()
                            )))
                        }
                    }
                }
                Ok(stack.join(","))
            }
            Value::Raw(raw) => self.raw(raw),
            other => Err(QuarryError::compile(format!(
                "unsupported column spec of type {}",
                other.type_name()
            ))),
        }
    }

    fn column_items(&mut self, items: &[Value], joining: bool) -> QuarryResult<String> {
        let mut stack: Vec<String> = Vec::with_capacity(items.len());
        let mut has_distinct = false;

        for item in items {
            match item {
                Value::String(s) => {
                    if s.contains('*') {
                        if joining {
                            return Err(QuarryError::validation(
                                "Cannot use table.* to select all columns while joining table",
                            ));
                        }
                        stack.push(self.star(s)?);
                        continue;
                    }

                    let parsed = ColumnItem::parse(s)?;
                    let mut rendered = self.compiler.quote_column(&parsed.column)?;
                    if let Some(alias) = &parsed.alias {
                        rendered = format!("{rendered} AS {}", self.compiler.quote_column(alias)?);
                    }

                    if parsed.distinct && !has_distinct {
                        has_distinct = true;
                        stack.insert(0, format!("DISTINCT {rendered}"));
                    } else {
                        stack.push(rendered);
                    }
                }
                Value::Array(_) | Value::Object(_) => stack.push(self.column_list(item, false, joining)?),
                Value::Raw(raw) => stack.push(self.raw(raw)?),
                other => {
                    return Err(QuarryError::compile(format!(
                        "column list entries must be strings, got {}",
                        other.type_name()
                    )))
                }
            }
        }

        Ok(stack.join(","))
    }

    fn star(&self, item: &str) -> QuarryResult<String> {
        if item == "*" {
            return Ok("*".to_string());
        }
        match item.strip_suffix(".*") {
            Some(table) => Ok(format!("{}.*", self.compiler.quote_table(table)?)),
            None => Err(QuarryError::validation(format!("Incorrect column name: {item}"))),
        }
    }
}
