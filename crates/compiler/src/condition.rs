//! Condition tree compilation.
//!
//! Keys read `column`, `column[op]` or `column[op]other_column`; `AND` and
//! `OR` keys (optionally suffixed with `# comment` to keep them unique)
//! open nested groups joined by their own conjunction.
//!
//! | Operator | Value | SQL |
//! |----------|-------|-----|
//! | none, `=` | null / list / raw / scalar | `IS NULL` / `IN (…)` / `= raw` / `= :p` |
//! | `!` | null / list / raw / scalar | `IS NOT NULL` / `NOT IN (…)` / `!= raw` / `!= :p` |
//! | `>` `>=` `<` `<=` | number / raw / other | `> :p` (int or float) / `> raw` / `> :p` (text) |
//! | `~` `!~` | scalar / list / `{"AND"|"OR": list}` | `(col LIKE :p OR …)` |
//! | `<>` `><` | `[a, b]` | `(col BETWEEN :a AND :b)` / `NOT BETWEEN` |
//! | `REGEXP` | text | `col REGEXP :p` |

use once_cell::sync::Lazy;
use quarry_core::{Map, Param, QuarryError, QuarryResult, ScalarKind, Value};
use regex::Regex;

use crate::compiler::Ctx;

static GROUP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(AND|OR)(\s+#.*)?$").expect("group pattern"));

static CONDITION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^([\p{L}_][\p{L}\p{N}@$#\-_\.]*)\s*(?:\[(.+?)\])?\s*([\p{L}_][\p{L}\p{N}@$#\-_\.]*)?$",
    )
    .expect("condition pattern")
});

const COLUMN_COMPARISONS: [&str; 6] = [">", ">=", "<", "<=", "=", "!="];

impl Ctx<'_> {
    /// Compile a condition map, joining entries with `conjunction`.
    pub(crate) fn conditions(&mut self, map: &Map, conjunction: &str) -> QuarryResult<String> {
        let mut stack = Vec::with_capacity(map.len());

        for (key, value) in map.iter() {
            if let Some(caps) = GROUP_RE.captures(key) {
                let inner = &caps[1];
                match value {
                    Value::Object(group) => {
                        stack.push(format!("({})", self.conditions(group, inner)?));
                        continue;
                    }
                    Value::Array(items) => {
                        stack.push(format!("({})", self.condition_list(items, inner)?));
                        continue;
                    }
                    _ => {}
                }
            }
            stack.push(self.condition(key, value)?);
        }

        Ok(stack.join(&format!(" {conjunction} ")))
    }

    /// A list group: strings are column comparisons, maps nested groups.
    /// A map entry is a full condition tree, so its keys are `AND`ed like a
    /// top-level tree; an `OR` key inside it opens its own `OR` group.
    fn condition_list(&mut self, items: &[Value], conjunction: &str) -> QuarryResult<String> {
        let mut stack = Vec::with_capacity(items.len());
        for item in items {
            match item {
                Value::String(key) => stack.push(self.condition(key, &Value::Null)?),
                Value::Object(map) => stack.push(format!("({})", self.conditions(map, "AND")?)),
                Value::Raw(raw) => stack.push(self.raw(raw)?),
                other => {
                    return Err(QuarryError::compile(format!(
                        "condition group entries must be strings or maps, got {}",
                        other.type_name()
                    )))
                }
            }
        }
        Ok(stack.join(&format!(" {conjunction} ")))
    }

    fn condition(&mut self, key: &str, value: &Value) -> QuarryResult<String> {
        let caps = CONDITION_RE
            .captures(key)
            .ok_or_else(|| QuarryError::validation(format!("Invalid condition key: {key}")))?;
        let column = self.compiler.quote_column(&caps[1])?;
        let operator = caps.get(2).map(|m| m.as_str());

        if let Some(other) = caps.get(3) {
            return match operator {
                Some(op) if COLUMN_COMPARISONS.contains(&op) => Ok(format!(
                    "{column} {op} {}",
                    self.compiler.quote_column(other.as_str())?
                )),
                _ => Err(QuarryError::validation(format!(
                    "Invalid column comparison: {key}"
                ))),
            };
        }

        match operator {
            None | Some("=") => self.equality(&column, value, false),
            Some("!") => self.equality(&column, value, true),
            Some(op @ (">" | ">=" | "<" | "<=")) => self.comparison(&column, op, value),
            Some(op @ ("~" | "!~")) => self.like(&column, op == "!~", value),
            Some(op @ ("<>" | "><")) => self.between(&column, op == "><", value),
            Some("REGEXP") => {
                let placeholder = self.scalar_text(&column, value)?;
                Ok(format!("{column} REGEXP {placeholder}"))
            }
            Some(other) => Err(QuarryError::validation(format!(
                "Invalid operator [{other}] for column {column} supplied"
            ))),
        }
    }

    fn equality(&mut self, column: &str, value: &Value, negate: bool) -> QuarryResult<String> {
        let not = if negate { " NOT" } else { "" };
        match value {
            Value::Null => Ok(format!("{column} IS{not} NULL")),
            Value::Array(items) => {
                if items.is_empty() {
                    return Err(QuarryError::compile(format!("empty IN list for column {column}")));
                }
                let placeholders = items
                    .iter()
                    .map(|item| self.bind(item))
                    .collect::<QuarryResult<Vec<_>>>()?;
                Ok(format!("{column}{not} IN ({})", placeholders.join(", ")))
            }
            Value::Raw(raw) => {
                let sql = self.raw(raw)?;
                Ok(format!("{column} {} {sql}", if negate { "!=" } else { "=" }))
            }
            Value::Object(_) => Err(QuarryError::compile(format!(
                "cannot compare column {column} with a map"
            ))),
            scalar => {
                let placeholder = self.bind(scalar)?;
                Ok(format!("{column} {} {placeholder}", if negate { "!=" } else { "=" }))
            }
        }
    }

    fn comparison(&mut self, column: &str, op: &str, value: &Value) -> QuarryResult<String> {
        let rhs = match value {
            Value::Raw(raw) => self.raw(raw)?,
            v if v.is_numeric() => self.bind_number(v),
            Value::Array(_) | Value::Object(_) => {
                return Err(QuarryError::compile(format!(
                    "cannot compare column {column} with a {}",
                    value.type_name()
                )))
            }
            v => self.bind(v)?,
        };
        Ok(format!("{column} {op} {rhs}"))
    }

    fn like(&mut self, column: &str, negate: bool, value: &Value) -> QuarryResult<String> {
        let mut connector = "OR";
        let items: Vec<Value> = match value {
            Value::Array(items) => items.clone(),
            Value::Object(map) => match map.first() {
                Some((key @ ("AND" | "OR"), Value::Array(items))) if map.len() == 1 => {
                    connector = if key == "AND" { "AND" } else { "OR" };
                    items.clone()
                }
                _ => {
                    return Err(QuarryError::compile(format!(
                        "LIKE on column {column} expects a value, a list or {{\"AND\"|\"OR\": list}}"
                    )))
                }
            },
            scalar => vec![scalar.clone()],
        };

        if items.is_empty() {
            return Err(QuarryError::compile(format!("empty LIKE list for column {column}")));
        }

        let not = if negate { " NOT" } else { "" };
        let mut clauses = Vec::with_capacity(items.len());
        for item in &items {
            if item.is_container() || item.is_raw() {
                return Err(QuarryError::compile(format!(
                    "LIKE pattern for column {column} must be a scalar"
                )));
            }
            let mut pattern = item.to_text();
            if !has_wildcard(&pattern) {
                pattern = format!("%{pattern}%");
            }
            let placeholder = self.bind_text(pattern);
            clauses.push(format!("{column}{not} LIKE {placeholder}"));
        }

        Ok(format!("({})", clauses.join(&format!(" {connector} "))))
    }

    fn between(&mut self, column: &str, negate: bool, value: &Value) -> QuarryResult<String> {
        let (low, high) = match value.as_array() {
            Some([low, high]) => (low, high),
            _ => {
                return Err(QuarryError::compile(format!(
                    "BETWEEN on column {column} expects exactly two values"
                )))
            }
        };
        let not = if negate { " NOT" } else { "" };

        let (a, b) = match (low, high) {
            (Value::Raw(a), Value::Raw(b)) => (self.raw(a)?, self.raw(b)?),
            (a, b) if a.is_numeric() && b.is_numeric() => (self.bind_number(a), self.bind_number(b)),
            (a, b) => {
                if a.is_container() || b.is_container() || a.is_raw() || b.is_raw() {
                    return Err(QuarryError::compile(format!(
                        "BETWEEN bounds for column {column} must both be scalars or both be raw"
                    )));
                }
                (self.bind_text(a.to_text()), self.bind_text(b.to_text()))
            }
        };

        Ok(format!("({column}{not} BETWEEN {a} AND {b})"))
    }

    fn scalar_text(&mut self, column: &str, value: &Value) -> QuarryResult<String> {
        if value.is_container() || value.is_raw() || value.is_null() {
            return Err(QuarryError::compile(format!(
                "REGEXP on column {column} expects a text pattern"
            )));
        }
        Ok(self.bind_text(value.to_text()))
    }

    /// Bind a numeric value (numeric strings included) as int or float.
    pub(crate) fn bind_number(&mut self, value: &Value) -> String {
        let param = match value {
            Value::Int(i) => Param::new(*i, ScalarKind::Int),
            Value::Float(f) => Param::new(*f, ScalarKind::Float),
            other => match other.to_text().trim().parse::<i64>() {
                Ok(i) => Param::new(i, ScalarKind::Int),
                Err(_) => Param::new(other.to_f64().unwrap_or(0.0), ScalarKind::Float),
            },
        };
        self.placeholder(param)
    }
}

/// True when a LIKE pattern already carries an unescaped wildcard token
/// (`% _ * ? ! # ^` or a `[…]` class).
pub(crate) fn has_wildcard(pattern: &str) -> bool {
    let chars: Vec<char> = pattern.chars().collect();
    let escaped = |i: usize| i > 0 && chars[i - 1] == '\\';

    for (i, c) in chars.iter().enumerate() {
        if escaped(i) {
            continue;
        }
        match c {
            '%' | '_' | '*' | '?' | '!' | '#' | '^' => return true,
            '[' => {
                let closes = (i + 2..chars.len()).any(|j| chars[j] == ']' && !escaped(j));
                if closes {
                    return true;
                }
            }
            _ => {}
        }
    }
    false
}
