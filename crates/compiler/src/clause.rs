//! WHERE/MATCH/GROUP/HAVING/ORDER/LIMIT assembly.

use quarry_core::{Dialect, Map, QuarryError, QuarryResult, Value};

use crate::compiler::Ctx;

/// Condition-tree keys that are clause modifiers rather than columns.
pub const MODIFIERS: [&str; 6] = ["GROUP", "ORDER", "HAVING", "LIMIT", "LIKE", "MATCH"];

impl Ctx<'_> {
    /// Render the clause tail for a condition tree (leading space included).
    pub(crate) fn where_clause(&mut self, conditions: Option<&Value>) -> QuarryResult<String> {
        let tree = match conditions {
            None | Some(Value::Null) => return Ok(String::new()),
            Some(Value::Raw(raw)) => return Ok(format!(" {}", self.raw(raw)?)),
            Some(Value::Object(tree)) => tree,
            Some(other) => {
                return Err(QuarryError::compile(format!(
                    "conditions must be a map or a raw fragment, got {}",
                    other.type_name()
                )))
            }
        };

        let mut clause = String::new();

        let plain: Map = tree
            .iter()
            .filter(|(k, _)| !MODIFIERS.contains(k))
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        if !plain.is_empty() {
            clause = format!(" WHERE {}", self.conditions(&plain, "AND")?);
        }

        if let Some(spec) = tree.get("MATCH") {
            self.full_text(&mut clause, spec)?;
        }
        if let Some(group) = tree.get("GROUP") {
            clause.push_str(&format!(" GROUP BY {}", self.group_by(group)?));
        }
        if let Some(having) = tree.get("HAVING") {
            let rendered = match having {
                Value::Raw(raw) => self.raw(raw)?,
                Value::Object(map) => self.conditions(map, "AND")?,
                other => {
                    return Err(QuarryError::compile(format!(
                        "HAVING expects a map or a raw fragment, got {}",
                        other.type_name()
                    )))
                }
            };
            clause.push_str(&format!(" HAVING {rendered}"));
        }
        let ordered = tree.get("ORDER");
        if let Some(order) = ordered {
            clause.push_str(&format!(" ORDER BY {}", self.order_by(order)?));
        }
        if let Some(limit) = tree.get("LIMIT") {
            self.limit(&mut clause, limit, ordered.is_some())?;
        }

        Ok(clause)
    }

    fn full_text(&mut self, clause: &mut String, spec: &Value) -> QuarryResult<()> {
        if self.compiler.dialect() != Dialect::MySql {
            tracing::debug!(
                target: "quarry::compiler",
                dialect = %self.compiler.dialect(),
                "MATCH ignored outside MySQL"
            );
            return Ok(());
        }

        let map = spec
            .as_object()
            .ok_or_else(|| QuarryError::compile("MATCH expects {columns, keyword, mode?}"))?;
        let (Some(Value::Array(columns)), Some(keyword)) = (map.get("columns"), map.get("keyword")) else {
            return Err(QuarryError::compile("MATCH expects {columns, keyword, mode?}"));
        };

        let mode = match map.get("mode").and_then(Value::as_str) {
            Some("natural") => " IN NATURAL LANGUAGE MODE",
            Some("natural+query") => " IN NATURAL LANGUAGE MODE WITH QUERY EXPANSION",
            Some("boolean") => " IN BOOLEAN MODE",
            Some("query") => " WITH QUERY EXPANSION",
            _ => "",
        };

        let quoted = columns
            .iter()
            .map(|c| match c.as_str() {
                Some(name) => self.compiler.quote_column(name),
                None => Err(QuarryError::compile("MATCH columns must be column names")),
            })
            .collect::<QuarryResult<Vec<_>>>()?;
        let placeholder = self.bind_text(keyword.to_text());

        clause.push_str(if clause.is_empty() { " WHERE" } else { " AND" });
        clause.push_str(&format!(" MATCH ({}) AGAINST ({placeholder}{mode})", quoted.join(", ")));
        Ok(())
    }

    fn group_by(&mut self, group: &Value) -> QuarryResult<String> {
        match group {
            Value::Array(columns) => {
                let quoted = columns
                    .iter()
                    .map(|c| match c.as_str() {
                        Some(name) => self.compiler.quote_column(name),
                        None => Err(QuarryError::compile("GROUP list must hold column names")),
                    })
                    .collect::<QuarryResult<Vec<_>>>()?;
                Ok(quoted.join(","))
            }
            Value::Raw(raw) => self.raw(raw),
            Value::String(column) => self.compiler.quote_column(column),
            other => Err(QuarryError::compile(format!(
                "GROUP expects a column, a list or a raw fragment, got {}",
                other.type_name()
            ))),
        }
    }

    fn order_by(&mut self, order: &Value) -> QuarryResult<String> {
        match order {
            Value::Array(columns) => {
                let quoted = columns
                    .iter()
                    .map(|c| match c.as_str() {
                        Some(name) => self.compiler.quote_column(name),
                        None => Err(QuarryError::compile("ORDER list must hold column names")),
                    })
                    .collect::<QuarryResult<Vec<_>>>()?;
                Ok(quoted.join(","))
            }
            Value::Object(map) => {
                let mut stack = Vec::with_capacity(map.len());
                for (column, direction) in map.iter() {
                    let quoted = self.compiler.quote_column(column)?;
                    match direction {
                        Value::String(d) if d == "ASC" || d == "DESC" => stack.push(format!("{quoted} {d}")),
                        Value::Array(values) => {
                            let literals = values
                                .iter()
                                .map(|v| match v {
                                    Value::Int(i) => i.to_string(),
                                    other => self.compiler.quote(&other.to_text()),
                                })
                                .collect::<Vec<_>>();
                            stack.push(format!("FIELD({quoted}, {})", literals.join(",")));
                        }
                        other => {
                            return Err(QuarryError::validation(format!(
                                "Invalid order direction for {column}: {}",
                                other.to_text()
                            )))
                        }
                    }
                }
                Ok(stack.join(","))
            }
            Value::Raw(raw) => self.raw(raw),
            Value::String(column) => self.compiler.quote_column(column),
            other => Err(QuarryError::compile(format!(
                "ORDER expects a column, a list, a map or a raw fragment, got {}",
                other.type_name()
            ))),
        }
    }

    fn limit(&mut self, clause: &mut String, limit: &Value, ordered: bool) -> QuarryResult<()> {
        let count = |v: &Value| -> QuarryResult<u64> {
            v.is_numeric()
                .then(|| v.to_i64())
                .flatten()
                .and_then(|n| u64::try_from(n).ok())
                .ok_or_else(|| QuarryError::compile(format!("LIMIT bound must be a non-negative integer, got {}", v.to_text())))
        };

        let (offset, rows) = match limit {
            Value::Array(pair) => match pair.as_slice() {
                [offset, rows] => (Some(count(offset)?), count(rows)?),
                _ => return Err(QuarryError::compile("LIMIT expects a count or [offset, count]")),
            },
            single => (None, count(single)?),
        };

        let dialect = self.compiler.dialect();
        if dialect.uses_fetch_paging() {
            if dialect == Dialect::MsSql && !ordered {
                clause.push_str(" ORDER BY (SELECT 0)");
            }
            clause.push_str(&format!(
                " OFFSET {} ROWS FETCH NEXT {rows} ROWS ONLY",
                offset.unwrap_or(0)
            ));
        } else {
            match offset {
                Some(offset) => clause.push_str(&format!(" LIMIT {rows} OFFSET {offset}")),
                None => clause.push_str(&format!(" LIMIT {rows}")),
            }
        }
        Ok(())
    }
}
