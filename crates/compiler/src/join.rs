//! Join clauses.
//!
//! Keys are `[>]table`, `[<]table`, `[<>]table` or `[><]table`, optionally
//! followed by `(alias)`. The relation is a column name (`USING`), a list of
//! column names (`USING`), a map of equalities (`ON`) or a raw fragment.

use once_cell::sync::Lazy;
use quarry_core::{Map, QuarryError, QuarryResult, Value};
use regex::Regex;

use crate::compiler::Ctx;

static JOIN_KEY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\[(<>|><|<|>)\]\s*([\p{L}_][\p{L}\p{N}@$#\-_]*)\s*(?:\(([\p{L}_][\p{L}\p{N}@$#\-_]*)\))?\s*$",
    )
    .expect("join key pattern")
});

fn join_kind(marker: &str) -> &'static str {
    match marker {
        ">" => "LEFT",
        "<" => "RIGHT",
        "<>" => "FULL",
        _ => "INNER",
    }
}

impl Ctx<'_> {
    /// Compile a join map. `qualifier` is the quoted main table or alias
    /// used for unqualified left-hand columns in `ON` maps.
    pub(crate) fn joins(&mut self, qualifier: &str, join: &Map) -> QuarryResult<String> {
        let mut clauses = Vec::with_capacity(join.len());

        for (key, relation) in join.iter() {
            let caps = JOIN_KEY_RE
                .captures(key)
                .ok_or_else(|| QuarryError::validation(format!("Invalid join key: {key}")))?;
            let kind = join_kind(&caps[1]);
            let table = caps[2].to_string();
            let alias = caps.get(3).map(|m| m.as_str().to_string());
            let joined = self.compiler.quote_table(alias.as_deref().unwrap_or(&table))?;

            let relation = match relation {
                Value::String(column) => format!("USING ({})", self.compiler.quote_column(column)?),
                Value::Array(columns) => {
                    let quoted = columns
                        .iter()
                        .map(|c| match c.as_str() {
                            Some(name) => self.compiler.quote_column(name),
                            None => Err(QuarryError::compile(format!(
                                "USING list for join {key} must hold column names"
                            ))),
                        })
                        .collect::<QuarryResult<Vec<_>>>()?;
                    format!("USING ({})", quoted.join(", "))
                }
                Value::Object(pairs) => {
                    let mut on = Vec::with_capacity(pairs.len());
                    for (left, right) in pairs.iter() {
                        if let ("AND", Value::Object(nested)) = (left, right) {
                            on.push(self.conditions(nested, "AND")?);
                            continue;
                        }
                        let right = right.as_str().ok_or_else(|| {
                            QuarryError::compile(format!(
                                "join {key}: right-hand side of {left} must be a column name"
                            ))
                        })?;
                        let left = if left.contains('.') {
                            self.compiler.quote_column(left)?
                        } else {
                            format!("{qualifier}.{}", self.compiler.quote_column(left)?)
                        };
                        on.push(format!("{left} = {joined}.{}", self.compiler.quote_column(right)?));
                    }
                    format!("ON {}", on.join(" AND "))
                }
                Value::Raw(raw) => self.raw(raw)?,
                other => {
                    return Err(QuarryError::compile(format!(
                        "join {key}: unsupported relation of type {}",
                        other.type_name()
                    )))
                }
            };

            let mut target = self.compiler.quote_table(&table)?;
            if let Some(alias) = &alias {
                target = format!("{target} AS {}", self.compiler.quote_table(alias)?);
            }
            clauses.push(format!("{kind} JOIN {target} {relation}"));
        }

        Ok(clauses.join(" "))
    }
}
