//! Raw SQL fragments.
//!
//! A [`Raw`] carries SQL text that the compiler splices verbatim, apart from
//! `<table>` and `<table.column>` markers which are rewritten into quoted
//! identifiers. Its parameters are merged into the statement's map as given.

use serde::{Deserialize, Serialize};

use crate::param::{Param, ParamMap};
use crate::value::Value;

/// Caller-authored SQL fragment with its own bindings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Raw {
    sql: String,
    #[serde(default)]
    params: ParamMap,
}

impl Raw {
    /// Fragment without bindings.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: ParamMap::new(),
        }
    }

    /// Fragment with a prepared parameter map.
    pub fn with_params(sql: impl Into<String>, params: ParamMap) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// Bind a value under `key`; a missing leading `:` is added.
    pub fn bind(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        let key = if key.starts_with(':') {
            key.to_string()
        } else {
            format!(":{key}")
        };
        self.params.insert(key, Param::typed(value));
        self
    }

    /// Builder form of [`Raw::bind`].
    pub fn arg(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.bind(key, value);
        self
    }

    /// Fragment text, markers unexpanded.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Fragment bindings.
    pub fn params(&self) -> &ParamMap {
        &self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::ScalarKind;

    #[test]
    fn test_bind_adds_colon() {
        let raw = Raw::new("<age> > :min").arg("min", 3).arg(":flag", true);
        assert_eq!(raw.params().get(":min").unwrap().value, Value::Int(3));
        assert_eq!(raw.params().get(":flag").unwrap().kind, ScalarKind::Bool);
        assert_eq!(raw.sql(), "<age> > :min");
    }
}
