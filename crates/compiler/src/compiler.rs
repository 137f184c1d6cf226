//! The compiler handle and the per-statement build context.

use quarry_core::{Dialect, Param, ParamMap, QuarryError, QuarryResult, Raw, ScalarKind, Value};
use serde::{Deserialize, Serialize};

/// Compiles query descriptors for one dialect and table prefix.
///
/// A `Compiler` holds no state between calls: every statement builder starts
/// a fresh placeholder sequence, so compiling the same descriptor twice
/// yields byte-identical output.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Compiler {
    dialect: Dialect,
    prefix: String,
}

/// SQL text plus the bindings its placeholders refer to.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Compiled {
    /// Statement text with `:name` placeholders
    pub sql: String,
    /// Placeholder bindings
    pub params: ParamMap,
}

impl Compiled {
    /// Statement without bindings.
    pub fn plain(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: ParamMap::new(),
        }
    }
}

impl Compiler {
    /// Compiler for `dialect` without a table prefix.
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            prefix: String::new(),
        }
    }

    /// Set the table prefix applied to every table reference.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Target dialect.
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Table prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub(crate) fn context(&self) -> Ctx<'_> {
        Ctx {
            compiler: self,
            params: ParamMap::new(),
            next: 0,
        }
    }
}

/// State threaded through one statement build: the parameter map and the
/// placeholder counter.
pub(crate) struct Ctx<'c> {
    pub compiler: &'c Compiler,
    params: ParamMap,
    next: usize,
}

impl<'c> Ctx<'c> {
    /// Allocate a fresh placeholder bound to `param`.
    pub fn placeholder(&mut self, param: Param) -> String {
        let key = format!(":p{}", self.next);
        self.next += 1;
        self.params.insert(key.clone(), param);
        key
    }

    /// Bind a scalar with its natural kind.
    pub fn bind(&mut self, value: &Value) -> QuarryResult<String> {
        match value {
            Value::Array(_) | Value::Object(_) => Err(QuarryError::compile(format!(
                "cannot bind {} value as a scalar",
                value.type_name()
            ))),
            Value::Raw(_) => Err(QuarryError::compile("raw fragment cannot be bound")),
            scalar => Ok(self.placeholder(Param::typed(scalar.clone()))),
        }
    }

    /// Bind a value as text regardless of its natural kind.
    pub fn bind_text(&mut self, text: impl Into<String>) -> String {
        self.placeholder(Param::new(Value::String(text.into()), ScalarKind::String))
    }

    /// Expand a raw fragment and merge its bindings.
    pub fn raw(&mut self, raw: &Raw) -> QuarryResult<String> {
        let sql = crate::raw::expand_markers(self.compiler, raw.sql())?;
        self.params.extend(raw.params().clone());
        Ok(sql)
    }

    /// Close the build.
    pub fn finish(self, sql: String) -> Compiled {
        tracing::trace!(
            target: "quarry::compiler",
            dialect = %self.compiler.dialect,
            params = self.params.len(),
            "Compiled statement"
        );
        Compiled {
            sql,
            params: self.params,
        }
    }
}
