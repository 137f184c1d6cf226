//! Test modules for the compiler crate.

mod properties;
mod schema;
mod select;

use quarry_core::{Dialect, ScalarKind, Value};

use crate::{Compiled, Compiler};

pub(crate) fn sqlite() -> Compiler {
    Compiler::new(Dialect::Sqlite)
}

pub(crate) fn v(json: serde_json::Value) -> Value {
    Value::from(json)
}

/// Assert a binding's value and kind.
pub(crate) fn assert_param(compiled: &Compiled, key: &str, value: impl Into<Value>, kind: ScalarKind) {
    let param = compiled
        .params
        .get(key)
        .unwrap_or_else(|| panic!("missing {key} in {:?}", compiled.params));
    assert_eq!(param.value, value.into(), "value of {key}");
    assert_eq!(param.kind, kind, "kind of {key}");
}
