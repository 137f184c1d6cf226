//! Placeholder → (value, scalar kind) bindings.

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Scalar kind tag attached to every bound parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarKind {
    /// SQL NULL
    Null,
    /// Integer
    Int,
    /// Floating point
    Float,
    /// Boolean (engines receive 1/0)
    Bool,
    /// Text
    String,
    /// Binary large object
    Blob,
}

impl ScalarKind {
    /// Natural kind of a scalar value. Containers and raw fragments are not
    /// scalars and map to `String`; callers encode them before binding.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => ScalarKind::Null,
            Value::Bool(_) => ScalarKind::Bool,
            Value::Int(_) => ScalarKind::Int,
            Value::Float(_) => ScalarKind::Float,
            Value::Bytes(_) => ScalarKind::Blob,
            _ => ScalarKind::String,
        }
    }
}

/// A single bound parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    /// Bound value
    pub value: Value,
    /// Declared kind
    pub kind: ScalarKind,
}

impl Param {
    /// Bind a value with an explicit kind.
    pub fn new(value: impl Into<Value>, kind: ScalarKind) -> Self {
        Self {
            value: value.into(),
            kind,
        }
    }

    /// Bind a value with its natural kind.
    pub fn typed(value: impl Into<Value>) -> Self {
        let value = value.into();
        let kind = ScalarKind::of(&value);
        Self { value, kind }
    }
}

/// Ordered parameter map. Keys include their leading `:`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamMap(Vec<(String, Param)>);

impl ParamMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a binding.
    pub fn insert(&mut self, key: impl Into<String>, param: Param) {
        let key = key.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = param,
            None => self.0.push((key, param)),
        }
    }

    /// Look up a binding.
    pub fn get(&self, key: &str) -> Option<&Param> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, p)| p)
    }

    /// Merge another map in, later bindings winning.
    pub fn extend(&mut self, other: ParamMap) {
        for (k, p) in other.0 {
            self.insert(k, p);
        }
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate bindings in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Param)> {
        self.0.iter().map(|(k, p)| (k.as_str(), p))
    }
}

impl FromIterator<(String, Param)> for ParamMap {
    fn from_iter<I: IntoIterator<Item = (String, Param)>>(iter: I) -> Self {
        let mut map = ParamMap::new();
        for (k, p) in iter {
            map.insert(k, p);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_of() {
        assert_eq!(ScalarKind::of(&Value::Int(1)), ScalarKind::Int);
        assert_eq!(ScalarKind::of(&Value::Float(1.0)), ScalarKind::Float);
        assert_eq!(ScalarKind::of(&Value::Bytes(vec![1])), ScalarKind::Blob);
        assert_eq!(ScalarKind::of(&Value::Null), ScalarKind::Null);
        assert_eq!(ScalarKind::of(&Value::from("s")), ScalarKind::String);
    }

    #[test]
    fn test_insert_overwrites_in_place() {
        let mut map = ParamMap::new();
        map.insert(":a", Param::typed(1));
        map.insert(":b", Param::typed(2));
        map.insert(":a", Param::typed("x"));
        let keys: Vec<&str> = map.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![":a", ":b"]);
        assert_eq!(map.get(":a").unwrap().kind, ScalarKind::String);
    }
}
