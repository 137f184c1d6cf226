//! Flattening of container values into bindable text.
//!
//! Arrays and maps stored through `insert`/`update` become a single string
//! parameter. By default they use a length-prefixed structured text:
//!
//! ```text
//! a:2:{i:0;s:3:"red";i:1;d:0.5;}
//! ```
//!
//! Columns whose key ends in ` [JSON]` receive canonical JSON instead. The
//! projector decodes both forms back for `[Object]` and `[JSON]` columns.

use std::fmt::Write as _;

use quarry_core::{Map, Value};

/// Trailing key marker selecting JSON encoding.
pub const JSON_MARKER: &str = "[JSON]";

/// True when `key` asks for JSON encoding.
pub fn wants_json(key: &str) -> bool {
    key.ends_with(JSON_MARKER)
}

/// Column name with a trailing ` [JSON]` marker removed.
pub fn strip_json_marker(key: &str) -> &str {
    key.strip_suffix(JSON_MARKER).map(str::trim_end).unwrap_or(key)
}

/// Encode a container for storage, picking the form from the column key.
pub fn encode_container(key: &str, value: &Value) -> String {
    if wants_json(key) {
        to_json(value)
    } else {
        to_structured(value)
    }
}

/// Canonical JSON text.
pub fn to_json(value: &Value) -> String {
    serde_json::Value::from(value.clone()).to_string()
}

/// Length-prefixed structured text.
pub fn to_structured(value: &Value) -> String {
    let mut out = String::new();
    write_structured(&mut out, value);
    out
}

fn write_str(out: &mut String, s: &str) {
    let _ = write!(out, "s:{}:\"{}\";", s.len(), s);
}

fn write_structured(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("N;"),
        Value::Bool(b) => {
            let _ = write!(out, "b:{};", *b as u8);
        }
        Value::Int(i) => {
            let _ = write!(out, "i:{i};");
        }
        Value::Float(f) => {
            let _ = write!(out, "d:{f};");
        }
        Value::String(s) => write_str(out, s),
        Value::Bytes(b) => write_str(out, &String::from_utf8_lossy(b)),
        Value::Raw(r) => write_str(out, r.sql()),
        Value::Array(items) => {
            let _ = write!(out, "a:{}:{{", items.len());
            for (i, item) in items.iter().enumerate() {
                let _ = write!(out, "i:{i};");
                write_structured(out, item);
            }
            out.push('}');
        }
        Value::Object(map) => {
            let _ = write!(out, "a:{}:{{", map.len());
            for (k, v) in map.iter() {
                match k.parse::<i64>() {
                    Ok(i) if i.to_string() == k => {
                        let _ = write!(out, "i:{i};");
                    }
                    _ => write_str(out, k),
                }
                write_structured(out, v);
            }
            out.push('}');
        }
    }
}

/// Decode structured text. `None` when the input is not well formed.
pub fn from_structured(text: &str) -> Option<Value> {
    let mut parser = Parser {
        input: text.as_bytes(),
        pos: 0,
    };
    let value = parser.value()?;
    (parser.pos == parser.input.len()).then_some(value)
}

/// Decode JSON text into a [`Value`].
pub fn from_json(text: &str) -> Option<Value> {
    serde_json::from_str::<serde_json::Value>(text).ok().map(Value::from)
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn expect(&mut self, byte: u8) -> Option<()> {
        (self.input.get(self.pos) == Some(&byte)).then(|| self.pos += 1)
    }

    fn until(&mut self, stop: u8) -> Option<&'a str> {
        let start = self.pos;
        let len = self.input[start..].iter().position(|b| *b == stop)?;
        self.pos = start + len + 1;
        std::str::from_utf8(&self.input[start..start + len]).ok()
    }

    fn string_body(&mut self) -> Option<String> {
        let len: usize = self.until(b':')?.parse().ok()?;
        self.expect(b'"')?;
        let end = self.pos.checked_add(len)?;
        let bytes = self.input.get(self.pos..end)?;
        let s = std::str::from_utf8(bytes).ok()?.to_string();
        self.pos = end;
        self.expect(b'"')?;
        self.expect(b';')?;
        Some(s)
    }

    fn value(&mut self) -> Option<Value> {
        let tag = *self.input.get(self.pos)?;
        self.pos += 1;
        if tag == b'N' {
            self.expect(b';')?;
            return Some(Value::Null);
        }
        self.expect(b':')?;
        match tag {
            b'b' => match self.until(b';')? {
                "0" => Some(Value::Bool(false)),
                "1" => Some(Value::Bool(true)),
                _ => None,
            },
            b'i' => self.until(b';')?.parse().ok().map(Value::Int),
            b'd' => self.until(b';')?.parse().ok().map(Value::Float),
            b's' => self.string_body().map(Value::String),
            b'a' => self.array(),
            _ => None,
        }
    }

    fn array(&mut self) -> Option<Value> {
        let count: usize = self.until(b':')?.parse().ok()?;
        self.expect(b'{')?;
        let mut entries: Vec<(Value, Value)> = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            let key = self.value()?;
            if !matches!(key, Value::Int(_) | Value::String(_)) {
                return None;
            }
            let value = self.value()?;
            entries.push((key, value));
        }
        self.expect(b'}')?;

        let sequential = entries
            .iter()
            .enumerate()
            .all(|(i, (k, _))| k.as_int() == Some(i as i64));
        if sequential {
            Some(Value::Array(entries.into_iter().map(|(_, v)| v).collect()))
        } else {
            Some(Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.to_text(), v))
                    .collect::<Map>(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_list() {
        let v = Value::Array(vec![Value::from("red"), Value::Float(0.5), Value::Null]);
        assert_eq!(to_structured(&v), "a:3:{i:0;s:3:\"red\";i:1;d:0.5;i:2;N;}");
    }

    #[test]
    fn test_structured_map_with_numeric_key() {
        let v = Value::Object(Map::new().with("name", "ü").with("7", true));
        assert_eq!(to_structured(&v), "a:2:{s:4:\"name\";s:2:\"ü\";i:7;b:1;}");
    }

    #[test]
    fn test_structured_decode() {
        let v = from_structured("a:2:{s:4:\"name\";s:2:\"ü\";i:7;b:1;}").unwrap();
        let map = v.as_object().unwrap();
        assert_eq!(map.get("name"), Some(&Value::from("ü")));
        assert_eq!(map.get("7"), Some(&Value::Bool(true)));

        let list = from_structured("a:2:{i:0;i:5;i:1;a:0:{}}").unwrap();
        assert_eq!(list, Value::Array(vec![Value::Int(5), Value::Array(vec![])]));
    }

    #[test]
    fn test_structured_decode_rejects_garbage() {
        assert_eq!(from_structured("a:2:{i:0;i:5;}"), None);
        assert_eq!(from_structured("s:10:\"short\";"), None);
        assert_eq!(from_structured("plain text"), None);
        assert_eq!(from_structured("i:1;trailing"), None);
    }

    #[test]
    fn test_json_marker() {
        assert!(wants_json("tags [JSON]"));
        assert!(wants_json("tags[JSON]"));
        assert!(!wants_json("tags"));
        assert_eq!(strip_json_marker("tags [JSON]"), "tags");
        assert_eq!(strip_json_marker("tags"), "tags");
        let v = Value::Array(vec![Value::Int(1), Value::from("a")]);
        assert_eq!(encode_container("tags [JSON]", &v), "[1,\"a\"]");
        assert_eq!(encode_container("tags", &v), "a:2:{i:0;i:1;i:1;s:1:\"a\";}");
    }
}
