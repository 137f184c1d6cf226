//! Readable statement text for logs and dry runs.
//!
//! Identifiers are requoted for the dialect (MySQL backticks, MSSQL
//! brackets) and every `:name` placeholder is replaced by a literal. The
//! result is for humans only; it is never sent to an engine.

use quarry_core::{Dialect, ScalarKind, Value};

use crate::compiler::{Compiled, Compiler};

impl Compiler {
    /// Quote a string literal for the dialect.
    pub fn quote(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len() + 2);
        out.push('\'');
        for c in text.chars() {
            match (self.dialect(), c) {
                (Dialect::MySql, '\'' | '"' | '\\') => {
                    out.push('\\');
                    out.push(c);
                }
                (_, '\'') => out.push_str("''"),
                _ => out.push(c),
            }
        }
        out.push('\'');
        out
    }

    /// Substitute bindings into the statement text.
    pub fn interpolate(&self, compiled: &Compiled) -> String {
        let chars: Vec<char> = compiled.sql.chars().collect();
        let mut out = String::with_capacity(compiled.sql.len() + 16);
        let mut i = 0;

        while i < chars.len() {
            match chars[i] {
                '\'' => {
                    let start = i;
                    i += 1;
                    while i < chars.len() {
                        if chars[i] == '\'' {
                            if chars.get(i + 1) == Some(&'\'') {
                                i += 2;
                                continue;
                            }
                            break;
                        }
                        i += 1;
                    }
                    let end = (i + 1).min(chars.len());
                    out.extend(&chars[start..end]);
                    i = end;
                }
                '"' => {
                    let close = chars[i + 1..].iter().position(|c| *c == '"').map(|p| i + 1 + p);
                    match close {
                        Some(close) if is_identifier(&chars[i + 1..close]) => {
                            let name: String = chars[i + 1..close].iter().collect();
                            out.push_str(&self.requote(&name));
                            i = close + 1;
                        }
                        _ => {
                            out.push('"');
                            i += 1;
                        }
                    }
                }
                ':' if chars.get(i + 1).map_or(false, |c| is_name_char(*c)) => {
                    let mut end = i + 1;
                    while end < chars.len() && is_name_char(chars[end]) {
                        end += 1;
                    }
                    let key: String = chars[i..end].iter().collect();
                    match compiled.params.get(&key) {
                        Some(param) => out.push_str(&self.literal(&param.value, param.kind)),
                        None => out.push_str(&key),
                    }
                    i = end;
                }
                c => {
                    out.push(c);
                    i += 1;
                }
            }
        }

        out
    }

    fn requote(&self, name: &str) -> String {
        match self.dialect() {
            Dialect::MySql => format!("`{name}`"),
            Dialect::MsSql => format!("[{name}]"),
            _ => format!("\"{name}\""),
        }
    }

    fn literal(&self, value: &Value, kind: ScalarKind) -> String {
        match kind {
            ScalarKind::Null => "NULL".to_string(),
            ScalarKind::Blob => "{LOB_DATA}".to_string(),
            ScalarKind::String => self.quote(&value.to_text()),
            ScalarKind::Bool => if value.is_truthy() { "1" } else { "0" }.to_string(),
            ScalarKind::Int | ScalarKind::Float => value.to_text(),
        }
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_identifier(chars: &[char]) -> bool {
    match chars.split_first() {
        Some((first, rest)) => {
            (first.is_alphabetic() || *first == '_')
                && rest
                    .iter()
                    .all(|c| c.is_alphanumeric() || matches!(c, '@' | '$' | '#' | '-' | '_'))
        }
        None => false,
    }
}
