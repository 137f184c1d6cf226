//! Raw fragment marker expansion.
//!
//! `<name>` and `<table.column>` markers are rewritten into quoted
//! identifiers. A marker that follows `FROM`, `TABLE`, `INTO`, `UPDATE`,
//! `JOIN` or `TABLE IF EXISTS` is a table reference and gets the prefix;
//! anything else is a column. Markers inside `'…'` or `` `…` `` literals are
//! left untouched. A `<` that does not open a marker (`a < b`) is kept as is.

use once_cell::sync::Lazy;
use quarry_core::{QuarryError, QuarryResult};
use regex::Regex;

use crate::compiler::Compiler;

static TABLE_CONTEXT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[^\p{L}\p{N}_])(?:FROM|TABLE|INTO|UPDATE|JOIN|TABLE IF EXISTS)\s*$")
        .expect("table context pattern")
});

fn is_marker_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_marker_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '@' | '$' | '#' | '-' | '_' | '.')
}

/// Expand every marker in `sql`.
pub(crate) fn expand_markers(compiler: &Compiler, sql: &str) -> QuarryResult<String> {
    let chars: Vec<char> = sql.chars().collect();
    let mut out = String::with_capacity(sql.len() + 8);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\'' || c == '`' {
            out.push(c);
            i += 1;
            while i < chars.len() {
                out.push(chars[i]);
                i += 1;
                if chars[i - 1] == c {
                    break;
                }
            }
            continue;
        }

        if c == '<' && i + 1 < chars.len() && is_marker_start(chars[i + 1]) {
            let mut end = i + 1;
            while end < chars.len() && is_marker_char(chars[end]) {
                end += 1;
            }
            if end < chars.len() && chars[end] == '>' {
                let name: String = chars[i + 1..end].iter().collect();
                let quoted = quote_marker(compiler, &name, &mut out)?;
                out.push_str(&quoted);
                i = end + 1;
                continue;
            }
        }

        out.push(c);
        i += 1;
    }

    Ok(out)
}

fn quote_marker(compiler: &Compiler, name: &str, preceding: &mut String) -> QuarryResult<String> {
    let malformed = || QuarryError::validation(format!("Malformed raw marker <{name}>"));

    if name.split('.').count() > 2 || name.split('.').any(|part| part.is_empty()) {
        return Err(malformed());
    }

    if !name.contains('.') && TABLE_CONTEXT_RE.is_match(preceding) {
        let trimmed = preceding.trim_end().len();
        preceding.truncate(trimmed);
        preceding.push(' ');
        return compiler.quote_table(name).map_err(|_| malformed());
    }

    compiler.quote_column(name).map_err(|_| malformed())
}
