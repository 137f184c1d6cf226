//! Identifier validation and quoting.
//!
//! Tables match `[\p{L}_][\p{L}\p{N}@$#\-_]*` and columns may carry one
//! `table.` qualifier. Quoted identifiers use ANSI double quotes; the table
//! prefix is applied to every table reference, qualified columns included.

use once_cell::sync::Lazy;
use quarry_core::{QuarryError, QuarryResult};
use regex::Regex;

use crate::compiler::Compiler;

/// Character class body shared by every identifier pattern.
pub(crate) const IDENT: &str = r"[\p{L}_][\p{L}\p{N}@$#\-_]*";

static TABLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(&format!("^{IDENT}$")).expect("table pattern"));

static COLUMN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^({IDENT})(?:\.({IDENT}))?$")).expect("column pattern"));

static ALIASED_TABLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^\s*({IDENT})\s*(?:\(({IDENT})\))?\s*$")).expect("aliased table pattern")
});

/// `table` or `table (alias)` split into its parts.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TableRef {
    pub name: String,
    pub alias: Option<String>,
}

impl Compiler {
    /// Quote a table name, prefix included.
    pub fn quote_table(&self, table: &str) -> QuarryResult<String> {
        if TABLE_RE.is_match(table) {
            Ok(format!("\"{}{}\"", self.prefix(), table))
        } else {
            Err(QuarryError::validation(format!("Incorrect table name: {table}")))
        }
    }

    /// Quote a column name; a `table.` qualifier gets the table prefix.
    pub fn quote_column(&self, column: &str) -> QuarryResult<String> {
        let caps = COLUMN_RE
            .captures(column)
            .ok_or_else(|| QuarryError::validation(format!("Incorrect column name: {column}")))?;
        match caps.get(2) {
            Some(col) => Ok(format!("\"{}{}\".\"{}\"", self.prefix(), &caps[1], col.as_str())),
            None => Ok(format!("\"{}\"", &caps[1])),
        }
    }

    /// Invert [`Compiler::quote_table`].
    pub fn unquote_table(&self, quoted: &str) -> Option<String> {
        let inner = quoted.strip_prefix('"')?.strip_suffix('"')?;
        let name = inner.strip_prefix(self.prefix())?;
        TABLE_RE.is_match(name).then(|| name.to_string())
    }

    /// Invert [`Compiler::quote_column`].
    pub fn unquote_column(&self, quoted: &str) -> Option<String> {
        match quoted.split_once("\".\"") {
            Some((table, column)) => {
                let table = self.unquote_table(&format!("{table}\""))?;
                let column = column.strip_suffix('"')?;
                TABLE_RE.is_match(column).then(|| format!("{table}.{column}"))
            }
            None => {
                let inner = quoted.strip_prefix('"')?.strip_suffix('"')?;
                TABLE_RE.is_match(inner).then(|| inner.to_string())
            }
        }
    }

    /// Quote `table` or `table (alias)` for a FROM clause. Returns the quoted
    /// clause text and the quoted name columns should be qualified with.
    pub(crate) fn quote_table_ref(&self, table: &str) -> QuarryResult<(String, String)> {
        let parsed = parse_table_ref(table)?;
        let quoted = self.quote_table(&parsed.name)?;
        match parsed.alias {
            Some(alias) => {
                let alias = self.quote_table(&alias)?;
                Ok((format!("{quoted} AS {alias}"), alias))
            }
            None => Ok((quoted.clone(), quoted)),
        }
    }
}

/// Split `table (alias)`.
pub(crate) fn parse_table_ref(table: &str) -> QuarryResult<TableRef> {
    let caps = ALIASED_TABLE_RE
        .captures(table)
        .ok_or_else(|| QuarryError::validation(format!("Incorrect table name: {table}")))?;
    Ok(TableRef {
        name: caps[1].to_string(),
        alias: caps.get(2).map(|m| m.as_str().to_string()),
    })
}
