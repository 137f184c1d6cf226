//! SQL dialects the compiler can target.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::QuarryError;

/// Target engine family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// MySQL and MariaDB
    #[serde(alias = "mariadb")]
    MySql,
    /// PostgreSQL
    #[serde(alias = "postgres", alias = "postgresql")]
    PgSql,
    /// SQLite
    #[default]
    Sqlite,
    /// Microsoft SQL Server
    #[serde(alias = "sqlsrv")]
    MsSql,
    /// Oracle
    Oracle,
    /// Sybase
    Sybase,
}

impl Dialect {
    /// Canonical lowercase name.
    pub fn name(&self) -> &'static str {
        match self {
            Dialect::MySql => "mysql",
            Dialect::PgSql => "pgsql",
            Dialect::Sqlite => "sqlite",
            Dialect::MsSql => "mssql",
            Dialect::Oracle => "oracle",
            Dialect::Sybase => "sybase",
        }
    }

    /// Engines that accept `CREATE TABLE IF NOT EXISTS`.
    pub fn supports_if_not_exists(&self) -> bool {
        matches!(self, Dialect::MySql | Dialect::PgSql | Dialect::Sqlite)
    }

    /// Engines paging with `OFFSET … FETCH NEXT` instead of `LIMIT`.
    pub fn uses_fetch_paging(&self) -> bool {
        matches!(self, Dialect::MsSql | Dialect::Oracle)
    }

    /// Random-order function for `rand`.
    pub fn random_function(&self) -> &'static str {
        match self {
            Dialect::MySql => "RAND()",
            Dialect::MsSql => "NEWID()",
            _ => "RANDOM()",
        }
    }
}

impl FromStr for Dialect {
    type Err = QuarryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(Dialect::MySql),
            "pgsql" | "postgres" | "postgresql" => Ok(Dialect::PgSql),
            "sqlite" => Ok(Dialect::Sqlite),
            "mssql" | "sqlsrv" => Ok(Dialect::MsSql),
            "oracle" => Ok(Dialect::Oracle),
            "sybase" => Ok(Dialect::Sybase),
            other => Err(QuarryError::validation(format!(
                "unsupported database type '{other}'"
            ))),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
