//! Connection options via `quarry.toml`
//!
//! Options are fixed at construction: a [`Database`](crate::Database) and the
//! host that owns it never change mode mid-flight. They can be assembled with
//! chained setters or loaded from a TOML file.
//!
//! ```toml
//! engine = "sqlite"
//! database = "/var/lib/app/app.db"
//! prefix = "app_"
//! logging = false
//! dry_run = false
//! debug_log = false
//! commands = ["PRAGMA foreign_keys = ON"]
//! close_timeout_ms = 10000
//!
//! [isolation]
//! mode = "process"
//! worker = "/usr/local/bin/quarry-worker"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use quarry_core::{Dialect, QuarryError, QuarryResult};
use serde::{Deserialize, Serialize};

/// Config file name looked up by callers that keep options on disk.
pub const CONFIG_FILE_NAME: &str = "quarry.toml";

/// In-memory SQLite target.
pub const MEMORY_DATABASE: &str = ":memory:";

/// Default bound on a graceful host shutdown.
pub const DEFAULT_CLOSE_TIMEOUT_MS: u64 = 10_000;

/// Where the execution host runs.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum Isolation {
    /// Dedicated OS thread in the caller's process
    #[default]
    Thread,
    /// Separate `quarry-worker` process
    Process {
        /// Worker binary; looked up next to the current executable when unset
        #[serde(default, skip_serializing_if = "Option::is_none")]
        worker: Option<PathBuf>,
    },
}

/// Everything needed to open one engine session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectOptions {
    /// Engine family; `mariadb`, `postgres`, `postgresql` and `sqlsrv` are accepted aliases
    #[serde(default)]
    pub engine: Dialect,
    /// Database name, or file path for SQLite
    #[serde(default = "default_database")]
    pub database: String,
    /// Server host
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Server port
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Login user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Login password
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Connection character set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charset: Option<String>,
    /// Connection collation (MySQL)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collation: Option<String>,
    /// Prefix applied to every table name
    #[serde(default)]
    pub prefix: String,
    /// Keep every executed statement instead of only the last one
    #[serde(default)]
    pub logging: bool,
    /// Compile only; record the readable statement instead of executing it
    #[serde(default)]
    pub dry_run: bool,
    /// Collect the readable text of every statement instead of executing it
    #[serde(default)]
    pub debug_log: bool,
    /// Statements run right after the session opens
    #[serde(default)]
    pub commands: Vec<String>,
    /// Graceful shutdown bound in milliseconds
    #[serde(default = "default_close_timeout_ms")]
    pub close_timeout_ms: u64,
    /// Where the host runs
    #[serde(default)]
    pub isolation: Isolation,
}

fn default_database() -> String {
    MEMORY_DATABASE.to_string()
}

fn default_close_timeout_ms() -> u64 {
    DEFAULT_CLOSE_TIMEOUT_MS
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self::new(Dialect::Sqlite)
    }
}

impl ConnectOptions {
    /// Options for `engine` with every other field defaulted.
    pub fn new(engine: Dialect) -> Self {
        Self {
            engine,
            database: default_database(),
            host: None,
            port: None,
            username: None,
            password: None,
            charset: None,
            collation: None,
            prefix: String::new(),
            logging: false,
            dry_run: false,
            debug_log: false,
            commands: Vec::new(),
            close_timeout_ms: DEFAULT_CLOSE_TIMEOUT_MS,
            isolation: Isolation::Thread,
        }
    }

    /// SQLite database at `path` (`:memory:` for a private in-memory one).
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self::new(Dialect::Sqlite).database(path)
    }

    /// Set the database name or file.
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Set the server host and optional port.
    pub fn host(mut self, host: impl Into<String>, port: Option<u16>) -> Self {
        self.host = Some(host.into());
        self.port = port;
        self
    }

    /// Set login credentials.
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Set the character set and optional collation.
    pub fn charset(mut self, charset: impl Into<String>, collation: Option<String>) -> Self {
        self.charset = Some(charset.into());
        self.collation = collation;
        self
    }

    /// Set the table prefix.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Keep every executed statement in the log.
    pub fn logging(mut self, logging: bool) -> Self {
        self.logging = logging;
        self
    }

    /// Compile without executing.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Collect statements for [`Database::debug_log`](crate::Database::debug_log)
    /// instead of executing them.
    pub fn debug_log(mut self, debug_log: bool) -> Self {
        self.debug_log = debug_log;
        self
    }

    /// Append an init command.
    pub fn command(mut self, command: impl Into<String>) -> Self {
        self.commands.push(command.into());
        self
    }

    /// Choose where the host runs.
    pub fn isolation(mut self, isolation: Isolation) -> Self {
        self.isolation = isolation;
        self
    }

    /// Bound the graceful shutdown.
    pub fn close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout_ms = timeout.as_millis().min(u64::MAX as u128) as u64;
        self
    }

    /// Graceful shutdown bound.
    pub fn close_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.close_timeout_ms)
    }

    /// Statements to run once the session is open: dialect normalization,
    /// then the character set, then user commands.
    pub fn init_commands(&self) -> Vec<String> {
        let mut commands = Vec::new();

        match self.engine {
            Dialect::MySql => commands.push("SET SQL_MODE=ANSI_QUOTES".to_string()),
            Dialect::MsSql => {
                commands.push("SET QUOTED_IDENTIFIER ON".to_string());
                commands.push("SET ANSI_NULLS ON".to_string());
            }
            _ => {}
        }

        if let Some(charset) = &self.charset {
            if matches!(
                self.engine,
                Dialect::MySql | Dialect::PgSql | Dialect::Sybase | Dialect::MsSql
            ) {
                let collate = match (&self.engine, &self.collation) {
                    (Dialect::MySql, Some(collation)) => format!(" COLLATE '{collation}'"),
                    _ => String::new(),
                };
                commands.push(format!("SET NAMES '{charset}'{collate}"));
            }
        }

        commands.extend(self.commands.iter().cloned());
        commands
    }

    /// Data source name in the conventional `driver:key=value;…` form.
    pub fn dsn(&self) -> String {
        let mut attrs = Vec::new();
        let driver = match self.engine {
            Dialect::Sqlite => return format!("sqlite:{}", self.database),
            Dialect::MySql => "mysql",
            Dialect::PgSql => "pgsql",
            Dialect::Sybase => "dblib",
            Dialect::Oracle => "oci",
            Dialect::MsSql => "sqlsrv",
        };
        if let Some(host) = &self.host {
            attrs.push(format!("host={host}"));
        }
        if let Some(port) = self.port {
            attrs.push(format!("port={port}"));
        }
        attrs.push(format!("dbname={}", self.database));
        format!("{driver}:{}", attrs.join(";"))
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Quarry connection configuration
#
# Engine: "sqlite" (default), "mysql", "pgsql", "mssql", "oracle" or "sybase"
engine = "sqlite"

# Database name, or file path for SQLite (":memory:" for a private database)
database = ":memory:"

# Prefix applied to every table name
prefix = ""

# Keep every executed statement (default keeps only the last one)
logging = false

# Compile statements without executing them
dry_run = false

# Collect every statement as readable SQL instead of executing it
debug_log = false

# Statements run right after the session opens
commands = []

# Graceful shutdown bound for the execution host
close_timeout_ms = 10000

# Where the execution host runs: "thread" or "process"
[isolation]
mode = "thread"
"#
    }

    /// Read and parse options from a file path.
    pub fn from_file(path: &Path) -> QuarryResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            QuarryError::validation(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml(&content).map_err(|e| {
            QuarryError::validation(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e.message()
            ))
        })
    }

    /// Parse options from TOML text.
    pub fn from_toml(content: &str) -> QuarryResult<Self> {
        toml::from_str(content).map_err(|e| QuarryError::validation(e.to_string()))
    }

    /// Write the default config file if it does not already exist.
    pub fn write_default_if_missing(path: &Path) -> QuarryResult<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                QuarryError::validation(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize these options to TOML and write them to the given path.
    pub fn write_to_file(&self, path: &Path) -> QuarryResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| QuarryError::validation(format!("Failed to serialize options: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            QuarryError::validation(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}
