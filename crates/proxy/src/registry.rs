//! Connection registry
//!
//! Shares one connection per distinct set of options. Options are keyed by
//! the xxh3 fingerprint of their wire encoding, so two option values that
//! would configure a host identically map to the same connection.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use quarry_engine::ConnectOptions;
use quarry_executor::{wire, Result};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use xxhash_rust::xxh3::xxh3_64;

use crate::connection::Connection;

/// Reuses live connections by option fingerprint.
pub struct Registry {
    pub(crate) connections: Mutex<HashMap<u64, Connection>>,
    idle_timeout: Option<Duration>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Registry without idle eviction.
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(HashMap::new()),
            idle_timeout: None,
        }
    }

    /// Connections unused for longer than `idle` are closed by
    /// [`evict_idle`](Self::evict_idle).
    pub fn with_idle_timeout(idle: Duration) -> Self {
        Self {
            connections: Mutex::new(HashMap::new()),
            idle_timeout: Some(idle),
        }
    }

    /// Fingerprint of `options`.
    pub fn fingerprint(options: &ConnectOptions) -> Result<u64> {
        Ok(xxh3_64(&wire::encode(options)?))
    }

    /// The live connection for `options`, connecting a new one when none
    /// exists or the previous one died.
    pub async fn get_or_connect(&self, options: ConnectOptions) -> Result<Connection> {
        let key = Self::fingerprint(&options)?;
        let mut connections = self.connections.lock().await;

        if let Some(existing) = connections.get(&key) {
            if existing.is_alive() {
                debug!(target: "quarry::proxy", fingerprint = key, "Reusing connection");
                return Ok(existing.clone());
            }
            let dead = existing.clone();
            connections.remove(&key);
            if let Err(e) = dead.close().await {
                warn!(target: "quarry::proxy", fingerprint = key, error = %e, "Closing dead connection failed");
            }
            info!(target: "quarry::proxy", fingerprint = key, "Replacing dead connection");
        }

        let conn = Connection::connect(options).await?;
        connections.insert(key, conn.clone());
        Ok(conn)
    }

    /// Close connections idle past the timeout. Returns how many were
    /// evicted; a connection whose close fails is still dropped.
    pub async fn evict_idle(&self) -> Result<usize> {
        let Some(idle) = self.idle_timeout else {
            return Ok(0);
        };
        let idle = chrono::Duration::from_std(idle).unwrap_or_else(|_| chrono::Duration::weeks(5200));
        let now = Utc::now();

        let mut connections = self.connections.lock().await;
        let stale: Vec<u64> = connections
            .iter()
            .filter(|(_, conn)| {
                conn.last_used_at()
                    .map(|at| now.signed_duration_since(at) > idle)
                    .unwrap_or(true)
            })
            .map(|(key, _)| *key)
            .collect();

        for key in &stale {
            if let Some(conn) = connections.remove(key) {
                if let Err(e) = conn.close().await {
                    warn!(target: "quarry::proxy", fingerprint = *key, error = %e, "Closing idle connection failed");
                }
            }
        }
        if !stale.is_empty() {
            info!(target: "quarry::proxy", evicted = stale.len(), "Evicted idle connections");
        }
        Ok(stale.len())
    }

    /// Close every connection. Keeps closing past a failure and returns
    /// the first error.
    pub async fn close_all(&self) -> Result<()> {
        let drained: Vec<Connection> = self.connections.lock().await.drain().map(|(_, c)| c).collect();
        let mut first = None;
        for conn in drained {
            if let Err(e) = conn.close().await {
                warn!(target: "quarry::proxy", error = %e, "Closing connection failed");
                first.get_or_insert(e);
            }
        }
        match first {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Number of registered connections.
    pub async fn len(&self) -> usize {
        self.connections.lock().await.len()
    }

    /// Whether no connection is registered.
    pub async fn is_empty(&self) -> bool {
        self.connections.lock().await.is_empty()
    }
}
