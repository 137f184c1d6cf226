//! Test modules for the proxy crate.

pub mod registry;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use quarry_core::Value;
use quarry_engine::ConnectOptions;
use quarry_executor::{Command, Error, Output, Request, Response, Result};

use crate::transport::{Shutdown, Transport};
use crate::Connection;

/// Connect a thread-hosted in-memory SQLite connection with a seeded
/// `people` table.
pub(crate) async fn create_test_connection() -> Connection {
    let conn = Connection::connect(ConnectOptions::sqlite(":memory:"))
        .await
        .unwrap();
    conn.create(
        "people",
        v(serde_json::json!({
            "id": ["INTEGER", "PRIMARY KEY"],
            "name": "TEXT",
            "age": "INTEGER"
        })),
        None,
    )
    .await
    .unwrap();
    conn.insert(
        "people",
        v(serde_json::json!([
            {"name": "ann", "age": 31},
            {"name": "bob", "age": 17}
        ])),
    )
    .await
    .unwrap();
    conn
}

pub(crate) fn v(json: serde_json::Value) -> Value {
    Value::from(json)
}

/// In-memory transport with scripted answers.
///
/// Answers `Configure` with `Ready`, `Ping` with a pong and every other call
/// with `Output::Bool(true)`. With `hang` set, calls never complete; with
/// `broken_shutdown` set, shutdown fails.
pub(crate) struct ScriptedTransport {
    pub alive: Arc<AtomicBool>,
    pub hang: bool,
    pub broken_shutdown: bool,
}

impl ScriptedTransport {
    pub(crate) fn new() -> (Self, Arc<AtomicBool>) {
        let alive = Arc::new(AtomicBool::new(true));
        (
            Self {
                alive: alive.clone(),
                hang: false,
                broken_shutdown: false,
            },
            alive,
        )
    }

    pub(crate) fn hanging() -> Self {
        Self {
            alive: Arc::new(AtomicBool::new(true)),
            hang: true,
            broken_shutdown: false,
        }
    }

    pub(crate) fn broken_shutdown() -> (Self, Arc<AtomicBool>) {
        let (mut transport, alive) = Self::new();
        transport.broken_shutdown = true;
        (transport, alive)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn round_trip(&mut self, request: Request) -> Result<Response> {
        match request {
            Request::Configure(_) => Ok(Response::Ready),
            Request::Call(_) if self.hang => std::future::pending().await,
            Request::Call(Command::Ping) => Ok(Response::Success(Output::Pong {
                version: "scripted".to_string(),
            })),
            Request::Call(_) => Ok(Response::Success(Output::Bool(true))),
        }
    }

    async fn shutdown(&mut self, _timeout: Duration) -> Result<Shutdown> {
        if self.broken_shutdown {
            return Err(Error::Transport {
                reason: "shutdown pipe broken".to_string(),
            });
        }
        if self.alive.swap(false, Ordering::SeqCst) {
            Ok(Shutdown::Graceful)
        } else {
            Ok(Shutdown::AlreadyExited)
        }
    }

    fn is_alive(&mut self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }
}
