//! Single-flight link to a host
//!
//! A [`Link`] owns one transport behind an async mutex: a second caller
//! waits until the first caller's response has been fully read. Requests
//! and responses therefore pair up strictly in order.
//!
//! If a caller is cancelled between sending and receiving, the pending
//! response would be read by the next caller. The link detects this and
//! refuses further round trips instead.

use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use quarry_engine::ConnectOptions;
use quarry_executor::{Command, Error, Output, Request, Response, Result};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, warn};

use crate::transport::{Shutdown, Transport};

struct Guarded {
    transport: Box<dyn Transport>,
    in_flight: bool,
    closed: bool,
}

/// Guarded transport half owned by a connection.
pub struct Link {
    inner: AsyncMutex<Guarded>,
    last_used_at: Mutex<DateTime<Utc>>,
}

impl Link {
    /// Wrap a freshly spawned transport.
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self {
            inner: AsyncMutex::new(Guarded {
                transport,
                in_flight: false,
                closed: false,
            }),
            last_used_at: Mutex::new(Utc::now()),
        }
    }

    /// Send the configuration and wait for `Ready`.
    pub async fn configure(&self, options: ConnectOptions) -> Result<()> {
        match self.exchange(Request::Configure(options)).await? {
            Response::Ready => Ok(()),
            Response::Failure(failure) => Err(failure.into()),
            Response::Success(output) => Err(Error::internal(format!(
                "host answered configuration with {}",
                output.variant()
            ))),
        }
    }

    /// Run one command on the host.
    pub async fn call(&self, cmd: Command) -> Result<Output> {
        let name = cmd.name();
        debug!(target: "quarry::proxy", command = name, "Sending command");
        match self.exchange(Request::Call(cmd)).await? {
            Response::Success(output) => Ok(output),
            Response::Failure(failure) => Err(failure.into()),
            Response::Ready => Err(Error::internal(format!("host answered {name} with Ready"))),
        }
    }

    async fn exchange(&self, request: Request) -> Result<Response> {
        let mut guard = self.inner.lock().await;

        if guard.closed {
            return Err(Error::transport("connection is closed"));
        }
        if guard.in_flight {
            return Err(Error::transport(
                "a previous call was cancelled mid-flight; the link is out of sync",
            ));
        }
        if !guard.transport.is_alive() {
            return Err(Error::transport("host unexpectedly exited"));
        }

        guard.in_flight = true;
        let response = guard.transport.round_trip(request).await;
        guard.in_flight = false;

        *self.last_used_at.lock() = Utc::now();
        response
    }

    /// Close the host's input and wait up to `timeout`. Idempotent.
    pub async fn shutdown(&self, timeout: Duration) -> Result<Shutdown> {
        let mut guard = self.inner.lock().await;
        if guard.closed {
            return Ok(Shutdown::AlreadyExited);
        }
        guard.closed = true;
        let outcome = guard.transport.shutdown(timeout).await;
        if let Err(e) = &outcome {
            warn!(target: "quarry::proxy", error = %e, "Host shutdown failed");
        }
        outcome
    }

    /// Whether the host can still take commands. Does not wait for an
    /// in-flight call; a busy link counts as alive.
    pub fn is_alive(&self) -> bool {
        match self.inner.try_lock() {
            Ok(mut guard) => !guard.closed && !guard.in_flight && guard.transport.is_alive(),
            Err(_) => true,
        }
    }

    /// When the last round trip completed.
    pub fn last_used_at(&self) -> DateTime<Utc> {
        *self.last_used_at.lock()
    }
}
