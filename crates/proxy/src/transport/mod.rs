//! Transports between a connection and its execution host
//!
//! | Transport | Host runs in | Frames travel over |
//! |-----------|--------------|--------------------|
//! | [`ThreadTransport`] | dedicated OS thread | in-process channels |
//! | [`ProcessTransport`] | `quarry-worker` child process | stdin / stdout |
//!
//! Both carry the same length-prefixed MessagePack frames, so a message that
//! works over one works over the other.

mod process;
mod thread;

pub use process::{resolve_worker, ProcessTransport, WORKER_BINARY};
pub use thread::ThreadTransport;

use std::time::Duration;

use async_trait::async_trait;
use quarry_engine::{ConnectOptions, Isolation};
use quarry_executor::{Request, Response, Result};

/// How a host shutdown ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
    /// The host drained its input and exited
    Graceful,
    /// The host overran the timeout and was killed or detached
    Forced,
    /// The host was already gone
    AlreadyExited,
}

/// One request/response exchange with a host.
///
/// Implementations are not required to guard against concurrent use; the
/// [`Link`](crate::Link) owning a transport serializes access.
#[async_trait]
pub trait Transport: Send {
    /// Send one request and wait for its response.
    async fn round_trip(&mut self, request: Request) -> Result<Response>;

    /// Close the host's input and wait up to `timeout` for it to exit.
    async fn shutdown(&mut self, timeout: Duration) -> Result<Shutdown>;

    /// Whether the host is still running.
    fn is_alive(&mut self) -> bool;
}

/// Start a host for `options` on the transport its isolation asks for.
pub fn spawn(options: &ConnectOptions) -> Result<Box<dyn Transport>> {
    match &options.isolation {
        Isolation::Thread => Ok(Box::new(ThreadTransport::spawn()?)),
        Isolation::Process { worker } => {
            let path = resolve_worker(worker.as_deref())?;
            Ok(Box::new(ProcessTransport::spawn(&path)?))
        }
    }
}
