//! Host on a dedicated OS thread.

use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::Duration;

use async_trait::async_trait;
use quarry_executor::wire::{decode, encode};
use quarry_executor::{serve, Error, HostChannel, Request, Response, Result};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

use super::{Shutdown, Transport};

/// Host side of the thread transport. Dropping the request sender is the
/// end of input.
struct ThreadChannel {
    requests: mpsc::Receiver<Vec<u8>>,
    responses: UnboundedSender<Vec<u8>>,
}

impl HostChannel for ThreadChannel {
    fn recv(&mut self) -> Result<Option<Request>> {
        match self.requests.recv() {
            Ok(frame) => decode(&frame).map(Some),
            Err(mpsc::RecvError) => Ok(None),
        }
    }

    fn send(&mut self, response: &Response) -> Result<()> {
        let frame = encode(response)?;
        self.responses
            .send(frame)
            .map_err(|_| Error::transport("connection dropped its response channel"))
    }
}

/// Execution host running on its own OS thread.
pub struct ThreadTransport {
    requests: Option<mpsc::Sender<Vec<u8>>>,
    responses: UnboundedReceiver<Vec<u8>>,
    handle: Option<JoinHandle<Result<()>>>,
}

impl ThreadTransport {
    /// Start a host thread. The host waits for `Request::Configure`.
    pub fn spawn() -> Result<Self> {
        let (request_tx, request_rx) = mpsc::channel();
        let (response_tx, response_rx) = unbounded_channel();

        let handle = std::thread::Builder::new()
            .name("quarry-host".to_string())
            .spawn(move || {
                let mut channel = ThreadChannel {
                    requests: request_rx,
                    responses: response_tx,
                };
                serve(&mut channel)
            })
            .map_err(|e| Error::transport(format!("failed to spawn host thread: {e}")))?;

        debug!(target: "quarry::proxy", "Spawned host thread");
        Ok(Self {
            requests: Some(request_tx),
            responses: response_rx,
            handle: Some(handle),
        })
    }
}

#[async_trait]
impl Transport for ThreadTransport {
    async fn round_trip(&mut self, request: Request) -> Result<Response> {
        let frame = encode(&request)?;
        {
            let sender = self
                .requests
                .as_ref()
                .ok_or_else(|| Error::transport("host input already closed"))?;
            sender
                .send(frame)
                .map_err(|_| Error::transport("host thread unexpectedly exited"))?;
        }

        match self.responses.recv().await {
            Some(frame) => decode(&frame),
            None => Err(Error::transport("host thread unexpectedly exited")),
        }
    }

    async fn shutdown(&mut self, timeout: Duration) -> Result<Shutdown> {
        self.requests = None;
        let Some(handle) = self.handle.take() else {
            return Ok(Shutdown::AlreadyExited);
        };
        if handle.is_finished() {
            log_exit(handle.join());
            return Ok(Shutdown::AlreadyExited);
        }

        let join = tokio::task::spawn_blocking(move || handle.join());
        match tokio::time::timeout(timeout, join).await {
            Ok(Ok(exit)) => {
                log_exit(exit);
                Ok(Shutdown::Graceful)
            }
            Ok(Err(e)) => Err(Error::internal(format!("host join task failed: {e}"))),
            Err(_) => {
                // The blocking join keeps running; the thread is left to finish alone.
                warn!(target: "quarry::proxy", ?timeout, "Host thread did not stop in time; detaching");
                Ok(Shutdown::Forced)
            }
        }
    }

    fn is_alive(&mut self) -> bool {
        self.requests.is_some()
            && self
                .handle
                .as_ref()
                .map(|h| !h.is_finished())
                .unwrap_or(false)
    }
}

fn log_exit(exit: std::thread::Result<Result<()>>) {
    match exit {
        Ok(Ok(())) => debug!(target: "quarry::proxy", "Host thread exited"),
        Ok(Err(e)) => warn!(target: "quarry::proxy", error = %e, "Host thread exited with error"),
        Err(_) => warn!(target: "quarry::proxy", "Host thread panicked"),
    }
}
