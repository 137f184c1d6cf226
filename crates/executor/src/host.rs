//! Execution host loop
//!
//! A host owns exactly one [`Database`] for its whole life. It is reachable
//! only through a [`HostChannel`]:
//!
//! 1. receive `Request::Configure`, open the database, reply `Ready` (or
//!    `Failure` and stop)
//! 2. loop: receive `Request::Call`, run it through a [`Session`], reply
//!    `Success` or `Failure`
//! 3. stop cleanly when the channel reports end of input
//!
//! Every error and every panic raised while serving a call becomes a
//! `Failure`, and so does a response too large to frame; the loop itself
//! only ends on channel errors.

use std::io::{Read, Write};
use std::panic::{catch_unwind, AssertUnwindSafe};

use quarry_engine::Database;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::wire::{decode, encode, read_frame, write_frame};
use crate::{Error, Failure, Request, Response, Result, Session};

/// Message channel between a host and its connection.
pub trait HostChannel {
    /// Next request; `Ok(None)` at end of input.
    fn recv(&mut self) -> Result<Option<Request>>;

    /// Send one response.
    fn send(&mut self, response: &Response) -> Result<()>;
}

/// Length-prefixed MessagePack frames over a byte stream pair, such as a
/// worker's stdin and stdout.
pub struct FrameChannel<R, W> {
    reader: R,
    writer: W,
}

impl<R: Read, W: Write> FrameChannel<R, W> {
    /// Wrap a reader and a writer.
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Split back into the underlying streams.
    pub fn into_inner(self) -> (R, W) {
        (self.reader, self.writer)
    }
}

impl<R: Read, W: Write> HostChannel for FrameChannel<R, W> {
    fn recv(&mut self) -> Result<Option<Request>> {
        match read_frame(&mut self.reader)? {
            Some(payload) => decode(&payload).map(Some),
            None => Ok(None),
        }
    }

    fn send(&mut self, response: &Response) -> Result<()> {
        let payload = encode(response)?;
        write_frame(&mut self.writer, &payload)
    }
}

/// Serve one connection until end of input.
///
/// Returns `Err` when configuration fails or the channel breaks; a clean end
/// of input, before or after configuration, returns `Ok(())`.
pub fn serve<C: HostChannel>(channel: &mut C) -> Result<()> {
    let host_id = Uuid::new_v4();
    info!(target: "quarry::host", %host_id, "Host started");

    let options = match channel.recv() {
        Ok(Some(Request::Configure(options))) => options,
        Ok(Some(Request::Call(cmd))) => {
            let err = Error::internal(format!(
                "received {} before configuration",
                cmd.name()
            ));
            reply_failure(channel, err.clone(), host_id, "configure");
            return Err(err);
        }
        Ok(None) => {
            info!(target: "quarry::host", %host_id, "Input closed before configuration");
            return Ok(());
        }
        Err(e) => {
            reply_failure(channel, e.clone(), host_id, "configure");
            return Err(e);
        }
    };

    let opened = catch_unwind(AssertUnwindSafe(|| Database::open(options)));
    let db = match opened {
        Ok(Ok(db)) => db,
        Ok(Err(e)) => {
            let err = Error::from(e);
            warn!(target: "quarry::host", %host_id, error = %err, "Configuration failed");
            reply_failure(channel, err.clone(), host_id, "configure");
            return Err(err);
        }
        Err(payload) => {
            let failure = Failure::from_panic(payload, Some(site(host_id, "configure")));
            let err = Error::from(failure.clone());
            if let Err(e) = channel.send(&Response::Failure(failure)) {
                warn!(target: "quarry::host", %host_id, error = %e, "Could not report configuration panic");
            }
            return Err(err);
        }
    };
    channel.send(&Response::Ready)?;
    info!(target: "quarry::host", %host_id, "Host ready");

    let mut session = Session::new(db);
    loop {
        let cmd = match channel.recv() {
            Ok(Some(Request::Call(cmd))) => cmd,
            Ok(Some(Request::Configure(_))) => {
                reply_failure(
                    channel,
                    Error::internal("host is already configured"),
                    host_id,
                    "configure",
                );
                continue;
            }
            Ok(None) => break,
            Err(e) => {
                warn!(target: "quarry::host", %host_id, error = %e, "Channel failed");
                reply_failure(channel, e.clone(), host_id, "recv");
                return Err(e);
            }
        };

        let name = cmd.name();
        let response = match catch_unwind(AssertUnwindSafe(|| session.execute(cmd))) {
            Ok(Ok(output)) => Response::Success(output),
            Ok(Err(e)) => {
                debug!(target: "quarry::host", %host_id, command = name, error = %e, "Command failed");
                Response::Failure(Failure::from_error(e, Some(site(host_id, name))))
            }
            Err(payload) => {
                warn!(target: "quarry::host", %host_id, command = name, "Command panicked");
                Response::Failure(Failure::from_panic(payload, Some(site(host_id, name))))
            }
        };
        deliver(channel, &response, host_id, name)?;
    }

    info!(target: "quarry::host", %host_id, "Input closed; host stopping");
    Ok(())
}

fn site(host_id: Uuid, what: &str) -> String {
    format!("{host_id}/{what}")
}

/// Send `response`. One that cannot be sent (unencodable, over the frame
/// limit) is replaced by a transport failure for the same command; only a
/// failure to send that ends the loop.
fn deliver<C: HostChannel>(channel: &mut C, response: &Response, host_id: Uuid, what: &str) -> Result<()> {
    let Err(e) = channel.send(response) else {
        return Ok(());
    };
    warn!(target: "quarry::host", %host_id, command = what, error = %e, "Response could not be sent");
    let failure = Failure::from_error(
        Error::transport(format!("{what} response could not be sent: {}", e.reason())),
        Some(site(host_id, what)),
    );
    channel.send(&Response::Failure(failure))
}

fn reply_failure<C: HostChannel>(channel: &mut C, err: Error, host_id: Uuid, what: &str) {
    let failure = Failure::from_error(err, Some(site(host_id, what)));
    if let Err(e) = channel.send(&Response::Failure(failure)) {
        warn!(target: "quarry::host", %host_id, error = %e, "Could not report failure");
    }
}
