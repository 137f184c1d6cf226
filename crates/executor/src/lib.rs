//! # Quarry Executor
//!
//! The command layer between a connection and its database:
//! - [`Command`]/[`Output`] - the closed instruction set and its results
//! - [`Error`]/[`Failure`] - the closed error set and its wire form
//! - [`Executor`] - stateless dispatch onto a [`Database`](quarry_engine::Database)
//! - [`Session`] - transaction state on top of the executor
//! - [`Request`]/[`Response`] and [`wire`] - the host protocol and framing
//! - [`host::serve`] - the execution host loop
//!
//! ## Round Trip
//!
//! ```text
//! Connection ──Request::Call(Command)──▶ host::serve ─▶ Session ─▶ Executor ─▶ Database
//!            ◀──Response::Success(Output) / Response::Failure(Failure)──
//! ```

#![warn(missing_docs)]

mod command;
mod convert;
mod error;
mod executor;
pub mod host;
mod output;
mod protocol;
mod session;
pub mod wire;

// Test modules
#[cfg(test)]
mod tests;

// =============================================================================
// Public API
// =============================================================================

pub use command::{Command, Property};
pub use error::{Error, ErrorKind};
pub use executor::Executor;
pub use host::{serve, FrameChannel, HostChannel};
pub use output::Output;
pub use protocol::{Failure, Request, Response};
pub use session::Session;

/// Result type for executor operations.
pub type Result<T> = std::result::Result<T, Error>;
