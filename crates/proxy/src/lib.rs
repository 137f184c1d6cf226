//! Asynchronous, fault-isolated connection proxy
//!
//! The proxy keeps the database engine out of the caller's process space.
//! Every [`Connection`] owns an execution host running either on a
//! dedicated thread or in a `quarry-worker` child process; commands travel
//! to it as length-prefixed MessagePack frames and come back as outputs or
//! typed failures.
//!
//! ```ignore
//! let conn = Connection::connect(ConnectOptions::sqlite(":memory:")).await?;
//! conn.create("account", columns, None).await?;
//! conn.insert("account", row).await?;
//! let total = conn.sum(Query::table("account").columns("balance")).await?;
//! conn.close().await?;
//! ```
//!
//! A host crash, hang or protocol error surfaces as a transport or timeout
//! error on the connection; it never brings down the caller.

#![warn(clippy::all)]

mod connection;
mod link;
mod registry;
pub mod transport;

#[cfg(test)]
mod tests;

pub use connection::{Connection, ConnectionState};
pub use link::Link;
pub use registry::Registry;
pub use transport::{spawn, ProcessTransport, Shutdown, ThreadTransport, Transport};
