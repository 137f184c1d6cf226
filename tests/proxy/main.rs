//! Proxy Integration Tests
//!
//! End-to-end tests through the public `quarry` facade:
//! - connect / query / close over the thread transport
//! - file-backed databases and `quarry.toml` configuration
//! - transactions across the proxy boundary
//! - several connections and the registry

mod common;

mod configuration;
mod end_to_end;
mod isolation;
mod transactions;
