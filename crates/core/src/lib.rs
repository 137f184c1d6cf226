//! Core types for Quarry
//!
//! This crate holds the vocabulary every other Quarry crate speaks:
//! - [`Value`]: descriptor trees, bound parameters and result rows
//! - [`Map`]: insertion-ordered objects
//! - [`Raw`]: SQL fragments spliced verbatim
//! - [`ParamMap`] / [`ScalarKind`]: placeholder bindings
//! - [`Dialect`]: the engine family a statement targets
//! - [`QuarryError`]: the closed error taxonomy

#![warn(missing_docs)]

pub mod dialect;
pub mod error;
pub mod map;
pub mod param;
pub mod raw;
pub mod value;

pub use dialect::Dialect;
pub use error::{QuarryError, QuarryResult};
pub use map::Map;
pub use param::{Param, ParamMap, ScalarKind};
pub use raw::Raw;
pub use value::Value;

/// Build a raw fragment, e.g. `raw("COUNT(<id>)")`.
pub fn raw(sql: impl Into<String>) -> Raw {
    Raw::new(sql)
}
