//! Query compiler for Quarry
//!
//! This crate turns structured descriptors into dialect-correct,
//! parameterized SQL and maps flat result rows back into the shape the
//! descriptor asked for:
//! - Compiler: identifier quoting, joins, columns, conditions, clauses,
//!   statement builders, readable interpolation
//! - Query: the read descriptor (table, join, columns, conditions, aggregate)
//! - Projector: typed, nested result projection
//!
//! Compilation is pure: no I/O, no shared state, and the same descriptor
//! always yields the same text and bindings.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod clause;
pub mod columns;
mod compiler;
mod condition;
pub mod encode;
mod interpolate;
mod join;
pub mod projector;
pub mod query;
mod quote;
mod raw;
mod statement;

#[cfg(test)]
mod tests;

pub use clause::MODIFIERS;
pub use columns::{ColumnItem, ColumnType};
pub use compiler::{Compiled, Compiler};
pub use projector::Projector;
pub use query::{is_join, Aggregate, Query};
