//! Work item field types and a criteria-to-SQL compiler.
//!
//! Work item types declare their fields through a small type system
//! (`model`): simple kinds, enums, and lists, each converting values between
//! the application representation and the JSON document stored per item.
//! Queries over work items are written as criteria expressions (`criteria`),
//! usually parsed from the JSON filter language, and compiled into a
//! parameterized SQL `WHERE` clause plus the table joins it needs (`query`).

pub mod cli;
pub mod config;
pub mod criteria;
pub mod error;
pub mod logging;
pub mod model;
pub mod query;
pub mod storage;

pub use error::{ErrorCode, Result, StructuredError, WitError};
