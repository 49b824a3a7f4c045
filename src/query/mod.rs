//! Compile criteria expressions into parameterized SQL.
//!
//! - [`join`]: related tables reachable through field name prefixes
//! - [`compiler`]: the expression compiler
//! - [`statement`]: full `SELECT` assembly and placeholder rebinding

pub mod compiler;
pub mod join;
pub mod statement;

pub use compiler::{CompileError, Compiled, Compiler, compile};
pub use join::{ActiveJoins, JoinKind, JoinRegistry, TableJoin};
pub use statement::{Page, SelectStatement, rebind_postgres, select_work_items};
