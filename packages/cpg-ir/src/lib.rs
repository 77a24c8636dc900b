//! cpg-ir — Code Property Graph engine core.
//!
//! Parses each function, assigns stable node identifiers, computes a
//! Control Flow Graph, computes an SSA Data Flow Graph with phi functions at
//! control-flow joins, and fuses all three into a unified, queryable Code
//! Property Graph.
//!
//! - `shared`   — data model (Module/Function/Ast/Cfg/Dfg/Cpg) and the
//!   narrow ports the core consumes (parsed-AST provider, file system).
//! - `features` — one vertical slice per pipeline stage: node identifier,
//!   AST analyzer, CFG builder, DFG/SSA builder, CPG fusion, populator,
//!   synchronizer, query executor.
//!
//! `features::*` depends on `shared::*`; never the other way around.
//! Persistence (modules/functions/graphs, indexes, caching) lives in the
//! sibling `cpg-storage` crate, not here.

#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]

pub mod errors;
pub mod features;
pub mod shared;

pub use errors::{CoreError, Result};
