//! One vertical slice per pipeline stage (spec §4).
//!
//! Each stage consumes the previous stage's output and is independently
//! testable against hand-built `Ast`/`Cfg`/`Dfg` fixtures — none of them
//! depend on an actual parser being wired up.

pub mod ast_analyzer;
pub mod cfg_builder;
pub mod cpg_fusion;
pub mod dfg_builder;
pub mod node_id;
pub mod populator;
pub mod query_engine;
pub mod synchronizer;
