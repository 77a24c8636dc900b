//! Domain layer for the Repository (spec §4.6, §3 "Repository state").
//!
//! # Responsibility
//!
//! Durable in-memory store of `Module`/`Function` facts plus their three
//! lazily-computed graphs (CFG/DFG/CPG), with the inverted indexes spec §3
//! names (`file_path → module`, `called_mfa → [caller]`, complexity bucket,
//! `ast_id → function`) and the memory-bounded LRU graph cache of §4.6.
//!
//! # Port Trait
//!
//! [`CpgRepository`] is the narrow surface the rest of the system (query
//! executor, correlation API, `cpg_ir`'s own Populator/Synchronizer via the
//! adapter in `repository.rs`) is allowed to depend on. `InMemoryRepository`
//! in the sibling `repository` module is the only implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use cpg_ir::shared::models::{Cfg, Cpg, CpgNode, Dfg, Function, FunctionKey, Module};

use crate::error::Result;

/// A filter over the indexed fields spec §4.6 names: `module`,
/// `cyclomatic ≥ k`, `calls_mfa`. All present fields are ANDed together;
/// `None` means "no constraint on this field".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FunctionFilter {
    pub module: Option<String>,
    pub min_cyclomatic: Option<u32>,
    pub calls_mfa: Option<String>,
}

impl FunctionFilter {
    /// `true` when every present constraint targets an index the
    /// repository actually maintains — lets `query_functions` choose the
    /// indexed path over a full scan (spec §4.6 "uses indexes where the
    /// filter targets an indexed field").
    pub fn is_indexable(&self) -> bool {
        self.module.is_some() || self.min_cyclomatic.is_some() || self.calls_mfa.is_some()
    }
}

/// One call site pointing at a given MFA, as returned by
/// `find_callers_of` (spec §4.6, end-to-end scenario 6).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallReference {
    pub caller: FunctionKey,
    pub callee_mfa: String,
    pub call_site_ast_id: String,
    pub line: u32,
}

/// A live snapshot of the repository's size, for memory-bound diagnostics
/// (spec §4.6, §5 "Memory").
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RepositoryStats {
    pub module_count: usize,
    pub function_count: usize,
    pub cached_graph_bytes: u64,
    pub max_graph_bytes: u64,
}

/// The Repository's public contract (spec §4.6 Operations).
///
/// Every write is atomic with respect to readers: primary storage and every
/// affected index update in the same logical step, so a reader never
/// observes a half-applied upsert (spec §3 Repository state invariant).
#[async_trait]
pub trait CpgRepository: Send + Sync {
    /// Upsert semantics: replaces whatever module was stored under
    /// `module.name`/`module.file_path`, wholesale.
    async fn put_module(&self, module: Module) -> Result<()>;

    /// Cascades to the module's functions and their cached graphs; every
    /// index entry pointing at them is also removed (spec §4.6).
    async fn delete_module(&self, name: &str) -> Result<()>;

    async fn get_module(&self, name: &str) -> Option<Module>;

    async fn get_function(&self, key: &FunctionKey) -> Option<Function>;

    /// Builds the CFG lazily on first access and caches it keyed by
    /// `(function_key, content_hash)` (spec §4.6 Caching policy).
    async fn get_cfg(&self, key: &FunctionKey) -> Result<Option<Cfg>>;

    /// Builds the DFG lazily; depends on the same cached CFG existing
    /// first? No — DFG construction is independent of CFG (spec §4.4
    /// operates directly on the AST), but both are cached under the CPG
    /// fusion step once a caller asks for the CPG.
    async fn get_dfg(&self, key: &FunctionKey) -> Result<Option<Dfg>>;

    /// Builds CFG, DFG, and fuses them into a CPG lazily, caching all
    /// three (spec §4.5, §4.6). Symbolic call edges are marked `resolved`
    /// against the current function index before the CPG is returned (spec
    /// §5, §9: "a repository-level resolution pass").
    async fn get_cpg(&self, key: &FunctionKey) -> Result<Option<Cpg>>;

    /// Re-checks every symbolic `Call` edge's target MFA against the
    /// current function index and flips `CpgEdge.resolved` accordingly,
    /// in place on the cached CPG. Call after a batch of module writes to
    /// bring previously-fused CPGs' call edges up to date without
    /// re-fusing them (spec §5 "eventual... re-running the
    /// symbolic-call-resolution pass after each module write").
    async fn resolve_pending_call_edges(&self, key: &FunctionKey) -> Result<()>;

    /// Uses the indexed path when `filter.is_indexable()`; otherwise a
    /// linear scan over every stored function (spec §4.6).
    async fn query_functions(&self, filter: &FunctionFilter) -> Vec<Function>;

    /// Via the `called_mfa` inverted index (spec §4.6, §3).
    async fn find_callers_of(&self, mfa: &str) -> Vec<CallReference>;

    /// Via the per-function `ast_id → cpg_id` mapping, searched across
    /// every function whose CPG has been built so far (spec §4.6). A
    /// function whose CPG was never constructed is not searched — callers
    /// that need a guaranteed hit should `get_cpg` first.
    async fn find_cpg_node_by_ast_id(&self, ast_id: &str) -> Option<CpgNode>;

    /// `FunctionKey` owning `ast_id`, resolved from `ast_id`'s embedded
    /// `Module:function:arity:path` prefix — no repository lookup
    /// required (spec §4.1 `parse_id`, §6 Correlation API).
    async fn find_function_by_ast_id(&self, ast_id: &str) -> Option<FunctionKey>;

    async fn stats(&self) -> RepositoryStats;
}
