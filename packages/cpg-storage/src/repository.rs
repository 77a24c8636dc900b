//! In-memory `CpgRepository` implementation (spec §4.6, §5).
//!
//! Primary storage is a `DashMap<module_name, Module>`; every index named
//! in spec §3 ("Repository state") lives alongside it as its own
//! `DashMap`. A `parking_lot::Mutex<()>` per module name (spec §5 "per-module
//! reader/writer lock") serializes writers to the same module; `DashMap`'s
//! own per-shard locking already makes individual reads/writes atomic, so
//! the extra mutex exists purely to make the *multi-step* upsert (primary
//! record + every index entry) a single critical section, per spec §3's
//! "indexes and primary storage are updated in the same logical write"
//! invariant.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex as SyncMutex;

use cpg_ir::errors::CoreError;
use cpg_ir::features::cfg_builder::build_cfg;
use cpg_ir::features::cpg_fusion::build_cpg;
use cpg_ir::features::dfg_builder::build_dfg;
use cpg_ir::features::node_id::parse_id;
use cpg_ir::shared::models::{Ast, Cfg, Cpg, CpgNode, Dfg, Function, FunctionKey, Module};
use cpg_ir::shared::ports::RepositoryPort;

use crate::cache::{CacheKey, GraphCache};
use crate::domain::{CallReference, CpgRepository, FunctionFilter, RepositoryStats};
use crate::error::{Result, StorageError};

fn cyclomatic_of(function: &Function) -> u32 {
    function.complexity_preliminary.decision_points + 1
}

/// MFA string a `CallSite` resolves to: qualified calls use their own
/// `module`, bare calls (`call.module = None`) resolve to the caller's own
/// module (spec §4.2: "a bare `fun(args)` records `module=nil`").
fn resolve_callee_mfa(call: &cpg_ir::shared::models::CallSite, caller_module: &str) -> String {
    let module = call.module.as_deref().unwrap_or(caller_module);
    format!("{module}.{}/{}", call.function, call.arity)
}

pub struct InMemoryRepository {
    modules: DashMap<String, Module>,
    file_index: DashMap<String, String>,
    /// cyclomatic complexity -> function keys at exactly that value; a
    /// `min_cyclomatic` filter scans every bucket `>= k` (spec §4.6).
    complexity_index: DashMap<u32, Vec<FunctionKey>>,
    called_mfa_index: DashMap<String, Vec<CallReference>>,
    /// Every AST node id seen across CPGs built so far, mapping back to
    /// the owning function (spec §4.6 `find_cpg_node_by_ast_id`).
    cpg_ast_index: DashMap<String, FunctionKey>,
    write_locks: DashMap<String, Arc<SyncMutex<()>>>,
    cache: SyncMutex<GraphCache>,
    max_bytes: u64,
}

impl InMemoryRepository {
    pub fn new(max_memory_bytes: u64) -> Self {
        Self {
            modules: DashMap::new(),
            file_index: DashMap::new(),
            complexity_index: DashMap::new(),
            called_mfa_index: DashMap::new(),
            cpg_ast_index: DashMap::new(),
            write_locks: DashMap::new(),
            cache: SyncMutex::new(GraphCache::new(max_memory_bytes)),
            max_bytes: max_memory_bytes,
        }
    }

    fn module_lock(&self, name: &str) -> Arc<SyncMutex<()>> {
        self.write_locks.entry(name.to_string()).or_insert_with(|| Arc::new(SyncMutex::new(()))).clone()
    }

    fn index_function(&self, module_name: &str, function: &Function) {
        let bucket = cyclomatic_of(function);
        self.complexity_index.entry(bucket).or_default().push(function.key.clone());
        for call in &function.direct_calls {
            let mfa = resolve_callee_mfa(call, module_name);
            self.called_mfa_index.entry(mfa.clone()).or_default().push(CallReference {
                caller: function.key.clone(),
                callee_mfa: mfa,
                call_site_ast_id: call.call_site_ast_id.clone(),
                line: call.line,
            });
        }
    }

    fn deindex_function(&self, function: &Function) {
        let bucket = cyclomatic_of(function);
        if let Some(mut keys) = self.complexity_index.get_mut(&bucket) {
            keys.retain(|k| k != &function.key);
        }
        for call in &function.direct_calls {
            let mfa = resolve_callee_mfa(call, &function.key.module);
            if let Some(mut refs) = self.called_mfa_index.get_mut(&mfa) {
                refs.retain(|r| !(r.caller == function.key && r.call_site_ast_id == call.call_site_ast_id));
            }
        }
        self.cpg_ast_index.retain(|_, owner| owner != &function.key);
    }

    /// Parses a `"Module.fun/arity"` MFA string and checks whether that
    /// function actually exists in the repository right now (spec §5, §9
    /// call-edge-resolution design note). The module portion may itself
    /// contain dots, so only the final `.` before the arity split counts
    /// as the module/function boundary.
    fn function_exists_mfa(&self, mfa: &str) -> bool {
        let Some((head, arity_str)) = mfa.rsplit_once('/') else { return false };
        let Ok(arity) = arity_str.parse::<usize>() else { return false };
        let Some((module, fun)) = head.rsplit_once('.') else { return false };
        self.modules.get(module).map(|m| m.function(fun, arity).is_some()).unwrap_or(false)
    }

    /// Flips `CpgEdge.resolved` on every symbolic `Call` edge of `cpg`
    /// against the function index as it stands right now, in place (spec
    /// §5, §9 "a repository-level resolution pass").
    fn resolve_call_edges_in(&self, cpg: &mut Cpg) {
        for edge in &mut cpg.edges {
            if let Some(mfa) = edge.symbolic_target_mfa() {
                edge.resolved = self.function_exists_mfa(mfa);
            }
        }
    }

    fn parameter_asts(function: &Function) -> Vec<Ast> {
        function.parameters.iter().map(|p| p.pattern_ast.clone()).collect()
    }

    fn function_ast_id(function: &Function) -> String {
        function.body.metadata().ast_id.clone().unwrap_or_else(|| function.key.mfa())
    }

    /// Every stored module, cloned. Used by `snapshot::export_snapshot`.
    pub(crate) fn modules_snapshot(&self) -> Vec<Module> {
        self.modules.iter().map(|entry| entry.value().clone()).collect()
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new(cpg_ir::shared::ports::EngineConfig::default().max_memory_bytes)
    }
}

#[async_trait]
impl CpgRepository for InMemoryRepository {
    async fn put_module(&self, module: Module) -> Result<()> {
        let lock = self.module_lock(&module.name);
        let _guard = lock.lock();

        let previous_by_name = self.modules.get(&module.name).map(|entry| entry.clone());

        // A `Modified` event can rename a module in place: same `file_path`,
        // a different `module.name` (spec §8 scenario 5). The file index
        // tells us which (now-stale) module name used to own this path.
        let stale_name =
            self.file_index.get(&module.file_path).map(|entry| entry.clone()).filter(|name| name != &module.name);
        let previous_by_path = stale_name.as_ref().and_then(|name| self.modules.get(name).map(|entry| entry.clone()));

        let previous = previous_by_name.clone().or_else(|| previous_by_path.clone());

        if let Some(old) = &previous_by_name {
            if old.file_path != module.file_path {
                self.file_index.remove(&old.file_path);
            }
            for f in &old.functions {
                self.deindex_function(f);
            }
        }

        if let Some(old) = &previous_by_path {
            for f in &old.functions {
                self.deindex_function(f);
            }
        }
        if let Some(name) = &stale_name {
            self.modules.remove(name);
            self.write_locks.remove(name);
        }

        {
            let mut cache = self.cache.lock();
            for function in &module.functions {
                self.index_function(&module.name, function);
                let unchanged = previous
                    .as_ref()
                    .and_then(|old| old.function(&function.key.name, function.key.arity))
                    .map(|old_fn| old_fn.content_hash == function.content_hash)
                    .unwrap_or(false);
                if !unchanged {
                    cache.invalidate(&function.key);
                }
            }
            if let Some(old) = &previous {
                for old_fn in &old.functions {
                    if module.function(&old_fn.key.name, old_fn.key.arity).is_none() {
                        cache.invalidate(&old_fn.key);
                    }
                }
            }
        }

        self.file_index.insert(module.file_path.clone(), module.name.clone());
        self.modules.insert(module.name.clone(), module);
        Ok(())
    }

    async fn delete_module(&self, name: &str) -> Result<()> {
        let lock = self.module_lock(name);
        let _guard = lock.lock();

        if let Some((_, module)) = self.modules.remove(name) {
            self.file_index.remove(&module.file_path);
            let mut cache = self.cache.lock();
            for function in &module.functions {
                self.deindex_function(function);
                cache.invalidate(&function.key);
            }
        }
        self.write_locks.remove(name);
        Ok(())
    }

    async fn get_module(&self, name: &str) -> Option<Module> {
        self.modules.get(name).map(|entry| entry.clone())
    }

    async fn get_function(&self, key: &FunctionKey) -> Option<Function> {
        self.modules.get(&key.module).and_then(|m| m.function(&key.name, key.arity).cloned())
    }

    async fn get_cfg(&self, key: &FunctionKey) -> Result<Option<Cfg>> {
        let function = match CpgRepository::get_function(self, key).await {
            Some(f) => f,
            None => return Ok(None),
        };
        let cache_key = CacheKey::new(key.clone(), function.content_hash.clone());
        if let Some(cfg) = self.cache.lock().cfg(&cache_key) {
            return Ok(Some(cfg));
        }
        let ast_id = Self::function_ast_id(&function);
        let cfg = build_cfg(&ast_id, &function.body);
        self.cache.lock().put_cfg(cache_key, cfg.clone());
        Ok(Some(cfg))
    }

    async fn get_dfg(&self, key: &FunctionKey) -> Result<Option<Dfg>> {
        let function = match CpgRepository::get_function(self, key).await {
            Some(f) => f,
            None => return Ok(None),
        };
        let cache_key = CacheKey::new(key.clone(), function.content_hash.clone());
        if let Some(dfg) = self.cache.lock().dfg(&cache_key) {
            return Ok(Some(dfg));
        }
        let ast_id = Self::function_ast_id(&function);
        let params = Self::parameter_asts(&function);
        let dfg = build_dfg(&ast_id, &params, &function.body);
        self.cache.lock().put_dfg(cache_key, dfg.clone());
        Ok(Some(dfg))
    }

    async fn get_cpg(&self, key: &FunctionKey) -> Result<Option<Cpg>> {
        let function = match CpgRepository::get_function(self, key).await {
            Some(f) => f,
            None => return Ok(None),
        };
        let cache_key = CacheKey::new(key.clone(), function.content_hash.clone());
        if let Some(cpg) = self.cache.lock().cpg(&cache_key) {
            return Ok(Some(cpg));
        }

        let ast_id = Self::function_ast_id(&function);
        let cfg = match self.cache.lock().cfg(&cache_key) {
            Some(cfg) => cfg,
            None => {
                let cfg = build_cfg(&ast_id, &function.body);
                self.cache.lock().put_cfg(cache_key.clone(), cfg.clone());
                cfg
            }
        };
        let dfg = match self.cache.lock().dfg(&cache_key) {
            Some(dfg) => dfg,
            None => {
                let params = Self::parameter_asts(&function);
                let dfg = build_dfg(&ast_id, &params, &function.body);
                self.cache.lock().put_dfg(cache_key.clone(), dfg.clone());
                dfg
            }
        };

        let mut cpg = build_cpg(&ast_id, &key.module, &function.body, &cfg, &dfg);
        self.resolve_call_edges_in(&mut cpg);
        for node_ast_id in cpg.mappings.ast_id_to_cpg_id.keys() {
            self.cpg_ast_index.insert(node_ast_id.clone(), key.clone());
        }
        self.cache.lock().put_cpg(cache_key, cpg.clone());
        Ok(Some(cpg))
    }

    async fn resolve_pending_call_edges(&self, key: &FunctionKey) -> Result<()> {
        let function = match CpgRepository::get_function(self, key).await {
            Some(f) => f,
            None => return Ok(()),
        };
        let cache_key = CacheKey::new(key.clone(), function.content_hash.clone());
        let Some(mut cpg) = self.cache.lock().cpg(&cache_key) else { return Ok(()) };
        self.resolve_call_edges_in(&mut cpg);
        self.cache.lock().put_cpg(cache_key, cpg);
        Ok(())
    }

    async fn query_functions(&self, filter: &FunctionFilter) -> Vec<Function> {
        if !filter.is_indexable() {
            return self.modules.iter().flat_map(|m| m.functions.clone()).collect();
        }

        let mut candidates: Option<HashSet<FunctionKey>> = None;
        let intersect = |current: Option<HashSet<FunctionKey>>, fresh: HashSet<FunctionKey>| -> HashSet<FunctionKey> {
            match current {
                Some(existing) => existing.intersection(&fresh).cloned().collect(),
                None => fresh,
            }
        };

        if let Some(module_name) = &filter.module {
            let keys: HashSet<FunctionKey> =
                self.modules.get(module_name).map(|m| m.functions.iter().map(|f| f.key.clone()).collect()).unwrap_or_default();
            candidates = Some(intersect(candidates, keys));
        }
        if let Some(min) = filter.min_cyclomatic {
            let mut keys = HashSet::new();
            for entry in self.complexity_index.iter() {
                if *entry.key() >= min {
                    keys.extend(entry.value().iter().cloned());
                }
            }
            candidates = Some(intersect(candidates, keys));
        }
        if let Some(mfa) = &filter.calls_mfa {
            let keys: HashSet<FunctionKey> =
                self.called_mfa_index.get(mfa).map(|refs| refs.iter().map(|r| r.caller.clone()).collect()).unwrap_or_default();
            candidates = Some(intersect(candidates, keys));
        }

        candidates
            .unwrap_or_default()
            .into_iter()
            .filter_map(|key| self.modules.get(&key.module).and_then(|m| m.function(&key.name, key.arity).cloned()))
            .collect()
    }

    async fn find_callers_of(&self, mfa: &str) -> Vec<CallReference> {
        self.called_mfa_index.get(mfa).map(|refs| refs.clone()).unwrap_or_default()
    }

    async fn find_cpg_node_by_ast_id(&self, ast_id: &str) -> Option<CpgNode> {
        let owner = self.cpg_ast_index.get(ast_id).map(|entry| entry.clone())?;
        let cpg = CpgRepository::get_cpg(self, &owner).await.ok().flatten()?;
        cpg.node_by_ast_id(ast_id).cloned()
    }

    async fn find_function_by_ast_id(&self, ast_id: &str) -> Option<FunctionKey> {
        let parsed = parse_id(ast_id)?;
        let key = FunctionKey::new(parsed.module, parsed.function, parsed.arity);
        CpgRepository::get_function(self, &key).await.map(|_| key)
    }

    async fn stats(&self) -> RepositoryStats {
        let module_count = self.modules.len();
        let function_count = self.modules.iter().map(|m| m.functions.len()).sum();
        let cached_graph_bytes = self.cache.lock().used_bytes();
        RepositoryStats { module_count, function_count, cached_graph_bytes, max_graph_bytes: self.max_bytes }
    }
}

/// Adapter onto `cpg_ir`'s narrow ingress port (spec §6), so the Populator
/// and Synchronizer — which only know about `RepositoryPort` and never
/// depend on `cpg-storage` directly — can drive this repository.
#[async_trait]
impl RepositoryPort for InMemoryRepository {
    async fn upsert_module(&self, module: Module) -> std::result::Result<(), CoreError> {
        CpgRepository::put_module(self, module).await.map_err(Into::into)
    }

    async fn remove_module(&self, file_path: &str) -> std::result::Result<(), CoreError> {
        match self.file_index.get(file_path).map(|entry| entry.clone()) {
            Some(name) => CpgRepository::delete_module(self, &name).await.map_err(Into::into),
            None => Ok(()),
        }
    }

    async fn rename_module(&self, old_path: &str, new_path: &str) -> std::result::Result<(), CoreError> {
        let name = self
            .file_index
            .get(old_path)
            .map(|entry| entry.clone())
            .ok_or_else(|| CoreError::Storage(StorageError::module_not_found(old_path).to_string()))?;
        let lock = self.module_lock(&name);
        let _guard = lock.lock();
        if let Some(mut entry) = self.modules.get_mut(&name) {
            entry.file_path = new_path.to_string();
        }
        self.file_index.remove(old_path);
        self.file_index.insert(new_path.to_string(), name);
        Ok(())
    }

    async fn content_hash(&self, file_path: &str) -> Option<String> {
        let name = self.file_index.get(file_path).map(|entry| entry.clone())?;
        self.modules.get(&name).map(|m| m.content_hash.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpg_ir::shared::models::{AstMetadata, CallSite, ComplexityPreliminary, ParameterPattern, Span, Visibility};

    fn leaf(kind: &str) -> Ast {
        Ast::Constructor { kind: kind.to_string(), children: vec![], metadata: AstMetadata::new(Span::zero()) }
    }

    fn sample_module(name: &str, file_path: &str, body_kind: &str) -> Module {
        let mut body = Ast::Constructor {
            kind: "block".to_string(),
            children: vec![leaf(body_kind)],
            metadata: AstMetadata::new(Span::zero()),
        };
        let key = FunctionKey::new(name, "run", 0);
        let ctx = cpg_ir::features::node_id::IdContext::new(key.clone(), cpg_ir::features::node_id::IdStrategy::Path);
        cpg_ir::features::node_id::assign_ids(&mut body, &ctx);

        let content_hash = cpg_ir::shared::utils::content_hash(format!("{body:?}").as_bytes());
        let mut function = Function::new(key.clone(), Visibility::Public, Vec::new(), body, Span::zero(), content_hash);
        function.complexity_preliminary = ComplexityPreliminary { decision_points: 0 };
        function.direct_calls = vec![CallSite {
            module: Some("Other".to_string()),
            function: "helper".to_string(),
            arity: 1,
            call_site_ast_id: format!("{name}:run:0:call"),
            line: 1,
        }];

        let mut module = Module::new(name, file_path, "modhash");
        module.functions = vec![function];
        module.module_complexity = 1;
        let _ = ParameterPattern { pattern_ast: leaf("param"), bound_names: vec![] }; // shape reference only
        module
    }

    #[test]
    fn put_then_get_module_round_trips() {
        cpg_ir::shared::block_on(async {
            let repo = InMemoryRepository::new(u64::MAX);
            let module = sample_module("A", "a.ex", "statement");
            CpgRepository::put_module(&repo, module).await.unwrap();

            let fetched = CpgRepository::get_module(&repo, "A").await.unwrap();
            assert_eq!(fetched.file_path, "a.ex");
        });
    }

    #[test]
    fn file_path_index_resolves_content_hash() {
        cpg_ir::shared::block_on(async {
            let repo = InMemoryRepository::new(u64::MAX);
            let module = sample_module("A", "a.ex", "statement");
            CpgRepository::put_module(&repo, module).await.unwrap();

            assert_eq!(RepositoryPort::content_hash(&repo, "a.ex").await.as_deref(), Some("modhash"));
            assert_eq!(RepositoryPort::content_hash(&repo, "missing.ex").await, None);
        });
    }

    #[test]
    fn lazy_cfg_is_cached_after_first_build() {
        cpg_ir::shared::block_on(async {
            let repo = InMemoryRepository::new(u64::MAX);
            let module = sample_module("A", "a.ex", "statement");
            CpgRepository::put_module(&repo, module).await.unwrap();

            let key = FunctionKey::new("A", "run", 0);
            let first = CpgRepository::get_cfg(&repo, &key).await.unwrap().unwrap();
            let stats_before = CpgRepository::stats(&repo).await;
            let second = CpgRepository::get_cfg(&repo, &key).await.unwrap().unwrap();
            let stats_after = CpgRepository::stats(&repo).await;

            assert_eq!(first.nodes.len(), second.nodes.len());
            assert_eq!(stats_before.cached_graph_bytes, stats_after.cached_graph_bytes);
        });
    }

    #[test]
    fn unchanged_content_hash_keeps_cache_on_reupsert() {
        cpg_ir::shared::block_on(async {
            let repo = InMemoryRepository::new(u64::MAX);
            let module = sample_module("A", "a.ex", "statement");
            CpgRepository::put_module(&repo, module.clone()).await.unwrap();

            let key = FunctionKey::new("A", "run", 0);
            CpgRepository::get_cpg(&repo, &key).await.unwrap();
            let before = CpgRepository::stats(&repo).await.cached_graph_bytes;

            CpgRepository::put_module(&repo, module).await.unwrap();
            let after = CpgRepository::stats(&repo).await.cached_graph_bytes;
            assert_eq!(before, after);
        });
    }

    #[test]
    fn changed_content_hash_invalidates_cache() {
        cpg_ir::shared::block_on(async {
            let repo = InMemoryRepository::new(u64::MAX);
            let module_v1 = sample_module("A", "a.ex", "statement");
            CpgRepository::put_module(&repo, module_v1).await.unwrap();

            let key = FunctionKey::new("A", "run", 0);
            CpgRepository::get_cpg(&repo, &key).await.unwrap();
            assert!(CpgRepository::stats(&repo).await.cached_graph_bytes > 0);

            let module_v2 = sample_module("A", "a.ex", "if_cond");
            CpgRepository::put_module(&repo, module_v2).await.unwrap();
            assert_eq!(CpgRepository::stats(&repo).await.cached_graph_bytes, 0);
        });
    }

    #[test]
    fn delete_module_removes_indexes() {
        cpg_ir::shared::block_on(async {
            let repo = InMemoryRepository::new(u64::MAX);
            let module = sample_module("A", "a.ex", "statement");
            CpgRepository::put_module(&repo, module).await.unwrap();

            assert!(!CpgRepository::find_callers_of(&repo, "Other.helper/1").await.is_empty());
            CpgRepository::delete_module(&repo, "A").await.unwrap();
            assert!(CpgRepository::find_callers_of(&repo, "Other.helper/1").await.is_empty());
            assert!(CpgRepository::get_module(&repo, "A").await.is_none());
            assert_eq!(RepositoryPort::content_hash(&repo, "a.ex").await, None);
        });
    }

    #[test]
    fn find_callers_of_returns_call_site() {
        cpg_ir::shared::block_on(async {
            let repo = InMemoryRepository::new(u64::MAX);
            let module = sample_module("A", "a.ex", "statement");
            CpgRepository::put_module(&repo, module).await.unwrap();

            let refs = CpgRepository::find_callers_of(&repo, "Other.helper/1").await;
            assert_eq!(refs.len(), 1);
            assert_eq!(refs[0].caller, FunctionKey::new("A", "run", 0));
        });
    }

    #[test]
    fn call_edge_resolves_once_callee_module_is_present() {
        cpg_ir::shared::block_on(async {
            let repo = InMemoryRepository::new(u64::MAX);
            // "A.run/0" calls "Other.helper/1" (sample_module's fixed call
            // site), but "Other" isn't stored yet.
            CpgRepository::put_module(&repo, sample_module("A", "a.ex", "statement")).await.unwrap();

            let key = FunctionKey::new("A", "run", 0);
            let cpg = CpgRepository::get_cpg(&repo, &key).await.unwrap().unwrap();
            let call_edge = cpg.edges.iter().find(|e| e.symbolic_target_mfa().is_some()).unwrap();
            assert!(!call_edge.resolved);

            // Now "Other" shows up with a matching "helper/1" — add it
            // under the same module-name/function-name/arity the call
            // site targets.
            let other = sample_module("Other", "other.ex", "statement");
            let mut other = other;
            other.functions[0].key = FunctionKey::new("Other", "helper", 1);
            CpgRepository::put_module(&repo, other).await.unwrap();

            CpgRepository::resolve_pending_call_edges(&repo, &key).await.unwrap();
            let cpg = CpgRepository::get_cpg(&repo, &key).await.unwrap().unwrap();
            let call_edge = cpg.edges.iter().find(|e| e.symbolic_target_mfa().is_some()).unwrap();
            assert!(call_edge.resolved);
        });
    }

    #[test]
    fn query_functions_filters_by_module() {
        cpg_ir::shared::block_on(async {
            let repo = InMemoryRepository::new(u64::MAX);
            CpgRepository::put_module(&repo, sample_module("A", "a.ex", "statement")).await.unwrap();
            CpgRepository::put_module(&repo, sample_module("B", "b.ex", "statement")).await.unwrap();

            let filter = FunctionFilter { module: Some("A".to_string()), ..Default::default() };
            let results = CpgRepository::query_functions(&repo, &filter).await;
            assert_eq!(results.len(), 1);
            assert_eq!(results[0].key.module, "A");
        });
    }

    #[test]
    fn find_cpg_node_by_ast_id_resolves_after_cpg_built() {
        cpg_ir::shared::block_on(async {
            let repo = InMemoryRepository::new(u64::MAX);
            let module = sample_module("A", "a.ex", "statement");
            let ast_id = module.functions[0].body.metadata().ast_id.clone().unwrap();
            CpgRepository::put_module(&repo, module).await.unwrap();

            assert!(CpgRepository::find_cpg_node_by_ast_id(&repo, &ast_id).await.is_none());
            let key = FunctionKey::new("A", "run", 0);
            CpgRepository::get_cpg(&repo, &key).await.unwrap();
            assert!(CpgRepository::find_cpg_node_by_ast_id(&repo, &ast_id).await.is_some());
        });
    }

    #[test]
    fn find_function_by_ast_id_parses_prefix() {
        cpg_ir::shared::block_on(async {
            let repo = InMemoryRepository::new(u64::MAX);
            let module = sample_module("A", "a.ex", "statement");
            let ast_id = module.functions[0].body.metadata().ast_id.clone().unwrap();
            CpgRepository::put_module(&repo, module).await.unwrap();

            let key = CpgRepository::find_function_by_ast_id(&repo, &ast_id).await.unwrap();
            assert_eq!(key, FunctionKey::new("A", "run", 0));
        });
    }

    #[test]
    fn module_renamed_in_place_evicts_old_name() {
        cpg_ir::shared::block_on(async {
            let repo = InMemoryRepository::new(u64::MAX);
            let module_a = sample_module("A", "a.ex", "statement");
            CpgRepository::put_module(&repo, module_a).await.unwrap();
            let key_a = FunctionKey::new("A", "run", 0);
            CpgRepository::get_cpg(&repo, &key_a).await.unwrap();
            assert!(CpgRepository::stats(&repo).await.cached_graph_bytes > 0);

            let module_b = sample_module("B", "a.ex", "statement");
            CpgRepository::put_module(&repo, module_b).await.unwrap();

            assert!(CpgRepository::get_module(&repo, "A").await.is_none());
            assert!(CpgRepository::get_module(&repo, "B").await.is_some());
            assert_eq!(RepositoryPort::content_hash(&repo, "a.ex").await.as_deref(), Some("modhash"));
            assert_eq!(CpgRepository::stats(&repo).await.module_count, 1);
        });
    }

    #[test]
    fn rename_module_port_moves_file_path_in_place() {
        cpg_ir::shared::block_on(async {
            let repo = InMemoryRepository::new(u64::MAX);
            let module = sample_module("A", "a.ex", "statement");
            CpgRepository::put_module(&repo, module).await.unwrap();

            RepositoryPort::rename_module(&repo, "a.ex", "a2.ex").await.unwrap();

            assert_eq!(RepositoryPort::content_hash(&repo, "a2.ex").await.as_deref(), Some("modhash"));
            assert_eq!(RepositoryPort::content_hash(&repo, "a.ex").await, None);
            assert_eq!(CpgRepository::get_module(&repo, "A").await.unwrap().file_path, "a2.ex");
        });
    }

    #[test]
    fn tiny_memory_bound_still_serves_uncached() {
        cpg_ir::shared::block_on(async {
            let repo = InMemoryRepository::new(1);
            let module = sample_module("A", "a.ex", "statement");
            CpgRepository::put_module(&repo, module).await.unwrap();

            let key = FunctionKey::new("A", "run", 0);
            let cfg = CpgRepository::get_cfg(&repo, &key).await.unwrap();
            assert!(cfg.is_some());
        });
    }
}
