//! Memory-bounded LRU graph cache (spec §4.6 Caching policy / Memory bound).
//!
//! CFG/DFG/CPG construction is lazy; once built for a `(function_key,
//! content_hash)` pair the result is cached here. A configured maximum
//! total graph memory triggers eviction of the least-recently-used CPGs
//! first, then DFGs, then CFGs (spec §4.6) — CPGs are the most expensive
//! to rebuild but also the most numerous once queries start walking them,
//! so they're evicted first to protect the cheaper CFG/DFG layers
//! underneath them from needing to be rebuilt too.
//!
//! Guarded by a single `parking_lot::Mutex` — graph construction never
//! suspends (spec §5), so holding the lock across a cache miss's build
//! step is sound; it just serializes concurrent builders for the *same*
//! key, which is the desired behavior (spec §4.6: a cached graph is built
//! once per content hash).

use std::num::NonZeroUsize;

use lru::LruCache;
use serde::Serialize;

use cpg_ir::shared::models::{Cfg, Cpg, Dfg, FunctionKey};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub function_key: FunctionKey,
    pub content_hash: String,
}

impl CacheKey {
    pub fn new(function_key: FunctionKey, content_hash: impl Into<String>) -> Self {
        Self { function_key, content_hash: content_hash.into() }
    }
}

fn approx_bytes<T: Serialize>(value: &T) -> u64 {
    serde_json::to_vec(value).map(|bytes| bytes.len() as u64).unwrap_or(0)
}

/// Effectively unbounded entry count — the real bound is `max_bytes`, not a
/// count; `lru::LruCache` requires some non-zero capacity to exist at all.
fn unbounded_capacity() -> NonZeroUsize {
    NonZeroUsize::new(1_000_000).expect("nonzero literal")
}

pub struct GraphCache {
    cfg: LruCache<CacheKey, (Cfg, u64)>,
    dfg: LruCache<CacheKey, (Dfg, u64)>,
    cpg: LruCache<CacheKey, (Cpg, u64)>,
    used_bytes: u64,
    max_bytes: u64,
}

impl GraphCache {
    pub fn new(max_bytes: u64) -> Self {
        Self {
            cfg: LruCache::new(unbounded_capacity()),
            dfg: LruCache::new(unbounded_capacity()),
            cpg: LruCache::new(unbounded_capacity()),
            used_bytes: 0,
            max_bytes,
        }
    }

    pub fn used_bytes(&self) -> u64 {
        self.used_bytes
    }

    pub fn cfg(&mut self, key: &CacheKey) -> Option<Cfg> {
        self.cfg.get(key).map(|(cfg, _)| cfg.clone())
    }

    pub fn dfg(&mut self, key: &CacheKey) -> Option<Dfg> {
        self.dfg.get(key).map(|(dfg, _)| dfg.clone())
    }

    pub fn cpg(&mut self, key: &CacheKey) -> Option<Cpg> {
        self.cpg.get(key).map(|(cpg, _)| cpg.clone())
    }

    pub fn put_cfg(&mut self, key: CacheKey, cfg: Cfg) {
        let bytes = approx_bytes(&cfg);
        self.evict_to_fit(bytes);
        if let Some((_, old_bytes)) = self.cfg.put(key, (cfg, bytes)) {
            self.used_bytes -= old_bytes;
        }
        self.used_bytes += bytes;
    }

    pub fn put_dfg(&mut self, key: CacheKey, dfg: Dfg) {
        let bytes = approx_bytes(&dfg);
        self.evict_to_fit(bytes);
        if let Some((_, old_bytes)) = self.dfg.put(key, (dfg, bytes)) {
            self.used_bytes -= old_bytes;
        }
        self.used_bytes += bytes;
    }

    pub fn put_cpg(&mut self, key: CacheKey, cpg: Cpg) {
        let bytes = approx_bytes(&cpg);
        self.evict_to_fit(bytes);
        if let Some((_, old_bytes)) = self.cpg.put(key, (cpg, bytes)) {
            self.used_bytes -= old_bytes;
        }
        self.used_bytes += bytes;
    }

    /// Invalidates every cached graph for `function_key`, regardless of
    /// which content hash they were cached under (spec §4.6: "invalidated
    /// unless the function AST's content hash is unchanged" — called only
    /// when it *has* changed, or the function/module was deleted).
    pub fn invalidate(&mut self, function_key: &FunctionKey) {
        self.retain_cfg(|k| &k.function_key != function_key);
        self.retain_dfg(|k| &k.function_key != function_key);
        self.retain_cpg(|k| &k.function_key != function_key);
    }

    fn retain_cfg(&mut self, keep: impl Fn(&CacheKey) -> bool) {
        let removed: Vec<CacheKey> = self.cfg.iter().filter(|(k, _)| !keep(k)).map(|(k, _)| k.clone()).collect();
        for key in removed {
            if let Some((_, bytes)) = self.cfg.pop(&key) {
                self.used_bytes -= bytes;
            }
        }
    }

    fn retain_dfg(&mut self, keep: impl Fn(&CacheKey) -> bool) {
        let removed: Vec<CacheKey> = self.dfg.iter().filter(|(k, _)| !keep(k)).map(|(k, _)| k.clone()).collect();
        for key in removed {
            if let Some((_, bytes)) = self.dfg.pop(&key) {
                self.used_bytes -= bytes;
            }
        }
    }

    fn retain_cpg(&mut self, keep: impl Fn(&CacheKey) -> bool) {
        let removed: Vec<CacheKey> = self.cpg.iter().filter(|(k, _)| !keep(k)).map(|(k, _)| k.clone()).collect();
        for key in removed {
            if let Some((_, bytes)) = self.cpg.pop(&key) {
                self.used_bytes -= bytes;
            }
        }
    }

    /// Evicts LRU CPGs, then DFGs, then CFGs until `incoming` more bytes
    /// would fit within `max_bytes` (spec §4.6 eviction order).
    fn evict_to_fit(&mut self, incoming: u64) {
        if self.max_bytes == 0 {
            return;
        }
        while self.used_bytes + incoming > self.max_bytes {
            if let Some((_, (_, bytes))) = self.cpg.pop_lru() {
                self.used_bytes -= bytes;
                continue;
            }
            if let Some((_, (_, bytes))) = self.dfg.pop_lru() {
                self.used_bytes -= bytes;
                continue;
            }
            if let Some((_, (_, bytes))) = self.cfg.pop_lru() {
                self.used_bytes -= bytes;
                continue;
            }
            break;
        }
    }
}
