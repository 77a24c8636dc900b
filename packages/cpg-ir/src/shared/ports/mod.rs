//! Narrow interfaces the core consumes (spec §6, ingress). The core never
//! parses source, touches the file system, or watches for changes itself —
//! it is handed values that satisfy these traits by the surrounding
//! application (CLI, file watcher, etc.), none of which are in scope here.

use crate::errors::CoreError;
use crate::shared::models::{Ast, Module};

/// Hands back a parsed AST for one file. The core does not implement
/// source parsing (spec §6).
pub trait AstProvider: Send + Sync {
    /// Parse one module's source into the closed `Ast` sum type. A single
    /// file's parse failure is returned, not panicked — the caller (C2)
    /// turns it into a module-scoped `CoreError::Parse` and continues with
    /// the rest of the batch.
    fn parse(&self, source: &[u8], file_path: &str) -> Result<ParsedModule, CoreError>;
}

/// What a provider hands back for one file: the module name it declared,
/// plus one `Ast` root per function found in it.
#[derive(Debug, Clone)]
pub struct ParsedModule {
    pub module_name: String,
    pub functions: Vec<ParsedFunction>,
}

#[derive(Debug, Clone)]
pub struct ParsedFunction {
    pub name: String,
    pub arity: usize,
    pub is_public: bool,
    pub parameters: Vec<Ast>,
    pub guards: Vec<Ast>,
    pub body: Ast,
}

/// File system access (spec §6). `discover` does glob-include-minus-ignore
/// expansion; the result is a deduplicated list, order unspecified.
pub trait FileSystemPort: Send + Sync {
    fn read(&self, file_path: &str) -> Result<Vec<u8>, CoreError>;
    fn discover(&self, root: &str, include_globs: &[String], ignore_globs: &[String]) -> Result<Vec<String>, CoreError>;
}

/// What the Populator (C7) and Synchronizer (C8) need from the Repository
/// (C6), without `cpg-ir` depending on `cpg-storage` — the dependency runs
/// the other way (spec §3 Ownership: storage depends on the core, never
/// the reverse). `cpg-storage::Repository` implements this trait.
#[async_trait::async_trait]
pub trait RepositoryPort: Send + Sync {
    /// Replaces whatever module was stored at `module.file_path`, wholesale
    /// (module facts plus every function; C5's graphs are attached lazily
    /// by the repository itself, not here).
    async fn upsert_module(&self, module: Module) -> Result<(), CoreError>;

    /// Removes the module at `file_path`, if any (spec §4.8 file deletion).
    async fn remove_module(&self, file_path: &str) -> Result<(), CoreError>;

    /// Moves a module's storage key without re-analysis (spec §4.8 rename:
    /// content unchanged, only the file_path index entry moves).
    async fn rename_module(&self, old_path: &str, new_path: &str) -> Result<(), CoreError>;

    /// The stored content hash for `file_path`, if the repository has seen
    /// it before — lets the Synchronizer short-circuit an unchanged file
    /// (spec §4.8 content-hash short-circuit) without re-parsing it.
    async fn content_hash(&self, file_path: &str) -> Option<String>;
}

/// Frozen configuration read at initialization (spec §6).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub max_memory_bytes: u64,
    pub worker_count: usize,
    pub include_globs: Vec<String>,
    pub ignore_globs: Vec<String>,
    pub id_strategy: crate::features::node_id::IdStrategy,
    pub analysis_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_memory_bytes: 512 * 1024 * 1024,
            worker_count: num_cpus::get(),
            include_globs: vec!["**/*.ex".to_string()],
            ignore_globs: vec!["**/_build/**".to_string(), "**/deps/**".to_string()],
            id_strategy: crate::features::node_id::IdStrategy::Path,
            analysis_timeout_secs: crate::shared::constants::pipeline::DEFAULT_FILE_TIMEOUT_SECS,
        }
    }
}
