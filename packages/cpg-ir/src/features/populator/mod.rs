//! C7 — Populator (spec §4.7).
//!
//! Bulk initial analysis of an entire project: discover files through the
//! `FileSystemPort`, analyze them with bounded `rayon` parallelism (C2's
//! per-function failure isolation already keeps one bad clause from
//! failing its module; here a bad file doesn't stop its siblings either),
//! and commit each successfully analyzed module to the repository. Graphs
//! (C3-C5) are not built here — the repository constructs them lazily on
//! first access (spec §4.6) — the Populator's job stops at Module/Function
//! facts.
//!
//! A per-file timeout bounds how long one pathological file can hold up
//! the batch; since the crate carries no async runtime, the timeout is
//! enforced with a scoped worker thread and a channel `recv_timeout`
//! (spec §4.7 failure model: a timed-out file is reported, not fatal).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::time::Duration;

use rayon::prelude::*;

use crate::errors::CoreError;
use crate::features::ast_analyzer::{analyze_module, FunctionFacts, FunctionInput};
use crate::features::node_id::{parse_id, IdStrategy};
use crate::shared::models::{Function, FunctionKey, Module, ProgressEvent, Visibility};
use crate::shared::ports::{AstProvider, EngineConfig, FileSystemPort, ParsedFunction, RepositoryPort};
use crate::shared::utils::block_on;

/// Outcome of one full-project population pass (spec §4.7).
#[derive(Debug, Default)]
pub struct PopulateReport {
    pub files_discovered: usize,
    pub files_analyzed: usize,
    pub functions_analyzed: usize,
    /// Per-file or per-function failures collected rather than aborting
    /// the batch (spec §4.7 Failure model).
    pub errors: Vec<CoreError>,
}

struct FileOutcome {
    module: Option<Module>,
    function_count: usize,
    errors: Vec<CoreError>,
}

/// Runs the bulk population pass over every file `fs.discover` finds under
/// `root`, committing each analyzed module via `repository`. `on_progress`
/// is invoked once per file, in discovery order, after that file's result
/// (success or failure) is known — not necessarily in parallel completion
/// order (spec §4.7 progress callback).
pub fn populate(
    repository: &dyn RepositoryPort,
    fs: &dyn FileSystemPort,
    ast_provider: &dyn AstProvider,
    config: &EngineConfig,
    root: &str,
    mut on_progress: impl FnMut(ProgressEvent),
) -> Result<PopulateReport, CoreError> {
    let files = fs.discover(root, &config.include_globs, &config.ignore_globs)?;
    let total = files.len();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.worker_count.max(1))
        .build()
        .map_err(|e| CoreError::Resource(format!("failed to build worker pool: {e}")))?;

    let processed = AtomicUsize::new(0);
    let outcomes: Vec<FileOutcome> = pool.install(|| {
        files
            .par_iter()
            .map(|path| {
                let outcome = analyze_file_with_timeout(path, fs, ast_provider, config);
                processed.fetch_add(1, Ordering::Relaxed);
                outcome
            })
            .collect()
    });

    let mut report = PopulateReport { files_discovered: total, ..Default::default() };
    for (path, outcome) in files.iter().zip(outcomes.into_iter()) {
        report.functions_analyzed += outcome.function_count;
        report.errors.extend(outcome.errors);
        if let Some(module) = outcome.module {
            report.files_analyzed += 1;
            if let Err(e) = block_on(repository.upsert_module(module)) {
                report.errors.push(e);
            }
        }
        on_progress(ProgressEvent {
            processed: report.files_analyzed + report.errors.len(),
            total,
            current_file: path.clone(),
        });
    }

    Ok(report)
}

fn analyze_file_with_timeout(path: &str, fs: &dyn FileSystemPort, ast_provider: &dyn AstProvider, config: &EngineConfig) -> FileOutcome {
    let (tx, rx) = mpsc::channel();
    let timeout = Duration::from_secs(config.analysis_timeout_secs);

    std::thread::scope(|scope| {
        scope.spawn(|| {
            let result = analyze_file(path, fs, ast_provider, config.id_strategy);
            let _ = tx.send(result);
        });

        match rx.recv_timeout(timeout) {
            Ok(Ok((module, function_count))) => FileOutcome { module: Some(module), function_count, errors: Vec::new() },
            Ok(Err(errors)) => FileOutcome { module: None, function_count: 0, errors },
            Err(_) => FileOutcome {
                module: None,
                function_count: 0,
                errors: vec![CoreError::Resource(format!(
                    "analysis of {path} exceeded {}s timeout",
                    config.analysis_timeout_secs
                ))],
            },
        }
    })
}

/// Reads, parses and analyzes one file end to end. A parse failure fails
/// the whole file (one `CoreError::Parse`); per-function analysis
/// failures are collected alongside whatever functions did succeed, and
/// the module is still committed with those (spec §4.7: a bad clause
/// doesn't sink its module).
fn analyze_file(path: &str, fs: &dyn FileSystemPort, ast_provider: &dyn AstProvider, id_strategy: IdStrategy) -> Result<(Module, usize), Vec<CoreError>> {
    let bytes = fs.read(path).map_err(|e| vec![e])?;
    let parsed = ast_provider.parse(&bytes, path).map_err(|e| vec![e])?;
    let file_hash = crate::shared::utils::content_hash(&bytes);

    let inputs: Vec<FunctionInput> = parsed
        .functions
        .into_iter()
        .map(|f: ParsedFunction| {
            let span = f.body.metadata().span;
            FunctionInput {
                key: FunctionKey::new(&parsed.module_name, &f.name, f.arity),
                is_public: f.is_public,
                parameters: f.parameters,
                guards: f.guards,
                body: f.body,
                span,
            }
        })
        .collect();

    let (facts, errors) = analyze_module(inputs, Vec::new(), Vec::new(), Vec::new(), Vec::new(), Default::default(), Vec::new(), id_strategy);

    let function_count = facts.functions.len();
    let mut module = Module::new(parsed.module_name, path, file_hash);
    module.module_complexity = facts.module_complexity;
    module.functions = facts.functions.into_iter().filter_map(|f| function_from_facts(f)).collect();

    if module.functions.is_empty() && !errors.is_empty() {
        Err(errors)
    } else {
        Ok((module, function_count))
    }
}

fn function_from_facts(facts: FunctionFacts) -> Option<Function> {
    let parsed_id = parse_id(&facts.ast_id)?;
    let key = FunctionKey::new(parsed_id.module, parsed_id.function, parsed_id.arity);
    let visibility = if facts.is_public { Visibility::Public } else { Visibility::Private };
    let content_hash = crate::shared::utils::content_hash(format!("{:?}", facts.body).as_bytes());

    let mut function = Function::new(key, visibility, facts.parameters, facts.body, facts.span, content_hash);
    function.head_guards = facts.head_guards;
    function.ast_node_count = facts.clauses + facts.pattern_matches;
    function.direct_calls = facts.direct_calls;
    function.complexity_preliminary = facts.complexity_preliminary;
    Some(function)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::{Ast, AstMetadata, Span};
    use crate::shared::ports::ParsedModule;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    struct FakeFs {
        files: BTreeMap<String, Vec<u8>>,
    }

    impl FileSystemPort for FakeFs {
        fn read(&self, file_path: &str) -> Result<Vec<u8>, CoreError> {
            self.files.get(file_path).cloned().ok_or_else(|| CoreError::Io {
                path: file_path.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
            })
        }

        fn discover(&self, _root: &str, _include: &[String], _ignore: &[String]) -> Result<Vec<String>, CoreError> {
            Ok(self.files.keys().cloned().collect())
        }
    }

    struct FakeProvider;

    impl AstProvider for FakeProvider {
        fn parse(&self, _source: &[u8], _file_path: &str) -> Result<ParsedModule, CoreError> {
            Ok(ParsedModule {
                module_name: "Sample".to_string(),
                functions: vec![crate::shared::ports::ParsedFunction {
                    name: "run".to_string(),
                    arity: 0,
                    is_public: true,
                    parameters: vec![],
                    guards: vec![],
                    body: Ast::Constructor { kind: "block".to_string(), children: vec![], metadata: AstMetadata::new(Span::zero()) },
                }],
            })
        }
    }

    struct FakeRepository {
        modules: Mutex<Vec<Module>>,
    }

    #[async_trait::async_trait]
    impl RepositoryPort for FakeRepository {
        async fn upsert_module(&self, module: Module) -> Result<(), CoreError> {
            self.modules.lock().unwrap().push(module);
            Ok(())
        }
        async fn remove_module(&self, _file_path: &str) -> Result<(), CoreError> {
            Ok(())
        }
        async fn rename_module(&self, _old_path: &str, _new_path: &str) -> Result<(), CoreError> {
            Ok(())
        }
        async fn content_hash(&self, _file_path: &str) -> Option<String> {
            None
        }
    }

    #[test]
    fn populate_commits_every_discovered_file() {
        let mut files = BTreeMap::new();
        files.insert("a.ex".to_string(), b"defmodule Sample do end".to_vec());
        files.insert("b.ex".to_string(), b"defmodule Sample do end".to_vec());
        let fs = FakeFs { files };
        let provider = FakeProvider;
        let repo = FakeRepository { modules: Mutex::new(Vec::new()) };
        let config = EngineConfig::default();

        let report = populate(&repo, &fs, &provider, &config, ".", |_| {}).unwrap();

        assert_eq!(report.files_discovered, 2);
        assert_eq!(report.files_analyzed, 2);
        assert_eq!(report.functions_analyzed, 2);
        assert_eq!(repo.modules.lock().unwrap().len(), 2);
    }

    #[test]
    fn missing_file_is_reported_not_fatal() {
        let fs = FakeFs { files: BTreeMap::new() };
        let provider = FakeProvider;
        let repo = FakeRepository { modules: Mutex::new(Vec::new()) };
        let config = EngineConfig::default();

        let report = populate(&repo, &fs, &provider, &config, ".", |_| {}).unwrap();
        assert_eq!(report.files_discovered, 0);
    }
}
