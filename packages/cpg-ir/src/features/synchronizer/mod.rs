//! C8 — Synchronizer (spec §4.8).
//!
//! Incremental re-analysis driven by a batch of file-change events rather
//! than a full re-walk. Events are first collapsed to their net effect per
//! path (a create immediately followed by a delete cancels out; the
//! latest event for a path wins otherwise), then each surviving event is
//! applied: `Created`/`Modified` re-run the same analysis the Populator
//! runs for one file and upsert the result, short-circuiting on an
//! unchanged content hash; `Deleted` removes the module; `Renamed` moves
//! the storage key without re-analysis when the content is unchanged, and
//! falls back to a full re-analysis at the new path otherwise.

use std::collections::BTreeMap;

use crate::errors::CoreError;
use crate::features::ast_analyzer::{analyze_module, FunctionFacts};
use crate::features::node_id::{parse_id, IdStrategy};
use crate::shared::models::{FileChangeEvent, FileChangeKind, Function, FunctionKey, Module, Visibility};
use crate::shared::ports::{AstProvider, EngineConfig, FileSystemPort, ParsedFunction, RepositoryPort};
use crate::shared::utils::block_on;

/// Outcome of one synchronization batch (spec §4.8).
#[derive(Debug, Default)]
pub struct SyncReport {
    pub events_received: usize,
    pub events_applied: usize,
    pub modules_updated: usize,
    pub modules_removed: usize,
    pub unchanged_skipped: usize,
    pub errors: Vec<CoreError>,
}

/// Collapses a batch of events to one net event per path (spec §4.8 event
/// collapsing/idempotence): keeps the last-observed event for each path,
/// except a `Created` that is later `Deleted` within the same batch
/// cancels out entirely (nothing to apply for that path).
pub fn collapse_events(events: Vec<FileChangeEvent>) -> Vec<FileChangeEvent> {
    let mut by_path: BTreeMap<String, FileChangeEvent> = BTreeMap::new();
    let mut created_in_batch: BTreeMap<String, bool> = BTreeMap::new();

    for event in events {
        let path = event.path.clone();
        if matches!(event.kind, FileChangeKind::Created) {
            created_in_batch.insert(path.clone(), true);
        }
        if matches!(event.kind, FileChangeKind::Deleted) && created_in_batch.get(&path).copied().unwrap_or(false) {
            by_path.remove(&path);
            created_in_batch.remove(&path);
            continue;
        }
        by_path.insert(path, event);
    }

    by_path.into_values().collect()
}

/// Applies a batch of file-change events against the repository.
pub fn synchronize(
    repository: &dyn RepositoryPort,
    fs: &dyn FileSystemPort,
    ast_provider: &dyn AstProvider,
    config: &EngineConfig,
    events: Vec<FileChangeEvent>,
) -> SyncReport {
    let events_received = events.len();
    let collapsed = collapse_events(events);

    let mut report = SyncReport { events_received, ..Default::default() };

    for event in collapsed {
        report.events_applied += 1;
        match event.kind {
            FileChangeKind::Deleted => match block_on(repository.remove_module(&event.path)) {
                Ok(()) => report.modules_removed += 1,
                Err(e) => report.errors.push(e),
            },
            FileChangeKind::Renamed => {
                let old_path = event.old_path.clone().unwrap_or_else(|| event.path.clone());
                match block_on(repository.rename_module(&old_path, &event.path)) {
                    Ok(()) => report.modules_updated += 1,
                    Err(e) => {
                        // Rename failed (e.g. nothing stored at old_path yet);
                        // fall back to a full analysis at the new path.
                        report.errors.push(e);
                        apply_created_or_modified(repository, fs, ast_provider, config, &event.path, &mut report);
                    }
                }
            }
            FileChangeKind::Created | FileChangeKind::Modified => {
                apply_created_or_modified(repository, fs, ast_provider, config, &event.path, &mut report);
            }
        }
    }

    report
}

fn apply_created_or_modified(
    repository: &dyn RepositoryPort,
    fs: &dyn FileSystemPort,
    ast_provider: &dyn AstProvider,
    config: &EngineConfig,
    path: &str,
    report: &mut SyncReport,
) {
    let bytes = match fs.read(path) {
        Ok(b) => b,
        Err(e) => {
            report.errors.push(e);
            return;
        }
    };
    let new_hash = crate::shared::utils::content_hash(&bytes);
    if block_on(repository.content_hash(path)).as_deref() == Some(new_hash.as_str()) {
        report.unchanged_skipped += 1;
        return;
    }

    match analyze_file_bytes(path, &bytes, ast_provider, config.id_strategy) {
        Ok(module) => match block_on(repository.upsert_module(module)) {
            Ok(()) => report.modules_updated += 1,
            Err(e) => report.errors.push(e),
        },
        Err(mut errors) => report.errors.append(&mut errors),
    }
}

fn analyze_file_bytes(path: &str, bytes: &[u8], ast_provider: &dyn AstProvider, id_strategy: IdStrategy) -> Result<Module, Vec<CoreError>> {
    let parsed = ast_provider.parse(bytes, path).map_err(|e| vec![e])?;
    let file_hash = crate::shared::utils::content_hash(bytes);

    let inputs = parsed
        .functions
        .into_iter()
        .map(|f: ParsedFunction| {
            let span = f.body.metadata().span;
            crate::features::ast_analyzer::FunctionInput {
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

    let mut module = Module::new(parsed.module_name, path, file_hash);
    module.module_complexity = facts.module_complexity;
    module.functions = facts.functions.into_iter().filter_map(function_from_facts).collect();

    if module.functions.is_empty() && !errors.is_empty() {
        Err(errors)
    } else {
        Ok(module)
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

    fn event(path: &str, kind: FileChangeKind) -> FileChangeEvent {
        match kind {
            FileChangeKind::Created => FileChangeEvent::created(path),
            FileChangeKind::Modified => FileChangeEvent::modified(path),
            FileChangeKind::Deleted => FileChangeEvent::deleted(path),
            FileChangeKind::Renamed => FileChangeEvent::renamed(path, path),
        }
    }

    #[test]
    fn create_then_delete_in_same_batch_cancels_out() {
        let events = vec![event("a.ex", FileChangeKind::Created), event("a.ex", FileChangeKind::Deleted)];
        let collapsed = collapse_events(events);
        assert!(collapsed.is_empty());
    }

    #[test]
    fn repeated_modifications_collapse_to_one_event() {
        let events = vec![event("a.ex", FileChangeKind::Modified), event("a.ex", FileChangeKind::Modified)];
        let collapsed = collapse_events(events);
        assert_eq!(collapsed.len(), 1);
    }

    #[test]
    fn distinct_paths_are_kept_independently() {
        let events = vec![event("a.ex", FileChangeKind::Modified), event("b.ex", FileChangeKind::Deleted)];
        let collapsed = collapse_events(events);
        assert_eq!(collapsed.len(), 2);
    }

    #[test]
    fn modify_then_delete_keeps_the_delete() {
        let events = vec![event("a.ex", FileChangeKind::Modified), event("a.ex", FileChangeKind::Deleted)];
        let collapsed = collapse_events(events);
        assert_eq!(collapsed.len(), 1);
        assert!(matches!(collapsed[0].kind, FileChangeKind::Deleted));
    }

    use crate::shared::models::{Ast, AstMetadata, Span};
    use crate::shared::ports::ParsedModule;
    use std::collections::BTreeMap as Map;
    use std::sync::Mutex;

    struct FakeFs {
        files: Mutex<Map<String, Vec<u8>>>,
    }

    impl FileSystemPort for FakeFs {
        fn read(&self, file_path: &str) -> Result<Vec<u8>, CoreError> {
            self.files.lock().unwrap().get(file_path).cloned().ok_or_else(|| CoreError::Io {
                path: file_path.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
            })
        }
        fn discover(&self, _root: &str, _include: &[String], _ignore: &[String]) -> Result<Vec<String>, CoreError> {
            Ok(self.files.lock().unwrap().keys().cloned().collect())
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
        hashes: Mutex<Map<String, String>>,
        upserts: Mutex<usize>,
        removed: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl RepositoryPort for FakeRepository {
        async fn upsert_module(&self, module: Module) -> Result<(), CoreError> {
            self.hashes.lock().unwrap().insert(module.file_path.clone(), module.content_hash.clone());
            *self.upserts.lock().unwrap() += 1;
            Ok(())
        }
        async fn remove_module(&self, file_path: &str) -> Result<(), CoreError> {
            self.hashes.lock().unwrap().remove(file_path);
            self.removed.lock().unwrap().push(file_path.to_string());
            Ok(())
        }
        async fn rename_module(&self, old_path: &str, new_path: &str) -> Result<(), CoreError> {
            let mut hashes = self.hashes.lock().unwrap();
            match hashes.remove(old_path) {
                Some(h) => {
                    hashes.insert(new_path.to_string(), h);
                    Ok(())
                }
                None => Err(CoreError::Storage(format!("no module at {old_path}"))),
            }
        }
        async fn content_hash(&self, file_path: &str) -> Option<String> {
            self.hashes.lock().unwrap().get(file_path).cloned()
        }
    }

    #[test]
    fn modified_event_reanalyzes_and_upserts() {
        let mut files = Map::new();
        files.insert("a.ex".to_string(), b"defmodule Sample do end".to_vec());
        let fs = FakeFs { files: Mutex::new(files) };
        let repo = FakeRepository { hashes: Mutex::new(Map::new()), upserts: Mutex::new(0), removed: Mutex::new(Vec::new()) };
        let config = EngineConfig::default();

        let report = synchronize(&repo, &fs, &FakeProvider, &config, vec![FileChangeEvent::modified("a.ex")]);

        assert_eq!(report.modules_updated, 1);
        assert_eq!(*repo.upserts.lock().unwrap(), 1);
    }

    #[test]
    fn unchanged_content_hash_short_circuits() {
        let mut files = Map::new();
        files.insert("a.ex".to_string(), b"defmodule Sample do end".to_vec());
        let fs = FakeFs { files: Mutex::new(files) };
        let repo = FakeRepository { hashes: Mutex::new(Map::new()), upserts: Mutex::new(0), removed: Mutex::new(Vec::new()) };
        let config = EngineConfig::default();

        let first = synchronize(&repo, &fs, &FakeProvider, &config, vec![FileChangeEvent::modified("a.ex")]);
        assert_eq!(first.modules_updated, 1);

        let second = synchronize(&repo, &fs, &FakeProvider, &config, vec![FileChangeEvent::modified("a.ex")]);
        assert_eq!(second.unchanged_skipped, 1);
        assert_eq!(*repo.upserts.lock().unwrap(), 1);
    }

    #[test]
    fn deleted_event_removes_module() {
        let fs = FakeFs { files: Mutex::new(Map::new()) };
        let repo = FakeRepository { hashes: Mutex::new(Map::new()), upserts: Mutex::new(0), removed: Mutex::new(Vec::new()) };
        let config = EngineConfig::default();

        let report = synchronize(&repo, &fs, &FakeProvider, &config, vec![FileChangeEvent::deleted("a.ex")]);
        assert_eq!(report.modules_removed, 1);
        assert_eq!(repo.removed.lock().unwrap().as_slice(), ["a.ex"]);
    }
}
