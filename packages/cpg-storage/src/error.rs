//! Error taxonomy for the repository (spec §7: storage errors "should be
//! rare; typically infrastructure").

use std::fmt;

use thiserror::Error;

/// Storage error kinds — the stable machine-readable tag spec §7 requires
/// every error to carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No module stored at the given name or file path.
    ModuleNotFound,
    /// No function stored at the given `(module, name, arity)`.
    FunctionNotFound,
    /// Upsert/delete touched primary storage and an index inconsistently;
    /// should never actually happen given the write path in `repository.rs`.
    Transaction,
    /// Snapshot (de)serialization failure.
    Serialization,
    /// Graph construction (C3-C5) failed while the repository tried to
    /// build a missing CFG/DFG/CPG lazily.
    GraphConstruction,
    Config,
    IO,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ModuleNotFound => "module_not_found",
            ErrorKind::FunctionNotFound => "function_not_found",
            ErrorKind::Transaction => "transaction",
            ErrorKind::Serialization => "serialization",
            ErrorKind::GraphConstruction => "graph_construction",
            ErrorKind::Config => "config",
            ErrorKind::IO => "io",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Storage error type
#[derive(Debug, Error)]
#[error("[{kind}] {message}")]
pub struct StorageError {
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
    pub kind: ErrorKind,
    pub message: String,
}

impl StorageError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), source: None }
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn module_not_found(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(ErrorKind::ModuleNotFound, format!("module not found: {name}"))
    }

    pub fn function_not_found(key: impl fmt::Display) -> Self {
        Self::new(ErrorKind::FunctionNotFound, format!("function not found: {key}"))
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Serialization, message)
    }

    pub fn transaction(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transaction, message)
    }

    pub fn graph_construction(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::GraphConstruction, message)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::serialization(format!("JSON error: {err}")).with_source(err)
    }
}

/// Allows a `StorageError` to cross into `cpg_ir::CoreError::Storage`
/// (spec §7: storage errors propagate to the caller, never silently).
impl From<StorageError> for cpg_ir::CoreError {
    fn from(err: StorageError) -> Self {
        cpg_ir::CoreError::Storage(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_and_message() {
        let err = StorageError::module_not_found("Sample");
        let msg = format!("{err}");
        assert!(msg.contains("module_not_found"));
        assert!(msg.contains("Sample"));
    }

    #[test]
    fn converts_into_core_error() {
        let err = StorageError::function_not_found("M.f/1");
        let core: cpg_ir::CoreError = err.into();
        assert_eq!(core.kind(), "storage_error");
    }

    #[test]
    fn json_error_converts() {
        let bad = serde_json::from_str::<serde_json::Value>("not json");
        let err: StorageError = bad.unwrap_err().into();
        assert_eq!(err.kind, ErrorKind::Serialization);
    }
}
