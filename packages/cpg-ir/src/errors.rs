//! Error taxonomy (spec §7).
//!
//! File- and function-scoped errors are recovered locally by the caller
//! (Populator/Synchronizer/AST Analyzer accumulate them in a batch result);
//! they are never raised across a batch boundary. Query errors are returned
//! to the caller and never mutate state.

use thiserror::Error;

/// A file/line/column locator, attached to parse errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocator {
    pub file_path: String,
    pub line: u32,
    pub column: u32,
}

impl std::fmt::Display for SourceLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file_path, self.line, self.column)
    }
}

/// A `(module, function, arity)` locator, attached to analysis errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionLocator {
    pub module: String,
    pub function: String,
    pub arity: usize,
}

impl std::fmt::Display for FunctionLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}/{}", self.module, self.function, self.arity)
    }
}

/// Every error the core produces carries a stable machine-readable kind
/// (the enum variant) plus a locator where applicable (spec §7).
#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed source; associated with a file/line/column (C2, C7).
    #[error("parse error at {locator}: {message}")]
    Parse { locator: SourceLocator, message: String },

    /// Structural pattern unsupported or invariant-violating AST;
    /// associated with a function key (C2-C5).
    #[error("analysis error in {locator}: {message}")]
    Analysis { locator: FunctionLocator, message: String },

    /// Use of an undefined name — a phantom definition, version -1 (C4).
    #[error("unresolved name `{name}` in {locator}")]
    Resolution { locator: FunctionLocator, name: String },

    /// Timeout, memory budget exceeded, or cancellation (C5, C7, C8).
    #[error("resource error: {0}")]
    Resource(String),

    /// Repository upsert/delete failure; should be rare (C6).
    #[error("storage error: {0}")]
    Storage(String),

    /// Unknown field, invalid regex, or unsupported `from` target (C9).
    #[error("query error: {0}")]
    Query(String),

    /// I/O failure reading a source file (spec §6 `FileSystemPort`).
    #[error("io error reading {path}: {source}")]
    Io { path: String, #[source] source: std::io::Error },
}

impl CoreError {
    pub fn parse(file_path: impl Into<String>, line: u32, column: u32, message: impl Into<String>) -> Self {
        CoreError::Parse {
            locator: SourceLocator { file_path: file_path.into(), line, column },
            message: message.into(),
        }
    }

    pub fn analysis(module: impl Into<String>, function: impl Into<String>, arity: usize, message: impl Into<String>) -> Self {
        CoreError::Analysis {
            locator: FunctionLocator { module: module.into(), function: function.into(), arity },
            message: message.into(),
        }
    }

    pub fn resolution(module: impl Into<String>, function: impl Into<String>, arity: usize, name: impl Into<String>) -> Self {
        CoreError::Resolution {
            locator: FunctionLocator { module: module.into(), function: function.into(), arity },
            name: name.into(),
        }
    }

    /// The stable machine-readable kind string (spec §7 "stable
    /// machine-readable kind").
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::Parse { .. } => "parse_error",
            CoreError::Analysis { .. } => "analysis_error",
            CoreError::Resolution { .. } => "resolution_error",
            CoreError::Resource(_) => "resource_error",
            CoreError::Storage(_) => "storage_error",
            CoreError::Query(_) => "query_error",
            CoreError::Io { .. } => "io_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_is_stable_per_variant() {
        let e = CoreError::parse("a.ex", 3, 1, "unexpected token");
        assert_eq!(e.kind(), "parse_error");
    }

    #[test]
    fn locator_display_is_mfa() {
        let locator = FunctionLocator { module: "M".into(), function: "f".into(), arity: 1 };
        assert_eq!(locator.to_string(), "M.f/1");
    }
}
