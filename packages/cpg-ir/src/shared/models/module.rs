//! Module entity (spec §3).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::function::Function;

/// A named compilation unit bound to a source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    pub file_path: String,
    /// Cryptographic digest of the file bytes (see `shared::utils::content_hash`).
    /// Equal hash implies no re-analysis is needed.
    pub content_hash: String,
    pub functions: Vec<Function>,
    pub imports: Vec<String>,
    pub aliases: Vec<String>,
    pub requires: Vec<String>,
    pub uses: Vec<String>,
    pub attributes: BTreeMap<String, serde_json::Value>,
    pub implemented_protocols: Vec<String>,
    pub module_complexity: u32,
    pub last_analyzed: DateTime<Utc>,
}

impl Module {
    pub fn new(name: impl Into<String>, file_path: impl Into<String>, content_hash: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file_path: file_path.into(),
            content_hash: content_hash.into(),
            functions: Vec::new(),
            imports: Vec::new(),
            aliases: Vec::new(),
            requires: Vec::new(),
            uses: Vec::new(),
            attributes: BTreeMap::new(),
            implemented_protocols: Vec::new(),
            module_complexity: 0,
            last_analyzed: Utc::now(),
        }
    }

    pub fn function(&self, name: &str, arity: usize) -> Option<&Function> {
        self.functions
            .iter()
            .find(|f| f.key.name == name && f.key.arity == arity)
    }
}

/// `(module, name, arity)` — the stable identity of a `Function` (spec §3).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FunctionKey {
    pub module: String,
    pub name: String,
    pub arity: usize,
}

impl FunctionKey {
    pub fn new(module: impl Into<String>, name: impl Into<String>, arity: usize) -> Self {
        Self {
            module: module.into(),
            name: name.into(),
            arity,
        }
    }

    /// The `M.F/A` string used as a symbolic call target (spec §3 Ownership,
    /// §4.5 phase 4).
    pub fn mfa(&self) -> String {
        format!("{}.{}/{}", self.module, self.name, self.arity)
    }
}

impl std::fmt::Display for FunctionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.mfa())
    }
}
