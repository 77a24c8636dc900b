//! Code Property Graph data model (spec §3, §4.5).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpgNodeType {
    Ast,
    CfgSynthetic,
    DfgPhiSynthetic,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AstPayload {
    pub ast_kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CfgPayload {
    pub cfg_kind: String,
    pub cfg_id: String,
    pub expression: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DfgPayload {
    /// `ssa_name`s defined at this node.
    pub definitions: Vec<String>,
    /// `ssa_name`s used at this node.
    pub uses: Vec<String>,
}

/// A CPG node. A single node may carry payloads from more than one layer
/// when one syntactic location plays more than one role (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CpgNode {
    pub id: String,
    pub node_type: CpgNodeType,
    pub label: String,
    pub ast_payload: Option<AstPayload>,
    pub cfg_payload: Option<CfgPayload>,
    pub dfg_payload: Option<DfgPayload>,
    pub line: u32,
    pub source_snippet: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpgEdgeKind {
    AstChild,
    CfgFlow,
    CfgConditional,
    CfgPatternMatch,
    CfgException,
    CfgLoopBack,
    CfgLoopExit,
    DfgReaches,
    DfgPhiInput,
    DfgPhiOutput,
    /// Symbolic call edge; `to` is not a node id but a `"func_target:M.F/A"`
    /// string (spec §3 Ownership, §4.5 phase 4).
    Call,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CpgEdge {
    pub from: String,
    pub to: String,
    pub kind: CpgEdgeKind,
    pub label: String,
    pub properties: BTreeMap<String, serde_json::Value>,
    /// `true` only for `Call` edges, whose `to` is a symbolic MFA string
    /// rather than an in-graph node id (spec §4.5 invariants).
    pub symbolic: bool,
    /// `true` once a repository-level post-pass has confirmed the
    /// symbolic `to` MFA names a function that actually exists (spec §5
    /// "eventual... re-running the symbolic-call-resolution pass after
    /// each module write", §9 "a repository-level resolution pass may
    /// materialize [symbolic call edges]"). Always `false` for non-`Call`
    /// edges and for freshly-fused CPGs that haven't been resolved yet.
    #[serde(default)]
    pub resolved: bool,
}

impl CpgEdge {
    pub fn new(from: impl Into<String>, to: impl Into<String>, kind: CpgEdgeKind) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            kind,
            label: String::new(),
            properties: BTreeMap::new(),
            symbolic: false,
            resolved: false,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn symbolic_call(from: impl Into<String>, target_mfa: &str) -> Self {
        Self {
            from: from.into(),
            to: format!("func_target:{target_mfa}"),
            kind: CpgEdgeKind::Call,
            label: "call".to_string(),
            properties: BTreeMap::new(),
            symbolic: true,
            resolved: false,
        }
    }

    /// The bare `"M.F/A"` this symbolic `Call` edge targets, stripped of
    /// its `func_target:` prefix. `None` for non-symbolic or non-`Call`
    /// edges.
    pub fn symbolic_target_mfa(&self) -> Option<&str> {
        if self.symbolic {
            self.to.strip_prefix("func_target:")
        } else {
            None
        }
    }
}

/// Joins a `(ssa_name, ast_id)` pair into the single string key
/// `definition_to_cpg_id`/`use_to_cpg_id` are keyed by. A tuple key would
/// round-trip through `serde_json` as a 2-element array, not a map key, so
/// the tables use this composite string instead (spec §3 round-trip
/// requirement on repository snapshots).
pub fn mapping_key(ssa_name: &str, ast_id: &str) -> String {
    format!("{ssa_name}|{ast_id}")
}

/// Node mapping tables inside a CPG (spec §3). Every CFG node and every SSA
/// definition/use/phi must appear here; orphans are a bug (§4.5 invariants).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeMappingTables {
    pub ast_id_to_cpg_id: BTreeMap<String, String>,
    pub cfg_node_id_to_cpg_id: BTreeMap<String, String>,
    /// Keyed by [`mapping_key`]`(ssa_name, ast_id)`.
    pub definition_to_cpg_id: BTreeMap<String, String>,
    pub use_to_cpg_id: BTreeMap<String, String>,
    pub phi_to_cpg_id: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CpgIndexes {
    pub by_type: BTreeMap<String, Vec<String>>,
    pub by_label_prefix: BTreeMap<String, Vec<String>>,
}

/// A function's unified Code Property Graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cpg {
    pub nodes: Vec<CpgNode>,
    pub edges: Vec<CpgEdge>,
    pub mappings: NodeMappingTables,
    pub indexes: CpgIndexes,
}

impl Cpg {
    pub fn node(&self, id: &str) -> Option<&CpgNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_by_ast_id(&self, ast_id: &str) -> Option<&CpgNode> {
        self.mappings
            .ast_id_to_cpg_id
            .get(ast_id)
            .and_then(|id| self.node(id))
    }

    pub fn by_line_range(&self, start: u32, end: u32) -> Vec<&CpgNode> {
        self.nodes
            .iter()
            .filter(|n| n.line >= start && n.line <= end)
            .collect()
    }
}
