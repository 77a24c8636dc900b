//! SSA Data Flow Graph data model (spec §3, §4.4).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::ast::Ast;
use super::scope::ScopeTree;

/// A version number of `-1` marks a phantom (unresolved) version — the
/// lookup walked to the function root and found nothing (spec §4.4 scoping).
pub const PHANTOM_VERSION: i64 = -1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableVersion {
    pub original_name: String,
    pub version: i64,
    pub ssa_name: String,
    pub scope_id: u32,
    pub defining_node_id: String,
    pub is_parameter: bool,
    pub is_captured: bool,
}

impl VariableVersion {
    pub fn ssa_name_for(original_name: &str, version: i64) -> String {
        format!("{original_name}_{version}")
    }

    pub fn is_phantom(&self) -> bool {
        self.version == PHANTOM_VERSION
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DefinitionKind {
    Parameter,
    Assignment,
    PatternMatch,
    Phi,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Definition {
    /// The `ssa_name` of the `VariableVersion` this definition introduces.
    pub variable_version: String,
    pub ast_id: String,
    pub kind: DefinitionKind,
    pub source_expr_ast: Option<Ast>,
    pub line: u32,
    pub scope_id: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UseKind {
    Read,
    ClosureCapture,
    PatternGuard,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Use {
    pub variable_version: String,
    pub ast_id: String,
    pub kind: UseKind,
    pub line: u32,
    pub scope_id: u32,
    /// `ssa_name` of the reaching definition; `None` only for a phantom
    /// (unresolved name) use.
    pub reaching_definition: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataFlowKind {
    Direct,
    ThroughPhi,
    Closure,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataFlowEdge {
    pub from_def: String,
    pub to_use_ast_id: String,
    pub flow_kind: DataFlowKind,
}

/// A phi node at a control-flow merge point (spec §3, §4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhiNode {
    /// `ssa_name` of the fresh version this phi produces.
    pub target_variable: String,
    /// `ssa_name`s flowing in, one per incoming branch, `|.| >= 2`.
    pub source_variables: Vec<String>,
    pub merge_point_ast_id: String,
    pub scope_id: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DfgAnalyses {
    /// Per scope id, the set of variable `ssa_name`s live at scope exit.
    pub liveness: BTreeMap<u32, Vec<String>>,
    /// `ssa_name`s of definitions with zero reaching uses.
    pub unused_definitions: Vec<String>,
    /// `ast_id`s of uses whose reaching definition is a phantom version.
    pub uninitialized_uses: Vec<String>,
}

/// A function's SSA Data Flow Graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dfg {
    pub variables_by_name: BTreeMap<String, Vec<VariableVersion>>,
    pub definitions: Vec<Definition>,
    pub uses: Vec<Use>,
    pub data_flows: Vec<DataFlowEdge>,
    pub phi_nodes: Vec<PhiNode>,
    pub scopes: ScopeTree,
    pub analyses: DfgAnalyses,
}

impl Dfg {
    pub fn definition(&self, ssa_name: &str) -> Option<&Definition> {
        self.definitions.iter().find(|d| d.variable_version == ssa_name)
    }

    pub fn phi(&self, ssa_name: &str) -> Option<&PhiNode> {
        self.phi_nodes.iter().find(|p| p.target_variable == ssa_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ssa_name_format_matches_spec() {
        assert_eq!(VariableVersion::ssa_name_for("x", 2), "x_2");
    }

    #[test]
    fn phantom_version_is_detected() {
        let v = VariableVersion {
            original_name: "y".into(),
            version: PHANTOM_VERSION,
            ssa_name: "y_-1".into(),
            scope_id: 0,
            defining_node_id: String::new(),
            is_parameter: false,
            is_captured: false,
        };
        assert!(v.is_phantom());
    }
}
