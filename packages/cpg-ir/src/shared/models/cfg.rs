//! Control Flow Graph data model (spec §3, §4.3).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::scope::ScopeTree;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CfgNodeKind {
    Entry,
    Exit,
    Statement,
    IfCond,
    CaseEntry,
    CaseClause,
    CondEntry,
    CondClause,
    TryEntry,
    RescueClause,
    CatchClause,
    AfterBlock,
    Call,
    Pipe,
    AnonFnDef,
    /// Synthetic join node.
    Merge,
    /// Present only if loops are modeled for the function's source shape.
    LoopBack,
}

impl CfgNodeKind {
    pub fn is_synthetic(&self) -> bool {
        matches!(self, CfgNodeKind::Merge)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionLabel {
    True,
    False,
    Label(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CfgEdgeKind {
    Sequential,
    Conditional,
    PatternMatch,
    GuardTrue,
    GuardFalse,
    Exception,
    LoopBack,
    LoopExit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CfgNode {
    pub id: String,
    pub kind: CfgNodeKind,
    /// `None` for synthetic nodes such as `merge`.
    pub ast_id: Option<String>,
    pub line: u32,
    pub scope_id: u32,
    /// Short human-readable rendering of the node's expression, for
    /// diagnostics and CPG node labels.
    pub expression: String,
    pub predecessors: Vec<String>,
    pub successors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CfgEdge {
    pub from: String,
    pub to: String,
    pub kind: CfgEdgeKind,
    pub condition: Option<ConditionLabel>,
    pub probability: Option<f64>,
}

impl CfgEdge {
    pub fn new(from: impl Into<String>, to: impl Into<String>, kind: CfgEdgeKind) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            kind,
            condition: None,
            probability: None,
        }
    }

    pub fn conditional(from: impl Into<String>, to: impl Into<String>, label: ConditionLabel) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            kind: CfgEdgeKind::Conditional,
            condition: Some(label),
            probability: None,
        }
    }
}

/// Complexity metrics produced alongside a CFG (spec §4.3).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ComplexityMetrics {
    pub cyclomatic: u32,
    pub cognitive: u32,
    pub nesting_depth: u32,
    pub max_pipe_chain_length: u32,
    pub guard_count: u32,
    pub pattern_count: u32,
}

impl ComplexityMetrics {
    /// `max(0, 100 - 2*cyclomatic - cognitive - 5*nesting)` (spec §4.3).
    pub fn maintainability_score(&self) -> i64 {
        let raw = 100
            - 2 * self.cyclomatic as i64
            - self.cognitive as i64
            - 5 * self.nesting_depth as i64;
        raw.max(0)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CfgMetadata {
    pub warnings: Vec<String>,
    /// Nested CFGs for anonymous function literals, keyed by their
    /// `anon_fn_def` CFG node id. Not embedded in the outer `edges` list
    /// (spec §4.3: "a separate CFG ... stored alongside").
    pub nested_cfgs: BTreeMap<String, Cfg>,
}

/// A function's Control Flow Graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cfg {
    pub entry: String,
    pub exits: Vec<String>,
    pub nodes: Vec<CfgNode>,
    pub edges: Vec<CfgEdge>,
    pub scopes: ScopeTree,
    pub complexity_metrics: ComplexityMetrics,
    pub metadata: CfgMetadata,
}

impl Cfg {
    pub fn node(&self, id: &str) -> Option<&CfgNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edges_from(&self, id: &str) -> impl Iterator<Item = &CfgEdge> {
        self.edges.iter().filter(move |e| e.from == id)
    }

    pub fn edges_to(&self, id: &str) -> impl Iterator<Item = &CfgEdge> {
        self.edges.iter().filter(move |e| e.to == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maintainability_clamps_at_zero() {
        let metrics = ComplexityMetrics {
            cyclomatic: 100,
            cognitive: 100,
            nesting_depth: 100,
            ..Default::default()
        };
        assert_eq!(metrics.maintainability_score(), 0);
    }

    #[test]
    fn maintainability_for_trivial_function() {
        let metrics = ComplexityMetrics {
            cyclomatic: 1,
            cognitive: 0,
            nesting_depth: 0,
            ..Default::default()
        };
        assert_eq!(metrics.maintainability_score(), 98);
    }
}
