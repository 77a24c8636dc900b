//! Query Executor spec types (spec §4.9).

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryFrom {
    Modules,
    Functions,
    CpgNodes,
    CallReferences,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
    Nin,
    Contains,
    StartsWith,
    EndsWith,
    MatchesRegex,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhereClause {
    pub field_path: String,
    pub op: CompareOp,
    pub value: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderBy {
    pub field_path: String,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Select {
    All,
    Fields(Vec<String>),
}

/// A structural pattern over CPG node/edge types, evaluated only when
/// `from == CpgNodes` (spec §4.9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CpgPattern {
    pub node_type: Option<String>,
    pub edge_kind: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuerySpec {
    pub from: QueryFrom,
    #[serde(default)]
    pub r#where: Vec<WhereClause>,
    #[serde(default)]
    pub order_by: Vec<OrderBy>,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
    #[serde(default = "default_select")]
    pub select: Select,
    pub cpg_pattern: Option<CpgPattern>,
}

fn default_select() -> Select {
    Select::All
}

impl QuerySpec {
    pub fn new(from: QueryFrom) -> Self {
        Self {
            from,
            r#where: Vec::new(),
            order_by: Vec::new(),
            offset: None,
            limit: None,
            select: Select::All,
            cpg_pattern: None,
        }
    }
}
