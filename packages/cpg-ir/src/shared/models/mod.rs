//! Shared data-model types (spec §3), reused by every feature.

pub mod ast;
pub mod cfg;
pub mod cpg;
pub mod dfg;
pub mod events;
pub mod function;
pub mod module;
pub mod query;
pub mod scope;
pub mod span;

pub use ast::{Ast, AstMetadata, Callee, LiteralKind};
pub use cfg::{Cfg, CfgEdge, CfgEdgeKind, CfgMetadata, CfgNode, CfgNodeKind, ComplexityMetrics, ConditionLabel};
pub use cpg::{AstPayload, Cpg, CpgEdge, CpgEdgeKind, CpgIndexes, CpgNode, CpgNodeType, CfgPayload, DfgPayload, NodeMappingTables};
pub use dfg::{DataFlowEdge, DataFlowKind, Definition, DefinitionKind, Dfg, DfgAnalyses, PhiNode, Use, UseKind, VariableVersion, PHANTOM_VERSION};
pub use events::{FileChangeEvent, FileChangeKind, ProgressEvent};
pub use function::{CallSite, ComplexityPreliminary, Function, ParameterPattern, Visibility};
pub use module::{FunctionKey, Module};
pub use query::{CompareOp, CpgPattern, OrderBy, QueryFrom, QuerySpec, Select, SortDirection, WhereClause};
pub use scope::{Scope, ScopeKind, ScopeTree};
pub use span::{Location, Span};
