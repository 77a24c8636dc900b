//! Function entity (spec §3).

use serde::{Deserialize, Serialize};

use super::ast::Ast;
use super::cfg::Cfg;
use super::dfg::Dfg;
use super::cpg::Cpg;
use super::module::FunctionKey;
use super::span::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    Public,
    Private,
}

/// A parameter pattern: a possibly-nested destructuring pattern that binds
/// zero or more variable names (spec §4.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterPattern {
    pub pattern_ast: Ast,
    pub bound_names: Vec<String>,
}

/// A single call recorded by the AST Analyzer (spec §4.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallSite {
    pub module: Option<String>,
    pub function: String,
    pub arity: usize,
    pub call_site_ast_id: String,
    pub line: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComplexityPreliminary {
    pub decision_points: u32,
}

/// A function, identified by `(module, name, arity)`.
///
/// Invariant (spec §3): `cfg`/`dfg`/`cpg` either all refer to the same AST or
/// are all absent — there is no API that sets one without the others, so
/// partial states are unobservable by construction (see `Function::attach_graphs`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Function {
    pub key: FunctionKey,
    pub visibility: Visibility,
    pub parameters: Vec<ParameterPattern>,
    pub head_guards: Vec<Ast>,
    pub body: Ast,
    pub span: Span,
    pub ast_node_count: usize,
    pub direct_calls: Vec<CallSite>,
    pub complexity_preliminary: ComplexityPreliminary,
    pub content_hash: String,

    cfg: Option<Cfg>,
    dfg: Option<Dfg>,
    cpg: Option<Cpg>,
}

impl Function {
    pub fn new(
        key: FunctionKey,
        visibility: Visibility,
        parameters: Vec<ParameterPattern>,
        body: Ast,
        span: Span,
        content_hash: impl Into<String>,
    ) -> Self {
        Self {
            key,
            visibility,
            parameters,
            head_guards: Vec::new(),
            body,
            span,
            ast_node_count: 0,
            direct_calls: Vec::new(),
            complexity_preliminary: ComplexityPreliminary::default(),
            content_hash: content_hash.into(),
            cfg: None,
            dfg: None,
            cpg: None,
        }
    }

    pub fn cfg(&self) -> Option<&Cfg> {
        self.cfg.as_ref()
    }

    pub fn dfg(&self) -> Option<&Dfg> {
        self.dfg.as_ref()
    }

    pub fn cpg(&self) -> Option<&Cpg> {
        self.cpg.as_ref()
    }

    pub fn has_graphs(&self) -> bool {
        self.cfg.is_some() && self.dfg.is_some() && self.cpg.is_some()
    }

    /// The only way to install computed graphs: always all three together,
    /// so a reader never observes a function with e.g. a CFG but no DFG.
    pub fn attach_graphs(&mut self, cfg: Cfg, dfg: Dfg, cpg: Cpg) {
        self.cfg = Some(cfg);
        self.dfg = Some(dfg);
        self.cpg = Some(cpg);
    }

    pub fn clear_graphs(&mut self) {
        self.cfg = None;
        self.dfg = None;
        self.cpg = None;
    }
}
