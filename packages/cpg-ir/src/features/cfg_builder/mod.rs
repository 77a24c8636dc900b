//! C3 — CFG Builder (spec §4.3).
//!
//! Produces a Control Flow Graph per function: a synthetic `entry`,
//! sequential composition by chaining exits into the next fragment's
//! entry, `if`/`case`/`cond`/`try` each modeled per the spec's
//! construction rules, and complexity metrics computed in the same
//! traversal.
//!
//! Determinism (spec §4.3): node ids embed a monotonic counter seeded from
//! the function's `ast_id`; traversal is fixed left-to-right depth-first,
//! so re-running on the same AST yields a byte-identical CFG.

use std::collections::BTreeMap;

use crate::features::ast_analyzer::count_decision_points;
use crate::shared::models::{
    Cfg, CfgEdge, CfgEdgeKind, CfgMetadata, CfgNode, CfgNodeKind, ComplexityMetrics, ConditionLabel,
    ScopeKind, ScopeTree,
};
use crate::shared::models::Ast;

/// The entry/exit ids of a built sub-CFG fragment, used to chain
/// sequential composition (spec §4.3: "the last exit(s) of the left
/// operand become the predecessors of the first node of the right").
struct Fragment {
    entry: String,
    exits: Vec<String>,
}

pub struct CfgBuilder {
    function_ast_id: String,
    nodes: Vec<CfgNode>,
    edges: Vec<CfgEdge>,
    scopes: ScopeTree,
    warnings: Vec<String>,
    counter: usize,
    /// Nested CFGs for anonymous function literals, keyed by their
    /// `anon_fn_def` node id (spec §4.3).
    nested: BTreeMap<String, Cfg>,
}

impl CfgBuilder {
    fn new(function_ast_id: &str) -> Self {
        Self {
            function_ast_id: function_ast_id.to_string(),
            nodes: Vec::new(),
            edges: Vec::new(),
            scopes: ScopeTree::new(),
            warnings: Vec::new(),
            counter: 0,
            nested: BTreeMap::new(),
        }
    }

    fn fresh_id(&mut self, kind: &str) -> String {
        let id = format!("cfg:{}:{}:{}", self.function_ast_id, kind, self.counter);
        self.counter += 1;
        id
    }

    fn push_node(&mut self, kind: CfgNodeKind, ast_id: Option<String>, line: u32, scope_id: u32, expression: impl Into<String>, tag: &str) -> String {
        let id = self.fresh_id(tag);
        self.nodes.push(CfgNode {
            id: id.clone(),
            kind,
            ast_id,
            line,
            scope_id,
            expression: expression.into(),
            predecessors: Vec::new(),
            successors: Vec::new(),
        });
        id
    }

    fn link(&mut self, from: &str, to: &str, kind: CfgEdgeKind, condition: Option<ConditionLabel>) {
        self.edges.push(CfgEdge { from: from.to_string(), to: to.to_string(), kind, condition, probability: None });
        if let Some(n) = self.nodes.iter_mut().find(|n| n.id == from) {
            n.successors.push(to.to_string());
        }
        if let Some(n) = self.nodes.iter_mut().find(|n| n.id == to) {
            n.predecessors.push(from.to_string());
        }
    }

    /// Chains every exit of `frag` into `next_entry` with a `sequential`
    /// edge (spec §4.3 sequential composition).
    fn chain(&mut self, exits: &[String], next_entry: &str) {
        for e in exits {
            self.link(e, next_entry, CfgEdgeKind::Sequential, None);
        }
    }

    /// Builds the fragment for one AST node, dispatching on its
    /// constructor kind per the spec's per-shape construction rules.
    /// Unknown shapes fall back to a generic `statement` node with a
    /// recorded warning rather than aborting (spec §4.3 Failure model).
    fn build(&mut self, ast: &Ast, scope_id: u32) -> Fragment {
        match ast {
            Ast::Constructor { kind, children, metadata } => match kind.as_str() {
                "block" => self.build_block(children, scope_id),
                "if" => self.build_if(ast, children, metadata.ast_id.clone(), metadata.span.start_line, scope_id),
                "case" => self.build_case(ast, children, metadata.ast_id.clone(), metadata.span.start_line, scope_id),
                "cond" => self.build_cond(children, metadata.ast_id.clone(), metadata.span.start_line, scope_id),
                "try" => self.build_try(children, metadata.ast_id.clone(), metadata.span.start_line, scope_id),
                "pipe" => self.build_pipe(children, metadata.ast_id.clone(), metadata.span.start_line, scope_id),
                "fn" => self.build_anon_fn(children, metadata.ast_id.clone(), metadata.span.start_line, scope_id),
                _ => self.build_statement(ast, scope_id),
            },
            Ast::Call { metadata, args, .. } => self.build_call(ast, args, metadata.ast_id.clone(), metadata.span.start_line, scope_id),
            _ => self.build_statement(ast, scope_id),
        }
    }

    fn build_statement(&mut self, ast: &Ast, scope_id: u32) -> Fragment {
        let id = self.push_node(
            CfgNodeKind::Statement,
            ast.metadata().ast_id.clone(),
            ast.line(),
            scope_id,
            ast.kind_tag(),
            "stmt",
        );
        Fragment { entry: id.clone(), exits: vec![id] }
    }

    fn build_block(&mut self, stmts: &[Ast], scope_id: u32) -> Fragment {
        if stmts.is_empty() {
            let id = self.push_node(CfgNodeKind::Statement, None, 0, scope_id, "empty_block", "stmt");
            return Fragment { entry: id.clone(), exits: vec![id] };
        }
        let mut iter = stmts.iter();
        let first = self.build(iter.next().unwrap(), scope_id);
        let mut entry = first.entry.clone();
        let mut exits = first.exits;
        for stmt in iter {
            let frag = self.build(stmt, scope_id);
            self.chain(&exits, &frag.entry);
            exits = frag.exits;
            let _ = &mut entry;
        }
        Fragment { entry, exits }
    }

    fn build_call(&mut self, _ast: &Ast, args: &[Ast], ast_id: Option<String>, line: u32, scope_id: u32) -> Fragment {
        // Evaluate arguments left-to-right as a sequential chain, then the
        // call itself (spec §4.3 Function call).
        let mut entry = None;
        let mut exits: Vec<String> = Vec::new();
        for arg in args {
            let frag = self.build(arg, scope_id);
            if entry.is_none() {
                entry = Some(frag.entry.clone());
            } else {
                self.chain(&exits, &frag.entry);
            }
            exits = frag.exits;
        }
        let call_id = self.push_node(CfgNodeKind::Call, ast_id, line, scope_id, "call", "call");
        if let Some(e) = &entry {
            self.chain(&exits, &call_id);
            Fragment { entry: e.clone(), exits: vec![call_id] }
        } else {
            Fragment { entry: call_id.clone(), exits: vec![call_id] }
        }
    }

    fn build_pipe(&mut self, children: &[Ast], ast_id: Option<String>, line: u32, scope_id: u32) -> Fragment {
        // `a |> b`: evaluate `a`, then `b` with `a` as implicit first arg
        // (spec §4.3 Pipe) — sequential composition.
        let pipe_id = self.push_node(CfgNodeKind::Pipe, ast_id, line, scope_id, "pipe", "pipe");
        if children.len() != 2 {
            self.warnings.push(format!("malformed pipe node with {} children", children.len()));
            return Fragment { entry: pipe_id.clone(), exits: vec![pipe_id] };
        }
        let left = self.build(&children[0], scope_id);
        let right = self.build(&children[1], scope_id);
        self.chain(&left.exits, &right.entry);
        self.chain(&right.exits, &pipe_id);
        Fragment { entry: left.entry, exits: vec![pipe_id] }
    }

    fn build_if(&mut self, _ast: &Ast, children: &[Ast], ast_id: Option<String>, line: u32, scope_id: u32) -> Fragment {
        let cond_id = self.push_node(CfgNodeKind::IfCond, ast_id, line, scope_id, "if", "if_cond");
        let merge_id = self.push_node(CfgNodeKind::Merge, None, line, scope_id, "merge", "merge");

        if children.len() < 2 {
            self.warnings.push("if node missing condition/then child".to_string());
            self.link(&cond_id, &merge_id, CfgEdgeKind::Conditional, Some(ConditionLabel::False));
            return Fragment { entry: cond_id, exits: vec![merge_id] };
        }

        let then_scope = self.scopes.push(ScopeKind::IfBranch, scope_id, ast_id_or_empty(&children[1]));
        let then_frag = self.build(&children[1], then_scope);
        self.link(&cond_id, &then_frag.entry, CfgEdgeKind::Conditional, Some(ConditionLabel::True));
        self.chain(&then_frag.exits, &merge_id);

        if let Some(else_ast) = children.get(2) {
            let else_scope = self.scopes.push(ScopeKind::IfBranch, scope_id, ast_id_or_empty(else_ast));
            let else_frag = self.build(else_ast, else_scope);
            self.link(&cond_id, &else_frag.entry, CfgEdgeKind::Conditional, Some(ConditionLabel::False));
            self.chain(&else_frag.exits, &merge_id);
        } else {
            // Missing else branch: implicit conditional(false) edge straight
            // to merge (spec §4.3).
            self.link(&cond_id, &merge_id, CfgEdgeKind::Conditional, Some(ConditionLabel::False));
        }

        Fragment { entry: cond_id, exits: vec![merge_id] }
    }

    fn build_case(&mut self, _ast: &Ast, children: &[Ast], ast_id: Option<String>, line: u32, scope_id: u32) -> Fragment {
        let entry_id = self.push_node(CfgNodeKind::CaseEntry, ast_id, line, scope_id, "case", "case_entry");
        let merge_id = self.push_node(CfgNodeKind::Merge, None, line, scope_id, "case_merge", "case_merge");

        // Clause order preserved in edge ordering for determinism (spec §4.3).
        for clause in children.iter().filter(|c| c.kind_tag() == "case_clause") {
            let clause_scope = self.scopes.push(ScopeKind::CaseClause, scope_id, ast_id_or_empty(clause));
            let clause_meta = clause.metadata();
            let clause_id = self.push_node(CfgNodeKind::CaseClause, clause_meta.ast_id.clone(), clause_meta.span.start_line, clause_scope, "case_clause", "case_clause");
            self.link(&entry_id, &clause_id, CfgEdgeKind::PatternMatch, None);

            let body = clause.children().last();
            if let Some(body_ast) = body {
                let body_frag = self.build(body_ast, clause_scope);
                self.link(&clause_id, &body_frag.entry, CfgEdgeKind::Sequential, None);
                self.chain(&body_frag.exits, &merge_id);
            } else {
                self.link(&clause_id, &merge_id, CfgEdgeKind::Sequential, None);
            }
        }

        Fragment { entry: entry_id, exits: vec![merge_id] }
    }

    fn build_cond(&mut self, children: &[Ast], _ast_id: Option<String>, line: u32, scope_id: u32) -> Fragment {
        let merge_id = self.push_node(CfgNodeKind::Merge, None, line, scope_id, "cond_merge", "cond_merge");
        let clauses: Vec<&Ast> = children.iter().filter(|c| c.kind_tag() == "cond_clause").collect();

        if clauses.is_empty() {
            return Fragment { entry: merge_id.clone(), exits: vec![merge_id] };
        }

        let mut first_entry = None;
        let mut prev_cond: Option<String> = None;
        for clause in &clauses {
            let clause_scope = self.scopes.push(ScopeKind::CondClause, scope_id, ast_id_or_empty(clause));
            let clause_meta = clause.metadata();
            let cond_id = self.push_node(
                CfgNodeKind::CondEntry,
                clause_meta.ast_id.clone(),
                clause_meta.span.start_line,
                clause_scope,
                "cond_clause_check",
                "cond_entry",
            );
            if first_entry.is_none() {
                first_entry = Some(cond_id.clone());
            }
            if let Some(prev) = &prev_cond {
                self.link(prev, &cond_id, CfgEdgeKind::Conditional, Some(ConditionLabel::False));
            }

            if let Some(body_ast) = clause.children().last() {
                let body_id = self.push_node(CfgNodeKind::CondClause, None, clause_meta.span.start_line, clause_scope, "cond_clause_body", "cond_clause");
                self.link(&cond_id, &body_id, CfgEdgeKind::Conditional, Some(ConditionLabel::True));
                let body_frag = self.build(body_ast, clause_scope);
                self.link(&body_id, &body_frag.entry, CfgEdgeKind::Sequential, None);
                self.chain(&body_frag.exits, &merge_id);
            }
            prev_cond = Some(cond_id);
        }
        // Final clause's false fallthrough reaches cond_merge (spec §4.3:
        // elides the runtime-error-on-no-match reality, see §9 Open Questions).
        if let Some(last) = prev_cond {
            self.link(&last, &merge_id, CfgEdgeKind::Conditional, Some(ConditionLabel::False));
        }

        Fragment { entry: first_entry.unwrap_or_else(|| merge_id.clone()), exits: vec![merge_id] }
    }

    fn build_try(&mut self, children: &[Ast], ast_id: Option<String>, line: u32, scope_id: u32) -> Fragment {
        let try_id = self.push_node(CfgNodeKind::TryEntry, ast_id, line, scope_id, "try", "try_entry");
        let merge_id = self.push_node(CfgNodeKind::Merge, None, line, scope_id, "try_merge", "try_merge");

        let do_block = children.first();
        let rescues: Vec<&Ast> = children.iter().filter(|c| c.kind_tag() == "rescue_clause").collect();
        let catches: Vec<&Ast> = children.iter().filter(|c| c.kind_tag() == "catch_clause").collect();
        let after = children.iter().find(|c| c.kind_tag() == "after_block");

        let after_entry = after.map(|a| {
            let after_scope = self.scopes.push(ScopeKind::After, scope_id, ast_id_or_empty(a));
            let body = a.children().first();
            let meta = a.metadata();
            let node_id = self.push_node(CfgNodeKind::AfterBlock, meta.ast_id.clone(), meta.span.start_line, after_scope, "after", "after");
            if let Some(b) = body {
                let frag = self.build(b, after_scope);
                self.link(&node_id, &frag.entry, CfgEdgeKind::Sequential, None);
                (node_id, frag.exits)
            } else {
                (node_id.clone(), vec![node_id])
            }
        });

        let route_to_end = |builder: &mut Self, exits: &[String]| {
            if let Some((after_id, after_exits)) = &after_entry {
                builder.chain(exits, after_id);
                builder.chain(after_exits, &merge_id);
            } else {
                builder.chain(exits, &merge_id);
            }
        };

        if let Some(body) = do_block {
            let do_scope = self.scopes.push(ScopeKind::Block, scope_id, ast_id_or_empty(body));
            let frag = self.build(body, do_scope);
            self.link(&try_id, &frag.entry, CfgEdgeKind::Sequential, None);
            route_to_end(self, &frag.exits);
        }

        for rescue in rescues {
            let rescue_scope = self.scopes.push(ScopeKind::Rescue, scope_id, ast_id_or_empty(rescue));
            let meta = rescue.metadata();
            let node_id = self.push_node(CfgNodeKind::RescueClause, meta.ast_id.clone(), meta.span.start_line, rescue_scope, "rescue", "rescue");
            self.link(&try_id, &node_id, CfgEdgeKind::Exception, None);
            if let Some(body) = rescue.children().last() {
                let frag = self.build(body, rescue_scope);
                self.link(&node_id, &frag.entry, CfgEdgeKind::Sequential, None);
                route_to_end(self, &frag.exits);
            } else {
                route_to_end(self, &[node_id]);
            }
        }

        for catch in catches {
            let catch_scope = self.scopes.push(ScopeKind::Catch, scope_id, ast_id_or_empty(catch));
            let meta = catch.metadata();
            let node_id = self.push_node(CfgNodeKind::CatchClause, meta.ast_id.clone(), meta.span.start_line, catch_scope, "catch", "catch");
            self.link(&try_id, &node_id, CfgEdgeKind::Exception, None);
            if let Some(body) = catch.children().last() {
                let frag = self.build(body, catch_scope);
                self.link(&node_id, &frag.entry, CfgEdgeKind::Sequential, None);
                route_to_end(self, &frag.exits);
            } else {
                route_to_end(self, &[node_id]);
            }
        }

        Fragment { entry: try_id, exits: vec![merge_id] }
    }

    fn build_anon_fn(&mut self, children: &[Ast], ast_id: Option<String>, line: u32, scope_id: u32) -> Fragment {
        // Single node in the outer CFG; the body gets its own CFG, built
        // recursively and stashed in `metadata.nested_cfgs` (spec §4.3).
        let node_id = self.push_node(CfgNodeKind::AnonFnDef, ast_id.clone(), line, scope_id, "fn", "anon_fn");
        if let Some(body) = children.last() {
            let nested = build_cfg_for(body, &format!("{}$anon", self.function_ast_id));
            self.nested.insert(node_id.clone(), nested);
        }
        Fragment { entry: node_id.clone(), exits: vec![node_id] }
    }
}

fn ast_id_or_empty(ast: &Ast) -> String {
    ast.metadata().ast_id.clone().unwrap_or_default()
}

/// Builds the CFG for one function body (spec §4.3 `build_cfg`).
pub fn build_cfg(function_ast_id: &str, body: &Ast) -> Cfg {
    build_cfg_for(body, function_ast_id)
}

fn build_cfg_for(body: &Ast, function_ast_id: &str) -> Cfg {
    let mut builder = CfgBuilder::new(function_ast_id);
    let root_scope = builder.scopes.push_root(function_ast_id);

    let entry_id = builder.push_node(CfgNodeKind::Entry, None, 0, root_scope, "entry", "entry");
    let body_frag = builder.build(body, root_scope);
    builder.link(&entry_id, &body_frag.entry, CfgEdgeKind::Sequential, None);

    let exit_id = builder.push_node(CfgNodeKind::Exit, None, 0, root_scope, "exit", "exit");
    builder.chain(&body_frag.exits, &exit_id);

    let complexity_metrics = compute_complexity(body);

    Cfg {
        entry: entry_id,
        exits: vec![exit_id],
        nodes: builder.nodes,
        edges: builder.edges,
        scopes: builder.scopes,
        complexity_metrics,
        metadata: CfgMetadata { warnings: builder.warnings, nested_cfgs: builder.nested },
    }
}

/// Complexity metrics, single-pass per metric (spec §4.3).
fn compute_complexity(body: &Ast) -> ComplexityMetrics {
    let cyclomatic = 1 + count_decision_points(body);
    let (cognitive, nesting_depth) = cognitive_and_nesting(body, 0);
    let max_pipe_chain_length = max_pipe_chain(body);
    let guard_count = count_guards(body);
    let pattern_count = count_patterns(body);
    ComplexityMetrics { cyclomatic, cognitive, nesting_depth, max_pipe_chain_length, guard_count, pattern_count }
}

fn cognitive_and_nesting(ast: &Ast, nesting: u32) -> (u32, u32) {
    let mut cognitive = 0;
    let mut max_nesting = nesting;
    if let Ast::Constructor { kind, children, .. } = ast {
        let base = match kind.as_str() {
            "if" => 1,
            "case" => {
                let n = children.iter().filter(|c| c.kind_tag() == "case_clause").count();
                std::cmp::max(1, n.saturating_sub(1)) as u32
            }
            "cond" => {
                let n = children.iter().filter(|c| c.kind_tag() == "cond_clause").count();
                n.saturating_sub(1) as u32
            }
            "try" => children.iter().filter(|c| matches!(c.kind_tag(), "rescue_clause" | "catch_clause")).count() as u32,
            _ => 0,
        };
        if base > 0 {
            cognitive += base + nesting * base;
            for child in children {
                let (c, m) = cognitive_and_nesting(child, nesting + 1);
                cognitive += c;
                max_nesting = max_nesting.max(m);
            }
            return (cognitive, max_nesting);
        }
    }
    for child in ast.children() {
        let (c, m) = cognitive_and_nesting(child, nesting);
        cognitive += c;
        max_nesting = max_nesting.max(m);
    }
    (cognitive, max_nesting)
}

fn max_pipe_chain(ast: &Ast) -> u32 {
    let mut best = pipe_chain_depth(ast);
    for child in ast.children() {
        best = best.max(max_pipe_chain(child));
    }
    best
}

fn pipe_chain_depth(ast: &Ast) -> u32 {
    match ast {
        Ast::Constructor { kind, children, .. } if kind == "pipe" && !children.is_empty() => {
            1 + pipe_chain_depth(&children[0])
        }
        _ => 0,
    }
}

fn count_guards(ast: &Ast) -> u32 {
    let mut count = if ast.kind_tag() == "guard" { 1 } else { 0 };
    for child in ast.children() {
        count += count_guards(child);
    }
    count
}

fn count_patterns(ast: &Ast) -> u32 {
    let mut count = match ast {
        Ast::Constructor { kind, .. } if kind.starts_with("pattern") || kind == "case_clause" => 1,
        _ => 0,
    };
    for child in ast.children() {
        count += count_patterns(child);
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::{AstMetadata, Callee, Span};

    fn var(name: &str) -> Ast {
        Ast::VariableRef { name: name.to_string(), metadata: AstMetadata::new(Span::zero()) }
    }

    fn assign(target: &str, value: Ast) -> Ast {
        Ast::Constructor {
            kind: "assign".to_string(),
            children: vec![var(target), value],
            metadata: AstMetadata::new(Span::zero()),
        }
    }

    fn block(children: Vec<Ast>) -> Ast {
        Ast::Constructor { kind: "block".to_string(), children, metadata: AstMetadata::new(Span::zero()) }
    }

    fn call(function: &str, args: Vec<Ast>) -> Ast {
        Ast::Call { callee: Callee { module: None, function: function.to_string() }, args, metadata: AstMetadata::new(Span::zero()) }
    }

    fn case_clause(pattern: Ast, body: Ast) -> Ast {
        Ast::Constructor { kind: "case_clause".to_string(), children: vec![pattern, body], metadata: AstMetadata::new(Span::zero()) }
    }

    #[test]
    fn simple_assignment_has_four_nodes_and_three_sequential_edges() {
        let body = block(vec![assign("x", var("a")), assign("y", var("x"))]);
        let cfg = build_cfg("M:f:1:body", &body);
        // entry, assign(x), assign(y), exit.
        assert_eq!(cfg.nodes.len(), 4);
        assert_eq!(cfg.edges.len(), 3);
        assert!(cfg.edges.iter().all(|e| matches!(e.kind, CfgEdgeKind::Sequential)));
        assert_eq!(cfg.complexity_metrics.cyclomatic, 1);
    }

    #[test]
    fn if_else_rebinding_has_two_conditional_edges_and_a_merge() {
        let body = block(vec![Ast::Constructor {
            kind: "if".to_string(),
            children: vec![var("cond"), assign("x", var("a")), assign("x", var("b"))],
            metadata: AstMetadata::new(Span::zero()),
        }]);
        let cfg = build_cfg("M:f:1:body", &body);
        let conditional_edges: Vec<_> = cfg.edges.iter().filter(|e| matches!(e.kind, CfgEdgeKind::Conditional)).collect();
        assert_eq!(conditional_edges.len(), 2);
        assert!(cfg.nodes.iter().any(|n| matches!(n.kind, CfgNodeKind::Merge)));
        assert_eq!(cfg.complexity_metrics.cyclomatic, 2);
    }

    #[test]
    fn case_with_three_clauses_has_three_pattern_match_edges() {
        let body = block(vec![Ast::Constructor {
            kind: "case".to_string(),
            children: vec![
                var("v"),
                case_clause(var("a"), assign("x", var("a"))),
                case_clause(var("b"), assign("x", var("b"))),
                case_clause(var("c"), assign("x", var("c"))),
            ],
            metadata: AstMetadata::new(Span::zero()),
        }]);
        let cfg = build_cfg("M:f:1:body", &body);
        let pattern_match_edges = cfg.edges.iter().filter(|e| matches!(e.kind, CfgEdgeKind::PatternMatch)).count();
        assert_eq!(pattern_match_edges, 3);
        assert_eq!(cfg.complexity_metrics.cyclomatic, 3);
        assert!(cfg.nodes.iter().any(|n| matches!(n.kind, CfgNodeKind::Merge)));
    }

    #[test]
    fn pipe_chain_is_linear_with_max_chain_length_three() {
        let body = block(vec![Ast::Constructor {
            kind: "pipe".to_string(),
            children: vec![
                Ast::Constructor {
                    kind: "pipe".to_string(),
                    children: vec![
                        Ast::Constructor {
                            kind: "pipe".to_string(),
                            children: vec![var("v"), call("a", vec![])],
                            metadata: AstMetadata::new(Span::zero()),
                        },
                        call("b", vec![]),
                    ],
                    metadata: AstMetadata::new(Span::zero()),
                },
                call("c", vec![]),
            ],
            metadata: AstMetadata::new(Span::zero()),
        }]);
        let cfg = build_cfg("M:f:1:body", &body);
        assert_eq!(cfg.complexity_metrics.cyclomatic, 1);
        assert_eq!(cfg.complexity_metrics.max_pipe_chain_length, 3);
    }

    #[test]
    fn anon_fn_body_gets_its_own_nested_cfg() {
        let body = block(vec![Ast::Constructor {
            kind: "fn".to_string(),
            children: vec![block(vec![assign("x", var("y"))])],
            metadata: AstMetadata::new(Span::zero()),
        }]);
        let cfg = build_cfg("M:f:1:body", &body);
        assert_eq!(cfg.metadata.nested_cfgs.len(), 1);
    }
}
