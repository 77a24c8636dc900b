//! C4 — DFG/SSA Builder (spec §4.4).
//!
//! Walks a function body once, threading a name -> current-SSA-version
//! environment through sequential composition. At every `if`/`case`/`cond`
//! merge point, branch environments are compared: a name bound to the
//! same version in every branch carries through unchanged; a name that
//! differs (or is missing in some branch) gets a fresh version produced
//! by a phi node whose `source_variables` are the per-branch incoming
//! versions (spec §4.4 phi insertion).
//!
//! A use of a name absent from the environment resolves to the phantom
//! version (`PHANTOM_VERSION = -1`, spec §4.4 scoping) rather than
//! failing the whole function — the phantom use is recorded in
//! `analyses.uninitialized_uses` for the caller to report.

use std::collections::{BTreeMap, BTreeSet};

use crate::shared::models::{
    Ast, DataFlowEdge, DataFlowKind, Definition, DefinitionKind, Dfg, DfgAnalyses, PhiNode, Use, UseKind,
    VariableVersion, ScopeKind, ScopeTree, PHANTOM_VERSION,
};

/// name -> currently-reaching `ssa_name`.
type Env = BTreeMap<String, String>;

struct DfgBuilder {
    next_version: BTreeMap<String, i64>,
    variables_by_name: BTreeMap<String, Vec<VariableVersion>>,
    definitions: Vec<Definition>,
    uses: Vec<Use>,
    data_flows: Vec<DataFlowEdge>,
    phi_nodes: Vec<PhiNode>,
    uninitialized_uses: Vec<String>,
    scopes: ScopeTree,
}

impl DfgBuilder {
    fn new() -> Self {
        Self {
            next_version: BTreeMap::new(),
            variables_by_name: BTreeMap::new(),
            definitions: Vec::new(),
            uses: Vec::new(),
            data_flows: Vec::new(),
            phi_nodes: Vec::new(),
            uninitialized_uses: Vec::new(),
            scopes: ScopeTree::new(),
        }
    }

    fn next_version(&mut self, name: &str) -> i64 {
        let slot = self.next_version.entry(name.to_string()).or_insert(-1);
        *slot += 1;
        *slot
    }

    fn define(
        &mut self,
        name: &str,
        ast_id: &str,
        kind: DefinitionKind,
        scope_id: u32,
        line: u32,
        source_expr_ast: Option<Ast>,
        is_parameter: bool,
        env: &mut Env,
    ) -> String {
        let version = self.next_version(name);
        let ssa_name = VariableVersion::ssa_name_for(name, version);
        self.variables_by_name.entry(name.to_string()).or_default().push(VariableVersion {
            original_name: name.to_string(),
            version,
            ssa_name: ssa_name.clone(),
            scope_id,
            defining_node_id: ast_id.to_string(),
            is_parameter,
            is_captured: false,
        });
        self.definitions.push(Definition {
            variable_version: ssa_name.clone(),
            ast_id: ast_id.to_string(),
            kind,
            source_expr_ast,
            line,
            scope_id,
        });
        env.insert(name.to_string(), ssa_name.clone());
        ssa_name
    }

    fn record_use(&mut self, name: &str, ast_id: &str, kind: UseKind, scope_id: u32, line: u32, env: &Env) {
        match env.get(name) {
            Some(ssa_name) => {
                self.uses.push(Use {
                    variable_version: ssa_name.clone(),
                    ast_id: ast_id.to_string(),
                    kind,
                    line,
                    scope_id,
                    reaching_definition: Some(ssa_name.clone()),
                });
                self.data_flows.push(DataFlowEdge {
                    from_def: ssa_name.clone(),
                    to_use_ast_id: ast_id.to_string(),
                    flow_kind: DataFlowKind::Direct,
                });
            }
            None => {
                let phantom = VariableVersion::ssa_name_for(name, PHANTOM_VERSION);
                let already = self
                    .variables_by_name
                    .get(name)
                    .map(|vs| vs.iter().any(|v| v.version == PHANTOM_VERSION))
                    .unwrap_or(false);
                if !already {
                    self.variables_by_name.entry(name.to_string()).or_default().push(VariableVersion {
                        original_name: name.to_string(),
                        version: PHANTOM_VERSION,
                        ssa_name: phantom.clone(),
                        scope_id,
                        defining_node_id: String::new(),
                        is_parameter: false,
                        is_captured: false,
                    });
                }
                self.uses.push(Use {
                    variable_version: phantom,
                    ast_id: ast_id.to_string(),
                    kind,
                    line,
                    scope_id,
                    reaching_definition: None,
                });
                self.uninitialized_uses.push(ast_id.to_string());
            }
        }
    }

    /// Binds every name in a (possibly nested) pattern, all sharing one
    /// `ast_id`/`line`/`kind` (spec §4.4: pattern match produces one
    /// definition per bound name).
    fn bind_pattern(&mut self, pattern: &Ast, ast_id: &str, kind: DefinitionKind, scope_id: u32, line: u32, env: &mut Env) {
        match pattern {
            Ast::VariableRef { name, .. } => {
                self.define(name, ast_id, kind, scope_id, line, None, kind == DefinitionKind::Parameter, env);
            }
            Ast::Constructor { children, .. } => {
                for child in children {
                    self.bind_pattern(child, ast_id, kind, scope_id, line, env);
                }
            }
            _ => {}
        }
    }

    /// Processes `ast` sequentially, mutating `env` to reflect the bindings
    /// in effect after it runs.
    fn process(&mut self, ast: &Ast, scope_id: u32, env: &mut Env) {
        match ast {
            Ast::Literal { .. } => {}
            Ast::VariableRef { name, metadata } => {
                self.record_use(name, &metadata.ast_id.clone().unwrap_or_default(), UseKind::Read, scope_id, metadata.span.start_line, env);
            }
            Ast::Call { args, .. } => {
                for arg in args {
                    self.process(arg, scope_id, env);
                }
            }
            Ast::Constructor { kind, children, metadata } => {
                let ast_id = metadata.ast_id.clone().unwrap_or_default();
                let line = metadata.span.start_line;
                match kind.as_str() {
                    "block" => {
                        for stmt in children {
                            self.process(stmt, scope_id, env);
                        }
                    }
                    "assign" if children.len() == 2 => {
                        self.process(&children[1], scope_id, env);
                        self.bind_pattern(&children[0], &ast_id, DefinitionKind::Assignment, scope_id, line, env);
                    }
                    "if" => self.process_if(children, &ast_id, line, scope_id, env),
                    "case" => self.process_case(children, &ast_id, line, scope_id, env),
                    "cond" => self.process_cond(children, &ast_id, line, scope_id, env),
                    "try" => self.process_try(children, &ast_id, line, scope_id, env),
                    "pipe" if children.len() == 2 => {
                        self.process(&children[0], scope_id, env);
                        self.process(&children[1], scope_id, env);
                    }
                    "guard" => {
                        for child in children {
                            self.process_guard(child, scope_id, env);
                        }
                    }
                    "fn" => self.process_anon_fn(children, &ast_id, scope_id, env),
                    _ => {
                        for child in children {
                            self.process(child, scope_id, env);
                        }
                    }
                }
            }
        }
    }

    /// Variable references inside a clause guard are `PatternGuard` uses,
    /// not plain reads (spec §4.4).
    fn process_guard(&mut self, ast: &Ast, scope_id: u32, env: &Env) {
        match ast {
            Ast::VariableRef { name, metadata } => {
                self.record_use(name, &metadata.ast_id.clone().unwrap_or_default(), UseKind::PatternGuard, scope_id, metadata.span.start_line, env);
            }
            _ => {
                for child in ast.children() {
                    self.process_guard(child, scope_id, env);
                }
            }
        }
    }

    fn process_if(&mut self, children: &[Ast], ast_id: &str, line: u32, scope_id: u32, env: &mut Env) {
        if children.is_empty() {
            return;
        }
        self.process(&children[0], scope_id, env);
        if children.len() < 2 {
            return;
        }

        let then_scope = self.scopes.push(ScopeKind::IfBranch, scope_id, format!("{ast_id}.then"));
        let mut then_env = env.clone();
        self.process(&children[1], then_scope, &mut then_env);

        let else_env = if let Some(else_ast) = children.get(2) {
            let else_scope = self.scopes.push(ScopeKind::IfBranch, scope_id, format!("{ast_id}.else"));
            let mut e = env.clone();
            self.process(else_ast, else_scope, &mut e);
            e
        } else {
            env.clone()
        };

        let merge_id = format!("{ast_id}.merge");
        self.merge_envs(&[then_env, else_env], scope_id, &merge_id, line, env);
    }

    fn process_case(&mut self, children: &[Ast], ast_id: &str, line: u32, scope_id: u32, env: &mut Env) {
        if let Some(subject) = children.first() {
            self.process(subject, scope_id, env);
        }
        let mut branch_envs = Vec::new();
        for clause in children.iter().filter(|c| c.kind_tag() == "case_clause") {
            let clause_scope = self.scopes.push(ScopeKind::CaseClause, scope_id, ast_id_or_empty(clause));
            let clause_meta = clause.metadata();
            let clause_ast_id = clause_meta.ast_id.clone().unwrap_or_default();
            let mut clause_env = env.clone();
            let parts = clause.children();
            if let Some(pattern) = parts.first() {
                self.bind_pattern(pattern, &clause_ast_id, DefinitionKind::PatternMatch, clause_scope, clause_meta.span.start_line, &mut clause_env);
            }
            if parts.len() == 3 {
                self.process_guard(&parts[1], clause_scope, &clause_env);
            }
            if let Some(body) = parts.last() {
                self.process(body, clause_scope, &mut clause_env);
            }
            branch_envs.push(clause_env);
        }
        if branch_envs.is_empty() {
            return;
        }
        let merge_id = format!("{ast_id}.merge");
        self.merge_envs(&branch_envs, scope_id, &merge_id, line, env);
    }

    fn process_cond(&mut self, children: &[Ast], ast_id: &str, line: u32, scope_id: u32, env: &mut Env) {
        let clauses: Vec<&Ast> = children.iter().filter(|c| c.kind_tag() == "cond_clause").collect();
        if clauses.is_empty() {
            return;
        }
        // Every fallthrough path and the unmodified entry env are both
        // candidate merge sources (spec §9: cond has no explicit else).
        let mut branch_envs = vec![env.clone()];
        for clause in &clauses {
            let clause_scope = self.scopes.push(ScopeKind::CondClause, scope_id, ast_id_or_empty(clause));
            let parts = clause.children();
            if let Some(cond_expr) = parts.first() {
                self.process(cond_expr, clause_scope, &mut env.clone());
            }
            let mut clause_env = env.clone();
            if let Some(body) = parts.last() {
                self.process(body, clause_scope, &mut clause_env);
            }
            branch_envs.push(clause_env);
        }
        let merge_id = format!("{ast_id}.merge");
        self.merge_envs(&branch_envs, scope_id, &merge_id, line, env);
    }

    fn process_try(&mut self, children: &[Ast], ast_id: &str, line: u32, scope_id: u32, env: &mut Env) {
        let do_block = children.first();
        let rescues: Vec<&Ast> = children.iter().filter(|c| c.kind_tag() == "rescue_clause").collect();
        let catches: Vec<&Ast> = children.iter().filter(|c| c.kind_tag() == "catch_clause").collect();
        let after = children.iter().find(|c| c.kind_tag() == "after_block");

        let mut branch_envs = Vec::new();
        if let Some(body) = do_block {
            let do_scope = self.scopes.push(ScopeKind::Block, scope_id, ast_id_or_empty(body));
            let mut do_env = env.clone();
            self.process(body, do_scope, &mut do_env);
            branch_envs.push(do_env);
        }
        for handler in rescues.iter().map(|h| (ScopeKind::Rescue, *h)).chain(catches.iter().map(|h| (ScopeKind::Catch, *h))) {
            let (handler_kind, handler) = handler;
            let handler_scope = self.scopes.push(handler_kind, scope_id, ast_id_or_empty(handler));
            let handler_meta = handler.metadata();
            let handler_ast_id = handler_meta.ast_id.clone().unwrap_or_default();
            let mut handler_env = env.clone();
            let parts = handler.children();
            if parts.len() == 2 {
                self.bind_pattern(&parts[0], &handler_ast_id, DefinitionKind::PatternMatch, handler_scope, handler_meta.span.start_line, &mut handler_env);
                self.process(&parts[1], handler_scope, &mut handler_env);
            } else if let Some(body) = parts.last() {
                self.process(body, handler_scope, &mut handler_env);
            }
            branch_envs.push(handler_env);
        }
        if branch_envs.is_empty() {
            branch_envs.push(env.clone());
        }

        let merge_id = format!("{ast_id}.merge");
        self.merge_envs(&branch_envs, scope_id, &merge_id, line, env);

        if let Some(after_block) = after {
            let after_scope = self.scopes.push(ScopeKind::After, scope_id, ast_id_or_empty(after_block));
            if let Some(body) = after_block.children().first() {
                self.process(body, after_scope, env);
            }
        }
    }

    /// Free-variable capture: any name read inside the literal that already
    /// resolves in the enclosing environment is a `ClosureCapture` use: we
    /// do not model the anonymous function's own local bindings as a
    /// separate SSA scope (open question, recorded in DESIGN.md).
    fn process_anon_fn(&mut self, children: &[Ast], ast_id: &str, scope_id: u32, env: &mut Env) {
        if let Some(body) = children.last() {
            self.capture_free_vars(body, ast_id, scope_id, env);
        }
    }

    fn capture_free_vars(&mut self, ast: &Ast, capture_site_ast_id: &str, scope_id: u32, env: &mut Env) {
        match ast {
            Ast::VariableRef { name, metadata } => {
                if let Some(ssa_name) = env.get(name).cloned() {
                    self.uses.push(Use {
                        variable_version: ssa_name.clone(),
                        ast_id: capture_site_ast_id.to_string(),
                        kind: UseKind::ClosureCapture,
                        line: metadata.span.start_line,
                        scope_id,
                        reaching_definition: Some(ssa_name.clone()),
                    });
                    if let Some(versions) = self.variables_by_name.get_mut(name) {
                        if let Some(v) = versions.iter_mut().find(|v| v.ssa_name == ssa_name) {
                            v.is_captured = true;
                        }
                    }
                }
            }
            _ => {
                for child in ast.children() {
                    self.capture_free_vars(child, capture_site_ast_id, scope_id, env);
                }
            }
        }
    }

    /// Phi insertion (spec §4.4): a name carried identically by every
    /// branch passes through; a name that diverges gets a fresh version
    /// whose phi sources are the per-branch incoming versions, in branch
    /// order.
    fn merge_envs(&mut self, branches: &[Env], scope_id: u32, merge_ast_id: &str, line: u32, out_env: &mut Env) {
        let mut names: BTreeSet<String> = BTreeSet::new();
        for b in branches {
            names.extend(b.keys().cloned());
        }
        for name in names {
            let values: Vec<Option<String>> = branches.iter().map(|b| b.get(&name).cloned()).collect();
            // A name missing from some branch's env was bound inside only a
            // proper subset of the branches (e.g. a case clause's own
            // pattern variables) and is out of scope at the merge point
            // (spec §4.4); it is dropped rather than phi'd with a
            // synthesized placeholder source (spec §8 scenario 3).
            if values.iter().any(Option::is_none) {
                continue;
            }
            let first = values[0].clone();
            if values.iter().all(|v| *v == first) {
                if let Some(v) = first {
                    out_env.insert(name, v);
                }
                continue;
            }
            let sources: Vec<String> = values.into_iter().map(|v| v.expect("checked above")).collect();
            let version = self.next_version(&name);
            let ssa_name = VariableVersion::ssa_name_for(&name, version);
            self.variables_by_name.entry(name.clone()).or_default().push(VariableVersion {
                original_name: name.clone(),
                version,
                ssa_name: ssa_name.clone(),
                scope_id,
                defining_node_id: merge_ast_id.to_string(),
                is_parameter: false,
                is_captured: false,
            });
            self.definitions.push(Definition {
                variable_version: ssa_name.clone(),
                ast_id: merge_ast_id.to_string(),
                kind: DefinitionKind::Phi,
                source_expr_ast: None,
                line,
                scope_id,
            });
            self.phi_nodes.push(PhiNode {
                target_variable: ssa_name.clone(),
                source_variables: sources,
                merge_point_ast_id: merge_ast_id.to_string(),
                scope_id,
            });
            out_env.insert(name, ssa_name);
        }
    }
}

fn ast_id_or_empty(ast: &Ast) -> String {
    ast.metadata().ast_id.clone().unwrap_or_default()
}

/// Builds the SSA Data Flow Graph for one function (spec §4.4 `build_dfg`).
/// `parameters` are bound before `body` is processed, each producing a
/// version-0 `Parameter` definition.
pub fn build_dfg(function_ast_id: &str, parameters: &[Ast], body: &Ast) -> Dfg {
    let mut builder = DfgBuilder::new();
    let root_scope = builder.scopes.push_root(function_ast_id);
    let mut env = Env::new();

    for param in parameters {
        let ast_id = ast_id_or_empty(param);
        let line = param.line();
        builder.bind_pattern(param, &ast_id, DefinitionKind::Parameter, root_scope, line, &mut env);
    }

    builder.process(body, root_scope, &mut env);

    let used_as_phi_source: BTreeSet<&str> = builder.phi_nodes.iter().flat_map(|p| p.source_variables.iter().map(String::as_str)).collect();
    let read_from: BTreeSet<&str> = builder.data_flows.iter().map(|f| f.from_def.as_str()).collect();
    let unused_definitions: Vec<String> = builder
        .definitions
        .iter()
        .map(|d| d.variable_version.clone())
        .filter(|ssa| !read_from.contains(ssa.as_str()) && !used_as_phi_source.contains(ssa.as_str()))
        .collect();

    let mut liveness = BTreeMap::new();
    liveness.insert(root_scope, env.values().cloned().collect::<Vec<_>>());

    Dfg {
        variables_by_name: builder.variables_by_name,
        definitions: builder.definitions,
        uses: builder.uses,
        data_flows: builder.data_flows,
        phi_nodes: builder.phi_nodes,
        scopes: builder.scopes,
        analyses: DfgAnalyses {
            liveness,
            unused_definitions,
            uninitialized_uses: builder.uninitialized_uses,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::{AstMetadata, Span};

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

    fn lit() -> Ast {
        Ast::Literal { kind: crate::shared::models::LiteralKind::Integer, text: "1".to_string(), metadata: AstMetadata::new(Span::zero()) }
    }

    #[test]
    fn reassignment_produces_two_versions() {
        let body = block(vec![assign("x", lit()), assign("x", var("x"))]);
        let dfg = build_dfg("M:f:1:body", &[], &body);
        let versions = &dfg.variables_by_name["x"];
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0].version, 0);
        assert_eq!(versions[1].version, 1);
    }

    #[test]
    fn use_before_def_is_phantom() {
        let body = block(vec![assign("y", var("x"))]);
        let dfg = build_dfg("M:f:1:body", &[], &body);
        assert_eq!(dfg.analyses.uninitialized_uses.len(), 1);
        let phantom = &dfg.variables_by_name["x"][0];
        assert!(phantom.is_phantom());
    }

    #[test]
    fn if_rebinding_both_branches_inserts_phi() {
        let if_node = Ast::Constructor {
            kind: "if".to_string(),
            children: vec![var("cond"), assign("x", lit()), assign("x", lit())],
            metadata: AstMetadata::new(Span::zero()),
        };
        let body = block(vec![assign("x", lit()), if_node, assign("y", var("x"))]);
        let dfg = build_dfg("M:f:1:body", &[], &body);
        assert_eq!(dfg.phi_nodes.len(), 1);
        let phi = &dfg.phi_nodes[0];
        assert_eq!(phi.source_variables.len(), 2);
    }

    #[test]
    fn if_without_else_merges_against_entry_env() {
        let if_node = Ast::Constructor {
            kind: "if".to_string(),
            children: vec![var("cond"), assign("x", lit())],
            metadata: AstMetadata::new(Span::zero()),
        };
        let body = block(vec![assign("x", lit()), if_node]);
        let dfg = build_dfg("M:f:1:body", &[], &body);
        assert_eq!(dfg.phi_nodes.len(), 1);
    }

    #[test]
    fn case_clause_local_bindings_do_not_leak_to_merge_scope() {
        let clause_d = Ast::Constructor {
            kind: "case_clause".to_string(),
            children: vec![var("d"), var("d")],
            metadata: AstMetadata::new(Span::zero()),
        };
        let clause_r = Ast::Constructor {
            kind: "case_clause".to_string(),
            children: vec![var("r"), var("r")],
            metadata: AstMetadata::new(Span::zero()),
        };
        let case_node = Ast::Constructor {
            kind: "case".to_string(),
            children: vec![var("subject"), clause_d, clause_r],
            metadata: AstMetadata::new(Span::zero()),
        };
        let body = block(vec![case_node, assign("out", var("d"))]);
        let dfg = build_dfg("M:f:1:body", &[], &body);
        assert!(dfg.phi_nodes.is_empty());
        assert_eq!(dfg.analyses.uninitialized_uses.len(), 1);
        assert!(dfg.variables_by_name["d"].iter().any(|v| v.is_phantom()));
    }

    #[test]
    fn parameters_are_version_zero() {
        let params = vec![var("a")];
        let body = block(vec![assign("y", var("a"))]);
        let dfg = build_dfg("M:f:1:body", &params, &body);
        let a = &dfg.variables_by_name["a"][0];
        assert!(a.is_parameter);
        assert_eq!(a.version, 0);
    }
}
