//! C5 — CPG Fusion (spec §4.5).
//!
//! Fuses one function's AST, CFG and DFG into a single typed graph in five
//! passes: (1) the AST becomes the node skeleton with `ast_child` edges,
//! (2) CFG nodes attach to their AST node or, for synthetic CFG nodes
//! (`entry`/`exit`/`merge`), get their own CPG node, with CFG edges mapped
//! to the matching `cfg_*` edge kind, (3) SSA definitions/uses attach to
//! their AST node and phi nodes get their own synthetic node, with
//! `dfg_reaches`/`dfg_phi_input`/`dfg_phi_output` edges added, (4) every
//! `Call` AST node gets a symbolic `call` edge to its (possibly
//! module-qualified) target MFA, and (5) two query indexes are built over
//! the finished node set.
//!
//! Grounded on `original_source/5-cpg_builder.ex`'s five-phase
//! `build_cpg` pipeline, `generate_cpg_node_id`, `ast_label` and
//! `cfg_edge_type_to_cpg_type`, translated from maps-of-structs into an
//! arena of nodes addressed by id (spec §9 "graphs as arenas, not
//! recursive ownership trees").

use std::collections::BTreeMap;

use crate::shared::models::cpg::mapping_key;
use crate::shared::models::{
    Ast, AstPayload, Cfg, CfgEdgeKind, CfgPayload, ConditionLabel, Cpg, CpgEdge, CpgEdgeKind, CpgIndexes,
    CpgNode, CpgNodeType, Dfg, DfgPayload, NodeMappingTables,
};

struct CpgBuilder<'a> {
    function_ast_id: &'a str,
    module_name: &'a str,
    nodes: Vec<CpgNode>,
    edges: Vec<CpgEdge>,
    mappings: NodeMappingTables,
    synthetic_counter: usize,
}

impl<'a> CpgBuilder<'a> {
    fn new(function_ast_id: &'a str, module_name: &'a str) -> Self {
        Self {
            function_ast_id,
            module_name,
            nodes: Vec::new(),
            edges: Vec::new(),
            mappings: NodeMappingTables::default(),
            synthetic_counter: 0,
        }
    }

    fn fresh_synthetic_id(&mut self, tag: &str) -> String {
        let id = format!("cpg:{}:{}:{}", self.function_ast_id, tag, self.synthetic_counter);
        self.synthetic_counter += 1;
        id
    }

    fn node_mut(&mut self, id: &str) -> Option<&mut CpgNode> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    // ---- Phase 1: AST skeleton -----------------------------------------

    fn build_ast_skeleton(&mut self, ast: &Ast, parent: Option<String>) {
        let ast_id = ast.metadata().ast_id.clone().unwrap_or_default();
        let cpg_id = format!("cpg:ast:{ast_id}");
        let label = ast_label(ast);

        self.nodes.push(CpgNode {
            id: cpg_id.clone(),
            node_type: CpgNodeType::Ast,
            label: label.clone(),
            ast_payload: Some(AstPayload { ast_kind: ast.kind_tag().to_string() }),
            cfg_payload: None,
            dfg_payload: None,
            line: ast.line(),
            source_snippet: label,
        });
        self.mappings.ast_id_to_cpg_id.insert(ast_id, cpg_id.clone());

        if let Some(parent_id) = parent {
            self.edges.push(CpgEdge::new(parent_id, cpg_id.clone(), CpgEdgeKind::AstChild));
        }

        for child in ast.children() {
            self.build_ast_skeleton(child, Some(cpg_id.clone()));
        }
    }

    // ---- Phase 2: CFG overlay ------------------------------------------

    fn overlay_cfg(&mut self, cfg: &Cfg) {
        for node in &cfg.nodes {
            let cpg_id = match &node.ast_id {
                Some(ast_id) if self.mappings.ast_id_to_cpg_id.contains_key(ast_id) => {
                    let id = self.mappings.ast_id_to_cpg_id[ast_id].clone();
                    if let Some(n) = self.node_mut(&id) {
                        n.cfg_payload = Some(CfgPayload {
                            cfg_kind: format!("{:?}", node.kind),
                            cfg_id: node.id.clone(),
                            expression: node.expression.clone(),
                        });
                    }
                    id
                }
                _ => {
                    let id = self.fresh_synthetic_id("cfg");
                    self.nodes.push(CpgNode {
                        id: id.clone(),
                        node_type: CpgNodeType::CfgSynthetic,
                        label: node.expression.clone(),
                        ast_payload: None,
                        cfg_payload: Some(CfgPayload {
                            cfg_kind: format!("{:?}", node.kind),
                            cfg_id: node.id.clone(),
                            expression: node.expression.clone(),
                        }),
                        dfg_payload: None,
                        line: node.line,
                        source_snippet: node.expression.clone(),
                    });
                    id
                }
            };
            self.mappings.cfg_node_id_to_cpg_id.insert(node.id.clone(), cpg_id);
        }

        for edge in &cfg.edges {
            let (Some(from), Some(to)) = (
                self.mappings.cfg_node_id_to_cpg_id.get(&edge.from).cloned(),
                self.mappings.cfg_node_id_to_cpg_id.get(&edge.to).cloned(),
            ) else {
                continue;
            };
            let kind = cfg_edge_kind_to_cpg(edge.kind);
            let label = condition_label(edge.condition);
            self.edges.push(CpgEdge::new(from, to, kind).with_label(label));
        }
    }

    // ---- Phase 3: DFG overlay -------------------------------------------

    fn overlay_dfg(&mut self, dfg: &Dfg) {
        for phi in &dfg.phi_nodes {
            let cpg_id = self.fresh_synthetic_id("phi");
            let line = dfg.definition(&phi.target_variable).map(|d| d.line).unwrap_or(0);
            self.nodes.push(CpgNode {
                id: cpg_id.clone(),
                node_type: CpgNodeType::DfgPhiSynthetic,
                label: format!("\u{3a6}({})", original_name_of(&phi.target_variable)),
                ast_payload: None,
                cfg_payload: None,
                dfg_payload: Some(DfgPayload { definitions: vec![phi.target_variable.clone()], uses: vec![] }),
                line,
                source_snippet: format!("phi {}", phi.target_variable),
            });
            self.mappings.phi_to_cpg_id.insert(phi.target_variable.clone(), cpg_id.clone());
            self.mappings
                .definition_to_cpg_id
                .insert(mapping_key(&phi.target_variable, &phi.merge_point_ast_id), cpg_id);
        }

        for def in &dfg.definitions {
            if self.mappings.phi_to_cpg_id.contains_key(&def.variable_version) {
                continue;
            }
            let cpg_id = self.attach_or_synthesize(&def.ast_id, def.line, "def");
            if let Some(n) = self.node_mut(&cpg_id) {
                n.dfg_payload.get_or_insert_with(DfgPayload::default).definitions.push(def.variable_version.clone());
            }
            self.mappings.definition_to_cpg_id.insert(mapping_key(&def.variable_version, &def.ast_id), cpg_id);
        }

        for u in &dfg.uses {
            let cpg_id = self.attach_or_synthesize(&u.ast_id, u.line, "use");
            if let Some(n) = self.node_mut(&cpg_id) {
                n.dfg_payload.get_or_insert_with(DfgPayload::default).uses.push(u.variable_version.clone());
            }
            self.mappings.use_to_cpg_id.insert(mapping_key(&u.variable_version, &u.ast_id), cpg_id);
        }

        for flow in &dfg.data_flows {
            let Some(to) = self.mappings.use_to_cpg_id.get(&mapping_key(&flow.from_def, &flow.to_use_ast_id)).cloned() else {
                continue;
            };
            let Some(def) = dfg.definition(&flow.from_def) else { continue };
            let Some(from) = self.mappings.definition_to_cpg_id.get(&mapping_key(&flow.from_def, &def.ast_id)).cloned() else {
                continue;
            };
            self.edges.push(CpgEdge::new(from, to, CpgEdgeKind::DfgReaches).with_label(format!("{:?}", flow.flow_kind)));
        }

        for phi in &dfg.phi_nodes {
            let Some(phi_cpg) = self.mappings.phi_to_cpg_id.get(&phi.target_variable).cloned() else { continue };
            for source in &phi.source_variables {
                if let Some(def) = dfg.definition(source) {
                    if let Some(src_cpg) = self.mappings.definition_to_cpg_id.get(&mapping_key(source, &def.ast_id)).cloned() {
                        self.edges.push(CpgEdge::new(src_cpg, phi_cpg.clone(), CpgEdgeKind::DfgPhiInput));
                    }
                }
            }
            // Exactly one dfg_phi_output edge per phi, to the merge point
            // itself (spec §4.5) — downstream uses of the phi's target are
            // already reached via dfg_reaches edges above.
            if let Some(merge_cpg) = self.mappings.ast_id_to_cpg_id.get(&phi.merge_point_ast_id).cloned() {
                self.edges.push(CpgEdge::new(phi_cpg.clone(), merge_cpg, CpgEdgeKind::DfgPhiOutput));
            }
        }
    }

    /// Resolves the CPG node a definition/use with this `ast_id` belongs
    /// to; synthesizes one if the ast_id lies outside the AST skeleton
    /// (e.g. a pre-assigned id the `AstProvider` minted that isn't part of
    /// the traversed body — spec §4.5 invariant: every SSA fact is mapped).
    fn attach_or_synthesize(&mut self, ast_id: &str, line: u32, tag: &str) -> String {
        if let Some(existing) = self.mappings.ast_id_to_cpg_id.get(ast_id) {
            return existing.clone();
        }
        let id = self.fresh_synthetic_id(tag);
        self.nodes.push(CpgNode {
            id: id.clone(),
            node_type: CpgNodeType::CfgSynthetic,
            label: ast_id.to_string(),
            ast_payload: None,
            cfg_payload: None,
            dfg_payload: None,
            line,
            source_snippet: String::new(),
        });
        self.mappings.ast_id_to_cpg_id.insert(ast_id.to_string(), id.clone());
        id
    }

    // ---- Phase 4: symbolic call edges -----------------------------------

    fn add_call_edges(&mut self, ast: &Ast) {
        if let Ast::Call { callee, args, metadata } = ast {
            if let Some(ast_id) = &metadata.ast_id {
                if let Some(from) = self.mappings.ast_id_to_cpg_id.get(ast_id).cloned() {
                    let module = callee.module.as_deref().unwrap_or(self.module_name);
                    let mfa = format!("{module}.{}/{}", callee.function, args.len());
                    self.edges.push(CpgEdge::symbolic_call(from, &mfa));
                }
            }
        }
        for child in ast.children() {
            self.add_call_edges(child);
        }
    }

    // ---- Phase 5: query indexes ------------------------------------------

    fn build_indexes(&self) -> CpgIndexes {
        let mut by_type: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut by_label_prefix: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for node in &self.nodes {
            by_type.entry(format!("{:?}", node.node_type)).or_default().push(node.id.clone());
            let prefix = node
                .label
                .split(|c| c == '(' || c == ':')
                .next()
                .unwrap_or(&node.label)
                .trim()
                .to_string();
            by_label_prefix.entry(prefix).or_default().push(node.id.clone());
        }
        CpgIndexes { by_type, by_label_prefix }
    }
}

fn ast_label(ast: &Ast) -> String {
    match ast {
        Ast::Literal { text, .. } => text.clone(),
        Ast::VariableRef { name, .. } => name.clone(),
        Ast::Call { callee, args, .. } => {
            let target = match &callee.module {
                Some(m) => format!("{m}.{}", callee.function),
                None => callee.function.clone(),
            };
            format!("{target}({})", args.len())
        }
        Ast::Constructor { kind, .. } => kind.clone(),
    }
}

fn condition_label(condition: Option<ConditionLabel>) -> String {
    match condition {
        Some(ConditionLabel::True) => "true".to_string(),
        Some(ConditionLabel::False) => "false".to_string(),
        Some(ConditionLabel::Label(n)) => format!("clause_{n}"),
        None => String::new(),
    }
}

fn cfg_edge_kind_to_cpg(kind: CfgEdgeKind) -> CpgEdgeKind {
    match kind {
        CfgEdgeKind::Sequential => CpgEdgeKind::CfgFlow,
        CfgEdgeKind::Conditional => CpgEdgeKind::CfgConditional,
        CfgEdgeKind::PatternMatch => CpgEdgeKind::CfgPatternMatch,
        CfgEdgeKind::GuardTrue | CfgEdgeKind::GuardFalse => CpgEdgeKind::CfgConditional,
        CfgEdgeKind::Exception => CpgEdgeKind::CfgException,
        CfgEdgeKind::LoopBack => CpgEdgeKind::CfgLoopBack,
        CfgEdgeKind::LoopExit => CpgEdgeKind::CfgLoopExit,
    }
}

/// Recovers the source variable name from an `ssa_name` of the form
/// `name_version` (spec §3 `ssa_name` format).
fn original_name_of(ssa_name: &str) -> &str {
    ssa_name.rsplit_once('_').map(|(name, _)| name).unwrap_or(ssa_name)
}

/// Fuses one function's AST, CFG and DFG into a unified CPG (spec §4.5
/// `build_cpg`). `module_name` resolves bare (unqualified) calls to a
/// local MFA target.
pub fn build_cpg(function_ast_id: &str, module_name: &str, body: &Ast, cfg: &Cfg, dfg: &Dfg) -> Cpg {
    let mut builder = CpgBuilder::new(function_ast_id, module_name);
    builder.build_ast_skeleton(body, None);
    builder.overlay_cfg(cfg);
    builder.overlay_dfg(dfg);
    builder.add_call_edges(body);
    let indexes = builder.build_indexes();

    Cpg { nodes: builder.nodes, edges: builder.edges, mappings: builder.mappings, indexes }
}
