//! C2 — AST Analyzer (spec §4.2).
//!
//! Extracts direct structural facts per module and per function without
//! building full graphs. A parse failure at the module level, or an
//! analysis failure scoped to one function, is recorded and returned
//! rather than aborting the batch (spec §4.2 Failure model) — callers
//! (the Populator, the Synchronizer) collect these into a batch result.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::CoreError;
use crate::features::node_id::{assign_ids, assign_ids_with_root, IdContext, IdStrategy};
use crate::shared::models::{Ast, CallSite, ComplexityPreliminary, FunctionKey, ParameterPattern, Span};

/// Per-module structural facts (spec §4.2).
#[derive(Debug, Clone, Default)]
pub struct ModuleFacts {
    pub functions: Vec<FunctionFacts>,
    pub imports: Vec<String>,
    pub aliases: Vec<String>,
    pub requires: Vec<String>,
    pub uses: Vec<String>,
    pub attributes: BTreeMap<String, Value>,
    pub implemented_protocols: Vec<String>,
    pub module_complexity: u32,
}

/// Per-function structural facts (spec §4.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionFacts {
    pub ast_id: String,
    pub is_public: bool,
    pub signature: String,
    pub parameters: Vec<ParameterPattern>,
    pub head_guards: Vec<Ast>,
    pub clauses: usize,
    pub pattern_matches: usize,
    pub local_variables_preliminary: Vec<String>,
    pub direct_calls: Vec<CallSite>,
    pub complexity_preliminary: ComplexityPreliminary,
    pub span: Span,
    /// The id-assigned function body, threaded through to C3/C4/C5. Not
    /// part of spec's `FunctionFacts` field list verbatim, but every
    /// downstream builder needs the same id-tagged tree this analysis ran
    /// over, so we carry it rather than re-running C1.
    pub body: Ast,
}

/// Input for one function (what the `AstProvider` hands back per clause,
/// spec §6 `ParsedFunction`), already carrying a function key.
pub struct FunctionInput {
    pub key: FunctionKey,
    pub is_public: bool,
    pub parameters: Vec<Ast>,
    pub guards: Vec<Ast>,
    pub body: Ast,
    pub span: Span,
}

/// Analyze one module's parsed functions into `ModuleFacts`. Per-function
/// analysis failures are collected rather than aborting sibling functions
/// (spec §4.2 Failure model).
pub fn analyze_module(
    functions: Vec<FunctionInput>,
    imports: Vec<String>,
    aliases: Vec<String>,
    requires: Vec<String>,
    uses: Vec<String>,
    attributes: BTreeMap<String, Value>,
    implemented_protocols: Vec<String>,
    id_strategy: IdStrategy,
) -> (ModuleFacts, Vec<CoreError>) {
    let mut facts = Vec::with_capacity(functions.len());
    let mut errors = Vec::new();

    for input in functions {
        match analyze_function(input, id_strategy) {
            Ok(f) => facts.push(f),
            Err(e) => errors.push(e),
        }
    }

    let module_complexity = facts.iter().map(|f| f.complexity_preliminary.decision_points + 1).sum();

    let module_facts = ModuleFacts {
        functions: facts,
        imports,
        aliases,
        requires,
        uses,
        attributes,
        implemented_protocols,
        module_complexity,
    };
    (module_facts, errors)
}

/// Analyze a single function's AST (spec §4.2 per-function contract).
pub fn analyze_function(mut input: FunctionInput, id_strategy: IdStrategy) -> Result<FunctionFacts, CoreError> {
    let ctx = IdContext::new(input.key.clone(), id_strategy);
    assign_ids(&mut input.body, &ctx);
    for (i, param) in input.parameters.iter_mut().enumerate() {
        assign_ids_with_root(param, &ctx, &format!("param[{i}]"));
    }

    let ast_id = input
        .body
        .metadata()
        .ast_id
        .clone()
        .ok_or_else(|| CoreError::analysis(&input.key.module, &input.key.name, input.key.arity, "identifier assignment produced no root id"))?;

    let mut local_variables_preliminary = Vec::new();
    for param in &input.parameters {
        collect_pattern_names(param, &mut local_variables_preliminary);
    }

    let parameters = input
        .parameters
        .iter()
        .map(|p| {
            let mut names = Vec::new();
            collect_pattern_names(p, &mut names);
            ParameterPattern { pattern_ast: p.clone(), bound_names: names }
        })
        .collect();

    let mut direct_calls = Vec::new();
    collect_calls(&input.body, &mut direct_calls);

    let clauses = count_clauses(&input.body);
    let pattern_matches = count_pattern_matches(&input.body);
    let decision_points = count_decision_points(&input.body) + input.guards.len() as u32;

    let signature = format!("{}({})", input.key.name, input.parameters.len());

    Ok(FunctionFacts {
        ast_id,
        is_public: input.is_public,
        signature,
        parameters,
        head_guards: input.guards,
        clauses,
        pattern_matches,
        local_variables_preliminary,
        direct_calls,
        complexity_preliminary: ComplexityPreliminary { decision_points },
        span: input.span,
        body: input.body,
    })
}

/// Collects every bound variable name in a (possibly nested) pattern.
fn collect_pattern_names(pattern: &Ast, out: &mut Vec<String>) {
    match pattern {
        Ast::VariableRef { name, .. } => out.push(name.clone()),
        Ast::Constructor { children, .. } => {
            for child in children {
                collect_pattern_names(child, out);
            }
        }
        _ => {}
    }
}

/// Records every `Call` node (spec §4.2 rule: `module=nil` for bare calls).
fn collect_calls(ast: &Ast, out: &mut Vec<CallSite>) {
    if let Ast::Call { callee, args, metadata } = ast {
        out.push(CallSite {
            module: callee.module.clone(),
            function: callee.function.clone(),
            arity: args.len(),
            call_site_ast_id: metadata.ast_id.clone().unwrap_or_default(),
            line: metadata.span.start_line,
        });
    }
    for child in ast.children() {
        collect_calls(child, out);
    }
}

fn count_clauses(ast: &Ast) -> usize {
    match ast {
        Ast::Constructor { kind, children, .. } if kind == "case" || kind == "cond" => {
            children.iter().filter(|c| matches!(c.kind_tag(), "case_clause" | "cond_clause")).count()
        }
        _ => ast.children().iter().map(count_clauses).sum(),
    }
}

fn count_pattern_matches(ast: &Ast) -> usize {
    let mut count = match ast {
        Ast::Constructor { kind, .. } if kind.starts_with("pattern") => 1,
        Ast::Constructor { kind, .. } if kind == "case_clause" => 1,
        _ => 0,
    };
    for child in ast.children() {
        count += count_pattern_matches(child);
    }
    count
}

/// Decision-point counting, mirrored exactly by C3's cyclomatic complexity
/// (spec §4.2, §4.3): `case` contributes `max(1, |clauses|-1)`, `if`
/// contributes 1, `cond` contributes `|clauses|-1`, `try` contributes 1 per
/// `rescue`/`catch` clause, guarded clauses add 1 per guard.
pub fn count_decision_points(ast: &Ast) -> u32 {
    let mut total = match ast {
        Ast::Constructor { kind, children, .. } if kind == "case" => {
            let n = children.iter().filter(|c| c.kind_tag() == "case_clause").count();
            std::cmp::max(1, n.saturating_sub(1)) as u32
        }
        Ast::Constructor { kind, .. } if kind == "if" => 1,
        Ast::Constructor { kind, children, .. } if kind == "cond" => {
            let n = children.iter().filter(|c| c.kind_tag() == "cond_clause").count();
            n.saturating_sub(1) as u32
        }
        Ast::Constructor { kind, children, .. } if kind == "try" => {
            children.iter().filter(|c| matches!(c.kind_tag(), "rescue_clause" | "catch_clause")).count() as u32
        }
        Ast::Constructor { kind, children, .. } if kind == "case_clause" || kind == "cond_clause" => {
            // A guard on a clause is its (optional) third/second child tagged "guard".
            children.iter().filter(|c| c.kind_tag() == "guard").count() as u32
        }
        _ => 0,
    };
    for child in ast.children() {
        total += count_decision_points(child);
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::{AstMetadata, Callee};

    fn var(name: &str) -> Ast {
        Ast::VariableRef { name: name.to_string(), metadata: AstMetadata::new(Span::zero()) }
    }

    fn block(children: Vec<Ast>) -> Ast {
        Ast::Constructor { kind: "block".to_string(), children, metadata: AstMetadata::new(Span::zero()) }
    }

    fn case_clause(pattern: Ast, body: Ast) -> Ast {
        Ast::Constructor { kind: "case_clause".to_string(), children: vec![pattern, body], metadata: AstMetadata::new(Span::zero()) }
    }

    #[test]
    fn direct_call_with_module_is_recorded() {
        let call = Ast::Call {
            callee: Callee { module: Some("Mod".to_string()), function: "fun".to_string() },
            args: vec![var("x")],
            metadata: AstMetadata::new(Span::zero()),
        };
        let mut calls = Vec::new();
        collect_calls(&call, &mut calls);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].module.as_deref(), Some("Mod"));
        assert_eq!(calls[0].arity, 1);
    }

    #[test]
    fn bare_call_has_no_module() {
        let call = Ast::Call {
            callee: Callee { module: None, function: "fun".to_string() },
            args: vec![],
            metadata: AstMetadata::new(Span::zero()),
        };
        let mut calls = Vec::new();
        collect_calls(&call, &mut calls);
        assert_eq!(calls[0].module, None);
    }

    #[test]
    fn case_with_three_clauses_has_two_decision_points() {
        let case = Ast::Constructor {
            kind: "case".to_string(),
            children: vec![
                var("v"),
                case_clause(var("a"), block(vec![])),
                case_clause(var("b"), block(vec![])),
                case_clause(var("c"), block(vec![])),
            ],
            metadata: AstMetadata::new(Span::zero()),
        };
        assert_eq!(count_decision_points(&case), 2);
    }

    #[test]
    fn analyze_function_assigns_ids_and_collects_params() {
        let key = FunctionKey::new("M", "f", 1);
        let input = FunctionInput {
            key,
            is_public: true,
            parameters: vec![var("a")],
            guards: vec![],
            body: block(vec![var("a")]),
            span: Span::zero(),
        };
        let facts = analyze_function(input, IdStrategy::Path).unwrap();
        assert_eq!(facts.local_variables_preliminary, vec!["a".to_string()]);
        assert!(!facts.ast_id.is_empty());
        assert_eq!(facts.body.metadata().ast_id.as_deref(), Some(facts.ast_id.as_str()));
    }
}
