//! C1 — Node Identifier (spec §4.1).
//!
//! Assigns a unique, reproducible `ast_id` to every node of a function's
//! AST, of the form `Module:function:arity:path` where `path` is the
//! depth-first positional path from the function root (e.g.
//! `body.case[1].clause[0].body.2`).

use serde::{Deserialize, Serialize};

use crate::shared::models::{Ast, FunctionKey};

/// The three id-generation strategies a caller may select (spec §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum IdStrategy {
    /// Pure positional path; two structurally-identical functions with
    /// different line numbers get identical ids.
    #[default]
    Path,
    /// Path suffixed with a hash of the starting line, so cosmetic
    /// reorderings that change line numbers (but not structure) produce
    /// distinct ids.
    PathHashLine,
    /// Content-addressable: a digest of the path plus the node's own
    /// textual shape.
    ContentHash,
}

/// Parsed components of an `ast_id`, extracted without a repository lookup
/// (spec §4.1 `parse_id`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAstId {
    pub module: String,
    pub function: String,
    pub arity: usize,
    pub path: String,
}

/// Depth-first traversal context threaded through `assign_ids`. Carries the
/// owning function key and chosen strategy; anonymous functions push a
/// nested prefix so their body's ids are namespaced under the outer `fn`
/// construct's own id (spec §4.1 edge cases).
pub struct IdContext {
    function_key: FunctionKey,
    strategy: IdStrategy,
}

impl IdContext {
    pub fn new(function_key: FunctionKey, strategy: IdStrategy) -> Self {
        Self { function_key, strategy }
    }

    fn prefix(&self) -> String {
        format!(
            "{}:{}:{}",
            self.function_key.module, self.function_key.name, self.function_key.arity
        )
    }
}

/// Assigns an `ast_id` to every node of `root`, mutating `metadata.ast_id`
/// in place. The function root itself receives path `"body"`.
pub fn assign_ids(root: &mut Ast, ctx: &IdContext) {
    assign_recursive(root, ctx, "body", 0);
}

/// Same traversal, rooted at an arbitrary path instead of `"body"`. Used to
/// id parameter patterns under `param[i]`, a separate namespace from the
/// body tree they share a function with (spec §4.1: "every node of a
/// function's AST", which includes its head patterns).
pub fn assign_ids_with_root(root: &mut Ast, ctx: &IdContext, root_path: &str) {
    assign_recursive(root, ctx, root_path, 0);
}

fn assign_recursive(node: &mut Ast, ctx: &IdContext, path: &str, _depth: usize) {
    let line = node.line();
    let kind = node.kind_tag().to_string();
    let id = format_id(ctx, path, &kind, line);
    node.metadata_mut().ast_id = Some(id.clone());

    let anon_fn = kind == "fn" || kind == "anon_fn_def";
    let child_path_root = if anon_fn { format!("{id}.body") } else { path.to_string() };

    for (i, child) in node.children_mut().iter_mut().enumerate() {
        let child_kind = child.kind_tag().to_string();
        let child_path = if anon_fn {
            format!("{child_path_root}.{child_kind}[{i}]")
        } else {
            format!("{path}.{child_kind}[{i}]")
        };
        assign_recursive(child, ctx, &child_path, _depth + 1);
    }
}

fn format_id(ctx: &IdContext, path: &str, kind: &str, line: u32) -> String {
    match ctx.strategy {
        IdStrategy::Path => format!("{}:{}", ctx.prefix(), path),
        IdStrategy::PathHashLine => format!("{}:{}#L{}", ctx.prefix(), path, line),
        IdStrategy::ContentHash => {
            let digest = crate::shared::utils::id_generator::content_hash(
                format!("{}:{}:{}:{}", ctx.prefix(), path, kind, line).as_bytes(),
            );
            format!("{}:{}~{}", ctx.prefix(), path, &digest[..12])
        }
    }
}

/// Inverse of the `path`/`path_hash_line` id format: cheap context
/// extraction without a repository lookup (spec §4.1 `parse_id`).
pub fn parse_id(ast_id: &str) -> Option<ParsedAstId> {
    let mut parts = ast_id.splitn(4, ':');
    let module = parts.next()?.to_string();
    let function = parts.next()?.to_string();
    let arity: usize = parts.next()?.parse().ok()?;
    let path = parts.next()?.to_string();
    Some(ParsedAstId { module, function, arity, path })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::{AstMetadata, Span};

    fn leaf(kind: &str) -> Ast {
        Ast::Constructor { kind: kind.to_string(), children: vec![], metadata: AstMetadata::new(Span::zero()) }
    }

    #[test]
    fn ids_are_stable_across_reruns() {
        let key = FunctionKey::new("M", "f", 1);
        let mut ast1 = Ast::Constructor {
            kind: "block".to_string(),
            children: vec![leaf("if"), leaf("case")],
            metadata: AstMetadata::new(Span::zero()),
        };
        let mut ast2 = ast1.clone();

        let ctx = IdContext::new(key, IdStrategy::Path);
        assign_ids(&mut ast1, &ctx);
        assign_ids(&mut ast2, &ctx);

        let ids1: Vec<_> = collect_ids(&ast1);
        let ids2: Vec<_> = collect_ids(&ast2);
        assert_eq!(ids1, ids2);
    }

    #[test]
    fn ids_are_unique_within_a_function() {
        let key = FunctionKey::new("M", "f", 1);
        let mut ast = Ast::Constructor {
            kind: "block".to_string(),
            children: vec![leaf("if"), leaf("if"), leaf("case")],
            metadata: AstMetadata::new(Span::zero()),
        };
        let ctx = IdContext::new(key, IdStrategy::Path);
        assign_ids(&mut ast, &ctx);

        let ids = collect_ids(&ast);
        let mut sorted = ids.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(ids.len(), sorted.len());
    }

    #[test]
    fn path_hash_line_changes_with_line() {
        let key = FunctionKey::new("M", "f", 1);
        let mut ast1 = leaf("if");
        let mut ast2 = leaf("if");
        if let Ast::Constructor { metadata, .. } = &mut ast2 {
            metadata.span = Span::new(5, 0, 5, 0);
        }

        let ctx = IdContext::new(key, IdStrategy::PathHashLine);
        assign_ids(&mut ast1, &ctx);
        assign_ids(&mut ast2, &ctx);

        assert_ne!(ast1.metadata().ast_id, ast2.metadata().ast_id);
    }

    #[test]
    fn parse_id_roundtrips_path_strategy() {
        let key = FunctionKey::new("MyMod", "my_fun", 2);
        let mut ast = leaf("if");
        let ctx = IdContext::new(key, IdStrategy::Path);
        assign_ids(&mut ast, &ctx);

        let id = ast.metadata().ast_id.clone().unwrap();
        let parsed = parse_id(&id).unwrap();
        assert_eq!(parsed.module, "MyMod");
        assert_eq!(parsed.function, "my_fun");
        assert_eq!(parsed.arity, 2);
    }

    fn collect_ids(node: &Ast) -> Vec<String> {
        let mut out = vec![node.metadata().ast_id.clone().unwrap()];
        for child in node.children() {
            out.extend(collect_ids(child));
        }
        out
    }
}
