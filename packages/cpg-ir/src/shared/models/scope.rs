//! Scope tree (spec §3).
//!
//! Scopes are stable ids with parent links, not a recursion-over-ownership
//! tree — lookups walk an arena by index, never the call stack (design note,
//! spec §9).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScopeKind {
    Function,
    CaseClause,
    IfBranch,
    CondClause,
    Rescue,
    Catch,
    After,
    AnonFn,
    Block,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scope {
    pub id: u32,
    pub kind: ScopeKind,
    /// `None` only for the function's root scope.
    pub parent: Option<u32>,
    pub ast_id: String,
}

/// An arena of scopes for one function, rooted at index 0 (the function
/// scope). Traversal to the root is iterative.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
}

impl ScopeTree {
    pub fn new() -> Self {
        Self { scopes: Vec::new() }
    }

    /// Create the root (function) scope. Must be called before any other
    /// `push`.
    pub fn push_root(&mut self, ast_id: impl Into<String>) -> u32 {
        debug_assert!(self.scopes.is_empty());
        let id = 0;
        self.scopes.push(Scope {
            id,
            kind: ScopeKind::Function,
            parent: None,
            ast_id: ast_id.into(),
        });
        id
    }

    pub fn push(&mut self, kind: ScopeKind, parent: u32, ast_id: impl Into<String>) -> u32 {
        let id = self.scopes.len() as u32;
        self.scopes.push(Scope {
            id,
            kind,
            parent: Some(parent),
            ast_id: ast_id.into(),
        });
        id
    }

    pub fn get(&self, id: u32) -> Option<&Scope> {
        self.scopes.get(id as usize)
    }

    pub fn all(&self) -> &[Scope] {
        &self.scopes
    }

    /// Iterate from `id` up to (and including) the function root.
    pub fn ancestors(&self, id: u32) -> impl Iterator<Item = &Scope> {
        let mut current = Some(id);
        std::iter::from_fn(move || {
            let scope = current.and_then(|i| self.get(i))?;
            current = scope.parent;
            Some(scope)
        })
    }

    pub fn is_ancestor(&self, ancestor: u32, of: u32) -> bool {
        self.ancestors(of).any(|s| s.id == ancestor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ancestors_walk_to_root() {
        let mut tree = ScopeTree::new();
        let root = tree.push_root("fn");
        let branch = tree.push(ScopeKind::IfBranch, root, "if.then");
        let ids: Vec<u32> = tree.ancestors(branch).map(|s| s.id).collect();
        assert_eq!(ids, vec![branch, root]);
    }

    #[test]
    fn is_ancestor_detects_nested_scopes() {
        let mut tree = ScopeTree::new();
        let root = tree.push_root("fn");
        let branch = tree.push(ScopeKind::IfBranch, root, "if.then");
        assert!(tree.is_ancestor(root, branch));
        assert!(!tree.is_ancestor(branch, root));
    }
}
