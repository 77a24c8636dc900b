//! The parsed-AST sum type consumed by the core (spec §6, ingress).
//!
//! The engine never parses source text itself; an external `AstProvider`
//! (see `shared::ports`) hands back values of this type. Keeping it a small,
//! closed sum type is what lets C1-C5 stay language-agnostic.

use serde::{Deserialize, Serialize};

use super::span::Span;

/// Metadata attached to every AST node: its source span and, optionally, an
/// identifier pre-assigned by the provider (bypassing C1 for that node).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AstMetadata {
    pub span: Span,
    pub ast_id: Option<String>,
}

impl AstMetadata {
    pub fn new(span: Span) -> Self {
        Self {
            span,
            ast_id: None,
        }
    }
}

/// A literal value's kind, preserved only enough to drive complexity/shape
/// decisions — the engine never evaluates literals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LiteralKind {
    Integer,
    Float,
    String,
    Atom,
    Boolean,
    Nil,
    List,
    Tuple,
    Map,
}

/// The recursive AST sum type (spec §6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Ast {
    /// A literal scalar or collection value.
    Literal {
        kind: LiteralKind,
        text: String,
        metadata: AstMetadata,
    },
    /// A reference to a previously bound name.
    VariableRef { name: String, metadata: AstMetadata },
    /// A function call, `callee(args...)`. `callee` is `module::function` or
    /// bare `function` when the call has no explicit module qualifier
    /// (spec §4.2: recorded with `module = nil`, resolved later).
    Call {
        callee: Callee,
        args: Vec<Ast>,
        metadata: AstMetadata,
    },
    /// Any other syntactic constructor: assignment, `if`, `case`, `cond`,
    /// `try`, pipe, anonymous function, block, pattern, guard, etc.
    /// `kind` is a stable tag (e.g. `"if"`, `"case_clause"`, `"pipe"`)
    /// used by every builder to dispatch construction rules.
    Constructor {
        kind: String,
        children: Vec<Ast>,
        metadata: AstMetadata,
    },
}

/// The target of a `Call` node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Callee {
    pub module: Option<String>,
    pub function: String,
}

impl Ast {
    pub fn metadata(&self) -> &AstMetadata {
        match self {
            Ast::Literal { metadata, .. } => metadata,
            Ast::VariableRef { metadata, .. } => metadata,
            Ast::Call { metadata, .. } => metadata,
            Ast::Constructor { metadata, .. } => metadata,
        }
    }

    pub fn metadata_mut(&mut self) -> &mut AstMetadata {
        match self {
            Ast::Literal { metadata, .. } => metadata,
            Ast::VariableRef { metadata, .. } => metadata,
            Ast::Call { metadata, .. } => metadata,
            Ast::Constructor { metadata, .. } => metadata,
        }
    }

    /// Children in traversal order, for builders that only need generic
    /// depth-first walking (e.g. C1's identifier assignment).
    pub fn children(&self) -> &[Ast] {
        match self {
            Ast::Literal { .. } | Ast::VariableRef { .. } => &[],
            Ast::Call { args, .. } => args,
            Ast::Constructor { children, .. } => children,
        }
    }

    pub fn children_mut(&mut self) -> &mut [Ast] {
        match self {
            Ast::Literal { .. } | Ast::VariableRef { .. } => &mut [],
            Ast::Call { args, .. } => args,
            Ast::Constructor { children, .. } => children,
        }
    }

    /// The constructor tag used for `.kind[i]` path segments (spec §4.1).
    /// Literals and variable references use a fixed tag of their own.
    pub fn kind_tag(&self) -> &str {
        match self {
            Ast::Literal { .. } => "literal",
            Ast::VariableRef { .. } => "var",
            Ast::Call { .. } => "call",
            Ast::Constructor { kind, .. } => kind,
        }
    }

    pub fn line(&self) -> u32 {
        self.metadata().span.start_line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constructor(kind: &str, children: Vec<Ast>) -> Ast {
        Ast::Constructor {
            kind: kind.to_string(),
            children,
            metadata: AstMetadata::new(Span::zero()),
        }
    }

    #[test]
    fn children_of_call_are_its_args() {
        let call = Ast::Call {
            callee: Callee {
                module: None,
                function: "double".to_string(),
            },
            args: vec![Ast::VariableRef {
                name: "x".to_string(),
                metadata: AstMetadata::new(Span::zero()),
            }],
            metadata: AstMetadata::new(Span::zero()),
        };
        assert_eq!(call.children().len(), 1);
        assert_eq!(call.kind_tag(), "call");
    }

    #[test]
    fn constructor_kind_tag_is_its_kind() {
        let n = constructor("if", vec![]);
        assert_eq!(n.kind_tag(), "if");
    }
}
