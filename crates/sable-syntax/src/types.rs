//! Type expressions as written in source.

use serde::{Deserialize, Serialize};

use sable_core::{Derivation, QualifiedName, Span};

/// A type expression.
///
/// Examples:
/// - `int`
/// - `System.String`
/// - `Stack<int>`
/// - `const Foo&`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeExpr {
    pub kind: TypeExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeExprKind {
    /// A possibly qualified name with optional template arguments.
    Named {
        name: QualifiedName,
        type_args: Vec<TypeExpr>,
    },
    /// A type with one more derivation applied on the outside.
    Derived {
        inner: Box<TypeExpr>,
        derivation: Derivation,
    },
}

impl TypeExpr {
    /// `name` without template arguments.
    pub fn named(name: &str) -> Self {
        Self {
            kind: TypeExprKind::Named {
                name: QualifiedName::parse(name),
                type_args: Vec::new(),
            },
            span: Span::default(),
        }
    }

    /// `name<args...>`.
    pub fn generic(name: &str, type_args: Vec<TypeExpr>) -> Self {
        Self {
            kind: TypeExprKind::Named {
                name: QualifiedName::parse(name),
                type_args,
            },
            span: Span::default(),
        }
    }

    /// Apply a derivation on the outside.
    pub fn derive(self, derivation: Derivation) -> Self {
        let span = self.span;
        Self {
            kind: TypeExprKind::Derived {
                inner: Box::new(self),
                derivation,
            },
            span,
        }
    }

    pub fn constant(self) -> Self {
        self.derive(Derivation::Const)
    }

    pub fn pointer(self) -> Self {
        self.derive(Derivation::Pointer)
    }

    pub fn lvalue_ref(self) -> Self {
        self.derive(Derivation::LvalueRef)
    }

    pub fn rvalue_ref(self) -> Self {
        self.derive(Derivation::RvalueRef)
    }

    pub fn array(self) -> Self {
        self.derive(Derivation::Array)
    }

    /// Set the span.
    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Split into the innermost named type and the derivations applied to
    /// it, innermost first.
    pub fn peel(&self) -> (&TypeExpr, Vec<Derivation>) {
        let mut derivations = Vec::new();
        let mut current = self;
        while let TypeExprKind::Derived { inner, derivation } = &current.kind {
            derivations.push(*derivation);
            current = inner;
        }
        derivations.reverse();
        (current, derivations)
    }

    /// Whether any named component of this type is `name` (unqualified,
    /// without arguments).
    pub fn mentions(&self, name: &str) -> bool {
        match &self.kind {
            TypeExprKind::Named { name: n, type_args } => {
                (!n.is_qualified() && n.last() == name && type_args.is_empty())
                    || type_args.iter().any(|arg| arg.mentions(name))
            }
            TypeExprKind::Derived { inner, .. } => inner.mentions(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peel_returns_innermost_first() {
        let ty = TypeExpr::named("int").constant().pointer().lvalue_ref();
        let (base, derivations) = ty.peel();
        assert_eq!(base, &TypeExpr::named("int"));
        assert_eq!(
            derivations,
            vec![Derivation::Const, Derivation::Pointer, Derivation::LvalueRef]
        );
    }

    #[test]
    fn mentions_template_parameter() {
        let ty = TypeExpr::generic("Stack", vec![TypeExpr::named("T").pointer()]);
        assert!(ty.mentions("T"));
        assert!(!ty.mentions("U"));
        assert!(!TypeExpr::named("A.T").mentions("T"));
    }
}
