//! Expression and statement nodes.
//!
//! Only the forms the binder resolves are modelled: literals, names,
//! calls, construction, address-of and casts. Operators arrive from the
//! parser already lowered to calls.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use sable_core::{QualifiedName, Span};

use crate::TypeExpr;

/// A literal value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Literal {
    Bool(bool),
    Int(i64),
    Float(OrderedFloat<f64>),
    Char(char),
    Null,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    Literal(Literal),
    /// A variable, constant, or enum constant reference.
    Ident(QualifiedName),
    /// A free call `f(args)` or `f<T>(args)`.
    Call {
        callee: QualifiedName,
        type_args: Vec<TypeExpr>,
        args: Vec<Expr>,
    },
    /// A member call `receiver.method(args)`.
    MemberCall {
        receiver: Box<Expr>,
        method: String,
        args: Vec<Expr>,
    },
    /// A member variable access `receiver.field`.
    Member { receiver: Box<Expr>, field: String },
    /// `&operand`
    AddressOf(Box<Expr>),
    /// `T(args)`: construct a value of `T`.
    Construct { ty: TypeExpr, args: Vec<Expr> },
    /// `cast<T>(operand)`
    Cast { ty: TypeExpr, operand: Box<Expr> },
}

impl Expr {
    pub fn new(kind: ExprKind) -> Self {
        Self {
            kind,
            span: Span::default(),
        }
    }

    pub fn int(value: i64) -> Self {
        Self::new(ExprKind::Literal(Literal::Int(value)))
    }

    pub fn float(value: f64) -> Self {
        Self::new(ExprKind::Literal(Literal::Float(OrderedFloat(value))))
    }

    pub fn boolean(value: bool) -> Self {
        Self::new(ExprKind::Literal(Literal::Bool(value)))
    }

    pub fn character(value: char) -> Self {
        Self::new(ExprKind::Literal(Literal::Char(value)))
    }

    pub fn null() -> Self {
        Self::new(ExprKind::Literal(Literal::Null))
    }

    pub fn ident(name: &str) -> Self {
        Self::new(ExprKind::Ident(QualifiedName::parse(name)))
    }

    pub fn call(callee: &str, args: Vec<Expr>) -> Self {
        Self::new(ExprKind::Call {
            callee: QualifiedName::parse(callee),
            type_args: Vec::new(),
            args,
        })
    }

    pub fn generic_call(callee: &str, type_args: Vec<TypeExpr>, args: Vec<Expr>) -> Self {
        Self::new(ExprKind::Call {
            callee: QualifiedName::parse(callee),
            type_args,
            args,
        })
    }

    pub fn member_call(self, method: &str, args: Vec<Expr>) -> Self {
        Self::new(ExprKind::MemberCall {
            receiver: Box::new(self),
            method: method.to_string(),
            args,
        })
    }

    pub fn member(self, field: &str) -> Self {
        Self::new(ExprKind::Member {
            receiver: Box::new(self),
            field: field.to_string(),
        })
    }

    pub fn address_of(self) -> Self {
        Self::new(ExprKind::AddressOf(Box::new(self)))
    }

    pub fn construct(ty: TypeExpr, args: Vec<Expr>) -> Self {
        Self::new(ExprKind::Construct { ty, args })
    }

    pub fn cast(ty: TypeExpr, operand: Expr) -> Self {
        Self::new(ExprKind::Cast {
            ty,
            operand: Box::new(operand),
        })
    }

    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

/// A statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    /// `T name = init;`
    Local {
        name: String,
        ty: TypeExpr,
        init: Option<Expr>,
        span: Span,
    },
    Expr(Expr),
    Return { value: Option<Expr>, span: Span },
    Block(Block),
}

impl Stmt {
    pub fn local(name: &str, ty: TypeExpr, init: Option<Expr>) -> Self {
        Stmt::Local {
            name: name.to_string(),
            ty,
            init,
            span: Span::default(),
        }
    }

    pub fn ret(value: Option<Expr>) -> Self {
        Stmt::Return {
            value,
            span: Span::default(),
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Stmt::Local { span, .. } | Stmt::Return { span, .. } => *span,
            Stmt::Expr(expr) => expr.span,
            Stmt::Block(block) => block.span,
        }
    }
}

/// A `{ ... }` block.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

impl Block {
    pub fn new(stmts: Vec<Stmt>) -> Self {
        Self {
            stmts,
            span: Span::default(),
        }
    }
}
