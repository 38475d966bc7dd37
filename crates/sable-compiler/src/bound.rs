//! Bound tree handed to the emitter.
//!
//! Every expression carries its resolved type and value category; every
//! call names the selected function and carries the argument conversions
//! already spliced in as [`BoundExprKind::Convert`] nodes.

use sable_core::Span;
use sable_registry::SymbolId;
use sable_syntax::Literal;

/// Value category of an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueCategory {
    /// A temporary.
    Value,
    /// A named, addressable object.
    LValue,
    /// An expiring object bound to `T&&`.
    RValue,
    /// The result of `&x`.
    Address,
}

impl ValueCategory {
    pub fn is_lvalue(self) -> bool {
        self == ValueCategory::LValue
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoundExpr {
    pub kind: BoundExprKind,
    /// Value type of the expression; never a reference.
    pub ty: SymbolId,
    pub category: ValueCategory,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoundExprKind {
    Literal(Literal),
    /// Local, parameter, global variable, or constant.
    Variable(SymbolId),
    EnumConstant(SymbolId),
    /// The receiver object `*this` of a member function.
    This,
    Member {
        receiver: Box<BoundExpr>,
        field: SymbolId,
    },
    Call {
        function: SymbolId,
        receiver: Option<Box<BoundExpr>>,
        args: Vec<BoundExpr>,
        /// Dispatch through the receiver's virtual table.
        virtual_dispatch: bool,
    },
    Construct {
        class: SymbolId,
        /// `None` for implicit default construction.
        constructor: Option<SymbolId>,
        args: Vec<BoundExpr>,
    },
    /// A conversion function applied to `operand`; `None` for conversions
    /// that only reinterpret (null to pointer, enum to its underlying type).
    Convert {
        function: Option<SymbolId>,
        operand: Box<BoundExpr>,
    },
    AddressOf(Box<BoundExpr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoundStmt {
    Local {
        symbol: SymbolId,
        init: Option<BoundExpr>,
    },
    Expr(BoundExpr),
    Return(Option<BoundExpr>),
    Block(Vec<BoundStmt>),
}

/// A function with its bound body.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundFunction {
    pub function: SymbolId,
    pub body: Vec<BoundStmt>,
}

impl BoundExpr {
    pub fn new(kind: BoundExprKind, ty: SymbolId, category: ValueCategory, span: Span) -> Self {
        Self {
            kind,
            ty,
            category,
            span,
        }
    }

    /// Function selected by this expression, if it is a call.
    pub fn callee(&self) -> Option<SymbolId> {
        match &self.kind {
            BoundExprKind::Call { function, .. } => Some(*function),
            BoundExprKind::Construct { constructor, .. } => *constructor,
            _ => None,
        }
    }
}

impl BoundFunction {
    /// Every call expression in the body, outermost first.
    pub fn calls(&self) -> Vec<&BoundExpr> {
        let mut out = Vec::new();
        for stmt in &self.body {
            collect_stmt(stmt, &mut out);
        }
        out
    }
}

fn collect_stmt<'a>(stmt: &'a BoundStmt, out: &mut Vec<&'a BoundExpr>) {
    match stmt {
        BoundStmt::Local { init, .. } => {
            if let Some(e) = init {
                collect_expr(e, out);
            }
        }
        BoundStmt::Expr(e) => collect_expr(e, out),
        BoundStmt::Return(value) => {
            if let Some(e) = value {
                collect_expr(e, out);
            }
        }
        BoundStmt::Block(stmts) => stmts.iter().for_each(|s| collect_stmt(s, out)),
    }
}

fn collect_expr<'a>(expr: &'a BoundExpr, out: &mut Vec<&'a BoundExpr>) {
    match &expr.kind {
        BoundExprKind::Call { receiver, args, .. } => {
            out.push(expr);
            if let Some(r) = receiver {
                collect_expr(r, out);
            }
            args.iter().for_each(|a| collect_expr(a, out));
        }
        BoundExprKind::Construct { args, .. } => {
            out.push(expr);
            args.iter().for_each(|a| collect_expr(a, out));
        }
        BoundExprKind::Member { receiver, .. } => collect_expr(receiver, out),
        BoundExprKind::Convert { operand, .. } | BoundExprKind::AddressOf(operand) => {
            collect_expr(operand, out)
        }
        BoundExprKind::Literal(_)
        | BoundExprKind::Variable(_)
        | BoundExprKind::EnumConstant(_)
        | BoundExprKind::This => {}
    }
}
