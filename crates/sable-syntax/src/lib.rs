//! Owned syntax tree consumed by the binder.
//!
//! The parser is an external collaborator: it hands the binder a
//! [`SourceFile`] per source file, with spans already attached. The tree is
//! fully owned and serializable so generic declarations can be embedded in
//! module files and instantiated by importing units.
//!
//! Every node also has small builder helpers, used by drivers and tests to
//! assemble trees without a parser.

mod decl;
mod expr;
mod types;

pub use decl::{
    CONSTRUCTOR_GROUP, CONVERSION_GROUP, ClassDecl, ClassKind, ConstantDecl, DelegateDecl,
    EnumConstantDecl, EnumDecl, FunctionDecl, FunctionKind, Item, NamespaceDecl, Param,
    SourceFile, Specifiers, TypeParam, TypedefDecl, UsingDirective, VariableDecl,
};
pub use expr::{Block, Expr, ExprKind, Literal, Stmt};
pub use types::{TypeExpr, TypeExprKind};
