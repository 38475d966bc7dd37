//! Sable: the semantic core of a statically typed, C++-like language.
//!
//! Takes declaration trees from a parser, builds a resolved symbol table
//! with overload resolution and lazy template instantiation, and moves
//! exported symbols between compile units through module files.
//!
//! The work is split across the workspace crates, re-exported here:
//!
//! - [`sable_core`]: spans, type identities, flags, errors, settings
//! - [`sable_syntax`]: the declaration and expression trees handed over by the parser
//! - [`sable_registry`]: the symbol table
//! - [`sable_compiler`]: the three binding passes
//! - [`sable_module`]: module file export and import
//!
//! [`Unit`] drives all of them for one compile unit.

mod unit;

pub use {sable_compiler, sable_core, sable_module, sable_registry, sable_syntax};

pub mod prelude {
    pub use crate::unit::{Unit, UnitError};
    pub use sable_compiler::{BindSummary, BoundExpr, BoundExprKind, BoundFunction, BoundStmt};
    pub use sable_core::{Diagnostics, QualifiedName, SemanticError, Span, TypeId, UnitSettings};
    pub use sable_module::ImportSummary;
    pub use sable_registry::{SymbolId, SymbolTable};
    pub use sable_syntax::SourceFile;
}

pub use prelude::*;
