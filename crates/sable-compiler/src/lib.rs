//! Sable Compiler
//!
//! The semantic core of the Sable compiler: a 3-pass binder that turns
//! declaration trees into a fully resolved symbol table plus bound bodies.
//!
//! ## Architecture
//!
//! - **Pass 1 (Registration)**: declare every namespace, type, function, and
//!   variable; types get their [`TypeId`](sable_core::TypeId)
//! - **Pass 2 (Completion)**: resolve `using` directives, base classes,
//!   signatures, and variable types; build virtual tables; evaluate constants
//! - **Pass 3 (Compilation)**: bind function bodies with overload resolution;
//!   template instances and replicas are bound on demand
//!
//! ## Modules
//!
//! - [`bound`]: Bound expression and statement tree
//! - [`context`]: Per-unit binding state
//! - [`conversion`]: Argument conversions and their ranks
//! - [`overload`]: Overload resolution
//! - [`passes`]: The three binding passes
//! - [`template`]: Lazy class and function template instantiation
//! - [`type_resolver`]: Type expressions to type symbols

pub mod bound;
pub mod context;
pub mod conversion;
pub mod overload;
pub mod passes;
pub mod template;
pub mod type_resolver;

pub use bound::{BoundExpr, BoundExprKind, BoundFunction, BoundStmt, ValueCategory};
pub use context::BindContext;
pub use conversion::{Argument, Conversion, ConversionKind, ConversionMode, find_conversion};
pub use overload::{CallSite, OverloadMatch, ResolveFlags, resolve_overload};
pub use passes::{CompilationPass, CompletionPass, RegistrationOutput, RegistrationPass};
pub use type_resolver::TypeResolver;

pub use sable_core::{Diagnostics, SemanticError};

use sable_syntax::SourceFile;
use tracing::info;

/// Counts reported by [`bind_unit`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BindSummary {
    pub types_registered: usize,
    pub functions_registered: usize,
    pub globals_registered: usize,
    pub functions_compiled: usize,
}

/// Run all three passes over `files`.
///
/// Registration keeps going after an error so that every duplicate in the
/// unit is reported at once; completion and compilation stop at the first
/// error. On failure the collected errors are returned.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn bind_unit(ctx: &mut BindContext, files: &[SourceFile]) -> Result<BindSummary, Diagnostics> {
    let registration = RegistrationPass::new(ctx).run(files);
    if !registration.errors.is_empty() {
        let mut diagnostics = Diagnostics::new();
        for error in registration.errors {
            diagnostics.push(error);
        }
        return Err(diagnostics);
    }

    let fail = |error: SemanticError| {
        let mut diagnostics = Diagnostics::new();
        diagnostics.push(error);
        diagnostics
    };
    CompletionPass::new(ctx).run(files, &registration.declared).map_err(fail)?;
    let compilation = CompilationPass::new(ctx).run(&registration.declared).map_err(fail)?;

    let summary = BindSummary {
        types_registered: registration.types_registered,
        functions_registered: registration.functions_registered,
        globals_registered: registration.globals_registered,
        functions_compiled: compilation.functions_compiled,
    };
    info!(
        unit = %ctx.settings.unit_name,
        types = summary.types_registered,
        functions = summary.functions_registered,
        bodies = summary.functions_compiled,
        "unit bound"
    );
    Ok(summary)
}
