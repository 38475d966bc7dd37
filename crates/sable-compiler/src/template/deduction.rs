//! Template argument deduction from call arguments.
//!
//! Each parameter type as written is matched structurally against the
//! argument type, outermost derivation first:
//!
//! - a reference on the parameter matches the argument directly
//! - `const` is stripped from the argument when the parameter has it
//! - pointer and array derivations must appear on the argument
//! - a bare template parameter name binds to what remains
//! - `Stack<T>` matches an instance of `Stack` and recurses into its
//!   arguments
//!
//! Anything else is non-dependent and left to the conversion search.

use sable_core::derivation::{is_reference, outermost};
use sable_core::{Derivation, Result, Span};
use sable_registry::SymbolId;
use sable_syntax::{TypeExpr, TypeExprKind};

use crate::context::BindContext;
use crate::conversion::Argument;

/// Deduce the unbound entries of `bound` from `args`.
///
/// `bound[i]` for `i < explicit` were given explicitly and are never
/// overwritten or checked. Returns `false` when the arguments contradict
/// each other or the parameter shapes.
pub fn deduce_arguments(
    ctx: &mut BindContext,
    names: &[String],
    explicit: usize,
    parameter_types: &[TypeExpr],
    args: &[Argument],
    bound: &mut [Option<SymbolId>],
) -> Result<bool> {
    let mut deduction = Deduction {
        names,
        explicit,
        bound,
    };
    for (param, arg) in parameter_types.iter().zip(args) {
        if !deduction.mentions_any(param) {
            continue;
        }
        let (_, derivations) = param.peel();
        let mut actual = arg.ty;
        // By-value parameters ignore top-level const of the argument.
        if !is_reference(&derivations) {
            actual = strip_outer(ctx, actual, Derivation::Const)?.unwrap_or(actual);
        }
        if !deduction.deduce(ctx, param, actual)? {
            return Ok(false);
        }
    }
    Ok(true)
}

struct Deduction<'a> {
    names: &'a [String],
    explicit: usize,
    bound: &'a mut [Option<SymbolId>],
}

impl Deduction<'_> {
    fn mentions_any(&self, ty: &TypeExpr) -> bool {
        self.names.iter().any(|n| ty.mentions(n))
    }

    fn deduce(&mut self, ctx: &mut BindContext, param: &TypeExpr, actual: SymbolId) -> Result<bool> {
        if !self.mentions_any(param) {
            return Ok(true);
        }
        let (base, derivations) = param.peel();
        let mut actual = actual;
        for derivation in derivations.iter().rev() {
            match derivation {
                Derivation::LvalueRef | Derivation::RvalueRef => {}
                Derivation::Const => {
                    if let Some(stripped) = strip_outer(ctx, actual, Derivation::Const)? {
                        actual = stripped;
                    }
                }
                Derivation::Pointer | Derivation::Array => {
                    match strip_outer(ctx, actual, *derivation)? {
                        Some(stripped) => actual = stripped,
                        None => return Ok(false),
                    }
                }
            }
        }

        let TypeExprKind::Named { name, type_args } = &base.kind else {
            return Ok(true);
        };
        if type_args.is_empty() && !name.is_qualified() {
            if let Some(index) = self.names.iter().position(|n| n == name.last()) {
                return Ok(self.bind(index, actual));
            }
            return Ok(true);
        }

        // `Name<args>` against an instance of `Name`.
        let (root, root_derivations) = ctx.table.decompose(actual);
        if !root_derivations.is_empty() {
            return Ok(false);
        }
        let Some(instance) = ctx
            .table
            .symbol(root)
            .as_class()
            .and_then(|c| c.instance.clone())
        else {
            return Ok(false);
        };
        if ctx.table.symbol(instance.subject).name != name.last()
            || instance.arguments.len() < type_args.len()
        {
            return Ok(false);
        }
        for (arg_expr, arg) in type_args.iter().zip(&instance.arguments) {
            if !self.deduce(ctx, arg_expr, *arg)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn bind(&mut self, index: usize, actual: SymbolId) -> bool {
        if index < self.explicit {
            return true;
        }
        match self.bound[index] {
            Some(previous) => previous == actual,
            None => {
                self.bound[index] = Some(actual);
                true
            }
        }
    }
}

/// `ty` without its outermost derivation, if that derivation is `which`.
fn strip_outer(ctx: &mut BindContext, ty: SymbolId, which: Derivation) -> Result<Option<SymbolId>> {
    let (root, derivations) = ctx.table.decompose(ty);
    if outermost(derivations) != Some(which) {
        return Ok(None);
    }
    let rest = derivations[..derivations.len() - 1].to_vec();
    ctx.table.derived_from_root(root, rest, Span::default()).map(Some)
}
