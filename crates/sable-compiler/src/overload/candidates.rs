//! Candidate gathering.

use sable_core::{Derivation, Result, Span, SymbolFlags};
use sable_registry::{SymbolId, SymbolTable};
use sable_syntax::FunctionKind;

use super::CallSite;
use crate::context::BindContext;
use crate::template;

/// Replace generic candidates by their replicas for this call.
///
/// A generic function whose arguments cannot be deduced, or whose explicit
/// argument count does not fit, is dropped. Non-generic candidates are
/// dropped when explicit type arguments are given.
pub fn expand_candidates(ctx: &mut BindContext, call: &CallSite<'_>) -> Result<Vec<SymbolId>> {
    let mut out = Vec::with_capacity(call.candidates.len());
    for &candidate in call.candidates {
        let Some(data) = ctx.table.symbol(candidate).as_function() else {
            continue;
        };
        if data.is_generic() {
            if let Some(replica) = template::instantiate_function_for_call(
                ctx,
                candidate,
                call.type_args,
                call.args,
                call.span,
            )? {
                if !out.contains(&replica) {
                    out.push(replica);
                }
            }
        } else if call.type_args.is_empty() {
            out.push(candidate);
        }
    }
    Ok(out)
}

/// Functions named `name` visible as members of `class`: its own, then
/// those of its base classes that a derived function with the same
/// signature does not hide.
pub fn member_candidates(table: &SymbolTable, class: SymbolId, name: &str) -> Vec<SymbolId> {
    let mut out: Vec<SymbolId> = Vec::new();
    let mut current = Some(class);
    while let Some(c) = current {
        let Some(data) = table.symbol(c).as_class() else {
            break;
        };
        if let Some(group) = table.scope(data.scope).get(name) {
            for &function in table.group_functions(group) {
                if !out.iter().any(|f| table.same_signature(*f, function)) {
                    out.push(function);
                }
            }
        }
        current = data.base_class;
    }
    out
}

/// The implicit receiver parameter type of a member function: `C&`, or
/// `const C&` for const functions. `None` for free and static functions.
pub fn receiver_parameter(table: &mut SymbolTable, function: SymbolId) -> Result<Option<SymbolId>> {
    let symbol = table.symbol(function);
    let is_constructor = symbol
        .as_function()
        .is_some_and(|f| f.kind == FunctionKind::Constructor);
    if symbol.has(SymbolFlags::STATIC) || is_constructor {
        return Ok(None);
    }
    let Some(owner) = symbol.parent.filter(|p| table.symbol(*p).as_class().is_some()) else {
        return Ok(None);
    };
    let derivations: &[Derivation] = if symbol.has(SymbolFlags::CONST) {
        &[Derivation::Const, Derivation::LvalueRef]
    } else {
        &[Derivation::LvalueRef]
    };
    table.make_derived_type(owner, derivations, Span::default()).map(Some)
}
