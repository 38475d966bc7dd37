//! Function template replicas.

use tracing::debug;

use sable_core::{Result, SemanticError, Span, SymbolFlags};
use sable_registry::symbol::{FunctionData, FunctionInstance, Symbol, SymbolKind};
use sable_registry::SymbolId;

use super::deduction::deduce_arguments;
use super::substitution::{complete_arguments, install_bound_parameters};
use crate::context::BindContext;
use crate::conversion::Argument;
use crate::passes::completion::bind_signature;
use crate::passes::registration::declare_parameters;

/// The replica of `generic` a call with `type_args` and `args` would use.
///
/// Explicit arguments fill the leading parameters, deduction the rest and
/// defaults whatever deduction leaves open. `None` when the candidate does
/// not fit the call; errors are reserved for failures inside the replica.
pub fn instantiate_function_for_call(
    ctx: &mut BindContext,
    generic: SymbolId,
    type_args: &[SymbolId],
    args: &[Argument],
    span: Span,
) -> Result<Option<SymbolId>> {
    let Some(data) = ctx.table.symbol(generic).as_function() else {
        return Ok(None);
    };
    let Some(declaration) = data.declaration.as_ref() else {
        return Ok(None);
    };
    let parameters = data.template_parameters.clone();
    if type_args.len() > parameters.len() || declaration.params.len() != args.len() {
        return Ok(None);
    }
    let parameter_types: Vec<_> = declaration.params.iter().map(|p| p.ty.clone()).collect();
    let names: Vec<String> = parameters
        .iter()
        .map(|p| ctx.table.symbol(*p).name.clone())
        .collect();

    let mut bound: Vec<Option<SymbolId>> = vec![None; parameters.len()];
    for (slot, arg) in bound.iter_mut().zip(type_args) {
        *slot = Some(*arg);
    }
    if !deduce_arguments(ctx, &names, type_args.len(), &parameter_types, args, &mut bound)? {
        return Ok(None);
    }

    // Defaults only fill a trailing run of undeduced parameters.
    let known = bound.iter().take_while(|b| b.is_some()).count();
    if bound[known..].iter().any(Option::is_some) {
        return Ok(None);
    }
    bound.truncate(known);
    let arguments = match complete_arguments(ctx, generic, &parameters, &bound, span) {
        Ok(arguments) => arguments,
        Err(SemanticError::MissingTypeArgument { .. }) => return Ok(None),
        Err(e) => return Err(e),
    };
    instantiate_function(ctx, generic, &arguments, span).map(Some)
}

/// The replica of `generic` for `arguments`, bound on first request.
///
/// Replicas are cached by generic function and argument identities. They
/// never join the overload group of the generic function.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn instantiate_function(
    ctx: &mut BindContext,
    generic: SymbolId,
    arguments: &[SymbolId],
    span: Span,
) -> Result<SymbolId> {
    let mut key = Vec::with_capacity(arguments.len());
    for arg in arguments {
        key.push(ctx.table.type_id_of(*arg)?);
    }
    if let Some(replica) = ctx.table.function_replica(generic, &key) {
        return Ok(replica);
    }

    let symbol = ctx.table.symbol(generic);
    let Some(data) = symbol.as_function().filter(|f| f.is_generic()) else {
        return Err(SemanticError::NotATemplate {
            name: ctx.table.full_name(generic),
            span,
        });
    };
    let mut declaration = data.declaration.clone().ok_or_else(|| {
        SemanticError::internal(format!("template '{}' has no declaration", symbol.name))
    })?;
    declaration.type_params.clear();
    let kind = data.kind;
    let parameters = data.template_parameters.clone();
    let enclosing = ctx.table.scope(data.scope).parent;
    let name = symbol.name.clone();
    let access = symbol.access;
    let flags = ((symbol.flags & SymbolFlags::PERSISTENT) - SymbolFlags::TEMPLATE) | SymbolFlags::REPLICA;
    let parent = symbol.parent;
    let declared_at = symbol.span;

    let shown = format!(
        "{}<{}>",
        ctx.table.full_name(generic),
        arguments
            .iter()
            .map(|a| ctx.table.type_name(*a))
            .collect::<Vec<_>>()
            .join(", ")
    );
    ctx.enter_template(&shown, span)?;

    let binding = ctx.table.add_scope(None, enclosing);
    let result = install_bound_parameters(&mut ctx.table, binding, &parameters, arguments).and_then(|()| {
        let scope = ctx.table.add_scope(None, Some(binding));
        let mut replica_data = FunctionData::new(kind, scope, SymbolId::UNRESOLVED);
        replica_data.instance = Some(FunctionInstance {
            generic,
            arguments: arguments.to_vec(),
        });
        replica_data.declaration = Some(declaration.clone());

        let mut replica = Symbol::new(name, declared_at, SymbolKind::Function(replica_data))
            .with_access(access)
            .with_flags(flags);
        replica.parent = parent;
        let replica = ctx.table.add_symbol(replica);
        ctx.table.scope_mut(scope).owner = Some(replica);
        declare_parameters(&mut ctx.table, replica, scope, &declaration.params)?;

        let replica = ctx.table.add_function_replica(generic, key, replica);
        bind_signature(ctx, replica)?;
        Ok(replica)
    });
    ctx.leave_template();
    let replica = result?;

    debug!(replica = %shown, "function template instantiated");
    Ok(replica)
}
