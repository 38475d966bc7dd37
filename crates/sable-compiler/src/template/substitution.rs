//! Template arguments: parameter binding and default arguments.
//!
//! Substitution never rewrites syntax. Each instantiation gets a scope in
//! which every template parameter name is bound to its argument; resolving
//! the cloned declaration inside that scope yields the substituted types.

use sable_core::{Result, SemanticError, Span, SymbolFlags};
use sable_registry::symbol::{Symbol, SymbolKind, TemplateParameterData};
use sable_registry::{ScopeId, SymbolId, SymbolTable};

use crate::context::BindContext;
use crate::type_resolver::{TypeResolver, declaring_scope};

/// Install a bound copy of each of `parameters` in `scope`, standing for
/// the argument at the same position.
pub fn install_bound_parameters(
    table: &mut SymbolTable,
    scope: ScopeId,
    parameters: &[SymbolId],
    arguments: &[SymbolId],
) -> Result<()> {
    for (param, arg) in parameters.iter().zip(arguments) {
        let symbol = table.symbol(*param);
        let SymbolKind::TemplateParameter(data) = &symbol.kind else {
            return Err(SemanticError::internal(format!(
                "'{}' is not a template parameter",
                symbol.name
            )));
        };
        let bound = Symbol::new(
            symbol.name.clone(),
            symbol.span,
            SymbolKind::TemplateParameter(TemplateParameterData {
                type_id: data.type_id,
                index: data.index,
                default: None,
                bound: Some(*arg),
            }),
        )
        .with_flags(SymbolFlags::SYNTHESIZED | SymbolFlags::BOUND);
        let id = table.add_symbol(bound);
        table.install(scope, id)?;
    }
    Ok(())
}

/// The full argument list of `template`: `supplied` positions as given,
/// omitted trailing ones from the parameter defaults.
///
/// Defaults are resolved left to right in the template's declaring scope
/// with every earlier parameter bound, so `class Map<K, V = K>` works.
pub fn complete_arguments(
    ctx: &mut BindContext,
    template: SymbolId,
    parameters: &[SymbolId],
    supplied: &[Option<SymbolId>],
    span: Span,
) -> Result<Vec<SymbolId>> {
    if supplied.len() > parameters.len() {
        return Err(SemanticError::TooManyTypeArguments {
            template: ctx.table.full_name(template),
            expected: parameters.len(),
            found: supplied.len(),
            span,
        });
    }

    let enclosing = declaring_scope(&ctx.table, template);
    let mut resolved = Vec::with_capacity(parameters.len());
    for (index, param) in parameters.iter().enumerate() {
        if let Some(Some(arg)) = supplied.get(index) {
            resolved.push(*arg);
            continue;
        }
        let symbol = ctx.table.symbol(*param);
        let default = match &symbol.kind {
            SymbolKind::TemplateParameter(data) => data.default.clone(),
            _ => None,
        };
        let Some(default) = default else {
            return Err(SemanticError::MissingTypeArgument {
                template: ctx.table.full_name(template),
                parameter: symbol.name.clone(),
                span,
            });
        };
        let scope = ctx.table.add_scope(None, Some(enclosing));
        install_bound_parameters(&mut ctx.table, scope, &parameters[..index], &resolved)?;
        resolved.push(TypeResolver::new(ctx).resolve(scope, &default)?);
    }
    Ok(resolved)
}
