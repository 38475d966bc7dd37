//! Class template instances.

use tracing::debug;

use sable_core::{Result, SemanticError, Span, SymbolFlags};
use sable_registry::symbol::InstanceState;
use sable_registry::{SymbolId, SymbolTable};

use super::substitution::{complete_arguments, install_bound_parameters};
use crate::context::BindContext;
use crate::passes::compilation::ensure_body_bound;
use crate::passes::completion::complete_class;
use crate::passes::registration::declare_class_members;

/// The instance `subject<arguments...>`, created on first request.
///
/// Omitted trailing arguments come from the parameter defaults. The
/// instance is returned in whatever state it is in; nothing is bound
/// until [`require_complete`] is called on it.
pub fn instantiate_class(
    ctx: &mut BindContext,
    subject: SymbolId,
    arguments: &[SymbolId],
    span: Span,
) -> Result<SymbolId> {
    let Some(class) = ctx
        .table
        .symbol(subject)
        .as_class()
        .filter(|c| c.is_generic())
    else {
        return Err(SemanticError::NotATemplate {
            name: ctx.table.full_name(subject),
            span,
        });
    };
    let parameters = class.template_parameters.clone();
    let supplied: Vec<Option<SymbolId>> = arguments.iter().copied().map(Some).collect();
    let arguments = complete_arguments(ctx, subject, &parameters, &supplied, span)?;
    ctx.table.make_template_type(subject, &arguments, span)
}

/// Make `class` usable by value: members declared, bases and layout bound.
///
/// Instances still in the `Created` state are instantiated now; asking for
/// an instance that is being instantiated is a cycle.
pub fn require_complete(ctx: &mut BindContext, class: SymbolId, span: Span) -> Result<()> {
    let symbol = ctx.table.symbol(class);
    let Some(data) = symbol.as_class() else {
        return Ok(());
    };
    let state = data.instance.as_ref().map(|i| i.state);
    let skip = data.is_generic() || symbol.has(SymbolFlags::EXTERNAL);
    match state {
        Some(InstanceState::Bound) => Ok(()),
        Some(InstanceState::Created) => instantiate(ctx, class, span),
        Some(InstanceState::Instantiating) => Err(SemanticError::CyclicTemplateDefinition {
            name: ctx.table.full_name(class),
            span,
        }),
        None if skip => Ok(()),
        None => complete_class(ctx, class),
    }
}

/// Instantiate the class instance at the root of `ty` if it has only been
/// created so far.
pub fn complete_instance_of(ctx: &mut BindContext, ty: SymbolId, span: Span) -> Result<()> {
    let (root, _) = ctx.table.decompose(ty);
    let created = ctx
        .table
        .symbol(root)
        .as_class()
        .and_then(|c| c.instance.as_ref())
        .is_some_and(|i| i.state == InstanceState::Created);
    if created {
        instantiate(ctx, root, span)?;
    }
    Ok(())
}

/// Whether `function` is a member of a class template instance.
pub fn is_instance_member(table: &SymbolTable, function: SymbolId) -> bool {
    table
        .symbol(function)
        .parent
        .and_then(|p| table.symbol(p).as_class())
        .is_some_and(|c| c.instance.is_some())
}

/// Bind every virtual member body reachable through the virtual table of
/// `class` that has been deferred.
pub fn complete_vtable(ctx: &mut BindContext, class: SymbolId, span: Span) -> Result<()> {
    let complete = match ctx.table.symbol(class).as_class() {
        Some(data) => data.vtable_complete,
        None => return Ok(()),
    };
    if complete {
        return Ok(());
    }
    require_complete(ctx, class, span)?;

    let vtable = match ctx.table.symbol_mut(class).as_class_mut() {
        Some(data) => {
            data.vtable_complete = true;
            data.vtable.clone()
        }
        None => return Ok(()),
    };
    let mut bound = 0;
    for function in vtable {
        if is_instance_member(&ctx.table, function)
            && !ctx.table.symbol(function).has(SymbolFlags::BODY_BOUND)
        {
            ensure_body_bound(ctx, function)?;
            bound += 1;
        }
    }
    if bound > 0 {
        debug!(class = %ctx.table.full_name(class), bound, "virtual members instantiated");
    }
    Ok(())
}

fn set_state(table: &mut SymbolTable, instance: SymbolId, state: InstanceState) {
    if let Some(info) = table
        .symbol_mut(instance)
        .as_class_mut()
        .and_then(|c| c.instance.as_mut())
    {
        info.state = state;
    }
}

/// Bind the members of a `Created` instance.
#[cfg_attr(feature = "profiling", profiling::function)]
fn instantiate(ctx: &mut BindContext, instance: SymbolId, span: Span) -> Result<()> {
    let Some((subject, arguments)) = ctx
        .table
        .symbol(instance)
        .as_class()
        .and_then(|c| c.instance.as_ref())
        .filter(|i| i.state == InstanceState::Created)
        .map(|i| (i.subject, i.arguments.clone()))
    else {
        return Ok(());
    };
    let name = ctx.table.full_name(instance);

    ctx.enter_template(&name, span)?;
    set_state(&mut ctx.table, instance, InstanceState::Instantiating);
    let result = bind_instance(ctx, instance, subject, &arguments);
    ctx.leave_template();
    if let Err(e) = result {
        reset_instance(&mut ctx.table, instance);
        return Err(e);
    }
    set_state(&mut ctx.table, instance, InstanceState::Bound);
    debug!(instance = %name, depth = ctx.template_depth(), "class template instantiated");

    if !ctx.settings.defer_virtual_instantiation {
        complete_vtable(ctx, instance, span)?;
    }
    Ok(())
}

/// Return a failed instance to `Created` with an empty scope, so a later
/// request binds it from scratch and reports the same error.
fn reset_instance(table: &mut SymbolTable, instance: SymbolId) {
    let Some(old) = table.symbol(instance).scope() else {
        return;
    };
    let parent = table.scope(old).parent;
    let scope = table.add_scope(Some(instance), parent);
    if let Some(class) = table.symbol_mut(instance).as_class_mut() {
        class.scope = scope;
        class.base_class = None;
        class.interfaces.clear();
        class.member_variables.clear();
        class.vtable.clear();
        class.vtable_complete = false;
    }
    set_state(table, instance, InstanceState::Created);
}

fn bind_instance(
    ctx: &mut BindContext,
    instance: SymbolId,
    subject: SymbolId,
    arguments: &[SymbolId],
) -> Result<()> {
    let subject_symbol = ctx.table.symbol(subject);
    let data = subject_symbol
        .as_class()
        .ok_or_else(|| SemanticError::internal(format!("'{}' is not a class", subject_symbol.name)))?;
    let mut declaration = data.declaration.clone().ok_or_else(|| {
        SemanticError::internal(format!("template '{}' has no declaration", subject_symbol.name))
    })?;
    declaration.type_params.clear();
    let parameters = data.template_parameters.clone();
    let exported = subject_symbol.flags & SymbolFlags::EXPORTED;

    let scope = ctx
        .table
        .symbol(instance)
        .scope()
        .ok_or_else(|| SemanticError::internal("template instance without a scope"))?;
    install_bound_parameters(&mut ctx.table, scope, &parameters, arguments)?;

    let symbol = ctx.table.symbol_mut(instance);
    symbol.flags |= exported;
    if let Some(class) = symbol.as_class_mut() {
        class.declaration = Some(declaration.clone());
    }
    declare_class_members(ctx, instance, &declaration)?;
    complete_class(ctx, instance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::{CompletionPass, RegistrationPass};
    use sable_core::{QualifiedName, UnitSettings};
    use sable_registry::BuiltinType;
    use sable_syntax::{ClassDecl, Item, SourceFile, TypeExpr, TypeParam, VariableDecl};

    fn declare(items: Vec<Item>) -> BindContext {
        let mut ctx = BindContext::new(UnitSettings::default());
        let files = [SourceFile::new(0, items)];
        let output = RegistrationPass::new(&mut ctx).run(&files);
        assert!(output.errors.is_empty(), "{:?}", output.errors);
        CompletionPass::new(&mut ctx).run(&files, &output.declared).unwrap();
        ctx
    }

    fn state(ctx: &BindContext, instance: SymbolId) -> Option<InstanceState> {
        ctx.table.symbol(instance).as_class()?.instance.as_ref().map(|i| i.state)
    }

    #[test]
    fn failed_instance_reports_the_same_error_again() {
        let holder = ClassDecl::new("Holder")
            .type_param(TypeParam::new("T"))
            .member(Item::Variable(VariableDecl::new("first", TypeExpr::named("T"))))
            .member(Item::Variable(VariableDecl::new("broken", TypeExpr::named("Missing"))));
        let mut ctx = declare(vec![Item::Class(holder)]);
        let subject = ctx.table.lookup_qualified(&QualifiedName::parse("Holder")).unwrap();
        let int = ctx.table.builtin(BuiltinType::Int);
        let instance = instantiate_class(&mut ctx, subject, &[int], Span::default()).unwrap();

        for _ in 0..2 {
            let err = require_complete(&mut ctx, instance, Span::default()).unwrap_err();
            assert!(
                matches!(&err, SemanticError::SymbolNotFound { name, .. } if name == "Missing"),
                "{err:?}"
            );
            assert_eq!(state(&ctx, instance), Some(InstanceState::Created));
            assert_eq!(ctx.template_depth(), 0);
        }
    }

    #[test]
    fn instance_binds_once() {
        let holder = ClassDecl::new("Holder")
            .type_param(TypeParam::new("T"))
            .member(Item::Variable(VariableDecl::new("value", TypeExpr::named("T"))));
        let mut ctx = declare(vec![Item::Class(holder)]);
        let subject = ctx.table.lookup_qualified(&QualifiedName::parse("Holder")).unwrap();
        let double = ctx.table.builtin(BuiltinType::Double);
        let instance = instantiate_class(&mut ctx, subject, &[double], Span::default()).unwrap();
        assert_eq!(state(&ctx, instance), Some(InstanceState::Created));

        require_complete(&mut ctx, instance, Span::default()).unwrap();
        require_complete(&mut ctx, instance, Span::default()).unwrap();
        assert_eq!(state(&ctx, instance), Some(InstanceState::Bound));
        let members = ctx.table.symbol(instance).as_class().unwrap().member_variables.clone();
        assert_eq!(members.len(), 1);
        assert_eq!(ctx.table.symbol(members[0]).value_type(), Some(double));
    }
}
