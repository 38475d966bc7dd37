//! Type resolution from syntax to type symbols.
//!
//! [`TypeResolver`] turns a [`TypeExpr`] into the [`SymbolId`] of a type
//! symbol: the innermost name is looked up through the lexical scopes and
//! the file's `using` directives, template arguments instantiate the named
//! class template, and each derivation yields a derived type from the
//! repository.
//!
//! ## Example
//!
//! ```ignore
//! let mut resolver = TypeResolver::new(&mut ctx);
//! // `const Stack<int>*`
//! let ty = resolver.resolve(scope, &type_expr)?;
//! ```

use sable_core::{QualifiedName, Result, SemanticError, Span, SymbolFlags};
use sable_registry::symbol::SymbolKind;
use sable_registry::{ScopeId, SymbolId, SymbolTable};
use sable_syntax::{TypeExpr, TypeExprKind};

use crate::context::BindContext;
use crate::template;

/// Resolves syntax type expressions to type symbols.
pub struct TypeResolver<'a> {
    ctx: &'a mut BindContext,
}

impl<'a> TypeResolver<'a> {
    pub fn new(ctx: &'a mut BindContext) -> Self {
        Self { ctx }
    }

    /// Resolve `ty` as written inside `scope`.
    pub fn resolve(&mut self, scope: ScopeId, ty: &TypeExpr) -> Result<SymbolId> {
        let (base, derivations) = ty.peel();
        let TypeExprKind::Named { name, type_args } = &base.kind else {
            return Err(SemanticError::internal("type expression without a name"));
        };
        let root = self.resolve_named(scope, name, type_args, base.span)?;
        self.ctx.table.make_derived_type(root, &derivations, ty.span)
    }

    fn resolve_named(
        &mut self,
        scope: ScopeId,
        name: &QualifiedName,
        type_args: &[TypeExpr],
        span: Span,
    ) -> Result<SymbolId> {
        let found = self.ctx.require_name(scope, name, span)?;
        if type_args.is_empty() {
            return self.as_type(found, span);
        }
        let mut args = Vec::with_capacity(type_args.len());
        for arg in type_args {
            args.push(self.resolve(scope, arg)?);
        }
        template::instantiate_class(self.ctx, found, &args, span)
    }

    /// The type denoted by a symbol found by name.
    ///
    /// Bound template parameters stand for their argument and typedefs for
    /// their target. A class template named without arguments is
    /// instantiated from its defaults.
    pub fn as_type(&mut self, found: SymbolId, span: Span) -> Result<SymbolId> {
        let symbol = self.ctx.table.symbol(found);
        match &symbol.kind {
            SymbolKind::TemplateParameter(p) => Ok(p.bound.unwrap_or(found)),
            SymbolKind::Typedef(_) => resolve_typedef(self.ctx, found),
            SymbolKind::Class(c) | SymbolKind::Interface(c) if c.is_generic() => {
                template::instantiate_class(self.ctx, found, &[], span)
            }
            _ if symbol.is_type() => Ok(found),
            _ => Err(SemanticError::NotAType {
                name: self.ctx.table.full_name(found),
                span,
            }),
        }
    }
}

/// Target of a typedef, resolved on first use.
///
/// A typedef whose target leads back to itself fails with
/// `CyclicDefinition` instead of recursing forever.
pub fn resolve_typedef(ctx: &mut BindContext, typedef: SymbolId) -> Result<SymbolId> {
    let symbol = ctx.table.symbol(typedef);
    let SymbolKind::Typedef(data) = &symbol.kind else {
        return Err(SemanticError::internal(format!("'{}' is not a typedef", symbol.name)));
    };
    if let Some(target) = data.target {
        return Ok(target);
    }
    if symbol.has(SymbolFlags::EVALUATING) {
        return Err(SemanticError::CyclicDefinition {
            name: ctx.table.full_name(typedef),
            span: symbol.span,
        });
    }
    let syntax = data
        .syntax
        .clone()
        .ok_or_else(|| SemanticError::internal(format!("typedef '{}' has no target", symbol.name)))?;
    let scope = declaring_scope(&ctx.table, typedef);

    ctx.table.symbol_mut(typedef).flags |= SymbolFlags::EVALUATING;
    let result = TypeResolver::new(ctx).resolve(scope, &syntax);
    let symbol = ctx.table.symbol_mut(typedef);
    symbol.flags -= SymbolFlags::EVALUATING;
    let target = result?;

    symbol.flags |= SymbolFlags::BOUND;
    if let SymbolKind::Typedef(data) = &mut symbol.kind {
        data.target = Some(target);
    }
    Ok(target)
}

/// Scope in which the declaration of `id` was written.
pub fn declaring_scope(table: &SymbolTable, id: SymbolId) -> ScopeId {
    table
        .symbol(id)
        .parent
        .and_then(|p| table.symbol(p).scope())
        .unwrap_or_else(|| table.global_scope())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sable_core::{Derivation, UnitSettings};
    use sable_registry::BuiltinType;
    use sable_registry::symbol::{Symbol, TypedefData};

    fn typedef(ctx: &mut BindContext, name: &str, target: TypeExpr) -> SymbolId {
        let id = ctx.table.add_symbol(Symbol::new(
            name,
            Span::default(),
            SymbolKind::Typedef(TypedefData {
                target: None,
                syntax: Some(target),
            }),
        ));
        let global = ctx.table.global_scope();
        ctx.table.install(global, id).unwrap();
        id
    }

    #[test]
    fn derivations_apply_innermost_first() {
        let mut ctx = BindContext::new(UnitSettings::default());
        let global = ctx.table.global_scope();
        let ty = TypeExpr::named("int").constant().pointer();
        let resolved = TypeResolver::new(&mut ctx).resolve(global, &ty).unwrap();
        let int = ctx.table.builtin(BuiltinType::Int);
        assert_eq!(
            ctx.table.decompose(resolved),
            (int, &[Derivation::Const, Derivation::Pointer][..])
        );
    }

    #[test]
    fn typedef_resolves_to_target() {
        let mut ctx = BindContext::new(UnitSettings::default());
        let t = typedef(&mut ctx, "Index", TypeExpr::named("uint"));
        let target = resolve_typedef(&mut ctx, t).unwrap();
        assert_eq!(target, ctx.table.builtin(BuiltinType::UInt));
        assert!(ctx.table.symbol(t).has(SymbolFlags::BOUND));
    }

    #[test]
    fn typedef_cycle_is_detected() {
        let mut ctx = BindContext::new(UnitSettings::default());
        let a = typedef(&mut ctx, "A", TypeExpr::named("B"));
        typedef(&mut ctx, "B", TypeExpr::named("A"));
        let err = resolve_typedef(&mut ctx, a).unwrap_err();
        assert!(matches!(err, SemanticError::CyclicDefinition { .. }));
        assert!(!ctx.table.symbol(a).has(SymbolFlags::EVALUATING));
    }

    #[test]
    fn value_is_not_a_type() {
        let mut ctx = BindContext::new(UnitSettings::default());
        let global = ctx.table.global_scope();
        let err = TypeResolver::new(&mut ctx)
            .resolve(global, &TypeExpr::named("missing"))
            .unwrap_err();
        assert!(matches!(err, SemanticError::SymbolNotFound { .. }));
    }
}
