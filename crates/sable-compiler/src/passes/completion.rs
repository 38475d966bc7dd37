//! Completion pass: resolve every declared signature.
//!
//! Runs after all files are registered, so forward references resolve.
//! Each entity is completed at most once; the `bound` flag records it and
//! the `evaluating` flag turns re-entry into a cycle error.
//!
//! Order:
//! 1. `using` directives of each file
//! 2. typedefs, enums and delegates
//! 3. classes: bases, member layout, member signatures, conversions and
//!    the virtual table
//! 4. free function signatures, global variables and constants
//!
//! Entities reached out of order (a class used by value before its turn)
//! are completed on demand.

use tracing::debug;

use sable_core::{Result, SemanticError, Span, SymbolFlags};
use sable_registry::symbol::{ConversionInfo, SymbolKind};
use sable_registry::{BuiltinType, ConversionRank, SymbolId, SymbolTable};
use sable_syntax::{Expr, ExprKind, FunctionKind, Literal, SourceFile, TypeExpr, UsingDirective};

use crate::context::BindContext;
use crate::conversion::{Argument, ConversionMode, find_conversion};
use crate::template::require_complete;
use crate::type_resolver::{TypeResolver, declaring_scope, resolve_typedef};

/// Pass 2: resolve signatures and lay out classes.
pub struct CompletionPass<'a> {
    ctx: &'a mut BindContext,
}

impl<'a> CompletionPass<'a> {
    pub fn new(ctx: &'a mut BindContext) -> Self {
        Self { ctx }
    }

    /// Complete `declared` (from registration) for `files`. Stops at the
    /// first error.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(mut self, files: &[SourceFile], declared: &[SymbolId]) -> Result<()> {
        for file in files {
            self.resolve_usings(file)?;
        }

        for phase in [Phase::Types, Phase::Classes, Phase::Values] {
            for &id in declared {
                if phase.includes(&self.ctx.table.symbol(id).kind) {
                    complete_symbol(self.ctx, id)?;
                }
            }
        }
        debug!(unit = %self.ctx.settings.unit_name, symbols = declared.len(), "completion finished");
        Ok(())
    }

    fn resolve_usings(&mut self, file: &SourceFile) -> Result<()> {
        for using in &file.usings {
            match using {
                UsingDirective::Namespace { path, span } => {
                    let target = self.ctx.table.lookup_qualified(path).ok_or_else(|| {
                        SemanticError::SymbolNotFound {
                            name: path.to_string(),
                            span: *span,
                        }
                    })?;
                    if !matches!(self.ctx.table.symbol(target).kind, SymbolKind::Namespace(_)) {
                        return Err(SemanticError::NotAScope {
                            name: path.to_string(),
                            span: *span,
                        });
                    }
                    self.ctx.file_scope_mut(file.file).add_using(target);
                }
                UsingDirective::Alias { alias, target, span } => {
                    let found = self.ctx.table.lookup_qualified(target).ok_or_else(|| {
                        SemanticError::SymbolNotFound {
                            name: target.to_string(),
                            span: *span,
                        }
                    })?;
                    self.ctx.file_scope_mut(file.file).add_alias(alias.as_str(), found);
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Types,
    Classes,
    Values,
}

impl Phase {
    fn includes(self, kind: &SymbolKind) -> bool {
        match self {
            Phase::Types => matches!(
                kind,
                SymbolKind::Typedef(_) | SymbolKind::Enum(_) | SymbolKind::Delegate(_)
            ),
            Phase::Classes => matches!(kind, SymbolKind::Class(_) | SymbolKind::Interface(_)),
            Phase::Values => matches!(
                kind,
                SymbolKind::Function(_) | SymbolKind::GlobalVariable(_) | SymbolKind::Constant(_)
            ),
        }
    }
}

/// Complete one declared entity of any kind.
fn complete_symbol(ctx: &mut BindContext, id: SymbolId) -> Result<()> {
    match &ctx.table.symbol(id).kind {
        SymbolKind::Typedef(_) => resolve_typedef(ctx, id).map(|_| ()),
        SymbolKind::Enum(_) => complete_enum(ctx, id),
        SymbolKind::Delegate(_) => complete_delegate(ctx, id),
        SymbolKind::Class(_) | SymbolKind::Interface(_) => complete_class(ctx, id),
        SymbolKind::Function(_) => bind_signature(ctx, id),
        SymbolKind::FunctionGroup(group) => {
            for function in group.functions.clone() {
                bind_signature(ctx, function)?;
            }
            Ok(())
        }
        SymbolKind::GlobalVariable(_) | SymbolKind::MemberVariable(_) => complete_variable(ctx, id),
        SymbolKind::Constant(_) => evaluate_constant(ctx, id).map(|_| ()),
        _ => Ok(()),
    }
}

// =============================================================================
// Classes
// =============================================================================

/// Bind the bases, member layout, member signatures, conversions and
/// virtual table of a non-generic class.
pub(crate) fn complete_class(ctx: &mut BindContext, class: SymbolId) -> Result<()> {
    let symbol = ctx.table.symbol(class);
    if symbol.has(SymbolFlags::BOUND) {
        return Ok(());
    }
    if symbol.has(SymbolFlags::EVALUATING) {
        return Err(SemanticError::CyclicDefinition {
            name: ctx.table.full_name(class),
            span: symbol.span,
        });
    }
    let Some(data) = symbol.as_class().filter(|c| !c.is_generic()) else {
        return Ok(());
    };
    let Some(declaration) = data.declaration.clone() else {
        return Ok(());
    };

    ctx.table.symbol_mut(class).flags |= SymbolFlags::EVALUATING;
    let result = bind_class(ctx, class, &declaration.bases);
    ctx.table.symbol_mut(class).flags -= SymbolFlags::EVALUATING;
    result?;
    ctx.table.symbol_mut(class).flags |= SymbolFlags::BOUND;
    Ok(())
}

fn bind_class(ctx: &mut BindContext, class: SymbolId, bases: &[TypeExpr]) -> Result<()> {
    let scope = ctx
        .table
        .symbol(class)
        .scope()
        .ok_or_else(|| SemanticError::internal("class without a scope"))?;

    for base in bases {
        let resolved = TypeResolver::new(ctx).resolve(scope, base)?;
        let base_symbol = ctx.table.symbol(resolved);
        let is_interface = match &base_symbol.kind {
            SymbolKind::Interface(_) => true,
            SymbolKind::Class(_) => false,
            _ => {
                return Err(SemanticError::NotAType {
                    name: ctx.table.full_name(resolved),
                    span: base.span,
                });
            }
        };
        require_complete(ctx, resolved, base.span)?;
        if !ctx.table.add_inheritance(class, resolved) {
            return Err(SemanticError::CyclicDefinition {
                name: ctx.table.full_name(class),
                span: base.span,
            });
        }

        let base_scope = ctx.table.symbol(resolved).scope();
        let Some(data) = ctx.table.symbol_mut(class).as_class_mut() else {
            break;
        };
        if is_interface {
            data.interfaces.push(resolved);
            continue;
        }
        if data.base_class.is_some() {
            return Err(SemanticError::internal(format!(
                "'{}' has more than one base class",
                ctx.table.full_name(class)
            )));
        }
        data.base_class = Some(resolved);
        ctx.table.scope_mut(scope).base = base_scope;
    }

    let members = ctx
        .table
        .symbol(class)
        .as_class()
        .map(|c| c.member_variables.clone())
        .unwrap_or_default();
    for member in members {
        complete_variable(ctx, member)?;
    }

    for child in ctx.table.children(class).to_vec() {
        complete_symbol(ctx, child)?;
    }

    register_conversions(ctx, class)?;
    ctx.table.build_vtable(class)
}

/// Register the conversion functions and converting constructors of
/// `class` in the unit's conversion table.
fn register_conversions(ctx: &mut BindContext, class: SymbolId) -> Result<()> {
    let class_shape = ctx.table.shape_id(class)?;
    for function in ctx.table.member_functions(class) {
        let symbol = ctx.table.symbol(function);
        let Some(data) = symbol.as_function() else {
            continue;
        };
        if symbol.has(SymbolFlags::TEMPLATE) {
            continue;
        }
        let converts = match data.kind {
            FunctionKind::Conversion => true,
            FunctionKind::Constructor => match data.parameters.as_slice() {
                [param] => match ctx.table.symbol(*param).value_type() {
                    Some(ty) => ctx.table.shape_id(ty)? != class_shape,
                    None => false,
                },
                _ => false,
            },
            FunctionKind::Normal => false,
        };
        if !converts {
            continue;
        }
        if let Some(data) = ctx.table.symbol_mut(function).as_function_mut() {
            data.conversion = Some(ConversionInfo {
                rank: ConversionRank::UserDefined,
                distance: 0,
            });
        }
        ctx.table.add_conversion(function)?;
    }
    Ok(())
}

// =============================================================================
// Functions and variables
// =============================================================================

/// Resolve the parameter and return types of `function`.
///
/// Generic functions keep their signature unresolved; each replica
/// resolves its own.
pub(crate) fn bind_signature(ctx: &mut BindContext, function: SymbolId) -> Result<()> {
    let symbol = ctx.table.symbol(function);
    if symbol.has(SymbolFlags::BOUND) {
        return Ok(());
    }
    let Some(data) = symbol.as_function() else {
        return Ok(());
    };
    if data.is_generic() {
        ctx.table.symbol_mut(function).flags |= SymbolFlags::BOUND;
        return Ok(());
    }
    let scope = data.scope;
    let kind = data.kind;
    let parameters = data.parameters.clone();
    let return_syntax = data.declaration.as_ref().map(|d| d.return_type.clone());
    let owner = symbol.parent;

    let return_type = match (kind, return_syntax) {
        (FunctionKind::Constructor, _) => owner.ok_or_else(|| SemanticError::internal("constructor without a class"))?,
        (_, Some(syntax)) => TypeResolver::new(ctx).resolve(scope, &syntax)?,
        (_, None) => return Err(SemanticError::internal("function without a declaration")),
    };
    for param in parameters {
        resolve_value_type(ctx, param, scope)?;
    }

    let symbol = ctx.table.symbol_mut(function);
    symbol.flags |= SymbolFlags::BOUND;
    if let Some(data) = symbol.as_function_mut() {
        data.return_type = return_type;
    }
    check_overload(&ctx.table, function)
}

/// Two functions of one overload group may not share a signature. The
/// later declaration is the one reported.
fn check_overload(table: &SymbolTable, function: SymbolId) -> Result<()> {
    let name = &table.symbol(function).name;
    let scope = declaring_scope(table, function);
    let Some(group) = table.scope(scope).get(name) else {
        return Ok(());
    };
    let Some(other) = table.conflicting_overload(group, function) else {
        return Ok(());
    };
    let functions = table.group_functions(group);
    let position = |id: SymbolId| functions.iter().position(|f| *f == id);
    let (first, second) = if position(other) < position(function) {
        (other, function)
    } else {
        (function, other)
    };
    Err(SemanticError::DuplicateDefinition {
        name: name.clone(),
        span: table.symbol(second).span,
        previous: table.symbol(first).span,
    })
}

fn complete_variable(ctx: &mut BindContext, variable: SymbolId) -> Result<()> {
    if ctx.table.symbol(variable).has(SymbolFlags::BOUND) {
        return Ok(());
    }
    let scope = declaring_scope(&ctx.table, variable);
    let ty = resolve_value_type(ctx, variable, scope)?;
    // By-value members and globals need the complete layout.
    let (root, derivations) = ctx.table.decompose(ty);
    if derivations.is_empty() {
        let span = ctx.table.symbol(variable).span;
        require_complete(ctx, root, span)?;
    }
    ctx.table.symbol_mut(variable).flags |= SymbolFlags::BOUND;
    Ok(())
}

/// Resolve the declared type of a parameter or variable from its syntax.
fn resolve_value_type(ctx: &mut BindContext, variable: SymbolId, scope: sable_registry::ScopeId) -> Result<SymbolId> {
    let symbol = ctx.table.symbol(variable);
    let syntax = match &symbol.kind {
        SymbolKind::Parameter(v)
        | SymbolKind::Local(v)
        | SymbolKind::MemberVariable(v)
        | SymbolKind::GlobalVariable(v) => {
            if !v.ty.is_unresolved() {
                return Ok(v.ty);
            }
            v.syntax.clone()
        }
        _ => None,
    };
    let syntax = syntax.ok_or_else(|| {
        SemanticError::internal(format!("'{}' has no declared type", symbol.name))
    })?;
    let ty = TypeResolver::new(ctx).resolve(scope, &syntax)?;
    match &mut ctx.table.symbol_mut(variable).kind {
        SymbolKind::Parameter(v)
        | SymbolKind::Local(v)
        | SymbolKind::MemberVariable(v)
        | SymbolKind::GlobalVariable(v) => v.ty = ty,
        _ => {}
    }
    Ok(ty)
}

// =============================================================================
// Enums and delegates
// =============================================================================

fn complete_enum(ctx: &mut BindContext, id: SymbolId) -> Result<()> {
    let symbol = ctx.table.symbol(id);
    if symbol.has(SymbolFlags::BOUND) {
        return Ok(());
    }
    let SymbolKind::Enum(data) = &symbol.kind else {
        return Ok(());
    };
    let scope = data.scope;
    let syntax = data.underlying_syntax.clone();
    let span = symbol.span;

    let underlying = match syntax {
        Some(ty) => {
            let enclosing = declaring_scope(&ctx.table, id);
            TypeResolver::new(ctx).resolve(enclosing, &ty)?
        }
        None => ctx.table.builtin(BuiltinType::Int),
    };
    if !ctx.table.as_builtin(underlying).is_some_and(BuiltinType::is_integer) {
        return Err(SemanticError::NoConversion {
            from: ctx.table.type_name(underlying),
            to: String::from("an integer type"),
            span,
        });
    }
    if let SymbolKind::Enum(data) = &mut ctx.table.symbol_mut(id).kind {
        data.underlying = underlying;
    }

    let mut next = 0i64;
    for constant in ctx.table.scope(scope).symbols().to_vec() {
        let (syntax, span) = match &ctx.table.symbol(constant).kind {
            SymbolKind::EnumConstant(c) => (c.syntax.clone(), ctx.table.symbol(constant).span),
            _ => continue,
        };
        let value = match syntax {
            Some(expr) => enum_value(ctx, scope, &expr, span)?,
            None => next,
        };
        next = value.wrapping_add(1);
        let symbol = ctx.table.symbol_mut(constant);
        symbol.flags |= SymbolFlags::BOUND;
        if let SymbolKind::EnumConstant(c) = &mut symbol.kind {
            c.value = Some(value);
        }
    }
    ctx.table.symbol_mut(id).flags |= SymbolFlags::BOUND;
    Ok(())
}

/// Value of an enum constant initializer: an integer or character literal,
/// an earlier constant, or an integer constant.
fn enum_value(ctx: &mut BindContext, scope: sable_registry::ScopeId, expr: &Expr, span: Span) -> Result<i64> {
    let literal = match &expr.kind {
        ExprKind::Literal(literal) => literal.clone(),
        ExprKind::Ident(name) => {
            let found = ctx.require_name(scope, name, expr.span)?;
            match &ctx.table.symbol(found).kind {
                SymbolKind::EnumConstant(c) => match c.value {
                    Some(v) => Literal::Int(v),
                    None => {
                        return Err(SemanticError::CyclicDefinition {
                            name: ctx.table.full_name(found),
                            span: expr.span,
                        });
                    }
                },
                SymbolKind::Constant(_) => evaluate_constant(ctx, found)?,
                _ => {
                    return Err(SemanticError::NotAValue {
                        name: name.to_string(),
                        span: expr.span,
                    });
                }
            }
        }
        _ => return Err(SemanticError::internal("enum value is not a constant expression")),
    };
    match literal {
        Literal::Int(v) => Ok(v),
        Literal::Char(c) => Ok(i64::from(u32::from(c))),
        other => Err(SemanticError::NoConversion {
            from: format!("{other:?}"),
            to: String::from("an integer"),
            span,
        }),
    }
}

fn complete_delegate(ctx: &mut BindContext, id: SymbolId) -> Result<()> {
    let symbol = ctx.table.symbol(id);
    if symbol.has(SymbolFlags::BOUND) {
        return Ok(());
    }
    let SymbolKind::Delegate(data) = &symbol.kind else {
        return Ok(());
    };
    let parameters = data.parameters.clone();
    let Some(declaration) = data.declaration.clone() else {
        return Ok(());
    };
    let scope = declaring_scope(&ctx.table, id);
    let return_type = TypeResolver::new(ctx).resolve(scope, &declaration.return_type)?;
    for param in parameters {
        resolve_value_type(ctx, param, scope)?;
    }
    let symbol = ctx.table.symbol_mut(id);
    symbol.flags |= SymbolFlags::BOUND;
    if let SymbolKind::Delegate(data) = &mut symbol.kind {
        data.return_type = return_type;
    }
    Ok(())
}

// =============================================================================
// Constants
// =============================================================================

/// Value of a named constant, evaluated on first use.
///
/// The initializer must be a literal or name another constant, and must
/// convert implicitly to the declared type.
pub(crate) fn evaluate_constant(ctx: &mut BindContext, id: SymbolId) -> Result<Literal> {
    let symbol = ctx.table.symbol(id);
    let SymbolKind::Constant(data) = &symbol.kind else {
        return Err(SemanticError::internal(format!("'{}' is not a constant", symbol.name)));
    };
    if let Some(value) = &data.value {
        return Ok(value.clone());
    }
    if symbol.has(SymbolFlags::EVALUATING) {
        return Err(SemanticError::CyclicDefinition {
            name: ctx.table.full_name(id),
            span: symbol.span,
        });
    }
    let (ty_syntax, value_syntax) = data
        .syntax
        .clone()
        .ok_or_else(|| SemanticError::internal(format!("constant '{}' has no initializer", symbol.name)))?;
    let scope = declaring_scope(&ctx.table, id);

    ctx.table.symbol_mut(id).flags |= SymbolFlags::EVALUATING;
    let result = evaluate_initializer(ctx, scope, &ty_syntax, &value_syntax);
    ctx.table.symbol_mut(id).flags -= SymbolFlags::EVALUATING;
    let (ty, value) = result?;

    let symbol = ctx.table.symbol_mut(id);
    symbol.flags |= SymbolFlags::BOUND;
    if let SymbolKind::Constant(data) = &mut symbol.kind {
        data.ty = ty;
        data.value = Some(value.clone());
    }
    Ok(value)
}

fn evaluate_initializer(
    ctx: &mut BindContext,
    scope: sable_registry::ScopeId,
    ty: &TypeExpr,
    value: &Expr,
) -> Result<(SymbolId, Literal)> {
    let ty = TypeResolver::new(ctx).resolve(scope, ty)?;
    let (literal, value_type) = match &value.kind {
        ExprKind::Literal(literal) => (literal.clone(), literal_type(&ctx.table, literal)),
        ExprKind::Ident(name) => {
            let found = ctx.require_name(scope, name, value.span)?;
            match &ctx.table.symbol(found).kind {
                SymbolKind::Constant(_) => {
                    let literal = evaluate_constant(ctx, found)?;
                    let source = ctx.table.symbol(found).value_type().unwrap_or(SymbolId::UNRESOLVED);
                    (literal, source)
                }
                SymbolKind::EnumConstant(c) => {
                    let enum_type = c.enum_type;
                    complete_enum(ctx, enum_type)?;
                    let value = match &ctx.table.symbol(found).kind {
                        SymbolKind::EnumConstant(c) => c.value.unwrap_or_default(),
                        _ => 0,
                    };
                    (Literal::Int(value), enum_type)
                }
                _ => {
                    return Err(SemanticError::NotAValue {
                        name: name.to_string(),
                        span: value.span,
                    });
                }
            }
        }
        _ => return Err(SemanticError::internal("constant initializer is not a constant expression")),
    };

    let arg = Argument::value(value_type).at(value.span);
    if find_conversion(&mut ctx.table, &arg, ty, ConversionMode::Implicit)?.is_none() {
        return Err(SemanticError::NoConversion {
            from: ctx.table.type_name(value_type),
            to: ctx.table.type_name(ty),
            span: value.span,
        });
    }
    Ok((ty, literal))
}

/// Type of a literal: `int` unless the value needs `long`.
pub(crate) fn literal_type(table: &SymbolTable, literal: &Literal) -> SymbolId {
    let builtin = match literal {
        Literal::Bool(_) => BuiltinType::Bool,
        Literal::Int(v) if i32::try_from(*v).is_ok() => BuiltinType::Int,
        Literal::Int(_) => BuiltinType::Long,
        Literal::Float(_) => BuiltinType::Double,
        Literal::Char(_) => BuiltinType::Char,
        Literal::Null => BuiltinType::NullPtr,
    };
    table.builtin(builtin)
}
