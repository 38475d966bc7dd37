//! Compilation pass: bind function bodies.
//!
//! Produces a [`BoundFunction`] for every function with a body. Names are
//! resolved through block scopes, the function scope, the enclosing class
//! and namespaces, and finally the file's `using` directives. Calls go
//! through overload resolution and get their argument conversions spliced
//! in as explicit nodes.
//!
//! Bodies of template replicas and of class template instance members are
//! bound on demand: when first called, or, for virtual members, when the
//! instance is constructed and needs a complete virtual table.

use tracing::{debug, trace};

use sable_core::{Derivation, QualifiedName, Result, ScopeLookup, SemanticError, Span, SymbolFlags};
use sable_core::derivation::outermost;
use sable_registry::symbol::{Symbol, SymbolKind, VariableData};
use sable_registry::{BuiltinType, ScopeId, SymbolId};
use sable_syntax::{Block, CONSTRUCTOR_GROUP, Expr, ExprKind, FunctionKind, Stmt, TypeExpr};

use crate::bound::{BoundExpr, BoundExprKind, BoundFunction, BoundStmt, ValueCategory};
use crate::context::BindContext;
use crate::conversion::{Argument, Conversion, ConversionMode, find_conversion};
use crate::overload::{CallSite, OverloadMatch, ResolveFlags, member_candidates, receiver_parameter, resolve_overload};
use crate::passes::completion::{bind_signature, evaluate_constant, literal_type};
use crate::template::{self, complete_vtable, is_instance_member, require_complete};
use crate::type_resolver::TypeResolver;

/// Output of the compilation pass.
#[derive(Debug, Default)]
pub struct CompilationOutput {
    /// Bodies bound by this pass, on-demand instantiations included.
    pub functions_compiled: usize,
}

/// Pass 3: bind the bodies of the unit's own functions.
pub struct CompilationPass<'a> {
    ctx: &'a mut BindContext,
}

impl<'a> CompilationPass<'a> {
    pub fn new(ctx: &'a mut BindContext) -> Self {
        Self { ctx }
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(self, declared: &[SymbolId]) -> Result<CompilationOutput> {
        let before = self.ctx.body_count();
        for &id in declared {
            let symbol = self.ctx.table.symbol(id);
            let Some(data) = symbol.as_function() else {
                continue;
            };
            if data.is_generic() || symbol.has(SymbolFlags::REPLICA) || is_instance_member(&self.ctx.table, id) {
                continue;
            }
            ensure_body_bound(self.ctx, id)?;
        }
        let output = CompilationOutput {
            functions_compiled: self.ctx.body_count() - before,
        };
        debug!(
            unit = %self.ctx.settings.unit_name,
            functions = output.functions_compiled,
            "compilation finished"
        );
        Ok(output)
    }
}

/// Bind the body of `function` unless it is bound already, generic,
/// imported, or has no body.
pub(crate) fn ensure_body_bound(ctx: &mut BindContext, function: SymbolId) -> Result<()> {
    let symbol = ctx.table.symbol(function);
    if symbol.has(SymbolFlags::BODY_BOUND) || symbol.has(SymbolFlags::EXTERNAL) {
        return Ok(());
    }
    let Some(data) = symbol.as_function() else {
        return Ok(());
    };
    if data.is_generic() {
        return Ok(());
    }
    let Some(body) = data.declaration.as_ref().and_then(|d| d.body.clone()) else {
        return Ok(());
    };

    bind_signature(ctx, function)?;
    // Set first: recursive calls see the function as bound.
    ctx.table.symbol_mut(function).flags |= SymbolFlags::BODY_BOUND;
    let mut binder = BodyBinder::new(ctx, function)?;
    let stmts = binder.bind_block(&body)?;
    trace!(function = %ctx.table.full_name(function), "body bound");
    ctx.store_body(BoundFunction { function, body: stmts });
    Ok(())
}

/// Binds the statements of one function body.
struct BodyBinder<'a> {
    ctx: &'a mut BindContext,
    function: SymbolId,
    scope: ScopeId,
    return_type: SymbolId,
    /// `C` or `const C` for member functions with a receiver.
    receiver: Option<SymbolId>,
    next_local: usize,
}

impl<'a> BodyBinder<'a> {
    fn new(ctx: &'a mut BindContext, function: SymbolId) -> Result<Self> {
        let symbol = ctx.table.symbol(function);
        let data = symbol
            .as_function()
            .ok_or_else(|| SemanticError::internal(format!("'{}' is not a function", symbol.name)))?;
        let scope = data.scope;
        let return_type = data.return_type;
        let parameters = data.parameters.len();

        let receiver = match receiver_parameter(&mut ctx.table, function)? {
            Some(reference) => Some(ctx.table.remove_reference(reference)?),
            None => None,
        };
        Ok(Self {
            ctx,
            function,
            scope,
            return_type,
            receiver,
            next_local: parameters,
        })
    }

    // ==========================================================================
    // Statements
    // ==========================================================================

    fn bind_block(&mut self, block: &Block) -> Result<Vec<BoundStmt>> {
        let outer = self.scope;
        self.scope = self.ctx.table.add_scope(None, Some(outer));
        let result = block.stmts.iter().map(|s| self.bind_stmt(s)).collect();
        self.scope = outer;
        result
    }

    fn bind_stmt(&mut self, stmt: &Stmt) -> Result<BoundStmt> {
        match stmt {
            Stmt::Local { name, ty, init, span } => self.bind_local(name, ty, init.as_ref(), *span),
            Stmt::Expr(expr) => Ok(BoundStmt::Expr(self.bind_expr(expr)?)),
            Stmt::Return { value, span } => self.bind_return(value.as_ref(), *span),
            Stmt::Block(block) => Ok(BoundStmt::Block(self.bind_block(block)?)),
        }
    }

    fn bind_local(&mut self, name: &str, ty: &TypeExpr, init: Option<&Expr>, span: Span) -> Result<BoundStmt> {
        let declared = TypeResolver::new(self.ctx).resolve(self.scope, ty)?;
        let (root, derivations) = self.ctx.table.decompose(declared);
        let by_value = derivations.is_empty();
        if by_value {
            require_complete(self.ctx, root, span)?;
        }

        let init = match init {
            Some(expr) => {
                let bound = self.bind_expr(expr)?;
                Some(self.convert(bound, declared, ConversionMode::Implicit)?)
            }
            None => {
                // Default construction of a class object.
                if by_value && self.ctx.table.symbol(root).as_class().is_some() {
                    complete_vtable(self.ctx, root, span)?;
                }
                None
            }
        };

        let symbol = Symbol::new(
            name,
            span,
            SymbolKind::Local(VariableData {
                ty: declared,
                index: self.next_local,
                syntax: None,
            }),
        )
        .with_flags(SymbolFlags::BOUND);
        self.next_local += 1;
        let local = self.ctx.table.add_symbol(symbol);
        self.ctx.table.install(self.scope, local)?;
        Ok(BoundStmt::Local { symbol: local, init })
    }

    fn bind_return(&mut self, value: Option<&Expr>, span: Span) -> Result<BoundStmt> {
        let void = self.ctx.table.builtin(BuiltinType::Void);
        let returns_void = self.return_type == void || self.is_constructor();
        match (value, returns_void) {
            (None, true) => Ok(BoundStmt::Return(None)),
            (Some(expr), false) => {
                let bound = self.bind_expr(expr)?;
                let converted = self.convert(bound, self.return_type, ConversionMode::Implicit)?;
                Ok(BoundStmt::Return(Some(converted)))
            }
            (None, false) => Err(SemanticError::NoConversion {
                from: String::from("void"),
                to: self.ctx.table.type_name(self.return_type),
                span,
            }),
            (Some(expr), true) => {
                let bound = self.bind_expr(expr)?;
                Err(SemanticError::NoConversion {
                    from: self.ctx.table.type_name(bound.ty),
                    to: String::from("void"),
                    span: expr.span,
                })
            }
        }
    }

    fn is_constructor(&self) -> bool {
        self.ctx
            .table
            .symbol(self.function)
            .as_function()
            .is_some_and(|f| f.kind == FunctionKind::Constructor)
    }

    // ==========================================================================
    // Expressions
    // ==========================================================================

    fn bind_expr(&mut self, expr: &Expr) -> Result<BoundExpr> {
        let span = expr.span;
        match &expr.kind {
            ExprKind::Literal(literal) => Ok(BoundExpr::new(
                BoundExprKind::Literal(literal.clone()),
                literal_type(&self.ctx.table, literal),
                ValueCategory::Value,
                span,
            )),
            ExprKind::Ident(name) => self.bind_ident(name, span),
            ExprKind::Call { callee, type_args, args } => self.bind_call(callee, type_args, args, span),
            ExprKind::MemberCall { receiver, method, args } => self.bind_member_call(receiver, method, args, span),
            ExprKind::Member { receiver, field } => self.bind_member(receiver, field, span),
            ExprKind::AddressOf(operand) => {
                let operand = self.bind_expr(operand)?;
                self.address_of(operand, span)
            }
            ExprKind::Construct { ty, args } => {
                let ty = TypeResolver::new(self.ctx).resolve(self.scope, ty)?;
                self.construct(ty, args, span)
            }
            ExprKind::Cast { ty, operand } => {
                let target = TypeResolver::new(self.ctx).resolve(self.scope, ty)?;
                let operand = self.bind_expr(operand)?;
                self.convert(operand, target, ConversionMode::Explicit)
            }
        }
    }

    fn bind_ident(&mut self, name: &QualifiedName, span: Span) -> Result<BoundExpr> {
        if !name.is_qualified() && name.last() == "this" {
            if let Some(receiver) = self.receiver {
                let this = self.this_expr(receiver, span);
                return self.address_of(this, span);
            }
        }
        let found = self.ctx.require_name(self.scope, name, span)?;
        let symbol = self.ctx.table.symbol(found);
        match &symbol.kind {
            SymbolKind::Parameter(v) | SymbolKind::Local(v) | SymbolKind::GlobalVariable(v) => {
                let ty = self.ctx.table.remove_reference(v.ty)?;
                Ok(BoundExpr::new(BoundExprKind::Variable(found), ty, ValueCategory::LValue, span))
            }
            SymbolKind::Constant(_) => {
                evaluate_constant(self.ctx, found)?;
                let ty = self.ctx.table.symbol(found).value_type().unwrap_or(SymbolId::UNRESOLVED);
                Ok(BoundExpr::new(BoundExprKind::Variable(found), ty, ValueCategory::Value, span))
            }
            SymbolKind::EnumConstant(c) => Ok(BoundExpr::new(
                BoundExprKind::EnumConstant(found),
                c.enum_type,
                ValueCategory::Value,
                span,
            )),
            SymbolKind::MemberVariable(v) => {
                let field_type = v.ty;
                let Some(receiver) = self.receiver else {
                    return Err(SemanticError::NotAValue {
                        name: self.ctx.table.full_name(found),
                        span,
                    });
                };
                let this = self.this_expr(receiver, span);
                self.member_access(this, found, field_type, span)
            }
            _ => Err(SemanticError::NotAValue {
                name: self.ctx.table.full_name(found),
                span,
            }),
        }
    }

    fn this_expr(&self, receiver: SymbolId, span: Span) -> BoundExpr {
        BoundExpr::new(BoundExprKind::This, receiver, ValueCategory::LValue, span)
    }

    fn bind_call(&mut self, callee: &QualifiedName, type_args: &[TypeExpr], args: &[Expr], span: Span) -> Result<BoundExpr> {
        let mut explicit = Vec::with_capacity(type_args.len());
        for arg in type_args {
            explicit.push(TypeResolver::new(self.ctx).resolve(self.scope, arg)?);
        }
        let found = self.ctx.require_name(self.scope, callee, span)?;

        let symbol = self.ctx.table.symbol(found);
        if symbol.is_type() || matches!(symbol.kind, SymbolKind::Typedef(_)) {
            let ty = if explicit.is_empty() {
                TypeResolver::new(self.ctx).as_type(found, span)?
            } else {
                template::instantiate_class(self.ctx, found, &explicit, span)?
            };
            return self.construct(ty, args, span);
        }
        let Some(group) = symbol.as_group() else {
            return Err(SemanticError::NotAValue {
                name: self.ctx.table.full_name(found),
                span,
            });
        };

        // Members found by name get `*this` as the receiver when the
        // current function has one of a related class.
        let owner = symbol.parent.filter(|p| self.ctx.table.symbol(*p).as_class().is_some());
        let (candidates, receiver) = match owner {
            Some(class) => {
                let candidates = member_candidates(&self.ctx.table, class, callee.last());
                let receiver = self.receiver.filter(|r| {
                    let (root, _) = self.ctx.table.decompose(*r);
                    self.ctx.table.inheritance_distance(root, class).is_some()
                });
                (candidates, receiver.map(|r| self.this_expr(r, span)))
            }
            None => (group.functions.clone(), None),
        };

        let bound_args = self.bind_args(args)?;
        let name = callee.to_string();
        self.call(&name, &candidates, receiver, bound_args, &explicit, span)
    }

    fn bind_member_call(&mut self, receiver: &Expr, method: &str, args: &[Expr], span: Span) -> Result<BoundExpr> {
        let receiver = self.bind_expr(receiver)?;
        let object = self.dereference(receiver)?;
        let class = self.object_class(&object, span)?;
        let candidates = member_candidates(&self.ctx.table, class, method);
        if candidates.is_empty() {
            return Err(SemanticError::SymbolNotFound {
                name: format!("{}.{}", self.ctx.table.full_name(class), method),
                span,
            });
        }
        let bound_args = self.bind_args(args)?;
        let name = format!("{}.{}", self.ctx.table.full_name(class), method);
        self.call(&name, &candidates, Some(object), bound_args, &[], span)
    }

    fn bind_member(&mut self, receiver: &Expr, field: &str, span: Span) -> Result<BoundExpr> {
        let receiver = self.bind_expr(receiver)?;
        let object = self.dereference(receiver)?;
        let class = self.object_class(&object, span)?;
        let scope = self
            .ctx
            .table
            .symbol(class)
            .scope()
            .ok_or_else(|| SemanticError::internal("class without a scope"))?;
        let Some(found) = self.ctx.table.lookup(scope, field, ScopeLookup::THIS_AND_BASE) else {
            return Err(SemanticError::SymbolNotFound {
                name: format!("{}.{}", self.ctx.table.full_name(class), field),
                span,
            });
        };
        match &self.ctx.table.symbol(found).kind {
            SymbolKind::MemberVariable(v) => {
                let field_type = v.ty;
                self.member_access(object, found, field_type, span)
            }
            _ => Err(SemanticError::NotAValue {
                name: self.ctx.table.full_name(found),
                span,
            }),
        }
    }

    fn member_access(&mut self, object: BoundExpr, field: SymbolId, field_type: SymbolId, span: Span) -> Result<BoundExpr> {
        let ty = self.ctx.table.remove_reference(field_type)?;
        let category = object.category;
        Ok(BoundExpr::new(
            BoundExprKind::Member {
                receiver: Box::new(object),
                field,
            },
            ty,
            category,
            span,
        ))
    }

    fn address_of(&mut self, operand: BoundExpr, span: Span) -> Result<BoundExpr> {
        if !operand.category.is_lvalue() {
            return Err(SemanticError::NotAValue {
                name: String::from("temporary"),
                span,
            });
        }
        let ty = self.ctx.table.make_derived_type(operand.ty, &[Derivation::Pointer], span)?;
        Ok(BoundExpr::new(
            BoundExprKind::AddressOf(Box::new(operand)),
            ty,
            ValueCategory::Address,
            span,
        ))
    }

    /// The object a receiver designates: pointers are followed once.
    fn dereference(&mut self, receiver: BoundExpr) -> Result<BoundExpr> {
        let (root, derivations) = self.ctx.table.decompose(receiver.ty);
        if outermost(derivations) != Some(Derivation::Pointer) {
            return Ok(receiver);
        }
        let pointee = derivations[..derivations.len() - 1].to_vec();
        let ty = self.ctx.table.derived_from_root(root, pointee, receiver.span)?;
        Ok(BoundExpr {
            ty,
            category: ValueCategory::LValue,
            ..receiver
        })
    }

    /// The complete class of an object expression.
    fn object_class(&mut self, object: &BoundExpr, span: Span) -> Result<SymbolId> {
        let (root, _) = self.ctx.table.decompose(object.ty);
        if self.ctx.table.symbol(root).as_class().is_none() {
            return Err(SemanticError::NotAScope {
                name: self.ctx.table.type_name(object.ty),
                span,
            });
        }
        require_complete(self.ctx, root, span)?;
        Ok(root)
    }

    fn bind_args(&mut self, args: &[Expr]) -> Result<Vec<BoundExpr>> {
        args.iter().map(|a| self.bind_expr(a)).collect()
    }

    // ==========================================================================
    // Calls and construction
    // ==========================================================================

    fn call(
        &mut self,
        name: &str,
        candidates: &[SymbolId],
        receiver: Option<BoundExpr>,
        args: Vec<BoundExpr>,
        type_args: &[SymbolId],
        span: Span,
    ) -> Result<BoundExpr> {
        let arguments: Vec<Argument> = args.iter().map(argument_of).collect();
        let mut site = CallSite::new(name, candidates, &arguments, span).with_type_args(type_args);
        if let Some(r) = &receiver {
            site = site.with_receiver(argument_of(r));
        }
        let Some(selected) = resolve_overload(self.ctx, &site)? else {
            return Err(SemanticError::internal("overload resolution returned nothing"));
        };
        let function = selected.function;

        let receiver_type = receiver_parameter(&mut self.ctx.table, function)?;
        if receiver_type.is_some() && receiver.is_none() {
            return Err(SemanticError::NotAValue {
                name: self.ctx.table.full_name(function),
                span,
            });
        }
        let receiver = match (receiver, receiver_type) {
            (Some(r), Some(target)) => Some(Box::new(self.splice(r, selected.receiver_conversion, target)?)),
            _ => None,
        };
        let args = self.splice_args(function, args, &selected)?;
        self.instantiate_callee(function, span)?;

        let symbol = self.ctx.table.symbol(function);
        let virtual_dispatch = receiver.is_some() && symbol.has(SymbolFlags::VIRTUAL);
        let return_type = symbol.as_function().map_or(SymbolId::UNRESOLVED, |f| f.return_type);
        let (_, derivations) = self.ctx.table.decompose(return_type);
        let category = match outermost(derivations) {
            Some(Derivation::LvalueRef) => ValueCategory::LValue,
            Some(Derivation::RvalueRef) => ValueCategory::RValue,
            _ => ValueCategory::Value,
        };
        let ty = self.ctx.table.remove_reference(return_type)?;
        Ok(BoundExpr::new(
            BoundExprKind::Call {
                function,
                receiver,
                args,
                virtual_dispatch,
            },
            ty,
            category,
            span,
        ))
    }

    /// Bind the body of a replica or non-virtual instance member the first
    /// time it is called.
    fn instantiate_callee(&mut self, function: SymbolId, _span: Span) -> Result<()> {
        let symbol = self.ctx.table.symbol(function);
        let on_demand = symbol.has(SymbolFlags::REPLICA) || is_instance_member(&self.ctx.table, function);
        if on_demand && !symbol.has(SymbolFlags::VIRTUAL) {
            ensure_body_bound(self.ctx, function)?;
        }
        Ok(())
    }

    fn construct(&mut self, ty: SymbolId, args: &[Expr], span: Span) -> Result<BoundExpr> {
        let (root, derivations) = self.ctx.table.decompose(ty);
        let is_class = derivations.is_empty() && self.ctx.table.symbol(root).as_class().is_some();
        let args = self.bind_args(args)?;

        if !is_class {
            return match args.len() {
                0 => Ok(BoundExpr::new(
                    BoundExprKind::Construct {
                        class: ty,
                        constructor: None,
                        args,
                    },
                    ty,
                    ValueCategory::Value,
                    span,
                )),
                1 => {
                    let operand = args.into_iter().next().ok_or_else(|| SemanticError::internal("missing operand"))?;
                    self.convert(operand, ty, ConversionMode::Explicit)
                }
                _ => Err(SemanticError::NoViableOverload {
                    name: self.ctx.table.type_name(ty),
                    arguments: describe(self.ctx, &args),
                    candidate_spans: Vec::new(),
                    span,
                }),
            };
        }

        require_complete(self.ctx, root, span)?;
        let symbol = self.ctx.table.symbol(root);
        if symbol.has(SymbolFlags::ABSTRACT) || matches!(symbol.kind, SymbolKind::Interface(_)) {
            return Err(SemanticError::AbstractInstantiation {
                name: self.ctx.table.full_name(root),
                span,
            });
        }
        let constructors = symbol
            .scope()
            .and_then(|s| self.ctx.table.scope(s).get(CONSTRUCTOR_GROUP))
            .map(|g| self.ctx.table.group_functions(g).to_vec())
            .unwrap_or_default();

        let (constructor, args) = if constructors.is_empty() {
            if !args.is_empty() {
                if let Some(converted) = self.functional_cast(&args, root)? {
                    return Ok(converted);
                }
                return Err(SemanticError::NoViableOverload {
                    name: self.ctx.table.full_name(root),
                    arguments: describe(self.ctx, &args),
                    candidate_spans: Vec::new(),
                    span,
                });
            }
            (None, args)
        } else {
            let arguments: Vec<Argument> = args.iter().map(argument_of).collect();
            let name = self.ctx.table.full_name(root);
            let site = CallSite::new(&name, &constructors, &arguments, span);
            // `T(x)` falls back to the conversion functions of `x` when no
            // constructor takes it.
            let speculative = if args.len() == 1 {
                resolve_overload(self.ctx, &site.clone().with_flags(ResolveFlags::DONT_THROW))?
            } else {
                None
            };
            let selected = match speculative {
                Some(selected) => selected,
                None => {
                    if let Some(converted) = self.functional_cast(&args, root)? {
                        return Ok(converted);
                    }
                    match resolve_overload(self.ctx, &site)? {
                        Some(selected) => selected,
                        None => return Err(SemanticError::internal("overload resolution returned nothing")),
                    }
                }
            };
            let args = self.splice_args(selected.function, args, &selected)?;
            self.instantiate_callee(selected.function, span)?;
            (Some(selected.function), args)
        };

        complete_vtable(self.ctx, root, span)?;
        Ok(BoundExpr::new(
            BoundExprKind::Construct {
                class: root,
                constructor,
                args,
            },
            root,
            ValueCategory::Value,
            span,
        ))
    }

    // ==========================================================================
    // Conversions
    // ==========================================================================

    /// Convert `expr` to `target`, or fail with `NoConversion`.
    fn convert(&mut self, expr: BoundExpr, target: SymbolId, mode: ConversionMode) -> Result<BoundExpr> {
        template::complete_instance_of(self.ctx, expr.ty, expr.span)?;
        template::complete_instance_of(self.ctx, target, expr.span)?;
        let arg = argument_of(&expr);
        match find_conversion(&mut self.ctx.table, &arg, target, mode)? {
            Some(conversion) => self.splice(expr, Some(conversion), target),
            None => Err(SemanticError::NoConversion {
                from: self.ctx.table.type_name(expr.ty),
                to: self.ctx.table.type_name(target),
                span: expr.span,
            }),
        }
    }

    /// `T(x)` through a conversion function declared by the type of `x`.
    fn functional_cast(&mut self, args: &[BoundExpr], class: SymbolId) -> Result<Option<BoundExpr>> {
        let [operand] = args else {
            return Ok(None);
        };
        let (source, _) = self.ctx.table.decompose(operand.ty);
        if source == class || self.ctx.table.symbol(source).as_class().is_none() {
            return Ok(None);
        }
        template::complete_instance_of(self.ctx, operand.ty, operand.span)?;
        let arg = argument_of(operand);
        match find_conversion(&mut self.ctx.table, &arg, class, ConversionMode::Explicit)? {
            Some(conversion) if conversion.function().is_some() => {
                complete_vtable(self.ctx, class, operand.span)?;
                self.splice(operand.clone(), Some(conversion), class).map(Some)
            }
            _ => Ok(None),
        }
    }

    fn splice_args(&mut self, function: SymbolId, args: Vec<BoundExpr>, selected: &OverloadMatch) -> Result<Vec<BoundExpr>> {
        let parameters = self
            .ctx
            .table
            .symbol(function)
            .as_function()
            .map(|f| f.parameters.clone())
            .unwrap_or_default();
        let mut out = Vec::with_capacity(args.len());
        for ((arg, conversion), param) in args.into_iter().zip(&selected.conversions).zip(&parameters) {
            let param_type = self.ctx.table.symbol(*param).value_type().unwrap_or(SymbolId::UNRESOLVED);
            out.push(self.splice(arg, Some(*conversion), param_type)?);
        }
        Ok(out)
    }

    /// Wrap `expr` in a conversion node when `conversion` needs one.
    fn splice(&mut self, expr: BoundExpr, conversion: Option<Conversion>, target: SymbolId) -> Result<BoundExpr> {
        let Some(conversion) = conversion.filter(Conversion::needs_node) else {
            return Ok(expr);
        };
        let ty = self.ctx.table.remove_reference(target)?;
        let span = expr.span;
        Ok(BoundExpr::new(
            BoundExprKind::Convert {
                function: conversion.function(),
                operand: Box::new(expr),
            },
            ty,
            ValueCategory::Value,
            span,
        ))
    }
}

fn argument_of(expr: &BoundExpr) -> Argument {
    Argument::new(expr.ty, expr.category).at(expr.span)
}

fn describe(ctx: &BindContext, args: &[BoundExpr]) -> String {
    args.iter()
        .map(|a| ctx.table.type_name(a.ty))
        .collect::<Vec<_>>()
        .join(", ")
}
