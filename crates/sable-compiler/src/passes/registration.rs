//! Registration pass: declare every entity of the unit.
//!
//! Walks the syntax tree and installs a symbol for each declaration into
//! the scope that contains it. Nothing is resolved here: type references
//! stay as syntax on the symbol until the completion pass, so declarations
//! may refer to each other in any order and across files.
//!
//! ## Responsibilities
//!
//! - Namespaces (merged when reopened), classes, interfaces, enums,
//!   delegates, typedefs, constants, global and member variables
//! - Functions installed into overload groups; constructors and
//!   conversion functions under their reserved group names
//! - Template parameters of generic classes and functions; the members of
//!   a generic class are only declared per instance
//! - The `exported` flag: public (or internal, when configured) entities
//!   whose container is a namespace or is itself exported

use tracing::debug;

use sable_core::{Access, Result, SemanticError, SymbolFlags, TypeId};
use sable_registry::symbol::{
    ClassData, ConstantData, DelegateData, EnumConstantData, EnumData, FunctionData, Symbol,
    SymbolKind, TemplateParameterData, TypedefData, VariableData,
};
use sable_registry::{ScopeId, SymbolId, SymbolTable};
use sable_syntax::{
    ClassDecl, ClassKind, ConstantDecl, DelegateDecl, EnumDecl, FunctionDecl, Item, NamespaceDecl,
    Param, SourceFile, Specifiers, TypeParam, TypedefDecl, VariableDecl,
};

use crate::context::BindContext;

/// Output of the registration pass.
#[derive(Debug, Default)]
pub struct RegistrationOutput {
    pub types_registered: usize,
    pub functions_registered: usize,
    pub globals_registered: usize,
    /// Every declared symbol, in declaration order.
    pub declared: Vec<SymbolId>,
    /// Errors of individual declarations; the remaining ones are still
    /// declared.
    pub errors: Vec<SemanticError>,
}

/// Pass 1: declare all symbols of the unit.
pub struct RegistrationPass<'a> {
    ctx: &'a mut BindContext,
    types_registered: usize,
    functions_registered: usize,
    globals_registered: usize,
    declared: Vec<SymbolId>,
}

impl<'a> RegistrationPass<'a> {
    pub fn new(ctx: &'a mut BindContext) -> Self {
        Self {
            ctx,
            types_registered: 0,
            functions_registered: 0,
            globals_registered: 0,
            declared: Vec::new(),
        }
    }

    /// Run the pass over every file of the unit.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(mut self, files: &[SourceFile]) -> RegistrationOutput {
        let mut errors = Vec::new();
        let global = self.ctx.table.global_scope();
        for file in files {
            if file.file < self.ctx.settings.file_index_base {
                errors.push(SemanticError::internal(format!(
                    "file index {} is below the unit's base {}",
                    file.file, self.ctx.settings.file_index_base
                )));
                continue;
            }
            for item in &file.items {
                if let Err(e) = self.visit_item(global, item) {
                    errors.push(e);
                }
            }
        }
        debug!(
            unit = %self.ctx.settings.unit_name,
            types = self.types_registered,
            functions = self.functions_registered,
            globals = self.globals_registered,
            errors = errors.len(),
            "registration finished"
        );
        RegistrationOutput {
            types_registered: self.types_registered,
            functions_registered: self.functions_registered,
            globals_registered: self.globals_registered,
            declared: self.declared,
            errors,
        }
    }

    fn visit_item(&mut self, scope: ScopeId, item: &Item) -> Result<()> {
        let id = match item {
            Item::Namespace(ns) => return self.visit_namespace(scope, ns),
            Item::Class(class) => self.visit_class(scope, class)?,
            Item::Function(function) => self.visit_function(scope, function)?,
            Item::Variable(var) => self.visit_variable(scope, var)?,
            Item::Typedef(typedef) => self.visit_typedef(scope, typedef)?,
            Item::Constant(constant) => self.visit_constant(scope, constant)?,
            Item::Enum(e) => self.visit_enum(scope, e)?,
            Item::Delegate(delegate) => self.visit_delegate(scope, delegate)?,
        };
        self.declared.push(id);
        Ok(())
    }

    // ==========================================================================
    // Namespace
    // ==========================================================================

    fn visit_namespace(&mut self, scope: ScopeId, ns: &NamespaceDecl) -> Result<()> {
        let in_namespace = self
            .ctx
            .table
            .scope_owner(scope)
            .is_some_and(|o| matches!(self.ctx.table.symbol(o).kind, SymbolKind::Namespace(_)));
        if !in_namespace {
            return Err(SemanticError::internal(format!(
                "namespace '{}' declared outside a namespace",
                ns.name
            )));
        }
        let namespace = self.ctx.table.get_or_create_namespace(scope, &ns.name, ns.span)?;
        let inner = self
            .ctx
            .table
            .symbol(namespace)
            .scope()
            .ok_or_else(|| SemanticError::internal("namespace without a scope"))?;
        // One bad declaration does not hide the rest of the namespace.
        let mut first_error = None;
        for item in &ns.items {
            if let Err(e) = self.visit_item(inner, item) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    // ==========================================================================
    // Class
    // ==========================================================================

    fn visit_class(&mut self, scope: ScopeId, decl: &ClassDecl) -> Result<SymbolId> {
        let class_scope = self.ctx.table.add_scope(None, Some(scope));
        let mut data = ClassData::new(TypeId::random(), class_scope);
        data.declaration = Some(Box::new(decl.clone()));
        let kind = match decl.kind {
            ClassKind::Class => SymbolKind::Class(data),
            ClassKind::Interface => SymbolKind::Interface(data),
        };

        let mut flags = self.export_flag(scope, decl.access);
        if decl.is_template() {
            flags |= SymbolFlags::TEMPLATE;
        }
        let id = self.ctx.table.add_symbol(
            Symbol::new(decl.name.as_str(), decl.span, kind)
                .with_access(decl.access)
                .with_flags(flags),
        );
        self.ctx.table.scope_mut(class_scope).owner = Some(id);
        self.ctx.table.install(scope, id)?;
        self.ctx.table.add_type(id)?;
        self.ctx.table.add_hierarchy_node(id);
        self.types_registered += 1;

        if decl.is_template() {
            let parameters = declare_template_parameters(&mut self.ctx.table, class_scope, &decl.type_params)?;
            if let Some(class) = self.ctx.table.symbol_mut(id).as_class_mut() {
                class.template_parameters = parameters;
            }
        } else {
            self.visit_members(id, decl)?;
        }
        Ok(id)
    }

    fn visit_members(&mut self, class: SymbolId, decl: &ClassDecl) -> Result<()> {
        let scope = self
            .ctx
            .table
            .symbol(class)
            .scope()
            .ok_or_else(|| SemanticError::internal("class without a scope"))?;
        for member in &decl.members {
            match member {
                Item::Namespace(ns) => {
                    return Err(SemanticError::internal(format!(
                        "namespace '{}' declared inside class '{}'",
                        ns.name, decl.name
                    )));
                }
                Item::Variable(var) if !var.specifiers.contains(Specifiers::STATIC) => {
                    let id = self.visit_member_variable(class, scope, var)?;
                    self.declared.push(id);
                }
                other => self.visit_item(scope, other)?,
            }
        }
        Ok(())
    }

    fn visit_member_variable(&mut self, class: SymbolId, scope: ScopeId, var: &VariableDecl) -> Result<SymbolId> {
        let index = self
            .ctx
            .table
            .symbol(class)
            .as_class()
            .map_or(0, |c| c.member_variables.len());
        let flags = self.export_flag(scope, var.access) | specifier_flags(var.specifiers);
        let id = self.ctx.table.add_symbol(
            Symbol::new(
                var.name.as_str(),
                var.span,
                SymbolKind::MemberVariable(VariableData {
                    ty: SymbolId::UNRESOLVED,
                    index,
                    syntax: Some(var.ty.clone()),
                }),
            )
            .with_access(var.access)
            .with_flags(flags),
        );
        self.ctx.table.install(scope, id)?;
        if let Some(data) = self.ctx.table.symbol_mut(class).as_class_mut() {
            data.member_variables.push(id);
        }
        Ok(id)
    }

    // ==========================================================================
    // Functions
    // ==========================================================================

    fn visit_function(&mut self, scope: ScopeId, decl: &FunctionDecl) -> Result<SymbolId> {
        let in_interface = self
            .ctx
            .table
            .scope_owner(scope)
            .is_some_and(|o| matches!(self.ctx.table.symbol(o).kind, SymbolKind::Interface(_)));

        let fn_scope = self.ctx.table.add_scope(None, Some(scope));
        let mut data = FunctionData::new(decl.kind, fn_scope, SymbolId::UNRESOLVED);
        data.declaration = Some(Box::new(decl.clone()));

        let mut flags = self.export_flag(scope, decl.access) | specifier_flags(decl.specifiers);
        if in_interface {
            flags |= SymbolFlags::VIRTUAL | SymbolFlags::ABSTRACT;
        }
        if decl.is_template() {
            flags |= SymbolFlags::TEMPLATE;
        }
        let id = self.ctx.table.add_symbol(
            Symbol::new(decl.name.as_str(), decl.span, SymbolKind::Function(data))
                .with_access(decl.access)
                .with_flags(flags),
        );
        self.ctx.table.scope_mut(fn_scope).owner = Some(id);

        if decl.is_template() {
            let parameters = declare_template_parameters(&mut self.ctx.table, fn_scope, &decl.type_params)?;
            if let Some(function) = self.ctx.table.symbol_mut(id).as_function_mut() {
                function.template_parameters = parameters;
            }
        }
        declare_parameters(&mut self.ctx.table, id, fn_scope, &decl.params)?;
        self.ctx.table.install_function(scope, id)?;
        self.functions_registered += 1;
        Ok(id)
    }

    // ==========================================================================
    // Variables, typedefs, constants
    // ==========================================================================

    fn visit_variable(&mut self, scope: ScopeId, var: &VariableDecl) -> Result<SymbolId> {
        let flags = self.export_flag(scope, var.access) | specifier_flags(var.specifiers);
        let id = self.ctx.table.add_symbol(
            Symbol::new(
                var.name.as_str(),
                var.span,
                SymbolKind::GlobalVariable(VariableData {
                    ty: SymbolId::UNRESOLVED,
                    index: self.globals_registered,
                    syntax: Some(var.ty.clone()),
                }),
            )
            .with_access(var.access)
            .with_flags(flags),
        );
        self.ctx.table.install(scope, id)?;
        self.globals_registered += 1;
        Ok(id)
    }

    fn visit_typedef(&mut self, scope: ScopeId, decl: &TypedefDecl) -> Result<SymbolId> {
        let id = self.ctx.table.add_symbol(
            Symbol::new(
                decl.name.as_str(),
                decl.span,
                SymbolKind::Typedef(TypedefData {
                    target: None,
                    syntax: Some(decl.ty.clone()),
                }),
            )
            .with_access(decl.access)
            .with_flags(self.export_flag(scope, decl.access)),
        );
        self.ctx.table.install(scope, id)?;
        Ok(id)
    }

    fn visit_constant(&mut self, scope: ScopeId, decl: &ConstantDecl) -> Result<SymbolId> {
        let id = self.ctx.table.add_symbol(
            Symbol::new(
                decl.name.as_str(),
                decl.span,
                SymbolKind::Constant(ConstantData {
                    ty: SymbolId::UNRESOLVED,
                    value: None,
                    syntax: Some((decl.ty.clone(), decl.value.clone())),
                }),
            )
            .with_access(decl.access)
            .with_flags(self.export_flag(scope, decl.access) | SymbolFlags::CONST),
        );
        self.ctx.table.install(scope, id)?;
        Ok(id)
    }

    // ==========================================================================
    // Enums and delegates
    // ==========================================================================

    fn visit_enum(&mut self, scope: ScopeId, decl: &EnumDecl) -> Result<SymbolId> {
        let enum_scope = self.ctx.table.add_scope(None, Some(scope));
        let flags = self.export_flag(scope, decl.access);
        let id = self.ctx.table.add_symbol(
            Symbol::new(
                decl.name.as_str(),
                decl.span,
                SymbolKind::Enum(EnumData {
                    type_id: TypeId::random(),
                    scope: enum_scope,
                    underlying: SymbolId::UNRESOLVED,
                    underlying_syntax: decl.underlying.clone(),
                }),
            )
            .with_access(decl.access)
            .with_flags(flags),
        );
        self.ctx.table.scope_mut(enum_scope).owner = Some(id);
        self.ctx.table.install(scope, id)?;
        self.ctx.table.add_type(id)?;
        self.types_registered += 1;

        for constant in &decl.constants {
            let constant_id = self.ctx.table.add_symbol(
                Symbol::new(
                    constant.name.as_str(),
                    constant.span,
                    SymbolKind::EnumConstant(EnumConstantData {
                        enum_type: id,
                        value: None,
                        syntax: constant.value.clone(),
                    }),
                )
                .with_access(decl.access)
                .with_flags(flags | SymbolFlags::CONST),
            );
            self.ctx.table.install(enum_scope, constant_id)?;
        }
        Ok(id)
    }

    fn visit_delegate(&mut self, scope: ScopeId, decl: &DelegateDecl) -> Result<SymbolId> {
        let id = self.ctx.table.add_symbol(
            Symbol::new(
                decl.name.as_str(),
                decl.span,
                SymbolKind::Delegate(DelegateData {
                    type_id: TypeId::random(),
                    parameters: Vec::new(),
                    return_type: SymbolId::UNRESOLVED,
                    declaration: Some(Box::new(decl.clone())),
                }),
            )
            .with_access(decl.access)
            .with_flags(self.export_flag(scope, decl.access)),
        );
        self.ctx.table.install(scope, id)?;
        self.ctx.table.add_type(id)?;
        self.types_registered += 1;

        let mut parameters = Vec::with_capacity(decl.params.len());
        for (index, param) in decl.params.iter().enumerate() {
            let mut symbol = parameter_symbol(param, index);
            symbol.parent = Some(id);
            parameters.push(self.ctx.table.add_symbol(symbol));
        }
        if let SymbolKind::Delegate(data) = &mut self.ctx.table.symbol_mut(id).kind {
            data.parameters = parameters;
        }
        Ok(id)
    }

    // ==========================================================================
    // Helpers
    // ==========================================================================

    /// `EXPORTED` if an entity with `access` declared in `scope` is visible
    /// to importers of the unit.
    fn export_flag(&self, scope: ScopeId, access: Access) -> SymbolFlags {
        let visible = match access {
            Access::Public => true,
            Access::Internal => self.ctx.settings.export_internal,
            Access::Protected | Access::Private => false,
        };
        let container_visible = self.ctx.table.scope_owner(scope).is_some_and(|owner| {
            let symbol = self.ctx.table.symbol(owner);
            matches!(symbol.kind, SymbolKind::Namespace(_)) || symbol.has(SymbolFlags::EXPORTED)
        });
        if visible && container_visible {
            SymbolFlags::EXPORTED
        } else {
            SymbolFlags::empty()
        }
    }
}

/// Declare the members of a class from `decl`.
///
/// Used for each class template instance, whose members are declared from
/// a clone of the generic declaration once its parameters are bound.
pub(crate) fn declare_class_members(ctx: &mut BindContext, class: SymbolId, decl: &ClassDecl) -> Result<()> {
    let mut pass = RegistrationPass::new(ctx);
    pass.visit_members(class, decl)
}

/// Declare the parameters of `function` in its scope.
///
/// Unnamed parameters are kept on the function but not installed.
pub(crate) fn declare_parameters(
    table: &mut SymbolTable,
    function: SymbolId,
    scope: ScopeId,
    params: &[Param],
) -> Result<()> {
    let mut ids = Vec::with_capacity(params.len());
    for (index, param) in params.iter().enumerate() {
        let id = table.add_symbol(parameter_symbol(param, index));
        if param.name.is_empty() {
            table.symbol_mut(id).parent = Some(function);
        } else {
            table.install(scope, id)?;
        }
        ids.push(id);
    }
    if let Some(data) = table.symbol_mut(function).as_function_mut() {
        data.parameters = ids;
    }
    Ok(())
}

fn parameter_symbol(param: &Param, index: usize) -> Symbol {
    Symbol::new(
        param.name.as_str(),
        param.span,
        SymbolKind::Parameter(VariableData {
            ty: SymbolId::UNRESOLVED,
            index,
            syntax: Some(param.ty.clone()),
        }),
    )
}

fn declare_template_parameters(
    table: &mut SymbolTable,
    scope: ScopeId,
    params: &[TypeParam],
) -> Result<Vec<SymbolId>> {
    let mut ids = Vec::with_capacity(params.len());
    for (index, param) in params.iter().enumerate() {
        let id = table.add_symbol(
            Symbol::new(
                param.name.as_str(),
                param.span,
                SymbolKind::TemplateParameter(TemplateParameterData {
                    type_id: TypeId::random(),
                    index,
                    default: param.default.clone(),
                    bound: None,
                }),
            )
            .with_flags(SymbolFlags::BOUND),
        );
        table.install(scope, id)?;
        ids.push(id);
    }
    Ok(ids)
}

fn specifier_flags(specifiers: Specifiers) -> SymbolFlags {
    let mut flags = SymbolFlags::empty();
    for (specifier, flag) in [
        (Specifiers::STATIC, SymbolFlags::STATIC),
        (Specifiers::VIRTUAL, SymbolFlags::VIRTUAL),
        (Specifiers::OVERRIDE, SymbolFlags::OVERRIDE),
        (Specifiers::ABSTRACT, SymbolFlags::ABSTRACT | SymbolFlags::VIRTUAL),
        (Specifiers::CONST, SymbolFlags::CONST),
        (Specifiers::EXPLICIT, SymbolFlags::EXPLICIT),
    ] {
        if specifiers.contains(specifier) {
            flags |= flag;
        }
    }
    flags
}

#[cfg(test)]
mod tests {
    use super::*;
    use sable_core::{QualifiedName, ScopeLookup, UnitSettings};
    use sable_syntax::TypeExpr;

    fn register(items: Vec<Item>) -> (BindContext, RegistrationOutput) {
        let mut ctx = BindContext::new(UnitSettings::default());
        let output = RegistrationPass::new(&mut ctx).run(&[SourceFile::new(0, items)]);
        (ctx, output)
    }

    #[test]
    fn namespaces_merge_across_declarations() {
        let (ctx, output) = register(vec![
            Item::Namespace(NamespaceDecl::new(
                "Game",
                vec![Item::Class(ClassDecl::new("Player"))],
            )),
            Item::Namespace(NamespaceDecl::new(
                "Game",
                vec![Item::Class(ClassDecl::new("Enemy"))],
            )),
        ]);
        assert!(output.errors.is_empty());
        assert!(ctx.table.lookup_qualified(&QualifiedName::parse("Game.Player")).is_some());
        assert!(ctx.table.lookup_qualified(&QualifiedName::parse("Game.Enemy")).is_some());
    }

    #[test]
    fn duplicate_in_same_scope_is_reported() {
        let (_, output) = register(vec![
            Item::Class(ClassDecl::new("A")),
            Item::Typedef(TypedefDecl::new("A", TypeExpr::named("int"))),
        ]);
        assert_eq!(output.errors.len(), 1);
        assert!(matches!(output.errors[0], SemanticError::DuplicateDefinition { .. }));
    }

    #[test]
    fn overloads_share_a_group() {
        let (ctx, output) = register(vec![
            Item::Function(FunctionDecl::new("f", TypeExpr::named("void")).param("x", TypeExpr::named("int"))),
            Item::Function(FunctionDecl::new("f", TypeExpr::named("void")).param("x", TypeExpr::named("double"))),
        ]);
        assert_eq!(output.functions_registered, 2);
        let group = ctx
            .table
            .lookup(ctx.table.global_scope(), "f", ScopeLookup::THIS)
            .unwrap();
        assert_eq!(ctx.table.group_functions(group).len(), 2);
    }

    #[test]
    fn generic_class_members_wait_for_instances() {
        let class = ClassDecl::new("Stack")
            .type_param(TypeParam::new("T"))
            .member(Item::Variable(VariableDecl::new("top", TypeExpr::named("T"))));
        let (ctx, _) = register(vec![Item::Class(class)]);
        let stack = ctx
            .table
            .lookup(ctx.table.global_scope(), "Stack", ScopeLookup::THIS)
            .unwrap();
        let data = ctx.table.symbol(stack).as_class().unwrap();
        assert_eq!(data.template_parameters.len(), 1);
        assert!(data.member_variables.is_empty());
        assert!(ctx.table.symbol(stack).has(SymbolFlags::TEMPLATE));
    }

    #[test]
    fn private_members_are_not_exported() {
        let class = ClassDecl::new("Account")
            .member(Item::Variable(VariableDecl::new("balance", TypeExpr::named("long")).access(Access::Private)))
            .member(Item::Function(FunctionDecl::new("deposit", TypeExpr::named("void"))));
        let (ctx, _) = register(vec![Item::Class(class)]);
        let account = ctx
            .table
            .lookup(ctx.table.global_scope(), "Account", ScopeLookup::THIS)
            .unwrap();
        assert!(ctx.table.symbol(account).has(SymbolFlags::EXPORTED));
        let scope = ctx.table.symbol(account).scope().unwrap();
        let balance = ctx.table.lookup(scope, "balance", ScopeLookup::THIS).unwrap();
        assert!(!ctx.table.symbol(balance).has(SymbolFlags::EXPORTED));
        let deposit = ctx.table.lookup(scope, "deposit", ScopeLookup::THIS).unwrap();
        let function = ctx.table.group_functions(deposit)[0];
        assert!(ctx.table.symbol(function).has(SymbolFlags::EXPORTED));
    }

    #[test]
    fn file_below_base_is_rejected() {
        let mut ctx = BindContext::new(UnitSettings::default().with_file_index_base(4));
        let output = RegistrationPass::new(&mut ctx).run(&[SourceFile::new(1, Vec::new())]);
        assert_eq!(output.errors.len(), 1);
    }
}
