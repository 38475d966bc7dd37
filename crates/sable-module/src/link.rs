//! Import: link a decoded [`ModuleImage`] into a symbol table.
//!
//! Records are allocated in stream order. Containers are created before
//! their members, and each member's parent is set by the container that
//! installs it. A type reference whose root type is already registered is
//! resolved on the spot; otherwise it is parked in the deferred-patch map
//! under the root's [`TypeId`] and back-patched the moment a record
//! registers that type. Anything still parked once the whole image is
//! linked is an `UnresolvedType` error.
//!
//! After the patch map drains, base classes are connected, virtual tables
//! rebuilt and conversion functions registered, exactly as the class binder
//! does for source classes.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};

use sable_core::{
    Derivation, QualifiedName, Result, ScopeLookup, SemanticError, Span, SymbolFlags, TypeId,
};
use sable_registry::symbol::{
    ClassData, ConstantData, ConversionInfo, DelegateData, EnumConstantData, EnumData,
    FunctionData, FunctionInstance, InstanceState, Symbol, SymbolKind, TemplateInstance,
    TemplateParameterData, TypedefData, VariableData,
};
use sable_registry::{ScopeId, SymbolId, SymbolTable};

use crate::image::{
    ClassRecord, FunctionRecord, InstanceRecord, ModuleImage, ParamRecord, Payload, Record,
    ReplicaRecord, TemplateParamRecord, TypeRef,
};

/// Counts reported by a successful import.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub symbols: usize,
    pub types: usize,
    pub instances: usize,
    pub replicas: usize,
    /// References that had to wait for a later record.
    pub deferred: usize,
}

/// Where a resolved type is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    /// Type of a variable, parameter, or constant.
    Value,
    /// Return type of a function or delegate.
    Return,
    Base,
    Interface(usize),
    Underlying,
    Target,
    /// Argument of a replica.
    Argument(usize),
}

/// A reference waiting for its root type.
#[derive(Debug, Clone)]
struct Pending {
    symbol: SymbolId,
    slot: Slot,
    derivations: Vec<Derivation>,
}

/// Links one image into a table. Use a staging copy: on error the table is
/// left half-linked.
pub struct Linker<'t> {
    table: &'t mut SymbolTable,
    deferred: FxHashMap<TypeId, Vec<Pending>>,
    classes: Vec<SymbolId>,
    conversions: Vec<SymbolId>,
    summary: ImportSummary,
}

impl<'t> Linker<'t> {
    pub fn new(table: &'t mut SymbolTable) -> Self {
        Self {
            table,
            deferred: FxHashMap::default(),
            classes: Vec::new(),
            conversions: Vec::new(),
            summary: ImportSummary::default(),
        }
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn link(mut self, image: &ModuleImage) -> Result<ImportSummary> {
        let global = self.table.global_scope();
        for record in &image.symbols {
            self.record(global, record)?;
        }
        for instance in &image.instances {
            self.instance(instance)?;
        }
        for replica in &image.replicas {
            self.replica(replica)?;
        }
        self.check_unresolved()?;
        self.finish_classes()?;
        for function in std::mem::take(&mut self.conversions) {
            self.table.add_conversion(function)?;
        }
        debug!(
            symbols = self.summary.symbols,
            types = self.summary.types,
            deferred = self.summary.deferred,
            "module linked"
        );
        Ok(self.summary)
    }

    // =========================================================================
    // Records
    // =========================================================================

    fn flags(record: &Record) -> SymbolFlags {
        ((record.flags & SymbolFlags::PERSISTENT) - SymbolFlags::EXPORTED)
            | SymbolFlags::EXTERNAL
            | SymbolFlags::BOUND
    }

    fn allocate(&mut self, record: &Record, kind: SymbolKind) -> SymbolId {
        self.summary.symbols += 1;
        self.table.add_symbol(
            Symbol::new(record.name.clone(), record.span, kind)
                .with_access(record.access)
                .with_flags(Self::flags(record)),
        )
    }

    fn record(&mut self, scope: ScopeId, record: &Record) -> Result<()> {
        match &record.payload {
            Payload::Namespace { children } => {
                let ns = self.table.get_or_create_namespace(scope, &record.name, record.span)?;
                let inner = self
                    .table
                    .symbol(ns)
                    .scope()
                    .ok_or_else(|| SemanticError::internal("namespace without a scope"))?;
                for child in children {
                    self.record(inner, child)?;
                }
            }
            Payload::Class(class) => {
                let id = self.class_symbol(scope, record, class, None)?;
                self.table.install(scope, id)?;
                self.register_type(id)?;
                self.class_members(id, class)?;
            }
            Payload::Enum {
                type_id,
                underlying,
                constants,
            } => {
                let enum_scope = self.table.add_scope(None, Some(scope));
                let id = self.allocate(
                    record,
                    SymbolKind::Enum(EnumData {
                        type_id: *type_id,
                        scope: enum_scope,
                        underlying: SymbolId::UNRESOLVED,
                        underlying_syntax: None,
                    }),
                );
                self.table.scope_mut(enum_scope).owner = Some(id);
                self.table.install(scope, id)?;
                self.register_type(id)?;
                self.resolve(id, Slot::Underlying, underlying)?;
                for constant in constants {
                    let Payload::EnumConstant { value } = constant.payload else {
                        return Err(SemanticError::corrupt(format!("enum '{}' has a non-constant member", record.name)));
                    };
                    let c = self.allocate(
                        constant,
                        SymbolKind::EnumConstant(EnumConstantData {
                            enum_type: id,
                            value: Some(value),
                            syntax: None,
                        }),
                    );
                    self.table.install(enum_scope, c)?;
                }
            }
            Payload::EnumConstant { .. } => {
                return Err(SemanticError::corrupt(format!("enum constant '{}' outside an enum", record.name)));
            }
            Payload::Delegate {
                type_id,
                return_type,
                parameters,
            } => {
                let id = self.allocate(
                    record,
                    SymbolKind::Delegate(DelegateData {
                        type_id: *type_id,
                        parameters: Vec::new(),
                        return_type: SymbolId::UNRESOLVED,
                        declaration: None,
                    }),
                );
                self.table.install(scope, id)?;
                self.register_type(id)?;
                let params = self.parameters(id, None, parameters)?;
                if let SymbolKind::Delegate(d) = &mut self.table.symbol_mut(id).kind {
                    d.parameters = params;
                }
                self.resolve(id, Slot::Return, return_type)?;
            }
            Payload::Typedef { target } => {
                let id = self.allocate(
                    record,
                    SymbolKind::Typedef(TypedefData {
                        target: None,
                        syntax: None,
                    }),
                );
                self.table.install(scope, id)?;
                self.resolve(id, Slot::Target, target)?;
            }
            Payload::GlobalVariable(v) | Payload::MemberVariable(v) => {
                let data = VariableData {
                    ty: SymbolId::UNRESOLVED,
                    index: v.index as usize,
                    syntax: None,
                };
                let kind = match record.payload {
                    Payload::MemberVariable(_) => SymbolKind::MemberVariable(data),
                    _ => SymbolKind::GlobalVariable(data),
                };
                let id = self.allocate(record, kind);
                self.table.install(scope, id)?;
                self.resolve(id, Slot::Value, &v.ty)?;
            }
            Payload::Constant { ty, value } => {
                let id = self.allocate(
                    record,
                    SymbolKind::Constant(ConstantData {
                        ty: SymbolId::UNRESOLVED,
                        value: Some(value.clone()),
                        syntax: None,
                    }),
                );
                self.table.install(scope, id)?;
                self.resolve(id, Slot::Value, ty)?;
            }
            Payload::Function(function) => {
                let id = self.function(scope, record, function)?;
                self.table.install_function(scope, id)?;
            }
        }
        Ok(())
    }

    /// Allocate a class symbol; members are linked separately so that the
    /// class can be registered first.
    fn class_symbol(
        &mut self,
        scope: ScopeId,
        record: &Record,
        class: &ClassRecord,
        instance: Option<TemplateInstance>,
    ) -> Result<SymbolId> {
        let class_scope = self.table.add_scope(None, Some(scope));
        let mut data = ClassData::new(class.type_id, class_scope);
        data.interfaces = vec![SymbolId::UNRESOLVED; class.interfaces.len()];
        data.declaration = class.declaration.clone().map(Box::new);
        data.vtable_complete = true;
        data.instance = instance;
        let kind = if class.interface {
            SymbolKind::Interface(data)
        } else {
            SymbolKind::Class(data)
        };
        let id = self.allocate(record, kind);
        self.table.scope_mut(class_scope).owner = Some(id);
        self.table.add_hierarchy_node(id);
        let parameters = self.template_parameters(id, class_scope, &class.template_parameters)?;
        if let Some(data) = self.table.symbol_mut(id).as_class_mut() {
            data.template_parameters = parameters;
        }
        self.classes.push(id);
        Ok(id)
    }

    fn class_members(&mut self, id: SymbolId, class: &ClassRecord) -> Result<()> {
        if let Some(base) = &class.base_class {
            self.resolve(id, Slot::Base, base)?;
        }
        for (i, interface) in class.interfaces.iter().enumerate() {
            self.resolve(id, Slot::Interface(i), interface)?;
        }
        let scope = self
            .table
            .symbol(id)
            .scope()
            .ok_or_else(|| SemanticError::internal("class without a scope"))?;
        for member in &class.members {
            self.record(scope, member)?;
        }
        let mut layout: Vec<(usize, SymbolId)> = self
            .table
            .children(id)
            .iter()
            .filter_map(|c| match &self.table.symbol(*c).kind {
                SymbolKind::MemberVariable(v) => Some((v.index, *c)),
                _ => None,
            })
            .collect();
        layout.sort_unstable();
        if let Some(data) = self.table.symbol_mut(id).as_class_mut() {
            data.member_variables = layout.into_iter().map(|(_, c)| c).collect();
        }
        Ok(())
    }

    fn template_parameters(
        &mut self,
        owner: SymbolId,
        scope: ScopeId,
        parameters: &[TemplateParamRecord],
    ) -> Result<Vec<SymbolId>> {
        let mut out = Vec::with_capacity(parameters.len());
        for (index, p) in parameters.iter().enumerate() {
            let span = self.table.symbol(owner).span;
            let id = self.table.add_symbol(
                Symbol::new(
                    p.name.clone(),
                    span,
                    SymbolKind::TemplateParameter(TemplateParameterData {
                        type_id: TypeId::random(),
                        index,
                        default: p.default.clone(),
                        bound: None,
                    }),
                )
                .with_flags(SymbolFlags::BOUND),
            );
            self.table.install(scope, id)?;
            self.table.add_type(id)?;
            out.push(id);
        }
        Ok(out)
    }

    fn function(&mut self, scope: ScopeId, record: &Record, function: &FunctionRecord) -> Result<SymbolId> {
        let fn_scope = self.table.add_scope(None, Some(scope));
        let mut data = FunctionData::new(function.kind, fn_scope, SymbolId::UNRESOLVED);
        data.declaration = function.declaration.clone().map(Box::new);
        data.conversion = function.conversion.map(|(rank, distance)| ConversionInfo { rank, distance });
        let id = self.allocate(record, SymbolKind::Function(data));
        self.table.scope_mut(fn_scope).owner = Some(id);

        let template_parameters = self.template_parameters(id, fn_scope, &function.template_parameters)?;
        let parameters = self.parameters(id, Some(fn_scope), &function.parameters)?;
        if let Some(data) = self.table.symbol_mut(id).as_function_mut() {
            data.template_parameters = template_parameters;
            data.parameters = parameters;
        }
        if let Some(return_type) = &function.return_type {
            self.resolve(id, Slot::Return, return_type)?;
        }
        if function.conversion.is_some() && function.return_type.is_some() {
            self.conversions.push(id);
        }
        Ok(id)
    }

    /// Parameter symbols; installed in `scope` when the function has one.
    fn parameters(&mut self, owner: SymbolId, scope: Option<ScopeId>, parameters: &[ParamRecord]) -> Result<Vec<SymbolId>> {
        let mut out = Vec::with_capacity(parameters.len());
        for (index, p) in parameters.iter().enumerate() {
            let span = self.table.symbol(owner).span;
            let id = self.table.add_symbol(
                Symbol::new(
                    p.name.clone(),
                    span,
                    SymbolKind::Parameter(VariableData {
                        ty: SymbolId::UNRESOLVED,
                        index,
                        syntax: None,
                    }),
                )
                .with_flags(SymbolFlags::EXTERNAL | SymbolFlags::BOUND),
            );
            match scope {
                Some(scope) if !p.name.is_empty() => self.table.install(scope, id)?,
                _ => self.table.symbol_mut(id).parent = Some(owner),
            }
            self.resolve(id, Slot::Value, &p.ty)?;
            out.push(id);
        }
        Ok(out)
    }

    // =========================================================================
    // Template instances and replicas
    // =========================================================================

    fn owner(&self, name: &str, span: Span) -> Result<SymbolId> {
        if name.is_empty() {
            return Ok(self.table.global());
        }
        self.table
            .lookup_qualified(&QualifiedName::parse(name))
            .ok_or_else(|| SemanticError::SymbolNotFound {
                name: name.to_string(),
                span,
            })
    }

    fn instance(&mut self, record: &InstanceRecord) -> Result<()> {
        let span = record.class.as_ref().map(|c| c.span).unwrap_or_default();
        let owner = self.owner(&record.owner, span)?;
        let scope = self
            .table
            .symbol(owner)
            .scope()
            .ok_or_else(|| SemanticError::NotAScope {
                name: record.owner.clone(),
                span,
            })?;
        let subject = self
            .table
            .lookup(scope, &record.subject, ScopeLookup::THIS)
            .ok_or_else(|| SemanticError::SymbolNotFound {
                name: format!("{}.{}", record.owner, record.subject),
                span,
            })?;
        let mut arguments = Vec::with_capacity(record.arguments.len());
        for argument in &record.arguments {
            arguments.push(self.resolve_now(argument, span)?);
        }

        let Some(class_record) = &record.class else {
            // Named but never bound: the importer instantiates it on demand.
            let id = self.table.make_template_type(subject, &arguments, span)?;
            self.patch(id)?;
            self.summary.instances += 1;
            return Ok(());
        };
        let Payload::Class(class) = &class_record.payload else {
            return Err(SemanticError::corrupt(format!("instance '{}' is not a class", class_record.name)));
        };
        if let Some(existing) = self.table.get_type(class.type_id) {
            // The table already has this instance; the existing one wins.
            return self.patch(existing);
        }
        let enclosing = self
            .table
            .symbol(subject)
            .scope()
            .and_then(|s| self.table.scope(s).parent)
            .unwrap_or(self.table.global_scope());
        let info = TemplateInstance {
            subject,
            arguments,
            state: InstanceState::Bound,
        };
        let id = self.class_symbol(enclosing, class_record, class, Some(info))?;
        let parent = self.table.symbol(subject).parent;
        self.table.symbol_mut(id).parent = parent;
        self.register_type(id)?;
        self.table.add_class_instance(class.type_id, id);
        self.class_members(id, class)?;
        self.summary.instances += 1;
        Ok(())
    }

    fn replica(&mut self, record: &ReplicaRecord) -> Result<()> {
        let span = record.function.span;
        let owner = self.owner(&record.owner, span)?;
        let scope = self
            .table
            .symbol(owner)
            .scope()
            .ok_or_else(|| SemanticError::NotAScope {
                name: record.owner.clone(),
                span,
            })?;
        let generic = self
            .table
            .scope(scope)
            .get(&record.generic)
            .and_then(|g| {
                self.table.group_functions(g).iter().copied().find(|&f| {
                    let symbol = self.table.symbol(f);
                    symbol.span == record.declared && symbol.as_function().is_some_and(|d| d.is_generic())
                })
            })
            .ok_or_else(|| SemanticError::SymbolNotFound {
                name: format!("{}.{}", record.owner, record.generic),
                span,
            })?;
        let key: Vec<TypeId> = record.arguments.iter().map(TypeRef::type_id).collect();
        if self.table.function_replica(generic, &key).is_some() {
            return Ok(());
        }
        let Payload::Function(function) = &record.function.payload else {
            return Err(SemanticError::corrupt(format!("replica '{}' is not a function", record.function.name)));
        };

        let id = self.function(scope, &record.function, function)?;
        self.table.symbol_mut(id).parent = Some(owner);
        if let Some(data) = self.table.symbol_mut(id).as_function_mut() {
            data.instance = Some(FunctionInstance {
                generic,
                arguments: vec![SymbolId::UNRESOLVED; record.arguments.len()],
            });
        }
        for (i, argument) in record.arguments.iter().enumerate() {
            self.resolve(id, Slot::Argument(i), argument)?;
        }
        self.table.add_function_replica(generic, key, id);
        self.summary.replicas += 1;
        Ok(())
    }

    // =========================================================================
    // Type references
    // =========================================================================

    /// Register a type symbol and back-patch everything waiting for it.
    fn register_type(&mut self, id: SymbolId) -> Result<()> {
        let registered = self.table.add_type(id)?;
        if registered != id {
            let symbol = self.table.symbol(id);
            return Err(SemanticError::DuplicateDefinition {
                name: self.table.full_name(id),
                span: symbol.span,
                previous: self.table.symbol(registered).span,
            });
        }
        self.summary.types += 1;
        self.patch(id)
    }

    /// Resolve every reference waiting for the registered type `id`.
    fn patch(&mut self, id: SymbolId) -> Result<()> {
        let type_id = self.table.type_id_of(id)?;
        if let Some(waiting) = self.deferred.remove(&type_id) {
            trace!(%type_id, waiting = waiting.len(), "deferred references patched");
            for pending in waiting {
                let ty = self.table.derived_from_root(id, pending.derivations, Span::default())?;
                self.apply(pending.symbol, pending.slot, ty);
            }
        }
        Ok(())
    }

    fn resolve(&mut self, symbol: SymbolId, slot: Slot, ty: &TypeRef) -> Result<()> {
        match self.table.get_type(ty.root) {
            Some(root) => {
                let span = self.table.symbol(symbol).span;
                let resolved = self.table.derived_from_root(root, ty.derivations.clone(), span)?;
                self.apply(symbol, slot, resolved);
            }
            None => {
                self.summary.deferred += 1;
                self.deferred.entry(ty.root).or_default().push(Pending {
                    symbol,
                    slot,
                    derivations: ty.derivations.clone(),
                });
            }
        }
        Ok(())
    }

    /// Resolve a reference that cannot wait, e.g. an instance argument.
    fn resolve_now(&mut self, ty: &TypeRef, span: Span) -> Result<SymbolId> {
        let root = self
            .table
            .get_type(ty.root)
            .ok_or(SemanticError::UnresolvedType { type_id: ty.root, span })?;
        self.table.derived_from_root(root, ty.derivations.clone(), span)
    }

    fn apply(&mut self, symbol: SymbolId, slot: Slot, ty: SymbolId) {
        match (&mut self.table.symbol_mut(symbol).kind, slot) {
            (
                SymbolKind::Parameter(v)
                | SymbolKind::Local(v)
                | SymbolKind::MemberVariable(v)
                | SymbolKind::GlobalVariable(v),
                Slot::Value,
            ) => v.ty = ty,
            (SymbolKind::Constant(c), Slot::Value) => c.ty = ty,
            (SymbolKind::Function(f), Slot::Return) => f.return_type = ty,
            (SymbolKind::Delegate(d), Slot::Return) => d.return_type = ty,
            (SymbolKind::Class(c) | SymbolKind::Interface(c), Slot::Base) => c.base_class = Some(ty),
            (SymbolKind::Class(c) | SymbolKind::Interface(c), Slot::Interface(i)) => {
                if let Some(entry) = c.interfaces.get_mut(i) {
                    *entry = ty;
                }
            }
            (SymbolKind::Enum(e), Slot::Underlying) => e.underlying = ty,
            (SymbolKind::Typedef(t), Slot::Target) => t.target = Some(ty),
            (SymbolKind::Function(f), Slot::Argument(i)) => {
                if let Some(entry) = f.instance.as_mut().and_then(|inst| inst.arguments.get_mut(i)) {
                    *entry = ty;
                }
            }
            _ => {}
        }
    }

    fn check_unresolved(&self) -> Result<()> {
        let Some((type_id, waiting)) = self.deferred.iter().min_by_key(|(id, _)| **id) else {
            return Ok(());
        };
        let span = waiting
            .first()
            .map(|p| self.table.symbol(p.symbol).span)
            .unwrap_or_default();
        Err(SemanticError::UnresolvedType {
            type_id: *type_id,
            span,
        })
    }

    // =========================================================================
    // Class completion
    // =========================================================================

    /// Connect bases and build virtual tables, bases first.
    fn finish_classes(&mut self) -> Result<()> {
        let mut done = FxHashSet::default();
        for class in self.classes.clone() {
            self.finish_class(class, &mut done)?;
        }
        Ok(())
    }

    fn finish_class(&mut self, class: SymbolId, done: &mut FxHashSet<SymbolId>) -> Result<()> {
        if !done.insert(class) {
            return Ok(());
        }
        let Some(data) = self.table.symbol(class).as_class() else {
            return Ok(());
        };
        if data.is_generic() {
            return Ok(());
        }
        let scope = data.scope;
        let base = data.base_class;
        let mut bases: Vec<SymbolId> = data.interfaces.clone();
        bases.extend(base);

        for b in bases {
            if self.classes.contains(&b) {
                self.finish_class(b, done)?;
            }
            if !self.table.add_inheritance(class, b) {
                return Err(SemanticError::CyclicDefinition {
                    name: self.table.full_name(class),
                    span: self.table.symbol(class).span,
                });
            }
        }
        if let Some(b) = base {
            let base_scope = self.table.symbol(b).scope();
            self.table.scope_mut(scope).base = base_scope;
        }

        self.table.build_vtable(class)
    }
}
