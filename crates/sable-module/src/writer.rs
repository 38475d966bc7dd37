//! Export: capture the exported part of a bound symbol table.
//!
//! Containers are walked in declaration order. A symbol is written if it
//! carries `EXPORTED` and was declared by this unit; imported symbols are
//! never re-exported. Member variables and member functions of an exported
//! class are always written since its layout and virtual table depend on
//! them, and namespaces are written only if something inside them is.

use tracing::debug;

use sable_core::{Result, SemanticError, SymbolFlags, UnitSettings};
use sable_registry::symbol::{ClassData, FunctionData, InstanceState, SymbolKind};
use sable_registry::{SymbolId, SymbolTable};

use crate::image::{
    ClassRecord, FunctionRecord, InstanceRecord, ModuleImage, ParamRecord, Payload, Record,
    ReplicaRecord, TemplateParamRecord, TypeRef, VariableRecord,
};

/// Builds a [`ModuleImage`] from a bound table.
pub struct ModuleWriter<'a> {
    table: &'a SymbolTable,
    settings: &'a UnitSettings,
}

impl<'a> ModuleWriter<'a> {
    pub fn new(table: &'a SymbolTable, settings: &'a UnitSettings) -> Self {
        Self { table, settings }
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn capture(&self) -> Result<ModuleImage> {
        let symbols = self.container(self.table.global())?;
        let instances = self.instances()?;
        let replicas = self.replicas()?;
        debug!(
            unit = %self.settings.unit_name,
            symbols = symbols.iter().map(Record::count).sum::<usize>(),
            instances = instances.len(),
            replicas = replicas.len(),
            "module captured"
        );
        Ok(ModuleImage {
            version: self.settings.module_version,
            symbols,
            instances,
            replicas,
        })
    }

    /// Exported children of a namespace.
    fn container(&self, container: SymbolId) -> Result<Vec<Record>> {
        let mut out = Vec::new();
        for &child in self.table.children(container) {
            let symbol = self.table.symbol(child);
            match &symbol.kind {
                SymbolKind::Namespace(_) => {
                    let children = self.container(child)?;
                    if !children.is_empty() {
                        out.push(self.header(child, Payload::Namespace { children }));
                    }
                }
                SymbolKind::FunctionGroup(group) => {
                    for &function in &group.functions {
                        if self.is_exported(function) {
                            out.push(self.function(function)?);
                        }
                    }
                }
                _ if self.is_exported(child) => {
                    if let Some(record) = self.record(child)? {
                        out.push(record);
                    }
                }
                _ => {}
            }
        }
        Ok(out)
    }

    fn is_exported(&self, id: SymbolId) -> bool {
        let symbol = self.table.symbol(id);
        symbol.has(SymbolFlags::EXPORTED) && !symbol.has(SymbolFlags::EXTERNAL)
    }

    fn header(&self, id: SymbolId, payload: Payload) -> Record {
        let symbol = self.table.symbol(id);
        Record {
            name: symbol.name.clone(),
            span: symbol.span,
            access: symbol.access,
            flags: symbol.flags & SymbolFlags::PERSISTENT,
            payload,
        }
    }

    /// Record of a non-namespace symbol; `None` for kinds that are never
    /// written on their own.
    fn record(&self, id: SymbolId) -> Result<Option<Record>> {
        let symbol = self.table.symbol(id);
        let payload = match &symbol.kind {
            SymbolKind::Class(c) | SymbolKind::Interface(c) => {
                if c.instance.is_some() {
                    return Ok(None);
                }
                Payload::Class(self.class(id, c)?)
            }
            SymbolKind::Enum(e) => {
                let mut constants = Vec::new();
                for &constant in self.table.children(id) {
                    if let Some(record) = self.record(constant)? {
                        constants.push(record);
                    }
                }
                Payload::Enum {
                    type_id: e.type_id,
                    underlying: self.type_ref(e.underlying, id)?,
                    constants,
                }
            }
            SymbolKind::EnumConstant(c) => Payload::EnumConstant {
                value: c.value.ok_or_else(|| self.unbound(id))?,
            },
            SymbolKind::Delegate(d) => Payload::Delegate {
                type_id: d.type_id,
                return_type: self.type_ref(d.return_type, id)?,
                parameters: self.parameters(&d.parameters)?,
            },
            SymbolKind::Typedef(t) => Payload::Typedef {
                target: self.type_ref(t.target.ok_or_else(|| self.unbound(id))?, id)?,
            },
            SymbolKind::GlobalVariable(v) => Payload::GlobalVariable(VariableRecord {
                ty: self.type_ref(v.ty, id)?,
                index: index(v.index)?,
            }),
            SymbolKind::MemberVariable(v) => Payload::MemberVariable(VariableRecord {
                ty: self.type_ref(v.ty, id)?,
                index: index(v.index)?,
            }),
            SymbolKind::Constant(c) => Payload::Constant {
                ty: self.type_ref(c.ty, id)?,
                value: c.value.clone().ok_or_else(|| self.unbound(id))?,
            },
            SymbolKind::Function(_) => return self.function(id).map(Some),
            _ => return Ok(None),
        };
        Ok(Some(self.header(id, payload)))
    }

    fn class(&self, id: SymbolId, data: &ClassData) -> Result<ClassRecord> {
        let mut members = Vec::new();
        if !data.is_generic() {
            for &child in self.table.children(id) {
                let symbol = self.table.symbol(child);
                match &symbol.kind {
                    SymbolKind::MemberVariable(_) => {
                        if let Some(record) = self.record(child)? {
                            members.push(record);
                        }
                    }
                    // Every member function: virtual table slots depend on them.
                    SymbolKind::FunctionGroup(group) => {
                        for &function in &group.functions {
                            members.push(self.function(function)?);
                        }
                    }
                    _ if self.is_exported(child) || data.instance.is_some() => {
                        if let Some(record) = self.record(child)? {
                            members.push(record);
                        }
                    }
                    _ => {}
                }
            }
        }
        Ok(ClassRecord {
            interface: matches!(self.table.symbol(id).kind, SymbolKind::Interface(_)),
            type_id: data.type_id,
            base_class: data.base_class.map(|b| self.type_ref(b, id)).transpose()?,
            interfaces: data
                .interfaces
                .iter()
                .map(|i| self.type_ref(*i, id))
                .collect::<Result<_>>()?,
            template_parameters: self.template_parameters(&data.template_parameters),
            declaration: data
                .declaration
                .as_deref()
                .filter(|_| data.is_generic())
                .cloned(),
            members,
        })
    }

    fn function(&self, id: SymbolId) -> Result<Record> {
        let data = self
            .table
            .symbol(id)
            .as_function()
            .ok_or_else(|| SemanticError::internal("not a function"))?;
        Ok(self.header(id, Payload::Function(self.function_record(id, data)?)))
    }

    fn function_record(&self, id: SymbolId, data: &FunctionData) -> Result<FunctionRecord> {
        if data.is_generic() {
            return Ok(FunctionRecord {
                kind: data.kind,
                parameters: Vec::new(),
                return_type: None,
                conversion: None,
                template_parameters: self.template_parameters(&data.template_parameters),
                declaration: data.declaration.as_deref().cloned(),
            });
        }
        Ok(FunctionRecord {
            kind: data.kind,
            parameters: self.parameters(&data.parameters)?,
            return_type: Some(self.type_ref(data.return_type, id)?),
            conversion: data.conversion.map(|c| (c.rank, c.distance)),
            template_parameters: Vec::new(),
            declaration: None,
        })
    }

    fn parameters(&self, parameters: &[SymbolId]) -> Result<Vec<ParamRecord>> {
        parameters
            .iter()
            .map(|&p| {
                let symbol = self.table.symbol(p);
                let ty = symbol.value_type().ok_or_else(|| self.unbound(p))?;
                Ok(ParamRecord {
                    name: symbol.name.clone(),
                    ty: self.type_ref(ty, p)?,
                })
            })
            .collect()
    }

    fn template_parameters(&self, parameters: &[SymbolId]) -> Vec<TemplateParamRecord> {
        parameters
            .iter()
            .map(|&p| {
                let symbol = self.table.symbol(p);
                let default = match &symbol.kind {
                    SymbolKind::TemplateParameter(t) => t.default.clone(),
                    _ => None,
                };
                TemplateParamRecord {
                    name: symbol.name.clone(),
                    default,
                }
            })
            .collect()
    }

    /// Class template instances whose template and arguments an importer
    /// can name.
    fn instances(&self) -> Result<Vec<InstanceRecord>> {
        let mut out = Vec::new();
        for &instance in self.table.class_instances() {
            let symbol = self.table.symbol(instance);
            let Some(data) = symbol.as_class() else {
                continue;
            };
            let Some(info) = &data.instance else {
                continue;
            };
            if !info.arguments.iter().all(|a| self.is_portable(*a)) || !self.is_portable(info.subject) {
                continue;
            }
            let subject = self.table.symbol(info.subject);
            let class = match info.state {
                InstanceState::Bound => {
                    Some(self.header(instance, Payload::Class(self.class(instance, data)?)))
                }
                _ => None,
            };
            out.push(InstanceRecord {
                owner: self.owner_name(subject.parent),
                subject: subject.name.clone(),
                arguments: info
                    .arguments
                    .iter()
                    .map(|a| self.type_ref(*a, instance))
                    .collect::<Result<_>>()?,
                class,
            });
        }
        Ok(out)
    }

    fn replicas(&self) -> Result<Vec<ReplicaRecord>> {
        let mut out = Vec::new();
        for entry in self.table.function_replicas() {
            let replica = self.table.symbol(entry.replica);
            let Some(data) = replica.as_function() else {
                continue;
            };
            let Some(instance) = &data.instance else {
                continue;
            };
            let generic = self.table.symbol(entry.generic);
            let owner = generic.parent;
            let owned_by_instance = owner
                .and_then(|o| self.table.symbol(o).as_class())
                .is_some_and(|c| c.instance.is_some());
            let portable = instance.arguments.iter().all(|a| self.is_portable(*a));
            let visible = generic.has(SymbolFlags::EXPORTED) || generic.has(SymbolFlags::EXTERNAL);
            if !replica.has(SymbolFlags::BOUND) || owned_by_instance || !portable || !visible {
                continue;
            }
            out.push(ReplicaRecord {
                owner: self.owner_name(owner),
                generic: generic.name.clone(),
                declared: generic.span,
                arguments: instance
                    .arguments
                    .iter()
                    .map(|a| self.type_ref(*a, entry.replica))
                    .collect::<Result<_>>()?,
                function: self.function(entry.replica)?,
            });
        }
        Ok(out)
    }

    fn owner_name(&self, owner: Option<SymbolId>) -> String {
        owner.map(|o| self.table.full_name(o)).unwrap_or_default()
    }

    /// Whether an importer can resolve `ty` by identity: built-ins,
    /// exported or imported types, and instances of those.
    fn is_portable(&self, ty: SymbolId) -> bool {
        let (root, _) = self.table.decompose(ty);
        let symbol = self.table.symbol(root);
        match &symbol.kind {
            SymbolKind::BasicType(_) => true,
            SymbolKind::Class(c) | SymbolKind::Interface(c) => match &c.instance {
                Some(info) => self.is_portable(info.subject) && info.arguments.iter().all(|a| self.is_portable(*a)),
                None => symbol.has(SymbolFlags::EXPORTED) || symbol.has(SymbolFlags::EXTERNAL),
            },
            SymbolKind::Enum(_) | SymbolKind::Delegate(_) => {
                symbol.has(SymbolFlags::EXPORTED) || symbol.has(SymbolFlags::EXTERNAL)
            }
            _ => false,
        }
    }

    fn type_ref(&self, ty: SymbolId, user: SymbolId) -> Result<TypeRef> {
        if ty.is_unresolved() {
            return Err(self.unbound(user));
        }
        let (root, derivations) = self.table.decompose(ty);
        Ok(TypeRef::new(self.table.type_id_of(root)?, derivations.to_vec()))
    }

    fn unbound(&self, id: SymbolId) -> SemanticError {
        SemanticError::internal(format!(
            "cannot export '{}' at {}: the unit is not bound",
            self.table.full_name(id),
            self.table.symbol(id).span
        ))
    }
}

fn index(value: usize) -> Result<u32> {
    u32::try_from(value).map_err(|_| SemanticError::internal("layout index out of range"))
}
