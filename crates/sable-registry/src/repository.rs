//! Type repository: every type symbol of a unit keyed by [`TypeId`].
//!
//! Derived types and class template instances are only ever created
//! through [`SymbolTable::make_derived_type`] and
//! [`SymbolTable::make_template_type`], which consult the repository first,
//! so one identity maps to exactly one symbol.

use rustc_hash::FxHashMap;
use tracing::trace;

use sable_core::{Derivation, Result, SemanticError, Span, SymbolFlags, TypeId};

use crate::symbol::{
    ClassData, DerivedTypeData, InstanceState, Symbol, SymbolKind, TemplateInstance,
};
use crate::{SymbolId, SymbolTable};

#[derive(Debug, Clone, Default)]
pub struct TypeRepository {
    by_id: FxHashMap<TypeId, SymbolId>,
}

impl TypeRepository {
    #[inline]
    pub fn get(&self, type_id: TypeId) -> Option<SymbolId> {
        self.by_id.get(&type_id).copied()
    }

    pub(crate) fn insert(&mut self, type_id: TypeId, symbol: SymbolId) {
        self.by_id.insert(type_id, symbol);
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// Collapse reference-to-reference: any pair yields the inner reference
/// unless both are rvalue references.
fn collapse_references(derivations: &mut Vec<Derivation>) {
    while derivations.len() >= 2 {
        let n = derivations.len();
        let (inner, outer) = (derivations[n - 2], derivations[n - 1]);
        if !(inner.is_reference() && outer.is_reference()) {
            break;
        }
        derivations.pop();
        if inner == Derivation::RvalueRef && outer == Derivation::LvalueRef {
            derivations[n - 2] = Derivation::LvalueRef;
        }
    }
}

impl SymbolTable {
    /// Type symbol registered under `type_id`.
    #[inline]
    pub fn get_type(&self, type_id: TypeId) -> Option<SymbolId> {
        self.types.get(type_id)
    }

    /// Register a type symbol under its own identity.
    ///
    /// Returns the symbol already registered under that identity, if any,
    /// leaving the repository unchanged.
    pub fn add_type(&mut self, symbol: SymbolId) -> Result<SymbolId> {
        let type_id = self.symbol(symbol).type_id().ok_or_else(|| SemanticError::NotAType {
            name: self.symbol(symbol).name.clone(),
            span: self.symbol(symbol).span,
        })?;
        if let Some(existing) = self.types.get(type_id) {
            return Ok(existing);
        }
        self.types.insert(type_id, symbol);
        Ok(symbol)
    }

    /// Identity of a type symbol.
    pub fn type_id_of(&self, ty: SymbolId) -> Result<TypeId> {
        self.symbol(ty).type_id().ok_or_else(|| SemanticError::NotAType {
            name: self.symbol(ty).name.clone(),
            span: self.symbol(ty).span,
        })
    }

    /// Split a type into its non-derived base and derivation list.
    pub fn decompose(&self, ty: SymbolId) -> (SymbolId, &[Derivation]) {
        match self.symbol(ty).as_derived() {
            Some(d) => (d.base, d.derivations.as_slice()),
            None => (ty, &[]),
        }
    }

    /// `base` with `derivations` applied on the outside.
    ///
    /// Idempotent: a second request for the same identity returns the
    /// existing symbol. An empty list returns `base` itself.
    pub fn make_derived_type(
        &mut self,
        base: SymbolId,
        derivations: &[Derivation],
        span: Span,
    ) -> Result<SymbolId> {
        if derivations.is_empty() {
            return Ok(base);
        }
        let (root, existing) = self.decompose(base);
        let mut list = existing.to_vec();
        list.extend_from_slice(derivations);
        collapse_references(&mut list);
        self.derived_from_root(root, list, span)
    }

    /// The derived type of non-derived `root` with exactly `derivations`.
    pub fn derived_from_root(
        &mut self,
        root: SymbolId,
        derivations: Vec<Derivation>,
        span: Span,
    ) -> Result<SymbolId> {
        if derivations.is_empty() {
            return Ok(root);
        }
        let root_id = self.type_id_of(root)?;
        let type_id = TypeId::derived(root_id, &derivations);
        if let Some(existing) = self.types.get(type_id) {
            return Ok(existing);
        }
        let name = sable_core::derivation::display_name(&self.symbol(root).name, &derivations);
        let id = self.add_symbol(
            Symbol::new(
                name,
                span,
                SymbolKind::DerivedType(DerivedTypeData {
                    type_id,
                    base: root,
                    derivations,
                }),
            )
            .with_flags(SymbolFlags::BOUND),
        );
        self.types.insert(type_id, id);
        trace!(type_id = %type_id, name = %self.symbol(id).name, "derived type created");
        Ok(id)
    }

    /// Replace the derivation list of `ty`, keeping its base.
    pub fn with_derivations(&mut self, ty: SymbolId, derivations: &[Derivation]) -> Result<SymbolId> {
        let (root, _) = self.decompose(ty);
        self.derived_from_root(root, derivations.to_vec(), Span::default())
    }

    /// `ty` without an outermost reference.
    pub fn remove_reference(&mut self, ty: SymbolId) -> Result<SymbolId> {
        let (_, derivations) = self.decompose(ty);
        if !sable_core::derivation::is_reference(derivations) {
            return Ok(ty);
        }
        let stripped = sable_core::derivation::strip_reference(derivations).to_vec();
        self.with_derivations(ty, &stripped)
    }

    /// `ty` without an outermost reference and then an outermost `const`.
    pub fn value_type(&mut self, ty: SymbolId) -> Result<SymbolId> {
        let (_, derivations) = self.decompose(ty);
        let shape = sable_core::derivation::value_shape(derivations).to_vec();
        if shape.len() == derivations.len() {
            return Ok(ty);
        }
        self.with_derivations(ty, &shape)
    }

    /// The class template instance `subject<arguments...>`.
    ///
    /// Idempotent by identity. A new instance is created in the `Created`
    /// state with an empty scope; binding its members is the template
    /// engine's job.
    pub fn make_template_type(
        &mut self,
        subject: SymbolId,
        arguments: &[SymbolId],
        span: Span,
    ) -> Result<SymbolId> {
        let subject_symbol = self.symbol(subject);
        let Some(class) = subject_symbol.as_class().filter(|c| c.is_generic()) else {
            return Err(SemanticError::NotATemplate {
                name: subject_symbol.name.clone(),
                span,
            });
        };
        let subject_id = class.type_id;
        let subject_scope = class.scope;
        let is_interface = matches!(subject_symbol.kind, SymbolKind::Interface(_));
        let access = subject_symbol.access;
        let parent = subject_symbol.parent;

        let argument_ids = arguments
            .iter()
            .map(|a| self.type_id_of(*a))
            .collect::<Result<Vec<_>>>()?;
        let type_id = TypeId::template_instance(subject_id, &argument_ids);
        if let Some(existing) = self.types.get(type_id) {
            return Ok(existing);
        }

        let name = format!(
            "{}<{}>",
            self.symbol(subject).name,
            arguments
                .iter()
                .map(|a| self.type_name(*a))
                .collect::<Vec<_>>()
                .join(", ")
        );
        let enclosing = self.scope(subject_scope).parent;
        let scope = self.add_scope(None, enclosing);
        let mut data = ClassData::new(type_id, scope);
        data.instance = Some(TemplateInstance {
            subject,
            arguments: arguments.to_vec(),
            state: InstanceState::Created,
        });
        let kind = if is_interface {
            SymbolKind::Interface(data)
        } else {
            SymbolKind::Class(data)
        };
        let mut symbol = Symbol::new(name, span, kind)
            .with_access(access)
            .with_flags(SymbolFlags::REPLICA);
        symbol.parent = parent;
        let id = self.add_symbol(symbol);
        self.scope_mut(scope).owner = Some(id);
        self.types.insert(type_id, id);
        self.class_templates.insert(type_id, id);
        self.hierarchy.add_class(id);
        trace!(type_id = %type_id, name = %self.symbol(id).name, "template type created");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BuiltinType;
    use sable_core::Derivation::*;

    #[test]
    fn make_derived_type_is_idempotent() {
        let mut table = SymbolTable::new();
        let int = table.builtin(BuiltinType::Int);
        let a = table.make_derived_type(int, &[Const, Pointer], Span::default()).unwrap();
        let count = table.symbol_count();
        let b = table.make_derived_type(int, &[Const, Pointer], Span::default()).unwrap();
        assert_eq!(a, b);
        assert_eq!(table.symbol_count(), count);
    }

    #[test]
    fn derived_of_derived_flattens() {
        let mut table = SymbolTable::new();
        let int = table.builtin(BuiltinType::Int);
        let ptr = table.make_derived_type(int, &[Pointer], Span::default()).unwrap();
        let ptr_ptr = table.make_derived_type(ptr, &[Pointer], Span::default()).unwrap();
        let direct = table
            .make_derived_type(int, &[Pointer, Pointer], Span::default())
            .unwrap();
        assert_eq!(ptr_ptr, direct);
        assert_eq!(table.decompose(ptr_ptr), (int, &[Pointer, Pointer][..]));
        assert_eq!(table.symbol(ptr_ptr).name, "int**");
    }

    #[test]
    fn empty_derivations_return_base() {
        let mut table = SymbolTable::new();
        let int = table.builtin(BuiltinType::Int);
        assert_eq!(table.make_derived_type(int, &[], Span::default()).unwrap(), int);
    }

    #[test]
    fn references_collapse() {
        let mut table = SymbolTable::new();
        let int = table.builtin(BuiltinType::Int);
        let r = table.make_derived_type(int, &[LvalueRef], Span::default()).unwrap();
        let rr = table.make_derived_type(r, &[RvalueRef], Span::default()).unwrap();
        assert_eq!(r, rr);
    }

    #[test]
    fn value_type_strips_reference_and_const() {
        let mut table = SymbolTable::new();
        let int = table.builtin(BuiltinType::Int);
        let cref = table
            .make_derived_type(int, &[Const, LvalueRef], Span::default())
            .unwrap();
        assert_eq!(table.value_type(cref).unwrap(), int);
        let ptr = table.make_derived_type(int, &[Pointer], Span::default()).unwrap();
        assert_eq!(table.value_type(ptr).unwrap(), ptr);
    }

    #[test]
    fn template_type_requires_generic_subject() {
        let mut table = SymbolTable::new();
        let int = table.builtin(BuiltinType::Int);
        let err = table.make_template_type(int, &[int], Span::default()).unwrap_err();
        assert!(matches!(err, SemanticError::NotATemplate { .. }));
    }
}
