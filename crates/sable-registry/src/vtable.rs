//! Virtual tables.
//!
//! A class's table starts as a copy of its base class's table. Each own
//! instance function either replaces the inherited slot with the same
//! signature or, if declared virtual, appends a new slot. A class with an
//! abstract function in any slot is abstract.

use tracing::trace;

use sable_core::{Result, SemanticError, SymbolFlags};
use sable_syntax::FunctionKind;

use crate::{SymbolId, SymbolTable};

impl SymbolTable {
    /// Functions declared directly in `class`, in declaration order.
    pub fn member_functions(&self, class: SymbolId) -> Vec<SymbolId> {
        self.children(class)
            .iter()
            .flat_map(|child| self.group_functions(*child).iter().copied())
            .collect()
    }

    /// Same name, parameter types and constness.
    pub fn same_signature(&self, a: SymbolId, b: SymbolId) -> bool {
        let (sa, sb) = (self.symbol(a), self.symbol(b));
        let (Some(fa), Some(fb)) = (sa.as_function(), sb.as_function()) else {
            return false;
        };
        if sa.name != sb.name
            || fa.parameters.len() != fb.parameters.len()
            || sa.has(SymbolFlags::CONST) != sb.has(SymbolFlags::CONST)
        {
            return false;
        }
        fa.parameters.iter().zip(&fb.parameters).all(|(pa, pb)| {
            let ta = self.symbol(*pa).value_type().and_then(|t| self.get(t)).and_then(|s| s.type_id());
            let tb = self.symbol(*pb).value_type().and_then(|t| self.get(t)).and_then(|s| s.type_id());
            ta.is_some() && ta == tb
        })
    }

    /// Build the virtual table of `class`. The base class table must
    /// already be built.
    pub fn build_vtable(&mut self, class: SymbolId) -> Result<()> {
        let data = self
            .symbol(class)
            .as_class()
            .ok_or_else(|| SemanticError::internal(format!("'{}' is not a class", self.full_name(class))))?;
        let mut vtable = match data.base_class {
            Some(base) => self
                .symbol(base)
                .as_class()
                .map(|b| b.vtable.clone())
                .unwrap_or_default(),
            None => Vec::new(),
        };

        for function in self.member_functions(class) {
            let symbol = self.symbol(function);
            let is_instance_method = symbol
                .as_function()
                .is_some_and(|f| f.kind == FunctionKind::Normal && !f.is_generic())
                && !symbol.has(SymbolFlags::STATIC);
            if !is_instance_method {
                continue;
            }
            let declared_virtual = symbol.has(SymbolFlags::VIRTUAL) || symbol.has(SymbolFlags::ABSTRACT);
            let slot = match vtable.iter().position(|f| self.same_signature(*f, function)) {
                Some(slot) => {
                    vtable[slot] = function;
                    self.symbol_mut(function).flags |= SymbolFlags::OVERRIDE | SymbolFlags::VIRTUAL;
                    slot
                }
                None if declared_virtual => {
                    vtable.push(function);
                    vtable.len() - 1
                }
                None => continue,
            };
            if let Some(f) = self.symbol_mut(function).as_function_mut() {
                f.vtable_slot = Some(slot);
            }
        }

        let is_abstract = vtable.iter().any(|f| self.symbol(*f).has(SymbolFlags::ABSTRACT));
        trace!(class = %self.full_name(class), slots = vtable.len(), is_abstract, "vtable built");
        let symbol = self.symbol_mut(class);
        if is_abstract {
            symbol.flags |= SymbolFlags::ABSTRACT;
        }
        if let Some(data) = symbol.as_class_mut() {
            data.vtable = vtable;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::{ClassData, FunctionData, Symbol, SymbolKind, VariableData};
    use crate::BuiltinType;
    use sable_core::{Span, TypeId};

    fn class(table: &mut SymbolTable, name: &str, base: Option<SymbolId>) -> SymbolId {
        let scope = table.add_scope(None, Some(table.global_scope()));
        let mut data = ClassData::new(TypeId::random(), scope);
        data.base_class = base;
        let id = table.add_symbol(Symbol::new(name, Span::default(), SymbolKind::Class(data)));
        table.scope_mut(scope).owner = Some(id);
        table.install(table.global_scope(), id).unwrap();
        id
    }

    fn method(table: &mut SymbolTable, class: SymbolId, name: &str, flags: SymbolFlags) -> SymbolId {
        let class_scope = table.symbol(class).scope().unwrap();
        let scope = table.add_scope(None, Some(class_scope));
        let void = table.builtin(BuiltinType::Void);
        let int = table.builtin(BuiltinType::Int);
        let f = table.add_symbol(
            Symbol::new(
                name,
                Span::default(),
                SymbolKind::Function(FunctionData::new(FunctionKind::Normal, scope, void)),
            )
            .with_flags(flags),
        );
        let p = table.add_symbol(Symbol::new(
            "x",
            Span::default(),
            SymbolKind::Parameter(VariableData {
                ty: int,
                index: 0,
                syntax: None,
            }),
        ));
        table.symbol_mut(f).as_function_mut().unwrap().parameters.push(p);
        table.install_function(class_scope, f).unwrap();
        f
    }

    #[test]
    fn override_replaces_inherited_slot() {
        let mut table = SymbolTable::new();
        let base = class(&mut table, "Base", None);
        let run = method(&mut table, base, "run", SymbolFlags::VIRTUAL);
        let stop = method(&mut table, base, "stop", SymbolFlags::VIRTUAL);
        table.build_vtable(base).unwrap();

        let derived = class(&mut table, "Derived", Some(base));
        let run2 = method(&mut table, derived, "run", SymbolFlags::empty());
        let extra = method(&mut table, derived, "extra", SymbolFlags::VIRTUAL);
        method(&mut table, derived, "helper", SymbolFlags::empty());
        table.build_vtable(derived).unwrap();

        let vtable = &table.symbol(derived).as_class().unwrap().vtable;
        assert_eq!(vtable, &vec![run2, stop, extra]);
        assert!(table.symbol(run2).has(SymbolFlags::OVERRIDE));
        assert_eq!(table.symbol(run).as_function().unwrap().vtable_slot, Some(0));
    }

    #[test]
    fn abstract_slot_makes_class_abstract() {
        let mut table = SymbolTable::new();
        let shape = class(&mut table, "Shape", None);
        method(&mut table, shape, "area", SymbolFlags::VIRTUAL | SymbolFlags::ABSTRACT);
        table.build_vtable(shape).unwrap();
        assert!(table.symbol(shape).has(SymbolFlags::ABSTRACT));

        let square = class(&mut table, "Square", Some(shape));
        method(&mut table, square, "area", SymbolFlags::empty());
        table.build_vtable(square).unwrap();
        assert!(!table.symbol(square).has(SymbolFlags::ABSTRACT));
    }
}
