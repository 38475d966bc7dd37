//! Conversion tables.
//!
//! [`ConversionTable`] maps `(source, target)` identities to a conversion
//! function symbol: built-in standard conversions, user conversion
//! operators and converting constructors. [`ClassConversionTable`] caches
//! synthesized base/derived pointer and reference conversions together with
//! their inheritance distance.
//!
//! Keys are never supplied by callers: [`SymbolTable::add_conversion`]
//! derives them from the function's own parameter and return types.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::trace;

use sable_core::derivation::{is_pointer, is_reference, value_shape};
use sable_core::{Derivation, Result, SemanticError, Span, SymbolFlags, TypeId};
use sable_syntax::FunctionKind;

use crate::symbol::{ConversionInfo, FunctionData, Symbol, SymbolKind, VariableData};
use crate::{SymbolId, SymbolTable};

/// Rank of an argument conversion; lower is better.
///
/// The discriminant is written to module files.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    TryFromPrimitive,
    IntoPrimitive,
    Serialize,
    Deserialize,
)]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum ConversionRank {
    Identity,
    /// Adds `const` or binds a reference without changing the base type.
    Qualification,
    /// Base/derived pointer or reference conversion.
    DerivedBase,
    /// Built-in numeric, character and null-pointer conversions.
    Standard,
    /// One user-defined conversion operator or converting constructor.
    UserDefined,
}

#[derive(Debug, Clone, Default)]
pub struct ConversionTable {
    entries: FxHashMap<(TypeId, TypeId), SymbolId>,
}

impl ConversionTable {
    pub fn get(&self, source: TypeId, target: TypeId) -> Option<SymbolId> {
        self.entries.get(&(source, target)).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A synthesized class pointer/reference conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassConversion {
    pub function: SymbolId,
    pub distance: u32,
    /// Base to derived: only usable in explicit context.
    pub downcast: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ClassConversionTable {
    entries: FxHashMap<(TypeId, TypeId), ClassConversion>,
}

impl ClassConversionTable {
    pub fn get(&self, source: TypeId, target: TypeId) -> Option<ClassConversion> {
        self.entries.get(&(source, target)).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SymbolTable {
    /// Register a conversion function under the key derived from its own
    /// signature.
    ///
    /// - conversion operator `T C::operator T()`: `(C, T)`
    /// - converting constructor `C::C(const S&)`: `(S, C)`
    /// - free conversion `T f(S)`: `(S, T)`
    ///
    /// Source and target are compared by value shape, so `const S&` and
    /// `S` key alike.
    pub fn add_conversion(&mut self, function: SymbolId) -> Result<()> {
        let (source, target) = self.conversion_key(function)?;
        trace!(
            function = %self.full_name(function),
            %source,
            %target,
            "conversion registered"
        );
        self.register_conversion_key(source, target, function);
        Ok(())
    }

    pub(crate) fn register_conversion_key(&mut self, source: TypeId, target: TypeId, function: SymbolId) {
        self.conversions.entries.insert((source, target), function);
    }

    /// The `(source, target)` key of a conversion function.
    pub fn conversion_key(&self, function: SymbolId) -> Result<(TypeId, TypeId)> {
        let symbol = self.symbol(function);
        let data = symbol
            .as_function()
            .ok_or_else(|| SemanticError::internal(format!("'{}' is not a function", symbol.name)))?;
        let owner = symbol.parent.filter(|p| self.symbol(*p).as_class().is_some());
        let (source, target) = match (data.kind, owner) {
            (FunctionKind::Conversion, Some(class)) => (class, data.return_type),
            (FunctionKind::Constructor, Some(class)) => {
                let param = data.parameters.first().and_then(|p| self.symbol(*p).value_type());
                match param {
                    Some(p) if data.parameters.len() == 1 => (p, class),
                    _ => {
                        return Err(SemanticError::internal(format!(
                            "constructor of '{}' is not a converting constructor",
                            self.full_name(class)
                        )));
                    }
                }
            }
            _ => {
                let param = data.parameters.first().and_then(|p| self.symbol(*p).value_type());
                match param {
                    Some(p) if data.parameters.len() == 1 => (p, data.return_type),
                    _ => {
                        return Err(SemanticError::internal(format!(
                            "'{}' does not take exactly one parameter",
                            symbol.name
                        )));
                    }
                }
            }
        };
        Ok((self.shape_id(source)?, self.shape_id(target)?))
    }

    /// Identity of the value shape of `ty` (reference and outer const
    /// removed), computed without allocating new symbols.
    pub fn shape_id(&self, ty: SymbolId) -> Result<TypeId> {
        let (root, derivations) = self.decompose(ty);
        let root_id = self.type_id_of(root)?;
        Ok(TypeId::derived(root_id, value_shape(derivations)))
    }

    /// Registered conversion function from `source` to `target`.
    ///
    /// `None` is a normal outcome: the resolver then tries structural and
    /// standard conversions instead.
    pub fn get_conversion(&self, source: TypeId, target: TypeId) -> Option<SymbolId> {
        self.conversions.get(source, target)
    }

    /// Synthesized class pointer/reference conversion from `source` to
    /// `target`, created and cached on first request.
    ///
    /// Both types must be pointers to classes, or `target` a reference to
    /// a class and `source` that class (or a reference to it). Derived to
    /// base is an implicit upcast; base to derived is a downcast only valid
    /// in explicit context. Returns `None` when the classes are unrelated.
    pub fn make_base_derived_conversion(
        &mut self,
        source: SymbolId,
        target: SymbolId,
    ) -> Result<Option<ClassConversion>> {
        let source_id = self.type_id_of(source)?;
        let target_id = self.type_id_of(target)?;
        if let Some(cached) = self.class_conversions.get(source_id, target_id) {
            return Ok(Some(cached));
        }

        let (source_root, source_derivs) = self.decompose(source);
        let (target_root, target_derivs) = self.decompose(target);
        let pointer_pair = is_pointer(source_derivs)
            && is_pointer(target_derivs)
            && pointee_const_ok(source_derivs, target_derivs);
        let reference_pair = is_reference(target_derivs)
            && value_shape(target_derivs).is_empty()
            && (value_shape(source_derivs).is_empty());
        if !(pointer_pair || reference_pair) {
            return Ok(None);
        }
        if self.symbol(source_root).as_class().is_none()
            || self.symbol(target_root).as_class().is_none()
            || source_root == target_root
        {
            return Ok(None);
        }

        let (distance, downcast) = if let Some(d) = self.hierarchy.distance(source_root, target_root) {
            (d, false)
        } else if let Some(d) = self.hierarchy.distance(target_root, source_root) {
            (d, true)
        } else {
            return Ok(None);
        };

        let function = self.synthesize_class_conversion(source, target, distance, downcast);
        let conversion = ClassConversion {
            function,
            distance,
            downcast,
        };
        self.class_conversions
            .entries
            .insert((source_id, target_id), conversion);
        trace!(
            source = %self.type_name(source),
            target = %self.type_name(target),
            distance,
            downcast,
            "class conversion synthesized"
        );
        Ok(Some(conversion))
    }

    /// Number of inheritance steps from `derived` to `base`.
    pub fn inheritance_distance(&self, derived: SymbolId, base: SymbolId) -> Option<u32> {
        self.hierarchy.distance(derived, base)
    }

    /// Record `base` as a direct base of `derived`. `false` on a cycle.
    pub fn add_inheritance(&mut self, derived: SymbolId, base: SymbolId) -> bool {
        self.hierarchy.add_base(derived, base)
    }

    /// Register a class node in the hierarchy.
    pub fn add_hierarchy_node(&mut self, class: SymbolId) {
        self.hierarchy.add_class(class);
    }

    fn synthesize_class_conversion(
        &mut self,
        source: SymbolId,
        target: SymbolId,
        distance: u32,
        downcast: bool,
    ) -> SymbolId {
        let scope = self.add_scope(None, Some(self.global_scope()));
        let mut data = FunctionData::new(FunctionKind::Conversion, scope, target);
        data.conversion = Some(ConversionInfo {
            rank: ConversionRank::DerivedBase,
            distance,
        });
        let mut flags = SymbolFlags::SYNTHESIZED | SymbolFlags::BOUND;
        if downcast {
            flags |= SymbolFlags::EXPLICIT;
        }
        let name = format!("{}->{}", self.type_name(source), self.type_name(target));
        let function = self.add_symbol(
            Symbol::new(name, Span::default(), SymbolKind::Function(data)).with_flags(flags),
        );
        let parameter = self.add_symbol(Symbol::new(
            "value",
            Span::default(),
            SymbolKind::Parameter(VariableData {
                ty: source,
                index: 0,
                syntax: None,
            }),
        ));
        self.symbol_mut(parameter).parent = Some(function);
        if let Some(data) = self.symbol_mut(function).as_function_mut() {
            data.parameters.push(parameter);
        }
        function
    }
}

/// A pointer conversion may add `const` to the pointee but not drop it.
fn pointee_const_ok(source: &[Derivation], target: &[Derivation]) -> bool {
    let source_const = source.first() == Some(&Derivation::Const);
    let target_const = target.first() == Some(&Derivation::Const);
    let source_rest = if source_const { &source[1..] } else { source };
    let target_rest = if target_const { &target[1..] } else { target };
    (!source_const || target_const) && source_rest == [Derivation::Pointer] && target_rest == [Derivation::Pointer]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::ClassData;
    use crate::BuiltinType;
    use sable_core::Derivation::*;

    fn class(table: &mut SymbolTable, name: &str) -> SymbolId {
        let scope = table.add_scope(None, Some(table.global_scope()));
        let id = table.add_symbol(Symbol::new(
            name,
            Span::default(),
            SymbolKind::Class(ClassData::new(TypeId::random(), scope)),
        ));
        table.scope_mut(scope).owner = Some(id);
        table.install(table.global_scope(), id).unwrap();
        table.add_type(id).unwrap();
        table.add_hierarchy_node(id);
        id
    }

    #[test]
    fn missing_conversion_is_none() {
        let table = SymbolTable::new();
        let a = TypeId::random();
        assert_eq!(table.get_conversion(a, BuiltinType::Int.type_id()), None);
    }

    #[test]
    fn upcast_and_downcast() {
        let mut table = SymbolTable::new();
        let base = class(&mut table, "Base");
        let mid = class(&mut table, "Mid");
        let derived = class(&mut table, "Derived");
        assert!(table.add_inheritance(mid, base));
        assert!(table.add_inheritance(derived, mid));

        let derived_ptr = table.make_derived_type(derived, &[Pointer], Span::default()).unwrap();
        let base_ptr = table.make_derived_type(base, &[Pointer], Span::default()).unwrap();

        let up = table.make_base_derived_conversion(derived_ptr, base_ptr).unwrap().unwrap();
        assert_eq!(up.distance, 2);
        assert!(!up.downcast);
        assert!(!table.symbol(up.function).has(SymbolFlags::EXPLICIT));

        let down = table.make_base_derived_conversion(base_ptr, derived_ptr).unwrap().unwrap();
        assert!(down.downcast);
        assert!(table.symbol(down.function).has(SymbolFlags::EXPLICIT));

        let again = table.make_base_derived_conversion(derived_ptr, base_ptr).unwrap().unwrap();
        assert_eq!(again, up);
    }

    #[test]
    fn reference_binding_to_base() {
        let mut table = SymbolTable::new();
        let base = class(&mut table, "Base");
        let derived = class(&mut table, "Derived");
        assert!(table.add_inheritance(derived, base));
        let base_ref = table.make_derived_type(base, &[LvalueRef], Span::default()).unwrap();
        let conv = table.make_base_derived_conversion(derived, base_ref).unwrap().unwrap();
        assert_eq!(conv.distance, 1);
    }

    #[test]
    fn unrelated_classes_have_no_conversion() {
        let mut table = SymbolTable::new();
        let a = class(&mut table, "A");
        let b = class(&mut table, "B");
        let a_ptr = table.make_derived_type(a, &[Pointer], Span::default()).unwrap();
        let b_ptr = table.make_derived_type(b, &[Pointer], Span::default()).unwrap();
        assert_eq!(table.make_base_derived_conversion(a_ptr, b_ptr).unwrap(), None);
    }

    #[test]
    fn const_pointee_cannot_be_dropped() {
        assert!(pointee_const_ok(&[Pointer], &[Const, Pointer]));
        assert!(!pointee_const_ok(&[Const, Pointer], &[Pointer]));
    }
}
