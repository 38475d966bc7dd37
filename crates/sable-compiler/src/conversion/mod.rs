//! Argument conversions.
//!
//! Determines whether an argument can be passed to a parameter, and at
//! what rank. The search runs in priority order and the first match wins:
//!
//! 1. Identity: same value shape
//! 2. Qualification: adds `const` or binds a reference
//! 3. Base/derived pointer or reference conversion, tagged with distance
//! 4. Standard conversions between built-ins, null to pointer, enums
//! 5. One user-defined conversion operator or converting constructor
//!
//! `Explicit` mode additionally admits downcasts and conversions marked
//! explicit; it is what casts use.

mod class;
mod standard;

pub use class::{find_derived_base_conversion, find_user_conversion};
pub use standard::find_standard_conversion;

use std::cmp::Ordering;

use sable_core::derivation::{is_const_value, outermost, strip_const, strip_reference};
use sable_core::{Derivation, Result, Span};
use sable_registry::{ConversionRank, SymbolId, SymbolTable};

use crate::bound::ValueCategory;

/// An argument at a call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Argument {
    /// Value type of the argument expression; never a reference.
    pub ty: SymbolId,
    pub category: ValueCategory,
    pub span: Span,
}

impl Argument {
    pub fn new(ty: SymbolId, category: ValueCategory) -> Self {
        Self {
            ty,
            category,
            span: Span::default(),
        }
    }

    pub fn lvalue(ty: SymbolId) -> Self {
        Self::new(ty, ValueCategory::LValue)
    }

    pub fn value(ty: SymbolId) -> Self {
        Self::new(ty, ValueCategory::Value)
    }

    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConversionMode {
    Implicit,
    Explicit,
}

/// What the emitter has to do to apply a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConversionKind {
    /// Nothing.
    None,
    /// Call a conversion function.
    Function(SymbolId),
    /// Reinterpret the bits: null to pointer, enum to integer and back.
    Reinterpret,
}

/// A conversion of one argument to one parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Conversion {
    pub rank: ConversionRank,
    /// Tie-break within a rank; lower is better.
    pub distance: u32,
    pub kind: ConversionKind,
}

impl Conversion {
    pub const IDENTITY: Conversion = Conversion {
        rank: ConversionRank::Identity,
        distance: 0,
        kind: ConversionKind::None,
    };

    pub const QUALIFICATION: Conversion = Conversion {
        rank: ConversionRank::Qualification,
        distance: 0,
        kind: ConversionKind::None,
    };

    pub fn new(rank: ConversionRank, distance: u32, kind: ConversionKind) -> Self {
        Self {
            rank,
            distance,
            kind,
        }
    }

    pub fn is_exact(&self) -> bool {
        self.rank == ConversionRank::Identity
    }

    /// Conversion function to splice into the call, if any.
    pub fn function(&self) -> Option<SymbolId> {
        match self.kind {
            ConversionKind::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Whether the emitter needs a conversion node.
    pub fn needs_node(&self) -> bool {
        self.kind != ConversionKind::None
    }

    /// Rank first, then distance. `Less` means `self` is better.
    pub fn compare(&self, other: &Conversion) -> Ordering {
        (self.rank, self.distance).cmp(&(other.rank, other.distance))
    }
}

/// Find a conversion of `arg` to a parameter of type `param`.
///
/// `Ok(None)` means no conversion exists; that is an expected outcome, not
/// an error. Errors only come from malformed types.
pub fn find_conversion(
    table: &mut SymbolTable,
    arg: &Argument,
    param: SymbolId,
    mode: ConversionMode,
) -> Result<Option<Conversion>> {
    let binding = ReferenceBinding::of(table, param);
    if !binding.accepts(table, arg) {
        return Ok(None);
    }

    let (arg_root, arg_derivs) = table.decompose(arg.ty);
    let (param_root, param_derivs) = table.decompose(param);
    let arg_shape = strip_const(strip_reference(arg_derivs)).to_vec();
    let param_shape = strip_const(strip_reference(param_derivs)).to_vec();

    if arg_root == param_root {
        if arg_shape == param_shape {
            return Ok(Some(match binding {
                ReferenceBinding::None => Conversion::IDENTITY,
                _ => Conversion::QUALIFICATION,
            }));
        }
        if !binding.is_mutable_lvalue() && adds_qualification(&arg_shape, &param_shape) {
            return Ok(Some(Conversion::QUALIFICATION));
        }
    }

    if let Some(conversion) = find_derived_base_conversion(table, arg, param, mode)? {
        return Ok(Some(conversion));
    }

    // Everything below produces a temporary.
    if binding.is_mutable_lvalue() {
        return Ok(None);
    }

    if let Some(conversion) = find_standard_conversion(table, arg, param, mode)? {
        return Ok(Some(conversion));
    }

    find_user_conversion(table, arg, param, mode)
}

/// How a parameter binds its argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReferenceBinding {
    None,
    /// `T&`
    MutableLvalue,
    /// `const T&`
    ConstLvalue,
    /// `T&&`
    Rvalue,
}

impl ReferenceBinding {
    fn of(table: &SymbolTable, param: SymbolId) -> Self {
        let (_, derivations) = table.decompose(param);
        match outermost(derivations) {
            Some(Derivation::LvalueRef) => {
                if is_const_value(strip_reference(derivations)) {
                    ReferenceBinding::ConstLvalue
                } else {
                    ReferenceBinding::MutableLvalue
                }
            }
            Some(Derivation::RvalueRef) => ReferenceBinding::Rvalue,
            _ => ReferenceBinding::None,
        }
    }

    fn is_mutable_lvalue(self) -> bool {
        self == ReferenceBinding::MutableLvalue
    }

    fn accepts(self, table: &SymbolTable, arg: &Argument) -> bool {
        match self {
            ReferenceBinding::MutableLvalue => {
                let (_, derivations) = table.decompose(arg.ty);
                arg.category.is_lvalue() && !is_const_value(strip_reference(derivations))
            }
            ReferenceBinding::Rvalue => !arg.category.is_lvalue(),
            ReferenceBinding::None | ReferenceBinding::ConstLvalue => true,
        }
    }
}

/// Whether `to` is `from` with zero or more `const` derivations inserted.
pub fn adds_qualification(from: &[Derivation], to: &[Derivation]) -> bool {
    let (mut i, mut j) = (0, 0);
    while i < from.len() || j < to.len() {
        match (from.get(i), to.get(j)) {
            (Some(a), Some(b)) if a == b => {
                i += 1;
                j += 1;
            }
            (_, Some(Derivation::Const)) => j += 1,
            _ => return false,
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use sable_core::Derivation::*;
    use sable_registry::BuiltinType;

    fn derived(table: &mut SymbolTable, base: SymbolId, d: &[Derivation]) -> SymbolId {
        table.make_derived_type(base, d, Span::default()).unwrap()
    }

    #[test]
    fn identity_for_same_type() {
        let mut table = SymbolTable::new();
        let int = table.builtin(BuiltinType::Int);
        let conv = find_conversion(&mut table, &Argument::lvalue(int), int, ConversionMode::Implicit)
            .unwrap()
            .unwrap();
        assert!(conv.is_exact());
    }

    #[test]
    fn const_value_copies_by_identity() {
        let mut table = SymbolTable::new();
        let int = table.builtin(BuiltinType::Int);
        let cint = derived(&mut table, int, &[Const]);
        let conv = find_conversion(&mut table, &Argument::lvalue(cint), int, ConversionMode::Implicit)
            .unwrap()
            .unwrap();
        assert_eq!(conv, Conversion::IDENTITY);
    }

    #[test]
    fn reference_binding_is_qualification() {
        let mut table = SymbolTable::new();
        let int = table.builtin(BuiltinType::Int);
        let cref = derived(&mut table, int, &[Const, LvalueRef]);
        let conv = find_conversion(&mut table, &Argument::value(int), cref, ConversionMode::Implicit)
            .unwrap()
            .unwrap();
        assert_eq!(conv.rank, ConversionRank::Qualification);
    }

    #[test]
    fn mutable_reference_needs_lvalue() {
        let mut table = SymbolTable::new();
        let int = table.builtin(BuiltinType::Int);
        let r = derived(&mut table, int, &[LvalueRef]);
        assert!(
            find_conversion(&mut table, &Argument::value(int), r, ConversionMode::Implicit)
                .unwrap()
                .is_none()
        );
        let cint = derived(&mut table, int, &[Const]);
        assert!(
            find_conversion(&mut table, &Argument::lvalue(cint), r, ConversionMode::Implicit)
                .unwrap()
                .is_none()
        );
        let short = table.builtin(BuiltinType::Short);
        assert!(
            find_conversion(&mut table, &Argument::lvalue(short), r, ConversionMode::Implicit)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn pointer_to_const_pointer_is_qualification() {
        let mut table = SymbolTable::new();
        let int = table.builtin(BuiltinType::Int);
        let ptr = derived(&mut table, int, &[Pointer]);
        let cptr = derived(&mut table, int, &[Const, Pointer]);
        let conv = find_conversion(&mut table, &Argument::lvalue(ptr), cptr, ConversionMode::Implicit)
            .unwrap()
            .unwrap();
        assert_eq!(conv.rank, ConversionRank::Qualification);
        assert!(
            find_conversion(&mut table, &Argument::lvalue(cptr), ptr, ConversionMode::Implicit)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn ranks_compare_rank_then_distance() {
        let a = Conversion::new(ConversionRank::Standard, 1, ConversionKind::None);
        let b = Conversion::new(ConversionRank::Standard, 3, ConversionKind::None);
        let c = Conversion::new(ConversionRank::UserDefined, 0, ConversionKind::None);
        assert_eq!(a.compare(&b), Ordering::Less);
        assert_eq!(b.compare(&c), Ordering::Less);
        assert_eq!(Conversion::IDENTITY.compare(&Conversion::QUALIFICATION), Ordering::Less);
    }

    #[test]
    fn qualification_insertion() {
        assert!(adds_qualification(&[Pointer], &[Const, Pointer]));
        assert!(adds_qualification(&[Pointer, Pointer], &[Const, Pointer, Pointer]));
        assert!(!adds_qualification(&[Const, Pointer], &[Pointer]));
        assert!(!adds_qualification(&[Pointer], &[Array]));
    }
}
