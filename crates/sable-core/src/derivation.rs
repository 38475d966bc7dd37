//! Type derivations.
//!
//! A derived type is a base type plus an ordered list of [`Derivation`]s,
//! applied innermost first: `const int*` is `int` with `[Const, Pointer]`,
//! `int* const` is `int` with `[Pointer, Const]`.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

/// A single type modifier.
///
/// The discriminant is the byte code hashed into derived [`TypeId`]s and
/// written to module files, so it must never change.
///
/// [`TypeId`]: crate::TypeId
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
#[repr(u8)]
pub enum Derivation {
    Const = 0x1d,
    LvalueRef = 0x2b,
    RvalueRef = 0x47,
    Pointer = 0x5c,
    Array = 0x93,
}

impl Derivation {
    /// Whether this is an lvalue or rvalue reference.
    #[inline]
    pub fn is_reference(self) -> bool {
        matches!(self, Derivation::LvalueRef | Derivation::RvalueRef)
    }

    /// Source spelling, used for display names.
    pub fn spelling(self) -> &'static str {
        match self {
            Derivation::Const => "const",
            Derivation::LvalueRef => "&",
            Derivation::RvalueRef => "&&",
            Derivation::Pointer => "*",
            Derivation::Array => "[]",
        }
    }
}

/// The outermost derivation of a list.
#[inline]
pub fn outermost(derivations: &[Derivation]) -> Option<Derivation> {
    derivations.last().copied()
}

/// Whether the outermost derivation is a reference.
#[inline]
pub fn is_reference(derivations: &[Derivation]) -> bool {
    outermost(derivations).is_some_and(Derivation::is_reference)
}

/// Whether the outermost derivation is a pointer.
#[inline]
pub fn is_pointer(derivations: &[Derivation]) -> bool {
    outermost(derivations) == Some(Derivation::Pointer)
}

/// Number of pointer levels.
pub fn pointer_depth(derivations: &[Derivation]) -> usize {
    derivations
        .iter()
        .filter(|d| **d == Derivation::Pointer)
        .count()
}

/// Drop an outermost reference, if any.
pub fn strip_reference(derivations: &[Derivation]) -> &[Derivation] {
    if is_reference(derivations) {
        &derivations[..derivations.len() - 1]
    } else {
        derivations
    }
}

/// Drop an outermost `const`, if any.
pub fn strip_const(derivations: &[Derivation]) -> &[Derivation] {
    if outermost(derivations) == Some(Derivation::Const) {
        &derivations[..derivations.len() - 1]
    } else {
        derivations
    }
}

/// Drop an outermost reference and then an outermost `const`.
///
/// What remains is the "value shape" of the type: `const int&` becomes
/// `int`, `const Foo*&` becomes `const Foo*`.
pub fn value_shape(derivations: &[Derivation]) -> &[Derivation] {
    strip_const(strip_reference(derivations))
}

/// Whether the value shape is `const` (ignoring a reference on top).
pub fn is_const_value(derivations: &[Derivation]) -> bool {
    outermost(strip_reference(derivations)) == Some(Derivation::Const)
}

/// Render a type name with its derivations.
pub fn display_name(base: &str, derivations: &[Derivation]) -> String {
    let mut out = base.to_string();
    for derivation in derivations {
        match derivation {
            Derivation::Const if out.ends_with(['*', ']']) => out.push_str(" const"),
            Derivation::Const => out = format!("const {out}"),
            other => out.push_str(other.spelling()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use Derivation::*;

    #[test]
    fn code_round_trips_through_u8() {
        for d in [Const, LvalueRef, RvalueRef, Pointer, Array] {
            let code: u8 = d.into();
            assert_eq!(Derivation::try_from(code).ok(), Some(d));
        }
        assert!(Derivation::try_from(0u8).is_err());
    }

    #[test]
    fn value_shape_strips_reference_then_const() {
        assert_eq!(value_shape(&[Const, LvalueRef]), &[] as &[Derivation]);
        assert_eq!(value_shape(&[Const, Pointer, LvalueRef]), &[Const, Pointer]);
        assert_eq!(value_shape(&[Pointer]), &[Pointer]);
    }

    #[test]
    fn const_value_detection() {
        assert!(is_const_value(&[Const, LvalueRef]));
        assert!(is_const_value(&[Const]));
        assert!(!is_const_value(&[Const, Pointer]));
    }

    #[test]
    fn display_names() {
        assert_eq!(display_name("int", &[Const, Pointer]), "const int*");
        assert_eq!(display_name("int", &[Pointer, Const]), "int* const");
        assert_eq!(display_name("Foo", &[LvalueRef]), "Foo&");
        assert_eq!(pointer_depth(&[Pointer, Const, Pointer]), 2);
    }
}
