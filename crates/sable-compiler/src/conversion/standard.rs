//! Standard conversions: built-in numerics, null to pointer, enums.

use sable_core::derivation::{is_pointer, strip_const, strip_reference};
use sable_core::{Result, SymbolFlags};
use sable_registry::symbol::SymbolKind;
use sable_registry::{BuiltinType, ConversionRank, SymbolId, SymbolTable};

use super::{Argument, Conversion, ConversionKind, ConversionMode};

/// Standard conversion of `arg` to `param`, if one applies.
pub fn find_standard_conversion(
    table: &mut SymbolTable,
    arg: &Argument,
    param: SymbolId,
    mode: ConversionMode,
) -> Result<Option<Conversion>> {
    let (arg_root, arg_derivs) = table.decompose(arg.ty);
    let (param_root, param_derivs) = table.decompose(param);
    let arg_shape = strip_const(strip_reference(arg_derivs));
    let param_shape = strip_const(strip_reference(param_derivs));

    // nullptr_t to any pointer
    if table.as_builtin(arg_root) == Some(BuiltinType::NullPtr) && arg_shape.is_empty() {
        return Ok(is_pointer(param_shape).then(|| {
            Conversion::new(ConversionRank::Standard, 0, ConversionKind::Reinterpret)
        }));
    }

    if !arg_shape.is_empty() || !param_shape.is_empty() {
        return Ok(None);
    }

    match (&table.symbol(arg_root).kind, &table.symbol(param_root).kind) {
        (SymbolKind::BasicType(_), SymbolKind::BasicType(_)) => {
            Ok(builtin_conversion(table, arg_root, param_root, mode, 0))
        }
        (SymbolKind::Enum(e), SymbolKind::BasicType(_)) => {
            let underlying = e.underlying;
            if underlying == param_root {
                return Ok(Some(Conversion::new(
                    ConversionRank::Standard,
                    1,
                    ConversionKind::Reinterpret,
                )));
            }
            Ok(builtin_conversion(table, underlying, param_root, mode, 1))
        }
        (SymbolKind::BasicType(b), SymbolKind::Enum(_)) if b.builtin.is_integer() => {
            Ok((mode == ConversionMode::Explicit).then(|| {
                Conversion::new(ConversionRank::Standard, 1, ConversionKind::Reinterpret)
            }))
        }
        _ => Ok(None),
    }
}

/// A registered built-in conversion, honoring its explicit flag.
fn builtin_conversion(
    table: &SymbolTable,
    source: SymbolId,
    target: SymbolId,
    mode: ConversionMode,
    extra_distance: u32,
) -> Option<Conversion> {
    let (Some(source_id), Some(target_id)) = (
        table.symbol(source).type_id(),
        table.symbol(target).type_id(),
    ) else {
        return None;
    };
    let function = table.get_conversion(source_id, target_id)?;
    let symbol = table.symbol(function);
    if symbol.has(SymbolFlags::EXPLICIT) && mode == ConversionMode::Implicit {
        return None;
    }
    let distance = symbol
        .as_function()
        .and_then(|f| f.conversion)
        .map(|c| c.distance)
        .unwrap_or(0);
    Some(Conversion::new(
        ConversionRank::Standard,
        distance + extra_distance,
        ConversionKind::Function(function),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sable_core::{Derivation, Span};

    #[test]
    fn widening_is_implicit() {
        let mut table = SymbolTable::new();
        let int = table.builtin(BuiltinType::Int);
        let double = table.builtin(BuiltinType::Double);
        let conv = find_standard_conversion(&mut table, &Argument::value(int), double, ConversionMode::Implicit)
            .unwrap()
            .unwrap();
        assert_eq!(conv.rank, ConversionRank::Standard);
        assert!(conv.function().is_some());
    }

    #[test]
    fn narrowing_needs_explicit_mode() {
        let mut table = SymbolTable::new();
        let int = table.builtin(BuiltinType::Int);
        let double = table.builtin(BuiltinType::Double);
        let arg = Argument::value(double);
        assert!(
            find_standard_conversion(&mut table, &arg, int, ConversionMode::Implicit)
                .unwrap()
                .is_none()
        );
        assert!(
            find_standard_conversion(&mut table, &arg, int, ConversionMode::Explicit)
                .unwrap()
                .is_some()
        );
    }

    #[test]
    fn null_converts_to_any_pointer() {
        let mut table = SymbolTable::new();
        let null = table.builtin(BuiltinType::NullPtr);
        let int = table.builtin(BuiltinType::Int);
        let ptr = table
            .make_derived_type(int, &[Derivation::Pointer], Span::default())
            .unwrap();
        let conv = find_standard_conversion(&mut table, &Argument::value(null), ptr, ConversionMode::Implicit)
            .unwrap()
            .unwrap();
        assert_eq!(conv.kind, ConversionKind::Reinterpret);
        assert!(
            find_standard_conversion(&mut table, &Argument::value(null), int, ConversionMode::Implicit)
                .unwrap()
                .is_none()
        );
    }
}
