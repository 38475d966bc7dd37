//! Class conversions: base/derived pointers and references, and
//! user-defined conversion operators and converting constructors.

use sable_core::derivation::{is_pointer, is_reference};
use sable_core::{Result, SymbolFlags};
use sable_registry::{ConversionRank, SymbolId, SymbolTable};

use super::{Argument, Conversion, ConversionKind, ConversionMode};

/// Base/derived conversion of `arg` to `param`.
///
/// Upcasts are implicit and ranked by inheritance distance. Downcasts are
/// only found in explicit mode.
pub fn find_derived_base_conversion(
    table: &mut SymbolTable,
    arg: &Argument,
    param: SymbolId,
    mode: ConversionMode,
) -> Result<Option<Conversion>> {
    let (arg_root, _) = table.decompose(arg.ty);
    let (param_root, param_derivs) = table.decompose(param);
    let (by_reference, by_pointer) = (is_reference(param_derivs), is_pointer(param_derivs));
    if arg_root == param_root
        || table.symbol(arg_root).as_class().is_none()
        || table.symbol(param_root).as_class().is_none()
    {
        return Ok(None);
    }

    let target = if by_reference {
        param
    } else if by_pointer {
        table.value_type(param)?
    } else {
        return Ok(None);
    };
    let source = table.value_type(arg.ty)?;

    let Some(conversion) = table.make_base_derived_conversion(source, target)? else {
        return Ok(None);
    };
    if conversion.downcast && mode == ConversionMode::Implicit {
        return Ok(None);
    }
    Ok(Some(Conversion::new(
        ConversionRank::DerivedBase,
        conversion.distance,
        ConversionKind::Function(conversion.function),
    )))
}

/// A single user-defined conversion registered for the value shapes of
/// `arg` and `param`.
pub fn find_user_conversion(
    table: &mut SymbolTable,
    arg: &Argument,
    param: SymbolId,
    mode: ConversionMode,
) -> Result<Option<Conversion>> {
    let source = table.shape_id(arg.ty)?;
    let target = table.shape_id(param)?;
    let Some(function) = table.get_conversion(source, target) else {
        return Ok(None);
    };
    let symbol = table.symbol(function);
    if symbol.has(SymbolFlags::STANDARD) {
        return Ok(None);
    }
    if symbol.has(SymbolFlags::EXPLICIT) && mode == ConversionMode::Implicit {
        return Ok(None);
    }
    Ok(Some(Conversion::new(
        ConversionRank::UserDefined,
        0,
        ConversionKind::Function(function),
    )))
}
