//! Built-in basic types and their standard conversions.
//!
//! Every built-in gets a stable tag [`TypeId`] so all units agree on it
//! without exchanging anything. Standard conversions between built-ins are
//! ordinary conversion function symbols registered in the conversion table,
//! ranked `Standard`, with an intra-rank distance and an explicit flag for
//! conversions that may lose range.

use num_enum::{IntoPrimitive, TryFromPrimitive};

use sable_core::{Access, Span, SymbolFlags, TypeId};
use sable_syntax::FunctionKind;

use crate::symbol::{
    BasicTypeData, ConversionInfo, FunctionData, Symbol, SymbolKind, VariableData,
};
use crate::{ConversionRank, SymbolId, SymbolTable};

/// Built-in basic types.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, TryFromPrimitive, IntoPrimitive,
)]
#[repr(u8)]
pub enum BuiltinType {
    Void = 0,
    Bool = 1,
    SByte = 2,
    Byte = 3,
    Short = 4,
    UShort = 5,
    Int = 6,
    UInt = 7,
    Long = 8,
    ULong = 9,
    Float = 10,
    Double = 11,
    Char = 12,
    WChar = 13,
    UChar = 14,
    NullPtr = 15,
}

/// Broad category of a built-in, for conversion rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinFamily {
    Void,
    Bool,
    SignedInt,
    UnsignedInt,
    Float,
    Char,
    NullPtr,
}

impl BuiltinType {
    pub const ALL: [BuiltinType; 16] = [
        BuiltinType::Void,
        BuiltinType::Bool,
        BuiltinType::SByte,
        BuiltinType::Byte,
        BuiltinType::Short,
        BuiltinType::UShort,
        BuiltinType::Int,
        BuiltinType::UInt,
        BuiltinType::Long,
        BuiltinType::ULong,
        BuiltinType::Float,
        BuiltinType::Double,
        BuiltinType::Char,
        BuiltinType::WChar,
        BuiltinType::UChar,
        BuiltinType::NullPtr,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BuiltinType::Void => "void",
            BuiltinType::Bool => "bool",
            BuiltinType::SByte => "sbyte",
            BuiltinType::Byte => "byte",
            BuiltinType::Short => "short",
            BuiltinType::UShort => "ushort",
            BuiltinType::Int => "int",
            BuiltinType::UInt => "uint",
            BuiltinType::Long => "long",
            BuiltinType::ULong => "ulong",
            BuiltinType::Float => "float",
            BuiltinType::Double => "double",
            BuiltinType::Char => "char",
            BuiltinType::WChar => "wchar",
            BuiltinType::UChar => "uchar",
            BuiltinType::NullPtr => "nullptr_t",
        }
    }

    /// Stable identity of this built-in.
    pub fn type_id(self) -> TypeId {
        TypeId::from_tag(self.name())
    }

    pub fn family(self) -> BuiltinFamily {
        match self {
            BuiltinType::Void => BuiltinFamily::Void,
            BuiltinType::Bool => BuiltinFamily::Bool,
            BuiltinType::SByte | BuiltinType::Short | BuiltinType::Int | BuiltinType::Long => {
                BuiltinFamily::SignedInt
            }
            BuiltinType::Byte | BuiltinType::UShort | BuiltinType::UInt | BuiltinType::ULong => {
                BuiltinFamily::UnsignedInt
            }
            BuiltinType::Float | BuiltinType::Double => BuiltinFamily::Float,
            BuiltinType::Char | BuiltinType::WChar | BuiltinType::UChar => BuiltinFamily::Char,
            BuiltinType::NullPtr => BuiltinFamily::NullPtr,
        }
    }

    /// Width in bits; 0 for `void`.
    pub fn bits(self) -> u32 {
        match self {
            BuiltinType::Void => 0,
            BuiltinType::Bool | BuiltinType::SByte | BuiltinType::Byte | BuiltinType::Char => 8,
            BuiltinType::Short | BuiltinType::UShort | BuiltinType::WChar => 16,
            BuiltinType::Int | BuiltinType::UInt | BuiltinType::Float | BuiltinType::UChar => 32,
            BuiltinType::Long | BuiltinType::ULong | BuiltinType::Double | BuiltinType::NullPtr => {
                64
            }
        }
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self.family(),
            BuiltinFamily::SignedInt | BuiltinFamily::UnsignedInt
        )
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self.family(),
            BuiltinFamily::SignedInt | BuiltinFamily::Float
        )
    }
}

/// Number of doubling steps from `from` bits to `to` bits.
fn widening_steps(from: u32, to: u32) -> u32 {
    (to / from).trailing_zeros()
}

/// Standard conversion from `source` to `target`: `(implicit, distance)`.
///
/// Lossless widenings are implicit with a distance that grows with the
/// width gap; everything else that makes sense numerically is explicit.
pub fn standard_conversion(source: BuiltinType, target: BuiltinType) -> Option<(bool, u32)> {
    use BuiltinFamily::*;

    if source == target {
        return None;
    }
    let (sf, tf) = (source.family(), target.family());
    let (sb, tb) = (source.bits(), target.bits());
    match (sf, tf) {
        (Void, _) | (_, Void) | (NullPtr, _) | (_, NullPtr) => None,
        (SignedInt, SignedInt) | (UnsignedInt, UnsignedInt) | (Char, Char) | (Float, Float) => {
            if tb > sb {
                Some((true, widening_steps(sb, tb)))
            } else {
                Some((false, 10 + widening_steps(tb, sb)))
            }
        }
        (UnsignedInt, SignedInt) => {
            if tb > sb {
                Some((true, widening_steps(sb, tb)))
            } else {
                Some((false, 10 + widening_steps(tb, sb)))
            }
        }
        (SignedInt, UnsignedInt) => Some((false, 10 + widening_steps(sb.min(tb), sb.max(tb)))),
        (SignedInt | UnsignedInt, Float) => {
            if sb <= 32 && (tb == 64 || sb <= 16) {
                Some((true, if tb == 64 { 3 } else { 4 }))
            } else {
                Some((false, 14))
            }
        }
        (Float, SignedInt | UnsignedInt) => Some((false, 15)),
        (Bool, _) | (_, Bool) => Some((false, 16)),
        (Char, SignedInt | UnsignedInt) | (SignedInt | UnsignedInt, Char) => Some((false, 12)),
        (Char, Float) | (Float, Char) => None,
    }
}

/// Install built-in type symbols in the global scope and register their
/// standard conversions.
pub(crate) fn install(table: &mut SymbolTable) {
    let global_scope = table.global_scope();
    for builtin in BuiltinType::ALL {
        let id = table.add_symbol(
            Symbol::new(
                builtin.name(),
                Span::default(),
                SymbolKind::BasicType(BasicTypeData {
                    type_id: builtin.type_id(),
                    builtin,
                }),
            )
            .with_flags(SymbolFlags::BOUND),
        );
        // Built-in names are distinct and the global scope is fresh.
        let _ = table.install(global_scope, id);
        table.types.insert(builtin.type_id(), id);
        table.builtins.insert(builtin, id);
    }

    for source in BuiltinType::ALL {
        for target in BuiltinType::ALL {
            if let Some((implicit, distance)) = standard_conversion(source, target) {
                let function = standard_conversion_function(table, source, target, implicit, distance);
                table.register_conversion_key(
                    source.type_id(),
                    target.type_id(),
                    function,
                );
            }
        }
    }
}

fn standard_conversion_function(
    table: &mut SymbolTable,
    source: BuiltinType,
    target: BuiltinType,
    implicit: bool,
    distance: u32,
) -> SymbolId {
    let source_id = table.builtin(source);
    let target_id = table.builtin(target);
    let scope = table.add_scope(None, Some(table.global_scope()));
    let mut data = FunctionData::new(FunctionKind::Conversion, scope, target_id);
    data.conversion = Some(ConversionInfo {
        rank: ConversionRank::Standard,
        distance,
    });
    let mut flags = SymbolFlags::STANDARD | SymbolFlags::SYNTHESIZED | SymbolFlags::BOUND;
    if !implicit {
        flags |= SymbolFlags::EXPLICIT;
    }
    let function = table.add_symbol(
        Symbol::new(
            format!("{}->{}", source.name(), target.name()),
            Span::default(),
            SymbolKind::Function(data),
        )
        .with_access(Access::Public)
        .with_flags(flags),
    );
    let parameter = table.add_symbol(Symbol::new(
        "value",
        Span::default(),
        SymbolKind::Parameter(VariableData {
            ty: source_id,
            index: 0,
            syntax: None,
        }),
    ));
    table.symbol_mut(parameter).parent = Some(function);
    if let Some(data) = table.symbol_mut(function).as_function_mut() {
        data.parameters.push(parameter);
    }
    function
}
