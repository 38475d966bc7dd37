//! Type shapes handed to the emitter.
//!
//! Constructing a type never produces an [`IrType`]; the emitter asks for
//! one explicitly through [`SymbolTable::make_ir_type`], and the result is
//! cached by identity.

use std::fmt;

use sable_core::{Derivation, Result, SemanticError, TypeId};

use crate::symbol::SymbolKind;
use crate::{BuiltinType, SymbolId, SymbolTable};

/// Layout-level description of a type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IrType {
    Void,
    Bool,
    Int { bits: u32, signed: bool },
    Float { bits: u32 },
    Char { bits: u32 },
    Pointer(Box<IrType>),
    Array(Box<IrType>),
    /// Fields in layout order, inherited fields first.
    Struct { name: String, fields: Vec<IrType> },
    /// A class referenced through a pointer; layout not needed.
    Opaque(String),
    Function { parameters: Vec<IrType>, result: Box<IrType> },
}

impl fmt::Display for IrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrType::Void => write!(f, "void"),
            IrType::Bool => write!(f, "i1"),
            IrType::Int { bits, .. } => write!(f, "i{bits}"),
            IrType::Float { bits } => write!(f, "f{bits}"),
            IrType::Char { bits } => write!(f, "c{bits}"),
            IrType::Pointer(inner) => write!(f, "{inner}*"),
            IrType::Array(inner) => write!(f, "[{inner}]"),
            IrType::Struct { name, .. } | IrType::Opaque(name) => write!(f, "%{name}"),
            IrType::Function { parameters, result } => {
                write!(f, "{result} (")?;
                for (i, p) in parameters.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, ")")
            }
        }
    }
}

impl SymbolTable {
    /// Emitter shape of `ty`, cached by identity.
    pub fn make_ir_type(&mut self, ty: SymbolId) -> Result<IrType> {
        let type_id: TypeId = self.type_id_of(ty)?;
        if let Some(cached) = self.ir_types.get(&type_id) {
            return Ok(cached.clone());
        }
        let shape = self.compute_ir_type(ty, false)?;
        self.ir_types.insert(type_id, shape.clone());
        Ok(shape)
    }

    fn compute_ir_type(&self, ty: SymbolId, behind_pointer: bool) -> Result<IrType> {
        let symbol = self.symbol(ty);
        Ok(match &symbol.kind {
            SymbolKind::BasicType(b) => builtin_shape(b.builtin),
            SymbolKind::DerivedType(d) => {
                let indirect = d.derivations.iter().any(|x| {
                    matches!(
                        x,
                        Derivation::Pointer | Derivation::LvalueRef | Derivation::RvalueRef
                    )
                });
                let mut current = self.compute_ir_type(d.base, behind_pointer || indirect)?;
                for derivation in &d.derivations {
                    current = match derivation {
                        Derivation::Const => current,
                        Derivation::Pointer | Derivation::LvalueRef | Derivation::RvalueRef => {
                            IrType::Pointer(Box::new(current))
                        }
                        Derivation::Array => IrType::Array(Box::new(current)),
                    };
                }
                current
            }
            SymbolKind::Class(_) | SymbolKind::Interface(_) if behind_pointer => {
                IrType::Opaque(self.full_name(ty))
            }
            SymbolKind::Class(_) | SymbolKind::Interface(_) => IrType::Struct {
                name: self.full_name(ty),
                fields: self.struct_fields(ty)?,
            },
            SymbolKind::Enum(e) => self.compute_ir_type(e.underlying, behind_pointer)?,
            SymbolKind::Delegate(d) => IrType::Pointer(Box::new(IrType::Function {
                parameters: d
                    .parameters
                    .iter()
                    .map(|p| self.compute_ir_type(*p, true))
                    .collect::<Result<Vec<_>>>()?,
                result: Box::new(self.compute_ir_type(d.return_type, true)?),
            })),
            _ => {
                return Err(SemanticError::NotAType {
                    name: self.full_name(ty),
                    span: symbol.span,
                });
            }
        })
    }

    fn struct_fields(&self, class: SymbolId) -> Result<Vec<IrType>> {
        let Some(data) = self.symbol(class).as_class() else {
            return Ok(Vec::new());
        };
        let mut fields = match data.base_class {
            Some(base) => self.struct_fields(base)?,
            None => Vec::new(),
        };
        if !data.vtable.is_empty() && data.base_class.is_none() {
            fields.push(IrType::Pointer(Box::new(IrType::Opaque(String::from("vtable")))));
        }
        for member in &data.member_variables {
            if let Some(ty) = self.symbol(*member).value_type() {
                fields.push(self.compute_ir_type(ty, false)?);
            }
        }
        Ok(fields)
    }
}

fn builtin_shape(builtin: BuiltinType) -> IrType {
    match builtin {
        BuiltinType::Void => IrType::Void,
        BuiltinType::Bool => IrType::Bool,
        BuiltinType::Float | BuiltinType::Double => IrType::Float {
            bits: builtin.bits(),
        },
        BuiltinType::Char | BuiltinType::WChar | BuiltinType::UChar => IrType::Char {
            bits: builtin.bits(),
        },
        BuiltinType::NullPtr => IrType::Pointer(Box::new(IrType::Void)),
        other => IrType::Int {
            bits: other.bits(),
            signed: other.is_signed(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sable_core::Span;

    #[test]
    fn builtin_shapes() {
        let mut table = SymbolTable::new();
        let uint = table.builtin(BuiltinType::UInt);
        assert_eq!(
            table.make_ir_type(uint).unwrap(),
            IrType::Int {
                bits: 32,
                signed: false
            }
        );
        let double = table.builtin(BuiltinType::Double);
        assert_eq!(table.make_ir_type(double).unwrap().to_string(), "f64");
    }

    #[test]
    fn derived_shapes() {
        let mut table = SymbolTable::new();
        let int = table.builtin(BuiltinType::Int);
        let cptr = table
            .make_derived_type(int, &[Derivation::Const, Derivation::Pointer], Span::default())
            .unwrap();
        assert_eq!(table.make_ir_type(cptr).unwrap().to_string(), "i32*");
    }

    #[test]
    fn non_types_are_rejected() {
        let mut table = SymbolTable::new();
        let global = table.global();
        assert!(table.make_ir_type(global).is_err());
    }
}
