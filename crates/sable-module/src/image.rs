//! Decoded module contents.
//!
//! A [`ModuleImage`] is the symbol stream of a module file as plain data:
//! no symbol ids, every type reference a [`TypeRef`]. Import decodes the
//! bytes into an image first and links the image second, so a malformed
//! file is rejected before the destination table is touched.

use std::fmt;

use serde::de::{self, SeqAccess, Visitor};
use serde::ser::SerializeTuple;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use sable_core::{Access, Derivation, ModuleVersion, Result, Span, SymbolFlags, TypeId};
use sable_registry::ConversionRank;
use sable_syntax::{ClassDecl, FunctionDecl, FunctionKind, Literal, TypeExpr};

use crate::format::{self, SymbolTag};

/// A type reference: the identity of a non-derived type plus the
/// derivations applied to it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeRef {
    pub root: TypeId,
    pub derivations: Vec<Derivation>,
}

impl TypeRef {
    pub fn new(root: TypeId, derivations: Vec<Derivation>) -> Self {
        Self { root, derivations }
    }

    /// Identity of the referenced type.
    pub fn type_id(&self) -> TypeId {
        TypeId::derived(self.root, &self.derivations)
    }
}

/// One exported symbol.
///
/// Encoded as `[tag][span][name][access][flags][payload]`; the tag picks
/// the payload layout and only persistent flag bits are written.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub name: String,
    pub span: Span,
    pub access: Access,
    pub flags: SymbolFlags,
    pub payload: Payload,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Namespace { children: Vec<Record> },
    Class(ClassRecord),
    Enum {
        type_id: TypeId,
        underlying: TypeRef,
        constants: Vec<Record>,
    },
    EnumConstant { value: i64 },
    Delegate {
        type_id: TypeId,
        return_type: TypeRef,
        parameters: Vec<ParamRecord>,
    },
    Typedef { target: TypeRef },
    GlobalVariable(VariableRecord),
    MemberVariable(VariableRecord),
    Constant { ty: TypeRef, value: Literal },
    Function(FunctionRecord),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassRecord {
    /// Carried by the record tag.
    #[serde(skip)]
    pub interface: bool,
    pub type_id: TypeId,
    pub base_class: Option<TypeRef>,
    pub interfaces: Vec<TypeRef>,
    pub template_parameters: Vec<TemplateParamRecord>,
    /// Kept for generic classes only.
    pub declaration: Option<ClassDecl>,
    pub members: Vec<Record>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateParamRecord {
    pub name: String,
    pub default: Option<TypeExpr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamRecord {
    pub name: String,
    pub ty: TypeRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableRecord {
    pub ty: TypeRef,
    pub index: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionRecord {
    pub kind: FunctionKind,
    /// Empty for generic functions; their parameters come from the declaration.
    pub parameters: Vec<ParamRecord>,
    /// `None` for generic functions.
    pub return_type: Option<TypeRef>,
    pub conversion: Option<(ConversionRank, u32)>,
    pub template_parameters: Vec<TemplateParamRecord>,
    /// Kept for generic functions only.
    pub declaration: Option<FunctionDecl>,
}

/// A class template instance, tagged by the full name of the container
/// that owns its template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub owner: String,
    pub subject: String,
    pub arguments: Vec<TypeRef>,
    /// The bound instance; `None` if it was only named, never bound.
    pub class: Option<Record>,
}

/// A function template replica, tagged by the full name of the container
/// that owns its generic function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplicaRecord {
    pub owner: String,
    pub generic: String,
    /// Declaration span of the generic function, which tells it apart from
    /// the other functions of its overload group.
    pub declared: Span,
    pub arguments: Vec<TypeRef>,
    pub function: Record,
}

/// The contents of a module file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModuleImage {
    pub version: ModuleVersion,
    /// Exported children of the global namespace, in declaration order.
    pub symbols: Vec<Record>,
    /// Class template instances, in creation order.
    pub instances: Vec<InstanceRecord>,
    /// Function template replicas, in creation order.
    pub replicas: Vec<ReplicaRecord>,
}

impl Record {
    pub fn tag(&self) -> SymbolTag {
        match &self.payload {
            Payload::Namespace { .. } => SymbolTag::Namespace,
            Payload::Class(c) if c.interface => SymbolTag::Interface,
            Payload::Class(_) => SymbolTag::Class,
            Payload::Enum { .. } => SymbolTag::Enum,
            Payload::EnumConstant { .. } => SymbolTag::EnumConstant,
            Payload::Delegate { .. } => SymbolTag::Delegate,
            Payload::Typedef { .. } => SymbolTag::Typedef,
            Payload::GlobalVariable(_) => SymbolTag::GlobalVariable,
            Payload::MemberVariable(_) => SymbolTag::MemberVariable,
            Payload::Constant { .. } => SymbolTag::Constant,
            Payload::Function(_) => SymbolTag::Function,
        }
    }

    /// Number of records in this subtree, this one included.
    pub fn count(&self) -> usize {
        1 + match &self.payload {
            Payload::Namespace { children } => children.iter().map(Record::count).sum(),
            Payload::Class(c) => c.members.iter().map(Record::count).sum(),
            Payload::Enum { constants, .. } => constants.len(),
            _ => 0,
        }
    }
}

// =============================================================================
// Encoding
// =============================================================================

impl ModuleImage {
    pub fn encode(&self) -> Result<Vec<u8>> {
        format::encode(self.version, &(&self.symbols, &self.instances, &self.replicas))
    }

    /// Decode a module file written for exactly `expected`.
    pub fn decode(bytes: &[u8], expected: ModuleVersion) -> Result<Self> {
        let (version, (symbols, instances, replicas)) = format::decode(bytes, expected)?;
        Ok(Self {
            version,
            symbols,
            instances,
            replicas,
        })
    }
}

const RECORD_FIELDS: usize = 6;

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut t = serializer.serialize_tuple(RECORD_FIELDS)?;
        t.serialize_element(&self.tag())?;
        t.serialize_element(&self.span)?;
        t.serialize_element(&self.name)?;
        t.serialize_element(&self.access)?;
        t.serialize_element(&(self.flags & SymbolFlags::PERSISTENT))?;
        match &self.payload {
            Payload::Namespace { children } => t.serialize_element(children)?,
            Payload::Class(c) => t.serialize_element(c)?,
            Payload::Enum {
                type_id,
                underlying,
                constants,
            } => t.serialize_element(&(type_id, underlying, constants))?,
            Payload::EnumConstant { value } => t.serialize_element(value)?,
            Payload::Delegate {
                type_id,
                return_type,
                parameters,
            } => t.serialize_element(&(type_id, return_type, parameters))?,
            Payload::Typedef { target } => t.serialize_element(target)?,
            Payload::GlobalVariable(v) | Payload::MemberVariable(v) => t.serialize_element(v)?,
            Payload::Constant { ty, value } => t.serialize_element(&(ty, value))?,
            Payload::Function(f) => t.serialize_element(f)?,
        }
        t.end()
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_tuple(RECORD_FIELDS, RecordVisitor)
    }
}

struct RecordVisitor;

impl<'de> Visitor<'de> for RecordVisitor {
    type Value = Record;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a symbol record")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<Record, A::Error> {
        let tag: SymbolTag = element(&mut seq, 0)?;
        let span = element(&mut seq, 1)?;
        let name = element(&mut seq, 2)?;
        let access = element(&mut seq, 3)?;
        let flags: SymbolFlags = element(&mut seq, 4)?;
        if !SymbolFlags::PERSISTENT.contains(flags) {
            return Err(de::Error::custom("invalid symbol flags"));
        }
        let payload = match tag {
            SymbolTag::Namespace => Payload::Namespace {
                children: element(&mut seq, 5)?,
            },
            SymbolTag::Class | SymbolTag::Interface => {
                let mut class: ClassRecord = element(&mut seq, 5)?;
                class.interface = tag == SymbolTag::Interface;
                Payload::Class(class)
            }
            SymbolTag::Enum => {
                let (type_id, underlying, constants) = element(&mut seq, 5)?;
                Payload::Enum {
                    type_id,
                    underlying,
                    constants,
                }
            }
            SymbolTag::EnumConstant => Payload::EnumConstant {
                value: element(&mut seq, 5)?,
            },
            SymbolTag::Delegate => {
                let (type_id, return_type, parameters) = element(&mut seq, 5)?;
                Payload::Delegate {
                    type_id,
                    return_type,
                    parameters,
                }
            }
            SymbolTag::Typedef => Payload::Typedef {
                target: element(&mut seq, 5)?,
            },
            SymbolTag::GlobalVariable => Payload::GlobalVariable(element(&mut seq, 5)?),
            SymbolTag::MemberVariable => Payload::MemberVariable(element(&mut seq, 5)?),
            SymbolTag::Constant => {
                let (ty, value) = element(&mut seq, 5)?;
                Payload::Constant { ty, value }
            }
            SymbolTag::Function => Payload::Function(element(&mut seq, 5)?),
        };
        Ok(Record {
            name,
            span,
            access,
            flags,
            payload,
        })
    }
}

fn element<'de, A, T>(seq: &mut A, index: usize) -> std::result::Result<T, A::Error>
where
    A: SeqAccess<'de>,
    T: Deserialize<'de>,
{
    seq.next_element()?
        .ok_or_else(|| de::Error::invalid_length(index, &"a symbol record"))
}
