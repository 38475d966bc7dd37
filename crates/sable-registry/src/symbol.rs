//! Symbols.
//!
//! A [`Symbol`] is the common header (name, span, access, flags, parent)
//! plus a closed [`SymbolKind`] carrying the kind-specific data. Type
//! references between symbols are [`SymbolId`]s of type symbols; every type
//! symbol carries its [`TypeId`].

use sable_core::{Access, Derivation, Span, SymbolFlags, TypeId};
use sable_syntax::{ClassDecl, DelegateDecl, Expr, FunctionDecl, FunctionKind, Literal, TypeExpr};

use crate::{BuiltinType, ConversionRank, ScopeId, SymbolId};

/// A named entity.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub span: Span,
    pub access: Access,
    pub flags: SymbolFlags,
    /// The container that owns this symbol. Not owning.
    pub parent: Option<SymbolId>,
    pub kind: SymbolKind,
}

impl Symbol {
    pub fn new(name: impl Into<String>, span: Span, kind: SymbolKind) -> Self {
        Self {
            name: name.into(),
            span,
            access: Access::Public,
            flags: SymbolFlags::empty(),
            parent: None,
            kind,
        }
    }

    pub fn with_access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }

    pub fn with_flags(mut self, flags: SymbolFlags) -> Self {
        self.flags |= flags;
        self
    }

    #[inline]
    pub fn has(&self, flags: SymbolFlags) -> bool {
        self.flags.contains(flags)
    }

    /// Identity of the type this symbol denotes, if it is a type symbol.
    pub fn type_id(&self) -> Option<TypeId> {
        match &self.kind {
            SymbolKind::Class(c) | SymbolKind::Interface(c) => Some(c.type_id),
            SymbolKind::BasicType(b) => Some(b.type_id),
            SymbolKind::DerivedType(d) => Some(d.type_id),
            SymbolKind::TemplateParameter(p) => Some(p.type_id),
            SymbolKind::Enum(e) => Some(e.type_id),
            SymbolKind::Delegate(d) => Some(d.type_id),
            _ => None,
        }
    }

    /// The scope this symbol owns, if it is a container.
    pub fn scope(&self) -> Option<ScopeId> {
        match &self.kind {
            SymbolKind::Namespace(n) => Some(n.scope),
            SymbolKind::Class(c) | SymbolKind::Interface(c) => Some(c.scope),
            SymbolKind::Enum(e) => Some(e.scope),
            SymbolKind::Function(f) => Some(f.scope),
            _ => None,
        }
    }

    /// Whether this symbol denotes a type (typedefs excluded until resolved).
    pub fn is_type(&self) -> bool {
        self.type_id().is_some()
    }

    /// Whether a dotted name may continue through this symbol.
    pub fn is_scope_bearing(&self) -> bool {
        matches!(
            self.kind,
            SymbolKind::Namespace(_)
                | SymbolKind::Class(_)
                | SymbolKind::Interface(_)
                | SymbolKind::Enum(_)
        )
    }

    pub fn kind_name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn as_class(&self) -> Option<&ClassData> {
        match &self.kind {
            SymbolKind::Class(c) | SymbolKind::Interface(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_class_mut(&mut self) -> Option<&mut ClassData> {
        match &mut self.kind {
            SymbolKind::Class(c) | SymbolKind::Interface(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionData> {
        match &self.kind {
            SymbolKind::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_function_mut(&mut self) -> Option<&mut FunctionData> {
        match &mut self.kind {
            SymbolKind::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_group(&self) -> Option<&FunctionGroupData> {
        match &self.kind {
            SymbolKind::FunctionGroup(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_derived(&self) -> Option<&DerivedTypeData> {
        match &self.kind {
            SymbolKind::DerivedType(d) => Some(d),
            _ => None,
        }
    }

    /// Declared type of a value symbol.
    pub fn value_type(&self) -> Option<SymbolId> {
        match &self.kind {
            SymbolKind::Parameter(v)
            | SymbolKind::Local(v)
            | SymbolKind::MemberVariable(v)
            | SymbolKind::GlobalVariable(v) => Some(v.ty),
            SymbolKind::Constant(c) => Some(c.ty),
            SymbolKind::EnumConstant(e) => Some(e.enum_type),
            _ => None,
        }
    }
}

/// Kind-specific symbol data.
#[derive(Debug, Clone)]
pub enum SymbolKind {
    Namespace(NamespaceData),
    Class(ClassData),
    Interface(ClassData),
    BasicType(BasicTypeData),
    DerivedType(DerivedTypeData),
    TemplateParameter(TemplateParameterData),
    Enum(EnumData),
    EnumConstant(EnumConstantData),
    Delegate(DelegateData),
    Typedef(TypedefData),
    Parameter(VariableData),
    Local(VariableData),
    MemberVariable(VariableData),
    GlobalVariable(VariableData),
    Constant(ConstantData),
    FunctionGroup(FunctionGroupData),
    Function(FunctionData),
}

impl SymbolKind {
    pub fn name(&self) -> &'static str {
        match self {
            SymbolKind::Namespace(_) => "namespace",
            SymbolKind::Class(_) => "class",
            SymbolKind::Interface(_) => "interface",
            SymbolKind::BasicType(_) => "basic type",
            SymbolKind::DerivedType(_) => "derived type",
            SymbolKind::TemplateParameter(_) => "template parameter",
            SymbolKind::Enum(_) => "enum",
            SymbolKind::EnumConstant(_) => "enum constant",
            SymbolKind::Delegate(_) => "delegate",
            SymbolKind::Typedef(_) => "typedef",
            SymbolKind::Parameter(_) => "parameter",
            SymbolKind::Local(_) => "local variable",
            SymbolKind::MemberVariable(_) => "member variable",
            SymbolKind::GlobalVariable(_) => "global variable",
            SymbolKind::Constant(_) => "constant",
            SymbolKind::FunctionGroup(_) => "function group",
            SymbolKind::Function(_) => "function",
        }
    }
}

#[derive(Debug, Clone)]
pub struct NamespaceData {
    pub scope: ScopeId,
}

/// Lifecycle of a class template instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstanceState {
    /// Symbol allocated, members not yet bound.
    Created,
    /// Binding bases and members; re-entry is a cycle.
    Instantiating,
    /// Laid out like an ordinary class.
    Bound,
}

/// Subject and arguments of a class template instance.
#[derive(Debug, Clone)]
pub struct TemplateInstance {
    pub subject: SymbolId,
    pub arguments: Vec<SymbolId>,
    pub state: InstanceState,
}

#[derive(Debug, Clone)]
pub struct ClassData {
    pub type_id: TypeId,
    pub scope: ScopeId,
    pub base_class: Option<SymbolId>,
    pub interfaces: Vec<SymbolId>,
    /// Own member variables in layout order.
    pub member_variables: Vec<SymbolId>,
    /// Virtual functions by slot, inherited slots first.
    pub vtable: Vec<SymbolId>,
    /// All virtual member bodies reachable from the vtable are bound.
    pub vtable_complete: bool,
    /// Parameters of a generic class.
    pub template_parameters: Vec<SymbolId>,
    /// Source declaration; cloned for each instance of a generic class.
    pub declaration: Option<Box<ClassDecl>>,
    pub instance: Option<TemplateInstance>,
}

impl ClassData {
    pub fn new(type_id: TypeId, scope: ScopeId) -> Self {
        Self {
            type_id,
            scope,
            base_class: None,
            interfaces: Vec::new(),
            member_variables: Vec::new(),
            vtable: Vec::new(),
            vtable_complete: false,
            template_parameters: Vec::new(),
            declaration: None,
            instance: None,
        }
    }

    pub fn is_generic(&self) -> bool {
        !self.template_parameters.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct BasicTypeData {
    pub type_id: TypeId,
    pub builtin: BuiltinType,
}

#[derive(Debug, Clone)]
pub struct DerivedTypeData {
    pub type_id: TypeId,
    /// Never itself a derived type.
    pub base: SymbolId,
    pub derivations: Vec<Derivation>,
}

#[derive(Debug, Clone)]
pub struct TemplateParameterData {
    pub type_id: TypeId,
    pub index: usize,
    pub default: Option<TypeExpr>,
    /// The argument this parameter stands for inside an instance.
    pub bound: Option<SymbolId>,
}

#[derive(Debug, Clone)]
pub struct EnumData {
    pub type_id: TypeId,
    pub scope: ScopeId,
    pub underlying: SymbolId,
    pub underlying_syntax: Option<TypeExpr>,
}

#[derive(Debug, Clone)]
pub struct EnumConstantData {
    pub enum_type: SymbolId,
    pub value: Option<i64>,
    pub syntax: Option<Expr>,
}

#[derive(Debug, Clone)]
pub struct DelegateData {
    pub type_id: TypeId,
    pub parameters: Vec<SymbolId>,
    pub return_type: SymbolId,
    pub declaration: Option<Box<DelegateDecl>>,
}

#[derive(Debug, Clone)]
pub struct TypedefData {
    pub target: Option<SymbolId>,
    pub syntax: Option<TypeExpr>,
}

#[derive(Debug, Clone)]
pub struct VariableData {
    pub ty: SymbolId,
    /// Parameter position, or layout index for member variables.
    pub index: usize,
    pub syntax: Option<TypeExpr>,
}

#[derive(Debug, Clone)]
pub struct ConstantData {
    pub ty: SymbolId,
    pub value: Option<Literal>,
    pub syntax: Option<(TypeExpr, Expr)>,
}

/// All overloads of one name in one scope, in declaration order.
///
/// Function template replicas are never listed here.
#[derive(Debug, Clone, Default)]
pub struct FunctionGroupData {
    pub functions: Vec<SymbolId>,
}

/// Rank and distance of a conversion function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConversionInfo {
    pub rank: ConversionRank,
    pub distance: u32,
}

/// Generic function and arguments of a function template replica.
#[derive(Debug, Clone)]
pub struct FunctionInstance {
    pub generic: SymbolId,
    pub arguments: Vec<SymbolId>,
}

#[derive(Debug, Clone)]
pub struct FunctionData {
    pub kind: FunctionKind,
    pub scope: ScopeId,
    /// Parameter symbols, excluding the implicit receiver.
    pub parameters: Vec<SymbolId>,
    pub return_type: SymbolId,
    pub template_parameters: Vec<SymbolId>,
    /// Source declaration: kept for generic cloning and deferred body binding.
    pub declaration: Option<Box<FunctionDecl>>,
    pub instance: Option<FunctionInstance>,
    /// Set for functions registered in a conversion table.
    pub conversion: Option<ConversionInfo>,
    pub vtable_slot: Option<usize>,
}

impl FunctionData {
    pub fn new(kind: FunctionKind, scope: ScopeId, return_type: SymbolId) -> Self {
        Self {
            kind,
            scope,
            parameters: Vec::new(),
            return_type,
            template_parameters: Vec::new(),
            declaration: None,
            instance: None,
            conversion: None,
            vtable_slot: None,
        }
    }

    pub fn is_generic(&self) -> bool {
        !self.template_parameters.is_empty()
    }

    pub fn arity(&self) -> usize {
        self.parameters.len()
    }
}
