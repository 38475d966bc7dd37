//! Declaration nodes.
//!
//! Provides nodes for everything the declaration visitor installs:
//! - Namespaces
//! - Classes and interfaces, optionally generic
//! - Functions, optionally generic
//! - Typedefs, constants, enums and delegates

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use sable_core::{Access, QualifiedName, Span};

use crate::{Block, Expr, TypeExpr};

/// Group name under which constructors are installed in a class scope.
pub const CONSTRUCTOR_GROUP: &str = "@constructor";

/// Group name under which conversion functions are installed.
pub const CONVERSION_GROUP: &str = "@conversion";

bitflags! {
    /// Declaration specifiers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct Specifiers: u16 {
        const STATIC = 1 << 0;
        const VIRTUAL = 1 << 1;
        const OVERRIDE = 1 << 2;
        const ABSTRACT = 1 << 3;
        const CONST = 1 << 4;
        const EXPLICIT = 1 << 5;
    }
}

/// One parsed source file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SourceFile {
    /// Index of this file in the unit's file list.
    pub file: u32,
    pub usings: Vec<UsingDirective>,
    pub items: Vec<Item>,
}

impl SourceFile {
    pub fn new(file: u32, items: Vec<Item>) -> Self {
        Self {
            file,
            usings: Vec::new(),
            items,
        }
    }

    pub fn with_using(mut self, using: UsingDirective) -> Self {
        self.usings.push(using);
        self
    }
}

/// A `using` directive at the top of a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UsingDirective {
    /// `using System.Collections;`
    Namespace { path: QualifiedName, span: Span },
    /// `using List = System.Collections.List;`
    Alias {
        alias: String,
        target: QualifiedName,
        span: Span,
    },
}

impl UsingDirective {
    pub fn namespace(path: &str) -> Self {
        UsingDirective::Namespace {
            path: QualifiedName::parse(path),
            span: Span::default(),
        }
    }

    pub fn alias(alias: &str, target: &str) -> Self {
        UsingDirective::Alias {
            alias: alias.to_string(),
            target: QualifiedName::parse(target),
            span: Span::default(),
        }
    }

    pub fn span(&self) -> Span {
        match self {
            UsingDirective::Namespace { span, .. } | UsingDirective::Alias { span, .. } => *span,
        }
    }
}

/// A declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Item {
    Namespace(NamespaceDecl),
    Class(ClassDecl),
    Function(FunctionDecl),
    Variable(VariableDecl),
    Typedef(TypedefDecl),
    Constant(ConstantDecl),
    Enum(EnumDecl),
    Delegate(DelegateDecl),
}

impl Item {
    /// Get the span of this item.
    pub fn span(&self) -> Span {
        match self {
            Self::Namespace(d) => d.span,
            Self::Class(d) => d.span,
            Self::Function(d) => d.span,
            Self::Variable(d) => d.span,
            Self::Typedef(d) => d.span,
            Self::Constant(d) => d.span,
            Self::Enum(d) => d.span,
            Self::Delegate(d) => d.span,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamespaceDecl {
    pub name: String,
    pub items: Vec<Item>,
    pub span: Span,
}

impl NamespaceDecl {
    pub fn new(name: &str, items: Vec<Item>) -> Self {
        Self {
            name: name.to_string(),
            items,
            span: Span::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClassKind {
    Class,
    Interface,
}

/// A template parameter, optionally with a default type argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeParam {
    pub name: String,
    pub default: Option<TypeExpr>,
    pub span: Span,
}

impl TypeParam {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            default: None,
            span: Span::default(),
        }
    }

    pub fn with_default(name: &str, default: TypeExpr) -> Self {
        Self {
            name: name.to_string(),
            default: Some(default),
            span: Span::default(),
        }
    }
}

/// A class or interface declaration.
///
/// Examples:
/// - `class Foo : Base, IDrawable { ... }`
/// - `class Stack<T> { ... }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDecl {
    pub kind: ClassKind,
    pub name: String,
    pub access: Access,
    pub type_params: Vec<TypeParam>,
    /// Base class first (if any), then interfaces.
    pub bases: Vec<TypeExpr>,
    pub members: Vec<Item>,
    pub span: Span,
}

impl ClassDecl {
    pub fn new(name: &str) -> Self {
        Self {
            kind: ClassKind::Class,
            name: name.to_string(),
            access: Access::Public,
            type_params: Vec::new(),
            bases: Vec::new(),
            members: Vec::new(),
            span: Span::default(),
        }
    }

    pub fn interface(name: &str) -> Self {
        Self {
            kind: ClassKind::Interface,
            ..Self::new(name)
        }
    }

    pub fn type_param(mut self, param: TypeParam) -> Self {
        self.type_params.push(param);
        self
    }

    pub fn base(mut self, base: TypeExpr) -> Self {
        self.bases.push(base);
        self
    }

    pub fn member(mut self, member: Item) -> Self {
        self.members.push(member);
        self
    }

    pub fn access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }

    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn is_template(&self) -> bool {
        !self.type_params.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FunctionKind {
    #[default]
    Normal,
    Constructor,
    /// `operator T()`: converts the receiver to the return type.
    Conversion,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub ty: TypeExpr,
    pub span: Span,
}

impl Param {
    pub fn new(name: &str, ty: TypeExpr) -> Self {
        Self {
            name: name.to_string(),
            ty,
            span: Span::default(),
        }
    }
}

/// A function declaration.
///
/// Examples:
/// - `int add(int a, int b) { ... }`
/// - `virtual void draw() const;`
/// - `T max<T>(T a, T b) { ... }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub kind: FunctionKind,
    pub name: String,
    pub access: Access,
    pub specifiers: Specifiers,
    pub type_params: Vec<TypeParam>,
    pub params: Vec<Param>,
    pub return_type: TypeExpr,
    pub body: Option<Block>,
    pub span: Span,
}

impl FunctionDecl {
    pub fn new(name: &str, return_type: TypeExpr) -> Self {
        Self {
            kind: FunctionKind::Normal,
            name: name.to_string(),
            access: Access::Public,
            specifiers: Specifiers::empty(),
            type_params: Vec::new(),
            params: Vec::new(),
            return_type,
            body: None,
            span: Span::default(),
        }
    }

    /// A constructor. The return type is filled in by the binder.
    pub fn constructor() -> Self {
        Self {
            kind: FunctionKind::Constructor,
            ..Self::new(CONSTRUCTOR_GROUP, TypeExpr::named("void"))
        }
    }

    /// `operator target()`.
    pub fn conversion(target: TypeExpr) -> Self {
        Self {
            kind: FunctionKind::Conversion,
            ..Self::new(CONVERSION_GROUP, target)
        }
    }

    pub fn param(mut self, name: &str, ty: TypeExpr) -> Self {
        self.params.push(Param::new(name, ty));
        self
    }

    pub fn type_param(mut self, param: TypeParam) -> Self {
        self.type_params.push(param);
        self
    }

    pub fn specifiers(mut self, specifiers: Specifiers) -> Self {
        self.specifiers |= specifiers;
        self
    }

    pub fn access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }

    pub fn body(mut self, body: Block) -> Self {
        self.body = Some(body);
        self
    }

    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn is_template(&self) -> bool {
        !self.type_params.is_empty()
    }
}

/// A member variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDecl {
    pub name: String,
    pub ty: TypeExpr,
    pub access: Access,
    pub specifiers: Specifiers,
    pub span: Span,
}

impl VariableDecl {
    pub fn new(name: &str, ty: TypeExpr) -> Self {
        Self {
            name: name.to_string(),
            ty,
            access: Access::Public,
            specifiers: Specifiers::empty(),
            span: Span::default(),
        }
    }

    pub fn access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }

    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

/// `typedef T Name;`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedefDecl {
    pub name: String,
    pub ty: TypeExpr,
    pub access: Access,
    pub span: Span,
}

impl TypedefDecl {
    pub fn new(name: &str, ty: TypeExpr) -> Self {
        Self {
            name: name.to_string(),
            ty,
            access: Access::Public,
            span: Span::default(),
        }
    }

    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

/// `const T Name = value;`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstantDecl {
    pub name: String,
    pub ty: TypeExpr,
    pub value: Expr,
    pub access: Access,
    pub span: Span,
}

impl ConstantDecl {
    pub fn new(name: &str, ty: TypeExpr, value: Expr) -> Self {
        Self {
            name: name.to_string(),
            ty,
            value,
            access: Access::Public,
            span: Span::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumConstantDecl {
    pub name: String,
    pub value: Option<Expr>,
    pub span: Span,
}

/// `enum Color : byte { Red, Green = 4 }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumDecl {
    pub name: String,
    pub access: Access,
    pub underlying: Option<TypeExpr>,
    pub constants: Vec<EnumConstantDecl>,
    pub span: Span,
}

impl EnumDecl {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            access: Access::Public,
            underlying: None,
            constants: Vec::new(),
            span: Span::default(),
        }
    }

    pub fn underlying(mut self, ty: TypeExpr) -> Self {
        self.underlying = Some(ty);
        self
    }

    pub fn constant(mut self, name: &str, value: Option<Expr>) -> Self {
        self.constants.push(EnumConstantDecl {
            name: name.to_string(),
            value,
            span: Span::default(),
        });
        self
    }
}

/// `delegate R Name(params);`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelegateDecl {
    pub name: String,
    pub access: Access,
    pub params: Vec<Param>,
    pub return_type: TypeExpr,
    pub span: Span,
}

impl DelegateDecl {
    pub fn new(name: &str, return_type: TypeExpr) -> Self {
        Self {
            name: name.to_string(),
            access: Access::Public,
            params: Vec::new(),
            return_type,
            span: Span::default(),
        }
    }

    pub fn param(mut self, name: &str, ty: TypeExpr) -> Self {
        self.params.push(Param::new(name, ty));
        self
    }
}
