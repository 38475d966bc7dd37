//! Core types shared by every sable crate.
//!
//! - [`Span`]: source locations carried by symbols and errors
//! - [`TypeId`] and [`Derivation`]: cross-unit type identity
//! - [`QualifiedName`]: dotted names as written in source
//! - [`SymbolFlags`], [`Access`], [`ScopeLookup`]: symbol attributes
//! - [`SemanticError`] and [`Diagnostics`]: the error surface
//! - [`UnitSettings`]: per-unit configuration

pub mod derivation;
mod error;
mod flags;
mod qualified_name;
mod settings;
mod span;
mod type_id;

pub use derivation::Derivation;
pub use error::{Diagnostics, Result, SemanticError};
pub use flags::{Access, ScopeLookup, SymbolFlags};
pub use qualified_name::QualifiedName;
pub use settings::{ModuleVersion, UnitSettings};
pub use span::Span;
pub use type_id::{TYPE_ID_LEN, TypeId};
