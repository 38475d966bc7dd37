//! Symbol registry for sable units.
//!
//! The [`SymbolTable`] is an arena of [`Symbol`]s and [`ContainerScope`]s
//! with everything a unit accumulates while binding:
//!
//! - name installation and scope-chain lookup (`table`, `scope`)
//! - per-file `using` resolution (`file_scope`)
//! - the type repository keyed by [`TypeId`](sable_core::TypeId) (`repository`)
//! - built-in types and standard conversions (`builtins`)
//! - conversion tables and base/derived conversions (`conversion_table`)
//! - the class inheritance graph (`hierarchy`)
//! - class and function template caches (`template_cache`)
//! - emitter type shapes (`ir`)

mod builtins;
mod conversion_table;
mod file_scope;
mod hierarchy;
mod ids;
mod ir;
mod repository;
mod scope;
pub mod symbol;
mod table;
mod template_cache;
mod vtable;

pub use builtins::{BuiltinFamily, BuiltinType, standard_conversion};
pub use conversion_table::{
    ClassConversion, ClassConversionTable, ConversionRank, ConversionTable,
};
pub use file_scope::{FileScope, Resolution};
pub use hierarchy::ClassHierarchy;
pub use ids::{ScopeId, SymbolId};
pub use ir::IrType;
pub use repository::TypeRepository;
pub use scope::ContainerScope;
pub use symbol::{Symbol, SymbolKind};
pub use table::SymbolTable;
pub use template_cache::{
    ClassTemplateCache, FunctionTemplateCache, ReplicaEntry, replica_key_hash,
};
