//! Symbol flags, access levels and scope lookup masks.

use bitflags::bitflags;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

bitflags! {
    /// Per-symbol state and attribute bits.
    ///
    /// `BOUND` and `EVALUATING` gate re-entrancy while a symbol is being
    /// resolved: seeing `EVALUATING` on entry means the definition refers
    /// back to itself.
    ///
    /// The low 16 bits are persisted in module files; the high bits are
    /// session-only state and are cleared on write.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct SymbolFlags: u32 {
        /// Visible to importing units.
        const EXPORTED = 1 << 0;
        /// Static member (no implicit receiver).
        const STATIC = 1 << 1;
        /// Declared in another unit and imported from a module file.
        const EXTERNAL = 1 << 2;
        /// Produced by template instantiation.
        const REPLICA = 1 << 3;
        /// Virtual member function.
        const VIRTUAL = 1 << 4;
        /// Abstract member function, or a class with abstract members.
        const ABSTRACT = 1 << 5;
        /// Overrides a base class virtual.
        const OVERRIDE = 1 << 6;
        /// Const member function.
        const CONST = 1 << 7;
        /// Conversion only usable in explicit (cast) context.
        const EXPLICIT = 1 << 8;
        /// Built-in standard conversion.
        const STANDARD = 1 << 9;
        /// Synthesized by the compiler rather than declared.
        const SYNTHESIZED = 1 << 10;
        /// Generic template definition.
        const TEMPLATE = 1 << 11;

        /// Signature or definition fully resolved.
        const BOUND = 1 << 16;
        /// Resolution in progress.
        const EVALUATING = 1 << 17;
        /// Function body bound.
        const BODY_BOUND = 1 << 18;
    }
}

impl SymbolFlags {
    /// Flags that are written to module files.
    pub const PERSISTENT: SymbolFlags = SymbolFlags::from_bits_truncate(0xffff);
}

bitflags! {
    /// Which scopes a name lookup walks.
    ///
    /// The order is fixed: this scope, then base, then parent.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ScopeLookup: u8 {
        /// The starting scope itself.
        const THIS = 1 << 0;
        /// Inherited lookup through the base class scope chain.
        const BASE = 1 << 1;
        /// Lexically enclosing scopes.
        const PARENT = 1 << 2;

        const THIS_AND_BASE = Self::THIS.bits() | Self::BASE.bits();
        const ALL = Self::THIS.bits() | Self::BASE.bits() | Self::PARENT.bits();
    }
}

/// Access level of a symbol.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    PartialOrd,
    Ord,
    TryFromPrimitive,
    IntoPrimitive,
    Serialize,
    Deserialize,
)]
#[repr(u8)]
pub enum Access {
    #[default]
    Public = 0,
    Protected = 1,
    Internal = 2,
    Private = 3,
}

impl Access {
    pub fn as_str(self) -> &'static str {
        match self {
            Access::Public => "public",
            Access::Protected => "protected",
            Access::Internal => "internal",
            Access::Private => "private",
        }
    }
}
