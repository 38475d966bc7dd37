//! Arena indices.

use std::fmt;

/// Index of a symbol in a [`SymbolTable`](crate::SymbolTable).
///
/// Child-to-parent links are stored as `SymbolId`s, so a parent is always a
/// lookup and never an ownership edge.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub(crate) u32);

impl SymbolId {
    /// Placeholder for a type reference that has not been linked yet.
    pub const UNRESOLVED: SymbolId = SymbolId(u32::MAX);

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub fn is_unresolved(self) -> bool {
        self == Self::UNRESOLVED
    }
}

impl fmt::Debug for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unresolved() {
            write!(f, "SymbolId(unresolved)")
        } else {
            write!(f, "SymbolId({})", self.0)
        }
    }
}

/// Index of a container scope in a [`SymbolTable`](crate::SymbolTable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub(crate) u32);

impl ScopeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}
