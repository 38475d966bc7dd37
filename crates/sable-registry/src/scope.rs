//! Container scopes.

use rustc_hash::FxHashMap;

use crate::{ScopeId, SymbolId};

/// The name table owned by a namespace, class, enum, function or block.
///
/// The navigation links are set by whoever builds the scope and are never
/// owning: `base` leads to the base class scope for inherited lookup,
/// `parent` to the lexically enclosing scope, and `global` to the root used
/// for dotted names.
#[derive(Debug, Clone)]
pub struct ContainerScope {
    /// The symbol that owns this scope; `None` for block scopes.
    pub owner: Option<SymbolId>,
    pub base: Option<ScopeId>,
    pub parent: Option<ScopeId>,
    pub global: ScopeId,
    names: FxHashMap<String, SymbolId>,
    order: Vec<SymbolId>,
}

impl ContainerScope {
    pub fn new(owner: Option<SymbolId>, parent: Option<ScopeId>, global: ScopeId) -> Self {
        Self {
            owner,
            base: None,
            parent,
            global,
            names: FxHashMap::default(),
            order: Vec::new(),
        }
    }

    /// Symbol named `name` in this scope only.
    #[inline]
    pub fn get(&self, name: &str) -> Option<SymbolId> {
        self.names.get(name).copied()
    }

    /// Symbols in declaration order.
    #[inline]
    pub fn symbols(&self) -> &[SymbolId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Insert `id` under `name`, or return the symbol already there.
    pub(crate) fn insert(&mut self, name: &str, id: SymbolId) -> Result<(), SymbolId> {
        if let Some(existing) = self.names.get(name) {
            return Err(*existing);
        }
        self.names.insert(name.to_string(), id);
        self.order.push(id);
        Ok(())
    }
}
