//! The symbol table: one arena of symbols and scopes per unit.
//!
//! Everything a unit knows lives here: the global namespace and its
//! children, the type repository, the conversion tables, the class
//! hierarchy and the template instance caches. The table is `Clone` so the
//! module linker can stage an import on a copy and commit it only on
//! success.

use rustc_hash::FxHashMap;

use sable_core::{Access, QualifiedName, Result, ScopeLookup, SemanticError, Span, SymbolFlags, TypeId};
use sable_syntax::FunctionKind;

use crate::builtins;
use crate::conversion_table::{ClassConversionTable, ConversionTable};
use crate::hierarchy::ClassHierarchy;
use crate::ir::IrType;
use crate::repository::TypeRepository;
use crate::symbol::{FunctionGroupData, NamespaceData, Symbol, SymbolKind};
use crate::template_cache::{ClassTemplateCache, FunctionTemplateCache};
use crate::{BuiltinType, ContainerScope, ScopeId, SymbolId};

/// All symbols and scopes of one unit.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    scopes: Vec<ContainerScope>,
    global: SymbolId,
    global_scope: ScopeId,
    pub(crate) types: TypeRepository,
    pub(crate) conversions: ConversionTable,
    pub(crate) class_conversions: ClassConversionTable,
    pub(crate) hierarchy: ClassHierarchy,
    pub(crate) class_templates: ClassTemplateCache,
    pub(crate) function_templates: FunctionTemplateCache,
    pub(crate) builtins: FxHashMap<BuiltinType, SymbolId>,
    pub(crate) ir_types: FxHashMap<TypeId, IrType>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    /// A table holding the global namespace and the built-in types.
    pub fn new() -> Self {
        let global_scope = ScopeId(0);
        let global = SymbolId(0);
        let mut table = Self {
            symbols: vec![Symbol::new(
                "",
                Span::default(),
                SymbolKind::Namespace(NamespaceData {
                    scope: global_scope,
                }),
            )],
            scopes: vec![ContainerScope::new(Some(global), None, global_scope)],
            global,
            global_scope,
            types: TypeRepository::default(),
            conversions: ConversionTable::default(),
            class_conversions: ClassConversionTable::default(),
            hierarchy: ClassHierarchy::default(),
            class_templates: ClassTemplateCache::default(),
            function_templates: FunctionTemplateCache::default(),
            builtins: FxHashMap::default(),
            ir_types: FxHashMap::default(),
        };
        builtins::install(&mut table);
        table
    }

    // =========================================================================
    // Arena access
    // =========================================================================

    #[inline]
    pub fn global(&self) -> SymbolId {
        self.global
    }

    #[inline]
    pub fn global_scope(&self) -> ScopeId {
        self.global_scope
    }

    /// Symbol by id. Ids are only produced by this table.
    #[inline]
    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.index()]
    }

    #[inline]
    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.index()]
    }

    /// Symbol by id, `None` for placeholders and foreign ids.
    #[inline]
    pub fn get(&self, id: SymbolId) -> Option<&Symbol> {
        self.symbols.get(id.index())
    }

    #[inline]
    pub fn scope(&self, id: ScopeId) -> &ContainerScope {
        &self.scopes[id.index()]
    }

    #[inline]
    pub fn scope_mut(&mut self, id: ScopeId) -> &mut ContainerScope {
        &mut self.scopes[id.index()]
    }

    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    /// Allocate a symbol without installing it in any scope.
    pub fn add_symbol(&mut self, symbol: Symbol) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(symbol);
        id
    }

    /// Allocate a scope.
    pub fn add_scope(&mut self, owner: Option<SymbolId>, parent: Option<ScopeId>) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes
            .push(ContainerScope::new(owner, parent, self.global_scope));
        id
    }

    /// Symbol that owns `scope`, if any.
    pub fn scope_owner(&self, scope: ScopeId) -> Option<SymbolId> {
        self.scope(scope).owner
    }

    // =========================================================================
    // Installation
    // =========================================================================

    /// Insert `id` into `scope` under its own name.
    ///
    /// The symbol's parent becomes the scope's owner. Fails with
    /// `DuplicateDefinition` if the name already exists in that exact scope.
    pub fn install(&mut self, scope: ScopeId, id: SymbolId) -> Result<()> {
        let name = self.symbol(id).name.clone();
        if let Err(existing) = self.scopes[scope.index()].insert(&name, id) {
            return Err(SemanticError::DuplicateDefinition {
                name,
                span: self.symbol(id).span,
                previous: self.symbol(existing).span,
            });
        }
        let owner = self.scope(scope).owner;
        self.symbol_mut(id).parent = owner;
        Ok(())
    }

    /// Add `function` to the overload group of its name in `scope`,
    /// creating the group on first use. Returns the group.
    pub fn install_function(&mut self, scope: ScopeId, function: SymbolId) -> Result<SymbolId> {
        let (name, span) = {
            let symbol = self.symbol(function);
            (symbol.name.clone(), symbol.span)
        };
        let group = match self.scope(scope).get(&name) {
            Some(existing) => {
                if self.symbol(existing).as_group().is_none() {
                    return Err(SemanticError::DuplicateDefinition {
                        name,
                        span,
                        previous: self.symbol(existing).span,
                    });
                }
                existing
            }
            None => {
                let group = self.add_symbol(Symbol::new(
                    name,
                    span,
                    SymbolKind::FunctionGroup(FunctionGroupData::default()),
                ));
                self.install(scope, group)?;
                group
            }
        };
        if let SymbolKind::FunctionGroup(data) = &mut self.symbol_mut(group).kind {
            data.functions.push(function);
        }
        let owner = self.scope(scope).owner;
        self.symbol_mut(function).parent = owner;
        Ok(group)
    }

    /// The namespace `name` in `scope`, created if missing.
    ///
    /// Namespaces are open: declaring one twice merges into the first.
    pub fn get_or_create_namespace(
        &mut self,
        scope: ScopeId,
        name: &str,
        span: Span,
    ) -> Result<SymbolId> {
        if let Some(existing) = self.scope(scope).get(name) {
            return match self.symbol(existing).kind {
                SymbolKind::Namespace(_) => Ok(existing),
                _ => Err(SemanticError::DuplicateDefinition {
                    name: name.to_string(),
                    span,
                    previous: self.symbol(existing).span,
                }),
            };
        }
        let id = self.add_symbol(Symbol::new(
            name,
            span,
            SymbolKind::Namespace(NamespaceData { scope: ScopeId(0) }),
        ));
        let ns_scope = self.add_scope(Some(id), Some(scope));
        if let SymbolKind::Namespace(data) = &mut self.symbol_mut(id).kind {
            data.scope = ns_scope;
        }
        self.symbol_mut(id).access = Access::Public;
        self.install(scope, id)?;
        Ok(id)
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Find `name` starting at `scope`.
    ///
    /// Walks the scope itself, then its base chain, then its parent chain,
    /// each step enabled by `mask`. Absence is `None`, never an error.
    pub fn lookup(&self, scope: ScopeId, name: &str, mask: ScopeLookup) -> Option<SymbolId> {
        let container = self.scope(scope);
        if mask.contains(ScopeLookup::THIS) {
            if let Some(found) = container.get(name) {
                return Some(found);
            }
        }
        if mask.contains(ScopeLookup::BASE) {
            let mut base = container.base;
            while let Some(b) = base {
                let base_scope = self.scope(b);
                if let Some(found) = base_scope.get(name) {
                    return Some(found);
                }
                base = base_scope.base;
            }
        }
        if mask.contains(ScopeLookup::PARENT) {
            if let Some(parent) = container.parent {
                return self.lookup(parent, name, mask | ScopeLookup::THIS);
            }
        }
        None
    }

    /// Resolve a dotted name one component at a time from the global scope.
    ///
    /// Fails fast with `None` if a component is missing or an intermediate
    /// component does not own a scope.
    pub fn lookup_qualified(&self, name: &QualifiedName) -> Option<SymbolId> {
        self.lookup_qualified_from(self.global, name.components())
    }

    /// Resolve `components` relative to the container `start`.
    pub fn lookup_qualified_from(&self, start: SymbolId, components: &[String]) -> Option<SymbolId> {
        let mut current = start;
        for component in components {
            let scope = self.symbol(current).scope()?;
            if !self.symbol(current).is_scope_bearing() {
                return None;
            }
            current = self.lookup(scope, component, ScopeLookup::THIS_AND_BASE)?;
        }
        Some(current)
    }

    /// Resolve a name as written: dotted names from global, simple names
    /// through `mask` starting at `scope`.
    pub fn resolve(&self, scope: ScopeId, name: &QualifiedName, mask: ScopeLookup) -> Option<SymbolId> {
        if name.is_qualified() {
            self.lookup_qualified(name)
        } else {
            self.lookup(scope, name.last(), mask)
        }
    }

    /// Functions of an overload group, in declaration order.
    pub fn group_functions(&self, group: SymbolId) -> &[SymbolId] {
        match self.symbol(group).as_group() {
            Some(data) => &data.functions,
            None => &[],
        }
    }

    /// A bound function of `group`, other than `function`, with the same
    /// signature. Replicas never conflict; conversion functions also need
    /// the same target.
    pub fn conflicting_overload(&self, group: SymbolId, function: SymbolId) -> Option<SymbolId> {
        if self.symbol(function).has(SymbolFlags::REPLICA) {
            return None;
        }
        let target = |id: SymbolId| {
            self.symbol(id)
                .as_function()
                .filter(|f| f.kind == FunctionKind::Conversion)
                .map(|f| f.return_type)
        };
        self.group_functions(group).iter().copied().find(|&other| {
            let symbol = self.symbol(other);
            other != function
                && symbol.has(SymbolFlags::BOUND)
                && !symbol.has(SymbolFlags::REPLICA)
                && target(other) == target(function)
                && self.same_signature(other, function)
        })
    }

    /// Direct children of a container, in declaration order.
    pub fn children(&self, container: SymbolId) -> &[SymbolId] {
        match self.symbol(container).scope() {
            Some(scope) => self.scope(scope).symbols(),
            None => &[],
        }
    }

    // =========================================================================
    // Names
    // =========================================================================

    /// Dotted name from the global namespace, e.g. `Game.Entities.Player`.
    pub fn full_name(&self, id: SymbolId) -> String {
        let mut parts = Vec::new();
        let mut current = Some(id);
        while let Some(c) = current {
            if c == self.global {
                break;
            }
            let symbol = self.symbol(c);
            if let Some(derived) = symbol.as_derived() {
                return sable_core::derivation::display_name(
                    &self.full_name(derived.base),
                    &derived.derivations,
                );
            }
            parts.push(symbol.name.as_str());
            current = symbol.parent;
        }
        parts.reverse();
        parts.join(".")
    }

    /// Human-readable type name for diagnostics.
    pub fn type_name(&self, id: SymbolId) -> String {
        if id.is_unresolved() || self.get(id).is_none() {
            return String::from("<unresolved>");
        }
        self.full_name(id)
    }

    /// Built-in type symbol.
    pub fn builtin(&self, builtin: BuiltinType) -> SymbolId {
        self.builtins[&builtin]
    }

    /// Built-in type symbol, if `id` is one.
    pub fn as_builtin(&self, id: SymbolId) -> Option<BuiltinType> {
        match &self.symbol(id).kind {
            SymbolKind::BasicType(b) => Some(b.builtin),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::VariableData;

    fn local(table: &mut SymbolTable, name: &str, line: u32) -> SymbolId {
        let int = table.builtin(BuiltinType::Int);
        table.add_symbol(Symbol::new(
            name,
            Span::new(0, line, 0, 1),
            SymbolKind::Local(VariableData {
                ty: int,
                index: 0,
                syntax: None,
            }),
        ))
    }

    #[test]
    fn install_then_lookup_finds_symbol() {
        let mut table = SymbolTable::new();
        let scope = table.global_scope();
        let x = local(&mut table, "x", 1);
        table.install(scope, x).unwrap();
        assert_eq!(table.lookup(scope, "x", ScopeLookup::THIS), Some(x));
        assert_eq!(table.symbol(x).parent, Some(table.global()));
    }

    #[test]
    fn unknown_name_is_not_found() {
        let table = SymbolTable::new();
        for mask in [ScopeLookup::THIS, ScopeLookup::ALL, ScopeLookup::empty()] {
            assert_eq!(table.lookup(table.global_scope(), "missing", mask), None);
        }
    }

    #[test]
    fn duplicate_in_same_scope_fails() {
        let mut table = SymbolTable::new();
        let scope = table.global_scope();
        let a = local(&mut table, "x", 1);
        let b = local(&mut table, "x", 2);
        table.install(scope, a).unwrap();
        let err = table.install(scope, b).unwrap_err();
        assert!(matches!(err, SemanticError::DuplicateDefinition { .. }));
        assert_eq!(err.references(), &[Span::new(0, 1, 0, 1)]);
    }

    #[test]
    fn shadowing_across_scopes_is_allowed() {
        let mut table = SymbolTable::new();
        let outer = table.global_scope();
        let inner = table.add_scope(None, Some(outer));
        let a = local(&mut table, "x", 1);
        let b = local(&mut table, "x", 2);
        table.install(outer, a).unwrap();
        table.install(inner, b).unwrap();
        assert_eq!(table.lookup(inner, "x", ScopeLookup::ALL), Some(b));
        assert_eq!(table.lookup(outer, "x", ScopeLookup::ALL), Some(a));
    }

    #[test]
    fn parent_walk_respects_mask() {
        let mut table = SymbolTable::new();
        let outer = table.global_scope();
        let inner = table.add_scope(None, Some(outer));
        let a = local(&mut table, "y", 1);
        table.install(outer, a).unwrap();
        assert_eq!(table.lookup(inner, "y", ScopeLookup::THIS), None);
        assert_eq!(table.lookup(inner, "y", ScopeLookup::THIS | ScopeLookup::PARENT), Some(a));
    }

    #[test]
    fn base_walk_precedes_parent() {
        let mut table = SymbolTable::new();
        let global = table.global_scope();
        let base = table.add_scope(None, Some(global));
        let derived = table.add_scope(None, Some(global));
        table.scope_mut(derived).base = Some(base);
        let in_global = local(&mut table, "z", 1);
        let in_base = local(&mut table, "z", 2);
        table.install(global, in_global).unwrap();
        table.install(base, in_base).unwrap();
        assert_eq!(table.lookup(derived, "z", ScopeLookup::ALL), Some(in_base));
        assert_eq!(
            table.lookup(derived, "z", ScopeLookup::THIS | ScopeLookup::PARENT),
            Some(in_global)
        );
    }

    #[test]
    fn qualified_lookup_walks_from_global() {
        let mut table = SymbolTable::new();
        let global = table.global_scope();
        let game = table.get_or_create_namespace(global, "Game", Span::default()).unwrap();
        let game_scope = table.symbol(game).scope().unwrap();
        let core = table
            .get_or_create_namespace(game_scope, "Core", Span::default())
            .unwrap();
        let core_scope = table.symbol(core).scope().unwrap();
        let v = local(&mut table, "value", 1);
        table.install(core_scope, v).unwrap();

        assert_eq!(table.lookup_qualified(&QualifiedName::parse("Game.Core.value")), Some(v));
        assert_eq!(table.lookup_qualified(&QualifiedName::parse("Game.Nope.value")), None);
        assert_eq!(table.lookup_qualified(&QualifiedName::parse("Game.Core.value.x")), None);
        assert_eq!(table.full_name(v), "Game.Core.value");
    }

    #[test]
    fn namespaces_merge() {
        let mut table = SymbolTable::new();
        let global = table.global_scope();
        let a = table.get_or_create_namespace(global, "N", Span::default()).unwrap();
        let b = table.get_or_create_namespace(global, "N", Span::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn function_groups_collect_overloads() {
        use crate::symbol::FunctionData;
        use sable_syntax::FunctionKind;

        let mut table = SymbolTable::new();
        let global = table.global_scope();
        let void = table.builtin(BuiltinType::Void);
        let mut ids = Vec::new();
        for _ in 0..2 {
            let scope = table.add_scope(None, Some(global));
            let f = table.add_symbol(Symbol::new(
                "f",
                Span::default(),
                SymbolKind::Function(FunctionData::new(FunctionKind::Normal, scope, void)),
            ));
            ids.push(f);
        }
        let g1 = table.install_function(global, ids[0]).unwrap();
        let g2 = table.install_function(global, ids[1]).unwrap();
        assert_eq!(g1, g2);
        assert_eq!(table.group_functions(g1), ids.as_slice());

        let clash = local(&mut table, "f", 3);
        assert!(table.install(global, clash).is_err());
    }

    #[test]
    fn bound_overloads_with_one_signature_conflict() {
        use crate::symbol::FunctionData;
        use sable_syntax::FunctionKind;

        let mut table = SymbolTable::new();
        let global = table.global_scope();
        let void = table.builtin(BuiltinType::Void);
        let mut ids = Vec::new();
        for flags in [SymbolFlags::BOUND, SymbolFlags::BOUND, SymbolFlags::BOUND | SymbolFlags::REPLICA] {
            let scope = table.add_scope(None, Some(global));
            let f = table.add_symbol(
                Symbol::new(
                    "f",
                    Span::default(),
                    SymbolKind::Function(FunctionData::new(FunctionKind::Normal, scope, void)),
                )
                .with_flags(flags),
            );
            ids.push(f);
        }
        let group = table.install_function(global, ids[0]).unwrap();
        table.install_function(global, ids[1]).unwrap();
        table.install_function(global, ids[2]).unwrap();

        assert_eq!(table.conflicting_overload(group, ids[1]), Some(ids[0]));
        assert_eq!(table.conflicting_overload(group, ids[2]), None);

        table.symbol_mut(ids[0]).flags -= SymbolFlags::BOUND;
        assert_eq!(table.conflicting_overload(group, ids[1]), None);
    }

    #[test]
    fn conversion_functions_conflict_only_on_one_target() {
        use crate::symbol::FunctionData;

        let mut table = SymbolTable::new();
        let global = table.global_scope();
        let targets = [BuiltinType::Int, BuiltinType::Double, BuiltinType::Int].map(|t| table.builtin(t));
        let mut ids = Vec::new();
        for target in targets {
            let scope = table.add_scope(None, Some(global));
            ids.push(table.add_symbol(
                Symbol::new(
                    "@conversion",
                    Span::default(),
                    SymbolKind::Function(FunctionData::new(FunctionKind::Conversion, scope, target)),
                )
                .with_flags(SymbolFlags::BOUND),
            ));
        }
        let group = table.install_function(global, ids[0]).unwrap();
        table.install_function(global, ids[1]).unwrap();
        table.install_function(global, ids[2]).unwrap();

        assert_eq!(table.conflicting_overload(group, ids[1]), None);
        assert_eq!(table.conflicting_overload(group, ids[2]), Some(ids[0]));
    }
}
