//! BindContext: everything one unit's binding pass threads through.
//!
//! The context owns the unit's [`SymbolTable`], its [`UnitSettings`], the
//! bound function bodies, and the per-file `using` scopes. Nothing here is
//! global: two units bind with two contexts.

use rustc_hash::FxHashMap;

use sable_core::{
    Diagnostics, QualifiedName, Result, ScopeLookup, SemanticError, Span, UnitSettings,
};
use sable_registry::{FileScope, ScopeId, SymbolId, SymbolTable};

use crate::bound::BoundFunction;

/// Binding state for one compile unit.
#[derive(Debug)]
pub struct BindContext {
    pub table: SymbolTable,
    pub settings: UnitSettings,
    pub diagnostics: Diagnostics,
    bodies: FxHashMap<SymbolId, BoundFunction>,
    file_scopes: FxHashMap<u32, FileScope>,
    template_depth: usize,
}

impl BindContext {
    pub fn new(settings: UnitSettings) -> Self {
        Self::with_table(SymbolTable::new(), settings)
    }

    /// Context over an existing table, e.g. one that already holds imports.
    pub fn with_table(table: SymbolTable, settings: UnitSettings) -> Self {
        Self {
            table,
            settings,
            diagnostics: Diagnostics::new(),
            bodies: FxHashMap::default(),
            file_scopes: FxHashMap::default(),
            template_depth: 0,
        }
    }

    // =========================================================================
    // Name resolution
    // =========================================================================

    /// Resolve `name` as written at `span` with innermost scope `scope`.
    ///
    /// Lexical scopes first, then the `using` directives of the file that
    /// `span` belongs to.
    pub fn resolve_name(
        &self,
        scope: ScopeId,
        name: &QualifiedName,
        span: Span,
    ) -> Result<Option<SymbolId>> {
        match self.file_scopes.get(&span.file) {
            Some(file) => file.resolve_checked(&self.table, scope, name, ScopeLookup::ALL, span),
            None => Ok(self.table.resolve(scope, name, ScopeLookup::ALL)),
        }
    }

    /// Like [`resolve_name`](Self::resolve_name), failing with
    /// `SymbolNotFound` on absence.
    pub fn require_name(&self, scope: ScopeId, name: &QualifiedName, span: Span) -> Result<SymbolId> {
        self.resolve_name(scope, name, span)?
            .ok_or_else(|| SemanticError::SymbolNotFound {
                name: name.to_string(),
                span,
            })
    }

    pub fn file_scope_mut(&mut self, file: u32) -> &mut FileScope {
        self.file_scopes
            .entry(file)
            .or_insert_with(|| FileScope::new(file))
    }

    pub fn file_scope(&self, file: u32) -> Option<&FileScope> {
        self.file_scopes.get(&file)
    }

    // =========================================================================
    // Bodies
    // =========================================================================

    /// Bound body of `function`, once bound.
    pub fn body(&self, function: SymbolId) -> Option<&BoundFunction> {
        self.bodies.get(&function)
    }

    pub fn bodies(&self) -> impl Iterator<Item = (&SymbolId, &BoundFunction)> {
        self.bodies.iter()
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub(crate) fn store_body(&mut self, body: BoundFunction) {
        self.bodies.insert(body.function, body);
    }

    // =========================================================================
    // Template nesting
    // =========================================================================

    /// Enter one level of template instantiation.
    pub(crate) fn enter_template(&mut self, name: &str, span: Span) -> Result<()> {
        if self.template_depth >= self.settings.max_template_depth {
            return Err(SemanticError::CyclicTemplateDefinition {
                name: name.to_string(),
                span,
            });
        }
        self.template_depth += 1;
        Ok(())
    }

    pub(crate) fn leave_template(&mut self) {
        self.template_depth = self.template_depth.saturating_sub(1);
    }

    pub fn template_depth(&self) -> usize {
        self.template_depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_name_is_reported_with_span() {
        let ctx = BindContext::new(UnitSettings::default());
        let span = Span::new(0, 3, 4, 9);
        let err = ctx
            .require_name(ctx.table.global_scope(), &QualifiedName::simple("nope"), span)
            .unwrap_err();
        assert_eq!(err.span(), span);
    }

    #[test]
    fn builtins_resolve_without_file_scope() {
        let ctx = BindContext::new(UnitSettings::default());
        let found = ctx
            .resolve_name(ctx.table.global_scope(), &QualifiedName::simple("int"), Span::default())
            .unwrap();
        assert!(found.is_some());
    }

    #[test]
    fn template_depth_is_bounded() {
        let mut ctx = BindContext::new(UnitSettings::default().with_max_template_depth(1));
        ctx.enter_template("A<int>", Span::default()).unwrap();
        assert!(ctx.enter_template("A<A<int>>", Span::default()).is_err());
        ctx.leave_template();
        assert_eq!(ctx.template_depth(), 0);
    }
}
