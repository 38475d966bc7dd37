//! Per-file imported names.
//!
//! A [`FileScope`] holds the `using` directives of one source file. It is
//! consulted only after the lexical scope chain comes up empty:
//!
//! 1. lexical scopes (this, base, parent) through the table
//! 2. aliases declared with `using A = X.Y`
//! 3. members of namespaces imported with `using X.Y` (not transitive)
//!
//! Two different symbols reached through two directives is an ambiguity.

use rustc_hash::FxHashMap;

use sable_core::{QualifiedName, Result, ScopeLookup, SemanticError, Span};

use crate::{ScopeId, SymbolId, SymbolTable};

/// Outcome of a name resolution through a file scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(SymbolId),
    NotFound,
    /// Distinct symbols from different `using` directives.
    Ambiguous(Vec<SymbolId>),
}

impl Resolution {
    pub fn is_found(&self) -> bool {
        matches!(self, Resolution::Found(_))
    }

    pub fn found(&self) -> Option<SymbolId> {
        match self {
            Resolution::Found(id) => Some(*id),
            _ => None,
        }
    }
}

/// The `using` directives in effect for one source file.
#[derive(Debug, Clone, Default)]
pub struct FileScope {
    pub file: u32,
    usings: Vec<SymbolId>,
    aliases: FxHashMap<String, SymbolId>,
}

impl FileScope {
    pub fn new(file: u32) -> Self {
        Self {
            file,
            ..Self::default()
        }
    }

    /// Import the members of `namespace`. Duplicates are ignored.
    pub fn add_using(&mut self, namespace: SymbolId) {
        if !self.usings.contains(&namespace) {
            self.usings.push(namespace);
        }
    }

    /// Bind `alias` to `target`. Returns the previous target, if any.
    pub fn add_alias(&mut self, alias: impl Into<String>, target: SymbolId) -> Option<SymbolId> {
        self.aliases.insert(alias.into(), target)
    }

    pub fn usings(&self) -> &[SymbolId] {
        &self.usings
    }

    pub fn alias(&self, name: &str) -> Option<SymbolId> {
        self.aliases.get(name).copied()
    }

    /// Resolve `name` as written at a position whose innermost scope is
    /// `scope`.
    pub fn resolve(
        &self,
        table: &SymbolTable,
        scope: ScopeId,
        name: &QualifiedName,
        mask: ScopeLookup,
    ) -> Resolution {
        if let Some(found) = table.resolve(scope, name, mask) {
            return Resolution::Found(found);
        }

        let components = name.components();
        let Some((first, rest)) = components.split_first() else {
            return Resolution::NotFound;
        };

        if let Some(target) = self.alias(first) {
            return match table.lookup_qualified_from_symbol(target, rest) {
                Some(found) => Resolution::Found(found),
                None => Resolution::NotFound,
            };
        }

        let mut matches: Vec<SymbolId> = Vec::new();
        for namespace in &self.usings {
            if let Some(found) = table.lookup_qualified_from(*namespace, components) {
                if !matches.contains(&found) {
                    matches.push(found);
                }
            }
        }
        match matches.len() {
            0 => Resolution::NotFound,
            1 => Resolution::Found(matches[0]),
            _ => Resolution::Ambiguous(matches),
        }
    }

    /// Like [`resolve`](Self::resolve), reporting ambiguity as an error.
    pub fn resolve_checked(
        &self,
        table: &SymbolTable,
        scope: ScopeId,
        name: &QualifiedName,
        mask: ScopeLookup,
        span: Span,
    ) -> Result<Option<SymbolId>> {
        match self.resolve(table, scope, name, mask) {
            Resolution::Found(id) => Ok(Some(id)),
            Resolution::NotFound => Ok(None),
            Resolution::Ambiguous(candidates) => Err(SemanticError::AmbiguousSymbol {
                name: name.to_string(),
                candidates: candidates.iter().map(|c| table.full_name(*c)).collect(),
                candidate_spans: candidates.iter().map(|c| table.symbol(*c).span).collect(),
                span,
            }),
        }
    }
}

impl SymbolTable {
    /// `target` itself when `components` is empty, otherwise
    /// [`lookup_qualified_from`](Self::lookup_qualified_from).
    pub fn lookup_qualified_from_symbol(&self, target: SymbolId, components: &[String]) -> Option<SymbolId> {
        if components.is_empty() {
            Some(target)
        } else {
            self.lookup_qualified_from(target, components)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::{Symbol, SymbolKind, VariableData};
    use crate::BuiltinType;

    fn namespace(table: &mut SymbolTable, name: &str) -> (SymbolId, ScopeId) {
        let id = table
            .get_or_create_namespace(table.global_scope(), name, Span::default())
            .unwrap();
        let scope = table.symbol(id).scope().unwrap();
        (id, scope)
    }

    fn global_var(table: &mut SymbolTable, scope: ScopeId, name: &str, line: u32) -> SymbolId {
        let int = table.builtin(BuiltinType::Int);
        let id = table.add_symbol(Symbol::new(
            name,
            Span::new(0, line, 0, 1),
            SymbolKind::GlobalVariable(VariableData {
                ty: int,
                index: 0,
                syntax: None,
            }),
        ));
        table.install(scope, id).unwrap();
        id
    }

    #[test]
    fn using_brings_names_into_view() {
        let mut table = SymbolTable::new();
        let (math, math_scope) = namespace(&mut table, "Math");
        let pi = global_var(&mut table, math_scope, "pi", 1);

        let mut file = FileScope::new(0);
        let name = QualifiedName::simple("pi");
        assert_eq!(
            file.resolve(&table, table.global_scope(), &name, ScopeLookup::ALL),
            Resolution::NotFound
        );
        file.add_using(math);
        assert_eq!(
            file.resolve(&table, table.global_scope(), &name, ScopeLookup::ALL),
            Resolution::Found(pi)
        );
    }

    #[test]
    fn lexical_scope_wins_over_using() {
        let mut table = SymbolTable::new();
        let (math, math_scope) = namespace(&mut table, "Math");
        global_var(&mut table, math_scope, "x", 1);
        let global = table.global_scope();
        let local = global_var(&mut table, global, "x", 2);

        let mut file = FileScope::new(0);
        file.add_using(math);
        let found = file.resolve(&table, global, &QualifiedName::simple("x"), ScopeLookup::ALL);
        assert_eq!(found, Resolution::Found(local));
    }

    #[test]
    fn two_usings_with_same_name_are_ambiguous() {
        let mut table = SymbolTable::new();
        let (a, a_scope) = namespace(&mut table, "A");
        let (b, b_scope) = namespace(&mut table, "B");
        global_var(&mut table, a_scope, "v", 1);
        global_var(&mut table, b_scope, "v", 2);

        let mut file = FileScope::new(0);
        file.add_using(a);
        file.add_using(b);
        let err = file
            .resolve_checked(
                &table,
                table.global_scope(),
                &QualifiedName::simple("v"),
                ScopeLookup::ALL,
                Span::new(0, 9, 0, 1),
            )
            .unwrap_err();
        match err {
            SemanticError::AmbiguousSymbol {
                candidates,
                candidate_spans,
                ..
            } => {
                assert_eq!(candidates, vec!["A.v".to_string(), "B.v".to_string()]);
                assert_eq!(candidate_spans.len(), 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn alias_resolves_through_target() {
        let mut table = SymbolTable::new();
        let (math, math_scope) = namespace(&mut table, "Math");
        let pi = global_var(&mut table, math_scope, "pi", 1);

        let mut file = FileScope::new(0);
        file.add_alias("M", math);
        let found = file.resolve(
            &table,
            table.global_scope(),
            &QualifiedName::parse("M.pi"),
            ScopeLookup::ALL,
        );
        assert_eq!(found, Resolution::Found(pi));
    }
}
