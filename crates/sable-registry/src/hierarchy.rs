//! Class inheritance graph.
//!
//! Uses `petgraph::DiGraph` with:
//! - Nodes: class and interface symbols
//! - Edges: derived -> base, one per base class or implemented interface

use petgraph::algo::{dijkstra, has_path_connecting};
use petgraph::graph::{DiGraph, NodeIndex};
use rustc_hash::FxHashMap;

use crate::SymbolId;

#[derive(Debug, Clone, Default)]
pub struct ClassHierarchy {
    graph: DiGraph<SymbolId, ()>,
    nodes: FxHashMap<SymbolId, NodeIndex>,
}

impl ClassHierarchy {
    /// Add a class node (idempotent).
    pub fn add_class(&mut self, class: SymbolId) -> NodeIndex {
        if let Some(node) = self.nodes.get(&class) {
            return *node;
        }
        let node = self.graph.add_node(class);
        self.nodes.insert(class, node);
        node
    }

    /// Record that `derived` inherits from `base`.
    ///
    /// Returns `false` and leaves the graph unchanged if the edge would
    /// close a cycle.
    pub fn add_base(&mut self, derived: SymbolId, base: SymbolId) -> bool {
        let d = self.add_class(derived);
        let b = self.add_class(base);
        if d == b || has_path_connecting(&self.graph, b, d, None) {
            return false;
        }
        if self.graph.find_edge(d, b).is_none() {
            self.graph.add_edge(d, b, ());
        }
        true
    }

    /// Number of inheritance steps from `derived` up to `base`.
    ///
    /// `Some(0)` for the same class, `None` if `base` is not an ancestor.
    pub fn distance(&self, derived: SymbolId, base: SymbolId) -> Option<u32> {
        if derived == base {
            return Some(0);
        }
        let d = *self.nodes.get(&derived)?;
        let b = *self.nodes.get(&base)?;
        let costs = dijkstra(&self.graph, d, Some(b), |_| 1u32);
        costs.get(&b).copied()
    }

    /// Whether `base` is `derived` or one of its ancestors.
    pub fn is_base_of(&self, base: SymbolId, derived: SymbolId) -> bool {
        self.distance(derived, base).is_some()
    }

    /// Direct bases of `class`.
    pub fn bases(&self, class: SymbolId) -> Vec<SymbolId> {
        match self.nodes.get(&class) {
            Some(node) => self
                .graph
                .neighbors(*node)
                .map(|n| self.graph[n])
                .collect(),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u32) -> SymbolId {
        SymbolId(n)
    }

    #[test]
    fn distance_counts_steps() {
        let mut h = ClassHierarchy::default();
        assert!(h.add_base(id(2), id(1)));
        assert!(h.add_base(id(3), id(2)));
        assert_eq!(h.distance(id(3), id(3)), Some(0));
        assert_eq!(h.distance(id(3), id(2)), Some(1));
        assert_eq!(h.distance(id(3), id(1)), Some(2));
        assert_eq!(h.distance(id(1), id(3)), None);
        assert!(h.is_base_of(id(1), id(3)));
    }

    #[test]
    fn cycles_are_rejected() {
        let mut h = ClassHierarchy::default();
        assert!(h.add_base(id(2), id(1)));
        assert!(!h.add_base(id(1), id(2)));
        assert!(!h.add_base(id(1), id(1)));
        assert_eq!(h.bases(id(1)), Vec::<SymbolId>::new());
    }

    #[test]
    fn unknown_classes_have_no_distance() {
        let h = ClassHierarchy::default();
        assert_eq!(h.distance(id(7), id(8)), None);
    }
}
