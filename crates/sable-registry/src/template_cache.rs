//! Template instance caches.
//!
//! Class template instances are keyed by the [`TypeId`] of the instantiated
//! type. Function template replicas are keyed by the generic function and
//! the ordered type arguments; the pair is folded into one xxh3 hash that
//! selects a bucket, and the bucket is searched for an exact key match.

use rustc_hash::FxHashMap;
use xxhash_rust::xxh3::Xxh3;

use sable_core::TypeId;

use crate::{SymbolId, SymbolTable};

/// Class template instances by identity, in creation order.
#[derive(Debug, Clone, Default)]
pub struct ClassTemplateCache {
    by_id: FxHashMap<TypeId, SymbolId>,
    order: Vec<SymbolId>,
}

impl ClassTemplateCache {
    pub(crate) fn insert(&mut self, type_id: TypeId, instance: SymbolId) {
        if self.by_id.insert(type_id, instance).is_none() {
            self.order.push(instance);
        }
    }

    pub fn get(&self, type_id: TypeId) -> Option<SymbolId> {
        self.by_id.get(&type_id).copied()
    }

    pub fn instances(&self) -> &[SymbolId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// One cached function template replica.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaEntry {
    pub generic: SymbolId,
    pub arguments: Vec<TypeId>,
    pub replica: SymbolId,
}

/// Function template replicas keyed by `(generic, type arguments)`.
#[derive(Debug, Clone, Default)]
pub struct FunctionTemplateCache {
    buckets: FxHashMap<u64, Vec<usize>>,
    entries: Vec<ReplicaEntry>,
}

/// Combined hash of a function template instantiation key.
pub fn replica_key_hash(generic: SymbolId, arguments: &[TypeId]) -> u64 {
    let mut hasher = Xxh3::new();
    hasher.update(&generic.0.to_le_bytes());
    hasher.update(&(arguments.len() as u32).to_le_bytes());
    for argument in arguments {
        hasher.update(argument.as_bytes());
    }
    hasher.digest()
}

impl FunctionTemplateCache {
    pub fn get(&self, generic: SymbolId, arguments: &[TypeId]) -> Option<SymbolId> {
        let bucket = self.buckets.get(&replica_key_hash(generic, arguments))?;
        bucket
            .iter()
            .map(|i| &self.entries[*i])
            .find(|e| e.generic == generic && e.arguments == arguments)
            .map(|e| e.replica)
    }

    /// Insert a replica. An existing entry for the same key wins.
    pub(crate) fn insert(&mut self, generic: SymbolId, arguments: Vec<TypeId>, replica: SymbolId) -> SymbolId {
        if let Some(existing) = self.get(generic, &arguments) {
            return existing;
        }
        let hash = replica_key_hash(generic, &arguments);
        self.buckets.entry(hash).or_default().push(self.entries.len());
        self.entries.push(ReplicaEntry {
            generic,
            arguments,
            replica,
        });
        replica
    }

    /// Entries in creation order.
    pub fn entries(&self) -> &[ReplicaEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SymbolTable {
    /// Cached class template instance with identity `type_id`.
    pub fn class_instance(&self, type_id: TypeId) -> Option<SymbolId> {
        self.class_templates.get(type_id)
    }

    /// Record an instance built outside [`make_template_type`], e.g. by the
    /// module linker. An instance already cached under `type_id` wins.
    ///
    /// [`make_template_type`]: SymbolTable::make_template_type
    pub fn add_class_instance(&mut self, type_id: TypeId, instance: SymbolId) -> SymbolId {
        match self.class_templates.get(type_id) {
            Some(existing) => existing,
            None => {
                self.class_templates.insert(type_id, instance);
                instance
            }
        }
    }

    /// All class template instances, in creation order.
    pub fn class_instances(&self) -> &[SymbolId] {
        self.class_templates.instances()
    }

    /// Cached replica of `generic` for `arguments`.
    pub fn function_replica(&self, generic: SymbolId, arguments: &[TypeId]) -> Option<SymbolId> {
        self.function_templates.get(generic, arguments)
    }

    /// Record a replica; returns the replica already cached for the key, if any.
    pub fn add_function_replica(
        &mut self,
        generic: SymbolId,
        arguments: Vec<TypeId>,
        replica: SymbolId,
    ) -> SymbolId {
        self.function_templates.insert(generic, arguments, replica)
    }

    /// All function template replicas, in creation order.
    pub fn function_replicas(&self) -> &[ReplicaEntry] {
        self.function_templates.entries()
    }
}
