//! Cross-unit type identity.
//!
//! This module provides [`TypeId`], a fixed-size 16-byte identity for every
//! type a unit can name. Identities are the only thing that crosses unit
//! boundaries: module files store them verbatim, and two units agree that a
//! type is "the same" exactly when their ids are equal.
//!
//! # Identity Computation
//!
//! - Built-in types use a stable tag hashed with XXH3-128.
//! - User-defined base types get a random v4 UUID the first time they are
//!   created in a session; importers copy the id verbatim.
//! - Derived types chain the base id through XXH3-128 once per
//!   [`Derivation`], hashing the running id together with the code, so
//!   order matters, repeated derivations never cancel and lists of any
//!   length stay distinct.
//! - Template instances fold each argument id into the subject id after a
//!   per-position byte rotation, so `Map<int, long>` and `Map<long, int>`
//!   differ.
//!
//! # Examples
//!
//! ```
//! use sable_core::{Derivation, TypeId};
//!
//! let int = TypeId::from_tag("int");
//! let ptr = TypeId::derived(int, &[Derivation::Pointer]);
//! assert_eq!(ptr, TypeId::derived(int, &[Derivation::Pointer]));
//! assert_ne!(ptr, TypeId::derived(int, &[Derivation::Pointer, Derivation::Pointer]));
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_128_with_seed;

use crate::Derivation;

/// Seed for built-in tag hashing.
const TAG_SEED: u64 = 0x2fac10b63a6cc57c;

/// Seed for derivation chaining.
const DERIVE_SEED: u64 = 0x51d7e2c08b94a3f1;

/// Domain marker folded into every template instance id.
const TEMPLATE_MARKER: u8 = 0xa5;

/// Size of a type identity in bytes.
pub const TYPE_ID_LEN: usize = 16;

/// A fixed-size opaque type identity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct TypeId([u8; TYPE_ID_LEN]);

impl TypeId {
    /// Empty/invalid id.
    pub const EMPTY: TypeId = TypeId([0; TYPE_ID_LEN]);

    /// Create an id from raw bytes (used by the module reader).
    #[inline]
    pub const fn from_bytes(bytes: [u8; TYPE_ID_LEN]) -> Self {
        TypeId(bytes)
    }

    /// Raw bytes of this id.
    #[inline]
    pub const fn as_bytes(&self) -> &[u8; TYPE_ID_LEN] {
        &self.0
    }

    /// Stable id for a built-in type, computed from its tag.
    ///
    /// The same tag always produces the same id in every unit.
    #[inline]
    pub fn from_tag(tag: &str) -> Self {
        TypeId(xxh3_128_with_seed(tag.as_bytes(), TAG_SEED).to_le_bytes())
    }

    /// Fresh randomly seeded id for a user-defined base type.
    #[inline]
    pub fn random() -> Self {
        TypeId(uuid::Uuid::new_v4().into_bytes())
    }

    /// Id of `base` with `derivations` applied in order.
    ///
    /// Pure: same inputs, same output, in every unit.
    /// Applying the list in two parts gives the same id as applying it at
    /// once.
    pub fn derived(base: TypeId, derivations: &[Derivation]) -> Self {
        let mut input = [0u8; TYPE_ID_LEN + 1];
        input[..TYPE_ID_LEN].copy_from_slice(&base.0);
        for derivation in derivations {
            input[TYPE_ID_LEN] = u8::from(*derivation);
            let next = xxh3_128_with_seed(&input, DERIVE_SEED).to_le_bytes();
            input[..TYPE_ID_LEN].copy_from_slice(&next);
        }
        let mut bytes = [0u8; TYPE_ID_LEN];
        bytes.copy_from_slice(&input[..TYPE_ID_LEN]);
        TypeId(bytes)
    }

    /// Id of `subject` instantiated with `type_arguments` in order.
    ///
    /// Pure: same inputs, same output, in every unit.
    pub fn template_instance(subject: TypeId, type_arguments: &[TypeId]) -> Self {
        let mut bytes = subject.0;
        bytes[0] ^= TEMPLATE_MARKER;
        for (index, argument) in type_arguments.iter().enumerate() {
            let rotation = ((index + 1) * 3) % TYPE_ID_LEN;
            let mut rotated = argument.0;
            rotated.rotate_left(rotation);
            for (target, source) in bytes.iter_mut().zip(rotated.iter()) {
                *target ^= *source;
            }
            bytes[(index * 5 + 7) % TYPE_ID_LEN] ^= TEMPLATE_MARKER.wrapping_add(index as u8);
        }
        TypeId(bytes)
    }

    /// Check if this is the empty id.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0 == [0; TYPE_ID_LEN]
    }
}

impl Default for TypeId {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Debug for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeId({self})")
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}
