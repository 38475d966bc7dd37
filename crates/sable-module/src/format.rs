//! Module file framing.
//!
//! A module file is `[magic "SBMF"][major u8][minor u8]` followed by the
//! exported symbol stream, encoded with `bincode`: little-endian, varint
//! lengths and trailing bytes rejected. Type identities are 16 raw bytes
//! and every symbol record starts with its one-byte [`SymbolTag`].

use bincode::Options;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use sable_core::{ModuleVersion, Result, SemanticError};

/// File identifier.
pub const MAGIC: [u8; 4] = *b"SBMF";

/// Magic plus version pair.
pub const HEADER_LEN: usize = MAGIC.len() + 2;

/// Kind tag written before every symbol record.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive, Serialize, Deserialize,
)]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum SymbolTag {
    Namespace = 1,
    Class = 2,
    Interface = 3,
    Enum = 4,
    EnumConstant = 5,
    Delegate = 6,
    Typedef = 7,
    GlobalVariable = 8,
    MemberVariable = 9,
    Constant = 10,
    Function = 11,
}

fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_little_endian()
        .with_varint_encoding()
        .reject_trailing_bytes()
}

/// Header followed by the encoded `body`.
pub fn encode<T: Serialize>(version: ModuleVersion, body: &T) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(HEADER_LEN);
    out.extend_from_slice(&MAGIC);
    out.push(version.major);
    out.push(version.minor);
    options()
        .serialize_into(&mut out, body)
        .map_err(|e| SemanticError::internal(format!("cannot encode module: {e}")))?;
    Ok(out)
}

/// Check the magic, require `expected` exactly and decode the body.
///
/// The body may not claim more bytes than the file holds, so a corrupt
/// length cannot trigger a huge allocation.
pub fn decode<T: DeserializeOwned>(bytes: &[u8], expected: ModuleVersion) -> Result<(ModuleVersion, T)> {
    let found = read_header(bytes, expected)?;
    let body = &bytes[HEADER_LEN..];
    let value = options()
        .with_limit(body.len() as u64)
        .deserialize(body)
        .map_err(|e| SemanticError::corrupt(format!("invalid symbol stream ({e})")))?;
    Ok((found, value))
}

fn read_header(bytes: &[u8], expected: ModuleVersion) -> Result<ModuleVersion> {
    if bytes.len() < HEADER_LEN || bytes[..MAGIC.len()] != MAGIC {
        return Err(SemanticError::corrupt("not a module file"));
    }
    let found = ModuleVersion::new(bytes[MAGIC.len()], bytes[MAGIC.len() + 1]);
    if found != expected {
        return Err(SemanticError::ModuleVersionMismatch { found, expected });
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_precedes_body() {
        let bytes = encode(ModuleVersion::new(1, 0), &7u8).unwrap();
        assert_eq!(bytes, [b'S', b'B', b'M', b'F', 1, 0, 7]);
        let (version, body): (_, u8) = decode(&bytes, ModuleVersion::new(1, 0)).unwrap();
        assert_eq!(version, ModuleVersion::new(1, 0));
        assert_eq!(body, 7);
    }

    #[test]
    fn bad_magic_is_corrupt() {
        let err = decode::<u8>(b"ABCD\x01\x00\x07", ModuleVersion::CURRENT).unwrap_err();
        assert!(matches!(err, SemanticError::CorruptModuleFile { .. }));
    }

    #[test]
    fn version_is_compared_exactly() {
        let bytes = encode(ModuleVersion::new(1, 1), &0u8).unwrap();
        let err = decode::<u8>(&bytes, ModuleVersion::new(1, 0)).unwrap_err();
        assert_eq!(
            err,
            SemanticError::ModuleVersionMismatch {
                found: ModuleVersion::new(1, 1),
                expected: ModuleVersion::new(1, 0),
            }
        );
    }

    #[test]
    fn trailing_and_missing_bytes_are_corrupt() {
        let mut bytes = encode(ModuleVersion::CURRENT, &String::from("name")).unwrap();
        bytes.push(0);
        assert!(matches!(
            decode::<String>(&bytes, ModuleVersion::CURRENT),
            Err(SemanticError::CorruptModuleFile { .. })
        ));
        bytes.truncate(bytes.len() - 3);
        assert!(matches!(
            decode::<String>(&bytes, ModuleVersion::CURRENT),
            Err(SemanticError::CorruptModuleFile { .. })
        ));
    }

    #[test]
    fn tags_are_single_bytes() {
        let bytes = encode(ModuleVersion::CURRENT, &SymbolTag::Function).unwrap();
        assert_eq!(&bytes[HEADER_LEN..], [11]);
        let mut corrupt = bytes.clone();
        corrupt[HEADER_LEN] = 99;
        assert!(decode::<SymbolTag>(&corrupt, ModuleVersion::CURRENT).is_err());
    }
}
