//! Content-hash type shared between `bugs-core` and the backing `Store`.
//!
//! Supports two algorithms (SHA-1 and SHA-256), selected per-value by byte
//! length; `HashKind::default()` is SHA-1, matching the 40-hex-character
//! ids spec.md §6.3 requires. The core itself never computes an
//! `ObjectHash` — hashing content is the `Store`'s job (spec §6.1); this
//! module only supplies the value type both sides exchange.

use std::{fmt::Display, hash::Hash, str::FromStr};

use serde::{Deserialize, Serialize};

/// Supported hash algorithms for object IDs (selector only, no data attached).
/// Names which algorithm a `Store` implementation speaks. Defaults to
/// SHA-1.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Deserialize, Serialize,
)]
pub enum HashKind {
    #[default]
    Sha1,
    Sha256,
}

impl HashKind {
    /// Byte length of the hash output.
    pub const fn size(&self) -> usize {
        match self {
            HashKind::Sha1 => 20,
            HashKind::Sha256 => 32,
        }
    }

    /// Hex string length of the hash output.
    pub const fn hex_len(&self) -> usize {
        match self {
            HashKind::Sha1 => 40,
            HashKind::Sha256 => 64,
        }
    }

    /// Lowercase name of the hash algorithm.
    pub const fn as_str(&self) -> &'static str {
        match self {
            HashKind::Sha1 => "sha1",
            HashKind::Sha256 => "sha256",
        }
    }
}

impl Display for HashKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha1" => Ok(HashKind::Sha1),
            "sha256" => Ok(HashKind::Sha256),
            _ => Err("invalid hash kind".to_string()),
        }
    }
}

/// Concrete object hash value carrying the bytes for the selected algorithm.
///
/// This is the type every `Store` method returns and accepts: blob/tree/
/// commit hashes, ref targets, and (once crystallized at the first commit)
/// a `Bug`'s own `id`. Supports conversion to/from hex strings and byte
/// slices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub enum ObjectHash {
    Sha1([u8; 20]),
    Sha256([u8; 32]),
}

impl Default for ObjectHash {
    fn default() -> Self {
        ObjectHash::Sha1([0u8; 20])
    }
}

impl Display for ObjectHash {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.as_ref()))
    }
}

impl AsRef<[u8]> for ObjectHash {
    fn as_ref(&self) -> &[u8] {
        match self {
            ObjectHash::Sha1(bytes) => bytes.as_slice(),
            ObjectHash::Sha256(bytes) => bytes.as_slice(),
        }
    }
}

/// Parse hex (40 for SHA-1, 64 for SHA-256) into an `ObjectHash`.
impl FromStr for ObjectHash {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.len() {
            40 => {
                let mut h = [0u8; 20];
                let bytes = hex::decode(s).map_err(|e| e.to_string())?;
                h.copy_from_slice(bytes.as_slice());
                Ok(ObjectHash::Sha1(h))
            }
            64 => {
                let mut h = [0u8; 32];
                let bytes = hex::decode(s).map_err(|e| e.to_string())?;
                h.copy_from_slice(bytes.as_slice());
                Ok(ObjectHash::Sha256(h))
            }
            other => Err(format!("invalid hash length: {other}")),
        }
    }
}

impl ObjectHash {
    /// Return the hash kind for this value.
    pub fn kind(&self) -> HashKind {
        match self {
            ObjectHash::Sha1(_) => HashKind::Sha1,
            ObjectHash::Sha256(_) => HashKind::Sha256,
        }
    }

    /// Return the hash size in bytes.
    pub fn size(&self) -> usize {
        self.kind().size()
    }

    /// Create an `ObjectHash` from raw bytes, inferring the algorithm from
    /// the byte length (20 -> SHA-1, 32 -> SHA-256).
    pub fn from_bytes(bytes: &[u8]) -> Result<ObjectHash, String> {
        match bytes.len() {
            20 => {
                let mut h = [0u8; 20];
                h.copy_from_slice(bytes);
                Ok(ObjectHash::Sha1(h))
            }
            32 => {
                let mut h = [0u8; 32];
                h.copy_from_slice(bytes);
                Ok(ObjectHash::Sha256(h))
            }
            other => Err(format!(
                "invalid byte length: got {other}, expected 20 or 32"
            )),
        }
    }

    /// Return raw bytes of the hash.
    pub fn to_data(self) -> Vec<u8> {
        self.as_ref().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn sha1_hex_round_trip() {
        let hash_str = "8ab686eafeb1f44702738c8b0f24f2567c36da6d";
        let hash = ObjectHash::from_str(hash_str).unwrap();
        assert_eq!(hash.kind(), HashKind::Sha1);
        assert_eq!(hash.to_string(), hash_str);
    }

    #[test]
    fn sha256_hex_round_trip() {
        let hash_str = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";
        let hash = ObjectHash::from_str(hash_str).unwrap();
        assert_eq!(hash.kind(), HashKind::Sha256);
        assert_eq!(hash.to_string(), hash_str);
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(ObjectHash::from_str("deadbeef").is_err());
    }

    #[test]
    fn from_bytes_infers_kind() {
        let hash = ObjectHash::from_bytes(&[0u8; 20]).unwrap();
        assert_eq!(hash.kind(), HashKind::Sha1);
        let hash = ObjectHash::from_bytes(&[0u8; 32]).unwrap();
        assert_eq!(hash.kind(), HashKind::Sha256);
    }

    #[test]
    fn hash_kind_from_str() {
        assert_eq!(HashKind::from_str("sha1").unwrap(), HashKind::Sha1);
        assert_eq!(HashKind::from_str("SHA256").unwrap(), HashKind::Sha256);
        assert!(HashKind::from_str("md5").is_err());
    }
}
