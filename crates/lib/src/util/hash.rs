//! Hashing utilities for document fingerprints.
//!
//! `ObjectHash` is a truncated 20-character hash identifying a serialized
//! value. Output documents use it as a quick equality fingerprint before a
//! full parity walk.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::consts::OBJ_HASH_PREFIX_LEN;

pub type HashError = serde_json::Error;

/// A content-addressed hash identifying a unique serialized value.
///
/// The hash is a 20-character truncated SHA-256 of the JSON-serialized struct.
/// Serialization of every hashed type is ordered (`BTreeMap`, `Vec`), so equal
/// values always produce equal hashes.
///
/// # Format
///
/// The hash is a lowercase hexadecimal string, e.g., `"a1b2c3d4e5f6789012ab"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectHash(pub String);

impl std::fmt::Display for ObjectHash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

pub trait Hashable: Serialize {
  fn compute_hash(&self) -> Result<ObjectHash, HashError> {
    let serialized = serde_json::to_string(self)?;
    let mut hasher = Sha256::new();
    hasher.update(serialized.as_bytes());
    let full = format!("{:x}", hasher.finalize());
    Ok(ObjectHash(full[..OBJ_HASH_PREFIX_LEN].to_string()))
  }
}
