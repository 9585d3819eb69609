//! Canonical payload serialization for signing
//!
//! Signatures must be stable across field reordering: two semantically
//! identical payloads serialized with different key orders have to produce
//! the same bytes. Serializing through `serde_json::Value` guarantees this
//! because its object representation is a `BTreeMap`, which emits keys in
//! lexicographic order at every nesting depth. Array order is preserved.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::{SwarmError, SwarmResult};

/// Serialize a payload to canonical (key-sorted) JSON bytes
pub fn canonical_bytes<T: Serialize>(payload: &T) -> SwarmResult<Vec<u8>> {
    let value =
        serde_json::to_value(payload).map_err(|e| SwarmError::Serialization(e.to_string()))?;
    serde_json::to_vec(&value).map_err(|e| SwarmError::Serialization(e.to_string()))
}

/// SHA-256 digest of the canonical serialization of a payload
pub fn canonical_digest<T: Serialize>(payload: &T) -> SwarmResult<[u8; 32]> {
    let bytes = canonical_bytes(payload)?;
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&Sha256::digest(&bytes));
    Ok(digest)
}
