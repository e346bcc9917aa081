// crates/judgnode-core/src/hashing.rs
// ============================================================================
// Module: Judgment Node Hashing
// Description: Canonical hashing for chain blocks and graph/event payloads.
// Purpose: Provide one stable hash form so independent implementations agree.
// Dependencies: sha2, serde_jcs, serde
// ============================================================================

//! ## Overview
//! Two hashing modes are used. Arbitrary JSON values are hashed via their
//! JCS (RFC 8785) canonical serialization, so field order and whitespace
//! never affect the digest. The chain's self-hash instead uses an explicit
//! length-prefixed byte encoding (spec-mandated canonical form), built with
//! [`CanonicalWriter`].

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde::de::Error as _;
use sha2::Digest;
use sha2::Sha256;

/// Hash algorithms known to the judgment node.
///
/// # Invariants
/// - Only `Sha256` is currently produced; the enum exists so digests remain
///   self-describing if a second algorithm is ever added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashAlgorithm {
    /// SHA-256.
    Sha256,
}

/// A hex-encoded digest tagged with the algorithm that produced it.
///
/// # Invariants
/// - `value` is lowercase hex and its length matches the algorithm's output size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashDigest {
    /// Algorithm that produced this digest.
    pub algorithm: HashAlgorithm,
    /// Lowercase hex-encoded digest bytes.
    pub value: String,
}

impl HashDigest {
    /// Builds a digest from raw bytes, hex-encoding them.
    #[must_use]
    pub fn from_bytes(algorithm: HashAlgorithm, bytes: &[u8]) -> Self {
        let mut value = String::with_capacity(bytes.len() * 2);
        for byte in bytes {
            value.push_str(&format!("{byte:02x}"));
        }
        Self {
            algorithm,
            value,
        }
    }

    /// The all-zero digest used as the genesis block's parent hash.
    #[must_use]
    pub fn zero(algorithm: HashAlgorithm) -> Self {
        Self::from_bytes(algorithm, &[0u8; 32])
    }

    /// Decodes the hex value back into raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error when `value` is not valid lowercase/uppercase hex.
    pub fn to_bytes(&self) -> Result<Vec<u8>, HashDecodeError> {
        decode_hex(&self.value)
    }
}

impl fmt::Display for HashDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}:{}", self.algorithm, self.value)
    }
}

/// Error decoding a [`HashDigest`]'s hex value.
#[derive(Debug, thiserror::Error)]
#[error("invalid hex digest: {0}")]
pub struct HashDecodeError(String);

fn decode_hex(value: &str) -> Result<Vec<u8>, HashDecodeError> {
    if value.len() % 2 != 0 {
        return Err(HashDecodeError(value.to_string()));
    }
    let mut out = Vec::with_capacity(value.len() / 2);
    let bytes = value.as_bytes();
    for pair in bytes.chunks(2) {
        let hi = (pair[0] as char).to_digit(16).ok_or_else(|| HashDecodeError(value.to_string()))?;
        let lo = (pair[1] as char).to_digit(16).ok_or_else(|| HashDecodeError(value.to_string()))?;
        out.push(((hi << 4) | lo) as u8);
    }
    Ok(out)
}

/// Hashes raw bytes with the given algorithm.
#[must_use]
pub fn hash_bytes(algorithm: HashAlgorithm, bytes: &[u8]) -> HashDigest {
    match algorithm {
        HashAlgorithm::Sha256 => {
            let digest = Sha256::digest(bytes);
            HashDigest::from_bytes(algorithm, &digest)
        }
    }
}

/// Hashes the RFC 8785 (JCS) canonical serialization of a JSON value.
///
/// # Errors
///
/// Returns an error if `value` cannot be canonicalized (e.g. it contains a
/// non-finite float).
pub fn hash_canonical_json<T: Serialize>(
    algorithm: HashAlgorithm,
    value: &T,
) -> Result<HashDigest, serde_json::Error> {
    let canonical = serde_jcs::to_string(value).map_err(serde_json::Error::custom)?;
    Ok(hash_bytes(algorithm, canonical.as_bytes()))
}

/// Combines two digests pairwise by hashing their concatenated bytes, the
/// Merkle-tree internal-node step.
///
/// # Errors
///
/// Returns an error if either digest's hex value fails to decode.
pub fn hash_pair(left: &HashDigest, right: &HashDigest) -> Result<HashDigest, HashDecodeError> {
    let mut bytes = left.to_bytes()?;
    bytes.extend(right.to_bytes()?);
    Ok(hash_bytes(left.algorithm, &bytes))
}

/// Builds the spec-mandated canonical byte encoding: each field is appended
/// as a big-endian `u32` length prefix followed by its raw bytes, in the
/// exact field order the caller writes them.
#[derive(Debug, Default)]
pub struct CanonicalWriter {
    buf: Vec<u8>,
}

impl CanonicalWriter {
    /// Creates an empty writer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a length-prefixed field.
    pub fn field(&mut self, bytes: &[u8]) -> &mut Self {
        let len = u32::try_from(bytes.len()).unwrap_or(u32::MAX);
        self.buf.extend_from_slice(&len.to_be_bytes());
        self.buf.extend_from_slice(bytes);
        self
    }

    /// Appends a length-prefixed `u64` field in big-endian form.
    pub fn field_u64(&mut self, value: u64) -> &mut Self {
        self.field(&value.to_be_bytes())
    }

    /// Consumes the writer, returning the accumulated canonical bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions."
    )]

    use super::CanonicalWriter;
    use super::HashAlgorithm;
    use super::hash_bytes;
    use super::hash_canonical_json;
    use super::hash_pair;

    #[test]
    fn hash_bytes_is_deterministic() {
        let a = hash_bytes(HashAlgorithm::Sha256, b"hello");
        let b = hash_bytes(HashAlgorithm::Sha256, b"hello");
        assert_eq!(a, b);
    }

    #[test]
    fn canonical_json_hash_ignores_field_order() {
        let a = serde_json::json!({"a": 1, "b": 2});
        let b = serde_json::json!({"b": 2, "a": 1});
        let ha = hash_canonical_json(HashAlgorithm::Sha256, &a).expect("hashable");
        let hb = hash_canonical_json(HashAlgorithm::Sha256, &b).expect("hashable");
        assert_eq!(ha, hb);
    }

    #[test]
    fn hash_pair_round_trips_through_hex() {
        let left = hash_bytes(HashAlgorithm::Sha256, b"left");
        let right = hash_bytes(HashAlgorithm::Sha256, b"right");
        let combined = hash_pair(&left, &right).expect("valid hex digests");
        assert_eq!(combined.value.len(), 64);
    }

    #[test]
    fn canonical_writer_is_order_sensitive() {
        let mut first = CanonicalWriter::new();
        first.field(b"a").field(b"bb");
        let mut second = CanonicalWriter::new();
        second.field(b"bb").field(b"a");
        assert_ne!(first.into_bytes(), second.into_bytes());
    }
}
