//! Hash Linking
//!
//! Computes leaf digests from canonical payload bytes and chains them to
//! the previous entry's digest. All digests are lowercase hex SHA-256,
//! fixed at 64 characters end-to-end.

use sha2::{Digest, Sha256};

/// Width of a hex-encoded SHA-256 digest.
pub const DIGEST_HEX_LEN: usize = 64;

/// Sentinel used as `prev_chain_hash` for the first entry of a chain.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Digest of one entry's canonical payload, independent of chaining.
pub fn leaf_hash(canonical: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical);
    hex::encode(hasher.finalize())
}

/// Digest binding an entry to its predecessor.
///
/// Hashes the concatenation of the two fixed-width hex digests. Both
/// inputs are exactly [`DIGEST_HEX_LEN`] characters, so the concatenation
/// is unambiguous without a separator. The genesis entry uses
/// [`GENESIS_HASH`] as `prev`; the rule is the same for every entry.
pub fn chain_hash(prev: &str, leaf: &str) -> String {
    debug_assert_eq!(prev.len(), DIGEST_HEX_LEN);
    debug_assert_eq!(leaf.len(), DIGEST_HEX_LEN);

    let mut hasher = Sha256::new();
    hasher.update(prev.as_bytes());
    hasher.update(leaf.as_bytes());
    hex::encode(hasher.finalize())
}

/// Whether a string is a well-formed digest: 64 lowercase hex characters.
pub fn is_valid_digest(s: &str) -> bool {
    s.len() == DIGEST_HEX_LEN && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
