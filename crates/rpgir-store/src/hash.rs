//! Content hashing for plan documents.
//!
//! The document hash is the SHA-256 of the canonical form with the `hash`
//! field itself removed, truncated to 16 hex characters. Determinism comes
//! from canonicalization: by the time bytes reach the hasher, every node,
//! port, edge, and nested object key is in sorted order, and no `HashMap`
//! iteration order can leak into the digest.

use sha2::{Digest, Sha256};

use rpgir_core::{canonical_value, canonicalize, Document};

/// Computes the 16-hex-char content hash of a document.
///
/// Two documents differing only in their `hash` field (or in irrelevant
/// ordering) hash identically.
pub fn content_hash(doc: &Document) -> String {
    let canon = canonicalize(doc);
    let mut tree = serde_json::to_value(&canon)
        .expect("canonical document serialization never fails");
    if let Some(map) = tree.as_object_mut() {
        map.remove("hash");
    }
    let bytes = canonical_value(&tree).to_string();
    let digest = Sha256::digest(bytes.as_bytes());
    let mut hash = hex::encode(digest);
    hash.truncate(16);
    hash
}
