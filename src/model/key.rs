//! Identity keys for query items.
//!
//! An item's key is assigned once, when the item is first built, and is
//! passed through unchanged on every later update. When the item has a
//! natural identity the key is a content hash of it, so the same logical
//! item decoded twice (from a request, from a permalink) gets the same key.
//! Otherwise a random UUID is used.

use sha2::{Digest, Sha256};

/// Length of content keys, in hex characters.
const CONTENT_KEY_LEN: usize = 16;

/// Deterministic key for an item identified by `parts`.
///
/// Parts are length-prefixed before hashing so `["ab", "c"]` and `["a", "bc"]`
/// produce different keys.
pub fn content_key(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update((part.len() as u64).to_le_bytes());
        hasher.update(part.as_bytes());
    }
    let mut hex = format!("{:x}", hasher.finalize());
    hex.truncate(CONTENT_KEY_LEN);
    hex
}

/// Random key for items without a natural identity.
pub fn random_key() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
