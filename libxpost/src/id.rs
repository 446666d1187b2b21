//! Short random identifiers for local records and OAuth nonces

use rand::rngs::OsRng;
use rand::Rng;

const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Length of post, thread and generation ids
pub const RECORD_ID_LEN: usize = 12;

/// Length of OAuth nonces
pub const NONCE_LEN: usize = 32;

/// Generate `length` characters drawn uniformly from `[0-9a-z]`.
///
/// Uses the operating system CSPRNG. `OsRng` panics if the entropy source
/// fails, which we treat as unrecoverable.
pub fn new_id(length: usize) -> String {
    let mut rng = OsRng;
    (0..length)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

/// A fresh record id
pub fn record_id() -> String {
    new_id(RECORD_ID_LEN)
}
