//! Constant-time comparison helpers shared across the server crates.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Constant-time byte comparison that leaks neither content nor length.
///
/// Both inputs are hashed to fixed-length SHA-256 digests first, so inputs of
/// different lengths take the same time to compare.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    let ha = Sha256::digest(a);
    let hb = Sha256::digest(b);
    ha.ct_eq(&hb).into()
}
