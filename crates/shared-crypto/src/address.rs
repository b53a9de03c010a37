//! # Account Address Derivation
//!
//! An account number is the low 64 bits of `SHA-256(public_key)`: take the
//! first 8 bytes of the digest and read them little-endian. The user-facing
//! form prefixes the decimal rendering with `DDK` (see `shared-types`).
//!
//! This derivation is consensus-visible; changing it orphans every account.

use crate::hashing::sha256;

/// Derive the numeric account id from an ed25519 public key.
pub fn account_number(public_key: &[u8; 32]) -> u64 {
    let digest = sha256(public_key);
    let mut low = [0u8; 8];
    low.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(low)
}
