//! # SHA-256 Hashing
//!
//! One-shot and streaming digests over the chain's canonical byte layouts.
//!
//! The streaming form exists for block payload verification, which folds
//! every transaction's bytes into one rolling digest.

use sha2::{Digest, Sha256};

/// SHA-256 hash output (256-bit).
pub type Hash = [u8; 32];

/// Stateful SHA-256 hasher.
pub struct Sha256Hasher {
    inner: Sha256,
}

impl Sha256Hasher {
    /// Create new hasher.
    pub fn new() -> Self {
        Self {
            inner: Sha256::new(),
        }
    }

    /// Update with data.
    pub fn update(&mut self, data: &[u8]) -> &mut Self {
        self.inner.update(data);
        self
    }

    /// Finalize and return hash.
    pub fn finalize(self) -> Hash {
        self.inner.finalize().into()
    }
}

impl Default for Sha256Hasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Hash data with SHA-256 (one-shot).
pub fn sha256(data: &[u8]) -> Hash {
    Sha256::digest(data).into()
}

/// Hash multiple inputs as one message.
pub fn sha256_many(inputs: &[&[u8]]) -> Hash {
    let mut hasher = Sha256Hasher::new();
    for input in inputs {
        hasher.update(input);
    }
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_vector() {
        // SHA-256("abc")
        let hash = sha256(b"abc");
        assert_eq!(
            hex::encode(hash),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(sha256(b"test"), sha256(b"test"));
    }

    #[test]
    fn test_different_inputs() {
        assert_ne!(sha256(b"input1"), sha256(b"input2"));
    }

    #[test]
    fn test_streaming_matches_oneshot() {
        let oneshot = sha256(b"hello world");

        let mut hasher = Sha256Hasher::new();
        hasher.update(b"hello ");
        hasher.update(b"world");

        assert_eq!(oneshot, hasher.finalize());
    }

    #[test]
    fn test_sha256_many() {
        assert_eq!(sha256_many(&[b"hello ", b"world"]), sha256(b"hello world"));
    }
}
