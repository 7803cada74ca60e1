//! Secure hasher implementation with domain separation
//!
//! This module provides a trait for secure hasher implementations
//! and a generic implementation over any 256-bit `Digest`.

use sha2::{Sha256, Digest};
use blake2::Blake2s256;
use sha3::Keccak256;
use std::fmt::Debug;

/// SecureHasher trait for domain-separated hashing
pub trait SecureHasher: Debug + Send + Sync {
    /// Update the hasher with new data
    fn update(&mut self, data: &[u8]);

    /// Finalize the hash, return the result and reset the hasher
    fn finalize_reset(&mut self) -> [u8; 32];

    /// Start a domain-separated hash
    fn begin_domain(&mut self, domain: &str) {
        self.update(domain.as_bytes());
        // Domain length prevents prefix collisions between domains
        self.update(&[domain.len() as u8]);
    }

    /// Add one length-prefixed element
    fn update_element(&mut self, element: &[u8]) {
        self.update(&(element.len() as u32).to_be_bytes());
        self.update(element);
    }
}

/// SecureHasher over any digest with a 32-byte output
#[derive(Debug, Clone)]
pub struct DigestHasher<D> {
    inner: D,
}

impl<D: Digest> DigestHasher<D> {
    /// Create a new hasher
    pub fn new() -> Self {
        DigestHasher { inner: D::new() }
    }
}

impl<D: Digest> Default for DigestHasher<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> SecureHasher for DigestHasher<D>
where
    D: Digest + Debug + Send + Sync,
{
    fn update(&mut self, data: &[u8]) {
        Digest::update(&mut self.inner, data);
    }

    fn finalize_reset(&mut self) -> [u8; 32] {
        let digest = std::mem::replace(&mut self.inner, D::new());
        let result = digest.finalize();
        let mut output = [0u8; 32];
        output.copy_from_slice(&result[..32]);
        output
    }
}

/// SHA-256 implementation of SecureHasher
pub type Sha256Hasher = DigestHasher<Sha256>;

/// Blake2s implementation of SecureHasher
pub type Blake2sHasher = DigestHasher<Blake2s256>;

/// Keccak-256 implementation of SecureHasher
pub type KeccakHasher = DigestHasher<Keccak256>;
