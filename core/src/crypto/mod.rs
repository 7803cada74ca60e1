//! Key hashing for indices and key lookups
//!
//! A key hash is a domain-separated digest over an ordered sequence of
//! column name / value pairs. Names are folded to lower case and values are
//! reduced to their canonical bytes, so two keys that compare equal under
//! semantic-type equality always produce the same hash.

mod hasher;

pub use hasher::{SecureHasher, DigestHasher, Sha256Hasher, Blake2sHasher, KeccakHasher};

use std::fmt::{Display, Formatter, Result as FmtResult};
use serde::{Serialize, Deserialize};

use crate::config::HashAlgorithm;
use crate::models::Value;

/// Domain prefix for key hashes
pub const KEY_DOMAIN: &str = "ROWBOUND_KEY";

/// Hex-encoded key digest
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KeyHash(String);

impl KeyHash {
    /// Sentinel produced for all-null keys under the ignore-nulls policy.
    /// Unique indices never treat it as a collision.
    pub const EMPTY: KeyHash = KeyHash(String::new());

    /// Whether this is the EMPTY sentinel
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Textual form
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for KeyHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        if self.is_empty() {
            write!(f, "<empty>")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Create a hasher for an algorithm
pub fn hasher_for(algorithm: HashAlgorithm) -> Box<dyn SecureHasher> {
    match algorithm {
        HashAlgorithm::Sha256 => Box::new(Sha256Hasher::new()),
        HashAlgorithm::Blake2s => Box::new(Blake2sHasher::new()),
        HashAlgorithm::Keccak256 => Box::new(KeccakHasher::new()),
    }
}

/// Computes key hashes with a fixed algorithm and null policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct HashComputer {
    algorithm: HashAlgorithm,
    ignore_nulls: bool,
}

impl HashComputer {
    /// Create a hash computer
    pub fn new(algorithm: HashAlgorithm, ignore_nulls: bool) -> Self {
        HashComputer { algorithm, ignore_nulls }
    }

    /// Digest algorithm
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Whether all-null keys hash to [`KeyHash::EMPTY`]
    pub fn ignores_nulls(&self) -> bool {
        self.ignore_nulls
    }

    /// Hash an ordered sequence of name / value pairs.
    ///
    /// Pair order participates in the digest. If every value is null and
    /// the ignore-nulls policy is active the EMPTY sentinel is returned.
    pub fn compute<'a, I>(&self, pairs: I) -> KeyHash
    where
        I: IntoIterator<Item = (&'a str, &'a Value)>,
    {
        let pairs: Vec<(&str, &Value)> = pairs.into_iter().collect();
        if self.ignore_nulls && pairs.iter().all(|(_, value)| value.is_null()) {
            return KeyHash::EMPTY;
        }

        let mut hasher = hasher_for(self.algorithm);
        hasher.begin_domain(KEY_DOMAIN);
        hasher.update(&(pairs.len() as u32).to_be_bytes());
        for (name, value) in pairs {
            hasher.update_element(name.to_lowercase().as_bytes());
            hasher.update_element(&value.canonical_bytes());
        }
        KeyHash(hex::encode(hasher.finalize_reset()))
    }
}
