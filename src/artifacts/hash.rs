//! Content hash identifier (SHA-256)
//!
//! A `Hash` is a 64-character hexadecimal string identifying the content of
//! an object or the canonical serialization of a checkpoint. Objects are
//! stored flat, keyed by their full hash, with no hash-prefix directory
//! split.

use sha2::{Digest, Sha256};
use std::fmt;

pub const HASH_LENGTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash(String);

impl Hash {
    pub fn try_parse(id: impl Into<String>) -> anyhow::Result<Self> {
        let id = id.into();

        if id.len() != HASH_LENGTH {
            anyhow::bail!("invalid hash length: {}", id.len());
        }
        if !id.chars().all(|c| c.is_ascii_hexdigit()) {
            anyhow::bail!("invalid hash characters: {}", id);
        }

        Ok(Self(id))
    }

    pub fn of(bytes: &[u8]) -> Self {
        let digest = Sha256::digest(bytes);
        Self(format!("{:x}", digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Hash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
