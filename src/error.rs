//! User-facing error type
//!
//! `ValidationError` covers the recoverable mistakes a caller can make
//! against a repository: mutating in detached mode, referencing an
//! unknown ref, saving with unresolved conflicts, and so on. Every other
//! failure (I/O, corrupt metadata, broken invariants) propagates as a
//! plain `anyhow::Error` and is never caught.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ValidationError(String);

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        ValidationError(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}
