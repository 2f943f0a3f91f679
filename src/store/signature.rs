//! History signatures
//!
//! A signature is a linear SHA-256 chain over one key's ordered changes. Each
//! change contributes exactly the line
//!
//! ```text
//! <id>:<key>:<op>:<diff>\n
//! ```
//!
//! with `diff` hashed as the literal stored bytes. Two payloads that are equal
//! as JSON but differ in spelling (key order, whitespace) sign differently.

use std::fmt;

use sha2::{Digest, Sha256};

use super::errors::StoreResult;
use super::op::Change;

/// Number of changes folded and the lowercase hex SHA-256 digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub count: u64,
    pub digest: String,
}

impl Signature {
    /// Folds a fallible change sequence. The first error aborts.
    pub fn compute<I>(changes: I) -> StoreResult<Signature>
    where
        I: IntoIterator<Item = StoreResult<Change>>,
    {
        let mut builder = SignatureBuilder::new();
        for change in changes {
            builder.update(&change?);
        }
        Ok(builder.finish())
    }

    /// Folds changes already in memory
    pub fn of_changes<'a, I>(changes: I) -> Signature
    where
        I: IntoIterator<Item = &'a Change>,
    {
        let mut builder = SignatureBuilder::new();
        for change in changes {
            builder.update(change);
        }
        builder.finish()
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.count, self.digest)
    }
}

/// Streaming signature computation.
pub struct SignatureBuilder {
    hasher: Sha256,
    count: u64,
}

impl SignatureBuilder {
    pub fn new() -> Self {
        Self {
            hasher: Sha256::new(),
            count: 0,
        }
    }

    /// Appends one change line to the digest input
    pub fn update(&mut self, change: &Change) {
        self.hasher.update(change.id.as_bytes());
        self.hasher.update(b":");
        self.hasher.update(change.key.as_bytes());
        self.hasher.update(b":");
        self.hasher.update(change.op.as_bytes());
        self.hasher.update(b":");
        self.hasher.update(change.diff.as_bytes());
        self.hasher.update(b"\n");
        self.count += 1;
    }

    pub fn finish(self) -> Signature {
        Signature {
            count: self.count,
            digest: format!("{:x}", self.hasher.finalize()),
        }
    }
}

impl Default for SignatureBuilder {
    fn default() -> Self {
        Self::new()
    }
}
