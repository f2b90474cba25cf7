//! Resolved revision metadata.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, Local};

/// Length of a full commit hash in hex characters.
pub const HASH_LEN: usize = 40;

/// A full 40-character lowercase hexadecimal commit hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommitHash(String);

/// Error returned when a string is not a full commit hash.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid commit hash {0:?}: expected {HASH_LEN} hex characters")]
pub struct InvalidHash(pub String);

impl CommitHash {
    /// The all-zero hash used for the sentinel revision.
    pub fn zero() -> Self {
        Self("0".repeat(HASH_LEN))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The first `len` characters, clamped to the hash length.
    pub fn prefix(&self, len: usize) -> &str {
        &self.0[..len.min(HASH_LEN)]
    }
}

impl FromStr for CommitHash {
    type Err = InvalidHash;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() == HASH_LEN && s.bytes().all(|b| b.is_ascii_hexdigit()) {
            Ok(Self(s.to_ascii_lowercase()))
        } else {
            Err(InvalidHash(s.to_string()))
        }
    }
}

impl fmt::Display for CommitHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Revision metadata for a working tree, resolved once per invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionInfo {
    hash: CommitHash,
    timestamp: DateTime<FixedOffset>,
    dirty: bool,
}

impl RevisionInfo {
    pub fn new(hash: CommitHash, timestamp: DateTime<FixedOffset>, dirty: bool) -> Self {
        Self {
            hash,
            timestamp,
            dirty,
        }
    }

    /// The "no version control" revision: all-zero hash stamped with `now`.
    pub fn sentinel(now: DateTime<FixedOffset>) -> Self {
        Self::new(CommitHash::zero(), now, false)
    }

    /// [`sentinel`](Self::sentinel) at the current local wall-clock time.
    pub fn sentinel_now() -> Self {
        Self::sentinel(Local::now().fixed_offset())
    }

    pub fn hash(&self) -> &CommitHash {
        &self.hash
    }

    /// Commit time with the committer's UTC offset.
    pub fn timestamp(&self) -> DateTime<FixedOffset> {
        self.timestamp
    }

    /// Whether the working tree has uncommitted or untracked changes.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}
