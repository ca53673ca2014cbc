//! Commit value types produced by the log reader.
//!
//! [`Commit`] is immutable once parsed. [`CommitHash`] is an opaque,
//! validated identifier; the graph never interprets its contents beyond
//! equality, so abbreviated or non-git hashes work as well.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::CoreError;

/// Number of characters shown by [`CommitHash::short`].
const SHORT_HASH_LEN: usize = 7;

/// A commit identifier: non-empty and free of whitespace.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CommitHash(String);

impl CommitHash {
    /// Validates and wraps a hash string.
    pub fn parse(value: impl Into<String>) -> Result<Self, CoreError> {
        let value = value.into();
        if value.is_empty() || value.chars().any(char::is_whitespace) {
            return Err(CoreError::InvalidHash { value });
        }
        Ok(CommitHash(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form used in listings.
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(SHORT_HASH_LEN) {
            Some((end, _)) => &self.0[..end],
            None => &self.0,
        }
    }
}

impl fmt::Display for CommitHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CommitHash {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CommitHash::parse(s)
    }
}

impl TryFrom<String> for CommitHash {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        CommitHash::parse(value)
    }
}

impl From<CommitHash> for String {
    fn from(hash: CommitHash) -> Self {
        hash.0
    }
}

/// One change-set as reported by the version-control tool.
///
/// Most commits have one or two parents, so parents are stored inline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub hash: CommitHash,
    /// Parent hashes in the tool's order; the first one is the first parent.
    pub parents: SmallVec<[CommitHash; 2]>,
    pub author: String,
    /// Seconds since the unix epoch.
    pub timestamp: i64,
    pub message: String,
}

impl Commit {
    pub fn new(
        hash: CommitHash,
        parents: impl IntoIterator<Item = CommitHash>,
        author: impl Into<String>,
        timestamp: i64,
        message: impl Into<String>,
    ) -> Self {
        Commit {
            hash,
            parents: parents.into_iter().collect(),
            author: author.into(),
            timestamp,
            message: message.into(),
        }
    }

    pub fn first_parent(&self) -> Option<&CommitHash> {
        self.parents.first()
    }

    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }

    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }
}

/// Ref names attached to commits, in branch priority order.
///
/// The first entry wins when two refs would claim the same line of
/// development during branch assignment.
pub type Refs = IndexMap<CommitHash, Vec<String>>;
