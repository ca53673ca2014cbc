//! Core error types for commitgraph-core.
//!
//! Uses `thiserror` for structured, matchable error variants. Only input
//! problems are reported through [`CoreError`]; lookups with ids the graph
//! never handed out are programming errors and panic instead.

use thiserror::Error;

use crate::commit::CommitHash;

/// Errors produced while parsing log input or building a graph.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A commit hash was empty or contained whitespace.
    #[error("invalid commit hash: '{value}'")]
    InvalidHash { value: String },

    /// A log or ref record could not be parsed.
    #[error("malformed record at line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    /// The same commit hash appeared twice in the input.
    #[error("duplicate commit: {hash}")]
    DuplicateCommit { hash: CommitHash },

    /// A parent is laid out after one of its children, so the input does
    /// not follow the requested commit order.
    #[error("parent {parent} of commit {child} appears after it in the input")]
    ParentOutOfOrder {
        child: CommitHash,
        parent: CommitHash,
    },

    /// A structural invariant of the built graph was violated.
    #[error("graph inconsistency: {reason}")]
    GraphInconsistency { reason: String },
}
