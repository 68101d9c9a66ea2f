//! Error types for the `bugs-core` crate.
//!
//! This module defines a unified error enumeration raised by the operation-log
//! data model: commit/read/merge protocol failures, malformed trees, and
//! ambiguous or missing bug lookups. A `Store` implementation's own failures
//! are expected to flow through the transparent `Store` variant via `?`.
//!
//! Notes:
//! - Each variant carries contextual details via its message payload.
//! - Calling [`crate::bug::Bug::id`] on a bug that has never been committed
//!   is deliberately *not* one of these variants: per spec it is a
//!   programmer error, so it panics instead of returning a `Result`.

use thiserror::Error;

/// Unified error enumeration for `bugs-core`.
#[derive(Error, Debug)]
pub enum BugError {
    /// No bug matches the given prefix.
    #[error("no bug found matching prefix `{0}`")]
    NotFound(String),

    /// More than one bug matches the given prefix.
    #[error("multiple bugs match prefix `{prefix}`: {matches:?}")]
    Ambiguous { prefix: String, matches: Vec<String> },

    /// A ref's terminal id component is not 40 hex characters.
    #[error("ref `{0}` does not carry a valid 40-hex-character bug id")]
    InvalidRef(String),

    /// A commit's tree is missing a mandatory entry, carries an unparseable
    /// clock entry, or its `ops` blob failed to deserialize.
    #[error("invalid tree: {0}")]
    InvalidTree(String),

    /// A protocol precondition was violated: commit on empty staging, merge
    /// of unrelated bugs, merge with non-empty `other.staging`, merge of a
    /// bug with no commit history.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Pass-through failure from the backing `Store` implementation.
    #[error(transparent)]
    Store(#[from] Box<dyn std::error::Error + Send + Sync + 'static>),
}
