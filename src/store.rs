//! The `Store` contract: the sole I/O boundary of `bugs-core`.
//!
//! Everything here is deliberately thin — per spec §1 the storage backend
//! (commit/tree/blob storage, ref management, ancestor search, ref listing)
//! is an external collaborator. `bugs-core` only ever calls through this
//! trait; it ships no concrete implementation (the in-memory fake under
//! `tests/support` exists purely to exercise the protocol in this crate's
//! own tests).

use crate::hash::ObjectHash;

/// The two object kinds a tree entry built by the commit protocol can name.
/// A full Git object model also has commits and tags, but the commit
/// protocol (spec §4.1) never places one of those inside a tree it builds,
/// so `Store` implementations only need to round-trip these two.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Blob,
    Tree,
}

/// One named entry of a tree object, as built by the commit protocol
/// (spec §4.1 step 4) or returned by `Store::list_tree_entries` (spec §4.2
/// step 1).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeEntry {
    pub kind: ObjectKind,
    pub hash: ObjectHash,
    pub name: String,
}

impl TreeEntry {
    pub fn blob(hash: ObjectHash, name: impl Into<String>) -> Self {
        Self {
            kind: ObjectKind::Blob,
            hash,
            name: name.into(),
        }
    }

    pub fn tree(hash: ObjectHash, name: impl Into<String>) -> Self {
        Self {
            kind: ObjectKind::Tree,
            hash,
            name: name.into(),
        }
    }
}

/// The contract a content-addressed, ref-carrying backend must satisfy for
/// `bugs-core` to build and read bug histories on top of it (spec §6.1).
///
/// All methods return the crate's own [`crate::errors::BugError`]; a
/// concrete implementation's own error type should convert into it (e.g.
/// via `.map_err(|e| BugError::Store(Box::new(e)))`).
///
/// The Lamport clock (spec §3/§9) lives entirely behind the four
/// `*_clock`/`witness_*` methods — it is process-wide state the store owns,
/// never a type `bugs-core` constructs itself.
pub trait Store {
    fn store_blob(&self, bytes: &[u8]) -> Result<ObjectHash, crate::errors::BugError>;
    fn read_blob(&self, hash: &ObjectHash) -> Result<Vec<u8>, crate::errors::BugError>;

    fn store_tree(&self, entries: &[TreeEntry]) -> Result<ObjectHash, crate::errors::BugError>;
    fn list_tree_entries(
        &self,
        hash: &ObjectHash,
    ) -> Result<Vec<TreeEntry>, crate::errors::BugError>;

    fn get_tree_hash(&self, commit: &ObjectHash) -> Result<ObjectHash, crate::errors::BugError>;
    fn store_commit(&self, tree: &ObjectHash) -> Result<ObjectHash, crate::errors::BugError>;
    fn store_commit_with_parent(
        &self,
        tree: &ObjectHash,
        parent: &ObjectHash,
    ) -> Result<ObjectHash, crate::errors::BugError>;

    /// Oldest-first along the ancestor chain of `ref_name`.
    fn list_commits(&self, ref_name: &str) -> Result<Vec<ObjectHash>, crate::errors::BugError>;
    fn list_refs(&self, prefix: &str) -> Result<Vec<String>, crate::errors::BugError>;
    /// Terminal ref-name component of every ref matching `prefix`.
    fn list_ids(&self, prefix: &str) -> Result<Vec<String>, crate::errors::BugError>;

    /// Atomic, fast-forward-enforced ref update.
    fn update_ref(&self, ref_name: &str, hash: &ObjectHash) -> Result<(), crate::errors::BugError>;

    fn find_common_ancestor(
        &self,
        a: &ObjectHash,
        b: &ObjectHash,
    ) -> Result<ObjectHash, crate::errors::BugError>;

    fn increment_create_clock(&self) -> Result<u64, crate::errors::BugError>;
    fn increment_edit_clock(&self) -> Result<u64, crate::errors::BugError>;
    fn witness_create(&self, n: u64) -> Result<(), crate::errors::BugError>;
    fn witness_edit(&self, n: u64) -> Result<(), crate::errors::BugError>;
}
