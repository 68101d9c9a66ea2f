//! An in-memory `Store` fake: real (not mocked) content-addressed blob,
//! tree and commit storage, ref tracking with fast-forward enforcement,
//! and a BFS common-ancestor search over linear parent chains. Enough to
//! drive `Bug::commit`/`read`/`merge` end to end without a real backend.

use std::collections::HashMap;
use std::sync::Mutex;

use bugs_core::errors::BugError;
use bugs_core::hash::ObjectHash;
use bugs_core::store::{ObjectKind, Store, TreeEntry};
use sha1::{Digest, Sha1};

#[derive(Clone)]
struct CommitRecord {
    tree: ObjectHash,
    parent: Option<ObjectHash>,
}

#[derive(Default)]
struct Inner {
    blobs: HashMap<ObjectHash, Vec<u8>>,
    trees: HashMap<ObjectHash, Vec<TreeEntry>>,
    commits: HashMap<ObjectHash, CommitRecord>,
    refs: HashMap<String, ObjectHash>,
    create_clock: u64,
    edit_clock: u64,
}

/// Content-addressed, single-process fake backing store.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

fn hash_with_tag(tag: &[u8], content: &[u8]) -> ObjectHash {
    let mut hasher = Sha1::new();
    hasher.update(tag);
    hasher.update(content);
    let digest: [u8; 20] = hasher.finalize().into();
    ObjectHash::from_bytes(&digest).expect("sha1 digest is always 20 bytes")
}

fn canonical_tree_bytes(entries: &[TreeEntry]) -> Vec<u8> {
    let mut sorted: Vec<&TreeEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));
    let mut bytes = Vec::new();
    for entry in sorted {
        bytes.push(match entry.kind {
            ObjectKind::Blob => 0u8,
            ObjectKind::Tree => 1u8,
        });
        bytes.extend((entry.name.len() as u32).to_be_bytes());
        bytes.extend(entry.name.as_bytes());
        bytes.extend(entry.hash.as_ref());
    }
    bytes
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies every blob, tree and commit `other` holds into `self`,
    /// leaving refs untouched. Stands in for a fetch between two clones
    /// of the same object store in these tests; content-addressing means
    /// a hash already present in `self` is always identical content.
    pub fn fetch_from(&self, other: &MemoryStore) {
        let other_inner = other.inner.lock().unwrap();
        let mut inner = self.inner.lock().unwrap();
        for (hash, bytes) in other_inner.blobs.iter() {
            inner.blobs.entry(*hash).or_insert_with(|| bytes.clone());
        }
        for (hash, entries) in other_inner.trees.iter() {
            inner.trees.entry(*hash).or_insert_with(|| entries.clone());
        }
        for (hash, record) in other_inner.commits.iter() {
            inner.commits.entry(*hash).or_insert_with(|| record.clone());
        }
    }

    /// Ancestor chain of `commit`, nearest-first (commit itself, then its
    /// parent, and so on to the root).
    fn ancestors(inner: &Inner, commit: ObjectHash) -> Vec<ObjectHash> {
        let mut chain = Vec::new();
        let mut current = Some(commit);
        while let Some(c) = current {
            chain.push(c);
            current = inner.commits.get(&c).and_then(|r| r.parent);
        }
        chain
    }
}

impl Store for MemoryStore {
    fn store_blob(&self, bytes: &[u8]) -> Result<ObjectHash, BugError> {
        let hash = hash_with_tag(b"blob", bytes);
        self.inner
            .lock()
            .unwrap()
            .blobs
            .insert(hash, bytes.to_vec());
        Ok(hash)
    }

    fn read_blob(&self, hash: &ObjectHash) -> Result<Vec<u8>, BugError> {
        self.inner
            .lock()
            .unwrap()
            .blobs
            .get(hash)
            .cloned()
            .ok_or_else(|| BugError::InvalidTree(format!("no blob for hash {hash}")))
    }

    fn store_tree(&self, entries: &[TreeEntry]) -> Result<ObjectHash, BugError> {
        let bytes = canonical_tree_bytes(entries);
        let hash = hash_with_tag(b"tree", &bytes);
        self.inner
            .lock()
            .unwrap()
            .trees
            .insert(hash, entries.to_vec());
        Ok(hash)
    }

    fn list_tree_entries(&self, hash: &ObjectHash) -> Result<Vec<TreeEntry>, BugError> {
        self.inner
            .lock()
            .unwrap()
            .trees
            .get(hash)
            .cloned()
            .ok_or_else(|| BugError::InvalidTree(format!("no tree for hash {hash}")))
    }

    fn get_tree_hash(&self, commit: &ObjectHash) -> Result<ObjectHash, BugError> {
        self.inner
            .lock()
            .unwrap()
            .commits
            .get(commit)
            .map(|r| r.tree)
            .ok_or_else(|| BugError::InvalidTree(format!("no commit for hash {commit}")))
    }

    fn store_commit(&self, tree: &ObjectHash) -> Result<ObjectHash, BugError> {
        let hash = hash_with_tag(b"commit", tree.as_ref());
        self.inner.lock().unwrap().commits.insert(
            hash,
            CommitRecord {
                tree: *tree,
                parent: None,
            },
        );
        Ok(hash)
    }

    fn store_commit_with_parent(
        &self,
        tree: &ObjectHash,
        parent: &ObjectHash,
    ) -> Result<ObjectHash, BugError> {
        let mut content = tree.as_ref().to_vec();
        content.extend(parent.as_ref());
        let hash = hash_with_tag(b"commit", &content);
        self.inner.lock().unwrap().commits.insert(
            hash,
            CommitRecord {
                tree: *tree,
                parent: Some(*parent),
            },
        );
        Ok(hash)
    }

    fn list_commits(&self, ref_name: &str) -> Result<Vec<ObjectHash>, BugError> {
        let inner = self.inner.lock().unwrap();
        let Some(&head) = inner.refs.get(ref_name) else {
            return Ok(vec![]);
        };
        let mut chain = Self::ancestors(&inner, head);
        chain.reverse();
        Ok(chain)
    }

    fn list_refs(&self, prefix: &str) -> Result<Vec<String>, BugError> {
        let inner = self.inner.lock().unwrap();
        let mut refs: Vec<String> = inner
            .refs
            .keys()
            .filter(|r| r.starts_with(prefix))
            .cloned()
            .collect();
        refs.sort();
        Ok(refs)
    }

    fn list_ids(&self, prefix: &str) -> Result<Vec<String>, BugError> {
        let refs = self.list_refs(prefix)?;
        Ok(refs
            .into_iter()
            .map(|r| r.rsplit('/').next().unwrap().to_string())
            .collect())
    }

    fn update_ref(&self, ref_name: &str, hash: &ObjectHash) -> Result<(), BugError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(&current) = inner.refs.get(ref_name) {
            let ancestors = Self::ancestors(&inner, *hash);
            if !ancestors.contains(&current) {
                return Err(BugError::InvalidState(format!(
                    "ref `{ref_name}` update is not a fast-forward"
                )));
            }
        }
        inner.refs.insert(ref_name.to_string(), *hash);
        Ok(())
    }

    fn find_common_ancestor(&self, a: &ObjectHash, b: &ObjectHash) -> Result<ObjectHash, BugError> {
        let inner = self.inner.lock().unwrap();
        let a_chain = Self::ancestors(&inner, *a);
        let a_set: std::collections::HashSet<ObjectHash> = a_chain.into_iter().collect();
        for candidate in Self::ancestors(&inner, *b) {
            if a_set.contains(&candidate) {
                return Ok(candidate);
            }
        }
        Err(BugError::InvalidState(
            "no common ancestor between commits".into(),
        ))
    }

    fn increment_create_clock(&self) -> Result<u64, BugError> {
        let mut inner = self.inner.lock().unwrap();
        inner.create_clock += 1;
        Ok(inner.create_clock)
    }

    fn increment_edit_clock(&self) -> Result<u64, BugError> {
        let mut inner = self.inner.lock().unwrap();
        inner.edit_clock += 1;
        Ok(inner.edit_clock)
    }

    fn witness_create(&self, n: u64) -> Result<(), BugError> {
        let mut inner = self.inner.lock().unwrap();
        inner.create_clock = inner.create_clock.max(n);
        Ok(())
    }

    fn witness_edit(&self, n: u64) -> Result<(), BugError> {
        let mut inner = self.inner.lock().unwrap();
        inner.edit_clock = inner.edit_clock.max(n);
        Ok(())
    }
}
