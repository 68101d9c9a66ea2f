//! [`Bug`]: identity, committed packs, staging area, and the commit/read/
//! merge protocol that moves a bug's history in and out of a [`Store`].
//!
//! Grounded on the teacher crate's commit-building code (`internal::object::
//! commit`): linear parent chaining, a tree built from named entries, and a
//! ref updated only after every object beneath it is durable.

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::errors::BugError;
use crate::hash::ObjectHash;
use crate::operation::{Operation, OperationData};
use crate::pack::OperationPack;
use crate::snapshot::Snapshot;
use crate::store::{ObjectKind, Store, TreeEntry};

const OPS_ENTRY: &str = "ops";
const ROOT_ENTRY: &str = "root";
const MEDIA_ENTRY: &str = "media";
const EDIT_CLOCK_PREFIX: &str = "edit-clock-";
const CREATE_CLOCK_PREFIX: &str = "create-clock-";

/// Local bug ref namespace. Remote-tracking refs (`refs/remotes/<r>/bugs/<id>`)
/// are not special-cased beyond this prefix string: callers pass whichever
/// namespace they mean straight through to the `Store`.
pub const REF_PREFIX: &str = "refs/bugs/";

/// A single issue thread: committed history plus whatever has been staged
/// but not yet written to the store.
#[derive(Clone, Debug, Default)]
pub struct Bug {
    id: Option<ObjectHash>,
    create_time: u64,
    edit_time: u64,
    root_commit: Option<ObjectHash>,
    root_pack: Option<ObjectHash>,
    last_commit: Option<ObjectHash>,
    packs: Vec<OperationPack>,
    staging: OperationPack,
}

impl Bug {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stable identity, set once at the first commit. Immutable thereafter.
    ///
    /// # Panics
    ///
    /// Panics if the bug has never been committed. Calling this on an
    /// uncommitted bug is a programmer error, not a recoverable failure.
    pub fn id(&self) -> ObjectHash {
        self.id.expect("Bug::id called before the first commit")
    }

    pub fn create_time(&self) -> u64 {
        self.create_time
    }

    pub fn edit_time(&self) -> u64 {
        self.edit_time
    }

    pub fn root_commit(&self) -> Option<ObjectHash> {
        self.root_commit
    }

    pub fn root_pack(&self) -> Option<ObjectHash> {
        self.root_pack
    }

    pub fn last_commit(&self) -> Option<ObjectHash> {
        self.last_commit
    }

    pub fn packs(&self) -> &[OperationPack] {
        &self.packs
    }

    pub fn staging(&self) -> &OperationPack {
        &self.staging
    }

    pub fn append(&mut self, op: Operation) {
        self.staging.append(op);
    }

    /// Total operation count across committed packs and staging, and
    /// whether exactly one `Create` appears and it is first (spec §4.5).
    pub fn is_valid(&self) -> bool {
        let mut total = 0usize;
        let mut create_count = 0usize;
        let mut first_seen = false;
        let mut first_is_create = false;

        for pack in self.packs.iter().chain(std::iter::once(&self.staging)) {
            if !pack.is_valid() {
                return false;
            }
            for op in &pack.operations {
                if !first_seen {
                    first_seen = true;
                    first_is_create = op.is_create();
                }
                if op.is_create() {
                    create_count += 1;
                }
                total += 1;
            }
        }

        total >= 1 && first_is_create && create_count == 1
    }

    /// Replays every committed and staged operation, oldest first, into a
    /// fresh [`Snapshot`].
    pub fn compile(&self) -> Snapshot {
        let mut snapshot = Snapshot {
            id: self.id,
            ..Snapshot::default()
        };
        for pack in self.packs.iter().chain(std::iter::once(&self.staging)) {
            for op in &pack.operations {
                snapshot = op.apply(snapshot);
            }
        }
        snapshot
    }

    fn ref_name(&self) -> String {
        format!("{REF_PREFIX}{}", self.id())
    }

    /// Serializes staging, builds the commit tree, and advances the bug's
    /// ref. Fails if staging is empty.
    pub fn commit(&mut self, store: &dyn Store) -> Result<(), BugError> {
        if self.staging.is_empty() {
            return Err(BugError::InvalidState(
                "cannot commit an empty staging pack".into(),
            ));
        }
        debug!("committing staged operations");

        let pack_bytes = self.staging.serialize()?;
        let pack_hash = store.store_blob(&pack_bytes)?;

        if self.root_pack.is_none() {
            self.root_pack = Some(pack_hash);
        }

        self.edit_time = store.increment_edit_clock()?;
        let is_first_commit = self.last_commit.is_none();
        if is_first_commit {
            self.create_time = store.increment_create_clock()?;
        }

        let mut entries = vec![
            TreeEntry::blob(pack_hash, OPS_ENTRY),
            TreeEntry::blob(
                self.root_pack.expect("root_pack set above"),
                ROOT_ENTRY,
            ),
        ];

        let empty_blob = store.store_blob(&[])?;
        entries.push(TreeEntry::blob(
            empty_blob,
            format!("{EDIT_CLOCK_PREFIX}{}", self.edit_time),
        ));
        if is_first_commit {
            entries.push(TreeEntry::blob(
                empty_blob,
                format!("{CREATE_CLOCK_PREFIX}{}", self.create_time),
            ));
        }

        let media = self.staging.referenced_media();
        if !media.is_empty() {
            let media_entries: Vec<TreeEntry> = media
                .iter()
                .enumerate()
                .map(|(i, hash)| TreeEntry::blob(*hash, format!("file{i}")))
                .collect();
            let media_tree = store.store_tree(&media_entries)?;
            entries.push(TreeEntry::tree(media_tree, MEDIA_ENTRY));
        }

        let tree_hash = store.store_tree(&entries)?;

        let commit_hash = match self.last_commit {
            Some(parent) => store.store_commit_with_parent(&tree_hash, &parent)?,
            None => store.store_commit(&tree_hash)?,
        };

        if is_first_commit {
            self.id = Some(commit_hash);
            self.root_commit = Some(commit_hash);
        }
        self.last_commit = Some(commit_hash);

        store.update_ref(&self.ref_name(), &commit_hash)?;
        info!(commit = %commit_hash, "bug ref advanced");

        let mut committed = std::mem::take(&mut self.staging);
        committed.commit_hash = Some(commit_hash);
        self.packs.push(committed);

        Ok(())
    }

    /// Reads a bug back from `store` by enumerating `ref_name`'s commit
    /// chain oldest-first and replaying each commit's tree into a pack.
    /// Equivalent to `read_with_config(store, ref_name, &Config::default())`.
    pub fn read(store: &dyn Store, ref_name: &str) -> Result<Bug, BugError> {
        Self::read_with_config(store, ref_name, &Config::default())
    }

    /// Same as [`Bug::read`], but `config.warn_on_legacy_clock_tolerance`
    /// governs whether a missing clock entry logs a warning on its way to
    /// being tolerated (spec §4.2 step 3).
    pub fn read_with_config(
        store: &dyn Store,
        ref_name: &str,
        config: &Config,
    ) -> Result<Bug, BugError> {
        let id_str = ref_name
            .rsplit('/')
            .next()
            .ok_or_else(|| BugError::InvalidRef(ref_name.to_string()))?;
        if id_str.len() != 40 {
            return Err(BugError::InvalidRef(ref_name.to_string()));
        }
        let id = id_str
            .parse::<ObjectHash>()
            .map_err(|_| BugError::InvalidRef(ref_name.to_string()))?;

        let commits = store.list_commits(ref_name)?;
        let mut bug = Bug::new();

        for (i, commit) in commits.iter().enumerate() {
            let is_first = i == 0;
            let tree_hash = store.get_tree_hash(commit)?;
            let entries = store.list_tree_entries(&tree_hash)?;

            let ops_entries: Vec<&TreeEntry> =
                entries.iter().filter(|e| e.name == OPS_ENTRY).collect();
            if ops_entries.len() != 1 {
                return Err(BugError::InvalidTree(format!(
                    "commit {commit} does not carry exactly one `{OPS_ENTRY}` entry"
                )));
            }
            let root_entries: Vec<&TreeEntry> =
                entries.iter().filter(|e| e.name == ROOT_ENTRY).collect();
            if root_entries.len() != 1 {
                return Err(BugError::InvalidTree(format!(
                    "commit {commit} does not carry exactly one `{ROOT_ENTRY}` entry"
                )));
            }

            let edit_clock = parse_clock_entry(&entries, EDIT_CLOCK_PREFIX)?;
            let create_clock = parse_clock_entry(&entries, CREATE_CLOCK_PREFIX)?;

            if is_first {
                bug.root_pack = Some(root_entries[0].hash);
                match create_clock {
                    Some(n) => bug.create_time = n,
                    None => {
                        if config.warn_on_legacy_clock_tolerance {
                            warn!(%commit, "first commit missing create-clock entry, tolerating");
                        }
                    }
                }
            }

            match edit_clock {
                Some(n) => {
                    bug.edit_time = n;
                    store.witness_edit(n)?;
                }
                None => {
                    if config.warn_on_legacy_clock_tolerance {
                        warn!(%commit, "commit missing edit-clock entry, tolerating");
                    }
                }
            }
            if let Some(n) = create_clock {
                store.witness_create(n)?;
            }

            let pack_bytes = store.read_blob(&ops_entries[0].hash)?;
            let mut pack = OperationPack::deserialize(&pack_bytes)?;
            pack.commit_hash = Some(*commit);
            bug.packs.push(pack);

            bug.last_commit = Some(*commit);
            if is_first {
                bug.root_commit = Some(*commit);
                bug.id = Some(*commit);
            }
        }

        bug.id = Some(id);
        Ok(bug)
    }

    /// Reconciles this bug's head with `other`'s, rebasing local divergent
    /// commits on top of `other`'s new ones when they diverge, or doing
    /// nothing when `other` has no commits this bug lacks.
    pub fn merge(&mut self, store: &dyn Store, other: &Bug) -> Result<bool, BugError> {
        if self.id != other.id {
            return Err(BugError::InvalidState(
                "cannot merge bugs with different ids".into(),
            ));
        }
        if !other.staging.is_empty() {
            return Err(BugError::InvalidState(
                "cannot merge from a bug with non-empty staging".into(),
            ));
        }
        let local_last = self
            .last_commit
            .ok_or_else(|| BugError::InvalidState("bug has no commit history".into()))?;
        let other_last = other
            .last_commit
            .ok_or_else(|| BugError::InvalidState("other bug has no commit history".into()))?;

        let ancestor = store.find_common_ancestor(&local_last, &other_last)?;
        let ancestor_index = self
            .packs
            .iter()
            .position(|p| p.commit_hash == Some(ancestor))
            .ok_or_else(|| {
                BugError::InvalidState(
                    "common ancestor commit not found among local packs".into(),
                )
            })?;

        if other.packs.len() == ancestor_index + 1 {
            debug!("merge: other has no new commits, nothing to do");
            return Ok(false);
        }

        let mut new_packs: Vec<OperationPack> = self.packs[..=ancestor_index].to_vec();
        for pack in &other.packs[ancestor_index + 1..] {
            new_packs.push(pack.clone());
        }
        self.last_commit = other.packs[other.packs.len() - 1].commit_hash;

        for pack in &self.packs[ancestor_index + 1..] {
            let commit_hash = pack
                .commit_hash
                .expect("committed pack always carries a commit hash");
            let tree_hash = store.get_tree_hash(&commit_hash)?;
            let parent = self.last_commit.expect("set above");
            let new_commit = store.store_commit_with_parent(&tree_hash, &parent)?;

            let mut rebased = pack.clone();
            rebased.commit_hash = Some(new_commit);
            new_packs.push(rebased);
            self.last_commit = Some(new_commit);
        }

        self.packs = new_packs;
        store.update_ref(&self.ref_name(), &self.last_commit.expect("set above"))?;
        info!(commit = %self.last_commit.unwrap(), "bug ref advanced by merge");

        Ok(true)
    }

    /// Looks up the unique local bug whose id starts with `prefix`.
    pub fn find_local(store: &dyn Store, prefix: &str) -> Result<Bug, BugError> {
        let ids = store.list_ids(REF_PREFIX)?;
        let matches: Vec<&String> = ids.iter().filter(|id| id.starts_with(prefix)).collect();
        match matches.len() {
            0 => Err(BugError::NotFound(prefix.to_string())),
            1 => Bug::read(store, &format!("{REF_PREFIX}{}", matches[0])),
            _ => Err(BugError::Ambiguous {
                prefix: prefix.to_string(),
                matches: matches.into_iter().cloned().collect(),
            }),
        }
    }
}

fn parse_clock_entry(entries: &[TreeEntry], prefix: &str) -> Result<Option<u64>, BugError> {
    let matches: Vec<&TreeEntry> = entries
        .iter()
        .filter(|e| e.kind == ObjectKind::Blob && e.name.starts_with(prefix))
        .collect();
    match matches.len() {
        0 => Ok(None),
        1 => {
            let n = matches[0].name[prefix.len()..]
                .parse::<u64>()
                .map_err(|_| {
                    BugError::InvalidTree(format!(
                        "unparseable clock entry `{}`",
                        matches[0].name
                    ))
                })?;
            Ok(Some(n))
        }
        _ => Err(BugError::InvalidTree(format!(
            "more than one `{prefix}*` entry in a single tree"
        ))),
    }
}
