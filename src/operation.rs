//! The operation taxonomy (spec §3, §3.1, §9).
//!
//! An [`Operation`] is the unit event appended to a [`crate::bug::Bug`]'s
//! staging area. Every variant exposes the same four-method surface
//! ([`OperationData`]) the way the teacher crate's git object family
//! exposes a common `ObjectTrait` — but dispatch here is a plain enum match
//! rather than dynamic dispatch, since the taxonomy is closed and known at
//! compile time (spec §9's "tagged variant over the fixed operation
//! taxonomy").

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::hash::ObjectHash;
use crate::snapshot::{Comment, Snapshot, Status};

/// Content hash of a single operation's canonical serialized form.
///
/// Used to target an earlier operation from [`EditComment`] or
/// [`SetMetadata`] without relying on its position in the log — position
/// shifts under rebase (spec §4.3), content does not. Grounded on the
/// teacher's `IntegrityHash` (always SHA-256, independent of whatever
/// `HashKind` the backing `Store` happens to use for object hashes).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperationId([u8; 32]);

impl OperationId {
    pub fn compute(op: &Operation) -> Self {
        let bytes = serde_json::to_vec(op).expect("Operation serializes to JSON infallibly");
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        Self(hasher.finalize().into())
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OperationId({})", self.to_hex())
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for OperationId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for OperationId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(&s, &mut bytes).map_err(serde::de::Error::custom)?;
        Ok(Self(bytes))
    }
}

/// The common surface every operation variant exposes.
pub trait OperationData {
    fn author(&self) -> &str;
    fn unix_time(&self) -> u64;
    /// Content hashes of media this operation references. Empty for most
    /// variants.
    fn files(&self) -> &[ObjectHash];
    /// Pure replay transform: fold this operation into a snapshot.
    fn apply(&self, snapshot: Snapshot) -> Snapshot;
}

/// The bug's entry point. Bundles a title with the first comment so a bug
/// is never observed title-less. Exactly one `Create` may appear across a
/// bug's packs + staging (spec §4.5).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Create {
    pub author: String,
    pub unix_time: u64,
    pub title: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<ObjectHash>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SetTitle {
    pub author: String,
    pub unix_time: u64,
    pub title: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AddComment {
    pub author: String,
    pub unix_time: u64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<ObjectHash>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EditComment {
    pub author: String,
    pub unix_time: u64,
    /// The `Create` or `AddComment` operation this edits. An edit whose
    /// target cannot be found among the comments replayed so far is
    /// dropped silently rather than erroring — operations must replay in
    /// an order-insensitive way (spec §9), and a rebase never reorders an
    /// edit ahead of the comment it targets since both keep their relative
    /// order within (and across) packs.
    pub target: OperationId,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<ObjectHash>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SetStatus {
    pub author: String,
    pub unix_time: u64,
    pub status: Status,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LabelChange {
    pub author: String,
    pub unix_time: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub added: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub removed: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SetMetadata {
    pub author: String,
    pub unix_time: u64,
    pub target: OperationId,
    pub key: String,
    pub value: String,
}

/// One-byte tag identifying an operation variant in the pack's binary
/// encoding (spec §6.2 "type tag and payload"). Deserialization rejects any
/// tag not listed here.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum OperationTag {
    Create = 0,
    SetTitle = 1,
    AddComment = 2,
    EditComment = 3,
    SetStatus = 4,
    LabelChange = 5,
    SetMetadata = 6,
}

impl OperationTag {
    pub fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Create),
            1 => Some(Self::SetTitle),
            2 => Some(Self::AddComment),
            3 => Some(Self::EditComment),
            4 => Some(Self::SetStatus),
            5 => Some(Self::LabelChange),
            6 => Some(Self::SetMetadata),
            _ => None,
        }
    }
}

/// The operation taxonomy (spec §3.1): tagged variant over the closed set
/// of mutations a bug's log can carry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    Create(Create),
    SetTitle(SetTitle),
    AddComment(AddComment),
    EditComment(EditComment),
    SetStatus(SetStatus),
    LabelChange(LabelChange),
    SetMetadata(SetMetadata),
}

impl Operation {
    pub fn tag(&self) -> OperationTag {
        match self {
            Operation::Create(_) => OperationTag::Create,
            Operation::SetTitle(_) => OperationTag::SetTitle,
            Operation::AddComment(_) => OperationTag::AddComment,
            Operation::EditComment(_) => OperationTag::EditComment,
            Operation::SetStatus(_) => OperationTag::SetStatus,
            Operation::LabelChange(_) => OperationTag::LabelChange,
            Operation::SetMetadata(_) => OperationTag::SetMetadata,
        }
    }

    pub fn is_create(&self) -> bool {
        matches!(self, Operation::Create(_))
    }

    pub fn id(&self) -> OperationId {
        OperationId::compute(self)
    }

    /// Basic per-operation validity: non-empty author, and a non-empty
    /// title for the operation that defines one. Delegated into by
    /// `OperationPack::is_valid` (spec §3 "every pack is individually
    /// valid").
    pub fn is_valid(&self) -> bool {
        if self.author().trim().is_empty() {
            return false;
        }
        match self {
            Operation::Create(c) => !c.title.trim().is_empty(),
            Operation::SetTitle(s) => !s.title.trim().is_empty(),
            _ => true,
        }
    }
}

impl OperationData for Operation {
    fn author(&self) -> &str {
        match self {
            Operation::Create(op) => &op.author,
            Operation::SetTitle(op) => &op.author,
            Operation::AddComment(op) => &op.author,
            Operation::EditComment(op) => &op.author,
            Operation::SetStatus(op) => &op.author,
            Operation::LabelChange(op) => &op.author,
            Operation::SetMetadata(op) => &op.author,
        }
    }

    fn unix_time(&self) -> u64 {
        match self {
            Operation::Create(op) => op.unix_time,
            Operation::SetTitle(op) => op.unix_time,
            Operation::AddComment(op) => op.unix_time,
            Operation::EditComment(op) => op.unix_time,
            Operation::SetStatus(op) => op.unix_time,
            Operation::LabelChange(op) => op.unix_time,
            Operation::SetMetadata(op) => op.unix_time,
        }
    }

    fn files(&self) -> &[ObjectHash] {
        match self {
            Operation::Create(op) => &op.files,
            Operation::AddComment(op) => &op.files,
            Operation::EditComment(op) => &op.files,
            Operation::SetTitle(_) | Operation::SetStatus(_) | Operation::LabelChange(_) => &[],
            Operation::SetMetadata(_) => &[],
        }
    }

    fn apply(&self, mut snapshot: Snapshot) -> Snapshot {
        match self {
            Operation::Create(op) => {
                snapshot.title = op.title.clone();
                snapshot.comments.push(Comment {
                    id: self.id(),
                    author: op.author.clone(),
                    unix_time: op.unix_time,
                    message: op.message.clone(),
                    files: op.files.clone(),
                });
                snapshot
            }
            Operation::SetTitle(op) => {
                snapshot.title = op.title.clone();
                snapshot
            }
            Operation::AddComment(op) => {
                snapshot.comments.push(Comment {
                    id: self.id(),
                    author: op.author.clone(),
                    unix_time: op.unix_time,
                    message: op.message.clone(),
                    files: op.files.clone(),
                });
                snapshot
            }
            Operation::EditComment(op) => {
                if let Some(comment) = snapshot.comments.iter_mut().find(|c| c.id == op.target) {
                    comment.message = op.message.clone();
                    comment.files = op.files.clone();
                }
                snapshot
            }
            Operation::SetStatus(op) => {
                snapshot.status = op.status;
                snapshot
            }
            Operation::LabelChange(op) => {
                for label in &op.added {
                    if !snapshot.labels.contains(label) {
                        snapshot.labels.push(label.clone());
                    }
                }
                snapshot.labels.retain(|l| !op.removed.contains(l));
                snapshot
            }
            Operation::SetMetadata(op) => {
                snapshot
                    .metadata
                    .entry(op.target)
                    .or_default()
                    .insert(op.key.clone(), op.value.clone());
                snapshot
            }
        }
    }
}
