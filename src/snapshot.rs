//! [`Snapshot`]: the materialized read-model produced by replaying a bug's
//! operations (spec §3, §4.5's `Compile`).
//!
//! Snapshot identity is never stored — it is always rebuilt by folding
//! every committed + staged operation, oldest first, through
//! [`crate::operation::OperationData::apply`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::hash::ObjectHash;
use crate::operation::OperationId;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    #[default]
    Open,
    Closed,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Open => "open",
            Status::Closed => "closed",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single comment in reading order. `id` is the [`OperationId`] of the
/// `Create` or `AddComment` operation that introduced it, and is the target
/// an `EditComment` addresses.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: OperationId,
    pub author: String,
    pub unix_time: u64,
    pub message: String,
    pub files: Vec<ObjectHash>,
}

/// The read-model of a bug: title, status, ordered comments and labels, and
/// per-operation metadata (spec §3; see DESIGN.md for the
/// `metadata`-shape Open Question resolution).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: Option<ObjectHash>,
    pub title: String,
    pub status: Status,
    pub comments: Vec<Comment>,
    pub labels: Vec<String>,
    pub metadata: HashMap<OperationId, HashMap<String, String>>,
}
