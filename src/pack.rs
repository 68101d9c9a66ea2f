//! [`OperationPack`]: one commit's worth of operations, serialized
//! atomically (spec §3, §6.2).
//!
//! The wire format is a flat version byte, an operation count, and then
//! for each operation a one-byte [`OperationTag`] followed by its
//! `bincode`-encoded payload, length-prefixed so a reader can skip past an
//! operation it cannot decode — though in practice an unrecognized tag is
//! a hard `InvalidTree` error (spec §6.2: "consumers must tolerate and
//! reject unknown operation type tags explicitly").

use bincode::config::standard;
use bincode::serde::{decode_from_slice, encode_to_vec};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::errors::BugError;
use crate::hash::ObjectHash;
use crate::operation::{
    AddComment, Create, EditComment, LabelChange, Operation, OperationData, OperationTag,
    SetMetadata, SetStatus, SetTitle,
};

const PACK_FORMAT_VERSION: u8 = 1;

/// An ordered, serializable batch of operations, tagged with the commit
/// that carries it once committed (spec §3, §9).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OperationPack {
    pub operations: Vec<Operation>,
    /// Empty while the pack is staging; set exactly at commit step 7 or at
    /// read-parse time (spec §9).
    pub commit_hash: Option<ObjectHash>,
}

impl OperationPack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, op: Operation) {
        self.operations.push(op);
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Delegates to each operation; an empty pack is vacuously valid.
    pub fn is_valid(&self) -> bool {
        self.operations.iter().all(Operation::is_valid)
    }

    /// Union of every operation's referenced media, deduplicated in
    /// staging order (spec §4.1 step 4, §8 property 9).
    pub fn referenced_media(&self) -> Vec<ObjectHash> {
        let mut seen = Vec::new();
        for op in &self.operations {
            for hash in op.files() {
                if !seen.contains(hash) {
                    seen.push(*hash);
                }
            }
        }
        seen
    }

    /// Stable binary representation of the operations (not `commit_hash`,
    /// which is carried out-of-band by the tree the commit protocol
    /// builds around this blob).
    pub fn serialize(&self) -> Result<Vec<u8>, BugError> {
        let mut out = Vec::new();
        out.push(PACK_FORMAT_VERSION);
        out.extend((self.operations.len() as u32).to_be_bytes());
        for op in &self.operations {
            out.push(op.tag() as u8);
            let payload = encode_operation_payload(op)?;
            out.extend((payload.len() as u32).to_be_bytes());
            out.extend(payload);
        }
        Ok(out)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, BugError> {
        let mut cursor = bytes;
        let version = take_u8(&mut cursor)?;
        if version != PACK_FORMAT_VERSION {
            return Err(BugError::InvalidTree(format!(
                "unsupported operation pack format version {version}"
            )));
        }
        let count = take_u32(&mut cursor)?;
        let mut operations = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let tag_byte = take_u8(&mut cursor)?;
            let tag = OperationTag::from_u8(tag_byte).ok_or_else(|| {
                BugError::InvalidTree(format!("unknown operation type tag {tag_byte}"))
            })?;
            let len = take_u32(&mut cursor)? as usize;
            if cursor.len() < len {
                return Err(BugError::InvalidTree(
                    "operation payload runs past end of pack blob".into(),
                ));
            }
            let (payload, rest) = cursor.split_at(len);
            cursor = rest;
            operations.push(decode_operation(tag, payload)?);
        }
        Ok(Self {
            operations,
            commit_hash: None,
        })
    }
}

fn encode_operation_payload(op: &Operation) -> Result<Vec<u8>, BugError> {
    match op {
        Operation::Create(payload) => bincode_encode(payload),
        Operation::SetTitle(payload) => bincode_encode(payload),
        Operation::AddComment(payload) => bincode_encode(payload),
        Operation::EditComment(payload) => bincode_encode(payload),
        Operation::SetStatus(payload) => bincode_encode(payload),
        Operation::LabelChange(payload) => bincode_encode(payload),
        Operation::SetMetadata(payload) => bincode_encode(payload),
    }
}

fn bincode_encode<T: Serialize>(value: &T) -> Result<Vec<u8>, BugError> {
    encode_to_vec(value, standard())
        .map_err(|e| BugError::InvalidTree(format!("failed to encode operation: {e}")))
}

fn bincode_decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, BugError> {
    decode_from_slice(bytes, standard())
        .map(|(value, _)| value)
        .map_err(|e| BugError::InvalidTree(format!("malformed operation payload: {e}")))
}

fn decode_operation(tag: OperationTag, payload: &[u8]) -> Result<Operation, BugError> {
    Ok(match tag {
        OperationTag::Create => Operation::Create(bincode_decode::<Create>(payload)?),
        OperationTag::SetTitle => Operation::SetTitle(bincode_decode::<SetTitle>(payload)?),
        OperationTag::AddComment => Operation::AddComment(bincode_decode::<AddComment>(payload)?),
        OperationTag::EditComment => {
            Operation::EditComment(bincode_decode::<EditComment>(payload)?)
        }
        OperationTag::SetStatus => Operation::SetStatus(bincode_decode::<SetStatus>(payload)?),
        OperationTag::LabelChange => {
            Operation::LabelChange(bincode_decode::<LabelChange>(payload)?)
        }
        OperationTag::SetMetadata => {
            Operation::SetMetadata(bincode_decode::<SetMetadata>(payload)?)
        }
    })
}

fn take_u8(cursor: &mut &[u8]) -> Result<u8, BugError> {
    let (byte, rest) = cursor
        .split_first()
        .ok_or_else(|| BugError::InvalidTree("operation pack blob truncated".into()))?;
    *cursor = rest;
    Ok(*byte)
}

fn take_u32(cursor: &mut &[u8]) -> Result<u32, BugError> {
    if cursor.len() < 4 {
        return Err(BugError::InvalidTree(
            "operation pack blob truncated".into(),
        ));
    }
    let (bytes, rest) = cursor.split_at(4);
    *cursor = rest;
    Ok(u32::from_be_bytes(bytes.try_into().unwrap()))
}
