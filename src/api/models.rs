//! Wire types for the drive API.
//!
//! Field names follow the platform's JSON contract exactly; Rust-side names
//! are only changed where the wire name is a keyword (`type`).

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Standard response envelope: `{ "code": 0, "msg": "success", "data": … }`.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub code: i64,
    #[serde(default)]
    pub msg: String,
    pub data: Option<T>,
}

/// Body of `POST /drive/v1/files/upload_prepare`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrepareRequest {
    pub file_name: String,
    pub parent_type: String,
    pub parent_node: String,
    pub size: u64,
}

/// Negotiated session parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PrepareResponse {
    pub upload_id: String,
    #[serde(default)]
    pub block_size: u64,
    #[serde(default)]
    pub block_num: u32,
}

/// One chunk as sent to `upload_part`.
///
/// `checksum` is the Adler-32 of exactly `bytes`, computed for this attempt.
/// `bytes` shares the chunk buffer, so building a part per attempt is cheap.
#[derive(Clone, PartialEq, Eq)]
pub struct PartUpload {
    pub upload_id: String,
    pub seq: u32,
    pub checksum: u32,
    pub bytes: Bytes,
}

impl PartUpload {
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

impl fmt::Debug for PartUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartUpload")
            .field("upload_id", &self.upload_id)
            .field("seq", &self.seq)
            .field("size", &self.bytes.len())
            .field("checksum", &self.checksum)
            .finish()
    }
}

/// Per-chunk acknowledgement kept for the finish call.
///
/// The platform's part endpoint answers with an empty `data`; the ack then
/// only records which sequence was accepted with which checksum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkAck {
    pub seq: u32,
    pub checksum: u32,
}

/// Body of `POST /drive/v1/files/upload_finish`.
#[derive(Debug, Clone, Serialize)]
pub struct FinishRequest {
    pub upload_id: String,
    pub block_num: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FinishResponse {
    pub file_token: String,
}

/// Where the converted document is mounted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountPoint {
    /// `1` mounts into a drive folder ("my space").
    pub mount_type: u8,
    /// Folder token; empty means the root folder.
    pub mount_key: String,
}

/// Body of `POST /drive/v1/import_tasks`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportRequest {
    pub file_extension: String,
    pub file_token: String,
    #[serde(rename = "type")]
    pub target_type: String,
    pub file_name: String,
    pub point: MountPoint,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImportSubmitResponse {
    pub ticket: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImportQueryResponse {
    pub result: ImportTaskResult,
}

/// Snapshot of an import task as returned by the status endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ImportTaskResult {
    #[serde(default)]
    pub ticket: String,
    #[serde(default, rename = "type")]
    pub doc_type: String,
    pub job_status: u32,
    #[serde(default)]
    pub job_error_msg: String,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub extra: Vec<String>,
}
