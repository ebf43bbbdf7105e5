//! Result types returned by a successful transfer.

use serde::Serialize;

/// Everything a successful transfer produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferOutput {
    /// Token of the raw uploaded file.
    pub file_token: String,
    /// Token of the converted online document.
    pub result_handle: String,
    pub url: String,
    pub doc_type: String,
    /// Non-fatal notices attached to the import.
    pub warnings: Vec<String>,
    pub stats: TransferStats,
}

/// Counters and timings for one transfer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransferStats {
    pub file_size: u64,
    pub total_chunks: u32,
    /// Chunk attempts beyond the first.
    pub chunk_retries: u32,
    pub polls: u32,
    pub upload_duration_ms: u64,
    pub conversion_duration_ms: u64,
    pub total_duration_ms: u64,
}
