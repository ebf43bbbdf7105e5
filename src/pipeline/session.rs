//! In-flight upload session and its per-chunk state table.
//!
//! The coordinator keeps one [`UploadSession`] behind a mutex shared with its
//! workers. Every mutation is a single-field transition on one chunk:
//!
//! ```text
//! Pending ──claim──▶ InFlight ──▶ Succeeded
//!                              └─▶ Failed
//! ```
//!
//! [`UploadSession::claim_next`] performs the `Pending → InFlight` step under
//! the lock, so two workers can never claim the same index.

use super::chunker::{self, ByteRange};
use crate::api::ChunkAck;
use crate::error::TransferError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkStatus {
    Pending,
    InFlight,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkState {
    pub sequence: u32,
    pub range: ByteRange,
    pub status: ChunkStatus,
    pub attempts: u32,
    pub ack: Option<ChunkAck>,
    pub error: Option<String>,
}

/// One file transfer, from `prepare` until `finish` or abort.
#[derive(Debug, Clone)]
pub struct UploadSession {
    session_id: String,
    chunk_size: u64,
    file_size: u64,
    chunks: Vec<ChunkState>,
}

impl UploadSession {
    /// Lay out the chunk table for a freshly prepared session.
    pub fn new(
        session_id: impl Into<String>,
        file_size: u64,
        chunk_size: u64,
    ) -> Result<Self, TransferError> {
        let chunks = chunker::split(file_size, chunk_size)?
            .into_iter()
            .enumerate()
            .map(|(i, range)| ChunkState {
                sequence: i as u32,
                range,
                status: ChunkStatus::Pending,
                attempts: 0,
                ack: None,
                error: None,
            })
            .collect();

        Ok(Self {
            session_id: session_id.into(),
            chunk_size,
            file_size,
            chunks,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn total_chunks(&self) -> u32 {
        self.chunks.len() as u32
    }

    pub fn chunks(&self) -> &[ChunkState] {
        &self.chunks
    }

    /// Claim the lowest-numbered pending chunk, marking it in flight.
    pub fn claim_next(&mut self) -> Option<(u32, ByteRange)> {
        let chunk = self
            .chunks
            .iter_mut()
            .find(|c| c.status == ChunkStatus::Pending)?;
        chunk.status = ChunkStatus::InFlight;
        Some((chunk.sequence, chunk.range))
    }

    pub fn mark_succeeded(&mut self, sequence: u32, attempts: u32, ack: ChunkAck) {
        if let Some(chunk) = self.in_flight_mut(sequence) {
            chunk.status = ChunkStatus::Succeeded;
            chunk.attempts = attempts;
            chunk.ack = Some(ack);
        }
    }

    pub fn mark_failed(&mut self, sequence: u32, attempts: u32, error: String) {
        if let Some(chunk) = self.in_flight_mut(sequence) {
            chunk.status = ChunkStatus::Failed;
            chunk.attempts = attempts;
            chunk.error = Some(error);
        }
    }

    fn in_flight_mut(&mut self, sequence: u32) -> Option<&mut ChunkState> {
        self.chunks
            .get_mut(sequence as usize)
            .filter(|c| c.status == ChunkStatus::InFlight)
    }

    pub fn succeeded_count(&self) -> u32 {
        self.count(ChunkStatus::Succeeded)
    }

    fn count(&self, status: ChunkStatus) -> u32 {
        self.chunks.iter().filter(|c| c.status == status).count() as u32
    }

    /// Eligible for finish: every chunk succeeded.
    pub fn is_complete(&self) -> bool {
        self.succeeded_count() == self.total_chunks()
    }

    /// Failed chunks in ascending sequence order.
    pub fn failed(&self) -> Vec<&ChunkState> {
        self.chunks
            .iter()
            .filter(|c| c.status == ChunkStatus::Failed)
            .collect()
    }

    /// Acks in sequence order; `None` unless the session is complete.
    pub fn acks(&self) -> Option<Vec<ChunkAck>> {
        if !self.is_complete() {
            return None;
        }
        self.chunks.iter().map(|c| c.ack).collect()
    }
}
