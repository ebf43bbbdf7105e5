//! Progress events emitted while a transfer runs.
//!
//! Inject an [`Arc<dyn TransferProgressCallback>`] via
//! [`crate::config::TransferConfigBuilder::progress_callback`] (or pass one to
//! [`crate::transfer::TransferPipeline::run`]) to receive a [`ProgressEvent`]
//! at every milestone: session created, each chunk, upload finished, import
//! submitted, each poll tick, and the terminal result.
//!
//! Callers that want a channel instead can use [`ChannelProgress`] or
//! [`crate::stream::transfer_stream`].
//!
//! # Example
//!
//! ```rust
//! use drive_import::{ProgressEvent, TransferConfig, TransferProgressCallback};
//! use std::sync::Arc;
//!
//! let log = |event: &ProgressEvent| eprintln!("{:>5.1}% {}", event.percent, event.message);
//!
//! let config = TransferConfig::builder()
//!     .progress_callback(Arc::new(log) as Arc<dyn TransferProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

/// Share of the overall percentage given to the upload phase.
const UPLOAD_SHARE: f32 = 80.0;

/// Stage a [`ProgressEvent`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    SessionCreated,
    Uploading,
    UploadFinished,
    ConversionSubmitted,
    Converting,
    Completed,
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::SessionCreated => "session-created",
            Phase::Uploading => "uploading",
            Phase::UploadFinished => "upload-finished",
            Phase::ConversionSubmitted => "conversion-submitted",
            Phase::Converting => "converting",
            Phase::Completed => "completed",
            Phase::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// One progress notification.
///
/// Chunk events may arrive out of sequence order (chunks complete
/// concurrently); `sequence` tells observers which chunk finished.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    pub phase: Phase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_chunks: Option<u32>,
    /// Overall completion, 0–100.
    pub percent: f32,
    pub message: String,
}

impl ProgressEvent {
    pub fn session_created(total_chunks: u32, chunk_size: u64) -> Self {
        Self {
            phase: Phase::SessionCreated,
            sequence: None,
            total_chunks: Some(total_chunks),
            percent: 0.0,
            message: format!("Upload session created: {total_chunks} chunk(s) of {chunk_size} bytes"),
        }
    }

    /// `completed` chunks are done in total, the latest being `sequence`.
    pub fn chunk_done(sequence: u32, completed: u32, total_chunks: u32) -> Self {
        let fraction = completed as f32 / total_chunks.max(1) as f32;
        Self {
            phase: Phase::Uploading,
            sequence: Some(sequence),
            total_chunks: Some(total_chunks),
            percent: fraction * UPLOAD_SHARE,
            message: format!("Chunk {sequence} uploaded ({completed}/{total_chunks})"),
        }
    }

    pub fn upload_finished(total_chunks: u32) -> Self {
        Self {
            phase: Phase::UploadFinished,
            sequence: None,
            total_chunks: Some(total_chunks),
            percent: UPLOAD_SHARE,
            message: "Upload assembled".into(),
        }
    }

    pub fn conversion_submitted(ticket: &str) -> Self {
        Self {
            phase: Phase::ConversionSubmitted,
            sequence: None,
            total_chunks: None,
            percent: UPLOAD_SHARE,
            message: format!("Import task submitted: {ticket}"),
        }
    }

    /// Poll tick `attempt` of at most `max_attempts`.
    pub fn converting(attempt: u32, max_attempts: u32, status: &str) -> Self {
        let fraction = attempt as f32 / max_attempts.max(1) as f32;
        Self {
            phase: Phase::Converting,
            sequence: None,
            total_chunks: None,
            percent: (UPLOAD_SHARE + fraction * (100.0 - UPLOAD_SHARE)).min(99.0),
            message: format!("Import {status} ({attempt}/{max_attempts})"),
        }
    }

    pub fn completed(url: &str) -> Self {
        Self {
            phase: Phase::Completed,
            sequence: None,
            total_chunks: None,
            percent: 100.0,
            message: if url.is_empty() {
                "Import complete".into()
            } else {
                format!("Import complete: {url}")
            },
        }
    }

    pub fn failed(error: &str) -> Self {
        Self {
            phase: Phase::Failed,
            sequence: None,
            total_chunks: None,
            percent: 100.0,
            message: error.to_string(),
        }
    }
}

/// Receives progress events.
///
/// Implementations must be `Send + Sync`: chunk events are emitted from
/// concurrent upload workers. Any `Fn(&ProgressEvent) + Send + Sync` closure
/// implements the trait.
pub trait TransferProgressCallback: Send + Sync {
    fn on_progress(&self, event: &ProgressEvent);
}

impl<F> TransferProgressCallback for F
where
    F: Fn(&ProgressEvent) + Send + Sync,
{
    fn on_progress(&self, event: &ProgressEvent) {
        self(event)
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl TransferProgressCallback for NoopProgressCallback {
    fn on_progress(&self, _event: &ProgressEvent) {}
}

/// Forwards every event into an unbounded channel.
///
/// A closed receiver is ignored: the transfer keeps running even when nobody
/// listens any more.
pub struct ChannelProgress {
    tx: UnboundedSender<ProgressEvent>,
}

impl ChannelProgress {
    pub fn new(tx: UnboundedSender<ProgressEvent>) -> Self {
        Self { tx }
    }
}

impl TransferProgressCallback for ChannelProgress {
    fn on_progress(&self, event: &ProgressEvent) {
        let _ = self.tx.send(event.clone());
    }
}

/// Convenience alias matching the type stored in [`crate::config::TransferConfig`].
pub type ProgressCallback = Arc<dyn TransferProgressCallback>;
