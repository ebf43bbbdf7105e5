//! Drive a whole upload session: prepare, chunk pool, barrier, finish.
//!
//! ## Concurrency
//!
//! `upload_concurrency` worker futures (3 by default) are joined on the
//! caller's task and drain the session's chunk table. Claiming a chunk is a
//! single locked `Pending → InFlight` transition; the lock is never held
//! across an `.await`. Completions may land in any order.
//!
//! ## Abort
//!
//! The first chunk to exhaust its retries raises a shared cancellation flag.
//! Other workers stop claiming chunks and stop retrying; requests already on
//! the wire are left to finish or time out, since a single part upload cannot
//! be aborted remotely. Nothing is finalised unless every chunk succeeded.
//!
//! When the session dies because the source could not be read, that error is
//! returned as is (`FileRead`, not `ChunkUpload`).

use super::chunker::chunk_count;
use super::retry::RetryPolicy;
use super::session::UploadSession;
use super::source::ChunkSource;
use super::uploader::ChunkUploader;
use crate::api::{DriveApi, PrepareRequest};
use crate::config::TransferConfig;
use crate::error::{ApiError, TransferError};
use crate::progress::{ProgressCallback, ProgressEvent};
use futures::future::join_all;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Settings for [`UploadCoordinator`], usually taken from
/// [`crate::config::TransferConfig`].
#[derive(Debug, Clone)]
pub struct UploadSettings {
    pub parent_type: String,
    pub parent_node: String,
    pub max_chunk_size: u64,
    pub concurrency: usize,
    pub retry: RetryPolicy,
    pub chunk_timeout: Duration,
}

impl UploadSettings {
    pub fn from_config(config: &TransferConfig) -> Self {
        Self {
            parent_type: config.parent_type.clone(),
            parent_node: config.parent_node.clone(),
            max_chunk_size: config.max_chunk_size,
            concurrency: config.upload_concurrency,
            retry: config.chunk_retry_policy(),
            chunk_timeout: Duration::from_secs(config.chunk_timeout_secs),
        }
    }
}

/// What a successful upload produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishedUpload {
    pub file_token: String,
    pub session_id: String,
    pub total_chunks: u32,
    pub file_size: u64,
    /// Chunk attempts beyond the first, summed over the session.
    pub retries: u32,
    pub duration_ms: u64,
}

/// Owns one upload session from prepare to finish.
pub struct UploadCoordinator {
    api: Arc<dyn DriveApi>,
    uploader: ChunkUploader,
    settings: UploadSettings,
    progress: Option<ProgressCallback>,
}

impl UploadCoordinator {
    pub fn new(
        api: Arc<dyn DriveApi>,
        settings: UploadSettings,
        progress: Option<ProgressCallback>,
    ) -> Self {
        let uploader = ChunkUploader::new(Arc::clone(&api), settings.retry, settings.chunk_timeout);
        Self {
            api,
            uploader,
            settings,
            progress,
        }
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(ref cb) = self.progress {
            cb.on_progress(&event);
        }
    }

    /// Upload `source` as `file_name` and return the assembled file's token.
    ///
    /// # Errors
    /// - [`TransferError::InvalidInput`] for an empty source or a size mismatch
    /// - [`TransferError::SessionCreate`] when prepare fails (not retried)
    /// - [`TransferError::ChunkUpload`] when any chunk fails; finish is skipped
    /// - the source's own error (usually [`TransferError::FileRead`]) when a
    ///   chunk cannot be read; finish is skipped
    /// - [`TransferError::SessionFinish`] when finish fails (not retried)
    pub async fn upload(
        &self,
        source: Arc<dyn ChunkSource>,
        file_name: &str,
        total_size: u64,
    ) -> Result<FinishedUpload, TransferError> {
        let start = Instant::now();
        if total_size == 0 {
            return Err(TransferError::InvalidInput(format!(
                "'{file_name}' is empty; nothing to upload"
            )));
        }
        if source.len() != total_size {
            return Err(TransferError::InvalidInput(format!(
                "declared size {total_size} does not match source length {}",
                source.len()
            )));
        }

        // ── Step 1: Prepare ──────────────────────────────────────────────
        let session = self.prepare(file_name, total_size).await?;
        let total_chunks = session.total_chunks();
        let session_id = session.session_id().to_string();
        info!(
            "Upload session {}: {} bytes in {} chunk(s) of {} bytes",
            session_id,
            total_size,
            total_chunks,
            session.chunk_size()
        );
        self.emit(ProgressEvent::session_created(total_chunks, session.chunk_size()));

        // ── Step 2: Chunk pool ───────────────────────────────────────────
        let pool = Pool {
            session: Mutex::new(session),
            cancel: AtomicBool::new(false),
            source_error: Mutex::new(None),
        };
        let workers = self.settings.concurrency.max(1).min(total_chunks as usize);
        join_all((0..workers).map(|w| self.worker(w, &pool, source.as_ref(), &session_id))).await;

        // ── Step 3: Barrier passed; decide ───────────────────────────────
        let session = pool
            .session
            .into_inner()
            .map_err(|_| TransferError::Internal("session lock poisoned".into()))?;
        let source_error = pool
            .source_error
            .into_inner()
            .map_err(|_| TransferError::Internal("error slot poisoned".into()))?;

        if let Some(err) = source_error {
            warn!("Upload session {} aborted: {}", session_id, err);
            return Err(err);
        }
        if let Some(err) = Self::abort_error(&session) {
            warn!("Upload session {} aborted: {}", session_id, err);
            return Err(err);
        }

        let acks = session.acks().ok_or_else(|| {
            TransferError::Internal(format!(
                "session {session_id} not complete: {}/{} chunks succeeded",
                session.succeeded_count(),
                total_chunks
            ))
        })?;

        // ── Step 4: Finish ───────────────────────────────────────────────
        debug!("Finishing session {} with {} acks", session_id, acks.len());
        let file_token = self
            .api
            .finish(&session_id, total_chunks, &acks)
            .await
            .map_err(|source| TransferError::SessionFinish {
                session_id: session_id.clone(),
                source,
            })?;

        let retries = session
            .chunks()
            .iter()
            .map(|c| c.attempts.saturating_sub(1))
            .sum();
        info!("Upload session {} finished → file token {}", session_id, file_token);
        self.emit(ProgressEvent::upload_finished(total_chunks));

        Ok(FinishedUpload {
            file_token,
            session_id,
            total_chunks,
            file_size: total_size,
            retries,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Open the session and lay out its chunk table.
    async fn prepare(&self, file_name: &str, total_size: u64) -> Result<UploadSession, TransferError> {
        let request = PrepareRequest {
            file_name: file_name.to_string(),
            parent_type: self.settings.parent_type.clone(),
            parent_node: self.settings.parent_node.clone(),
            size: total_size,
        };
        let create_err = |source| TransferError::SessionCreate {
            file_name: file_name.to_string(),
            source,
        };

        let prepared = self.api.prepare(&request).await.map_err(create_err)?;

        let chunk_size = if prepared.block_size == 0 {
            self.settings.max_chunk_size
        } else {
            prepared.block_size
        };
        let expected = chunk_count(total_size, chunk_size);
        if prepared.block_num != 0 && u64::from(prepared.block_num) != expected {
            return Err(create_err(ApiError::Decode(format!(
                "service announced {} chunks, but {} bytes in {}-byte chunks is {}",
                prepared.block_num, total_size, chunk_size, expected
            ))));
        }

        UploadSession::new(prepared.upload_id, total_size, chunk_size)
    }

    /// One pool worker: claim, read, upload, record; until nothing is left or
    /// the session is cancelled.
    async fn worker(
        &self,
        worker_id: usize,
        pool: &Pool,
        source: &dyn ChunkSource,
        session_id: &str,
    ) {
        let (shared, cancel) = (&pool.session, &pool.cancel);
        loop {
            if cancel.load(Ordering::SeqCst) {
                debug!("Worker {}: cancelled", worker_id);
                return;
            }

            let Some((sequence, range)) = lock(shared).and_then(|mut s| s.claim_next()) else {
                return;
            };
            debug!("Worker {}: chunk {} {}", worker_id, sequence, range);

            let payload = match source.read_range(range).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("Chunk {}: cannot read {}: {}", sequence, range, e);
                    if let Some(mut s) = lock(shared) {
                        s.mark_failed(sequence, 0, e.to_string());
                    }
                    // Only the failure that raised the flag is the cause.
                    if !cancel.swap(true, Ordering::SeqCst) {
                        if let Ok(mut slot) = pool.source_error.lock() {
                            slot.get_or_insert(e);
                        }
                    }
                    return;
                }
            };

            match self
                .uploader
                .upload_chunk(session_id, sequence, &payload, Some(cancel))
                .await
            {
                Ok(done) => {
                    let (completed, total) = match lock(shared) {
                        Some(mut s) => {
                            s.mark_succeeded(sequence, done.attempts, done.ack);
                            (s.succeeded_count(), s.total_chunks())
                        }
                        None => return,
                    };
                    self.emit(ProgressEvent::chunk_done(sequence, completed, total));
                }
                Err(failure) => {
                    let detail = if failure.cancelled {
                        format!("{CANCELLED_PREFIX}{}", failure.last_error)
                    } else {
                        failure.last_error.to_string()
                    };
                    if let Some(mut s) = lock(shared) {
                        s.mark_failed(sequence, failure.attempts, detail);
                    }
                    if !failure.cancelled {
                        warn!(
                            "Chunk {} failed after {} attempt(s): {}",
                            sequence, failure.attempts, failure.last_error
                        );
                    }
                    cancel.store(true, Ordering::SeqCst);
                    return;
                }
            }
        }
    }

    /// The error to report when the session cannot be finished, if any.
    ///
    /// Chunks abandoned because of cancellation are recorded as failed too;
    /// the reported `sequence` prefers a chunk that failed on its own.
    fn abort_error(session: &UploadSession) -> Option<TransferError> {
        let failed = session.failed();
        let first = failed.first()?;
        let cause = failed
            .iter()
            .find(|c| !is_cancelled(c.error.as_deref()))
            .unwrap_or(first);
        Some(TransferError::ChunkUpload {
            sequence: cause.sequence,
            failed: failed.iter().map(|c| c.sequence).collect(),
            attempts: cause.attempts,
            detail: cause.error.clone().unwrap_or_default(),
        })
    }
}

/// State shared by the workers of one session.
struct Pool {
    session: Mutex<UploadSession>,
    cancel: AtomicBool,
    /// Set when the session was aborted by a source read failure.
    source_error: Mutex<Option<TransferError>>,
}

fn is_cancelled(error: Option<&str>) -> bool {
    error.is_some_and(|e| e.starts_with(CANCELLED_PREFIX))
}

const CANCELLED_PREFIX: &str = "cancelled: ";

fn lock(shared: &Mutex<UploadSession>) -> Option<MutexGuard<'_, UploadSession>> {
    shared.lock().ok()
}
