//! Upload one chunk, with integrity checksum and retry.
//!
//! ## Retry Strategy
//!
//! 5xx, 429, timeouts, dropped connections, and non-zero application codes
//! inside a 200 envelope are retried with exponential backoff (1 s → 2 s,
//! capped at 5 s). Other 4xx responses mean the session or the request shape
//! is wrong, so retrying cannot help and the chunk fails at once.
//!
//! The checksum is recomputed from the payload on every attempt. It is never
//! carried over from an earlier attempt, so the value sent always describes
//! the bytes sent.

use super::checksum::adler32;
use super::retry::{retry_with_backoff, RetryPolicy};
use crate::api::{ChunkAck, DriveApi, PartUpload};
use crate::error::{ApiError, TransferError};
use bytes::Bytes;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

/// A chunk that made it, and how many attempts it took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedChunk {
    pub ack: ChunkAck,
    pub attempts: u32,
}

/// A chunk that did not make it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkFailure {
    pub sequence: u32,
    pub attempts: u32,
    pub last_error: ApiError,
    pub cancelled: bool,
}

impl From<ChunkFailure> for TransferError {
    fn from(f: ChunkFailure) -> Self {
        TransferError::ChunkUpload {
            sequence: f.sequence,
            failed: vec![f.sequence],
            attempts: f.attempts,
            detail: f.last_error.to_string(),
        }
    }
}

/// Sends individual chunks of one session.
#[derive(Clone)]
pub struct ChunkUploader {
    api: Arc<dyn DriveApi>,
    policy: RetryPolicy,
    attempt_timeout: Duration,
}

impl ChunkUploader {
    pub fn new(api: Arc<dyn DriveApi>, policy: RetryPolicy, attempt_timeout: Duration) -> Self {
        Self {
            api,
            policy,
            attempt_timeout,
        }
    }

    /// Upload `payload` as chunk `sequence` of `session_id`.
    ///
    /// `cancel` is checked between attempts; once raised, no new attempt is
    /// started and the last error is returned with `cancelled = true`.
    pub async fn upload_chunk(
        &self,
        session_id: &str,
        sequence: u32,
        payload: &Bytes,
        cancel: Option<&AtomicBool>,
    ) -> Result<UploadedChunk, ChunkFailure> {
        let label = format!("chunk {sequence}");
        let result = retry_with_backoff(
            &self.policy,
            cancel,
            ApiError::is_transient,
            &label,
            |attempt| {
                let part = PartUpload {
                    upload_id: session_id.to_string(),
                    seq: sequence,
                    checksum: adler32(payload),
                    bytes: payload.clone(),
                };
                debug!(
                    "Chunk {}: attempt {}, {} bytes, checksum {}",
                    sequence,
                    attempt,
                    part.size(),
                    part.checksum
                );
                self.send(part)
            },
        )
        .await;

        match result {
            Ok((ack, attempts)) => Ok(UploadedChunk { ack, attempts }),
            Err(failure) => Err(ChunkFailure {
                sequence,
                attempts: failure.attempts,
                last_error: failure.error,
                cancelled: failure.cancelled,
            }),
        }
    }

    async fn send(&self, part: PartUpload) -> Result<ChunkAck, ApiError> {
        match timeout(self.attempt_timeout, self.api.upload_part(&part)).await {
            Ok(result) => result,
            Err(_) => Err(ApiError::Timeout {
                secs: self.attempt_timeout.as_secs(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ImportRequest, ImportTaskResult, PrepareRequest, PrepareResponse};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Answers `upload_part` from a script, recording what was sent.
    struct ScriptedParts {
        script: Mutex<Vec<Result<(), ApiError>>>,
        sent: Mutex<Vec<(u32, u32, usize)>>,
        buffers: Mutex<Vec<usize>>,
    }

    impl ScriptedParts {
        fn new(script: Vec<Result<(), ApiError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script),
                sent: Mutex::new(Vec::new()),
                buffers: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl DriveApi for ScriptedParts {
        async fn prepare(&self, _: &PrepareRequest) -> Result<PrepareResponse, ApiError> {
            unreachable!()
        }

        async fn upload_part(&self, part: &PartUpload) -> Result<ChunkAck, ApiError> {
            self.sent
                .lock()
                .unwrap()
                .push((part.seq, part.checksum, part.size()));
            self.buffers.lock().unwrap().push(part.bytes.as_ptr() as usize);
            let mut script = self.script.lock().unwrap();
            let next = if script.is_empty() {
                Ok(())
            } else {
                script.remove(0)
            };
            next.map(|_| ChunkAck {
                seq: part.seq,
                checksum: part.checksum,
            })
        }

        async fn finish(&self, _: &str, _: u32, _: &[ChunkAck]) -> Result<String, ApiError> {
            unreachable!()
        }

        async fn submit_import(&self, _: &ImportRequest) -> Result<String, ApiError> {
            unreachable!()
        }

        async fn poll_import(&self, _: &str) -> Result<ImportTaskResult, ApiError> {
            unreachable!()
        }
    }

    fn uploader(api: Arc<ScriptedParts>) -> ChunkUploader {
        ChunkUploader::new(api, RetryPolicy::default(), Duration::from_secs(30))
    }

    fn http(status: u16) -> ApiError {
        ApiError::Http {
            status,
            body: String::new(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn sends_checksum_of_payload() {
        let api = ScriptedParts::new(vec![]);
        let done = uploader(Arc::clone(&api))
            .upload_chunk("up-1", 4, &Bytes::from_static(b"Wikipedia"), None)
            .await
            .unwrap();
        assert_eq!(done.attempts, 1);
        assert_eq!(done.ack.checksum, 0x11E6_0398);
        assert_eq!(api.sent.lock().unwrap()[0], (4, 0x11E6_0398, 9));
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_exhaust_three_attempts() {
        let api = ScriptedParts::new(vec![Err(http(503)), Err(http(502)), Err(http(500))]);
        let failure = uploader(Arc::clone(&api))
            .upload_chunk("up-1", 2, &Bytes::from_static(b"abc"), None)
            .await
            .unwrap_err();
        assert_eq!(failure.sequence, 2);
        assert_eq!(failure.attempts, 3);
        assert_eq!(failure.last_error, http(500));
        assert_eq!(api.sent.lock().unwrap().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn client_error_fails_immediately() {
        let api = ScriptedParts::new(vec![Err(http(400))]);
        let failure = uploader(Arc::clone(&api))
            .upload_chunk("up-1", 0, &Bytes::from_static(b"abc"), None)
            .await
            .unwrap_err();
        assert_eq!(failure.attempts, 1);
        assert_eq!(api.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn application_code_in_ok_envelope_is_retried() {
        let api = ScriptedParts::new(vec![Err(ApiError::Application {
            code: 1061045,
            msg: "can retry".into(),
        })]);
        let done = uploader(Arc::clone(&api))
            .upload_chunk("up-1", 0, &Bytes::from_static(b"abc"), None)
            .await
            .unwrap();
        assert_eq!(done.attempts, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn checksum_recomputed_each_attempt() {
        let api = ScriptedParts::new(vec![Err(http(503))]);
        uploader(Arc::clone(&api))
            .upload_chunk("up-1", 1, &Bytes::from_static(b"abc"), None)
            .await
            .unwrap();
        let sent = api.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().all(|&(_, sum, _)| sum == adler32(b"abc")));
    }

    #[tokio::test(start_paused = true)]
    async fn attempts_share_the_chunk_buffer() {
        let api = ScriptedParts::new(vec![Err(http(503)), Err(http(502))]);
        let payload = Bytes::from(vec![9u8; 4096]);
        uploader(Arc::clone(&api))
            .upload_chunk("up-1", 0, &payload, None)
            .await
            .unwrap();
        let buffers = api.buffers.lock().unwrap();
        assert_eq!(buffers.len(), 3);
        assert!(buffers.iter().all(|&p| p == payload.as_ptr() as usize));
    }

    #[test]
    fn failure_converts_to_chunk_upload_error() {
        let err: TransferError = ChunkFailure {
            sequence: 5,
            attempts: 3,
            last_error: http(503),
            cancelled: false,
        }
        .into();
        assert!(matches!(
            err,
            TransferError::ChunkUpload { sequence: 5, attempts: 3, .. }
        ));
    }
}
