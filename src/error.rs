//! Error types for the drive-import library.
//!
//! Two layers of errors reflect two distinct audiences:
//!
//! * [`ApiError`], **transport level**: one remote call failed. It knows
//!   whether the failure is worth retrying ([`ApiError::is_transient`]) and
//!   whether it came from the network rather than the service
//!   ([`ApiError::is_network`]). Only the chunk uploader and the import
//!   poller ever see these; both retry locally and then convert.
//!
//! * [`TransferError`], **pipeline level**: the transfer as a whole failed.
//!   Returned as `Err(TransferError)` from [`crate::transfer::transfer`] and
//!   [`crate::transfer::TransferPipeline::run`], carrying enough context
//!   (sequence number, ticket, numeric code) for the caller to retry the
//!   whole transfer, abort, or show a specific remediation message.

use crate::api::ImportErrorCode;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the drive-import pipeline.
#[derive(Debug, Error)]
pub enum TransferError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// A size, name, or range argument is unusable.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Source file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Reading bytes from the source failed.
    #[error("Failed to read '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// No API client or credential could be resolved.
    #[error("Drive API is not configured.\n{hint}")]
    NotConfigured { hint: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Upload errors ─────────────────────────────────────────────────────
    /// The upload session could not be created.
    #[error("Failed to create upload session for '{file_name}': {source}")]
    SessionCreate {
        file_name: String,
        #[source]
        source: ApiError,
    },

    /// At least one chunk failed after all retries; the session was abandoned.
    ///
    /// `sequence` is the lowest failed sequence number, `failed` lists all of
    /// them in ascending order.
    #[error("Chunk {sequence} failed after {attempts} attempt(s): {detail}")]
    ChunkUpload {
        sequence: u32,
        failed: Vec<u32>,
        attempts: u32,
        detail: String,
    },

    /// Every chunk was accepted but the session could not be finalised.
    #[error("Failed to finish upload session '{session_id}': {source}")]
    SessionFinish {
        session_id: String,
        #[source]
        source: ApiError,
    },

    // ── Import errors ─────────────────────────────────────────────────────
    /// The import task could not be submitted.
    #[error("Failed to submit import task for '{file_token}': {source}")]
    TaskSubmit {
        file_token: String,
        #[source]
        source: ApiError,
    },

    /// The status query was rejected for a non-network reason.
    #[error("Failed to query import task '{ticket}': {source}")]
    TaskQuery {
        ticket: String,
        #[source]
        source: ApiError,
    },

    /// The import failed with a known cause.
    ///
    /// Either the service reported a code from the table, or polling lost
    /// contact with the task: `kind` is then
    /// [`ImportErrorCode::Connectivity`] and `code` is
    /// [`crate::api::CONNECTIVITY_CODE`].
    #[error("Import failed (code {code}, {kind:?}): {message}")]
    Conversion {
        code: u32,
        kind: ImportErrorCode,
        message: String,
    },

    /// The service reported a failure code this library does not know.
    #[error("Import failed with unrecognised code {code}: {message}")]
    UnknownConversion { code: u32, message: String },

    /// The poll ceiling was reached before a terminal state.
    ///
    /// The task may still complete server-side: the outcome is unknown.
    #[error(
        "Import task '{ticket}' did not finish after {attempts} polls; \
         the outcome is unknown, check the drive before resubmitting"
    )]
    ConversionTimeout { ticket: String, attempts: u32 },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TransferError {
    /// Whether resubmitting the whole transfer has a reasonable chance of
    /// succeeding.
    ///
    /// Input, configuration, and known conversion failures are deterministic;
    /// everything that involved the network is worth another go.
    pub fn is_retryable_transfer(&self) -> bool {
        match self {
            TransferError::SessionCreate { source, .. }
            | TransferError::SessionFinish { source, .. }
            | TransferError::TaskSubmit { source, .. }
            | TransferError::TaskQuery { source, .. } => source.is_transient(),
            TransferError::ChunkUpload { .. } => true,
            TransferError::Conversion { kind, .. } => kind.is_transient(),
            _ => false,
        }
    }
}

/// A single failed call against the drive API.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// Connection refused, reset, DNS failure, or the body was cut off.
    #[error("Network error: {0}")]
    Transport(String),

    /// The call did not complete within its per-attempt deadline.
    #[error("Request timed out after {secs}s")]
    Timeout { secs: u64 },

    /// Non-2xx HTTP status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// HTTP 200 envelope carrying a non-zero application code.
    #[error("API error {code}: {msg}")]
    Application { code: i64, msg: String },

    /// The response did not have the expected shape.
    #[error("Malformed response: {0}")]
    Decode(String),

    /// The credential provider could not produce a token.
    #[error("Credential unavailable: {0}")]
    Credential(String),
}

/// Application code the platform returns when the caller is rate limited.
pub const RATE_LIMITED_CODE: i64 = 99991400;

impl ApiError {
    /// Whether retrying the same request may succeed.
    ///
    /// 5xx, 429, timeouts, transport failures, and non-zero codes inside a
    /// 200 envelope are transient. Other 4xx responses indicate a malformed
    /// request or a dead session and fail immediately.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Transport(_) | ApiError::Timeout { .. } => true,
            ApiError::Http { status, .. } => *status >= 500 || *status == 429,
            ApiError::Application { .. } => true,
            ApiError::Decode(_) | ApiError::Credential(_) => false,
        }
    }

    /// Whether the failure happened below the application protocol.
    pub fn is_network(&self) -> bool {
        match self {
            ApiError::Transport(_) | ApiError::Timeout { .. } => true,
            ApiError::Http { status, .. } => *status >= 500 || *status == 429,
            ApiError::Application { code, .. } => *code == RATE_LIMITED_CODE,
            ApiError::Decode(_) | ApiError::Credential(_) => false,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Timeout { secs: 0 }
        } else if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            ApiError::Http {
                status: status.as_u16(),
                body: e.to_string(),
            }
        } else {
            ApiError::Transport(e.to_string())
        }
    }
}
