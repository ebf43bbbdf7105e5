//! The remote drive API seam.
//!
//! Everything the pipeline needs from the platform is expressed by the
//! [`DriveApi`] trait: five calls, each returning an [`ApiError`] that the
//! caller classifies as transient or permanent. [`HttpDriveApi`] is the
//! production implementation over reqwest; tests plug in an instrumented
//! in-memory implementation instead.
//!
//! ```text
//! prepare ──▶ upload_part × N ──▶ finish ──▶ submit_import ──▶ poll_import …
//! ```

pub mod codes;
pub mod http;
pub mod models;

pub use codes::{ImportErrorCode, CONNECTIVITY_CODE};
pub use http::HttpDriveApi;
pub use models::{
    ChunkAck, ImportRequest, ImportTaskResult, MountPoint, PartUpload, PrepareRequest,
    PrepareResponse,
};

use crate::error::ApiError;
use async_trait::async_trait;

/// Remote operations used by the upload and import stages.
///
/// Implementations must be `Send + Sync`: chunk uploads call
/// [`DriveApi::upload_part`] from several workers at once.
#[async_trait]
pub trait DriveApi: Send + Sync {
    /// Open an upload session.
    async fn prepare(&self, request: &PrepareRequest) -> Result<PrepareResponse, ApiError>;

    /// Send one chunk of an open session.
    async fn upload_part(&self, part: &PartUpload) -> Result<ChunkAck, ApiError>;

    /// Assemble the session into a file; returns the file token.
    ///
    /// `acks` is ordered by sequence number and has exactly `total_chunks`
    /// entries.
    async fn finish(
        &self,
        upload_id: &str,
        total_chunks: u32,
        acks: &[ChunkAck],
    ) -> Result<String, ApiError>;

    /// Submit an import (conversion) task; returns its ticket.
    async fn submit_import(&self, request: &ImportRequest) -> Result<String, ApiError>;

    /// Fetch the current state of an import task.
    async fn poll_import(&self, ticket: &str) -> Result<ImportTaskResult, ApiError>;
}
