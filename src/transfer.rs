//! Transfer entry points: upload a file, then convert it.
//!
//! [`TransferPipeline::run`] is the facade; [`transfer`], [`transfer_bytes`]
//! and [`transfer_sync`] wrap it for the common cases. Use
//! [`crate::stream::transfer_stream`] instead when you would rather consume
//! progress as a stream than through a callback.

use crate::api::{DriveApi, HttpDriveApi};
use crate::config::{split_file_name, Destination, TargetType, TransferConfig};
use crate::credential::{SharedCredential, StaticCredential, ACCESS_TOKEN_ENV};
use crate::error::TransferError;
use crate::output::{TransferOutput, TransferStats};
use crate::pipeline::coordinator::{UploadCoordinator, UploadSettings};
use crate::pipeline::import::{ImportTaskPoller, PollSettings};
use crate::pipeline::source::{ChunkSource, FileSource, MemorySource};
use crate::progress::{ProgressCallback, ProgressEvent};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Upload-then-convert for one file.
pub struct TransferPipeline {
    api: Arc<dyn DriveApi>,
    config: TransferConfig,
}

impl TransferPipeline {
    pub fn new(api: Arc<dyn DriveApi>, config: TransferConfig) -> Self {
        Self { api, config }
    }

    /// Build a pipeline whose API client is resolved from `config`.
    ///
    /// # Errors
    /// [`TransferError::NotConfigured`] when no client, credential, or
    /// environment token is available.
    pub fn from_config(config: &TransferConfig) -> Result<Self, TransferError> {
        Ok(Self::new(resolve_api(config)?, config.clone()))
    }

    /// Upload `source` as `file_name`, then import it into `destination`.
    ///
    /// `on_progress` overrides the callback stored in the config. Progress
    /// fires on session creation, every chunk, upload finish, import submit,
    /// every poll, and the terminal result (`Completed` or `Failed`).
    ///
    /// The conversion stage never starts unless the upload finished. The first
    /// error from either stage is returned unchanged.
    pub async fn run(
        &self,
        source: Arc<dyn ChunkSource>,
        file_name: &str,
        destination: &Destination,
        on_progress: Option<ProgressCallback>,
    ) -> Result<TransferOutput, TransferError> {
        let progress = on_progress.or_else(|| self.config.progress_callback.clone());
        let result = self
            .run_stages(source, file_name, destination, progress.clone())
            .await;

        if let Some(ref cb) = progress {
            match &result {
                Ok(out) => cb.on_progress(&ProgressEvent::completed(&out.url)),
                Err(e) => cb.on_progress(&ProgressEvent::failed(&e.to_string())),
            }
        }
        result
    }

    async fn run_stages(
        &self,
        source: Arc<dyn ChunkSource>,
        file_name: &str,
        destination: &Destination,
        progress: Option<ProgressCallback>,
    ) -> Result<TransferOutput, TransferError> {
        let total_start = Instant::now();
        let target = self.target_for(file_name)?;
        let file_size = source.len();
        info!(
            "Starting transfer: '{}' ({} bytes) → {}",
            file_name, file_size, target
        );

        // ── Stage 1: Upload ──────────────────────────────────────────────
        let coordinator = UploadCoordinator::new(
            Arc::clone(&self.api),
            UploadSettings::from_config(&self.config),
            progress.clone(),
        );
        let uploaded = coordinator.upload(source, file_name, file_size).await?;

        // ── Stage 2: Convert ─────────────────────────────────────────────
        let convert_start = Instant::now();
        let poller = ImportTaskPoller::new(
            Arc::clone(&self.api),
            PollSettings::from_config(&self.config),
            progress,
        );
        let outcome = poller
            .convert(&uploaded.file_token, file_name, target, destination)
            .await?;

        if !outcome.warnings.is_empty() {
            warn!(
                "Import of '{}' finished with {} warning(s)",
                file_name,
                outcome.warnings.len()
            );
        }

        let stats = TransferStats {
            file_size,
            total_chunks: uploaded.total_chunks,
            chunk_retries: uploaded.retries,
            polls: outcome.polls,
            upload_duration_ms: uploaded.duration_ms,
            conversion_duration_ms: convert_start.elapsed().as_millis() as u64,
            total_duration_ms: total_start.elapsed().as_millis() as u64,
        };
        info!(
            "Transfer complete: '{}' → {} in {}ms",
            file_name, outcome.result_handle, stats.total_duration_ms
        );

        Ok(TransferOutput {
            file_token: uploaded.file_token,
            result_handle: outcome.result_handle,
            url: outcome.url,
            doc_type: outcome.doc_type,
            warnings: outcome.warnings,
            stats,
        })
    }

    /// The configured target, or the natural one for the file's extension.
    fn target_for(&self, file_name: &str) -> Result<TargetType, TransferError> {
        let (_, extension) = split_file_name(file_name)?;
        match self.config.target_type {
            Some(target) => Ok(target),
            None => TargetType::infer(&extension).ok_or_else(|| {
                TransferError::InvalidInput(format!(
                    "cannot infer a target type for '.{extension}'; set one explicitly"
                ))
            }),
        }
    }
}

/// Upload the file at `path` and convert it.
///
/// This is the primary entry point for the library.
///
/// # Errors
/// - [`TransferError::FileNotFound`] / [`TransferError::FileRead`] for local
///   file problems
/// - [`TransferError::NotConfigured`] when no API client can be resolved
/// - any upload or conversion error, unchanged
///
/// # Example
/// ```rust,no_run
/// use drive_import::{transfer, Destination, TransferConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = TransferConfig::default();
/// let out = transfer("report.xlsx", &Destination::folder("fldcnXXXX"), &config).await?;
/// println!("{}", out.url);
/// # Ok(())
/// # }
/// ```
pub async fn transfer(
    path: impl AsRef<Path>,
    destination: &Destination,
    config: &TransferConfig,
) -> Result<TransferOutput, TransferError> {
    let path = path.as_ref();
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            TransferError::InvalidInput(format!("'{}' has no usable file name", path.display()))
        })?
        .to_string();

    let source = FileSource::open(path).await?;
    let pipeline = TransferPipeline::from_config(config)?;
    pipeline
        .run(Arc::new(source), &file_name, destination, None)
        .await
}

/// Upload in-memory `bytes` as `file_name` and convert them.
///
/// Useful when the data comes from a database or a network stream rather
/// than a file on disk.
pub async fn transfer_bytes(
    bytes: impl Into<Vec<u8>>,
    file_name: &str,
    destination: &Destination,
    config: &TransferConfig,
) -> Result<TransferOutput, TransferError> {
    let bytes: Vec<u8> = bytes.into();
    let pipeline = TransferPipeline::from_config(config)?;
    pipeline
        .run(Arc::new(MemorySource::new(bytes)), file_name, destination, None)
        .await
}

/// Synchronous wrapper around [`transfer`].
///
/// Creates a temporary tokio runtime internally.
pub fn transfer_sync(
    path: impl AsRef<Path>,
    destination: &Destination,
    config: &TransferConfig,
) -> Result<TransferOutput, TransferError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| TransferError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(transfer(path, destination, config))
}

/// Resolve the API client, from most-specific to least-specific.
///
/// 1. **Pre-built client** (`config.api`): used as-is. Tests inject fakes
///    here.
/// 2. **Credential** (`config.credential`): an [`HttpDriveApi`] rooted at
///    `config.base_url`.
/// 3. **Environment** (`DRIVE_IMPORT_ACCESS_TOKEN`): same, with a static
///    token.
pub fn resolve_api(config: &TransferConfig) -> Result<Arc<dyn DriveApi>, TransferError> {
    if let Some(ref api) = config.api {
        return Ok(Arc::clone(api));
    }

    let credential: SharedCredential = match config.credential {
        Some(ref c) => Arc::clone(c),
        None => match StaticCredential::from_env() {
            Some(c) => Arc::new(c),
            None => {
                return Err(TransferError::NotConfigured {
                    hint: format!(
                        "Set {ACCESS_TOKEN_ENV}, pass --token, or configure a credential provider."
                    ),
                })
            }
        },
    };

    let api = HttpDriveApi::new(
        config.base_url.clone(),
        credential,
        config.request_timeout_secs,
    )?;
    Ok(Arc::new(api))
}
