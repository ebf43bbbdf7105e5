//! Configuration types for a transfer.
//!
//! All transfer behaviour is controlled through [`TransferConfig`], built via
//! its [`TransferConfigBuilder`]. Unset fields keep the documented defaults;
//! [`TransferConfigBuilder::build`] rejects combinations that cannot work.

use crate::api::http::DEFAULT_BASE_URL;
use crate::api::{DriveApi, MountPoint};
use crate::credential::CredentialProvider;
use crate::error::TransferError;
use crate::pipeline::retry::RetryPolicy;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// 4 MiB, the platform's part size.
pub const DEFAULT_CHUNK_SIZE: u64 = 4 * 1024 * 1024;

/// Configuration for an upload-and-import transfer.
///
/// Built via [`TransferConfig::builder()`] or using
/// [`TransferConfig::default()`].
///
/// # Example
/// ```rust
/// use drive_import::{TargetType, TransferConfig};
///
/// let config = TransferConfig::builder()
///     .parent_node("fldcnXXXX")
///     .target_type(TargetType::Sheet)
///     .max_poll_attempts(60)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct TransferConfig {
    /// API root. Default: `https://open.feishu.cn/open-apis`.
    pub base_url: String,

    /// Parent kind for the uploaded file. Default: `explorer` (a drive folder).
    pub parent_type: String,

    /// Folder token the raw upload lands in. Default: empty (root).
    pub parent_node: String,

    /// Upper bound on the chunk size, in bytes. Default: 4 MiB.
    ///
    /// The service negotiates the real chunk size at prepare time; this value
    /// is used only when the service does not report one.
    pub max_chunk_size: u64,

    /// Concurrent chunk uploads. Default: 3.
    pub upload_concurrency: usize,

    /// Attempts per chunk, including the first. Default: 3.
    pub chunk_max_attempts: u32,

    /// First retry delay; doubles per attempt. Default: 1000 ms.
    pub retry_base_delay_ms: u64,

    /// Retry delay ceiling. Default: 5000 ms.
    pub retry_max_delay_ms: u64,

    /// Deadline for one chunk attempt. Default: 30 s.
    pub chunk_timeout_secs: u64,

    /// Wait between import status polls. Default: 2000 ms.
    pub poll_interval_ms: u64,

    /// Answered polls before giving up with an unknown outcome. Default: 30.
    pub max_poll_attempts: u32,

    /// Deadline for one status poll. Default: 10 s.
    pub poll_timeout_secs: u64,

    /// Consecutive network failures tolerated while polling. Default: 3.
    pub max_poll_network_failures: u32,

    /// Transport-level timeout for every HTTP request. Default: 60 s.
    pub request_timeout_secs: u64,

    /// Document type to convert into. `None` infers it from the file extension.
    pub target_type: Option<TargetType>,

    /// Pre-constructed API client. Takes precedence over `credential`.
    pub api: Option<Arc<dyn DriveApi>>,

    /// Bearer-token source used to build an [`crate::api::HttpDriveApi`].
    pub credential: Option<Arc<dyn CredentialProvider>>,

    /// Receives progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            parent_type: "explorer".to_string(),
            parent_node: String::new(),
            max_chunk_size: DEFAULT_CHUNK_SIZE,
            upload_concurrency: 3,
            chunk_max_attempts: 3,
            retry_base_delay_ms: 1000,
            retry_max_delay_ms: 5000,
            chunk_timeout_secs: 30,
            poll_interval_ms: 2000,
            max_poll_attempts: 30,
            poll_timeout_secs: 10,
            max_poll_network_failures: 3,
            request_timeout_secs: 60,
            target_type: None,
            api: None,
            credential: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for TransferConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferConfig")
            .field("base_url", &self.base_url)
            .field("parent_type", &self.parent_type)
            .field("parent_node", &self.parent_node)
            .field("max_chunk_size", &self.max_chunk_size)
            .field("upload_concurrency", &self.upload_concurrency)
            .field("chunk_max_attempts", &self.chunk_max_attempts)
            .field("chunk_timeout_secs", &self.chunk_timeout_secs)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("max_poll_attempts", &self.max_poll_attempts)
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .field("target_type", &self.target_type)
            .field("api", &self.api.as_ref().map(|_| "<dyn DriveApi>"))
            .field("credential", &self.credential.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl TransferConfig {
    /// Create a new builder for `TransferConfig`.
    pub fn builder() -> TransferConfigBuilder {
        TransferConfigBuilder {
            config: Self::default(),
        }
    }

    /// Retry policy for chunk uploads.
    pub fn chunk_retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.chunk_max_attempts,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
            max_delay: Duration::from_millis(self.retry_max_delay_ms),
        }
    }

    /// Retry policy for network failures while polling.
    pub fn poll_retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_poll_network_failures,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
            max_delay: Duration::from_millis(self.retry_max_delay_ms),
        }
    }
}

/// Builder for [`TransferConfig`].
#[derive(Debug)]
pub struct TransferConfigBuilder {
    config: TransferConfig,
}

impl TransferConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn parent_type(mut self, kind: impl Into<String>) -> Self {
        self.config.parent_type = kind.into();
        self
    }

    pub fn parent_node(mut self, token: impl Into<String>) -> Self {
        self.config.parent_node = token.into();
        self
    }

    pub fn max_chunk_size(mut self, bytes: u64) -> Self {
        self.config.max_chunk_size = bytes;
        self
    }

    pub fn upload_concurrency(mut self, n: usize) -> Self {
        self.config.upload_concurrency = n.max(1);
        self
    }

    pub fn chunk_max_attempts(mut self, n: u32) -> Self {
        self.config.chunk_max_attempts = n;
        self
    }

    pub fn retry_base_delay_ms(mut self, ms: u64) -> Self {
        self.config.retry_base_delay_ms = ms;
        self
    }

    pub fn retry_max_delay_ms(mut self, ms: u64) -> Self {
        self.config.retry_max_delay_ms = ms;
        self
    }

    pub fn chunk_timeout_secs(mut self, secs: u64) -> Self {
        self.config.chunk_timeout_secs = secs;
        self
    }

    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    pub fn max_poll_attempts(mut self, n: u32) -> Self {
        self.config.max_poll_attempts = n;
        self
    }

    pub fn poll_timeout_secs(mut self, secs: u64) -> Self {
        self.config.poll_timeout_secs = secs;
        self
    }

    pub fn max_poll_network_failures(mut self, n: u32) -> Self {
        self.config.max_poll_network_failures = n;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn target_type(mut self, target: TargetType) -> Self {
        self.config.target_type = Some(target);
        self
    }

    pub fn api(mut self, api: Arc<dyn DriveApi>) -> Self {
        self.config.api = Some(api);
        self
    }

    pub fn credential(mut self, credential: Arc<dyn CredentialProvider>) -> Self {
        self.config.credential = Some(credential);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<TransferConfig, TransferError> {
        let c = &self.config;
        if c.max_chunk_size == 0 {
            return Err(TransferError::InvalidConfig(
                "max_chunk_size must be ≥ 1 byte".into(),
            ));
        }
        if c.upload_concurrency == 0 {
            return Err(TransferError::InvalidConfig(
                "upload_concurrency must be ≥ 1".into(),
            ));
        }
        if c.chunk_max_attempts == 0 {
            return Err(TransferError::InvalidConfig(
                "chunk_max_attempts must be ≥ 1".into(),
            ));
        }
        if c.max_poll_attempts == 0 {
            return Err(TransferError::InvalidConfig(
                "max_poll_attempts must be ≥ 1".into(),
            ));
        }
        if c.max_poll_network_failures == 0 {
            return Err(TransferError::InvalidConfig(
                "max_poll_network_failures must be ≥ 1".into(),
            ));
        }
        if c.chunk_timeout_secs == 0 || c.poll_timeout_secs == 0 || c.request_timeout_secs == 0 {
            return Err(TransferError::InvalidConfig(
                "timeouts must be ≥ 1 second".into(),
            ));
        }
        if c.retry_base_delay_ms > c.retry_max_delay_ms {
            return Err(TransferError::InvalidConfig(format!(
                "retry base delay ({}ms) exceeds the cap ({}ms)",
                c.retry_base_delay_ms, c.retry_max_delay_ms
            )));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Online document type an import produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    /// Online spreadsheet.
    Sheet,
    /// Multi-dimensional table.
    Bitable,
    /// Rich-text document.
    Docx,
}

impl TargetType {
    pub fn as_str(self) -> &'static str {
        match self {
            TargetType::Sheet => "sheet",
            TargetType::Bitable => "bitable",
            TargetType::Docx => "docx",
        }
    }

    /// Pick the natural target for a source extension (case-insensitive).
    pub fn infer(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "xlsx" | "xls" | "csv" => Some(TargetType::Sheet),
            "docx" | "doc" | "txt" | "md" | "mark" | "markdown" | "html" => Some(TargetType::Docx),
            _ => None,
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TargetType {
    type Err = TransferError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sheet" => Ok(TargetType::Sheet),
            "bitable" => Ok(TargetType::Bitable),
            "docx" => Ok(TargetType::Docx),
            other => Err(TransferError::InvalidInput(format!(
                "unknown target type '{other}' (expected sheet, bitable, or docx)"
            ))),
        }
    }
}

/// Where the converted document is mounted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    /// Mount kind; `1` is a drive folder.
    pub mount_type: u8,
    /// Folder token; empty means the drive root.
    pub folder_token: String,
}

impl Default for Destination {
    fn default() -> Self {
        Self::folder("")
    }
}

impl Destination {
    /// Mount type `1`: a folder in the caller's drive.
    pub const MOUNT_TYPE_FOLDER: u8 = 1;

    pub fn folder(token: impl Into<String>) -> Self {
        Self {
            mount_type: Self::MOUNT_TYPE_FOLDER,
            folder_token: token.into(),
        }
    }

    pub fn with_mount_type(mut self, mount_type: u8) -> Self {
        self.mount_type = mount_type;
        self
    }

    pub fn mount_point(&self) -> MountPoint {
        MountPoint {
            mount_type: self.mount_type,
            mount_key: self.folder_token.clone(),
        }
    }
}

/// Split `file_name` into `(stem, lowercase extension)`.
///
/// # Errors
/// [`TransferError::InvalidInput`] when the name has no extension, since the
/// import endpoint requires one.
pub fn split_file_name(file_name: &str) -> Result<(String, String), TransferError> {
    let path = Path::new(file_name);
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .ok_or_else(|| {
            TransferError::InvalidInput(format!("'{file_name}' has no file extension"))
        })?;
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name);
    Ok((stem.to_string(), ext.to_ascii_lowercase()))
}
