//! # drive-import
//!
//! Upload a local file to a cloud drive in checksummed chunks, then have the
//! platform convert it into an online document (spreadsheet, multi-dimensional
//! table, or rich-text doc).
//!
//! ## Background
//!
//! The drive's part-upload endpoint takes at most 4 MiB per request and the
//! conversion runs asynchronously behind a ticket. Doing it by hand means
//! juggling a session, per-chunk Adler-32 checksums, retries, bounded
//! parallelism, and a polling loop with its own failure codes. This crate
//! wraps all of it in one call that returns the document's token and URL.
//!
//! ## Pipeline Overview
//!
//! ```text
//! file
//!  │
//!  ├─ 1. Prepare   open an upload session, learn the chunk size
//!  ├─ 2. Chunks    ≤ 3 concurrent part uploads, Adler-32 + retry each
//!  ├─ 3. Finish    assemble once every chunk succeeded → file token
//!  ├─ 4. Import    submit a conversion task → ticket
//!  └─ 5. Poll      until done, failed, or the ceiling is reached
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use drive_import::{transfer, Destination, TransferConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Token read from DRIVE_IMPORT_ACCESS_TOKEN
//!     let config = TransferConfig::default();
//!     let out = transfer("report.xlsx", &Destination::folder("fldcnXXXX"), &config).await?;
//!     println!("{} ({} chunks)", out.url, out.stats.total_chunks);
//!     for w in &out.warnings {
//!         eprintln!("warning: {w}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `drive-import` binary (clap + indicatif + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! drive-import = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod api;
pub mod config;
pub mod credential;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod stream;
pub mod transfer;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use api::{DriveApi, HttpDriveApi, ImportErrorCode};
pub use config::{Destination, TargetType, TransferConfig, TransferConfigBuilder};
pub use credential::{CredentialProvider, StaticCredential};
pub use error::{ApiError, TransferError};
pub use output::{TransferOutput, TransferStats};
pub use pipeline::checksum::adler32;
pub use pipeline::import::{ImportOutcome, ImportStatus};
pub use pipeline::source::{ChunkSource, FileSource, MemorySource};
pub use progress::{
    ChannelProgress, NoopProgressCallback, Phase, ProgressCallback, ProgressEvent,
    TransferProgressCallback,
};
pub use stream::{transfer_stream, TransferHandle};
pub use transfer::{transfer, transfer_bytes, transfer_sync, TransferPipeline};
