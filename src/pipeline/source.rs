//! Where chunk bytes come from.
//!
//! A [`ChunkSource`] hands out exact byte ranges on demand, so a multi-GB
//! file never has to sit in memory: each worker reads only the chunk it is
//! about to send. [`FileSource`] does positioned reads through `tokio::fs`;
//! [`MemorySource`] serves an owned buffer (handy when the bytes come from a
//! database or a network stream rather than disk).

use super::chunker::ByteRange;
use crate::error::TransferError;
use async_trait::async_trait;
use bytes::Bytes;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::debug;

/// Random-access byte source for an upload.
#[async_trait]
pub trait ChunkSource: Send + Sync {
    /// Total length in bytes.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read exactly `range`.
    ///
    /// A source that can no longer supply the range (a file truncated since it
    /// was opened) fails with [`TransferError::FileRead`].
    async fn read_range(&self, range: ByteRange) -> Result<Bytes, TransferError>;
}

/// A local file, opened fresh for each read so workers never share a cursor.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    len: u64,
}

impl FileSource {
    /// Stat `path` and capture its size.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, TransferError> {
        let path = path.as_ref().to_path_buf();
        let meta = match tokio::fs::metadata(&path).await {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TransferError::FileNotFound { path });
            }
            Err(source) => return Err(TransferError::FileRead { path, source }),
        };
        if !meta.is_file() {
            return Err(TransferError::InvalidInput(format!(
                "'{}' is not a regular file",
                path.display()
            )));
        }
        debug!("Resolved local file: {} ({} bytes)", path.display(), meta.len());
        Ok(Self {
            path,
            len: meta.len(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ChunkSource for FileSource {
    fn len(&self) -> u64 {
        self.len
    }

    async fn read_range(&self, range: ByteRange) -> Result<Bytes, TransferError> {
        let read_err = |source| TransferError::FileRead {
            path: self.path.clone(),
            source,
        };
        let mut file = tokio::fs::File::open(&self.path).await.map_err(read_err)?;
        file.seek(SeekFrom::Start(range.start))
            .await
            .map_err(read_err)?;
        let mut buf = vec![0u8; range.len() as usize];
        file.read_exact(&mut buf).await.map_err(read_err)?;
        Ok(Bytes::from(buf))
    }
}

/// An in-memory buffer. Ranges are handed out as zero-copy slices.
#[derive(Debug, Clone)]
pub struct MemorySource {
    bytes: Bytes,
}

impl MemorySource {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }
}

#[async_trait]
impl ChunkSource for MemorySource {
    fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    async fn read_range(&self, range: ByteRange) -> Result<Bytes, TransferError> {
        let (start, end) = (range.start as usize, range.end as usize);
        if start > end || end > self.bytes.len() {
            return Err(TransferError::InvalidInput(format!(
                "range {range} outside buffer of {} bytes",
                self.bytes.len()
            )));
        }
        Ok(self.bytes.slice(start..end))
    }
}
