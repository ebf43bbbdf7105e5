//! Split a file into ordered, fixed-size byte ranges.

use crate::error::TransferError;
use serde::Serialize;
use std::fmt;

/// Half-open byte range `[start, end)` within the source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// `ceil(file_size / chunk_size)`; zero when `chunk_size` is zero.
pub fn chunk_count(file_size: u64, chunk_size: u64) -> u64 {
    if chunk_size == 0 {
        return 0;
    }
    file_size.div_ceil(chunk_size)
}

/// Cut `[0, file_size)` into `ceil(file_size / max_chunk_size)` contiguous
/// ranges. Every range but the last is exactly `max_chunk_size` long.
///
/// # Errors
/// [`TransferError::InvalidInput`] when either size is zero.
pub fn split(file_size: u64, max_chunk_size: u64) -> Result<Vec<ByteRange>, TransferError> {
    if file_size == 0 {
        return Err(TransferError::InvalidInput(
            "file size must be greater than zero".into(),
        ));
    }
    if max_chunk_size == 0 {
        return Err(TransferError::InvalidInput(
            "chunk size must be greater than zero".into(),
        ));
    }

    let count = chunk_count(file_size, max_chunk_size);
    let ranges = (0..count)
        .map(|i| {
            let start = i * max_chunk_size;
            ByteRange {
                start,
                end: (start + max_chunk_size).min(file_size),
            }
        })
        .collect();
    Ok(ranges)
}
