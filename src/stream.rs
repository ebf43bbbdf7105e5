//! Streaming progress API: receive events as a `Stream`.
//!
//! [`transfer_stream`] spawns the transfer on the current runtime and hands
//! back both halves: the event stream and the join handle carrying the final
//! result. The stream ends once the transfer finishes, after its terminal
//! `Completed` or `Failed` event.

use crate::config::{Destination, TransferConfig};
use crate::error::TransferError;
use crate::output::TransferOutput;
use crate::progress::{ChannelProgress, ProgressEvent};
use crate::transfer::transfer;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::info;

/// A running transfer.
pub struct TransferHandle {
    /// Every progress event, in emission order.
    pub events: UnboundedReceiverStream<ProgressEvent>,
    /// Resolves to the transfer's result.
    pub result: JoinHandle<Result<TransferOutput, TransferError>>,
}

impl TransferHandle {
    /// Wait for the final result, discarding any unread events.
    pub async fn finish(self) -> Result<TransferOutput, TransferError> {
        self.result
            .await
            .map_err(|e| TransferError::Internal(format!("transfer task failed: {e}")))?
    }
}

/// Start transferring the file at `path`, streaming its progress.
///
/// Any progress callback already set on `config` is replaced by the stream.
/// Must be called from within a tokio runtime.
///
/// # Example
/// ```rust,no_run
/// use drive_import::{transfer_stream, Destination, TransferConfig};
/// use futures::StreamExt;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = TransferConfig::default();
/// let mut handle = transfer_stream("report.xlsx", Destination::default(), &config);
/// while let Some(event) = handle.events.next().await {
///     println!("{:>5.1}% {}", event.percent, event.message);
/// }
/// let out = handle.finish().await?;
/// println!("{}", out.url);
/// # Ok(())
/// # }
/// ```
pub fn transfer_stream(
    path: impl Into<PathBuf>,
    destination: Destination,
    config: &TransferConfig,
) -> TransferHandle {
    let path = path.into();
    let (tx, rx) = mpsc::unbounded_channel();

    let mut config = config.clone();
    config.progress_callback = Some(Arc::new(ChannelProgress::new(tx)));

    info!("Starting streaming transfer: {}", path.display());
    let result = tokio::spawn(async move { transfer(&path, &destination, &config).await });

    TransferHandle {
        events: UnboundedReceiverStream::new(rx),
        result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn missing_file_ends_stream_without_events() {
        let config = TransferConfig::default();
        let mut handle = transfer_stream("/no/such/file.xlsx", Destination::default(), &config);
        assert!(handle.events.next().await.is_none());
        assert!(matches!(
            handle.finish().await,
            Err(TransferError::FileNotFound { .. })
        ));
    }
}
