//! Submit an import task and poll it to a terminal state.
//!
//! ```text
//! Queued ──▶ Processing ──▶ Succeeded
//!    │            │
//!    └────────────┴───────▶ Failed(code)
//! ```
//!
//! Every answered poll counts toward `max_poll_attempts`. Network failures
//! (transport, timeout, 5xx, 429) are retried in place and do not count; too
//! many in a row end the transfer with a [`TransferError::Conversion`] of kind
//! [`ImportErrorCode::Connectivity`]. Reaching the ceiling ends it with
//! [`TransferError::ConversionTimeout`], whose outcome is unknown: the task
//! may still finish server-side.

use super::retry::{retry_with_backoff, RetryPolicy};
use crate::api::{DriveApi, ImportErrorCode, ImportRequest, ImportTaskResult, CONNECTIVITY_CODE};
use crate::config::{split_file_name, Destination, TargetType, TransferConfig};
use crate::error::{ApiError, TransferError};
use crate::progress::{ProgressCallback, ProgressEvent};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

/// State of a remote import task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportStatus {
    Queued,
    Processing,
    Succeeded,
    Failed { code: u32 },
}

impl ImportStatus {
    /// Map the service's `job_status`: 0 done, 1 initialising, 2 processing,
    /// anything else is a failure code.
    pub fn from_job_status(job_status: u32) -> Self {
        match job_status {
            0 => ImportStatus::Succeeded,
            1 => ImportStatus::Queued,
            2 => ImportStatus::Processing,
            code => ImportStatus::Failed { code },
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ImportStatus::Succeeded | ImportStatus::Failed { .. })
    }
}

impl fmt::Display for ImportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportStatus::Queued => f.write_str("queued"),
            ImportStatus::Processing => f.write_str("processing"),
            ImportStatus::Succeeded => f.write_str("succeeded"),
            ImportStatus::Failed { code } => write!(f, "failed ({code})"),
        }
    }
}

/// A finished import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportOutcome {
    pub ticket: String,
    /// Token of the converted document.
    pub result_handle: String,
    pub url: String,
    pub doc_type: String,
    /// Non-fatal notices the service attached to a successful import.
    pub warnings: Vec<String>,
    /// Answered polls it took.
    pub polls: u32,
}

/// Timing knobs for [`ImportTaskPoller`].
#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    pub interval: Duration,
    pub max_attempts: u32,
    pub attempt_timeout: Duration,
    pub network_retry: RetryPolicy,
}

impl PollSettings {
    pub fn from_config(config: &TransferConfig) -> Self {
        Self {
            interval: Duration::from_millis(config.poll_interval_ms),
            max_attempts: config.max_poll_attempts,
            attempt_timeout: Duration::from_secs(config.poll_timeout_secs),
            network_retry: config.poll_retry_policy(),
        }
    }
}

pub struct ImportTaskPoller {
    api: Arc<dyn DriveApi>,
    settings: PollSettings,
    progress: Option<ProgressCallback>,
}

impl ImportTaskPoller {
    pub fn new(
        api: Arc<dyn DriveApi>,
        settings: PollSettings,
        progress: Option<ProgressCallback>,
    ) -> Self {
        Self {
            api,
            settings,
            progress,
        }
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(ref cb) = self.progress {
            cb.on_progress(&event);
        }
    }

    /// Submit then poll; see the module docs for the state machine.
    pub async fn convert(
        &self,
        file_token: &str,
        file_name: &str,
        target: TargetType,
        destination: &Destination,
    ) -> Result<ImportOutcome, TransferError> {
        let ticket = self
            .submit(file_token, file_name, target, destination)
            .await?;
        let mut outcome = self.poll(&ticket).await?;
        if outcome.doc_type.is_empty() {
            outcome.doc_type = target.as_str().to_string();
        }
        Ok(outcome)
    }

    /// Create the import task. Not retried.
    pub async fn submit(
        &self,
        file_token: &str,
        file_name: &str,
        target: TargetType,
        destination: &Destination,
    ) -> Result<String, TransferError> {
        let (stem, extension) = split_file_name(file_name)?;
        let request = ImportRequest {
            file_extension: extension,
            file_token: file_token.to_string(),
            target_type: target.as_str().to_string(),
            file_name: stem,
            point: destination.mount_point(),
        };
        debug!("Submitting import: {:?}", request);

        let ticket = self
            .api
            .submit_import(&request)
            .await
            .map_err(|source| TransferError::TaskSubmit {
                file_token: file_token.to_string(),
                source,
            })?;

        info!("Import task {} submitted ({} → {})", ticket, request.file_extension, target);
        self.emit(ProgressEvent::conversion_submitted(&ticket));
        Ok(ticket)
    }

    /// Poll `ticket` until it succeeds, fails, or the ceiling is reached.
    pub async fn poll(&self, ticket: &str) -> Result<ImportOutcome, TransferError> {
        let max = self.settings.max_attempts.max(1);

        for attempt in 1..=max {
            let result = self.query(ticket).await?;
            let status = ImportStatus::from_job_status(result.job_status);
            debug!("Import {}: poll {}/{} → {}", ticket, attempt, max, status);

            match status {
                ImportStatus::Queued | ImportStatus::Processing => {
                    self.emit(ProgressEvent::converting(attempt, max, &status.to_string()));
                    if attempt < max {
                        sleep(self.settings.interval).await;
                    }
                }
                ImportStatus::Succeeded => return succeeded(ticket, result, attempt),
                ImportStatus::Failed { code } => return Err(failure(code, &result.job_error_msg)),
            }
        }

        warn!("Import {} still running after {} polls", ticket, max);
        Err(TransferError::ConversionTimeout {
            ticket: ticket.to_string(),
            attempts: max,
        })
    }

    /// One answered poll, retrying network failures in place.
    async fn query(&self, ticket: &str) -> Result<ImportTaskResult, TransferError> {
        let label = format!("import {ticket}");
        let result = retry_with_backoff(
            &self.settings.network_retry,
            None,
            ApiError::is_network,
            &label,
            |_| self.query_once(ticket),
        )
        .await;

        match result {
            Ok((task, _)) => Ok(task),
            Err(failure) if failure.error.is_network() => {
                warn!("Import {}: unreachable after {} attempts", ticket, failure.attempts);
                Err(connectivity_failure(ticket, failure.attempts, &failure.error))
            }
            Err(failure) => Err(TransferError::TaskQuery {
                ticket: ticket.to_string(),
                source: failure.error,
            }),
        }
    }

    async fn query_once(&self, ticket: &str) -> Result<ImportTaskResult, ApiError> {
        match timeout(self.settings.attempt_timeout, self.api.poll_import(ticket)).await {
            Ok(result) => result,
            Err(_) => Err(ApiError::Timeout {
                secs: self.settings.attempt_timeout.as_secs(),
            }),
        }
    }
}

fn succeeded(ticket: &str, result: ImportTaskResult, polls: u32) -> Result<ImportOutcome, TransferError> {
    if result.token.is_empty() {
        return Err(TransferError::TaskQuery {
            ticket: ticket.to_string(),
            source: ApiError::Decode("import succeeded without a document token".into()),
        });
    }
    for notice in &result.extra {
        warn!("Import {}: {}", ticket, notice);
    }
    info!("Import {} done → {} {}", ticket, result.doc_type, result.token);
    Ok(ImportOutcome {
        ticket: ticket.to_string(),
        result_handle: result.token,
        url: result.url,
        doc_type: result.doc_type,
        warnings: result.extra,
        polls,
    })
}

fn connectivity_failure(ticket: &str, failures: u32, last: &ApiError) -> TransferError {
    let kind = ImportErrorCode::Connectivity;
    TransferError::Conversion {
        code: CONNECTIVITY_CODE,
        kind,
        message: format!(
            "{}: import task '{ticket}' unreachable after {failures} consecutive network failures ({last})",
            kind.message()
        ),
    }
}

fn failure(code: u32, service_msg: &str) -> TransferError {
    match ImportErrorCode::from_code(code) {
        Some(kind) => {
            if !service_msg.is_empty() {
                debug!("Import code {} service message: {}", code, service_msg);
            }
            TransferError::Conversion {
                code,
                kind,
                message: kind.message().to_string(),
            }
        }
        None => TransferError::UnknownConversion {
            code,
            message: if service_msg.is_empty() {
                "no message from the service".to_string()
            } else {
                service_msg.to_string()
            },
        },
    }
}
