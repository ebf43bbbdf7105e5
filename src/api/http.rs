//! reqwest implementation of [`DriveApi`].
//!
//! All endpoints answer with the `{code, msg, data}` envelope. A response is
//! successful only when the HTTP status is 2xx **and** `code == 0`; anything
//! else becomes an [`ApiError`] that keeps the status or code so retry logic
//! upstream can classify it.

use super::models::{
    ChunkAck, Envelope, FinishRequest, FinishResponse, ImportQueryResponse, ImportRequest,
    ImportSubmitResponse, ImportTaskResult, PartUpload, PrepareRequest, PrepareResponse,
};
use super::DriveApi;
use crate::credential::SharedCredential;
use crate::error::{ApiError, TransferError};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Url};
use serde::de::DeserializeOwned;
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Default API root.
pub const DEFAULT_BASE_URL: &str = "https://open.feishu.cn/open-apis";

/// HTTP client for the drive API.
pub struct HttpDriveApi {
    client: reqwest::Client,
    base_url: String,
    credential: SharedCredential,
    timeout_secs: u64,
}

impl fmt::Debug for HttpDriveApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpDriveApi")
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl HttpDriveApi {
    /// Build a client rooted at `base_url`.
    ///
    /// `timeout_secs` is the transport-level ceiling for any single request;
    /// the pipeline applies tighter per-stage deadlines on top of it.
    pub fn new(
        base_url: impl Into<String>,
        credential: SharedCredential,
        timeout_secs: u64,
    ) -> Result<Self, TransferError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| TransferError::InvalidConfig(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credential,
            timeout_secs,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// `path` followed by one percent-encoded segment.
    fn url_with_segment(&self, path: &str, segment: &str) -> Result<Url, ApiError> {
        let mut url = Url::parse(&self.url(path))
            .map_err(|e| ApiError::Transport(format!("invalid URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::Transport(format!("cannot append to {}", self.base_url)))?
            .push(segment);
        Ok(url)
    }

    async fn bearer(&self) -> Result<String, ApiError> {
        Ok(format!("Bearer {}", self.credential.credential().await?))
    }

    fn send_error(&self, e: reqwest::Error) -> ApiError {
        if e.is_timeout() {
            ApiError::Timeout {
                secs: self.timeout_secs,
            }
        } else {
            ApiError::from(e)
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<Option<T>, ApiError> {
        let response = request
            .header(reqwest::header::AUTHORIZATION, self.bearer().await?)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| self.send_error(e))?;

        if !status.is_success() {
            let body = String::from_utf8_lossy(&body).into_owned();
            return Err(ApiError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: Envelope<T> =
            serde_json::from_slice(&body).map_err(|e| ApiError::Decode(e.to_string()))?;

        if envelope.code != 0 {
            return Err(ApiError::Application {
                code: envelope.code,
                msg: envelope.msg,
            });
        }

        Ok(envelope.data)
    }

    async fn send_required<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        self.send(request)
            .await?
            .ok_or_else(|| ApiError::Decode("response envelope has no data".into()))
    }
}

#[async_trait]
impl DriveApi for HttpDriveApi {
    async fn prepare(&self, request: &PrepareRequest) -> Result<PrepareResponse, ApiError> {
        debug!("upload_prepare: {} ({} bytes)", request.file_name, request.size);
        self.send_required(
            self.client
                .post(self.url("drive/v1/files/upload_prepare"))
                .json(request),
        )
        .await
    }

    async fn upload_part(&self, part: &PartUpload) -> Result<ChunkAck, ApiError> {
        let file = Part::stream_with_length(Body::from(part.bytes.clone()), part.size() as u64)
            .file_name("chunk")
            .mime_str("application/octet-stream")
            .map_err(ApiError::from)?;

        let form = Form::new()
            .text("upload_id", part.upload_id.clone())
            .text("seq", part.seq.to_string())
            .text("size", part.size().to_string())
            .text("checksum", part.checksum.to_string())
            .part("file", file);

        let _: Option<serde_json::Value> = self
            .send(
                self.client
                    .post(self.url("drive/v1/files/upload_part"))
                    .multipart(form),
            )
            .await?;

        Ok(ChunkAck {
            seq: part.seq,
            checksum: part.checksum,
        })
    }

    async fn finish(
        &self,
        upload_id: &str,
        total_chunks: u32,
        _acks: &[ChunkAck],
    ) -> Result<String, ApiError> {
        // The platform tracks parts server-side; only the count is sent.
        let body = FinishRequest {
            upload_id: upload_id.to_string(),
            block_num: total_chunks,
        };
        let resp: FinishResponse = self
            .send_required(
                self.client
                    .post(self.url("drive/v1/files/upload_finish"))
                    .json(&body),
            )
            .await?;
        Ok(resp.file_token)
    }

    async fn submit_import(&self, request: &ImportRequest) -> Result<String, ApiError> {
        let resp: ImportSubmitResponse = self
            .send_required(self.client.post(self.url("drive/v1/import_tasks")).json(request))
            .await?;
        Ok(resp.ticket)
    }

    async fn poll_import(&self, ticket: &str) -> Result<ImportTaskResult, ApiError> {
        let url = self.url_with_segment("drive/v1/import_tasks", ticket)?;
        let resp: ImportQueryResponse = self.send_required(self.client.get(url)).await?;
        Ok(resp.result)
    }
}
