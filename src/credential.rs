//! Bearer-credential injection.
//!
//! The pipeline never owns a token. It asks a [`CredentialProvider`] right
//! before each request, so a provider backed by a refreshing token cache can
//! rotate credentials mid-transfer without the pipeline noticing. How tokens
//! are obtained and refreshed is the provider's business.

use crate::error::ApiError;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Environment variable consulted when no credential is configured.
pub const ACCESS_TOKEN_ENV: &str = "DRIVE_IMPORT_ACCESS_TOKEN";

/// Supplies the bearer token attached to every API call.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn credential(&self) -> Result<String, ApiError>;
}

/// A fixed token, e.g. from the command line or an environment variable.
#[derive(Clone)]
pub struct StaticCredential {
    token: String,
}

impl StaticCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Read the token from [`ACCESS_TOKEN_ENV`]; `None` when unset or empty.
    pub fn from_env() -> Option<Self> {
        std::env::var(ACCESS_TOKEN_ENV)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .map(|t| Self::new(t.trim()))
    }
}

impl fmt::Debug for StaticCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredential")
            .field("token", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl CredentialProvider for StaticCredential {
    async fn credential(&self) -> Result<String, ApiError> {
        if self.token.is_empty() {
            return Err(ApiError::Credential("access token is empty".into()));
        }
        Ok(self.token.clone())
    }
}

/// Convenience alias for the shared provider handle.
pub type SharedCredential = Arc<dyn CredentialProvider>;
