//! HTTP client for the backend's upload and user-details endpoints.

use std::time::Duration;

use async_trait::async_trait;
use fixr_core::{ArenaError, BackendResult, FinalResult, UploadDocument, UserDetails};
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

pub const DEFAULT_API_URL: &str = "http://localhost:3000";

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("server returned {status}: {}", .message.as_deref().unwrap_or("no message"))]
    Backend {
        status: u16,
        message: Option<String>,
    },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Rejected(#[from] ArenaError),
}

/// The two calls the front end makes against the backend.
#[async_trait]
pub trait LoanBackend: Send + Sync {
    /// Where requests go, for user-facing messages.
    fn endpoint(&self) -> &str;

    async fn upload(&self, document: &UploadDocument) -> Result<BackendResult, ClientError>;

    async fn submit_user_details(
        &self,
        details: &UserDetails,
        result: &FinalResult,
    ) -> Result<(), ClientError>;
}

/// HTTP client for the FIXR backend.
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UserDetailsPayload<'a> {
    #[serde(flatten)]
    details: &'a UserDetails,
    loan_result: &'a FinalResult,
}

impl ApiClient {
    /// Create a client for the given backend base URL.
    ///
    /// `base_url` should be like `http://localhost:3000` (a trailing slash is
    /// dropped).
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Same as [`ApiClient::new`] with an overall per-request timeout.
    pub fn with_timeout(base_url: String, timeout: Duration) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Upload a loan-offer document as multipart field `file`.
    ///
    /// Returns whatever the backend extracted; every field may be missing.
    pub async fn upload(&self, document: &UploadDocument) -> Result<BackendResult, ClientError> {
        document.validate()?;
        let url = format!("{}/api/upload", self.base_url);

        let part = Part::bytes(document.bytes.clone())
            .file_name(document.file_name.clone())
            .mime_str(document.mime_type())?;
        let form = Form::new().part("file", part);

        info!(url = %url, file = %document.file_name, size = document.bytes.len(), "uploading loan document");
        let resp = self.client.post(&url).multipart(form).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let err = backend_error(status.as_u16(), &body);
            warn!(status = status.as_u16(), error = %err, "upload rejected");
            return Err(err);
        }

        let body = resp.text().await?;
        let result: BackendResult = serde_json::from_str(&body)?;
        info!(original = ?result.original_amount, new = ?result.new_amount, "upload accepted");
        Ok(result)
    }

    /// Post contact details together with the negotiated result.
    pub async fn submit_user_details(
        &self,
        details: &UserDetails,
        result: &FinalResult,
    ) -> Result<(), ClientError> {
        details.validate()?;
        let url = format!("{}/api/user-details", self.base_url);
        let payload = UserDetailsPayload {
            details,
            loan_result: result,
        };

        info!(url = %url, "submitting user details");
        let resp = self.client.post(&url).json(&payload).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let err = backend_error(status.as_u16(), &body);
            warn!(status = status.as_u16(), error = %err, "user details rejected");
            return Err(err);
        }
        info!("user details accepted");
        Ok(())
    }
}

#[async_trait]
impl LoanBackend for ApiClient {
    fn endpoint(&self) -> &str {
        self.base_url()
    }

    async fn upload(&self, document: &UploadDocument) -> Result<BackendResult, ClientError> {
        ApiClient::upload(self, document).await
    }

    async fn submit_user_details(
        &self,
        details: &UserDetails,
        result: &FinalResult,
    ) -> Result<(), ClientError> {
        ApiClient::submit_user_details(self, details, result).await
    }
}

/// Build a [`ClientError::Backend`], taking the message from a JSON
/// `{"message": ...}` body when there is one.
fn backend_error(status: u16, body: &str) -> ClientError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.trim().is_empty());
    ClientError::Backend { status, message }
}
