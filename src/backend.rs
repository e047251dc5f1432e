//! Backend API client: the one place that knows the wire protocol.
//!
//! Every endpoint of the translation backend is wrapped by the
//! [`BackendApi`] trait. The session, the poller, and the result loader all
//! talk to `dyn BackendApi`, never to reqwest directly — which is what lets
//! the integration tests drive the whole client against an in-process
//! scripted fake. [`HttpBackend`] is the production implementation.
//!
//! ## Endpoints
//!
//! | Method | Path                      | Purpose                              |
//! |--------|---------------------------|--------------------------------------|
//! | POST   | `/upload-pdf/`            | multipart upload, field `pdf_file`   |
//! | POST   | `/validate-pdf-path/`     | JSON `{path}` → validity verdict     |
//! | POST   | `/translate-pdf/`         | form `file_path`, `target_language`  |
//! | GET    | `/result-status/{id}`     | job status, keyed by source filename |
//! | GET    | `/pdf-list/`              | previously uploaded PDFs             |
//! | GET    | `/results/`               | artifact availability listing        |
//! | GET    | `/download-results/{id}`  | ZIP bundling every artifact          |
//!
//! Artifact bodies are fetched by their listing `path` joined onto the base
//! URL.

use async_trait::async_trait;
use reqwest::multipart;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::TranslateError;
use crate::job::JobStatus;
use crate::results::ResultSet;

// ── Wire DTOs ────────────────────────────────────────────────────────────────

/// What the backend reports for an uploaded (or listed) PDF.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedPdf {
    pub path: String,
    pub filename: String,
    #[serde(rename = "size", default)]
    pub size_bytes: u64,
}

/// Verdict from `/validate-pdf-path/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathValidation {
    pub valid: bool,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Response from `/result-status/{id}`.
///
/// The backend may embed a result listing here too; `/results/` is the
/// single source for availability, so anything beyond `status` and
/// `message` is deliberately ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: JobStatus,
    #[serde(default)]
    pub message: Option<String>,
}

// ── The seam ─────────────────────────────────────────────────────────────────

/// Everything the backend can do, as an object-safe async trait.
///
/// Production code uses [`HttpBackend`]; tests implement this with scripted
/// responses and call counters.
#[async_trait]
pub trait BackendApi: Send + Sync {
    /// POST the PDF bytes as multipart (file field `pdf_file`).
    async fn upload_pdf(&self, filename: &str, bytes: Vec<u8>)
        -> Result<UploadedPdf, TranslateError>;

    /// Ask the backend whether a server-local path points at a real PDF.
    async fn validate_path(&self, path: &str) -> Result<PathValidation, TranslateError>;

    /// Kick off a translation job. The backend acknowledges immediately and
    /// works in the background; progress is observed via [`Self::job_status`].
    async fn start_translation(
        &self,
        file_path: &str,
        target_language: &str,
    ) -> Result<(), TranslateError>;

    /// One status query for `/result-status/{job_id}`.
    async fn job_status(&self, job_id: &str) -> Result<StatusResponse, TranslateError>;

    /// Previously uploaded PDFs available for re-selection.
    async fn list_pdfs(&self) -> Result<Vec<UploadedPdf>, TranslateError>;

    /// Which result artifacts exist right now.
    async fn list_results(&self) -> Result<ResultSet, TranslateError>;

    /// Fetch one artifact body by its listing path.
    async fn fetch_bytes(&self, path: &str) -> Result<Vec<u8>, TranslateError>;

    /// The ZIP archive bundling every artifact for `job_id`.
    async fn download_archive(&self, job_id: &str) -> Result<Vec<u8>, TranslateError>;
}

// ── HTTP implementation ──────────────────────────────────────────────────────

/// reqwest-backed [`BackendApi`].
///
/// Holds two clients: one with the short control-plane timeout, one with
/// the longer download timeout for artifact and archive bodies.
///
/// One-off calls can drive it directly, without a session:
///
/// ```rust,no_run
/// use pdftrans::{BackendApi, ClientConfig, HttpBackend};
///
/// # tokio_test::block_on(async {
/// let backend = HttpBackend::new(&ClientConfig::default()).unwrap();
/// for pdf in backend.list_pdfs().await.unwrap() {
///     println!("{} ({} bytes)", pdf.filename, pdf.size_bytes);
/// }
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct HttpBackend {
    http: reqwest::Client,
    download: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    /// Build from a validated [`ClientConfig`].
    pub fn new(config: &ClientConfig) -> Result<Self, TranslateError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| TranslateError::InvalidConfig(format!("cannot build HTTP client: {e}")))?;
        let download = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.download_timeout_secs))
            .build()
            .map_err(|e| {
                TranslateError::InvalidConfig(format!("cannot build download client: {e}"))
            })?;
        Ok(Self {
            http,
            download,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// The normalized base URL (no trailing slash).
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Join a path onto the base URL with exactly one slash.
    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl BackendApi for HttpBackend {
    async fn upload_pdf(
        &self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadedPdf, TranslateError> {
        const CONTEXT: &str = "uploading the PDF";
        let url = self.endpoint("upload-pdf/");
        debug!(url = %url, filename, size = bytes.len(), "uploading PDF");

        let part = multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = multipart::Form::new().part("pdf_file", part);
        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| network_error(CONTEXT, e))?;
        let response = require_success(response).await?;
        response
            .json::<UploadedPdf>()
            .await
            .map_err(|e| network_error(CONTEXT, e))
    }

    async fn validate_path(&self, path: &str) -> Result<PathValidation, TranslateError> {
        const CONTEXT: &str = "validating the PDF path";
        let url = self.endpoint("validate-pdf-path/");
        debug!(url = %url, path, "validating server-local path");

        let response = self
            .http
            .post(&url)
            .json(&serde_json::json!({ "path": path }))
            .send()
            .await
            .map_err(|e| network_error(CONTEXT, e))?;
        let response = require_success(response).await?;
        response
            .json::<PathValidation>()
            .await
            .map_err(|e| network_error(CONTEXT, e))
    }

    async fn start_translation(
        &self,
        file_path: &str,
        target_language: &str,
    ) -> Result<(), TranslateError> {
        const CONTEXT: &str = "submitting the translation job";
        let url = self.endpoint("translate-pdf/");
        debug!(url = %url, file_path, target_language, "submitting translation");

        let response = self
            .http
            .post(&url)
            .form(&[
                ("file_path", file_path),
                ("target_language", target_language),
            ])
            .send()
            .await
            .map_err(|e| network_error(CONTEXT, e))?;
        let response = require_success(response).await?;

        // The ack body carries a human message; useful in logs, nothing more.
        if let Ok(ack) = response.json::<serde_json::Value>().await {
            if let Some(message) = ack.get("message").and_then(|m| m.as_str()) {
                debug!(message, "translation accepted");
            }
        }
        Ok(())
    }

    async fn job_status(&self, job_id: &str) -> Result<StatusResponse, TranslateError> {
        const CONTEXT: &str = "querying job status";
        let url = self.endpoint(&format!("result-status/{job_id}"));
        debug!(url = %url, "querying job status");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| network_error(CONTEXT, e))?;
        let response = require_success(response).await?;
        response
            .json::<StatusResponse>()
            .await
            .map_err(|e| network_error(CONTEXT, e))
    }

    async fn list_pdfs(&self) -> Result<Vec<UploadedPdf>, TranslateError> {
        const CONTEXT: &str = "listing uploaded PDFs";
        let url = self.endpoint("pdf-list/");
        debug!(url = %url, "listing uploaded PDFs");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| network_error(CONTEXT, e))?;
        let response = require_success(response).await?;
        response
            .json::<Vec<UploadedPdf>>()
            .await
            .map_err(|e| network_error(CONTEXT, e))
    }

    async fn list_results(&self) -> Result<ResultSet, TranslateError> {
        const CONTEXT: &str = "listing results";
        let url = self.endpoint("results/");
        debug!(url = %url, "listing result artifacts");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| network_error(CONTEXT, e))?;
        let response = require_success(response).await?;
        response
            .json::<ResultSet>()
            .await
            .map_err(|e| network_error(CONTEXT, e))
    }

    async fn fetch_bytes(&self, path: &str) -> Result<Vec<u8>, TranslateError> {
        let url = self.endpoint(path);
        let context = format!("fetching {path}");
        debug!(url = %url, "fetching artifact body");

        let response = self
            .download
            .get(&url)
            .send()
            .await
            .map_err(|e| network_error(&context, e))?;
        let response = require_success(response).await?;
        let body = response
            .bytes()
            .await
            .map_err(|e| network_error(&context, e))?;
        debug!(bytes = body.len(), "artifact body fetched");
        Ok(body.to_vec())
    }

    async fn download_archive(&self, job_id: &str) -> Result<Vec<u8>, TranslateError> {
        const CONTEXT: &str = "downloading the results archive";
        let url = self.endpoint(&format!("download-results/{job_id}"));
        debug!(url = %url, "downloading results archive");

        let response = self
            .download
            .get(&url)
            .send()
            .await
            .map_err(|e| network_error(CONTEXT, e))?;
        let response = require_success(response).await?;
        let body = response
            .bytes()
            .await
            .map_err(|e| network_error(CONTEXT, e))?;
        Ok(body.to_vec())
    }
}

// ── Error mapping ────────────────────────────────────────────────────────────

/// Map a transport-level reqwest error, mentioning timeouts explicitly —
/// "timed out" points at a slow backend, everything else at an unreachable
/// one.
fn network_error(context: &str, err: reqwest::Error) -> TranslateError {
    let message = if err.is_timeout() {
        format!("request timed out ({err})")
    } else if err.is_connect() {
        format!("connection failed ({err})")
    } else if err.is_decode() {
        format!("unexpected response body ({err})")
    } else {
        err.to_string()
    };
    TranslateError::Network {
        context: context.to_string(),
        message,
    }
}

/// Turn any non-2xx response into [`TranslateError::Backend`], carrying the
/// (truncated) body text as the message.
async fn require_success(response: reqwest::Response) -> Result<reqwest::Response, TranslateError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(TranslateError::Backend {
        status: status.as_u16(),
        message: summarize_body(&body, status),
    })
}

/// At most 200 chars of body, falling back to the HTTP reason phrase.
fn summarize_body(body: &str, status: reqwest::StatusCode) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("no response body")
            .to_string();
    }
    if trimmed.len() <= 200 {
        return trimmed.to_string();
    }
    let mut end = 200;
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &trimmed[..end])
}
