//! Fire-and-forget log upload over HTTP.
//!
//! The export object is POSTed as JSON text to the configured endpoint
//! (`/save_log` by default). The request runs on its own Tokio task; its
//! outcome is only ever reported through `tracing`. There is no retry: the
//! in-memory log is untouched, so the caller can simply upload again.

use golmi_types::ExportDocument;
use reqwest::header::CONTENT_TYPE;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::UploadConfig;
use crate::error::LoggerError;

/// Content type sent with every upload.
pub const JSON_UTF8: &str = "application/json; charset=UTF-8";

/// HTTP client bound to an upload server.
#[derive(Debug, Clone)]
pub struct Uploader {
    client: reqwest::Client,
    base_url: String,
    default_path: String,
}

impl Uploader {
    /// Build an uploader from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError::Client`] if the HTTP client cannot be built
    /// (for example when no TLS backend is available).
    pub fn new(config: &UploadConfig) -> Result<Self, LoggerError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|source| LoggerError::Client { source })?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            default_path: config.path.clone(),
        })
    }

    /// Resolve an endpoint against the base URL.
    ///
    /// `None` selects the configured default path. Absolute `http(s)` URLs
    /// are used as given.
    pub fn resolve(&self, endpoint: Option<&str>) -> String {
        let endpoint = endpoint.unwrap_or(self.default_path.as_str());
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            return endpoint.to_owned();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }

    /// Start uploading `document` and return immediately.
    ///
    /// Success and failure are logged from inside the task. The handle can
    /// be awaited by a caller that must not exit before the request
    /// finishes, but it carries no result.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn dispatch(&self, endpoint: Option<&str>, document: ExportDocument) -> JoinHandle<()> {
        let url = self.resolve(endpoint);
        let client = self.client.clone();
        tokio::spawn(async move {
            let entries = document.log.len();
            match send(&client, &url, &document).await {
                Ok(status) => info!(url = %url, %status, entries, "session log uploaded"),
                Err(e) => warn!(url = %url, entries, error = %e, "session log upload failed"),
            }
        })
    }
}

/// POST the export object and check the status.
async fn send(
    client: &reqwest::Client,
    url: &str,
    document: &ExportDocument,
) -> Result<reqwest::StatusCode, LoggerError> {
    let body = serde_json::to_string(document)?;
    let response = client
        .post(url)
        .header(CONTENT_TYPE, JSON_UTF8)
        .body(body)
        .send()
        .await
        .map_err(|source| LoggerError::Transport {
            url: url.to_owned(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(LoggerError::Status {
            url: url.to_owned(),
            status,
        });
    }
    Ok(status)
}
