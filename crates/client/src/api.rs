//! REST client for the scan backend.
//!
//! [`JobsApi`] is the seam the submitter and monitor talk through;
//! [`HttpJobsApi`] implements it over [`reqwest`] against the three
//! backend routes (`/start-job`, `/job-status/{id}`,
//! `/download-report/{file}`).

use async_trait::async_trait;
use codexaudit_core::scan::ScanRequest;
use codexaudit_core::status::JobStatus;
use serde::Deserialize;

/// Response returned by `POST /start-job`.
#[derive(Debug, Deserialize)]
pub struct StartJobResponse {
    /// Server-assigned identifier for the new job.
    pub job_id: String,
}

/// Errors from the backend REST layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request itself failed (network, DNS, TLS, body decoding).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend returned a non-2xx status code.
    #[error("Scan API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

/// Operations the scan session needs from the backend.
#[async_trait]
pub trait JobsApi: Send + Sync + 'static {
    /// Create a job for the repository and return its identifier.
    async fn start_job(&self, request: &ScanRequest) -> Result<String, ApiError>;

    /// Fetch the current status snapshot for a job.
    async fn job_status(&self, job_id: &str) -> Result<JobStatus, ApiError>;

    /// Download link for a finished report. Never fetched by the client.
    fn report_url(&self, pdf_filename: &str) -> String;
}

/// HTTP client for one scan backend.
pub struct HttpJobsApi {
    client: reqwest::Client,
    api_url: String,
}

impl HttpJobsApi {
    /// Create a new API client.
    ///
    /// * `api_url` - Base HTTP URL, e.g. `http://localhost:8000`. A
    ///   trailing `/` is dropped.
    pub fn new(api_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), api_url)
    }

    /// Create an API client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, api_url: impl Into<String>) -> Self {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        Self { client, api_url }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code, otherwise turn it
    /// into [`ApiError::Api`] with the body text.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ApiError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl JobsApi for HttpJobsApi {
    /// Sends `POST /start-job` with `{"repo_url": ...}`.
    async fn start_job(&self, request: &ScanRequest) -> Result<String, ApiError> {
        let response = self
            .client
            .post(format!("{}/start-job", self.api_url))
            .json(request)
            .send()
            .await?;

        let body: StartJobResponse = Self::parse_response(response).await?;
        Ok(body.job_id)
    }

    /// Sends `GET /job-status/{job_id}`. A payload that does not match
    /// [`JobStatus`] surfaces as [`ApiError::Request`].
    async fn job_status(&self, job_id: &str) -> Result<JobStatus, ApiError> {
        let response = self
            .client
            .get(format!("{}/job-status/{}", self.api_url, job_id))
            .send()
            .await?;

        Self::parse_response(response).await
    }

    fn report_url(&self, pdf_filename: &str) -> String {
        format!("{}/download-report/{}", self.api_url, pdf_filename)
    }
}
