//! Scan submission types: the validated request and the job handle the
//! backend hands back.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::ScanError;

/// A validated request to scan one repository.
///
/// Serialises to the `POST /start-job` body (`{"repo_url": ...}`). The
/// only way to build one is [`ScanRequest::new`], so a request that
/// reaches the network always carries a non-empty, trimmed URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Validate)]
pub struct ScanRequest {
    #[validate(length(min = 1))]
    repo_url: String,
}

impl ScanRequest {
    /// Trim and validate a user-entered repository URL.
    ///
    /// Returns [`ScanError::InvalidInput`] for empty or whitespace-only
    /// input.
    pub fn new(repo_url: &str) -> Result<Self, ScanError> {
        let request = Self {
            repo_url: repo_url.trim().to_string(),
        };
        request.validate().map_err(|_| ScanError::InvalidInput)?;
        Ok(request)
    }

    pub fn repo_url(&self) -> &str {
        &self.repo_url
    }
}

/// Server-assigned identifier of a running scan job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobHandle {
    pub job_id: String,
}

impl JobHandle {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
        }
    }
}

impl std::fmt::Display for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.job_id)
    }
}
