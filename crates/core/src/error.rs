use crate::types::BoxError;

/// User-facing message for an empty repository URL.
pub const MSG_INVALID_INPUT: &str = "Please enter a GitHub URL.";

/// User-facing message for a failed start-job request.
pub const MSG_SUBMISSION_FAILED: &str = "Failed to start scan. Please try again.";

/// User-facing message for a failed status poll.
pub const MSG_POLLING_FAILED: &str = "Lost contact with the scan. Please start a new scan.";

/// Fallback when the backend reports `status == "error"` without a message.
pub const MSG_REMOTE_JOB_FAILED: &str = "Scan failed.";

/// Every failure a scan session can surface.
///
/// None of these propagate past the session: each is converted into
/// `SessionState::error_message` at its origin using
/// [`ScanError::user_message`]. The underlying transport error, where
/// there is one, is kept as the `source` for logging.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// The repository URL was empty or whitespace-only.
    #[error("Repository URL must not be empty")]
    InvalidInput,

    /// The start-job request failed (transport or non-2xx).
    #[error("Failed to start scan")]
    SubmissionFailed {
        #[source]
        source: BoxError,
    },

    /// A status poll failed (transport, non-2xx, or malformed payload).
    #[error("Failed to fetch status for job {job_id}")]
    PollingFailed {
        job_id: String,
        #[source]
        source: BoxError,
    },

    /// The backend reported the job as failed.
    #[error("Remote job failed: {0}")]
    RemoteJobError(String),
}

impl ScanError {
    /// Text shown to the user for this error.
    ///
    /// Transport details are never included; remote job errors are passed
    /// through verbatim.
    pub fn user_message(&self) -> String {
        match self {
            ScanError::InvalidInput => MSG_INVALID_INPUT.to_string(),
            ScanError::SubmissionFailed { .. } => MSG_SUBMISSION_FAILED.to_string(),
            ScanError::PollingFailed { .. } => MSG_POLLING_FAILED.to_string(),
            ScanError::RemoteJobError(msg) => msg.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    #[test]
    fn submission_failed_hides_cause_from_user() {
        let err = ScanError::SubmissionFailed {
            source: "connection refused".into(),
        };

        assert_eq!(err.user_message(), MSG_SUBMISSION_FAILED);
        assert_eq!(
            err.source().map(|s| s.to_string()).as_deref(),
            Some("connection refused")
        );
    }

    #[test]
    fn remote_job_error_is_verbatim() {
        let err = ScanError::RemoteJobError("clone failed".into());
        assert_eq!(err.user_message(), "clone failed");
    }

    #[test]
    fn polling_failed_names_job_in_display() {
        let err = ScanError::PollingFailed {
            job_id: "abc123".into(),
            source: "timed out".into(),
        };

        assert_eq!(err.to_string(), "Failed to fetch status for job abc123");
        assert_eq!(err.user_message(), MSG_POLLING_FAILED);
    }
}
