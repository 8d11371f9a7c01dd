//! Events emitted by a scan session.
//!
//! Every state change the presentation layer cares about is published on
//! a [`tokio::sync::broadcast`] channel. Call
//! [`ScanSession::subscribe`](crate::session::ScanSession::subscribe) to
//! receive them.

use codexaudit_core::status::{JobStatus, ScanResult};
use serde::Serialize;

/// A session-level event.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// The start-job request was sent.
    SubmissionStarted { repo_url: String },

    /// The backend accepted the scan and polling began.
    JobStarted { job_id: String },

    /// The start-job request failed or the input was rejected.
    SubmissionFailed {
        /// User-facing message.
        message: String,
    },

    /// A poll returned a new snapshot.
    StatusUpdated { job_id: String, status: JobStatus },

    /// The job finished and its report is ready.
    JobCompleted {
        job_id: String,
        result: ScanResult,
        /// Download link for the report.
        report_url: String,
    },

    /// The backend reported the job as failed.
    JobFailed { job_id: String, error: String },

    /// A status poll failed; polling stopped.
    PollingFailed { job_id: String, message: String },

    /// The session was reset to its initial state.
    Reset,
}

impl SessionEvent {
    /// Whether no further events are expected for the current job.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionEvent::JobCompleted { .. }
                | SessionEvent::JobFailed { .. }
                | SessionEvent::PollingFailed { .. }
        )
    }
}
