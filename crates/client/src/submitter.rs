//! Job submission.
//!
//! [`JobSubmitter`] sends the start-job request and maps failures to
//! [`ScanError::SubmissionFailed`]. It also owns the busy flag: while a
//! [`SubmissionGuard`] is alive, further submissions on the same session
//! are ignored.
//!
//! No request-level deduplication is done. Two separate submissions of the
//! same URL create two independent backend jobs.

use std::sync::Arc;

use codexaudit_core::error::ScanError;
use codexaudit_core::scan::{JobHandle, ScanRequest};

use crate::api::JobsApi;
use crate::session::SharedSession;

/// Issues start-job requests for one session.
pub struct JobSubmitter<A: JobsApi> {
    api: Arc<A>,
    shared: SharedSession,
}

/// Marks the session busy for as long as it is alive.
///
/// Dropping the guard clears `submission_in_flight`, unless the session
/// was reset (or a newer submission began) in the meantime. Dropping the
/// `start_scan` future mid-request therefore never leaves the session
/// stuck busy.
pub(crate) struct SubmissionGuard {
    shared: SharedSession,
    seq: u64,
}

impl Drop for SubmissionGuard {
    fn drop(&mut self) {
        let mut cell = self.shared.lock();
        if cell.submission_seq == self.seq {
            cell.state.submission_in_flight = false;
        }
    }
}

impl<A: JobsApi> JobSubmitter<A> {
    pub(crate) fn new(api: Arc<A>, shared: SharedSession) -> Self {
        Self { api, shared }
    }

    /// Mark the session busy and clear any previous error.
    ///
    /// Returns `None` when a submission is already in flight.
    pub(crate) fn try_begin(&self) -> Option<SubmissionGuard> {
        let mut cell = self.shared.lock();
        if cell.state.submission_in_flight {
            return None;
        }
        cell.submission_seq += 1;
        cell.state.submission_in_flight = true;
        cell.state.error_message = None;
        Some(SubmissionGuard {
            shared: Arc::clone(&self.shared),
            seq: cell.submission_seq,
        })
    }

    /// Send one start-job request.
    ///
    /// The transport error is logged and kept as the error's source; only
    /// the generic message reaches the user.
    pub async fn submit(&self, request: &ScanRequest) -> Result<JobHandle, ScanError> {
        match self.api.start_job(request).await {
            Ok(job_id) => {
                tracing::info!(
                    job_id = %job_id,
                    repo_url = request.repo_url(),
                    "Scan job started",
                );
                Ok(JobHandle::new(job_id))
            }
            Err(e) => {
                tracing::error!(
                    repo_url = request.repo_url(),
                    error = %e,
                    "Failed to start scan",
                );
                Err(ScanError::SubmissionFailed {
                    source: Box::new(e),
                })
            }
        }
    }
}
