//! UI-facing state of one scan session.

use serde::Serialize;

use crate::scan::JobHandle;
use crate::status::{ChunkProgress, JobState, JobStatus, ScanResult};

/// Where the job monitor is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorPhase {
    /// No job attached, no timer running.
    #[default]
    Idle,
    /// A timer is scheduling status fetches.
    Polling,
    /// A terminal status (or a polling failure) was observed; the timer
    /// is stopped until the next attach.
    Terminal,
}

/// Snapshot of everything the presentation layer renders.
///
/// `Default` is the empty initial form that a reset returns to.
/// `active_job` is kept after a terminal outcome so the job identifier
/// stays visible next to the result or error.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SessionState {
    pub submission_in_flight: bool,
    pub active_job: Option<JobHandle>,
    pub latest_status: Option<JobStatus>,
    pub error_message: Option<String>,
}

impl SessionState {
    /// True while input should be disabled: a submission is outstanding
    /// or the latest snapshot says the job is still analyzing.
    pub fn is_scanning(&self) -> bool {
        self.submission_in_flight
            || self
                .latest_status
                .as_ref()
                .is_some_and(|s| s.state == JobState::Analyzing)
    }

    pub fn chunk_progress(&self) -> Option<ChunkProgress> {
        self.latest_status.as_ref().and_then(JobStatus::chunk_progress)
    }

    /// The finished result, once the report is downloadable.
    pub fn completed_result(&self) -> Option<&ScanResult> {
        self.latest_status
            .as_ref()
            .and_then(JobStatus::completed_result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state_is_empty() {
        let state = SessionState::default();

        assert!(!state.is_scanning());
        assert!(state.active_job.is_none());
        assert!(state.latest_status.is_none());
        assert!(state.error_message.is_none());
    }

    #[test]
    fn scanning_while_submitting_or_analyzing() {
        let submitting = SessionState {
            submission_in_flight: true,
            ..Default::default()
        };
        assert!(submitting.is_scanning());

        let analyzing = SessionState {
            active_job: Some(JobHandle::new("abc123")),
            latest_status: Some(JobStatus::new(JobState::Analyzing)),
            ..Default::default()
        };
        assert!(analyzing.is_scanning());

        let failed = SessionState {
            active_job: Some(JobHandle::new("abc123")),
            latest_status: Some(JobStatus::new(JobState::Error)),
            ..Default::default()
        };
        assert!(!failed.is_scanning());
    }

    #[test]
    fn attached_but_not_yet_observed_is_not_scanning() {
        let state = SessionState {
            active_job: Some(JobHandle::new("abc123")),
            ..Default::default()
        };
        assert!(!state.is_scanning());
    }
}
