//! Scan session coordinator.
//!
//! [`ScanSession`] owns the single [`SessionState`] for one client and
//! composes the [`JobSubmitter`] and [`JobMonitor`] around it. All
//! mutation goes through their operations; the presentation layer reads
//! snapshots via [`ScanSession::state`] and follows changes via
//! [`ScanSession::subscribe`].

use std::sync::Arc;
use std::time::Duration;

use codexaudit_core::error::ScanError;
use codexaudit_core::scan::{JobHandle, ScanRequest};
use codexaudit_core::session::{MonitorPhase, SessionState};
use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::api::{HttpJobsApi, JobsApi};
use crate::config::ClientConfig;
use crate::events::SessionEvent;
use crate::monitor::{JobMonitor, DEFAULT_POLL_INTERVAL};
use crate::submitter::JobSubmitter;

/// Broadcast channel capacity for session events.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Mutable cell shared by the session, submitter and monitor.
#[derive(Debug, Default)]
pub(crate) struct SessionCell {
    pub(crate) state: SessionState,
    pub(crate) phase: MonitorPhase,
    /// Liveness token; bumped on every attach and detach.
    pub(crate) generation: u64,
    /// Identifies the submission that currently owns the busy flag.
    pub(crate) submission_seq: u64,
}

pub(crate) type SharedSession = Arc<Mutex<SessionCell>>;

/// Result of [`ScanSession::start_scan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The backend accepted the scan and the monitor is polling it.
    Started(JobHandle),
    /// Nothing happened: another submission was in flight, or the session
    /// was reset (or re-attached) before the backend answered.
    Ignored,
}

/// One client's scan session: at most one active job at a time.
pub struct ScanSession<A: JobsApi> {
    api: Arc<A>,
    shared: SharedSession,
    events: broadcast::Sender<SessionEvent>,
    submitter: JobSubmitter<A>,
    monitor: JobMonitor<A>,
}

impl ScanSession<HttpJobsApi> {
    /// Session talking to the backend named in `config`.
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(HttpJobsApi::new(config.api_url.clone()))
    }
}

impl<A: JobsApi> ScanSession<A> {
    /// Create a session polling every [`DEFAULT_POLL_INTERVAL`].
    pub fn new(api: A) -> Self {
        Self::with_poll_interval(api, DEFAULT_POLL_INTERVAL)
    }

    pub fn with_poll_interval(api: A, period: Duration) -> Self {
        let api = Arc::new(api);
        let shared: SharedSession = Arc::new(Mutex::new(SessionCell::default()));
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let submitter = JobSubmitter::new(Arc::clone(&api), Arc::clone(&shared));
        let monitor = JobMonitor::new(
            Arc::clone(&api),
            Arc::clone(&shared),
            events.clone(),
            period,
        );

        Self {
            api,
            shared,
            events,
            submitter,
            monitor,
        }
    }

    /// Subscribe to session events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Submit a scan for `repo_url` and start monitoring it.
    ///
    /// Empty input fails with [`ScanError::InvalidInput`] before any
    /// network call. A call made while another submission is outstanding
    /// returns [`SubmitOutcome::Ignored`] without side effects. Any
    /// previous job is detached before the request is sent. Every error
    /// is also recorded in `SessionState::error_message`.
    pub async fn start_scan(&self, repo_url: &str) -> Result<SubmitOutcome, ScanError> {
        let request = match ScanRequest::new(repo_url) {
            Ok(request) => request,
            Err(err) => {
                tracing::debug!("Rejected empty repository URL");
                self.record_submission_error(&err);
                return Err(err);
            }
        };

        let Some(_guard) = self.submitter.try_begin() else {
            tracing::debug!(
                repo_url = request.repo_url(),
                "Submission already in flight, ignoring",
            );
            return Ok(SubmitOutcome::Ignored);
        };

        self.monitor.detach();
        let generation = self.shared.lock().generation;
        let _ = self.events.send(SessionEvent::SubmissionStarted {
            repo_url: request.repo_url().to_string(),
        });

        match self.submitter.submit(&request).await {
            Ok(handle) => {
                if self.monitor.attach_if_current(handle.clone(), generation) {
                    Ok(SubmitOutcome::Started(handle))
                } else {
                    tracing::info!(
                        job_id = %handle,
                        "Session changed while starting scan, discarding job",
                    );
                    Ok(SubmitOutcome::Ignored)
                }
            }
            Err(err) => {
                if self.shared.lock().generation == generation {
                    self.record_submission_error(&err);
                }
                Err(err)
            }
        }
    }

    /// Follow an existing job without submitting a new one.
    pub fn watch_job(&self, handle: JobHandle) {
        self.monitor.attach(handle);
    }

    /// Return to the empty initial state.
    ///
    /// Stops polling, discards late results of in-flight fetches, and
    /// releases the busy flag of any outstanding submission, whose job
    /// (if it is created) will not be attached.
    pub fn reset(&self) {
        self.monitor.detach();
        {
            let mut cell = self.shared.lock();
            cell.state = SessionState::default();
            cell.submission_seq += 1;
            let _ = self.events.send(SessionEvent::Reset);
        }
        tracing::info!("Scan session reset");
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> SessionState {
        self.shared.lock().state.clone()
    }

    pub fn phase(&self) -> MonitorPhase {
        self.monitor.phase()
    }

    /// Download link for the finished report, once available.
    pub fn report_url(&self) -> Option<String> {
        let cell = self.shared.lock();
        cell.state
            .completed_result()
            .and_then(|result| result.report_filename())
            .map(|name| self.api.report_url(name))
    }

    pub fn monitor(&self) -> &JobMonitor<A> {
        &self.monitor
    }

    pub fn submitter(&self) -> &JobSubmitter<A> {
        &self.submitter
    }

    // ---- private helpers ----

    fn record_submission_error(&self, err: &ScanError) {
        let message = err.user_message();
        let mut cell = self.shared.lock();
        cell.state.error_message = Some(message.clone());
        let _ = self.events.send(SessionEvent::SubmissionFailed { message });
    }
}
