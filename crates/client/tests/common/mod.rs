//! Shared test helpers: a scripted in-memory [`JobsApi`] and paused-clock
//! utilities.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use codexaudit_client::api::{ApiError, JobsApi};
use codexaudit_client::events::SessionEvent;
use codexaudit_core::scan::ScanRequest;
use codexaudit_core::status::{JobState, JobStatus, ScanResult};
use parking_lot::Mutex;
use tokio::sync::{broadcast, oneshot};

pub const BASE_URL: &str = "http://backend.test";

/// A scripted reply: returned immediately, or once the test releases it.
pub enum Reply<T> {
    Ready(Result<T, ApiError>),
    Gated(oneshot::Receiver<Result<T, ApiError>>),
}

#[derive(Default)]
struct FakeInner {
    start_requests: Mutex<Vec<String>>,
    status_requests: Mutex<Vec<String>>,
    start_replies: Mutex<VecDeque<Reply<String>>>,
    status_replies: Mutex<VecDeque<Reply<JobStatus>>>,
}

/// In-memory backend. Clones share the same script and call log.
///
/// When the script runs out, `start_job` answers `job-N` and
/// `job_status` answers `analyzing`.
#[derive(Clone, Default)]
pub struct FakeApi(Arc<FakeInner>);

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_start(&self, job_id: &str) {
        self.0
            .start_replies
            .lock()
            .push_back(Reply::Ready(Ok(job_id.to_string())));
    }

    pub fn push_start_error(&self) {
        self.0.start_replies.lock().push_back(Reply::Ready(Err(server_error())));
    }

    /// Queue a start reply the test releases through the returned sender.
    pub fn push_start_gated(&self) -> oneshot::Sender<Result<String, ApiError>> {
        let (tx, rx) = oneshot::channel();
        self.0.start_replies.lock().push_back(Reply::Gated(rx));
        tx
    }

    pub fn push_status(&self, status: JobStatus) {
        self.0
            .status_replies
            .lock()
            .push_back(Reply::Ready(Ok(status)));
    }

    pub fn push_status_error(&self) {
        self.0
            .status_replies
            .lock()
            .push_back(Reply::Ready(Err(server_error())));
    }

    pub fn push_status_gated(&self) -> oneshot::Sender<Result<JobStatus, ApiError>> {
        let (tx, rx) = oneshot::channel();
        self.0.status_replies.lock().push_back(Reply::Gated(rx));
        tx
    }

    pub fn start_calls(&self) -> usize {
        self.0.start_requests.lock().len()
    }

    pub fn start_requests(&self) -> Vec<String> {
        self.0.start_requests.lock().clone()
    }

    pub fn status_calls(&self) -> usize {
        self.0.status_requests.lock().len()
    }

    pub fn status_requests(&self) -> Vec<String> {
        self.0.status_requests.lock().clone()
    }
}

#[async_trait]
impl JobsApi for FakeApi {
    async fn start_job(&self, request: &ScanRequest) -> Result<String, ApiError> {
        let count = {
            let mut log = self.0.start_requests.lock();
            log.push(request.repo_url().to_string());
            log.len()
        };
        let reply = self.0.start_replies.lock().pop_front();
        match reply {
            Some(reply) => resolve(reply).await,
            None => Ok(format!("job-{count}")),
        }
    }

    async fn job_status(&self, job_id: &str) -> Result<JobStatus, ApiError> {
        self.0.status_requests.lock().push(job_id.to_string());
        let reply = self.0.status_replies.lock().pop_front();
        match reply {
            Some(reply) => resolve(reply).await,
            None => Ok(JobStatus::new(JobState::Analyzing)),
        }
    }

    fn report_url(&self, pdf_filename: &str) -> String {
        format!("{BASE_URL}/download-report/{pdf_filename}")
    }
}

async fn resolve<T>(reply: Reply<T>) -> Result<T, ApiError> {
    match reply {
        Reply::Ready(result) => result,
        Reply::Gated(rx) => rx.await.unwrap_or_else(|_| Err(server_error())),
    }
}

pub fn server_error() -> ApiError {
    ApiError::Api {
        status: 500,
        body: "internal error".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Status builders
// ---------------------------------------------------------------------------

pub fn analyzing(done: u32, total: u32) -> JobStatus {
    JobStatus {
        chunks_done: Some(done),
        total_chunks: Some(total),
        ..JobStatus::new(JobState::Analyzing)
    }
}

pub fn done(total_issues: u64, pdf_filename: Option<&str>) -> JobStatus {
    JobStatus {
        result: Some(ScanResult {
            total_issues,
            pdf_filename: pdf_filename.map(str::to_string),
        }),
        ..JobStatus::new(JobState::Done)
    }
}

pub fn failed(error: &str) -> JobStatus {
    JobStatus {
        error: Some(error.to_string()),
        ..JobStatus::new(JobState::Error)
    }
}

// ---------------------------------------------------------------------------
// Paused-clock helpers
// ---------------------------------------------------------------------------

/// Let spawned tasks run without moving the clock.
pub async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

/// Move the paused clock forward and let due work run.
pub async fn advance_ms(ms: u64) {
    tokio::time::advance(Duration::from_millis(ms)).await;
    settle().await;
}

/// Drain every event currently buffered in `rx`.
pub fn drain(rx: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
