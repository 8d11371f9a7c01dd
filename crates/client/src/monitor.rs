//! Periodic job-status polling.
//!
//! [`JobMonitor`] owns at most one attachment: a timer task that fires
//! every `period` (first tick one full period after attach) and spawns an
//! independent status fetch per tick. Each completed fetch replaces
//! `latest_status` and is checked for a terminal condition on its own.
//!
//! Two mechanisms stop stale work:
//! - a [`CancellationToken`] per attachment, cancelled on detach or on
//!   the first terminal result, which stops the timer and drops in-flight
//!   fetches;
//! - a generation counter in the shared session cell, bumped on every
//!   attach/detach. A result is only applied if its generation is still
//!   current and the monitor is still `Polling`.

use std::sync::Arc;
use std::time::Duration;

use codexaudit_core::error::{ScanError, MSG_REMOTE_JOB_FAILED};
use codexaudit_core::scan::JobHandle;
use codexaudit_core::session::MonitorPhase;
use codexaudit_core::status::{JobState, JobStatus};
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::api::{ApiError, JobsApi};
use crate::events::SessionEvent;
use crate::session::SharedSession;

/// Interval between status fetches.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Polls the status endpoint for the attached job.
pub struct JobMonitor<A: JobsApi> {
    api: Arc<A>,
    shared: SharedSession,
    events: broadcast::Sender<SessionEvent>,
    period: Duration,
    attachment: Mutex<Option<Attachment>>,
}

/// The live timer for one attached job.
struct Attachment {
    cancel: CancellationToken,
    task: tokio::task::JoinHandle<()>,
}

/// Everything a timer task and its fetches need, shared between them.
struct PollContext<A: JobsApi> {
    api: Arc<A>,
    shared: SharedSession,
    events: broadcast::Sender<SessionEvent>,
    handle: JobHandle,
    generation: u64,
    cancel: CancellationToken,
}

impl<A: JobsApi> JobMonitor<A> {
    pub(crate) fn new(
        api: Arc<A>,
        shared: SharedSession,
        events: broadcast::Sender<SessionEvent>,
        period: Duration,
    ) -> Self {
        Self {
            api,
            shared,
            events,
            period,
            attachment: Mutex::new(None),
        }
    }

    /// Start polling `handle`, replacing any current attachment.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn attach(&self, handle: JobHandle) {
        self.detach();
        self.start(handle, None);
    }

    /// Like [`attach`](Self::attach), but only if nothing attached or
    /// detached since `expected_generation` was read. Returns whether the
    /// handle was attached.
    pub(crate) fn attach_if_current(&self, handle: JobHandle, expected_generation: u64) -> bool {
        self.start(handle, Some(expected_generation))
    }

    /// Stop polling and return to `Idle`.
    ///
    /// Safe to call in any state and any number of times. After it
    /// returns no new fetch is scheduled, and results of fetches already
    /// in flight are discarded.
    pub fn detach(&self) {
        let previous = self.attachment.lock().take();

        let (was, generation) = {
            let mut cell = self.shared.lock();
            cell.generation += 1;
            cell.state.active_job = None;
            cell.state.latest_status = None;
            let was = std::mem::replace(&mut cell.phase, MonitorPhase::Idle);
            (was, cell.generation)
        };

        if let Some(attachment) = previous {
            attachment.cancel.cancel();
            attachment.task.abort();
        }

        if was != MonitorPhase::Idle {
            tracing::info!(generation, previous_phase = ?was, "Job monitor detached");
        }
    }

    pub fn phase(&self) -> MonitorPhase {
        self.shared.lock().phase
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    // ---- private helpers ----

    fn start(&self, handle: JobHandle, expected_generation: Option<u64>) -> bool {
        let generation = {
            let mut cell = self.shared.lock();
            if let Some(expected) = expected_generation {
                if cell.generation != expected {
                    return false;
                }
            }
            cell.generation += 1;
            cell.phase = MonitorPhase::Polling;
            cell.state.active_job = Some(handle.clone());
            cell.state.latest_status = None;
            cell.state.error_message = None;
            let _ = self.events.send(SessionEvent::JobStarted {
                job_id: handle.job_id.clone(),
            });
            cell.generation
        };

        let cancel = CancellationToken::new();
        let ctx = Arc::new(PollContext {
            api: Arc::clone(&self.api),
            shared: Arc::clone(&self.shared),
            events: self.events.clone(),
            handle: handle.clone(),
            generation,
            cancel: cancel.clone(),
        });
        let first_tick = Instant::now() + self.period;
        let task = tokio::spawn(run_polling_loop(ctx, first_tick, self.period));

        if let Some(stale) = self
            .attachment
            .lock()
            .replace(Attachment { cancel, task })
        {
            stale.cancel.cancel();
            stale.task.abort();
        }

        tracing::info!(
            job_id = %handle,
            generation,
            period_ms = self.period.as_millis() as u64,
            "Job monitor attached",
        );
        true
    }
}

impl<A: JobsApi> Drop for JobMonitor<A> {
    fn drop(&mut self) {
        if let Some(attachment) = self.attachment.get_mut().take() {
            attachment.cancel.cancel();
            attachment.task.abort();
        }
    }
}

/// Timer loop: one independent fetch per tick until cancelled or no
/// longer current.
async fn run_polling_loop<A: JobsApi>(
    ctx: Arc<PollContext<A>>,
    first_tick: Instant,
    period: Duration,
) {
    let mut ticker = tokio::time::interval_at(first_tick, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut tick: u64 = 0;

    loop {
        tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => break,
            _ = ticker.tick() => {
                if !ctx.is_polling() {
                    break;
                }
                tick += 1;
                tracing::debug!(
                    job_id = %ctx.handle,
                    generation = ctx.generation,
                    tick,
                    "Polling job status",
                );
                tokio::spawn(fetch_once(Arc::clone(&ctx), tick));
            }
        }
    }

    tracing::debug!(
        job_id = %ctx.handle,
        generation = ctx.generation,
        ticks = tick,
        "Polling loop exited",
    );
}

/// Fetch one snapshot and hand it to the state machine.
async fn fetch_once<A: JobsApi>(ctx: Arc<PollContext<A>>, tick: u64) {
    if !ctx.is_polling() {
        return;
    }

    let result = tokio::select! {
        biased;
        _ = ctx.cancel.cancelled() => {
            tracing::debug!(
                job_id = %ctx.handle,
                generation = ctx.generation,
                tick,
                "Dropping in-flight status fetch",
            );
            return;
        }
        result = ctx.api.job_status(&ctx.handle.job_id) => result,
    };

    ctx.apply(tick, result);
}

impl<A: JobsApi> PollContext<A> {
    /// Whether this attachment is still current and polling.
    fn is_polling(&self) -> bool {
        let cell = self.shared.lock();
        cell.generation == self.generation && cell.phase == MonitorPhase::Polling
    }

    /// Apply one completed fetch.
    ///
    /// No-op when the attachment is stale or already terminal. Events are
    /// sent while the lock is held so they are ordered with the state
    /// changes they describe.
    fn apply(&self, tick: u64, result: Result<JobStatus, ApiError>) {
        let mut cell = self.shared.lock();
        if cell.generation != self.generation || cell.phase != MonitorPhase::Polling {
            tracing::debug!(
                job_id = %self.handle,
                generation = self.generation,
                tick,
                "Discarding stale status result",
            );
            return;
        }

        let job_id = self.handle.job_id.clone();

        let status = match result {
            Ok(status) => status,
            Err(e) => {
                tracing::error!(
                    job_id = %job_id,
                    tick,
                    error = %e,
                    "Status poll failed, polling stopped",
                );
                let err = ScanError::PollingFailed {
                    job_id: job_id.clone(),
                    source: Box::new(e),
                };
                let message = err.user_message();
                cell.phase = MonitorPhase::Terminal;
                cell.state.error_message = Some(message.clone());
                self.cancel.cancel();
                let _ = self
                    .events
                    .send(SessionEvent::PollingFailed { job_id, message });
                return;
            }
        };

        tracing::debug!(
            job_id = %job_id,
            tick,
            status = %status.state,
            chunks_done = status.chunks_done,
            total_chunks = status.total_chunks,
            "Job status received",
        );

        let terminal = status.is_terminal();
        cell.state.latest_status = Some(status.clone());
        let _ = self.events.send(SessionEvent::StatusUpdated {
            job_id: job_id.clone(),
            status: status.clone(),
        });

        if !terminal {
            return;
        }

        cell.phase = MonitorPhase::Terminal;
        self.cancel.cancel();

        match status.state {
            JobState::Error => {
                let err = ScanError::RemoteJobError(
                    status
                        .error
                        .clone()
                        .unwrap_or_else(|| MSG_REMOTE_JOB_FAILED.to_string()),
                );
                tracing::warn!(job_id = %job_id, error = %err, "Scan job failed");
                let error = err.user_message();
                cell.state.error_message = Some(error.clone());
                let _ = self.events.send(SessionEvent::JobFailed { job_id, error });
            }
            JobState::Done => {
                if let Some(result) = status.completed_result() {
                    let report_url = result
                        .report_filename()
                        .map(|name| self.api.report_url(name))
                        .unwrap_or_default();
                    tracing::info!(
                        job_id = %job_id,
                        total_issues = result.total_issues,
                        report_url = %report_url,
                        "Scan job completed",
                    );
                    let _ = self.events.send(SessionEvent::JobCompleted {
                        job_id,
                        result: result.clone(),
                        report_url,
                    });
                }
            }
            JobState::Analyzing => {}
        }
    }
}
