//! Terminal rendering of session events.

use std::io::Write;

use codexaudit_client::events::SessionEvent;
use codexaudit_core::status::JobStatus;

/// Writes events to stdout, as text lines or as JSON lines.
pub struct Renderer {
    json: bool,
}

impl Renderer {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    pub fn event(&self, event: &SessionEvent) -> anyhow::Result<()> {
        let line = if self.json {
            Some(serde_json::to_string(event)?)
        } else {
            format_event(event)
        };

        if let Some(line) = line {
            let mut out = std::io::stdout().lock();
            writeln!(out, "{line}")?;
            out.flush()?;
        }
        Ok(())
    }
}

/// Human-readable line for an event. `None` for events with nothing to
/// show.
pub fn format_event(event: &SessionEvent) -> Option<String> {
    match event {
        SessionEvent::SubmissionStarted { repo_url } => Some(format!("Scanning {repo_url}...")),
        SessionEvent::JobStarted { job_id } => Some(format!("Job: {job_id}")),
        SessionEvent::SubmissionFailed { message } => Some(message.clone()),
        SessionEvent::StatusUpdated { status, .. } => Some(format_status(status)),
        SessionEvent::JobCompleted {
            result, report_url, ..
        } => Some(format!(
            "Scan complete. {} issues found.\nReport: {report_url}",
            result.total_issues
        )),
        SessionEvent::JobFailed { error, .. } => Some(format!("Scan failed: {error}")),
        SessionEvent::PollingFailed { message, .. } => Some(message.clone()),
        SessionEvent::Reset => Some("Scan cancelled.".to_string()),
    }
}

fn format_status(status: &JobStatus) -> String {
    let mut parts = vec![format!("Status: {}", status.state)];
    if let Some(progress) = status.chunk_progress() {
        parts.push(format!("Chunks: {progress}"));
    }
    if let Some(started_at) = &status.started_at {
        parts.push(format!("Started: {started_at}"));
    }
    parts.join("  ")
}
