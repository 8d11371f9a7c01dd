//! Job-status payloads returned by `GET /job-status/{job_id}` and their
//! interpretation.
//!
//! A [`JobStatus`] is a complete snapshot: each poll replaces the previous
//! one wholesale. Terminal detection is two-part: `done` only ends polling
//! once the report artifact is named, while `error` ends it immediately.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// Wire value of `status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Analyzing,
    Done,
    Error,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Analyzing => "analyzing",
            JobState::Done => "done",
            JobState::Error => "error",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `started_at` as the backend reports it.
///
/// Backends have been seen to send RFC 3339 strings, naive datetime
/// strings and unix seconds, so anything that is not a valid RFC 3339
/// timestamp or a number is kept as text and shown verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StartedAt {
    Timestamp(Timestamp),
    UnixSeconds(f64),
    Text(String),
}

impl fmt::Display for StartedAt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartedAt::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S UTC")),
            StartedAt::UnixSeconds(secs) => {
                let whole = secs.trunc() as i64;
                let nanos = (secs.fract() * 1e9) as u32;
                match chrono::DateTime::from_timestamp(whole, nanos) {
                    Some(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S UTC")),
                    None => write!(f, "{secs}"),
                }
            }
            StartedAt::Text(text) => f.write_str(text),
        }
    }
}

/// Final outcome of a finished scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    #[serde(default)]
    pub total_issues: u64,
    /// Name of the generated report. Absent (or empty) until the artifact
    /// is ready for download.
    #[serde(default)]
    pub pdf_filename: Option<String>,
}

impl ScanResult {
    /// The report file name, if the artifact is ready.
    pub fn report_filename(&self) -> Option<&str> {
        self.pdf_filename.as_deref().filter(|name| !name.is_empty())
    }
}

/// Chunks analysed so far, displayed as `done/total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkProgress {
    pub done: u32,
    pub total: u32,
}

impl fmt::Display for ChunkProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.done, self.total)
    }
}

/// One status snapshot for a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    #[serde(rename = "status")]
    pub state: JobState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<StartedAt>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunks_done: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_chunks: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ScanResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobStatus {
    /// A snapshot with only `status` set.
    pub fn new(state: JobState) -> Self {
        Self {
            state,
            started_at: None,
            chunks_done: None,
            total_chunks: None,
            result: None,
            error: None,
        }
    }

    /// Whether polling should stop after observing this snapshot.
    ///
    /// `done` without a report file name is still in progress: the
    /// analysis finished but the artifact is not downloadable yet.
    pub fn is_terminal(&self) -> bool {
        match self.state {
            JobState::Analyzing => false,
            JobState::Done => self.report_filename().is_some(),
            JobState::Error => true,
        }
    }

    /// Chunk progress, only when both counts are reported.
    pub fn chunk_progress(&self) -> Option<ChunkProgress> {
        match (self.chunks_done, self.total_chunks) {
            (Some(done), Some(total)) => Some(ChunkProgress { done, total }),
            _ => None,
        }
    }

    pub fn report_filename(&self) -> Option<&str> {
        self.result.as_ref().and_then(ScanResult::report_filename)
    }

    /// The result, once the job is done and the report is ready.
    pub fn completed_result(&self) -> Option<&ScanResult> {
        match self.state {
            JobState::Done => self
                .result
                .as_ref()
                .filter(|r| r.report_filename().is_some()),
            _ => None,
        }
    }
}
