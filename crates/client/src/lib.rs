//! CodexAudit scan client.
//!
//! Provides the HTTP wrapper for the scan backend, the job submitter, the
//! polling job monitor, and the [`session::ScanSession`] coordinator that
//! ties them to a single [`SessionState`](codexaudit_core::session::SessionState).

pub mod api;
pub mod config;
pub mod events;
pub mod monitor;
pub mod session;
pub mod submitter;
