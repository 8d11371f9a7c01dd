//! Domain types for the CodexAudit scan client.
//!
//! Holds the request/handle/status data model, the interpretation of
//! job-status payloads (terminal detection, progress), the error
//! taxonomy, and the [`session::SessionState`] value that the client
//! crate mutates.

pub mod error;
pub mod scan;
pub mod session;
pub mod status;
pub mod types;
