//! `consolekit-audit` — the operation log written for every user action.
//!
//! Callers hand a completed [`OperationLog`] to an [`AuditSink`] and move on;
//! sinks never block and never fail the request that produced the record.
//! Request payloads are scrubbed of credentials before they are stored.

pub mod log;
pub mod request;
pub mod sanitize;
pub mod sink;

pub use log::{DEFAULT_RETENTION_DAYS, LogQuery, OperationLog, OperationStatus, retention_cutoff};
pub use request::{ClientInfo, OperationType, infer_page_path};
pub use sanitize::{MASK, MAX_CONTENT_CHARS, sanitize, sanitize_text};
pub use sink::{AuditSink, ChannelAuditSink, InMemoryAuditSink};
