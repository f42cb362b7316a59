//! Destinations for completed operation logs.

use std::sync::RwLock;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{debug, warn};

use consolekit_core::{Page, PageRequest};

use crate::log::{LogQuery, OperationLog};

/// Accepts a finished record. Must return immediately; failures are logged,
/// never surfaced to the caller.
pub trait AuditSink: Send + Sync {
    fn record(&self, log: OperationLog);
}

impl<S: AuditSink + ?Sized> AuditSink for std::sync::Arc<S> {
    fn record(&self, log: OperationLog) {
        (**self).record(log)
    }
}

/// Hands records to a background writer over an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelAuditSink {
    tx: UnboundedSender<OperationLog>,
}

impl ChannelAuditSink {
    /// A sink and the receiver the writer task drains.
    pub fn channel() -> (Self, UnboundedReceiver<OperationLog>) {
        let (tx, rx) = unbounded_channel();
        (Self { tx }, rx)
    }
}

impl AuditSink for ChannelAuditSink {
    fn record(&self, log: OperationLog) {
        if let Err(err) = self.tx.send(log) {
            warn!(log_id = %err.0.id, operation = %err.0.operation, "audit writer is gone; dropping record");
        }
    }
}

/// Keeps records in memory, newest last. For tests and single-process setups.
#[derive(Debug, Default)]
pub struct InMemoryAuditSink {
    logs: RwLock<Vec<OperationLog>>,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.logs.read().map(|l| l.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Matching records, newest first.
    pub fn query(&self, query: &LogQuery) -> Vec<OperationLog> {
        let Ok(logs) = self.logs.read() else {
            warn!("audit log lock poisoned");
            return Vec::new();
        };
        let mut found: Vec<OperationLog> = logs.iter().filter(|l| query.matches(l)).cloned().collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        found
    }

    /// One page of matching records, newest first.
    pub fn query_page(&self, query: &LogQuery, page: PageRequest) -> Page<OperationLog> {
        page.slice(self.query(query))
    }

    /// Drop every record created before `cutoff`. Returns how many went.
    pub fn purge_older_than(&self, cutoff: DateTime<Utc>) -> usize {
        let Ok(mut logs) = self.logs.write() else {
            warn!("audit log lock poisoned");
            return 0;
        };
        let before = logs.len();
        logs.retain(|l| l.created_at >= cutoff);
        let purged = before - logs.len();
        debug!(purged, %cutoff, "purged audit records");
        purged
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&self, log: OperationLog) {
        match self.logs.write() {
            Ok(mut logs) => logs.push(log),
            Err(_) => warn!(log_id = %log.id, "audit log lock poisoned; dropping record"),
        }
    }
}
