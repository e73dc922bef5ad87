//! Audit sink that keeps exported events in memory.

use async_trait::async_trait;
use authn_service::audit::{AuditEvent, AuditSink};
use std::sync::Mutex;
use std::time::Duration;
use tracing::Span;

/// Records every exported event, in export order.
#[derive(Debug, Default)]
pub struct RecordingAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl RecordingAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events exported so far.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Wait until at least `count` events have been exported.
    ///
    /// Panics after `timeout`.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> Vec<AuditEvent> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let events = self.events();
            if events.len() >= count {
                return events;
            }
            if tokio::time::Instant::now() >= deadline {
                panic!(
                    "expected {} audit events within {:?}, got {}",
                    count,
                    timeout,
                    events.len()
                );
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

#[async_trait]
impl AuditSink for RecordingAuditSink {
    async fn export(&self, event: &AuditEvent, _span: &Span) {
        self.events.lock().unwrap().push(event.clone());
    }
}
