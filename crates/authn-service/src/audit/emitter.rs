//! Bounded hand-off from request tasks to the audit exporter.
//!
//! # Backpressure
//!
//! [`AuditEmitter::emit`] waits at most `send_timeout` for room in the
//! channel. If the exporter is still behind after that, the event is dropped,
//! a warning is logged and `authn_audit_events_total{outcome="dropped_full"}`
//! is incremented. Request latency is therefore bounded by `send_timeout`
//! regardless of sink latency.
//!
//! # Shutdown
//!
//! When the cancellation token fires the exporter closes the channel, exports
//! everything already queued, then exits.

use super::{AuditEvent, AuditSink};
use crate::observability::metrics;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendTimeoutError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn, Span};

/// Default channel capacity.
pub const DEFAULT_AUDIT_BUFFER_SIZE: usize = 1024;

/// Default time `emit` may wait for channel capacity.
pub const DEFAULT_AUDIT_SEND_TIMEOUT: Duration = Duration::from_millis(50);

/// An event plus the span that was current when it was emitted.
#[derive(Debug)]
pub struct AuditEnvelope {
    pub event: AuditEvent,
    pub span: Span,
}

/// What happened to an emitted event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitOutcome {
    /// Accepted by the channel
    Queued,
    /// Channel stayed full for the whole send timeout
    DroppedFull,
    /// Exporter has shut down
    DroppedClosed,
}

impl EmitOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmitOutcome::Queued => "queued",
            EmitOutcome::DroppedFull => "dropped_full",
            EmitOutcome::DroppedClosed => "dropped_closed",
        }
    }
}

/// Sending half of the audit channel. Cheap to clone.
#[derive(Debug, Clone)]
pub struct AuditEmitter {
    sender: mpsc::Sender<AuditEnvelope>,
    send_timeout: Duration,
}

impl AuditEmitter {
    /// Create an emitter and the receiver an exporter will drain.
    ///
    /// A capacity of zero is treated as one.
    pub fn channel(
        capacity: usize,
        send_timeout: Duration,
    ) -> (Self, mpsc::Receiver<AuditEnvelope>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (
            Self {
                sender,
                send_timeout,
            },
            receiver,
        )
    }

    /// Hand `event` to the exporter, attached to the current span.
    ///
    /// Never fails the caller; the outcome is informational.
    pub async fn emit(&self, event: AuditEvent) -> EmitOutcome {
        let action = event.action;
        let envelope = AuditEnvelope {
            event,
            span: Span::current(),
        };

        let outcome = match self.sender.send_timeout(envelope, self.send_timeout).await {
            Ok(()) => EmitOutcome::Queued,
            Err(SendTimeoutError::Timeout(_)) => {
                warn!(
                    target: "authn.audit",
                    action = %action,
                    timeout_ms = self.send_timeout.as_millis() as u64,
                    "Audit channel full, dropping event"
                );
                EmitOutcome::DroppedFull
            }
            Err(SendTimeoutError::Closed(_)) => {
                warn!(
                    target: "authn.audit",
                    action = %action,
                    "Audit exporter stopped, dropping event"
                );
                EmitOutcome::DroppedClosed
            }
        };

        metrics::record_audit_event(action.as_str(), outcome.as_str());
        outcome
    }

    /// Number of events waiting in the channel.
    pub fn queued(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }
}

/// Background task forwarding queued events to a sink.
pub struct AuditExporter {
    receiver: mpsc::Receiver<AuditEnvelope>,
    sink: Arc<dyn AuditSink>,
    cancel_token: CancellationToken,
}

impl AuditExporter {
    pub fn new(
        receiver: mpsc::Receiver<AuditEnvelope>,
        sink: Arc<dyn AuditSink>,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            receiver,
            sink,
            cancel_token,
        }
    }

    /// Create the channel and spawn the exporter on it.
    ///
    /// Returns the emitter and the exporter's join handle.
    pub fn spawn(
        sink: Arc<dyn AuditSink>,
        capacity: usize,
        send_timeout: Duration,
        cancel_token: CancellationToken,
    ) -> (AuditEmitter, JoinHandle<()>) {
        let (emitter, receiver) = AuditEmitter::channel(capacity, send_timeout);
        let exporter = Self::new(receiver, sink, cancel_token);
        let handle = tokio::spawn(exporter.run());
        (emitter, handle)
    }

    #[instrument(skip_all, name = "authn.audit.exporter")]
    pub async fn run(mut self) {
        debug!(target: "authn.audit", "Audit exporter started");

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    self.drain().await;
                    break;
                }
                msg = self.receiver.recv() => {
                    match msg {
                        Some(envelope) => self.export(envelope).await,
                        // Every emitter dropped
                        None => break,
                    }
                }
            }
        }

        info!(target: "authn.audit", "Audit exporter stopped");
    }

    async fn drain(&mut self) {
        self.receiver.close();
        let mut drained = 0usize;
        while let Some(envelope) = self.receiver.recv().await {
            self.export(envelope).await;
            drained += 1;
        }
        if drained > 0 {
            info!(
                target: "authn.audit",
                drained,
                "Exported queued audit events before shutdown"
            );
        }
    }

    async fn export(&self, envelope: AuditEnvelope) {
        self.sink.export(&envelope.event, &envelope.span).await;
        metrics::record_audit_event(envelope.event.action.as_str(), "exported");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::actor::Actor;
    use crate::audit::{AuditAction, EventType};
    use crate::context::RequestContext;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CollectingSink {
        events: Mutex<Vec<AuditEvent>>,
    }

    #[async_trait]
    impl AuditSink for CollectingSink {
        async fn export(&self, event: &AuditEvent, _span: &Span) {
            self.events.lock().unwrap().push(event.clone());
        }
    }

    fn delete_event(name: &str) -> AuditEvent {
        AuditEvent::new(
            EventType::AuthenticationToken,
            AuditAction::Delete,
            Actor::from_context(&RequestContext::anonymous()),
            BTreeMap::from([("name".to_string(), name.to_string())]),
        )
    }

    #[tokio::test]
    async fn test_emit_queues_event() {
        let (emitter, mut receiver) = AuditEmitter::channel(4, DEFAULT_AUDIT_SEND_TIMEOUT);

        assert_eq!(emitter.emit(delete_event("a")).await, EmitOutcome::Queued);
        assert_eq!(emitter.queued(), 1);

        let envelope = receiver.recv().await.unwrap();
        assert_eq!(envelope.event.payload["name"], "a");
        assert_eq!(emitter.queued(), 0);
    }

    #[tokio::test]
    async fn test_emit_drops_when_full_after_timeout() {
        let (emitter, _receiver) = AuditEmitter::channel(1, Duration::from_millis(10));

        assert_eq!(emitter.emit(delete_event("a")).await, EmitOutcome::Queued);
        assert_eq!(
            emitter.emit(delete_event("b")).await,
            EmitOutcome::DroppedFull
        );
        assert_eq!(emitter.queued(), 1);
    }

    #[tokio::test]
    async fn test_emit_after_exporter_gone() {
        let (emitter, receiver) = AuditEmitter::channel(1, DEFAULT_AUDIT_SEND_TIMEOUT);
        drop(receiver);

        assert_eq!(
            emitter.emit(delete_event("a")).await,
            EmitOutcome::DroppedClosed
        );
    }

    #[tokio::test]
    async fn test_zero_capacity_is_clamped() {
        let (emitter, _receiver) = AuditEmitter::channel(0, Duration::from_millis(1));
        assert_eq!(emitter.emit(delete_event("a")).await, EmitOutcome::Queued);
    }

    #[tokio::test]
    async fn test_exporter_forwards_and_drains_on_cancel() {
        let sink = Arc::new(CollectingSink::default());
        let cancel_token = CancellationToken::new();
        let (emitter, receiver) = AuditEmitter::channel(8, DEFAULT_AUDIT_SEND_TIMEOUT);

        for name in ["a", "b", "c"] {
            emitter.emit(delete_event(name)).await;
        }

        // Cancel before the exporter ever runs: queued events must still be exported.
        cancel_token.cancel();
        AuditExporter::new(receiver, sink.clone(), cancel_token)
            .run()
            .await;

        let names: Vec<String> = sink
            .events
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.payload["name"].clone())
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_exporter_stops_when_emitters_dropped() {
        let sink = Arc::new(CollectingSink::default());
        let (emitter, handle) = AuditExporter::spawn(
            sink.clone(),
            8,
            DEFAULT_AUDIT_SEND_TIMEOUT,
            CancellationToken::new(),
        );

        emitter.emit(delete_event("only")).await;
        drop(emitter);

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("exporter should stop")
            .expect("exporter task should not panic");

        assert_eq!(sink.events.lock().unwrap().len(), 1);
    }
}
