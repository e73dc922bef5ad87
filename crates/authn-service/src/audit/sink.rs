//! Audit sinks: where exported events end up.

use super::AuditEvent;
use async_trait::async_trait;
use tracing::Span;

/// Destination for audit events.
///
/// `span` is the span that was current when the event was emitted. Delivery
/// failures are the sink's concern; nothing is reported back.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn export(&self, event: &AuditEvent, span: &Span);
}

/// Writes each event as a structured `INFO` tracing event parented on the
/// emitting request's span.
///
/// Field mapping:
/// - `audit.version`, `audit.event_type`, `audit.action`
/// - `audit.actor`: JSON object
/// - `audit.payload`: JSON object
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn export(&self, event: &AuditEvent, span: &Span) {
        // Actor and payload values are caller-controlled; JSON keeps them opaque.
        let actor = serde_json::to_string(&event.actor).unwrap_or_default();
        let payload = serde_json::to_string(&event.payload).unwrap_or_default();

        tracing::info!(
            target: "authn.audit",
            parent: span,
            {
                audit.version = event.version,
                audit.event_type = %event.event_type,
                audit.action = %event.action,
                audit.actor = %actor,
                audit.payload = %payload,
                audit.timestamp = %event.timestamp.to_rfc3339(),
            },
            "audit_event"
        );
    }
}
