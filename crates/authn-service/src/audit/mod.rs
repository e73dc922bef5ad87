//! Audit events for sensitive authentication lifecycle transitions.
//!
//! # Architecture
//!
//! ```text
//! AuthenticationService ──emit()──▶ AuditEmitter ──mpsc──▶ AuditExporter ──▶ AuditSink
//!        (request task)              (bounded)            (background task)
//! ```
//!
//! The emitter captures the caller's span together with the event, so the
//! exporter can attach the event to the request's trace even though it runs
//! on another task. Emission never fails the caller.

pub mod emitter;
pub mod sink;

pub use emitter::{AuditEmitter, AuditEnvelope, AuditExporter, EmitOutcome};
pub use sink::{AuditSink, TracingAuditSink};

use crate::actor::Actor;
use crate::models::Method;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Schema version stamped on every event.
pub const EVENT_VERSION: &str = "0.1";

/// Kind of resource an event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EventType {
    #[serde(rename = "authentication-token")]
    AuthenticationToken,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::AuthenticationToken => "authentication-token",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle transition recorded by an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "create",
            AuditAction::Update => "update",
            AuditAction::Delete => "delete",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable description of an audited transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEvent {
    pub version: &'static str,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub action: AuditAction,
    pub actor: Actor,
    /// Copied from the affected authentication's metadata.
    pub payload: BTreeMap<String, String>,
    pub timestamp: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(
        event_type: EventType,
        action: AuditAction,
        actor: Actor,
        payload: BTreeMap<String, String>,
    ) -> Self {
        Self {
            version: EVENT_VERSION,
            event_type,
            action,
            actor,
            payload,
            timestamp: Utc::now(),
        }
    }
}

/// Event type to record for lifecycle changes of an authentication with
/// `method`, or `None` if that method is not audited.
///
/// Adding a [`Method`] variant fails to compile here until it is given a policy.
pub fn audited_event_type(method: Method) -> Option<EventType> {
    match method {
        Method::Token => Some(EventType::AuthenticationToken),
        Method::None | Method::Oidc | Method::Kubernetes | Method::Github | Method::Jwt => None,
    }
}
