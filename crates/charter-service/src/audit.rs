//! Audit trail of state-changing operations.

use std::sync::Mutex;

use chrono::{DateTime, Utc};

use charter_core::ActorId;

/// One audited action, timestamped when recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEvent {
    pub event_type: &'static str,
    pub actor: ActorId,
    pub resource: String,
    pub detail: String,
    pub timestamp: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(
        event_type: &'static str,
        actor: &ActorId,
        resource: impl ToString,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            event_type,
            actor: actor.clone(),
            resource: resource.to_string(),
            detail: detail.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Fire-and-forget destination for audit events. Implementations must not
/// fail the caller.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent);
}

/// Emits each event as a structured `tracing` record.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: AuditEvent) {
        tracing::info!(
            event_type = event.event_type,
            actor = %event.actor,
            resource = %event.resource,
            detail = %event.detail,
            "audit event recorded"
        );
    }
}

/// Keeps events in memory.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn event_types(&self) -> Vec<&'static str> {
        self.events().iter().map(|e| e.event_type).collect()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: AuditEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }
}
