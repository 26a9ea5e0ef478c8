//! Audit sink collaborator. The core appends events; it never reads them.
//!
//! Recording is best-effort: the engine logs and swallows sink failures so
//! an audit outage cannot fail a login.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::error::AuthError;
use crate::models::AuditEvent;

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, event: AuditEvent) -> Result<(), AuthError>;
}

/// Sink that emits events to the structured log. Useful as a default when
/// no persistence collaborator is wired in.
#[derive(Debug, Default, Clone)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, event: AuditEvent) -> Result<(), AuthError> {
        tracing::info!(
            action = event.action.as_str(),
            universe = %event.universe,
            module = %event.module,
            tenant_id = ?event.tenant_id,
            actor_identity_id = ?event.actor_identity_id,
            ip_address = ?event.ip_address,
            description = %event.description,
            "audit event"
        );
        Ok(())
    }
}

/// Capturing sink for tests.
#[derive(Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn record(&self, event: AuditEvent) -> Result<(), AuthError> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}
