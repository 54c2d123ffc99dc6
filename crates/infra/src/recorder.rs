//! Audit Coupler: appends audit entries after mutations.
//!
//! Writes are best-effort. A failed or slow append is logged at `error` and
//! counted, but never fails the mutation that triggered it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use backoffice_authz::{
    AuditAction, AuditActor, AuditEntity, AuditEntry, AuditOutcome, NewAuditEntry, RequestMeta,
};

use crate::audit_log::{AuditLog, AuditLogError};

pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(2);

/// What happened, to which record.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub action: AuditAction,
    pub entity: AuditEntity,
    pub entity_id: String,
    pub detail: String,
}

impl AuditEvent {
    pub fn new(action: AuditAction, entity: AuditEntity, entity_id: impl ToString) -> Self {
        Self {
            action,
            entity,
            entity_id: entity_id.to_string(),
            detail: String::new(),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }
}

pub struct AuditRecorder<L> {
    log: L,
    timeout: Duration,
    failures: AtomicU64,
}

impl<L: AuditLog> AuditRecorder<L> {
    pub fn new(log: L, timeout: Duration) -> Self {
        Self {
            log,
            timeout,
            failures: AtomicU64::new(0),
        }
    }

    pub fn log(&self) -> &L {
        &self.log
    }

    /// Record a completed mutation.
    pub async fn record(
        &self,
        actor: &AuditActor,
        event: AuditEvent,
        meta: &RequestMeta,
    ) -> Option<AuditEntry> {
        self.append(actor, event, AuditOutcome::Success, meta).await
    }

    /// Record a mutation attempt rejected by authorization.
    pub async fn record_denial(
        &self,
        actor: &AuditActor,
        event: AuditEvent,
        meta: &RequestMeta,
    ) -> Option<AuditEntry> {
        self.append(actor, event, AuditOutcome::Denied, meta).await
    }

    /// Appends that failed or timed out since startup.
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    async fn append(
        &self,
        actor: &AuditActor,
        event: AuditEvent,
        outcome: AuditOutcome,
        meta: &RequestMeta,
    ) -> Option<AuditEntry> {
        let entry = NewAuditEntry {
            actor: actor.clone(),
            action: event.action,
            entity: event.entity,
            entity_id: event.entity_id,
            detail: event.detail,
            outcome,
            meta: meta.clone(),
        };

        let result = match tokio::time::timeout(self.timeout, self.log.append(entry)).await {
            Ok(result) => result,
            Err(_) => Err(AuditLogError::Timeout),
        };

        match result {
            Ok(entry) => Some(entry),
            Err(err) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                tracing::error!(
                    tenant_id = %actor.tenant_id,
                    actor_id = %actor.id,
                    action = %event.action,
                    entity = %event.entity,
                    outcome = %outcome,
                    error = %err,
                    "audit append failed; mutation stands"
                );
                None
            }
        }
    }
}
