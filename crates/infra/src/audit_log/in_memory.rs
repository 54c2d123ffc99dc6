use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;
use uuid::Uuid;

use backoffice_authz::{AuditEntry, NewAuditEntry};
use backoffice_core::TenantId;

use super::{AuditFilter, AuditLog, AuditLogError, AuditPage, Pagination};

/// In-memory append-only audit log for tests/dev.
///
/// Per tenant, entries are kept in append order and `at` never goes backwards,
/// so append order and timestamp order agree.
#[derive(Debug, Default)]
pub struct InMemoryAuditLog {
    tenants: RwLock<HashMap<TenantId, Vec<AuditEntry>>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a tenant's trail in append order.
    pub fn entries(&self, tenant_id: TenantId) -> Vec<AuditEntry> {
        self.tenants
            .read()
            .ok()
            .and_then(|t| t.get(&tenant_id).cloned())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl AuditLog for InMemoryAuditLog {
    async fn append(&self, entry: NewAuditEntry) -> Result<AuditEntry, AuditLogError> {
        let mut tenants = self
            .tenants
            .write()
            .map_err(|_| AuditLogError::Unavailable("audit log lock poisoned".to_string()))?;

        let trail = tenants.entry(entry.actor.tenant_id).or_default();
        let now = Utc::now();
        let at = trail.last().map_or(now, |last| last.at.max(now));

        let sealed = AuditEntry::seal(entry, Uuid::now_v7(), at);
        trail.push(sealed.clone());
        Ok(sealed)
    }

    async fn query(
        &self,
        tenant_id: TenantId,
        filter: AuditFilter,
        pagination: Pagination,
    ) -> Result<AuditPage, AuditLogError> {
        let tenants = self
            .tenants
            .read()
            .map_err(|_| AuditLogError::Unavailable("audit log lock poisoned".to_string()))?;

        let matching: Vec<&AuditEntry> = tenants
            .get(&tenant_id)
            .map(|trail| trail.iter().rev().filter(|e| filter.matches(e)).collect())
            .unwrap_or_default();

        let total = matching.len() as u64;
        let entries: Vec<AuditEntry> = matching
            .into_iter()
            .skip(pagination.offset as usize)
            .take(pagination.limit as usize)
            .cloned()
            .collect();
        let has_more = total > u64::from(pagination.offset) + entries.len() as u64;

        Ok(AuditPage {
            entries,
            total,
            pagination,
            has_more,
        })
    }

    async fn get(&self, tenant_id: TenantId, id: Uuid) -> Result<Option<AuditEntry>, AuditLogError> {
        let tenants = self
            .tenants
            .read()
            .map_err(|_| AuditLogError::Unavailable("audit log lock poisoned".to_string()))?;
        Ok(tenants
            .get(&tenant_id)
            .and_then(|trail| trail.iter().find(|e| e.id == id).cloned()))
    }
}
