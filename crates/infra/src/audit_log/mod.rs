//! Append-only audit trail storage.
//!
//! The trait deliberately has no update or delete operation.

pub mod in_memory;
pub mod postgres;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use backoffice_authz::{AuditAction, AuditEntity, AuditEntry, NewAuditEntry};
use backoffice_core::{EmployeeId, TenantId};

pub use in_memory::InMemoryAuditLog;
pub use postgres::PostgresAuditLog;

#[derive(Debug, Error)]
pub enum AuditLogError {
    #[error("audit storage unavailable: {0}")]
    Unavailable(String),

    #[error("audit write timed out")]
    Timeout,

    #[error("corrupt audit row: {0}")]
    Corrupt(String),
}

/// Filter for audit listings. `None` fields do not constrain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditFilter {
    pub action: Option<AuditAction>,
    pub entity: Option<AuditEntity>,
    pub actor_id: Option<EmployeeId>,
    pub entity_id: Option<String>,
}

impl AuditFilter {
    pub fn matches(&self, entry: &AuditEntry) -> bool {
        self.action.is_none_or(|a| a == entry.action)
            && self.entity.is_none_or(|e| e == entry.entity)
            && self.actor_id.is_none_or(|id| id == entry.actor_id)
            && self.entity_id.as_deref().is_none_or(|id| id == entry.entity_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub limit: u32,
    pub offset: u32,
}

impl Pagination {
    pub const MAX_LIMIT: u32 = 500;

    pub fn new(limit: u32, offset: u32) -> Self {
        Self {
            limit: limit.clamp(1, Self::MAX_LIMIT),
            offset,
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(50, 0)
    }
}

/// One page of entries, newest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditPage {
    pub entries: Vec<AuditEntry>,
    pub total: u64,
    pub pagination: Pagination,
    pub has_more: bool,
}

#[async_trait::async_trait]
pub trait AuditLog: Send + Sync {
    /// Persist a new entry, assigning its id and timestamp.
    async fn append(&self, entry: NewAuditEntry) -> Result<AuditEntry, AuditLogError>;

    /// Tenant-scoped listing ordered by `at` descending.
    async fn query(
        &self,
        tenant_id: TenantId,
        filter: AuditFilter,
        pagination: Pagination,
    ) -> Result<AuditPage, AuditLogError>;

    async fn get(&self, tenant_id: TenantId, id: Uuid) -> Result<Option<AuditEntry>, AuditLogError>;
}

#[async_trait::async_trait]
impl<L> AuditLog for std::sync::Arc<L>
where
    L: AuditLog + ?Sized,
{
    async fn append(&self, entry: NewAuditEntry) -> Result<AuditEntry, AuditLogError> {
        (**self).append(entry).await
    }

    async fn query(
        &self,
        tenant_id: TenantId,
        filter: AuditFilter,
        pagination: Pagination,
    ) -> Result<AuditPage, AuditLogError> {
        (**self).query(tenant_id, filter, pagination).await
    }

    async fn get(&self, tenant_id: TenantId, id: Uuid) -> Result<Option<AuditEntry>, AuditLogError> {
        (**self).get(tenant_id, id).await
    }
}
