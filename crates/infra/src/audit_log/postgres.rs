//! Postgres-backed audit log.
//!
//! Schema (see `migrations/0001_audit_log.sql`): one `audit_log` table keyed by
//! `id`, indexed by `(tenant_id, at)`. Inserts only; the application role is
//! expected to hold no UPDATE/DELETE grant on the table.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use backoffice_authz::{AuditEntry, NewAuditEntry};
use backoffice_core::{EmployeeId, TenantId};

use super::{AuditFilter, AuditLog, AuditLogError, AuditPage, Pagination};

#[derive(Debug, Clone)]
pub struct PostgresAuditLog {
    pool: Arc<PgPool>,
}

impl PostgresAuditLog {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Connect and make sure the table exists.
    pub async fn connect(database_url: &str) -> Result<Self, AuditLogError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        sqlx::raw_sql(include_str!("../../migrations/0001_audit_log.sql"))
            .execute(&pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(Self::new(pool))
    }
}

const SELECT_COLUMNS: &str = r#"
    id, tenant_id, at, actor_id, actor_name, actor_email,
    action, entity, entity_id, detail, outcome, ip, ip_location
"#;

#[async_trait::async_trait]
impl AuditLog for PostgresAuditLog {
    #[instrument(
        skip_all,
        fields(
            tenant_id = %entry.actor.tenant_id,
            action = %entry.action,
            entity = %entry.entity
        ),
        err
    )]
    async fn append(&self, entry: NewAuditEntry) -> Result<AuditEntry, AuditLogError> {
        let id = Uuid::now_v7();

        // `at` is assigned by the database so ordering follows commit clock.
        let row = sqlx::query(
            r#"
            INSERT INTO audit_log (
                id, tenant_id, at, actor_id, actor_name, actor_email,
                action, entity, entity_id, detail, outcome, ip, ip_location
            )
            VALUES ($1, $2, clock_timestamp(), $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING at
            "#,
        )
        .bind(id)
        .bind(entry.actor.tenant_id.as_uuid())
        .bind(entry.actor.id.as_uuid())
        .bind(&entry.actor.name)
        .bind(&entry.actor.email)
        .bind(entry.action.as_str())
        .bind(entry.entity.as_str())
        .bind(&entry.entity_id)
        .bind(&entry.detail)
        .bind(entry.outcome.as_str())
        .bind(entry.meta.ip.as_deref())
        .bind(entry.meta.ip_location.as_deref())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("append", e))?;

        let at: DateTime<Utc> = row
            .try_get("at")
            .map_err(|e| AuditLogError::Corrupt(e.to_string()))?;

        Ok(AuditEntry::seal(entry, id, at))
    }

    #[instrument(skip(self, filter), fields(tenant_id = %tenant_id), err)]
    async fn query(
        &self,
        tenant_id: TenantId,
        filter: AuditFilter,
        pagination: Pagination,
    ) -> Result<AuditPage, AuditLogError> {
        let action = filter.action.map(|a| a.as_str());
        let entity = filter.entity.map(|e| e.as_str());
        let actor = filter.actor_id.map(|a| *a.as_uuid());
        let entity_id = filter.entity_id.as_deref();

        let count_row = sqlx::query(
            r#"
            SELECT COUNT(*) AS total
            FROM audit_log
            WHERE tenant_id = $1
                AND ($2::text IS NULL OR action = $2)
                AND ($3::text IS NULL OR entity = $3)
                AND ($4::uuid IS NULL OR actor_id = $4)
                AND ($5::text IS NULL OR entity_id = $5)
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(action)
        .bind(entity)
        .bind(actor)
        .bind(entity_id)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("count", e))?;

        let total: i64 = count_row
            .try_get("total")
            .map_err(|e| AuditLogError::Corrupt(e.to_string()))?;

        let sql = format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM audit_log
            WHERE tenant_id = $1
                AND ($2::text IS NULL OR action = $2)
                AND ($3::text IS NULL OR entity = $3)
                AND ($4::uuid IS NULL OR actor_id = $4)
                AND ($5::text IS NULL OR entity_id = $5)
            ORDER BY at DESC, id DESC
            LIMIT $6 OFFSET $7
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(tenant_id.as_uuid())
            .bind(action)
            .bind(entity)
            .bind(actor)
            .bind(entity_id)
            .bind(i64::from(pagination.limit))
            .bind(i64::from(pagination.offset))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("query", e))?;

        let entries = rows
            .iter()
            .map(entry_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        let has_more = total > i64::from(pagination.offset) + entries.len() as i64;

        Ok(AuditPage {
            entries,
            total: total.max(0) as u64,
            pagination,
            has_more,
        })
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id), err)]
    async fn get(&self, tenant_id: TenantId, id: Uuid) -> Result<Option<AuditEntry>, AuditLogError> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM audit_log WHERE tenant_id = $1 AND id = $2");
        let row = sqlx::query(&sql)
            .bind(tenant_id.as_uuid())
            .bind(id)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get", e))?;

        row.as_ref().map(entry_from_row).transpose()
    }
}

fn entry_from_row(row: &sqlx::postgres::PgRow) -> Result<AuditEntry, AuditLogError> {
    let corrupt = |e: sqlx::Error| AuditLogError::Corrupt(e.to_string());

    let action: String = row.try_get("action").map_err(corrupt)?;
    let entity: String = row.try_get("entity").map_err(corrupt)?;
    let outcome: String = row.try_get("outcome").map_err(corrupt)?;
    let tenant: Uuid = row.try_get("tenant_id").map_err(corrupt)?;
    let actor: Uuid = row.try_get("actor_id").map_err(corrupt)?;

    Ok(AuditEntry {
        id: row.try_get("id").map_err(corrupt)?,
        tenant_id: TenantId::from_uuid(tenant),
        at: row.try_get("at").map_err(corrupt)?,
        actor_id: EmployeeId::from_uuid(actor),
        actor_name: row.try_get("actor_name").map_err(corrupt)?,
        actor_email: row.try_get("actor_email").map_err(corrupt)?,
        action: action
            .parse()
            .map_err(|e: backoffice_core::DomainError| AuditLogError::Corrupt(e.to_string()))?,
        entity: entity
            .parse()
            .map_err(|e: backoffice_core::DomainError| AuditLogError::Corrupt(e.to_string()))?,
        entity_id: row.try_get("entity_id").map_err(corrupt)?,
        detail: row.try_get("detail").map_err(corrupt)?,
        outcome: outcome
            .parse()
            .map_err(|e: backoffice_core::DomainError| AuditLogError::Corrupt(e.to_string()))?,
        ip: row.try_get("ip").map_err(corrupt)?,
        ip_location: row.try_get("ip_location").map_err(corrupt)?,
    })
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> AuditLogError {
    match err {
        sqlx::Error::Database(db_err) => AuditLogError::Unavailable(format!(
            "database error in {operation}: {}",
            db_err.message()
        )),
        sqlx::Error::PoolClosed => {
            AuditLogError::Unavailable(format!("connection pool closed in {operation}"))
        }
        sqlx::Error::PoolTimedOut => AuditLogError::Timeout,
        other => AuditLogError::Unavailable(format!("sqlx error in {operation}: {other}")),
    }
}
