//! Tenant administration of the permission-context cache.

use std::sync::Arc;

use axum::{
    extract::Extension,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use backoffice_authz::{AuditAction, AuditEntity, RequestMeta, grants};
use backoffice_infra::AuditEvent;

use crate::app::errors::ApiError;
use crate::app::routes::common::authorize_mutation;
use crate::app::services::AppServices;
use crate::context::{CallerContext, TenantContext};

pub fn router() -> Router {
    Router::new()
        .route("/permission-cache/flush", post(flush_permission_cache))
        .route("/permission-cache/stats", get(permission_cache_stats))
}

/// POST /api/v2/admin/permission-cache/flush
///
/// Drops every cached context of the caller's tenant (broad catalog change).
pub async fn flush_permission_cache(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(caller): Extension<CallerContext>,
    Extension(meta): Extension<RequestMeta>,
) -> Result<impl IntoResponse, ApiError> {
    let event = AuditEvent::new(AuditAction::Sync, AuditEntity::PermissionCache, tenant.tenant_id());
    let attempted = event.clone();
    authorize_mutation(
        &services,
        &tenant,
        &caller,
        &meta,
        &grants::POSITION_UPDATE,
        || attempted,
    )
    .await?;

    services.flush_contexts(tenant.tenant_id());

    let actor = services.actor(&tenant, &caller);
    services
        .audit()
        .record(&actor, event.with_detail("tenant contexts flushed"), &meta)
        .await;

    Ok(Json(json!({
        "flushed": true,
        "tenantId": tenant.tenant_id(),
    })))
}

/// GET /api/v2/admin/permission-cache/stats
pub async fn permission_cache_stats(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(caller): Extension<CallerContext>,
) -> Result<impl IntoResponse, ApiError> {
    services.authorize(&tenant, &caller, &grants::POSITION_VIEW)?;

    let stats = services.contexts().stats();
    let policy = services.contexts().policy();
    Ok(Json(json!({
        "hits": stats.hits,
        "misses": stats.misses,
        "entries": stats.entries,
        "freshForSecs": policy.fresh_for.num_seconds(),
        "evictAfterSecs": policy.evict_after.num_seconds(),
        "auditFailures": services.audit().failures(),
    })))
}
