//! Read access to the append-only audit trail.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use backoffice_authz::grants;
use backoffice_infra::AuditLog;

use crate::app::dto;
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::{CallerContext, TenantContext};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_audit_logs))
        .route("/:id", get(get_audit_log))
}

/// GET /api/v2/audit-logs?action=&entity=&actorId=&entityId=&limit=&offset=
pub async fn list_audit_logs(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(caller): Extension<CallerContext>,
    Query(query): Query<dto::AuditLogQuery>,
) -> Result<impl IntoResponse, ApiError> {
    services.authorize(&tenant, &caller, &grants::AUDIT_LOG_VIEW)?;

    let (filter, pagination) = query.into_parts()?;
    let page = services
        .audit()
        .log()
        .query(tenant.tenant_id(), filter, pagination)
        .await?;
    Ok(Json(page))
}

/// GET /api/v2/audit-logs/:id
pub async fn get_audit_log(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    services.authorize(&tenant, &caller, &grants::AUDIT_LOG_VIEW)?;

    let id = Uuid::parse_str(&id).map_err(|e| ApiError::Validation(format!("invalid audit log id: {e}")))?;
    let entry = services
        .audit()
        .log()
        .get(tenant.tenant_id(), id)
        .await?
        .ok_or(ApiError::NotFound("audit log entry"))?;
    Ok(Json(entry))
}
