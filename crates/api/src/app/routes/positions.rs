//! Permission catalog administration.
//!
//! Every edit invalidates the cached context of each holder before responding,
//! so a narrowed grant is enforced on the holder's very next request.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};

use backoffice_authz::{AuditAction, AuditEntity, Position, RequestMeta, grants};
use backoffice_core::PositionId;
use backoffice_infra::AuditEvent;

use crate::app::dto::{self, Items};
use crate::app::errors::ApiError;
use crate::app::routes::common::authorize_mutation;
use crate::app::services::AppServices;
use crate::context::{CallerContext, TenantContext};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_positions).post(create_position))
        .route("/:id", put(update_position))
}

/// GET /api/v2/positions
pub async fn list_positions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(caller): Extension<CallerContext>,
) -> Result<impl IntoResponse, ApiError> {
    services.authorize(&tenant, &caller, &grants::POSITION_VIEW)?;

    let mut items = services.directory().positions(tenant.tenant_id());
    items.sort_by(|a, b| (a.level as u8, &a.code).cmp(&(b.level as u8, &b.code)));
    Ok(Json(Items { items }))
}

/// POST /api/v2/positions
pub async fn create_position(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(caller): Extension<CallerContext>,
    Extension(meta): Extension<RequestMeta>,
    Json(body): Json<dto::CreatePositionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let code = body.code.trim().to_string();
    let attempted_code = code.clone();
    authorize_mutation(
        &services,
        &tenant,
        &caller,
        &meta,
        &grants::POSITION_CREATE,
        || AuditEvent::new(AuditAction::Create, AuditEntity::Position, attempted_code),
    )
    .await?;

    let position = services.create_position(Position {
        id: PositionId::new(),
        tenant_id: tenant.tenant_id(),
        code,
        name: body.name.trim().to_string(),
        level: body.level,
        function_role: body.function_role.filter(|r| !r.trim().is_empty()),
        data_scope: body.data_scope,
        can_manage_subordinates: body.can_manage_subordinates,
        permissions: body.permissions,
        allowed_modules: body.allowed_modules,
    })?;

    let actor = services.actor(&tenant, &caller);
    services
        .audit()
        .record(
            &actor,
            AuditEvent::new(AuditAction::Create, AuditEntity::Position, &position.code)
                .with_detail(format!("dataScope: {}", position.data_scope)),
            &meta,
        )
        .await;

    Ok((StatusCode::CREATED, Json(position)))
}

/// PUT /api/v2/positions/:id
pub async fn update_position(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(caller): Extension<CallerContext>,
    Extension(meta): Extension<RequestMeta>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdatePositionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let target = id.clone();
    authorize_mutation(
        &services,
        &tenant,
        &caller,
        &meta,
        &grants::POSITION_UPDATE,
        || AuditEvent::new(AuditAction::Update, AuditEntity::Position, target),
    )
    .await?;

    let position_id: PositionId = id.parse()?;
    let mut position = services
        .directory()
        .position(tenant.tenant_id(), &position_id)
        .ok_or(ApiError::NotFound("position"))?;

    let changed = body.apply(&mut position);
    if changed.is_empty() {
        return Ok(Json(position));
    }

    let holders = services.update_position(position.clone());
    tracing::info!(
        tenant_id = %tenant.tenant_id(),
        position = %position.code,
        holders,
        "position updated; holder contexts invalidated"
    );

    let actor = services.actor(&tenant, &caller);
    services
        .audit()
        .record(
            &actor,
            AuditEvent::new(AuditAction::Update, AuditEntity::Position, &position.code)
                .with_detail(format!("changed: {}; holders: {holders}", changed.join(", "))),
            &meta,
        )
        .await;

    Ok(Json(position))
}
