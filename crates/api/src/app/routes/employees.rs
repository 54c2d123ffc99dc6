//! Employee directory routes, filtered by the caller's data scope.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};

use backoffice_authz::{AuditAction, AuditEntity, Employee, RequestMeta, grants};
use backoffice_core::{EmployeeId, PositionId};
use backoffice_infra::AuditEvent;

use crate::app::dto::{self, Items};
use crate::app::errors::ApiError;
use crate::app::routes::common::authorize_mutation;
use crate::app::services::AppServices;
use crate::context::{CallerContext, TenantContext};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_employees).post(create_employee))
        .route("/:id/position", put(assign_position))
}

/// GET /api/v2/employees
pub async fn list_employees(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(caller): Extension<CallerContext>,
) -> Result<impl IntoResponse, ApiError> {
    let ctx = services.authorize(&tenant, &caller, &grants::EMPLOYEE_VIEW)?;
    Ok(Json(Items {
        items: services.visible_employees(&ctx),
    }))
}

/// POST /api/v2/employees
pub async fn create_employee(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(caller): Extension<CallerContext>,
    Extension(meta): Extension<RequestMeta>,
    Json(body): Json<dto::CreateEmployeeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let employee = Employee {
        id: EmployeeId::new(),
        tenant_id: tenant.tenant_id(),
        name: body.name.trim().to_string(),
        email: body.email.trim().to_string(),
        position_id: body.position_id,
        project_id: body.project_id,
        org_department_id: body.org_department_id,
    };

    let new_id = employee.id;
    let attempted = move || AuditEvent::new(AuditAction::Create, AuditEntity::Employee, new_id);
    let ctx = authorize_mutation(
        &services,
        &tenant,
        &caller,
        &meta,
        &grants::EMPLOYEE_CREATE,
        attempted,
    )
    .await?;

    // Nobody may place a new employee outside the records they can see, or in
    // a position wider than their own.
    let within_reach = services.is_visible(&ctx, &employee)
        && services.may_confer(&ctx, employee.position_id)?;
    if !within_reach {
        let actor = services.actor(&tenant, &caller);
        services.audit().record_denial(&actor, attempted(), &meta).await;
        return Err(ApiError::Forbidden);
    }

    let employee = services.create_employee(employee)?;

    let actor = services.actor(&tenant, &caller);
    services
        .audit()
        .record(
            &actor,
            AuditEvent::new(AuditAction::Create, AuditEntity::Employee, employee.id)
                .with_detail(format!("{} <{}>", employee.name, employee.email)),
            &meta,
        )
        .await;

    Ok((StatusCode::CREATED, Json(employee)))
}

/// PUT /api/v2/employees/:id/position
pub async fn assign_position(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(caller): Extension<CallerContext>,
    Extension(meta): Extension<RequestMeta>,
    Path(id): Path<String>,
    Json(body): Json<dto::AssignPositionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let target = id.clone();
    let ctx = authorize_mutation(
        &services,
        &tenant,
        &caller,
        &meta,
        &grants::EMPLOYEE_UPDATE,
        || AuditEvent::new(AuditAction::Update, AuditEntity::Employee, target),
    )
    .await?;

    let employee_id: EmployeeId = id.parse()?;
    let employee = services
        .visible_employee(&ctx, employee_id)
        .ok_or(ApiError::NotFound("employee"))?;

    if !services.may_confer(&ctx, body.position_id)? {
        let actor = services.actor(&tenant, &caller);
        services
            .audit()
            .record_denial(
                &actor,
                AuditEvent::new(AuditAction::Update, AuditEntity::Employee, employee.id),
                &meta,
            )
            .await;
        return Err(ApiError::Forbidden);
    }

    let (employee, previous) = services.assign_position(employee, body.position_id)?;

    if previous != employee.position_id {
        let actor = services.actor(&tenant, &caller);
        services
            .audit()
            .record(
                &actor,
                AuditEvent::new(AuditAction::Update, AuditEntity::Employee, employee.id).with_detail(
                    format!(
                        "position: {} -> {}",
                        describe(&services, &tenant, previous),
                        describe(&services, &tenant, employee.position_id)
                    ),
                ),
                &meta,
            )
            .await;
    }

    Ok(Json(employee))
}

fn describe(services: &AppServices, tenant: &TenantContext, position: Option<PositionId>) -> String {
    match position {
        None => "none".to_string(),
        Some(id) => services
            .directory()
            .position(tenant.tenant_id(), &id)
            .map(|p| p.code)
            .unwrap_or_else(|| id.to_string()),
    }
}
