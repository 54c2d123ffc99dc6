use std::sync::Arc;

use axum::{extract::Extension, response::IntoResponse, Json};

use crate::app::dto::MyPermissions;
use crate::app::services::AppServices;
use crate::context::{CallerContext, TenantContext};

/// GET /api/v2/my/permissions - the caller's resolved permission context.
///
/// Always succeeds for an authenticated caller; an unassigned or unknown
/// employee gets the deny-all shape (`position: null`, empty grants).
pub async fn my_permissions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(caller): Extension<CallerContext>,
) -> axum::response::Response {
    let ctx = services.context(&tenant, &caller);
    Json(MyPermissions::from(ctx.as_ref())).into_response()
}
