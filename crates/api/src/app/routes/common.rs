use std::sync::Arc;

use backoffice_authz::{PermissionContext, RequestMeta, Requirement};
use backoffice_infra::AuditEvent;

use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::{CallerContext, TenantContext};

/// Authorize a mutating request; a denial is itself audited before it is returned.
pub async fn authorize_mutation(
    services: &AppServices,
    tenant: &TenantContext,
    caller: &CallerContext,
    meta: &RequestMeta,
    requirement: &Requirement,
    attempted: impl FnOnce() -> AuditEvent,
) -> Result<Arc<PermissionContext>, ApiError> {
    match services.authorize(tenant, caller, requirement) {
        Ok(ctx) => Ok(ctx),
        Err(err) => {
            let actor = services.actor(tenant, caller);
            services.audit().record_denial(&actor, attempted(), meta).await;
            Err(err)
        }
    }
}
