//! Context Resolver: loads an employee's placement and position and produces
//! an immutable [`PermissionContext`].

use std::sync::Arc;

use backoffice_authz::{PermissionContext, resolve_context};
use backoffice_core::{EmployeeId, TenantId};

use crate::directory::Directory;

/// Anything that can turn an employee identity into a context.
///
/// Resolution is infallible by contract: failures degrade to a deny-all context.
pub trait ResolveContext: Send + Sync {
    fn resolve(&self, tenant_id: TenantId, employee_id: EmployeeId) -> PermissionContext;
}

impl<R> ResolveContext for Arc<R>
where
    R: ResolveContext + ?Sized,
{
    fn resolve(&self, tenant_id: TenantId, employee_id: EmployeeId) -> PermissionContext {
        (**self).resolve(tenant_id, employee_id)
    }
}

/// Directory-backed resolver.
#[derive(Clone)]
pub struct ContextResolver {
    directory: Directory,
}

impl ContextResolver {
    pub fn new(directory: Directory) -> Self {
        Self { directory }
    }
}

impl ResolveContext for ContextResolver {
    #[tracing::instrument(level = "debug", skip_all, fields(tenant_id = %tenant_id, employee_id = %employee_id))]
    fn resolve(&self, tenant_id: TenantId, employee_id: EmployeeId) -> PermissionContext {
        let employee = self.directory.employee(tenant_id, &employee_id);
        let position = employee
            .as_ref()
            .and_then(|e| e.position_id)
            .and_then(|pid| self.directory.position(tenant_id, &pid));

        resolve_context(tenant_id, employee_id, employee.as_ref(), position.as_ref())
    }
}
