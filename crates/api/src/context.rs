use backoffice_core::{EmployeeId, TenantId};

/// Tenant context for a request.
///
/// This is immutable and must be present for all tenant routes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TenantContext {
    tenant_id: TenantId,
}

impl TenantContext {
    pub fn new(tenant_id: TenantId) -> Self {
        Self { tenant_id }
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

/// Authenticated employee making the request.
///
/// Only identity travels with the request; the permission context is resolved
/// (and cached) by the services on demand.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CallerContext {
    employee_id: EmployeeId,
}

impl CallerContext {
    pub fn new(employee_id: EmployeeId) -> Self {
        Self { employee_id }
    }

    pub fn employee_id(&self) -> EmployeeId {
        self.employee_id
    }
}
