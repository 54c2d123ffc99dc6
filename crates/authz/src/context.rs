//! Resolved, immutable authorization snapshot for one employee.

use serde::{Deserialize, Serialize};

use backoffice_core::{EmployeeId, OrgDepartmentId, PositionId, ProjectId, TenantId, ValueObject};

use crate::employee::Employee;
use crate::modules::AllowedModules;
use crate::permissions::PermissionSet;
use crate::position::{DataScope, Position};

/// Identity of the position a context was resolved from (not the catalog row).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionRef {
    pub id: PositionId,
    pub code: String,
    pub name: String,
}

/// Everything the enforcement functions need, copied out of the catalog at
/// resolution time.
///
/// Fields are read-only; if the underlying position or assignment changes a
/// new context has to be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionContext {
    employee_id: EmployeeId,
    tenant_id: TenantId,
    position: Option<PositionRef>,
    permissions: PermissionSet,
    data_scope: DataScope,
    can_manage_subordinates: bool,
    allowed_modules: AllowedModules,
    project_id: Option<ProjectId>,
    org_department_id: Option<OrgDepartmentId>,
}

impl ValueObject for PermissionContext {}

impl PermissionContext {
    /// Context for an employee holding `position`.
    pub fn from_assignment(employee: &Employee, position: &Position) -> Self {
        Self {
            employee_id: employee.id,
            tenant_id: employee.tenant_id,
            position: Some(PositionRef {
                id: position.id,
                code: position.code.clone(),
                name: position.name.clone(),
            }),
            permissions: position.permissions.clone(),
            data_scope: position.data_scope,
            can_manage_subordinates: position.can_manage_subordinates,
            allowed_modules: position.allowed_modules.clone(),
            project_id: employee.project_id,
            org_department_id: employee.org_department_id,
        }
    }

    /// Context that grants nothing beyond the employee's own records.
    pub fn deny_all(tenant_id: TenantId, employee_id: EmployeeId) -> Self {
        Self {
            employee_id,
            tenant_id,
            position: None,
            permissions: PermissionSet::default(),
            data_scope: DataScope::SelfOnly,
            can_manage_subordinates: false,
            allowed_modules: AllowedModules::default(),
            project_id: None,
            org_department_id: None,
        }
    }

    pub fn employee_id(&self) -> EmployeeId {
        self.employee_id
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn position(&self) -> Option<&PositionRef> {
        self.position.as_ref()
    }

    pub fn permissions(&self) -> &PermissionSet {
        &self.permissions
    }

    pub fn data_scope(&self) -> DataScope {
        self.data_scope
    }

    pub fn can_manage_subordinates(&self) -> bool {
        self.can_manage_subordinates
    }

    pub fn allowed_modules(&self) -> &AllowedModules {
        &self.allowed_modules
    }

    pub fn project_id(&self) -> Option<ProjectId> {
        self.project_id
    }

    pub fn org_department_id(&self) -> Option<OrgDepartmentId> {
        self.org_department_id
    }

    pub fn is_deny_all(&self) -> bool {
        self.position.is_none()
    }
}

/// Pure resolution over already-loaded records.
///
/// Never fails: a missing employee, a missing or dangling position
/// reference, or a cross-tenant row all produce [`PermissionContext::deny_all`].
pub fn resolve_context(
    tenant_id: TenantId,
    employee_id: EmployeeId,
    employee: Option<&Employee>,
    position: Option<&Position>,
) -> PermissionContext {
    let Some(employee) = employee else {
        tracing::warn!(%tenant_id, %employee_id, "employee not found; resolving deny-all context");
        return PermissionContext::deny_all(tenant_id, employee_id);
    };

    if employee.id != employee_id || employee.tenant_id != tenant_id {
        tracing::warn!(%tenant_id, %employee_id, "employee record does not match request; resolving deny-all context");
        return PermissionContext::deny_all(tenant_id, employee_id);
    }

    let Some(position_id) = employee.position_id else {
        tracing::info!(%tenant_id, %employee_id, "employee has no position; resolving deny-all context");
        return PermissionContext::deny_all(tenant_id, employee_id);
    };

    match position {
        Some(p) if p.id == position_id && p.tenant_id == tenant_id => {
            PermissionContext::from_assignment(employee, p)
        }
        _ => {
            tracing::warn!(
                %tenant_id,
                %employee_id,
                %position_id,
                "assigned position missing or inconsistent; resolving deny-all context"
            );
            PermissionContext::deny_all(tenant_id, employee_id)
        }
    }
}
