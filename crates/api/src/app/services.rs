//! Service wiring shared by every handler.

use std::sync::Arc;
use std::time::Duration;

use backoffice_authz::{
    AuditActor, Employee, PermissionContext, Position, QueryPredicate, RecordOwner,
    Requirement, can_confer, require, scope_to_filter,
};
use backoffice_core::{DomainError, EmployeeId, PositionId, TenantId};
use backoffice_infra::{
    AuditLog, AuditRecorder, CachePolicy, ContextCache, ContextResolver, DemoTenant, Directory,
    InMemoryAuditLog, seed_demo_tenant,
};

use crate::app::errors::ApiError;
use crate::context::{CallerContext, TenantContext};

pub type SharedAuditLog = Arc<dyn AuditLog>;

pub struct AppServices {
    directory: Directory,
    contexts: ContextCache<ContextResolver>,
    audit: AuditRecorder<SharedAuditLog>,
}

impl AppServices {
    pub fn new(
        directory: Directory,
        policy: CachePolicy,
        audit_log: SharedAuditLog,
        audit_timeout: Duration,
    ) -> Self {
        let resolver = ContextResolver::new(directory.clone());
        Self {
            directory,
            contexts: ContextCache::new(resolver, policy),
            audit: AuditRecorder::new(audit_log, audit_timeout),
        }
    }

    /// Fully in-memory wiring (tests, local development).
    pub fn in_memory(policy: CachePolicy) -> Self {
        Self::new(
            Directory::in_memory(),
            policy,
            Arc::new(InMemoryAuditLog::new()),
            backoffice_infra::DEFAULT_WRITE_TIMEOUT,
        )
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    pub fn contexts(&self) -> &ContextCache<ContextResolver> {
        &self.contexts
    }

    pub fn audit(&self) -> &AuditRecorder<SharedAuditLog> {
        &self.audit
    }

    pub fn seed_demo(&self, tenant_id: TenantId) -> DemoTenant {
        let demo = seed_demo_tenant(&self.directory, tenant_id);
        self.contexts.invalidate_tenant(tenant_id);
        demo
    }

    /// The caller's (possibly cached) permission context.
    pub fn context(&self, tenant: &TenantContext, caller: &CallerContext) -> Arc<PermissionContext> {
        self.contexts.get(tenant.tenant_id(), caller.employee_id())
    }

    /// Resolve the caller's context and check `requirement` against it.
    pub fn authorize(
        &self,
        tenant: &TenantContext,
        caller: &CallerContext,
        requirement: &Requirement,
    ) -> Result<Arc<PermissionContext>, ApiError> {
        let ctx = self.context(tenant, caller);
        require(&ctx, requirement)?;
        Ok(ctx)
    }

    /// Audit identity of the caller; unknown employees are recorded by id only.
    pub fn actor(&self, tenant: &TenantContext, caller: &CallerContext) -> AuditActor {
        let employee = self
            .directory
            .employee(tenant.tenant_id(), &caller.employee_id());
        AuditActor {
            tenant_id: tenant.tenant_id(),
            id: caller.employee_id(),
            name: employee.as_ref().map(|e| e.name.clone()).unwrap_or_default(),
            email: employee.map(|e| e.email).unwrap_or_default(),
        }
    }

    /// Row-visibility predicate for `ctx`.
    pub fn predicate(&self, ctx: &PermissionContext) -> QueryPredicate {
        let path = ctx
            .org_department_id()
            .and_then(|d| self.directory.org_path(ctx.tenant_id(), d));
        scope_to_filter(ctx, path.as_ref())
    }

    fn employee_owner(&self, employee: &Employee) -> RecordOwner {
        RecordOwner {
            owner_id: Some(employee.id),
            project_id: employee.project_id,
            org_department_id: employee.org_department_id,
            org_path: employee
                .org_department_id
                .and_then(|d| self.directory.org_path(employee.tenant_id, d)),
        }
    }

    /// Employees of the tenant visible under `ctx`'s data scope.
    pub fn visible_employees(&self, ctx: &PermissionContext) -> Vec<Employee> {
        let predicate = self.predicate(ctx);
        let mut employees = predicate.filter(self.directory.employees(ctx.tenant_id()), |e| {
            self.employee_owner(e)
        });
        employees.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        employees
    }

    /// One employee, if it exists and is visible under `ctx`.
    pub fn visible_employee(&self, ctx: &PermissionContext, id: EmployeeId) -> Option<Employee> {
        let employee = self.directory.employee(ctx.tenant_id(), &id)?;
        self.is_visible(ctx, &employee).then_some(employee)
    }

    pub fn is_visible(&self, ctx: &PermissionContext, employee: &Employee) -> bool {
        self.predicate(ctx).matches(&self.employee_owner(employee))
    }

    /// Whether `ctx` may place an employee in `position_id`; `None` (no
    /// position) is always allowed.
    pub fn may_confer(
        &self,
        ctx: &PermissionContext,
        position_id: Option<PositionId>,
    ) -> Result<bool, ApiError> {
        let Some(pid) = position_id else {
            return Ok(true);
        };
        let position = self.require_position(ctx.tenant_id(), pid)?;
        Ok(can_confer(ctx, &position))
    }

    pub fn create_employee(&self, employee: Employee) -> Result<Employee, ApiError> {
        if employee.name.trim().is_empty() || employee.email.trim().is_empty() {
            return Err(DomainError::validation("name and email are required").into());
        }
        if let Some(pid) = employee.position_id {
            self.require_position(employee.tenant_id, pid)?;
        }
        if let Some(dept) = employee.org_department_id {
            if self.directory.department(employee.tenant_id, &dept).is_none() {
                return Err(ApiError::NotFound("department"));
            }
        }
        self.directory.put_employee(employee.clone());
        // A previously resolved deny-all context for this id must not linger.
        self.contexts.invalidate(employee.tenant_id, employee.id);
        Ok(employee)
    }

    /// Change an employee's position and drop their cached context.
    ///
    /// Returns the previous position id alongside the updated employee.
    pub fn assign_position(
        &self,
        mut employee: Employee,
        position_id: Option<PositionId>,
    ) -> Result<(Employee, Option<PositionId>), ApiError> {
        if let Some(pid) = position_id {
            self.require_position(employee.tenant_id, pid)?;
        }
        let previous = employee.position_id;
        employee.position_id = position_id;
        self.directory.put_employee(employee.clone());
        self.contexts.invalidate(employee.tenant_id, employee.id);
        Ok((employee, previous))
    }

    pub fn create_position(&self, position: Position) -> Result<Position, ApiError> {
        let code = position.code.trim();
        if code.is_empty() || position.name.trim().is_empty() {
            return Err(DomainError::validation("code and name are required").into());
        }
        if self
            .directory
            .position_by_code(position.tenant_id, code)
            .is_some()
        {
            return Err(DomainError::conflict(format!("position code '{code}' already exists")).into());
        }
        self.directory.put_position(position.clone());
        Ok(position)
    }

    /// Store an edited position and drop the cached context of every holder.
    pub fn update_position(&self, position: Position) -> usize {
        let (tenant_id, position_id) = (position.tenant_id, position.id);
        self.directory.put_position(position);
        // Holders are read after the write.
        let holders = self.directory.holders_of(tenant_id, position_id);
        for employee_id in &holders {
            self.contexts.invalidate(tenant_id, *employee_id);
        }
        holders.len()
    }

    pub fn flush_contexts(&self, tenant_id: TenantId) {
        self.contexts.invalidate_tenant(tenant_id);
    }

    fn require_position(&self, tenant_id: TenantId, id: PositionId) -> Result<Position, ApiError> {
        self.directory
            .position(tenant_id, &id)
            .ok_or(ApiError::NotFound("position"))
    }
}
