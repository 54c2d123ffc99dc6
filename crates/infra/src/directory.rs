//! Employee / position / org-tree directory the resolver reads from.

use std::collections::HashSet;
use std::sync::Arc;

use backoffice_authz::{Employee, OrgDepartment, OrgPath, Position};
use backoffice_core::{EmployeeId, Entity, OrgDepartmentId, PositionId, TenantId};

use crate::read_model::{InMemoryTenantStore, TenantStore};

pub type EmployeeStore = Arc<dyn TenantStore<EmployeeId, Employee>>;
pub type PositionStore = Arc<dyn TenantStore<PositionId, Position>>;
pub type DepartmentStore = Arc<dyn TenantStore<OrgDepartmentId, OrgDepartment>>;

/// Read/write access to the records an authorization decision depends on.
///
/// Writes here are ordinary administration; callers that change a position or
/// an assignment must invalidate the affected cached contexts themselves.
#[derive(Clone)]
pub struct Directory {
    employees: EmployeeStore,
    positions: PositionStore,
    departments: DepartmentStore,
}

impl Directory {
    pub fn new(employees: EmployeeStore, positions: PositionStore, departments: DepartmentStore) -> Self {
        Self {
            employees,
            positions,
            departments,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryTenantStore::<EmployeeId, Employee>::new()),
            Arc::new(InMemoryTenantStore::<PositionId, Position>::new()),
            Arc::new(InMemoryTenantStore::<OrgDepartmentId, OrgDepartment>::new()),
        )
    }

    pub fn employee(&self, tenant_id: TenantId, id: &EmployeeId) -> Option<Employee> {
        self.employees.get(tenant_id, id)
    }

    pub fn employees(&self, tenant_id: TenantId) -> Vec<Employee> {
        self.employees.list(tenant_id)
    }

    pub fn put_employee(&self, employee: Employee) {
        put(&*self.employees, employee.tenant_id, employee);
    }

    pub fn position(&self, tenant_id: TenantId, id: &PositionId) -> Option<Position> {
        self.positions.get(tenant_id, id)
    }

    pub fn positions(&self, tenant_id: TenantId) -> Vec<Position> {
        self.positions.list(tenant_id)
    }

    pub fn position_by_code(&self, tenant_id: TenantId, code: &str) -> Option<Position> {
        self.positions
            .find(tenant_id, &|p: &Position| p.code.eq_ignore_ascii_case(code))
            .into_iter()
            .next()
    }

    pub fn put_position(&self, position: Position) {
        put(&*self.positions, position.tenant_id, position);
    }

    /// Employees currently assigned to `position_id`.
    pub fn holders_of(&self, tenant_id: TenantId, position_id: PositionId) -> Vec<EmployeeId> {
        self.employees
            .find(tenant_id, &|e: &Employee| e.position_id == Some(position_id))
            .into_iter()
            .map(|e| e.id)
            .collect()
    }

    pub fn department(&self, tenant_id: TenantId, id: &OrgDepartmentId) -> Option<OrgDepartment> {
        self.departments.get(tenant_id, id)
    }

    pub fn put_department(&self, department: OrgDepartment) {
        put(&*self.departments, department.tenant_id, department);
    }

    /// Root-first path to `id` by walking parent links.
    ///
    /// Returns `None` for an unknown department, a dangling parent, or a cycle.
    pub fn org_path(&self, tenant_id: TenantId, id: OrgDepartmentId) -> Option<OrgPath> {
        let mut chain = vec![id];
        let mut seen = HashSet::from([id]);
        let mut current = self.department(tenant_id, &id)?;

        while let Some(parent) = current.parent_id {
            if !seen.insert(parent) {
                tracing::warn!(%tenant_id, department_id = %id, "cycle in org hierarchy");
                return None;
            }
            current = self.department(tenant_id, &parent)?;
            chain.push(parent);
        }

        chain.reverse();
        Some(OrgPath::new(chain))
    }
}

fn put<V: Entity>(store: &dyn TenantStore<V::Id, V>, tenant_id: TenantId, record: V) {
    store.upsert(tenant_id, record.id().clone(), record);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dept(tenant_id: TenantId, parent: Option<OrgDepartmentId>) -> OrgDepartment {
        OrgDepartment {
            id: OrgDepartmentId::new(),
            tenant_id,
            name: "unit".into(),
            parent_id: parent,
        }
    }

    #[test]
    fn org_path_walks_to_root() {
        let dir = Directory::in_memory();
        let t = TenantId::new();
        let hq = dept(t, None);
        let east = dept(t, Some(hq.id));
        let ops = dept(t, Some(east.id));
        for d in [&hq, &east, &ops] {
            dir.put_department(d.clone());
        }

        let path = dir.org_path(t, ops.id).unwrap();
        assert_eq!(path.ids(), &[hq.id, east.id, ops.id]);
        assert!(dir.org_path(TenantId::new(), ops.id).is_none());
    }

    #[test]
    fn org_path_rejects_cycles_and_dangling_parents() {
        let dir = Directory::in_memory();
        let t = TenantId::new();
        let mut a = dept(t, None);
        let b = dept(t, Some(a.id));
        a.parent_id = Some(b.id);
        dir.put_department(a.clone());
        dir.put_department(b.clone());
        assert!(dir.org_path(t, a.id).is_none());

        let orphan = dept(t, Some(OrgDepartmentId::new()));
        dir.put_department(orphan.clone());
        assert!(dir.org_path(t, orphan.id).is_none());
    }
}
