use serde::{Deserialize, Serialize};

use backoffice_core::{EmployeeId, Entity, OrgDepartmentId, PositionId, ProjectId, TenantId};

/// A person and their organisational placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: EmployeeId,
    pub tenant_id: TenantId,
    pub name: String,
    pub email: String,
    /// Active position; `None` while offboarding or before onboarding completes.
    pub position_id: Option<PositionId>,
    pub project_id: Option<ProjectId>,
    pub org_department_id: Option<OrgDepartmentId>,
}

impl Entity for Employee {
    type Id = EmployeeId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Node of the internal organisation tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgDepartment {
    pub id: OrgDepartmentId,
    pub tenant_id: TenantId,
    pub name: String,
    pub parent_id: Option<OrgDepartmentId>,
}

impl Entity for OrgDepartment {
    type Id = OrgDepartmentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Root-first chain of department ids ending at a department.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrgPath(Vec<OrgDepartmentId>);

impl OrgPath {
    pub fn new(root_first: Vec<OrgDepartmentId>) -> Self {
        Self(root_first)
    }

    pub fn ids(&self) -> &[OrgDepartmentId] {
        &self.0
    }

    /// The department this path ends at.
    pub fn leaf(&self) -> Option<OrgDepartmentId> {
        self.0.last().copied()
    }

    /// Whether this path is `ancestor` itself or lies below it.
    pub fn is_within(&self, ancestor: &OrgPath) -> bool {
        !ancestor.0.is_empty() && self.0.starts_with(&ancestor.0)
    }
}
