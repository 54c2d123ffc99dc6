//! Default position catalog and a demo tenant seed for development.

use backoffice_authz::{
    Action, AllowedModules, DataScope, Employee, ModuleName, OrgDepartment, PermissionSet,
    Position, PositionLevel,
};
use backoffice_core::{EmployeeId, OrgDepartmentId, PositionId, ProjectId, TenantId};

use crate::directory::Directory;

pub const HQ_ADMIN: &str = "HQ-ADMIN";
pub const PROJECT_ACCOUNTANT: &str = "PRJ-ACCOUNTANT";
pub const HR_LEAD: &str = "GRP-HR-LEAD";
pub const STAFF: &str = "GRP-STAFF";

fn position(
    tenant_id: TenantId,
    code: &str,
    name: &str,
    level: PositionLevel,
    data_scope: DataScope,
) -> Position {
    Position {
        id: PositionId::new(),
        tenant_id,
        code: code.into(),
        name: name.into(),
        level,
        function_role: None,
        data_scope,
        can_manage_subordinates: false,
        permissions: PermissionSet::new(),
        allowed_modules: AllowedModules::default(),
    }
}

/// The four positions every new tenant starts with.
pub fn default_positions(tenant_id: TenantId) -> Vec<Position> {
    let all_actions = [
        Action::VIEW,
        Action::CREATE,
        Action::UPDATE,
        Action::DELETE,
        Action::APPROVE,
        Action::REJECT,
        Action::EXPORT,
    ];

    let admin = Position {
        function_role: Some("administration".into()),
        permissions: PermissionSet::new()
            .grant(ModuleName::FINANCE, "voucher", all_actions.clone())
            .grant(ModuleName::FINANCE, "flow", all_actions.clone())
            .grant(ModuleName::HR, "employee", all_actions.clone())
            .grant(ModuleName::HR, "leave", all_actions.clone())
            .grant(ModuleName::ASSET, "fixed_asset", all_actions.clone())
            .grant(
                ModuleName::REPORT,
                "finance",
                [Action::VIEW, Action::EXPORT, Action::PRINT],
            )
            .grant(
                ModuleName::SYSTEM,
                "position",
                [Action::VIEW, Action::CREATE, Action::UPDATE],
            )
            .grant(ModuleName::SYSTEM, "audit_log", [Action::VIEW]),
        allowed_modules: AllowedModules::from_entries(["*"]),
        ..position(
            tenant_id,
            HQ_ADMIN,
            "Headquarters administrator",
            PositionLevel::Headquarters,
            DataScope::All,
        )
    };

    let accountant = Position {
        function_role: Some("finance".into()),
        permissions: PermissionSet::new()
            .grant(
                ModuleName::FINANCE,
                "voucher",
                [Action::VIEW, Action::CREATE, Action::UPDATE],
            )
            .grant(ModuleName::FINANCE, "flow", [Action::VIEW, Action::CREATE])
            .grant(ModuleName::REPORT, "finance", [Action::VIEW, Action::EXPORT]),
        allowed_modules: AllowedModules::from_entries(["finance.*", "report.finance"]),
        ..position(
            tenant_id,
            PROJECT_ACCOUNTANT,
            "Project accountant",
            PositionLevel::Project,
            DataScope::Project,
        )
    };

    let hr_lead = Position {
        function_role: Some("hr".into()),
        can_manage_subordinates: true,
        permissions: PermissionSet::new()
            .grant(ModuleName::HR, "employee", [Action::VIEW, Action::CREATE, Action::UPDATE])
            .grant(
                ModuleName::HR,
                "leave",
                [Action::VIEW, Action::CREATE, Action::APPROVE, Action::REJECT],
            ),
        allowed_modules: AllowedModules::from_entries(["hr.*"]),
        ..position(
            tenant_id,
            HR_LEAD,
            "Group HR lead",
            PositionLevel::Group,
            DataScope::Group,
        )
    };

    let staff = Position {
        permissions: PermissionSet::new()
            .grant(ModuleName::HR, "leave", [Action::VIEW, Action::CREATE]),
        allowed_modules: AllowedModules::from_entries(["hr.leave"]),
        ..position(tenant_id, STAFF, "Staff", PositionLevel::Group, DataScope::SelfOnly)
    };

    vec![admin, accountant, hr_lead, staff]
}

/// What [`seed_demo_tenant`] created.
#[derive(Debug, Clone)]
pub struct DemoTenant {
    pub tenant_id: TenantId,
    pub project_id: ProjectId,
    pub positions: Vec<Position>,
    pub departments: Vec<OrgDepartment>,
    pub employees: Vec<Employee>,
}

impl DemoTenant {
    pub fn employee_holding(&self, code: &str) -> Option<&Employee> {
        let position = self.positions.iter().find(|p| p.code == code)?;
        self.employees
            .iter()
            .find(|e| e.position_id == Some(position.id))
    }
}

/// Seed the default catalog, a small org tree and one employee per position.
pub fn seed_demo_tenant(directory: &Directory, tenant_id: TenantId) -> DemoTenant {
    let positions = default_positions(tenant_id);
    for p in &positions {
        directory.put_position(p.clone());
    }

    let hq = OrgDepartment {
        id: OrgDepartmentId::new(),
        tenant_id,
        name: "Headquarters".into(),
        parent_id: None,
    };
    let hr = OrgDepartment {
        id: OrgDepartmentId::new(),
        tenant_id,
        name: "Human resources".into(),
        parent_id: Some(hq.id),
    };
    let payroll = OrgDepartment {
        id: OrgDepartmentId::new(),
        tenant_id,
        name: "Payroll".into(),
        parent_id: Some(hr.id),
    };
    let departments = vec![hq, hr, payroll];
    for d in &departments {
        directory.put_department(d.clone());
    }

    let project_id = ProjectId::new();
    let placements = [
        ("Admin", departments[0].id, None),
        ("Accountant", departments[0].id, Some(project_id)),
        ("HR Lead", departments[1].id, None),
        ("Staff", departments[2].id, None),
    ];

    let employees: Vec<Employee> = positions
        .iter()
        .zip(placements)
        .map(|(p, (name, dept, project))| Employee {
            id: EmployeeId::new(),
            tenant_id,
            name: name.into(),
            email: format!("{}@demo.example.com", name.to_lowercase().replace(' ', ".")),
            position_id: Some(p.id),
            project_id: project,
            org_department_id: Some(dept),
        })
        .collect();
    for e in &employees {
        directory.put_employee(e.clone());
        tracing::debug!(%tenant_id, employee_id = %e.id, "seeded demo employee");
    }

    DemoTenant {
        tenant_id,
        project_id,
        positions,
        departments,
        employees,
    }
}
