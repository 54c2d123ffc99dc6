use serde::{Deserialize, Serialize};

use backoffice_authz::{
    AllowedModules, AuditAction, AuditEntity, DataScope, PermissionContext, PermissionSet,
    Position, PositionLevel, PositionRef,
};
use backoffice_core::{EmployeeId, OrgDepartmentId, PositionId, ProjectId};
use backoffice_infra::{AuditFilter, Pagination};

use crate::app::errors::ApiError;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEmployeeRequest {
    pub name: String,
    pub email: String,
    pub position_id: Option<PositionId>,
    pub project_id: Option<ProjectId>,
    pub org_department_id: Option<OrgDepartmentId>,
}

/// `positionId: null` removes the assignment.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignPositionRequest {
    pub position_id: Option<PositionId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePositionRequest {
    pub code: String,
    pub name: String,
    pub level: PositionLevel,
    pub function_role: Option<String>,
    pub data_scope: DataScope,
    #[serde(default)]
    pub can_manage_subordinates: bool,
    #[serde(default)]
    pub permissions: PermissionSet,
    #[serde(default)]
    pub allowed_modules: AllowedModules,
}

/// Partial update; absent fields are left as they are.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePositionRequest {
    pub name: Option<String>,
    pub level: Option<PositionLevel>,
    pub function_role: Option<String>,
    pub data_scope: Option<DataScope>,
    pub can_manage_subordinates: Option<bool>,
    pub permissions: Option<PermissionSet>,
    pub allowed_modules: Option<AllowedModules>,
}

impl UpdatePositionRequest {
    /// Apply to `position`, returning the names of fields that actually changed.
    pub fn apply(self, position: &mut Position) -> Vec<&'static str> {
        let Self {
            name,
            level,
            function_role,
            data_scope,
            can_manage_subordinates,
            permissions,
            allowed_modules,
        } = self;
        let mut changed = Vec::new();

        macro_rules! set {
            ($field:ident, $wire:literal) => {
                if let Some(v) = $field {
                    if position.$field != v {
                        position.$field = v;
                        changed.push($wire);
                    }
                }
            };
        }

        set!(name, "name");
        set!(level, "level");
        set!(data_scope, "dataScope");
        set!(can_manage_subordinates, "canManageSubordinates");
        set!(permissions, "permissions");
        set!(allowed_modules, "allowedModules");

        if let Some(role) = function_role {
            let role = Some(role).filter(|r| !r.trim().is_empty());
            if position.function_role != role {
                position.function_role = role;
                changed.push("functionRole");
            }
        }

        changed
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogQuery {
    pub action: Option<String>,
    pub entity: Option<String>,
    pub actor_id: Option<String>,
    pub entity_id: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl AuditLogQuery {
    pub fn into_parts(self) -> Result<(AuditFilter, Pagination), ApiError> {
        let action = self
            .action
            .as_deref()
            .map(str::parse::<AuditAction>)
            .transpose()?;
        let entity = self
            .entity
            .as_deref()
            .map(str::parse::<AuditEntity>)
            .transpose()?;
        let actor_id = self
            .actor_id
            .as_deref()
            .map(str::parse::<EmployeeId>)
            .transpose()?;

        let defaults = Pagination::default();
        let pagination = Pagination::new(
            self.limit.unwrap_or(defaults.limit),
            self.offset.unwrap_or(defaults.offset),
        );

        Ok((
            AuditFilter {
                action,
                entity,
                actor_id,
                entity_id: self.entity_id,
            },
            pagination,
        ))
    }
}

// -------------------------
// Response DTOs
// -------------------------

/// Body of `GET /api/v2/my/permissions`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MyPermissions<'a> {
    pub employee_id: EmployeeId,
    pub position: Option<&'a PositionRef>,
    pub permissions: &'a PermissionSet,
    pub data_scope: DataScope,
    pub can_manage_subordinates: bool,
    pub allowed_modules: &'a AllowedModules,
    pub project_id: Option<ProjectId>,
    pub org_department_id: Option<OrgDepartmentId>,
}

impl<'a> From<&'a PermissionContext> for MyPermissions<'a> {
    fn from(ctx: &'a PermissionContext) -> Self {
        Self {
            employee_id: ctx.employee_id(),
            position: ctx.position(),
            permissions: ctx.permissions(),
            data_scope: ctx.data_scope(),
            can_manage_subordinates: ctx.can_manage_subordinates(),
            allowed_modules: ctx.allowed_modules(),
            project_id: ctx.project_id(),
            org_department_id: ctx.org_department_id(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Items<T> {
    pub items: Vec<T>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use backoffice_authz::Action;
    use backoffice_core::TenantId;
    use serde_json::json;

    fn position() -> Position {
        Position {
            id: PositionId::new(),
            tenant_id: TenantId::new(),
            code: "GRP-HR".into(),
            name: "HR".into(),
            level: PositionLevel::Group,
            function_role: Some("hr".into()),
            data_scope: DataScope::Group,
            can_manage_subordinates: false,
            permissions: PermissionSet::new().grant("hr", "employee", [Action::VIEW]),
            allowed_modules: AllowedModules::from_entries(["hr.*"]),
        }
    }

    #[test]
    fn update_reports_only_real_changes() {
        let mut p = position();
        let req: UpdatePositionRequest = serde_json::from_value(json!({
            "name": "HR",
            "dataScope": "self",
            "permissions": { "hr": { "employee": ["view", "update"] } },
            "functionRole": ""
        }))
        .unwrap();

        let changed = req.apply(&mut p);

        assert_eq!(changed, vec!["dataScope", "permissions", "functionRole"]);
        assert_eq!(p.data_scope, DataScope::SelfOnly);
        assert!(p.function_role.is_none());
    }

    #[test]
    fn audit_query_rejects_unknown_vocabulary() {
        let q = AuditLogQuery {
            action: Some("truncate".into()),
            ..Default::default()
        };
        assert!(matches!(q.into_parts(), Err(ApiError::Validation(_))));

        let q = AuditLogQuery {
            entity: Some("position".into()),
            limit: Some(10_000),
            ..Default::default()
        };
        let (filter, page) = q.into_parts().unwrap();
        assert_eq!(filter.entity, Some(AuditEntity::Position));
        assert_eq!(page.limit, Pagination::MAX_LIMIT);
    }
}
