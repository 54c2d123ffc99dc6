//! Data-scope → query predicate translation.
//!
//! Data-access collaborators either translate a [`QueryPredicate`] into their
//! own query language or evaluate it in memory with [`QueryPredicate::matches`].

use serde::Serialize;

use backoffice_core::{EmployeeId, OrgDepartmentId, ProjectId};

use crate::context::PermissionContext;
use crate::employee::OrgPath;
use crate::position::DataScope;

/// Row-visibility restriction derived from a context's data scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum QueryPredicate {
    /// Every record is visible.
    Unrestricted,
    /// Records owned by this project.
    Project(ProjectId),
    /// Records owned by exactly this org department.
    OrgDepartment(OrgDepartmentId),
    /// Records owned by this department or any department below it.
    OrgSubtree(OrgPath),
    /// Records explicitly owned by this employee.
    Owner(EmployeeId),
    /// No record is visible.
    Nothing,
}

/// Ownership columns of a business record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordOwner {
    pub owner_id: Option<EmployeeId>,
    pub project_id: Option<ProjectId>,
    pub org_department_id: Option<OrgDepartmentId>,
    pub org_path: Option<OrgPath>,
}

impl QueryPredicate {
    pub fn matches(&self, record: &RecordOwner) -> bool {
        match self {
            Self::Unrestricted => true,
            Self::Project(p) => record.project_id == Some(*p),
            Self::OrgDepartment(d) => record.org_department_id == Some(*d),
            Self::OrgSubtree(root) => match &record.org_path {
                Some(path) => path.is_within(root),
                None => record.org_department_id.is_some() && record.org_department_id == root.leaf(),
            },
            Self::Owner(e) => record.owner_id == Some(*e),
            Self::Nothing => false,
        }
    }

    /// Keep the records this predicate admits.
    pub fn filter<T, F>(&self, records: Vec<T>, owner_of: F) -> Vec<T>
    where
        F: Fn(&T) -> RecordOwner,
    {
        if *self == Self::Unrestricted {
            return records;
        }
        records.into_iter().filter(|r| self.matches(&owner_of(r))).collect()
    }
}

/// Translate `ctx`'s data scope into a predicate.
///
/// `subject_org_path` is the org path of `ctx.org_department_id()`; it is only
/// consulted for `group` scope with subordinate management. Missing placement
/// data always narrows, never widens.
pub fn scope_to_filter(ctx: &PermissionContext, subject_org_path: Option<&OrgPath>) -> QueryPredicate {
    match ctx.data_scope() {
        DataScope::All => QueryPredicate::Unrestricted,
        DataScope::Project => match ctx.project_id() {
            Some(p) => QueryPredicate::Project(p),
            None => QueryPredicate::Nothing,
        },
        DataScope::Group => {
            let Some(dept) = ctx.org_department_id() else {
                return QueryPredicate::Nothing;
            };
            if !ctx.can_manage_subordinates() {
                return QueryPredicate::OrgDepartment(dept);
            }
            match subject_org_path {
                Some(path) if path.leaf() == Some(dept) => QueryPredicate::OrgSubtree(path.clone()),
                _ => {
                    tracing::warn!(
                        employee_id = %ctx.employee_id(),
                        org_department_id = %dept,
                        "org path unavailable for subordinate scope; narrowing to own department"
                    );
                    QueryPredicate::OrgDepartment(dept)
                }
            }
        }
        // subordinate management never widens self scope
        DataScope::SelfOnly => QueryPredicate::Owner(ctx.employee_id()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::employee::Employee;
    use crate::modules::AllowedModules;
    use crate::permissions::PermissionSet;
    use crate::position::{Position, PositionLevel};
    use crate::resolve_context;
    use backoffice_core::{PositionId, TenantId};
    use proptest::prelude::*;

    struct Placement {
        project: Option<ProjectId>,
        dept: Option<OrgDepartmentId>,
    }

    fn ctx(scope: DataScope, manage: bool, placement: &Placement) -> PermissionContext {
        let tenant_id = TenantId::new();
        let position = Position {
            id: PositionId::new(),
            tenant_id,
            code: "P".into(),
            name: "P".into(),
            level: PositionLevel::Group,
            function_role: None,
            data_scope: scope,
            can_manage_subordinates: manage,
            permissions: PermissionSet::new(),
            allowed_modules: AllowedModules::default(),
        };
        let employee = Employee {
            id: EmployeeId::new(),
            tenant_id,
            name: "E".into(),
            email: "e@example.com".into(),
            position_id: Some(position.id),
            project_id: placement.project,
            org_department_id: placement.dept,
        };
        resolve_context(tenant_id, employee.id, Some(&employee), Some(&position))
    }

    fn placed() -> Placement {
        Placement {
            project: Some(ProjectId::new()),
            dept: Some(OrgDepartmentId::new()),
        }
    }

    #[test]
    fn all_scope_is_unrestricted() {
        let c = ctx(DataScope::All, false, &placed());
        assert_eq!(scope_to_filter(&c, None), QueryPredicate::Unrestricted);
    }

    #[test]
    fn project_scope_restricts_to_project() {
        let p = placed();
        let c = ctx(DataScope::Project, false, &p);
        let pred = scope_to_filter(&c, None);
        assert_eq!(pred, QueryPredicate::Project(p.project.unwrap()));

        assert!(pred.matches(&RecordOwner {
            project_id: p.project,
            ..Default::default()
        }));
        assert!(!pred.matches(&RecordOwner {
            project_id: Some(ProjectId::new()),
            ..Default::default()
        }));
    }

    #[test]
    fn project_scope_without_project_sees_nothing() {
        let c = ctx(DataScope::Project, false, &Placement { project: None, dept: None });
        assert_eq!(scope_to_filter(&c, None), QueryPredicate::Nothing);
    }

    #[test]
    fn group_scope_without_subordinates_is_own_department() {
        let p = placed();
        let c = ctx(DataScope::Group, false, &p);
        let root = OrgDepartmentId::new();
        let path = OrgPath::new(vec![root, p.dept.unwrap()]);
        assert_eq!(
            scope_to_filter(&c, Some(&path)),
            QueryPredicate::OrgDepartment(p.dept.unwrap())
        );
    }

    #[test]
    fn group_scope_with_subordinates_covers_subtree() {
        let p = placed();
        let dept = p.dept.unwrap();
        let c = ctx(DataScope::Group, true, &p);
        let root = OrgDepartmentId::new();
        let child = OrgDepartmentId::new();
        let sibling = OrgDepartmentId::new();
        let path = OrgPath::new(vec![root, dept]);

        let pred = scope_to_filter(&c, Some(&path));

        assert!(pred.matches(&RecordOwner {
            org_department_id: Some(child),
            org_path: Some(OrgPath::new(vec![root, dept, child])),
            ..Default::default()
        }));
        assert!(pred.matches(&RecordOwner {
            org_department_id: Some(dept),
            ..Default::default()
        }));
        assert!(!pred.matches(&RecordOwner {
            org_department_id: Some(sibling),
            org_path: Some(OrgPath::new(vec![root, sibling])),
            ..Default::default()
        }));
    }

    #[test]
    fn group_scope_with_mismatched_path_narrows() {
        let p = placed();
        let c = ctx(DataScope::Group, true, &p);
        let unrelated = OrgPath::new(vec![OrgDepartmentId::new()]);
        assert_eq!(
            scope_to_filter(&c, Some(&unrelated)),
            QueryPredicate::OrgDepartment(p.dept.unwrap())
        );
        assert_eq!(
            scope_to_filter(&c, None),
            QueryPredicate::OrgDepartment(p.dept.unwrap())
        );
    }

    #[test]
    fn filter_keeps_matching_records() {
        let me = EmployeeId::new();
        let pred = QueryPredicate::Owner(me);
        let records = vec![(me, "mine"), (EmployeeId::new(), "theirs")];
        let kept = pred.filter(records, |(owner, _)| RecordOwner {
            owner_id: Some(*owner),
            ..Default::default()
        });
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].1, "mine");
    }

    proptest! {
        #[test]
        fn self_scope_ignores_subordinate_flag(manage in any::<bool>(), with_path in any::<bool>()) {
            let p = placed();
            let c = ctx(DataScope::SelfOnly, manage, &p);
            let path = OrgPath::new(vec![p.dept.unwrap()]);
            let pred = scope_to_filter(&c, with_path.then_some(&path));

            prop_assert_eq!(&pred, &QueryPredicate::Owner(c.employee_id()));
            let other = RecordOwner {
                owner_id: Some(EmployeeId::new()),
                project_id: p.project,
                org_department_id: p.dept,
                org_path: Some(path.clone()),
            };
            prop_assert!(!pred.matches(&other));
        }
    }
}
