//! Enforcement functions over a resolved [`PermissionContext`].
//!
//! - No IO
//! - No panics
//! - No mutation of the context

use thiserror::Error;

use crate::context::PermissionContext;
use crate::modules::ModulePattern;
use crate::position::{DataScope, Position};

/// Authorization outcome surfaced to callers.
///
/// Messages are deliberately generic: they must not describe the shape of
/// the permission catalog.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("tenant mismatch")]
    TenantMismatch,

    #[error("forbidden")]
    Forbidden,
}

/// Hierarchical grant check.
///
/// Each missing level is an immediate denial; a parent grant never implies a
/// child one. With `sub_module` omitted only module presence is tested; with
/// `action` omitted the sub-module must carry at least one action.
pub fn has_permission(
    ctx: &PermissionContext,
    module: &str,
    sub_module: Option<&str>,
    action: Option<&str>,
) -> bool {
    let Some(subs) = ctx.permissions().module(module) else {
        return false;
    };
    let Some(sub_module) = sub_module else {
        return true;
    };
    let Some(actions) = subs.get(sub_module) else {
        return false;
    };
    if actions.is_empty() {
        return false;
    }
    match action {
        None => true,
        Some(action) => actions.contains(action),
    }
}

/// Coarse module gate.
///
/// Headquarters-wide positions (`dataScope = all`) bypass `allowedModules`.
pub fn is_module_allowed(ctx: &PermissionContext, module: &str) -> bool {
    if ctx.data_scope() == DataScope::All {
        return true;
    }
    ctx.allowed_modules().allows(module)
}

/// A `module.sub_module.action` triple guarding one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Requirement {
    pub module: &'static str,
    pub sub_module: &'static str,
    pub action: &'static str,
}

impl Requirement {
    pub const fn new(module: &'static str, sub_module: &'static str, action: &'static str) -> Self {
        Self {
            module,
            sub_module,
            action,
        }
    }

    /// Path checked against `allowedModules` (`"hr.employee"`).
    pub fn module_path(&self) -> String {
        format!("{}.{}", self.module, self.sub_module)
    }
}

impl core::fmt::Display for Requirement {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{}.{}", self.module, self.sub_module, self.action)
    }
}

/// Module gate AND action grant, as a `Result` for use at operation boundaries.
pub fn require(ctx: &PermissionContext, requirement: &Requirement) -> Result<(), AuthzError> {
    let module_ok = is_module_allowed(ctx, &requirement.module_path());
    let action_ok = has_permission(
        ctx,
        requirement.module,
        Some(requirement.sub_module),
        Some(requirement.action),
    );

    if module_ok && action_ok {
        Ok(())
    } else {
        tracing::debug!(
            employee_id = %ctx.employee_id(),
            requirement = %requirement,
            module_ok,
            action_ok,
            "authorization denied"
        );
        Err(AuthzError::Forbidden)
    }
}

/// Whether the holder of `ctx` may place someone in `position`.
///
/// Nobody confers more than they hold: the position's data scope, grants,
/// module reach and subordinate management must all lie within the caller's.
pub fn can_confer(ctx: &PermissionContext, position: &Position) -> bool {
    if ctx.is_deny_all() || position.tenant_id != ctx.tenant_id() {
        return false;
    }

    let scope_ok = ctx.data_scope().is_at_least(position.data_scope);
    let grants_ok = position.permissions.is_subset_of(ctx.permissions());
    let modules_ok = position.allowed_modules.patterns().iter().all(|pattern| match pattern {
        ModulePattern::Any => {
            ctx.data_scope() == DataScope::All || ctx.allowed_modules().contains_any()
        }
        ModulePattern::Prefix(path) | ModulePattern::Exact(path) => is_module_allowed(ctx, path),
    });
    let manage_ok = !position.can_manage_subordinates
        || ctx.can_manage_subordinates()
        || ctx.data_scope().breadth() > position.data_scope.breadth();

    let allowed = scope_ok && grants_ok && modules_ok && manage_ok;
    if !allowed {
        tracing::debug!(
            employee_id = %ctx.employee_id(),
            position = %position.code,
            scope_ok,
            grants_ok,
            modules_ok,
            manage_ok,
            "position exceeds caller's own authority"
        );
    }
    allowed
}
