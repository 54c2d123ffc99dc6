//! `backoffice-authz`: authorization context resolution and enforcement.
//!
//! Pure engine: turns a position assignment into an immutable
//! [`PermissionContext`] and answers permission, module-allowance and
//! data-scope questions against it. This crate is intentionally decoupled from
//! HTTP and storage; loading, caching and audit persistence live in
//! `backoffice-infra`.

pub mod audit;
pub mod authorize;
pub mod claims;
pub mod context;
pub mod employee;
pub mod grants;
pub mod modules;
pub mod permissions;
pub mod position;
pub mod scope;

pub use audit::{
    AuditAction, AuditActor, AuditEntity, AuditEntry, AuditOutcome, NewAuditEntry, RequestMeta,
};
pub use authorize::{
    AuthzError, Requirement, can_confer, has_permission, is_module_allowed, require,
};
pub use claims::{Hs256JwtValidator, JwtClaims, JwtValidator, TokenValidationError, validate_claims};
pub use context::{PermissionContext, PositionRef, resolve_context};
pub use employee::{Employee, OrgDepartment, OrgPath};
pub use modules::{AllowedModules, ModulePattern};
pub use permissions::{Action, ModuleName, PermissionSet, SubModuleName};
pub use position::{DataScope, Position, PositionLevel};
pub use scope::{QueryPredicate, RecordOwner, scope_to_filter};
