//! `backoffice-core`: domain foundation building blocks.
//!
//! Identifiers and error types shared by every other crate. No infrastructure
//! concerns live here.

pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{EmployeeId, OrgDepartmentId, PositionId, ProjectId, TenantId};
pub use value_object::ValueObject;
