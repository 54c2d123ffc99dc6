//! Requirements guarding the operations this repository exposes itself.
//!
//! Business modules outside the engine declare their own requirements the
//! same way.

use crate::authorize::Requirement;

pub const EMPLOYEE_VIEW: Requirement = Requirement::new("hr", "employee", "view");
pub const EMPLOYEE_CREATE: Requirement = Requirement::new("hr", "employee", "create");
pub const EMPLOYEE_UPDATE: Requirement = Requirement::new("hr", "employee", "update");

pub const POSITION_VIEW: Requirement = Requirement::new("system", "position", "view");
pub const POSITION_CREATE: Requirement = Requirement::new("system", "position", "create");
pub const POSITION_UPDATE: Requirement = Requirement::new("system", "position", "update");

pub const AUDIT_LOG_VIEW: Requirement = Requirement::new("system", "audit_log", "view");
