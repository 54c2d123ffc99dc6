use axum::{routing::get, Router};

pub mod admin;
pub mod audit_logs;
pub mod common;
pub mod employees;
pub mod me;
pub mod positions;
pub mod system;

/// Router for all authenticated (tenant-scoped) endpoints, mounted at `/api/v2`.
pub fn router() -> Router {
    Router::new()
        .route("/my/permissions", get(me::my_permissions))
        .nest("/employees", employees::router())
        .nest("/positions", positions::router())
        .nest("/audit-logs", audit_logs::router())
        .nest("/admin", admin::router())
}
