//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: directory, context cache and audit wiring
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use backoffice_infra::{Directory, InMemoryAuditLog, PostgresAuditLog};

use crate::config::ApiConfig;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use services::{AppServices, SharedAuditLog};

/// Build services from configuration (used by `main.rs`).
pub async fn build_services(config: &ApiConfig) -> anyhow::Result<Arc<AppServices>> {
    let audit_log: SharedAuditLog = match &config.database_url {
        Some(url) => {
            let log = PostgresAuditLog::connect(url).await?;
            tracing::info!("audit log backed by postgres");
            Arc::new(log)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; audit log is in-memory only");
            Arc::new(InMemoryAuditLog::new())
        }
    };

    let services = Arc::new(AppServices::new(
        Directory::in_memory(),
        config.cache_policy,
        audit_log,
        config.audit_write_timeout,
    ));

    if let Some(tenant_id) = config.seed_demo_tenant {
        let demo = services.seed_demo(tenant_id);
        tracing::info!(%tenant_id, employees = demo.employees.len(), "seeded demo tenant");
    }

    Ok(services)
}

/// Build the full HTTP router around already-wired services.
pub fn build_app(jwt_secret: &str, services: Arc<AppServices>) -> Router {
    let jwt = Arc::new(backoffice_authz::Hs256JwtValidator::new(jwt_secret.as_bytes()));
    let auth_state = middleware::AuthState { jwt };

    // Protected routes: require auth + tenant context.
    let protected = routes::router()
        .layer(Extension(services))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .nest("/api/v2", protected)
        .layer(ServiceBuilder::new())
}
