//! Infrastructure layer: tenant stores, context resolution and caching,
//! audit persistence.

pub mod audit_log;
pub mod cache;
pub mod catalog;
pub mod directory;
pub mod read_model;
pub mod recorder;
pub mod resolver;

pub use audit_log::{
    AuditFilter, AuditLog, AuditLogError, AuditPage, InMemoryAuditLog, Pagination,
    PostgresAuditLog,
};
pub use cache::{CachePolicy, CacheStats, ContextCache};
pub use catalog::{DemoTenant, default_positions, seed_demo_tenant};
pub use directory::Directory;
pub use recorder::{AuditEvent, AuditRecorder, DEFAULT_WRITE_TIMEOUT};
pub use resolver::{ContextResolver, ResolveContext};
