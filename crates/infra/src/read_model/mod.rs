//! Tenant-isolated record storage used by the resolver and the API.

pub mod tenant_store;

pub use tenant_store::{InMemoryTenantStore, TenantStore};
