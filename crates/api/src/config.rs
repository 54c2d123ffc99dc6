//! Process configuration read from the environment.
//!
//! Every setting has a development default; unparseable values fall back to it
//! with a warning rather than aborting startup.

use std::net::SocketAddr;
use std::time::Duration;

use backoffice_core::TenantId;
use backoffice_infra::{CachePolicy, DEFAULT_WRITE_TIMEOUT};

const DEFAULT_FRESH_SECS: i64 = 300;
const DEFAULT_EVICT_SECS: i64 = 600;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub cache_policy: CachePolicy,
    pub audit_write_timeout: Duration,
    /// Enables the Postgres audit log when set.
    pub database_url: Option<String>,
    /// Tenant to seed with the default catalog and demo employees.
    pub seed_demo_tenant: Option<TenantId>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            jwt_secret: "dev-secret".to_string(),
            cache_policy: CachePolicy::default(),
            audit_write_timeout: DEFAULT_WRITE_TIMEOUT,
            database_url: None,
            seed_demo_tenant: None,
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the environment in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let bind_addr = parse_or("BIND_ADDR", lookup("BIND_ADDR"), defaults.bind_addr);

        let jwt_secret = lookup("JWT_SECRET").filter(|s| !s.is_empty()).unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            defaults.jwt_secret.clone()
        });

        let fresh = parse_or(
            "CONTEXT_CACHE_FRESH_SECS",
            lookup("CONTEXT_CACHE_FRESH_SECS"),
            DEFAULT_FRESH_SECS,
        );
        let evict = parse_or(
            "CONTEXT_CACHE_EVICT_SECS",
            lookup("CONTEXT_CACHE_EVICT_SECS"),
            DEFAULT_EVICT_SECS,
        );
        if evict < fresh {
            tracing::warn!(fresh, evict, "cache eviction age below freshness window; clamping");
        }
        let cache_policy = CachePolicy::new(
            seconds_or("CONTEXT_CACHE_FRESH_SECS", fresh, DEFAULT_FRESH_SECS),
            seconds_or("CONTEXT_CACHE_EVICT_SECS", evict, DEFAULT_EVICT_SECS),
        );

        let timeout_ms = parse_or(
            "AUDIT_WRITE_TIMEOUT_MS",
            lookup("AUDIT_WRITE_TIMEOUT_MS"),
            DEFAULT_WRITE_TIMEOUT.as_millis() as u64,
        );

        let database_url = lookup("DATABASE_URL").filter(|s| !s.trim().is_empty());

        let seed_demo_tenant = lookup("SEED_DEMO_TENANT").and_then(|raw| match raw.trim() {
            "" => None,
            "new" => Some(TenantId::new()),
            other => match other.parse() {
                Ok(id) => Some(id),
                Err(err) => {
                    tracing::warn!(value = other, error = %err, "ignoring invalid SEED_DEMO_TENANT");
                    None
                }
            },
        });

        Self {
            bind_addr,
            jwt_secret,
            cache_policy,
            audit_write_timeout: Duration::from_millis(timeout_ms),
            database_url,
            seed_demo_tenant,
        }
    }
}

/// Non-negative seconds as a `chrono::Duration`; values chrono cannot
/// represent fall back to `default_secs`.
fn seconds_or(key: &str, secs: i64, default_secs: i64) -> chrono::Duration {
    chrono::Duration::try_seconds(secs.max(0)).unwrap_or_else(|| {
        tracing::warn!(
            key,
            value = secs,
            default = default_secs,
            "duration out of range; using default"
        );
        chrono::Duration::seconds(default_secs)
    })
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> T
where
    T: std::str::FromStr + Copy + std::fmt::Display,
{
    let Some(raw) = raw else {
        return default;
    };
    match raw.trim().parse() {
        Ok(v) => v,
        Err(_) => {
            tracing::warn!(key, value = %raw, %default, "invalid value; using default");
            default
        }
    }
}
