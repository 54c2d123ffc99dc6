//! Short-TTL cache of resolved permission contexts.
//!
//! Entries are immutable `Arc<PermissionContext>` snapshots, so concurrent
//! readers never observe a partially built value; a race between two misses
//! costs one redundant resolution. Staleness is bounded by
//! [`CachePolicy::fresh_for`] unless a mutation path calls one of the
//! `invalidate*` methods, which take effect immediately.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};

use backoffice_authz::PermissionContext;
use backoffice_core::{EmployeeId, TenantId, ValueObject};

use crate::resolver::ResolveContext;

/// Freshness window and hard eviction age.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub fresh_for: Duration,
    pub evict_after: Duration,
}

impl CachePolicy {
    /// `evict_after` is clamped to be at least `fresh_for`.
    pub fn new(fresh_for: Duration, evict_after: Duration) -> Self {
        Self {
            fresh_for,
            evict_after: evict_after.max(fresh_for),
        }
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::new(Duration::minutes(5), Duration::minutes(10))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

type Key = (TenantId, EmployeeId);

struct Entry {
    context: Arc<PermissionContext>,
    resolved_at: DateTime<Utc>,
}

impl Entry {
    /// An entry stamped after `now` (the clock stepped back) is never younger
    /// than `limit`.
    fn younger_than(&self, now: DateTime<Utc>, limit: Duration) -> bool {
        now >= self.resolved_at && now - self.resolved_at < limit
    }
}

#[derive(Default)]
struct Inner {
    entries: HashMap<Key, Entry>,
    /// Bumped on every invalidation; a resolution that started under an older
    /// generation is returned to its caller but not stored.
    generation: u64,
}

pub struct ContextCache<R> {
    resolver: R,
    policy: CachePolicy,
    inner: RwLock<Inner>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<R: ResolveContext> ContextCache<R> {
    pub fn new(resolver: R, policy: CachePolicy) -> Self {
        Self {
            resolver,
            policy,
            inner: RwLock::new(Inner::default()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    /// Cached context if fresh, otherwise a newly resolved (and stored) one.
    pub fn get(&self, tenant_id: TenantId, employee_id: EmployeeId) -> Arc<PermissionContext> {
        self.get_at(tenant_id, employee_id, Utc::now())
    }

    pub fn get_at(
        &self,
        tenant_id: TenantId,
        employee_id: EmployeeId,
        now: DateTime<Utc>,
    ) -> Arc<PermissionContext> {
        let key = (tenant_id, employee_id);

        let (generation, previous) = match self.inner.read() {
            Ok(inner) => match inner.entries.get(&key) {
                Some(entry) if entry.younger_than(now, self.policy.fresh_for) => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Arc::clone(&entry.context);
                }
                Some(entry) => (inner.generation, Some(Arc::clone(&entry.context))),
                None => (inner.generation, None),
            },
            Err(_) => {
                tracing::error!("context cache lock poisoned; resolving uncached");
                return Arc::new(self.resolver.resolve(tenant_id, employee_id));
            }
        };

        self.misses.fetch_add(1, Ordering::Relaxed);
        let resolved = self.resolver.resolve(tenant_id, employee_id);

        let context = reuse_if_unchanged(previous, resolved);

        if let Ok(mut inner) = self.inner.write() {
            if inner.generation == generation {
                inner.entries.insert(
                    key,
                    Entry {
                        context: Arc::clone(&context),
                        resolved_at: now,
                    },
                );
            } else {
                tracing::debug!(%tenant_id, %employee_id, "invalidated during resolution; not caching");
            }
            let evict_after = self.policy.evict_after;
            inner.entries.retain(|_, e| e.younger_than(now, evict_after));
        }

        context
    }

    /// Drop one employee's cached context.
    ///
    /// Must be called synchronously by any mutation of that employee's
    /// position assignment or placement.
    pub fn invalidate(&self, tenant_id: TenantId, employee_id: EmployeeId) {
        self.mutate(|inner| {
            inner.entries.remove(&(tenant_id, employee_id));
        });
        tracing::debug!(%tenant_id, %employee_id, "permission context invalidated");
    }

    /// Drop every cached context of one tenant.
    pub fn invalidate_tenant(&self, tenant_id: TenantId) {
        self.mutate(|inner| inner.entries.retain(|(t, _), _| *t != tenant_id));
        tracing::info!(%tenant_id, "permission contexts invalidated for tenant");
    }

    /// Drop everything (broad catalog change).
    pub fn invalidate_all(&self) {
        self.mutate(|inner| inner.entries.clear());
        tracing::info!("all permission contexts invalidated");
    }

    /// Remove entries past the hard eviction age; returns how many were removed.
    pub fn purge_expired_at(&self, now: DateTime<Utc>) -> usize {
        let evict_after = self.policy.evict_after;
        let Ok(mut inner) = self.inner.write() else {
            return 0;
        };
        let before = inner.entries.len();
        inner.entries.retain(|_, e| e.younger_than(now, evict_after));
        before - inner.entries.len()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.inner.read().map(|i| i.entries.len()).unwrap_or(0),
        }
    }

    fn mutate(&self, f: impl FnOnce(&mut Inner)) {
        let mut inner = match self.inner.write() {
            Ok(inner) => inner,
            // Invalidation must not be lost: recover the guard and clear.
            Err(poisoned) => {
                let mut inner = poisoned.into_inner();
                inner.entries.clear();
                inner
            }
        };
        inner.generation = inner.generation.wrapping_add(1);
        f(&mut inner);
    }
}

/// Unchanged stale entries keep their identity.
fn reuse_if_unchanged<T: ValueObject>(previous: Option<Arc<T>>, resolved: T) -> Arc<T> {
    match previous {
        Some(prev) if *prev == resolved => prev,
        _ => Arc::new(resolved),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use backoffice_authz::{
        Action, AllowedModules, DataScope, Employee, PermissionSet, Position, PositionLevel,
        has_permission,
    };
    use backoffice_core::PositionId;

    use crate::directory::Directory;
    use crate::resolver::ContextResolver;

    struct Fixture {
        dir: Directory,
        tenant: TenantId,
        employee: Employee,
        position: Position,
    }

    fn fixture() -> Fixture {
        let dir = Directory::in_memory();
        let tenant = TenantId::new();
        let position = Position {
            id: PositionId::new(),
            tenant_id: tenant,
            code: "GRP-LEAD".into(),
            name: "Group lead".into(),
            level: PositionLevel::Group,
            function_role: None,
            data_scope: DataScope::Group,
            can_manage_subordinates: true,
            permissions: PermissionSet::new().grant("hr", "leave", [Action::APPROVE]),
            allowed_modules: AllowedModules::from_entries(["hr.*"]),
        };
        let employee = Employee {
            id: EmployeeId::new(),
            tenant_id: tenant,
            name: "Wang Fang".into(),
            email: "wang.fang@example.com".into(),
            position_id: Some(position.id),
            project_id: None,
            org_department_id: None,
        };
        dir.put_position(position.clone());
        dir.put_employee(employee.clone());
        Fixture {
            dir,
            tenant,
            employee,
            position,
        }
    }

    fn cache(f: &Fixture) -> ContextCache<ContextResolver> {
        ContextCache::new(ContextResolver::new(f.dir.clone()), CachePolicy::default())
    }

    #[test]
    fn repeated_get_within_ttl_returns_same_snapshot() {
        let f = fixture();
        let cache = cache(&f);
        let now = Utc::now();

        let a = cache.get_at(f.tenant, f.employee.id, now);
        let b = cache.get_at(f.tenant, f.employee.id, now + Duration::minutes(4));

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn stale_entry_is_re_resolved() {
        let f = fixture();
        let cache = cache(&f);
        let now = Utc::now();
        let before = cache.get_at(f.tenant, f.employee.id, now);

        let mut revoked = f.position.clone();
        revoked.permissions = PermissionSet::new();
        f.dir.put_position(revoked);

        // still inside the freshness window: bounded staleness
        let cached = cache.get_at(f.tenant, f.employee.id, now + Duration::minutes(1));
        assert!(Arc::ptr_eq(&before, &cached));

        let after = cache.get_at(f.tenant, f.employee.id, now + Duration::minutes(6));
        assert!(!has_permission(&after, "hr", Some("leave"), Some("approve")));
    }

    #[test]
    fn clock_stepping_back_forces_re_resolution() {
        let f = fixture();
        let cache = cache(&f);
        let now = Utc::now();
        cache.get_at(f.tenant, f.employee.id, now);

        let mut revoked = f.position.clone();
        revoked.permissions = PermissionSet::new();
        f.dir.put_position(revoked);

        let after = cache.get_at(f.tenant, f.employee.id, now - Duration::minutes(30));
        assert!(!has_permission(&after, "hr", Some("leave"), Some("approve")));
        assert_eq!(cache.stats().misses, 2);
        assert_eq!(cache.purge_expired_at(now - Duration::minutes(31)), 1);
    }

    #[test]
    fn unchanged_stale_entry_keeps_identity() {
        let f = fixture();
        let cache = cache(&f);
        let now = Utc::now();
        let a = cache.get_at(f.tenant, f.employee.id, now);
        let b = cache.get_at(f.tenant, f.employee.id, now + Duration::minutes(6));
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.stats().misses, 2);
    }

    #[test]
    fn invalidate_takes_effect_immediately() {
        let f = fixture();
        let cache = cache(&f);
        let now = Utc::now();
        cache.get_at(f.tenant, f.employee.id, now);

        let mut unassigned = f.employee.clone();
        unassigned.position_id = None;
        f.dir.put_employee(unassigned);
        cache.invalidate(f.tenant, f.employee.id);

        assert!(cache.get_at(f.tenant, f.employee.id, now).is_deny_all());
    }

    #[test]
    fn invalidate_tenant_and_all() {
        let f = fixture();
        let cache = cache(&f);
        let other_tenant = TenantId::new();
        cache.get(f.tenant, f.employee.id);
        cache.get(other_tenant, EmployeeId::new());
        assert_eq!(cache.stats().entries, 2);

        cache.invalidate_tenant(f.tenant);
        assert_eq!(cache.stats().entries, 1);

        cache.invalidate_all();
        assert_eq!(cache.stats().entries, 0);
    }

    #[test]
    fn hard_eviction_sweeps_old_entries() {
        let f = fixture();
        let cache = cache(&f);
        let now = Utc::now();
        cache.get_at(f.tenant, f.employee.id, now);
        cache.get_at(f.tenant, EmployeeId::new(), now + Duration::minutes(3));

        assert_eq!(cache.purge_expired_at(now + Duration::minutes(11)), 1);
        assert_eq!(cache.stats().entries, 1);

        // writes sweep as well
        cache.get_at(f.tenant, EmployeeId::new(), now + Duration::minutes(14));
        assert_eq!(cache.stats().entries, 1);
    }

    #[test]
    fn policy_clamps_eviction_to_freshness() {
        let p = CachePolicy::new(Duration::minutes(5), Duration::minutes(1));
        assert_eq!(p.evict_after, Duration::minutes(5));
    }

    /// Resolver that invalidates the cache mid-resolution, simulating a
    /// concurrent position edit.
    struct Racing {
        cache: Mutex<Option<Arc<ContextCache<Arc<Racing>>>>>,
        tenant: TenantId,
    }

    impl ResolveContext for Racing {
        fn resolve(&self, tenant_id: TenantId, employee_id: EmployeeId) -> PermissionContext {
            if let Some(cache) = self.cache.lock().unwrap().take() {
                cache.invalidate(self.tenant, employee_id);
            }
            PermissionContext::deny_all(tenant_id, employee_id)
        }
    }

    #[test]
    fn resolution_racing_an_invalidation_is_not_cached() {
        let tenant = TenantId::new();
        let racing = Arc::new(Racing {
            cache: Mutex::new(None),
            tenant,
        });
        let cache = Arc::new(ContextCache::new(Arc::clone(&racing), CachePolicy::default()));
        *racing.cache.lock().unwrap() = Some(Arc::clone(&cache));

        let id = EmployeeId::new();
        cache.get(tenant, id);
        assert_eq!(cache.stats().entries, 0);

        cache.get(tenant, id);
        assert_eq!(cache.stats().entries, 1);
    }
}
