use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, RwLock};

use backoffice_core::TenantId;

/// Tenant-isolated key/value store for catalog and directory records.
///
/// A key is only ever looked up inside one tenant's partition; there is no
/// cross-tenant read path.
pub trait TenantStore<K, V>: Send + Sync {
    fn get(&self, tenant_id: TenantId, key: &K) -> Option<V>;
    fn upsert(&self, tenant_id: TenantId, key: K, value: V);
    fn list(&self, tenant_id: TenantId) -> Vec<V>;

    /// Records in the tenant matching `pred`.
    fn find(&self, tenant_id: TenantId, pred: &dyn Fn(&V) -> bool) -> Vec<V> {
        self.list(tenant_id).into_iter().filter(|v| pred(v)).collect()
    }
}

impl<K, V, S> TenantStore<K, V> for Arc<S>
where
    S: TenantStore<K, V> + ?Sized,
{
    fn get(&self, tenant_id: TenantId, key: &K) -> Option<V> {
        (**self).get(tenant_id, key)
    }

    fn upsert(&self, tenant_id: TenantId, key: K, value: V) {
        (**self).upsert(tenant_id, key, value)
    }

    fn list(&self, tenant_id: TenantId) -> Vec<V> {
        (**self).list(tenant_id)
    }

    fn find(&self, tenant_id: TenantId, pred: &dyn Fn(&V) -> bool) -> Vec<V> {
        (**self).find(tenant_id, pred)
    }
}

/// In-memory store partitioned per tenant. Used in tests/dev and as the
/// default directory backend.
#[derive(Debug)]
pub struct InMemoryTenantStore<K, V> {
    partitions: RwLock<HashMap<TenantId, HashMap<K, V>>>,
}

impl<K, V> InMemoryTenantStore<K, V> {
    pub fn new() -> Self {
        Self {
            partitions: RwLock::new(HashMap::new()),
        }
    }
}

impl<K, V> Default for InMemoryTenantStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> TenantStore<K, V> for InMemoryTenantStore<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn get(&self, tenant_id: TenantId, key: &K) -> Option<V> {
        let partitions = self.partitions.read().ok()?;
        partitions.get(&tenant_id)?.get(key).cloned()
    }

    fn upsert(&self, tenant_id: TenantId, key: K, value: V) {
        match self.partitions.write() {
            Ok(mut partitions) => {
                partitions.entry(tenant_id).or_default().insert(key, value);
            }
            Err(_) => tracing::error!(%tenant_id, "tenant store lock poisoned; upsert dropped"),
        }
    }

    fn list(&self, tenant_id: TenantId) -> Vec<V> {
        let Ok(partitions) = self.partitions.read() else {
            return vec![];
        };
        partitions
            .get(&tenant_id)
            .map(|p| p.values().cloned().collect())
            .unwrap_or_default()
    }

    fn find(&self, tenant_id: TenantId, pred: &dyn Fn(&V) -> bool) -> Vec<V> {
        let Ok(partitions) = self.partitions.read() else {
            return vec![];
        };
        partitions
            .get(&tenant_id)
            .map(|p| p.values().filter(|v| pred(v)).cloned().collect())
            .unwrap_or_default()
    }
}
