use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use backoffice_authz::{grants, has_permission, is_module_allowed, require, scope_to_filter};
use backoffice_core::TenantId;
use backoffice_infra::catalog::{HQ_ADMIN, HR_LEAD, STAFF};
use backoffice_infra::{CachePolicy, ContextCache, ContextResolver, Directory, seed_demo_tenant};

fn bench_enforcement(c: &mut Criterion) {
    let directory = Directory::in_memory();
    let tenant_id = TenantId::new();
    let demo = seed_demo_tenant(&directory, tenant_id);
    let cache = ContextCache::new(ContextResolver::new(directory.clone()), CachePolicy::default());

    let mut group = c.benchmark_group("enforcement");
    for code in [HQ_ADMIN, HR_LEAD, STAFF] {
        let employee = demo.employee_holding(code).map(|e| e.id).unwrap_or_default();
        let ctx = cache.get(tenant_id, employee);

        group.bench_with_input(BenchmarkId::new("has_permission", code), &ctx, |b, ctx| {
            b.iter(|| has_permission(ctx, black_box("hr"), Some("employee"), Some("update")))
        });
        group.bench_with_input(BenchmarkId::new("is_module_allowed", code), &ctx, |b, ctx| {
            b.iter(|| is_module_allowed(ctx, black_box("hr.employee.records")))
        });
        group.bench_with_input(BenchmarkId::new("require", code), &ctx, |b, ctx| {
            b.iter(|| require(ctx, black_box(&grants::EMPLOYEE_UPDATE)).is_ok())
        });
        group.bench_with_input(BenchmarkId::new("scope_to_filter", code), &ctx, |b, ctx| {
            b.iter(|| scope_to_filter(ctx, None))
        });
    }
    group.finish();
}

fn bench_context_cache(c: &mut Criterion) {
    let directory = Directory::in_memory();
    let tenant_id = TenantId::new();
    let demo = seed_demo_tenant(&directory, tenant_id);
    let employee = demo.employees[0].id;
    let resolver = ContextResolver::new(directory.clone());
    let cache = ContextCache::new(resolver, CachePolicy::default());

    let mut group = c.benchmark_group("context_cache");
    group.sample_size(1000);

    group.bench_function("hit", |b| {
        cache.get(tenant_id, employee);
        b.iter(|| cache.get(black_box(tenant_id), black_box(employee)))
    });

    group.bench_function("miss_after_invalidate", |b| {
        b.iter(|| {
            cache.invalidate(tenant_id, employee);
            cache.get(black_box(tenant_id), black_box(employee))
        })
    });

    group.finish();
}

criterion_group!(benches, bench_enforcement, bench_context_cache);
criterion_main!(benches);
