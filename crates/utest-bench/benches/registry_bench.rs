//! Binding and filtering benchmarks.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use utest::{NameFilter, Registry, SuiteBuilder};

fn ten_proofs(suite: &mut SuiteBuilder<'_>) {
    for i in 0..10 {
        suite.ensure(&format!("proof {i}"), |_| Ok(()));
    }
}

fn bench_bind(c: &mut Criterion) {
    let mut group = c.benchmark_group("bind");

    for suites in [1_usize, 10, 100] {
        group.bench_with_input(BenchmarkId::new("suites_x10_proofs", suites), &suites, |b, &n| {
            b.iter(|| {
                let registry = Registry::new();
                for i in 0..n {
                    registry
                        .register_suite(&format!("Suite{i}"), ten_proofs)
                        .expect("register");
                }
                criterion::black_box(registry.bind().expect("bind"))
            });
        });
    }
    group.finish();
}

fn bench_name_filter(c: &mut Criterion) {
    let filter = NameFilter::new("Net(work)?").expect("valid pattern");
    let names: Vec<String> = (0..100).map(|i| format!("Suite{i}Network")).collect();

    c.bench_function("name_filter_100", |b| {
        b.iter(|| names.iter().filter(|name| filter.matches(name)).count());
    });
}

criterion_group!(benches, bench_bind, bench_name_filter);
criterion_main!(benches);
