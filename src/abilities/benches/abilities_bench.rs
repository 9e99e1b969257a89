use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use cretoai_abilities::{AuthzEngine, Authority, InMemoryStore, Record, Target};
use std::sync::Arc;

/// Engine with `grants` type-level abilities on the principal plus one role
fn seeded_engine(grants: usize, cached: bool) -> (AuthzEngine, Authority) {
    let builder = AuthzEngine::builder(Arc::new(InMemoryStore::new()));
    let engine = if cached { builder.build() } else { builder.dont_cache().build() };
    let user = Authority::new("user", 1);

    for i in 0..grants {
        engine
            .allow(&user)
            .to(format!("action-{}", i), Target::of_type("post"))
            .expect("grant");
    }
    engine.forbid(&user).to("action-0", Target::from(Record::new("post", 1))).expect("forbid");

    engine.define_role("admin", Some(2)).expect("role");
    engine.define_role("editor", Some(1)).expect("role");
    engine.allow("editor").to("publish", None).expect("grant");
    engine.assign("admin").to(&user).expect("assign");

    (engine, user)
}

fn check_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("check");
    let target = Target::from(Record::new("post", 2));

    for grants in [10, 100, 1000] {
        let (cold, user) = seeded_engine(grants, false);
        group.bench_with_input(BenchmarkId::new("uncached", grants), &grants, |b, _| {
            b.iter(|| black_box(cold.can(&user, "action-5", Some(&target)).unwrap()))
        });

        let (warm, user) = seeded_engine(grants, true);
        warm.can(&user, "action-5", Some(&target)).unwrap();
        group.bench_with_input(BenchmarkId::new("cached", grants), &grants, |b, _| {
            b.iter(|| black_box(warm.can(&user, "action-5", Some(&target)).unwrap()))
        });
    }

    group.finish();
}

fn refresh_benchmark(c: &mut Criterion) {
    let (engine, user) = seeded_engine(100, true);
    let target = Target::from(Record::new("post", 2));

    c.bench_function("refresh_then_check", |b| {
        b.iter(|| {
            engine.refresh_for(&user).unwrap();
            black_box(engine.can(&user, "publish", Some(&target)).unwrap())
        })
    });
}

fn role_inheritance_benchmark(c: &mut Criterion) {
    let (engine, user) = seeded_engine(10, false);

    c.bench_function("inherited_simple_ability", |b| {
        b.iter(|| black_box(engine.can(&user, "publish", None).unwrap()))
    });
}

criterion_group!(
    benches,
    check_benchmark,
    refresh_benchmark,
    role_inheritance_benchmark
);
criterion_main!(benches);
