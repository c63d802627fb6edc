use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ctxdi::{Container, Scope, Token};
use std::sync::Arc;

// ===== Micro benchmarks =====

fn bench_singleton_hit(c: &mut Criterion) {
    let container = Container::new();
    let token = Token::for_type::<u64>("answer", Scope::Singleton);
    container.register_singleton(token.clone(), || Ok(42u64));
    let _ = container.get_token::<u64>(&token).unwrap();

    c.bench_function("singleton_hit_u64", |b| {
        b.iter(|| {
            let v = container.get_token::<u64>(&token).unwrap();
            black_box(v);
        })
    });
}

fn bench_singleton_cold(c: &mut Criterion) {
    struct ExpensiveToCreate {
        data: Vec<u64>,
    }

    c.bench_function("singleton_cold_expensive", |b| {
        b.iter_batched(
            || {
                let container = Container::new();
                let token = Token::for_type::<ExpensiveToCreate>("expensive", Scope::Singleton);
                container.register_singleton(token.clone(), || {
                    Ok(ExpensiveToCreate { data: (0..1000).collect() })
                });
                (container, token)
            },
            |(container, token)| {
                let v = container.get_token::<ExpensiveToCreate>(&token).unwrap();
                black_box(v.data.len());
            },
            criterion::BatchSize::SmallInput,
        )
    });
}

fn bench_request_vs_transient(c: &mut Criterion) {
    #[derive(Clone)]
    struct Service {
        data: [u8; 64],
    }

    let mut group = c.benchmark_group("request_vs_transient");

    let request_container = Container::new();
    let request_token = Token::for_type::<Service>("service", Scope::Request);
    request_container.register_request(request_token.clone(), || Ok(Service { data: [0; 64] }));

    group.bench_function("request_scope_hit", |b| {
        b.iter(|| {
            request_container
                .request_scope(|c| {
                    let v = c.get_token::<Service>(&request_token)?;
                    black_box(&v.data);
                    Ok(())
                })
                .unwrap();
        })
    });

    let transient_container = Container::new();
    let transient_token = Token::for_type::<Service>("service", Scope::Transient);
    transient_container
        .register_transient(transient_token.clone(), || Ok(Service { data: [0; 64] }));

    group.bench_function("transient", |b| {
        b.iter(|| {
            let v = transient_container.get_token::<Service>(&transient_token).unwrap();
            black_box(&v.data);
        })
    });

    group.finish();
}

fn bench_override_overhead(c: &mut Criterion) {
    let container = Container::new();
    let token = Token::for_type::<u64>("flag", Scope::Singleton);
    container.register_singleton(token.clone(), || Ok(0u64));

    let mut group = c.benchmark_group("override_overhead");

    group.bench_function("plain_singleton_hit", |b| {
        b.iter(|| {
            let v = container.get_token::<u64>(&token).unwrap();
            black_box(*v);
        })
    });

    group.bench_function("overridden_hit", |b| {
        b.iter(|| {
            container.use_overrides(ctxdi::Overrides::new().with(token.clone(), 99u64), |c| {
                let v = c.get_token::<u64>(&token).unwrap();
                black_box(*v);
            });
        })
    });

    group.finish();
}

fn bench_resolution_chain_depth(c: &mut Criterion) {
    struct Service1;
    struct Service2 {
        _s1: Arc<Service1>,
    }
    struct Service3 {
        _s2: Arc<Service2>,
    }
    struct Service4 {
        _s3: Arc<Service3>,
    }
    struct Service5 {
        _s4: Arc<Service4>,
    }
    struct Service6 {
        _s5: Arc<Service5>,
    }
    struct Service7 {
        _s6: Arc<Service6>,
    }
    struct Service8 {
        _s7: Arc<Service7>,
    }

    let container = Container::new();
    let t1 = Token::for_type::<Service1>("s1", Scope::Singleton);
    let t2 = Token::for_type::<Service2>("s2", Scope::Singleton);
    let t3 = Token::for_type::<Service3>("s3", Scope::Singleton);
    let t4 = Token::for_type::<Service4>("s4", Scope::Singleton);
    let t5 = Token::for_type::<Service5>("s5", Scope::Singleton);
    let t6 = Token::for_type::<Service6>("s6", Scope::Singleton);
    let t7 = Token::for_type::<Service7>("s7", Scope::Singleton);
    let t8 = Token::for_type::<Service8>("s8", Scope::Singleton);

    container.register_singleton(t1.clone(), || Ok(Service1));

    let c2 = container.clone();
    let p1 = t1.clone();
    container.register_singleton(t2.clone(), move || Ok(Service2 { _s1: c2.get_token(&p1)? }));
    let c3 = container.clone();
    let p2 = t2.clone();
    container.register_singleton(t3.clone(), move || Ok(Service3 { _s2: c3.get_token(&p2)? }));
    let c4 = container.clone();
    let p3 = t3.clone();
    container.register_singleton(t4.clone(), move || Ok(Service4 { _s3: c4.get_token(&p3)? }));
    let c5 = container.clone();
    let p4 = t4.clone();
    container.register_singleton(t5.clone(), move || Ok(Service5 { _s4: c5.get_token(&p4)? }));
    let c6 = container.clone();
    let p5 = t5.clone();
    container.register_singleton(t6.clone(), move || Ok(Service6 { _s5: c6.get_token(&p5)? }));
    let c7 = container.clone();
    let p6 = t6.clone();
    container.register_singleton(t7.clone(), move || Ok(Service7 { _s6: c7.get_token(&p6)? }));
    let c8 = container.clone();
    let p7 = t7.clone();
    container.register_singleton(t8.clone(), move || Ok(Service8 { _s7: c8.get_token(&p7)? }));

    let mut group = c.benchmark_group("resolution_chain");
    let _ = container.get_token::<Service8>(&t8).unwrap();
    group.bench_function("chain_depth_8_cached", |b| {
        b.iter(|| {
            let v = container.get_token::<Service8>(&t8).unwrap();
            black_box(&v);
        })
    });
    group.finish();
}

fn bench_contention(c: &mut Criterion) {
    let mut group = c.benchmark_group("contention");

    let container = Container::new();
    let token = Token::for_type::<u64>("contended", Scope::Singleton);
    container.register_singleton(token.clone(), || Ok(42u64));
    let _ = container.get_token::<u64>(&token).unwrap();

    for &thread_count in &[1, 2, 4, 8] {
        group.bench_with_input(
            BenchmarkId::new("singleton_threads", thread_count),
            &thread_count,
            |b, &threads| {
                b.iter_custom(|iters| {
                    let start = std::time::Instant::now();
                    std::thread::scope(|s| {
                        for _ in 0..threads {
                            let container = &container;
                            let token = &token;
                            s.spawn(move || {
                                for _ in 0..iters / threads as u64 {
                                    let v = container.get_token::<u64>(token).unwrap();
                                    black_box(v);
                                }
                            });
                        }
                    });
                    start.elapsed()
                })
            },
        );
    }

    group.finish();
}

// ===== Macro benchmarks =====

fn bench_large_registry(c: &mut Criterion) {
    let mut group = c.benchmark_group("large_registry");

    for &service_count in &[10, 100, 1000] {
        let container = Container::new();
        let baseline = Token::for_type::<u64>("baseline", Scope::Singleton);
        container.register_singleton(baseline.clone(), || Ok(42u64));

        for i in 0..service_count {
            let token = Token::new(
                format!("padding-{i}"),
                ctxdi::TypeHandle::of::<u32>(),
                Some(Scope::Singleton),
                None,
                Vec::new(),
            );
            container.register_singleton(token, move || Ok(i as u32));
        }

        group.bench_with_input(
            BenchmarkId::new("resolve_from_large_registry", service_count),
            &service_count,
            |b, _| {
                b.iter(|| {
                    let v = container.get_token::<u64>(&baseline).unwrap();
                    black_box(v);
                })
            },
        );
    }

    group.finish();
}

fn bench_mixed_workload(c: &mut Criterion) {
    // 70% singleton hits, 20% request-scope hits, 10% transient.
    struct SingletonService(u64);
    struct RequestService(u64);
    struct TransientService(u64);

    let container = Container::new();
    let singleton_token = Token::for_type::<SingletonService>("singleton", Scope::Singleton);
    let request_token = Token::for_type::<RequestService>("request", Scope::Request);
    let transient_token = Token::for_type::<TransientService>("transient", Scope::Transient);

    container.register_singleton(singleton_token.clone(), || Ok(SingletonService(1)));
    container.register_request(request_token.clone(), || Ok(RequestService(2)));
    container.register_transient(transient_token.clone(), || Ok(TransientService(3)));

    let _ = container.get_token::<SingletonService>(&singleton_token).unwrap();

    c.bench_function("mixed_workload_realistic", |b| {
        b.iter(|| {
            container
                .request_scope(|c| {
                    for _ in 0..7 {
                        let v = c.get_token::<SingletonService>(&singleton_token)?;
                        black_box(v.0);
                    }
                    for _ in 0..2 {
                        let v = c.get_token::<RequestService>(&request_token)?;
                        black_box(v.0);
                    }
                    let v = c.get_token::<TransientService>(&transient_token)?;
                    black_box(v.0);
                    Ok(())
                })
                .unwrap();
        })
    });
}

criterion_group!(
    micro_benches,
    bench_singleton_hit,
    bench_singleton_cold,
    bench_request_vs_transient,
    bench_override_overhead,
    bench_resolution_chain_depth,
    bench_contention
);

criterion_group!(macro_benches, bench_large_registry, bench_mixed_workload);

criterion_main!(micro_benches, macro_benches);
