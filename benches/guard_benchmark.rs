/*!
 * Handle Guard Benchmarks
 *
 * Cost of guarded access, uncontended and under reader contention, and of
 * registry tracking per capture mode
 */

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rc_handle::{CaptureMode, HandleError, HandleGuard, LifetimeRegistry, RegistryConfig};
use std::hint::black_box;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

fn bench_with_handle(c: &mut Criterion) {
    let mut group = c.benchmark_group("with_handle");

    let guard: HandleGuard = HandleGuard::new();
    guard.init(42, |_| Ok(())).unwrap();

    group.bench_function("uncontended", |b| {
        b.iter(|| guard.with_handle(|h| Ok::<_, HandleError>(black_box(h))).unwrap());
    });

    for readers in [1usize, 4] {
        let guard: Arc<HandleGuard> = Arc::new(HandleGuard::new());
        guard.init(42, |_| Ok(())).unwrap();
        let stop = Arc::new(AtomicBool::new(false));

        let background: Vec<_> = (0..readers)
            .map(|_| {
                let guard = guard.clone();
                let stop = stop.clone();
                thread::spawn(move || {
                    while !stop.load(Ordering::Relaxed) {
                        let _ = guard.with_handle(|h| Ok::<_, HandleError>(black_box(h)));
                    }
                })
            })
            .collect();

        group.bench_with_input(BenchmarkId::new("contended", readers), &guard, |b, guard| {
            b.iter(|| guard.with_handle(|h| Ok::<_, HandleError>(black_box(h))).unwrap());
        });

        stop.store(true, Ordering::Relaxed);
        for handle in background {
            handle.join().unwrap();
        }
    }

    group.finish();
}

fn bench_lifecycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("lifecycle");

    group.bench_function("untracked", |b| {
        b.iter(|| {
            let guard: HandleGuard = HandleGuard::new();
            guard.init(black_box(3), |_| Ok(())).unwrap();
            guard.release().unwrap();
        });
    });

    for capture in [CaptureMode::Disabled, CaptureMode::Location, CaptureMode::Backtrace] {
        let registry = Arc::new(LifetimeRegistry::with_config(RegistryConfig { capture }));
        group.bench_with_input(
            BenchmarkId::new("tracked", format!("{:?}", capture)),
            &registry,
            |b, registry| {
                b.iter(|| {
                    let guard: HandleGuard = HandleGuard::with_registry(registry.clone());
                    guard.init(black_box(3), |_| Ok(())).unwrap();
                    guard.release().unwrap();
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_with_handle, bench_lifecycle);
criterion_main!(benches);
