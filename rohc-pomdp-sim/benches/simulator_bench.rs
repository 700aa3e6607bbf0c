use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rohc_pomdp::SimConfig;
use rohc_pomdp_sim::{BatchConfig, ControllerKind, run_batch, run_single};

fn benchmark_timer_run(c: &mut Criterion) {
    c.bench_function("timer_run_1000_steps", |b| {
        b.iter(|| {
            let config = SimConfig {
                seed: black_box(42),
                steps: 1000,
                ..Default::default()
            };
            let trace = run_single(&config, ControllerKind::Timer).expect("Simulation should succeed");
            black_box(trace);
        });
    });
}

fn benchmark_timer_batch(c: &mut Criterion) {
    c.bench_function("timer_batch_32_runs", |b| {
        b.iter(|| {
            let config = SimConfig {
                seed: black_box(999),
                steps: 500,
                ..Default::default()
            };
            let report = run_batch(
                &config,
                ControllerKind::Timer,
                BatchConfig {
                    runs: 32,
                    workers: num_cpus::get(),
                },
            )
            .expect("Batch should succeed");
            black_box(report);
        });
    });
}

criterion_group!(benches, benchmark_timer_run, benchmark_timer_batch);
criterion_main!(benches);
