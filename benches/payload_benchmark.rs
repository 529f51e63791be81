use criterion::{criterion_group, criterion_main, Criterion};
use liftlog::models::{Exercise, Intensity, Reps, SessionRecord, WorkoutSession};
use std::hint::black_box;

fn long_session() -> WorkoutSession {
    let mut session = WorkoutSession::start();
    for i in 0..40 {
        let sets = (1..=6)
            .map(|n| Reps::new(8 + n, Some(100.0 + f64::from(n) * 5.0), Intensity::High).unwrap())
            .collect();
        session
            .add_exercise(Exercise::record(format!("Exercise {}", i), sets).unwrap())
            .unwrap();
    }
    session
}

fn benchmark_payload(c: &mut Criterion) {
    let session = long_session();

    let mut group = c.benchmark_group("session_payload");

    group.bench_function("build_payload_240_sets", |b| {
        b.iter(|| black_box(&session).build_payload())
    });

    let payload = session.build_payload();
    group.bench_function("serialize_payload_240_sets", |b| {
        b.iter(|| serde_json::to_vec(black_box(&payload)).unwrap())
    });

    group.bench_function("record_from_payload", |b| {
        b.iter(|| SessionRecord::from_payload(1, black_box(&payload)))
    });

    group.finish();
}

criterion_group!(benches, benchmark_payload);
criterion_main!(benches);
