use std::sync::Arc;

use coach::{ReplayBuffer, Sample};
use criterion::{criterion_group, criterion_main, Criterion};

fn sample(i: usize) -> Arc<Sample> {
    Arc::new(Sample {
        observation: vec![0.1; 32],
        action: vec![0.0; 8],
        reward: i as f32,
        next_observation: vec![0.2; 32],
        done: false,
    })
}

fn bench_replay(c: &mut Criterion) {
    c.bench_function("replay_add_at_capacity", |b| {
        let mut buffer = ReplayBuffer::new(10_000);
        for i in 0..10_000 {
            buffer.add(sample(i));
        }
        let mut i = 0;
        b.iter(|| {
            buffer.add(sample(i));
            i += 1;
        });
    });

    c.bench_function("replay_batch_100", |b| {
        let mut buffer = ReplayBuffer::new(10_000);
        for i in 0..10_000 {
            buffer.add(sample(i));
        }
        let mut rng = fastrand::Rng::with_seed(9);
        b.iter(|| buffer.batch(100, &mut rng));
    });
}

criterion_group!(benches, bench_replay);
criterion_main!(benches);
