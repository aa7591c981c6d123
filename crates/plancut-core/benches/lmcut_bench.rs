//! lm-cut scaling on sequential chain tasks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use plancut_core::engine::lmcut::LmCutEngine;
use plancut_core::task::{ExplicitTask, FactPair, OperatorData, PlanningTask};

/// A chain of `length` binary variables, each operator enabling the next.
fn chain_task(length: usize) -> ExplicitTask {
    let mut operators = Vec::with_capacity(length);
    operators.push(OperatorData::new([], [FactPair::new(0, 1)], 1));
    for var in 1..length {
        operators.push(OperatorData::new(
            [FactPair::new(var - 1, 1)],
            [FactPair::new(var, 1)],
            1,
        ));
    }
    ExplicitTask::new(
        vec![2; length],
        operators,
        vec![FactPair::new(length - 1, 1)],
        vec![0; length],
    )
    .unwrap()
}

fn bench_lmcut_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("lmcut_chain");
    for length in [16, 64, 256] {
        let task = chain_task(length);
        group.bench_with_input(BenchmarkId::from_parameter(length), &task, |b, task| {
            let mut engine = LmCutEngine::new(task).unwrap();
            let initial_state = task.initial_state_values();
            b.iter(|| {
                let mut count = 0;
                let dead_end =
                    engine.compute_landmarks(black_box(&initial_state), |_, _| count += 1);
                assert!(!dead_end);
                assert_eq!(black_box(count), length);
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_lmcut_chain);
criterion_main!(benches);
