use criterion::{black_box, criterion_group, criterion_main, Criterion};

use mcqa_core::evaluator::{Evaluator, LabelMatch};
use mcqa_core::randomizer::{sequential, OptionRandomizer};

fn bench_label_match(c: &mut Criterion) {
    let mut group = c.benchmark_group("label_match");
    let evaluator = LabelMatch;

    group.bench_function("exact", |b| {
        b.iter(|| evaluator.evaluate(black_box("C. Penicillin"), black_box("C. Penicillin")))
    });

    group.bench_function("bare_label", |b| {
        b.iter(|| evaluator.evaluate(black_box("c"), black_box("C. Penicillin")))
    });

    group.bench_function("miss", |b| {
        b.iter(|| {
            evaluator.evaluate(
                black_box("The most likely answer is B. Amoxicillin given the history."),
                black_box("C. Penicillin"),
            )
        })
    });

    group.finish();
}

fn bench_randomize(c: &mut Criterion) {
    let mut group = c.benchmark_group("randomize");

    let four: Vec<String> = ["Ibuprofen", "Penicillin", "Aspirin", "Metformin"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let twenty_six: Vec<String> = (0..26).map(|i| format!("option {i}")).collect();
    let randomizer = OptionRandomizer::with_seed(1);

    group.bench_function("4_options", |b| {
        b.iter(|| randomizer.randomize(black_box(&four)).unwrap())
    });

    group.bench_function("26_options", |b| {
        b.iter(|| randomizer.randomize(black_box(&twenty_six)).unwrap())
    });

    group.bench_function("sequential_4", |b| {
        b.iter(|| sequential(black_box(&four)).unwrap().render())
    });

    group.finish();
}

criterion_group!(benches, bench_label_match, bench_randomize);
criterion_main!(benches);
