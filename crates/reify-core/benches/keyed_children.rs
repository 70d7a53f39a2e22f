use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use reify_core::{el, Document, Renderer, VNode};

const LIST_SIZES: &[usize] = &[64, 256, 1024];

fn list(order: &[usize]) -> VNode {
    el("ul")
        .children(order.iter().map(|n| el("li").key(*n as i64).child(*n)))
        .build()
}

fn mounted(order: &[usize]) -> (Renderer, Document) {
    let document = Document::new();
    let renderer = Renderer::new(document.clone());
    renderer
        .render(list(order), document.body())
        .expect("mount");
    (renderer, document)
}

fn keyed_children(c: &mut Criterion) {
    let mut group = c.benchmark_group("keyed_children");

    for &size in LIST_SIZES {
        let forward: Vec<usize> = (0..size).collect();

        let mut rotated = forward.clone();
        rotated.rotate_left(1);
        group.bench_with_input(BenchmarkId::new("rotate", size), &size, |b, _| {
            b.iter_batched(
                || mounted(&forward),
                |(renderer, document)| {
                    renderer
                        .render(list(&rotated), document.body())
                        .expect("update");
                },
                BatchSize::SmallInput,
            )
        });

        let reversed: Vec<usize> = forward.iter().rev().copied().collect();
        group.bench_with_input(BenchmarkId::new("reverse", size), &size, |b, _| {
            b.iter_batched(
                || mounted(&forward),
                |(renderer, document)| {
                    renderer
                        .render(list(&reversed), document.body())
                        .expect("update");
                },
                BatchSize::SmallInput,
            )
        });

        group.bench_with_input(BenchmarkId::new("in_order", size), &size, |b, _| {
            b.iter_batched(
                || mounted(&forward),
                |(renderer, document)| {
                    renderer
                        .render(list(&forward), document.body())
                        .expect("update");
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

criterion_group!(benches, keyed_children);
criterion_main!(benches);
