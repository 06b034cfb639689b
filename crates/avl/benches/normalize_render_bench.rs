//! 🏎️ How fast does a batch of 1000 tagged records become a `_bulk` body?

use std::hint::black_box;

use avl::common::{FieldValue, Record, tagged};
use avl::transforms::{
    BulkAction, BulkActionPolicy, BulkRenderer, CoercionRule, CoercionTable, Normalizer,
};
use criterion::{BatchSize, Criterion, criterion_group, criterion_main};

fn a_batch_of_products(n: usize) -> Vec<Record> {
    (0..n)
        .map(|i| {
            Record::from([
                ("productId".to_string(), tagged("string", format!("p{i}"))),
                ("price".to_string(), tagged("string", format!("{}.99", i % 500))),
                ("webcastAddSales".to_string(), tagged("string", "12")),
                ("webcastSalesMoney".to_string(), tagged("string", "n/a")),
                ("stock".to_string(), tagged("long", i as i64)),
                ("title".to_string(), FieldValue::from("a very ordinary product")),
            ])
        })
        .collect()
}

fn normalize_bench(c: &mut Criterion) {
    let the_normalizer = Normalizer::new(CoercionTable::from([
        ("price".to_string(), CoercionRule::Float),
        ("webcastAddSales".to_string(), CoercionRule::Float),
        ("webcastSalesMoney".to_string(), CoercionRule::Float),
    ]));

    c.bench_function("normalize_1000_products", |b| {
        b.iter_batched(
            || a_batch_of_products(1000),
            |mut batch| {
                for record in batch.iter_mut() {
                    black_box(the_normalizer.normalize(record));
                }
                batch
            },
            BatchSize::SmallInput,
        );
    });
}

fn render_bench(c: &mut Criterion) {
    let the_normalizer = Normalizer::new(CoercionTable::from([(
        "price".to_string(),
        CoercionRule::Float,
    )]));
    let mut the_batch = a_batch_of_products(1000);
    for record in the_batch.iter_mut() {
        the_normalizer.normalize(record);
    }
    let the_renderer = BulkRenderer::new(
        BulkActionPolicy::new("products", BulkAction::Upsert, Some("productId".to_string()))
            .expect("bench policy"),
    );

    c.bench_function("render_1000_products_upsert", |b| {
        b.iter(|| {
            let the_rendered = the_renderer.render(black_box(&the_batch)).expect("bench render");
            black_box(the_rendered);
        });
    });
}

criterion_group!(benches, normalize_bench, render_bench);
criterion_main!(benches);
