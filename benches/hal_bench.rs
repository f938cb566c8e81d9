//! Benchmarks for HAL coercion and serialization
//!
//! Run with: cargo bench

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use hal_model::{Embedded, HalContext, JsonOptions, Links, Resource, SetOptions};
use serde_json::{Map, Value, json};

/// Generate a `_links` mapping with the given number of relations
fn generate_links(count: usize) -> Value {
    let mut map = Map::new();
    for i in 0..count {
        let value = if i % 3 == 0 {
            json!([{"href": format!("/items/{}", i)}, {"href": format!("/items/{}/alt", i)}])
        } else {
            json!({"href": format!("/items/{}", i), "title": format!("Item {}", i)})
        };
        map.insert(format!("rel{}", i), value);
    }
    Value::Object(map)
}

/// Generate an `_embedded` mapping holding one list of resources
fn generate_embedded(count: usize) -> Value {
    let items: Vec<Value> = (0..count)
        .map(|i| {
            json!({
                "id": i,
                "name": format!("Item {}", i),
                "_links": {"self": {"href": format!("/items/{}", i)}}
            })
        })
        .collect();
    json!({ "items": items })
}

fn bench_links(c: &mut Criterion) {
    let mut group = c.benchmark_group("links");

    for count in [10, 100, 1000].iter() {
        let mapping = generate_links(*count);
        group.throughput(Throughput::Elements(*count as u64));

        group.bench_with_input(BenchmarkId::new("set_json", count), &mapping, |b, mapping| {
            b.iter(|| {
                let mut links = Links::new();
                links
                    .set_json(black_box(mapping.clone()), &SetOptions::default())
                    .unwrap();
                links
            });
        });

        let links = Links::from_value(mapping.clone(), HalContext::default()).unwrap();
        group.bench_with_input(BenchmarkId::new("to_json", count), &links, |b, links| {
            b.iter(|| black_box(links.to_json(&JsonOptions::default())));
        });
    }

    group.finish();
}

fn bench_embedded(c: &mut Criterion) {
    let mut group = c.benchmark_group("embedded");

    for count in [10, 100, 1000].iter() {
        let mapping = generate_embedded(*count);
        group.throughput(Throughput::Elements(*count as u64));

        group.bench_with_input(BenchmarkId::new("set_json", count), &mapping, |b, mapping| {
            b.iter(|| {
                let mut embedded = Embedded::new();
                embedded
                    .set_json(black_box(mapping.clone()), &SetOptions::default())
                    .unwrap();
                embedded
            });
        });

        let embedded = Embedded::from_value(mapping.clone(), HalContext::default()).unwrap();
        group.bench_with_input(BenchmarkId::new("to_json_hal", count), &embedded, |b, embedded| {
            b.iter(|| black_box(embedded.to_json(&JsonOptions::hal())));
        });
    }

    group.finish();
}

fn bench_document_round_trip(c: &mut Criterion) {
    let document = json!({
        "id": 1,
        "_links": generate_links(20),
        "_embedded": generate_embedded(50),
    })
    .to_string();

    c.bench_function("document_round_trip", |b| {
        b.iter(|| {
            let resource =
                Resource::from_json_str(black_box(&document), HalContext::default()).unwrap();
            black_box(resource.to_json_string(&JsonOptions::hal()).unwrap())
        });
    });
}

criterion_group!(benches, bench_links, bench_embedded, bench_document_round_trip);
criterion_main!(benches);
