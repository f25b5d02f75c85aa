//! Encode and decode cost per format, on a cart-sized and a catalog-sized payload

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkGroup, Criterion, Throughput};
use criterion::measurement::WallTime;
use serde::{Deserialize, Serialize};
use tiercache_core::{JsonSerializer, Serializer};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Item {
    sku: String,
    quantity: u32,
    price_cents: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Cart {
    owner: u64,
    items: Vec<Item>,
    coupon: Option<String>,
}

fn cart(items: usize) -> Cart {
    Cart {
        owner: 42,
        items: (0..items)
            .map(|i| Item {
                sku: format!("SKU-{i:06}"),
                quantity: (i % 5) as u32 + 1,
                price_cents: 199 + i as u64,
            })
            .collect(),
        coupon: Some("WINTER".into()),
    }
}

fn bench_format<S: Serializer>(group: &mut BenchmarkGroup<'_, WallTime>, serializer: S, value: &Cart) {
    let bytes = serializer.serialize(value).unwrap();
    group.throughput(Throughput::Bytes(bytes.len() as u64));

    group.bench_function(format!("{}/encode", serializer.name()), |b| {
        b.iter(|| serializer.serialize(black_box(value)).unwrap())
    });
    group.bench_function(format!("{}/decode", serializer.name()), |b| {
        b.iter(|| serializer.deserialize::<Cart>(black_box(&bytes)).unwrap())
    });
}

fn bench_payloads(c: &mut Criterion) {
    for (label, items) in [("cart", 8), ("catalog", 2_000)] {
        let value = cart(items);
        let mut group = c.benchmark_group(label);

        bench_format(&mut group, JsonSerializer, &value);
        #[cfg(feature = "msgpack")]
        bench_format(&mut group, tiercache_core::MsgPackSerializer, &value);
        #[cfg(feature = "bincode")]
        bench_format(&mut group, tiercache_core::BincodeSerializer, &value);

        group.finish();
    }
}

criterion_group!(benches, bench_payloads);
criterion_main!(benches);
