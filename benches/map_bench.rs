use canonmap::{Flavor, Map, MutableMap, StructuralHasher, Value};
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use std::rc::Rc;
use std::time::Duration;

fn lcg(mut s: u64) -> impl Iterator<Item = u64> {
    std::iter::from_fn(move || {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        Some(s)
    })
}

fn key(n: u64) -> String {
    format!("k{:016x}", n)
}

// Nested key: a short list mixing the string form with its halves.
fn nested_key(n: u64) -> Value {
    Value::List(vec![
        Value::from(key(n)),
        Value::Int((n >> 33) as i64),
        Value::assoc([("lo", Value::Int((n & 0xffff) as i64))]),
    ])
}

fn bench_hash_nested(c: &mut Criterion) {
    c.bench_function("hasher_hash_nested", |b| {
        let hasher = StructuralHasher::new(Flavor::Unique);
        let keys: Vec<_> = lcg(3).take(1_000).map(nested_key).collect();
        let mut it = keys.iter().cycle();
        b.iter(|| {
            let k = it.next().unwrap();
            black_box(hasher.hash(k).unwrap());
        })
    });
}

fn bench_put(c: &mut Criterion) {
    c.bench_function("mutable_map_put_10k", |b| {
        let hasher = Rc::new(StructuralHasher::new(Flavor::Unique));
        b.iter_batched(
            || MutableMap::<String, u64>::with_hasher(Rc::clone(&hasher)),
            |mut m| {
                for (i, x) in lcg(1).take(10_000).enumerate() {
                    m.put(key(x), i as u64).unwrap();
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_get_hit(c: &mut Criterion) {
    c.bench_function("mutable_map_get_hit", |b| {
        let keys: Vec<_> = lcg(7).take(20_000).map(key).collect();
        let m = MutableMap::of(keys.iter().cloned().zip(0u64..)).unwrap();
        let mut it = keys.iter().cycle();
        b.iter(|| {
            let k = it.next().unwrap();
            black_box(m.get(k).unwrap());
        })
    });
}

fn bench_get_miss(c: &mut Criterion) {
    c.bench_function("mutable_map_get_miss", |b| {
        let m = MutableMap::of(lcg(11).take(10_000).map(key).zip(0u64..)).unwrap();
        let mut miss = lcg(0xdead_beef);
        b.iter(|| {
            // generate keys unlikely in map
            let k = key(miss.next().unwrap());
            black_box(m.get(&k).unwrap());
        })
    });
}

fn bench_get_nested(c: &mut Criterion) {
    c.bench_function("mutable_map_get_nested", |b| {
        let keys: Vec<_> = lcg(5).take(5_000).map(nested_key).collect();
        let m = MutableMap::of(keys.iter().cloned().zip(0u64..)).unwrap();
        let mut it = keys.iter().cycle();
        b.iter(|| {
            let k = it.next().unwrap();
            black_box(m.get(k).unwrap());
        })
    });
}

fn bench_persistent_with(c: &mut Criterion) {
    c.bench_function("map_with_1k", |b| {
        let base = Map::of(lcg(13).take(1_000).map(key).zip(0u64..)).unwrap();
        let mut extra = lcg(17);
        b.iter(|| {
            let k = key(extra.next().unwrap());
            black_box(base.with(k, 0).unwrap());
        })
    });
}

fn bench_config() -> Criterion {
    Criterion::default()
        .sample_size(50)
        .measurement_time(Duration::from_secs(8))
        .warm_up_time(Duration::from_secs(2))
}

criterion_group! {
    name = benches;
    config = bench_config();
    targets = bench_hash_nested, bench_put, bench_get_hit, bench_get_miss, bench_get_nested,
        bench_persistent_with
}
criterion_main!(benches);
