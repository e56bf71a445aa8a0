use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use interpose_engine::{ClassBuilder, Value};

fn counter(depth: usize) -> ClassBuilder {
    let mut builder = ClassBuilder::new("Counter")
        .field("count", 0)
        .field("plain", 1)
        .method("increment", |this, _| {
            let next = this.get("count")?.as_int().unwrap_or(0) + 1;
            this.set("count", Value::Int(next))?;
            Ok(Value::Int(next))
        });
    for _ in 0..depth {
        builder = builder
            .around("increment", |ctx| ctx.next())
            .access("count", |ctx| ctx.next());
    }
    builder
}

fn bench_reads(c: &mut Criterion) {
    let unwrapped = counter(0).build().unwrap().construct(vec![]).unwrap();
    let wrapped = counter(4).build().unwrap().construct(vec![]).unwrap();

    c.bench_function("read_unwrapped", |b| {
        b.iter(|| unwrapped.get(black_box("count")).unwrap())
    });
    c.bench_function("read_fast_path", |b| {
        b.iter(|| wrapped.get(black_box("plain")).unwrap())
    });
    c.bench_function("read_intercepted", |b| {
        b.iter(|| wrapped.get(black_box("count")).unwrap())
    });
}

fn bench_calls(c: &mut Criterion) {
    let mut group = c.benchmark_group("invoke");

    for depth in [0usize, 1, 4, 16] {
        let obj = counter(depth).build().unwrap().construct(vec![]).unwrap();
        group.bench_with_input(BenchmarkId::new("chain_depth", depth), &obj, |b, obj| {
            b.iter(|| obj.invoke(black_box("increment"), vec![]).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_reads, bench_calls);
criterion_main!(benches);
