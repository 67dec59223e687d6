//! Expression simplification benchmarks.
//!
//! Run with:
//! ```bash
//! cargo bench --bench simplify
//! ```

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use symex_rs::context::Context;
use symex_rs::reference::Ref;
use symex_rs::types::Sort;

/// A heap built from `depth` field writes to distinct fields, read back at the first field.
fn read_through_writes(ctx: &Context, depth: usize) -> Ref {
    let o = ctx.mk_sym(ctx.register_local("o", Sort::Object).unwrap());
    let mut heap = ctx.mk_sym(ctx.heap());
    for i in 0..depth {
        heap = ctx.store(heap, o, ctx.mk_field(&format!("Node.f{}", i)), ctx.mk_int(i as i64));
    }
    ctx.select(heap, o, ctx.mk_field("Node.f0"))
}

/// `((x + 0) * 1) + ...` nested `depth` times.
fn neutral_chain(ctx: &Context, depth: usize) -> Ref {
    let x = ctx.mk_sym(ctx.register_local("x", Sort::Int).unwrap());
    let mut e = x;
    for _ in 0..depth {
        e = ctx.mul(ctx.plus(e, ctx.mk_int(0)), ctx.mk_int(1));
    }
    e
}

fn bench_read_over_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("read_over_write");
    for depth in [16, 64, 256] {
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            b.iter(|| {
                let ctx = Context::new(16).unwrap();
                let e = read_through_writes(&ctx, depth);
                ctx.simplify(e)
            });
        });
    }
    group.finish();
}

fn bench_neutral_elements(c: &mut Criterion) {
    let mut group = c.benchmark_group("neutral_elements");
    for depth in [16, 64, 256] {
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            b.iter(|| {
                let ctx = Context::new(16).unwrap();
                let e = neutral_chain(&ctx, depth);
                ctx.simplify(e)
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_read_over_write, bench_neutral_elements);
criterion_main!(benches);
