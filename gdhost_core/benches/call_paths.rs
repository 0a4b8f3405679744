// Benchmarks for the dynamic and native (ptrcall) paths through the
// Variant layer, plus Array copy-on-write costs.
//
// Run with `cargo bench -p gdhost_core`. The dynamic paths allocate and
// match on Variant kinds; the ptr paths should stay within a small constant
// factor of a direct Rust call.

use std::hint::black_box;
use std::ptr;

use criterion::{Criterion, criterion_group, criterion_main};
use gdhost_core::math::Vector2;
use gdhost_core::variant::{Operator, builtin_method, evaluate, ptr as vptr};
use gdhost_core::{Array, StringName, Variant, VariantType};

fn bench_operators(c: &mut Criterion) {
    let mut group = c.benchmark_group("operator_add_int");
    let a = Variant::Int(40);
    let b = Variant::Int(2);
    group.bench_function("dynamic", |bench| {
        bench.iter(|| evaluate(Operator::Add, black_box(&a), black_box(&b)))
    });

    let Some(eval) = vptr::operator_evaluator(Operator::Add, VariantType::Int, VariantType::Int)
    else {
        return;
    };
    let (x, y) = (40i64, 2i64);
    group.bench_function("ptr", |bench| {
        bench.iter(|| {
            let mut out = 0i64;
            unsafe {
                eval(
                    ptr::from_ref(black_box(&x)).cast(),
                    ptr::from_ref(black_box(&y)).cast(),
                    ptr::from_mut(&mut out).cast(),
                )
            };
            out
        })
    });
    group.finish();
}

fn bench_builtin_methods(c: &mut Criterion) {
    let mut group = c.benchmark_group("vector2_length");
    let mut receiver = Variant::Vector2(Vector2::new(3.0, 4.0));
    let length = StringName::new("length");
    group.bench_function("dynamic", |bench| {
        bench.iter(|| black_box(&mut receiver).call(&length, &[]))
    });

    let Some(method) = builtin_method(VariantType::Vector2, "length") else {
        return;
    };
    let Some(call) = vptr::builtin_method(VariantType::Vector2, "length", method.hash.into()) else {
        return;
    };
    let mut base = Vector2::new(3.0, 4.0);
    group.bench_function("ptr", |bench| {
        bench.iter(|| {
            let mut out = 0.0f64;
            unsafe {
                call(
                    ptr::from_mut(black_box(&mut base)).cast(),
                    ptr::null(),
                    ptr::from_mut(&mut out).cast(),
                    0,
                )
            };
            out
        })
    });
    group.finish();
}

fn bench_array(c: &mut Criterion) {
    let mut group = c.benchmark_group("array");
    let source = Array::new();
    for i in 0..1024 {
        let _ = source.push_back(Variant::Int(i));
    }

    group.bench_function("clone_shares_storage", |bench| {
        bench.iter(|| black_box(&source).clone())
    });
    group.bench_function("duplicate_then_write", |bench| {
        bench.iter(|| {
            let copy = source.duplicate(false);
            let _ = copy.set(0, Variant::Int(-1));
            copy
        })
    });
    group.bench_function("get", |bench| bench.iter(|| source.get(black_box(512))));

    let typed = match Array::new_typed(VariantType::Int, StringName::default()) {
        Ok(typed) => typed,
        Err(_) => return,
    };
    group.bench_function("typed_push_back", |bench| {
        bench.iter(|| {
            let _ = typed.push_back(Variant::Float(1.0));
            let _ = typed.pop_back();
        })
    });
    group.finish();
}

criterion_group!(benches, bench_operators, bench_builtin_methods, bench_array);
criterion_main!(benches);
