//! Benchmarks for the marshaling hot paths.
//!
//! - Scalar and container conversion in both directions
//! - Native calls through the gateway, including argument binding
//! - Delegate fires into scripted handlers
//!
//! Run with the `profiling` feature to get per-function scopes:
//!
//! ```bash
//! cargo bench --features profiling
//! ```

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;

use scriptbridge::{CallArgs, ScriptDict, ScriptFunction, ScriptRuntime, ScriptValue};
use scriptbridge_core::{
    FunctionSignature, NativeClass, NativeFunction, NativeValue, ObjectHeap, PropertyBuffer,
    PropertyDescriptor, PropertyKind,
};
use scriptbridge_registry::NativeRegistry;

fn world() -> (Arc<ObjectHeap>, ScriptRuntime, Arc<NativeClass>) {
    let class = NativeClass::builder("Target")
        .property("Value", PropertyKind::Int32)
        .event(
            "OnPing",
            PropertyKind::MulticastDelegate(Arc::new(
                FunctionSignature::new("OnPing").param("Count", PropertyKind::Int32),
            )),
        )
        .function(
            NativeFunction::new(
                "Scale",
                FunctionSignature::new("Scale")
                    .param("Factor", PropertyKind::Int32)
                    .param("Offset", PropertyKind::Int32)
                    .out_param("Previous", PropertyKind::Int32)
                    .returns(PropertyKind::Int32),
                |ctx| {
                    let factor: i32 = ctx.param("Factor")?;
                    let offset: i32 = ctx.param("Offset")?;
                    ctx.set_param("Previous", factor)?;
                    ctx.set_return(factor.wrapping_mul(3).wrapping_add(offset))
                },
            )
            .with_default("Offset", "7"),
        )
        .build();
    let heap = Arc::new(ObjectHeap::new());
    let runtime = ScriptRuntime::new(Arc::clone(&heap), NativeRegistry::new());
    (heap, runtime, class)
}

fn scalar_benchmarks(c: &mut Criterion) {
    let (_heap, runtime, _class) = world();
    let converter = runtime.converter();
    let descriptor = PropertyDescriptor::new("Value", PropertyKind::Int32).at(0);
    let mut buffer = PropertyBuffer::zeroed(1);
    let value = ScriptValue::from(42);

    let mut group = c.benchmark_group("convert/scalar");
    group.bench_function("from_dynamic_int32", |b| {
        b.iter(|| {
            converter
                .from_dynamic(black_box(&value), &descriptor, &mut buffer)
                .unwrap();
        });
    });
    group.bench_function("to_dynamic_int32", |b| {
        b.iter(|| black_box(converter.to_dynamic(&descriptor, &buffer).unwrap()));
    });
    group.finish();
}

fn container_benchmarks(c: &mut Criterion) {
    let (_heap, runtime, _class) = world();
    let converter = runtime.converter();

    let mut group = c.benchmark_group("convert/containers");

    let array = PropertyDescriptor::new("Items", PropertyKind::array(PropertyKind::Int32)).at(0);
    let list = ScriptValue::List((0..1000).map(ScriptValue::from).collect());
    let mut buffer = PropertyBuffer::zeroed(1);
    group.throughput(Throughput::Elements(1000));
    group.bench_function("array_1000_from_dynamic", |b| {
        b.iter(|| converter.from_dynamic(black_box(&list), &array, &mut buffer).unwrap());
    });
    group.bench_function("array_1000_to_dynamic", |b| {
        b.iter(|| black_box(converter.to_dynamic(&array, &buffer).unwrap()));
    });

    let bytes = PropertyDescriptor::new("Blob", PropertyKind::array(PropertyKind::Byte)).at(0);
    let blob = ScriptValue::Bytes(vec![0xAB; 4096]);
    let mut blob_buffer = PropertyBuffer::zeroed(1);
    group.throughput(Throughput::Bytes(4096));
    group.bench_function("bytes_4k_round_trip", |b| {
        b.iter(|| {
            converter.from_dynamic(black_box(&blob), &bytes, &mut blob_buffer).unwrap();
            black_box(converter.to_dynamic(&bytes, &blob_buffer).unwrap())
        });
    });

    let map = PropertyDescriptor::new(
        "Scores",
        PropertyKind::map(PropertyKind::String, PropertyKind::Int32),
    )
    .at(0);
    let dict = ScriptValue::Dict((0..100).map(|i| (format!("key{i}"), i)).collect::<ScriptDict>());
    let mut map_buffer = PropertyBuffer::zeroed(1);
    group.throughput(Throughput::Elements(100));
    group.bench_function("map_100_from_dynamic", |b| {
        b.iter(|| converter.from_dynamic(black_box(&dict), &map, &mut map_buffer).unwrap());
    });
    group.finish();
}

fn gateway_benchmarks(c: &mut Criterion) {
    let (heap, runtime, class) = world();
    let target = runtime.wrap(heap.spawn(&class, "target")).unwrap();
    let positional = CallArgs::new().arg(5).arg(1);
    let defaulted = CallArgs::new().arg(5);

    let mut group = c.benchmark_group("invoke");
    group.bench_function("positional", |b| {
        b.iter(|| {
            black_box(
                runtime
                    .call_method(&target, "Scale", black_box(&positional))
                    .unwrap(),
            )
        });
    });
    group.bench_function("with_default", |b| {
        b.iter(|| black_box(runtime.call_method(&target, "Scale", black_box(&defaulted)).unwrap()));
    });
    group.finish();
}

fn delegate_benchmarks(c: &mut Criterion) {
    let (heap, runtime, class) = world();
    let handle = heap.spawn(&class, "target");
    let target = runtime.wrap(handle).unwrap();
    let object = heap.get(handle).unwrap();
    for i in 0..8 {
        let handler = ScriptFunction::new(format!("handler{i}"), |args| {
            Ok(args.first().cloned().unwrap_or_default())
        });
        runtime.binder().bind(&target, "OnPing", &handler.shared(), true).unwrap();
    }
    let mut params = PropertyBuffer::zeroed(1);
    params.set(0, NativeValue::Int32(1));

    let mut group = c.benchmark_group("delegate");
    group.throughput(Throughput::Elements(8));
    group.bench_function("broadcast_8_handlers", |b| {
        b.iter(|| black_box(object.fire_event("OnPing", &mut params).unwrap()));
    });
    group.finish();
}

criterion_group!(
    benches,
    scalar_benchmarks,
    container_benchmarks,
    gateway_benchmarks,
    delegate_benchmarks
);
criterion_main!(benches);
