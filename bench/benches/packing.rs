use std::hint::black_box;

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use dc_packer::{
    ArrayParameter, ArraySize, ClassParameter, Field, FieldRef, PackData, PackValue,
    SimpleParameter, SubatomicType, SwitchCase, SwitchParameter,
};
use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn simple(name: &str, kind: SubatomicType) -> FieldRef {
    Field::new(name, SimpleParameter::new(kind)).into_ref()
}

fn schema() -> Field {
    let point = Field::new(
        "point",
        ClassParameter::new(vec![
            simple("x", SubatomicType::Float64),
            simple("y", SubatomicType::Float64),
        ]),
    )
    .into_ref();
    let event = Field::new(
        "event",
        SwitchParameter::new(simple("kind", SubatomicType::UInt8))
            .with_case(SwitchCase::new(vec![1], vec![simple("target", SubatomicType::UInt32)]))
            .with_default_case(vec![simple("note", SubatomicType::String)]),
    )
    .into_ref();
    Field::new(
        "record",
        ClassParameter::new(vec![
            simple("id", SubatomicType::UInt64),
            simple("name", SubatomicType::String),
            Field::new("path", ArrayParameter::new(point, ArraySize::any())).into_ref(),
            event,
        ]),
    )
}

fn value(points: usize) -> PackValue {
    PackValue::List(vec![
        PackValue::UInt(42),
        PackValue::String("benchmark".to_owned()),
        PackValue::List(
            (0..points)
                .map(|i| {
                    PackValue::List(vec![
                        PackValue::Double(i as f64),
                        PackValue::Double(-(i as f64)),
                    ])
                })
                .collect(),
        ),
        PackValue::List(vec![PackValue::UInt(1), PackValue::UInt(7)]),
    ])
}

fn bench_pack(c: &mut Criterion) {
    let field = schema();
    let value = value(256);
    c.bench_function("pack_value", |b| {
        b.iter_batched(
            || PackData::with_capacity(8192),
            |mut data| {
                field.pack_value(&mut data, black_box(&value));
                data.freeze()
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_unpack(c: &mut Criterion) {
    let field = schema();
    let mut data = PackData::new();
    field.pack_value(&mut data, &value(256));
    let bytes = data.freeze();
    c.bench_function("unpack_value", |b| {
        b.iter(|| {
            let mut p = 0;
            field.unpack_value(black_box(&bytes), &mut p)
        })
    });
}

fn bench_live_catalog(c: &mut Criterion) {
    let field = schema();
    let mut data = PackData::new();
    field.pack_value(&mut data, &value(16));
    let bytes = data.into_vec();
    let catalog = field.get_catalog();
    c.bench_function("get_live_catalog", |b| {
        b.iter(|| catalog.get_live_catalog(black_box(&bytes)).map(|live| live.get_num_entries()))
    });
}

criterion_group!(benches, bench_pack, bench_unpack, bench_live_catalog);
criterion_main!(benches);
