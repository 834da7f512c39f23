use criterion::{Criterion, black_box, criterion_group, criterion_main};
use skyscript::script::{EventLayout, extract_references, generate_bindings};
use skyscript::{Classification, DataType, PropertySchema};

fn schema(count: usize) -> PropertySchema {
    let mut schema = PropertySchema::new();
    let types = [DataType::String, DataType::Integer, DataType::Float, DataType::Boolean];
    for i in 0..count {
        let classification = if i % 2 == 0 {
            Classification::Object
        } else {
            Classification::Action
        };
        schema
            .create_property(&format!("field{}", i), classification, types[i % types.len()])
            .unwrap();
    }
    schema
}

fn script(count: usize) -> String {
    let mut source = String::from("function aggregate(cursor, data)\n  while cursor:next() do\n");
    for i in (0..count).rev() {
        source.push_str(&format!("    data.f{} = event.field{}\n", i, i));
    }
    source.push_str("  end\nend\n");
    source
}

fn bench_extract(c: &mut Criterion) {
    let schema = schema(200);
    let source = script(200);

    c.bench_function("extract 200 refs", |b| {
        b.iter(|| black_box(extract_references(&schema, &source).unwrap()))
    });
}

fn bench_generate(c: &mut Criterion) {
    let schema = schema(200);
    let properties: Vec<_> = schema.properties().collect();

    c.bench_function("generate header 200 fields", |b| {
        b.iter(|| black_box(generate_bindings(&properties).render()))
    });

    c.bench_function("layout 200 fields", |b| {
        b.iter(|| black_box(EventLayout::compute(&properties)))
    });
}

fn bench_encode(c: &mut Criterion) {
    let schema = schema(1000);

    c.bench_function("encode 1k properties", |b| {
        b.iter(|| {
            let mut buffer = Vec::with_capacity(64 * 1024);
            schema.encode(&mut buffer).unwrap();
            black_box(buffer)
        })
    });
}

criterion_group!(benches, bench_extract, bench_generate, bench_encode);
criterion_main!(benches);
