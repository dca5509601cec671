//! Marshalling Benchmark
//!
//! Measures the cost of crossing the boundary:
//! - Tensor conversion for growing buffers (should stay flat: data is shared)
//! - Graph conversion for growing operator counts
//!
//! Run with: cargo bench --bench marshalling

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use nnrt_bridge::{convert_graph, convert_tensor};
use nnrt_core::{Attribute, DType, Format, Graph, Operator, Tensor};

/// Benchmark tensor conversion across buffer sizes
fn bench_tensor_conversion(c: &mut Criterion) {
    let mut group = c.benchmark_group("tensor_conversion");

    for (dims, name) in [
        (vec![1, 16], "tiny"),
        (vec![1, 3, 32, 32], "small"),
        (vec![1, 3, 224, 224], "image"),
        (vec![8, 3, 512, 512], "batch"),
    ] {
        let count: u32 = dims.iter().product();
        let values = vec![0.5_f32; count as usize];
        let tensor = Tensor::from_f32("input", &dims, Format::NCHW, &values).unwrap();
        group.throughput(Throughput::Bytes(u64::from(count) * 4));

        group.bench_with_input(BenchmarkId::new("convert_tensor", name), &tensor, |b, tensor| {
            b.iter(|| convert_tensor(black_box(tensor)).unwrap());
        });
    }

    group.finish();
}

/// Benchmark graph conversion across operator counts
fn bench_graph_conversion(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph_conversion");

    for count in [1_usize, 16, 128, 1024] {
        let mut graph = Graph::new("chain");
        for i in 0..count {
            let x = Tensor::new_with_shape(format!("t{i}"), &[1, 64], Format::NCHW, DType::Float32).unwrap();
            let y = Tensor::new_with_shape(format!("t{}", i + 1), &[1, 64], Format::NCHW, DType::Float32).unwrap();
            graph.add_operator(
                Operator::new(format!("relu_{i}"), "Relu")
                    .with_input("X", x)
                    .with_output("Y", y)
                    .with_attribute(Attribute::float("alpha", 0.01))
                    .with_attribute(Attribute::ints("axes", vec![0, 1])),
            );
        }
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::new("convert_graph", count), &graph, |b, graph| {
            b.iter(|| convert_graph(black_box(graph)).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_tensor_conversion, bench_graph_conversion);
criterion_main!(benches);
