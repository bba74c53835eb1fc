use std::hint::black_box;
use std::time::Instant;

use arbor_geometry::{GeometryArray, Topology, TriangleView};
use glam::Vec3;

fn make_vertices(count: usize) -> Vec<Vec3> {
    (0..count)
        .map(|i| Vec3::new(i as f32, (i % 7) as f32, (i % 13) as f32))
        .collect()
}

fn bench_sweep(label: &str, geometry: &GeometryArray, iterations: usize) {
    let start = Instant::now();
    for _ in 0..iterations {
        let mut acc = Vec3::ZERO;
        for i in 0..geometry.triangle_count() {
            if let Some([a, b, c]) = black_box(geometry).triangle(black_box(i)) {
                acc += a + b + c;
            }
        }
        black_box(acc);
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!(
        "  {label} ({} triangles, {iterations} iters): {per_iter:?}/iter, total {elapsed:?}",
        geometry.triangle_count()
    );
}

fn main() {
    println!("=== Triangle View Benchmarks ===\n");

    let n = 30_000;
    let vertices = make_vertices(n);

    let list = GeometryArray::new(Topology::TriangleList, vertices.clone()).unwrap();
    bench_sweep("triangle list", &list, 100);

    let quads = GeometryArray::new(Topology::QuadList, vertices.clone()).unwrap();
    bench_sweep("quad list", &quads, 100);

    // Many short strips stress the strip-table walk.
    let strip_counts = vec![6; n / 6];
    let strips = GeometryArray::new(Topology::triangle_strip(strip_counts), vertices.clone()).unwrap();
    bench_sweep("strip of 6-vertex strips", &strips, 10);

    let indices: Vec<u32> = (0..n as u32).rev().collect();
    let indexed = GeometryArray::indexed(Topology::TriangleList, vertices, indices).unwrap();
    bench_sweep("indexed triangle list", &indexed, 100);

    println!("\n=== Done ===");
}
