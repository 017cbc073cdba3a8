//! Benchmarks for subdivision and smooth refinement.

use criterion::{criterion_group, criterion_main, Criterion};
use nalgebra::Point3;
use strudel::prelude::*;

fn create_octahedron() -> TriMesh {
    let vertices = vec![
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(-1.0, 0.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
        Point3::new(0.0, -1.0, 0.0),
        Point3::new(0.0, 0.0, 1.0),
        Point3::new(0.0, 0.0, -1.0),
    ];
    let faces = vec![
        [0, 2, 4],
        [2, 1, 4],
        [1, 3, 4],
        [3, 0, 4],
        [2, 0, 5],
        [1, 2, 5],
        [3, 1, 5],
        [0, 3, 5],
    ];
    build_from_triangles(&vertices, &faces).unwrap()
}

fn bench_subdivide(c: &mut Criterion) {
    c.bench_function("subdivide_uniform_32", |b| {
        let mesh = create_octahedron();
        b.iter(|| {
            let mut mesh = mesh.clone();
            let bary = subdivide(&mut mesh, |_| 31);
            bary.len()
        });
    });

    c.bench_function("subdivide_graded", |b| {
        let mesh = create_octahedron();
        b.iter(|| {
            let mut mesh = mesh.clone();
            let bary = subdivide(&mut mesh, |edge| (edge.norm() * 12.0) as usize);
            bary.len()
        });
    });
}

fn bench_smooth_refine(c: &mut Criterion) {
    c.bench_function("smooth_refine_32", |b| {
        let mut mesh = create_octahedron();
        create_tangents(&mut mesh, Vec::new());
        b.iter(|| {
            let mut mesh = mesh.clone();
            refine_uniform(&mut mesh, 32);
            mesh.num_vert()
        });
    });

    c.bench_function("set_normals_and_tangents", |b| {
        let mut mesh = create_octahedron();
        refine_uniform(&mut mesh, 16);
        b.iter(|| {
            let mut mesh = mesh.clone();
            set_normals(&mut mesh, 0, 30.0);
            create_tangents_from_normals(&mut mesh, 0);
            mesh.num_prop_vert()
        });
    });
}

criterion_group!(benches, bench_subdivide, bench_smooth_refine);
criterion_main!(benches);
