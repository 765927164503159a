use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tripath_core::{NodePath, PathFinder, PlaneProjection, Topology, Vec3};
use tripath_mesh::{PathfindingConfig, RouteCost, TriangleMesh, TriangleMeshPathFinding, TrianglePath};

fn grid_mesh(width: usize, height: usize, cell: f32) -> TriangleMesh {
    let mut tris = Vec::with_capacity(width * height * 2);
    for z in 0..height {
        for x in 0..width {
            let x0 = x as f32 * cell;
            let z0 = z as f32 * cell;
            let x1 = (x + 1) as f32 * cell;
            let z1 = (z + 1) as f32 * cell;

            tris.push([
                Vec3::new(x0, 0.0, z0),
                Vec3::new(x1, 0.0, z0),
                Vec3::new(x1, 0.0, z1),
            ]);
            tris.push([
                Vec3::new(x0, 0.0, z0),
                Vec3::new(x1, 0.0, z1),
                Vec3::new(x0, 0.0, z1),
            ]);
        }
    }
    TriangleMesh::from_triangles(&tris, PlaneProjection::IDENTITY, RouteCost::Unit).expect("mesh")
}

fn bench_nav_mesh(c: &mut Criterion) {
    let mesh = Arc::new(grid_mesh(32, 32, 1.0));
    let start = Vec3::new(0.1, 0.0, 0.1);
    let goal = Vec3::new(31.9, 0.0, 31.9);

    let mut group = c.benchmark_group("tripath-mesh/navmesh");

    group.bench_function("build_32x32", |b| {
        b.iter(|| {
            let mesh = grid_mesh(32, 32, 1.0);
            black_box(mesh.route_count());
        })
    });

    group.bench_function("bsp_query", |b| {
        let mut i = 0u32;
        b.iter(|| {
            i = i.wrapping_add(7919);
            let x = (i % 3200) as f32 / 100.0;
            let z = (i / 3200 % 3200) as f32 / 100.0;
            black_box(mesh.query(Vec3::new(x, 0.0, z)));
        })
    });

    let finder = PathFinder::default();
    let mut nodes = NodePath::default();
    group.bench_function("search_nodes_reuse", |b| {
        b.iter(|| {
            assert!(finder.search(mesh.as_ref(), start, goal, &mut nodes));
            black_box(nodes.nodes.len());
        })
    });

    let mut corridor = TrianglePath::new();
    group.bench_function("search_corridor_reuse", |b| {
        b.iter(|| {
            assert!(finder.search(mesh.as_ref(), start, goal, &mut corridor));
            black_box(corridor.len());
        })
    });

    let nav = TriangleMeshPathFinding::from_mesh(Arc::clone(&mesh), &PathfindingConfig::default());
    group.bench_function("search_and_smooth", |b| {
        b.iter(|| {
            let waypoints = nav.search(start, goal).expect("path");
            black_box(waypoints.len());
        })
    });

    group.finish();
}

criterion_group!(benches, bench_nav_mesh);
criterion_main!(benches);
