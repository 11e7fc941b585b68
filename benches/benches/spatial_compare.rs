// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::sync::Arc;

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use kurbo::{Point, Rect};
use understory_layout::{LayoutModel, LayoutSize, SimpleGraph};
use understory_pick::{GraphElementAccessor, GridAccessor, QuadTreeAccessor, RadiusAccessor};
use understory_spatial::{QuadTree, QuadTreeConfig, RTree, RTreeContext, SpatialGrid, SplitStrategy};

const SIDE: f64 = 2000.0;

#[derive(Clone)]
struct Rng(u64);

impl Rng {
    fn new(seed: u64) -> Self {
        Self(seed)
    }
    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
    fn next_f64(&mut self) -> f64 {
        let v = self.next_u64() >> 11;
        (v as f64) / ((1u64 << 53) as f64)
    }
}

fn gen_points(count: usize, seed: u64) -> Vec<(u32, Point)> {
    let mut rng = Rng::new(seed);
    (0..count as u32)
        .map(|i| (i, Point::new(rng.next_f64() * SIDE, rng.next_f64() * SIDE)))
        .collect()
}

fn gen_clustered_points(n_clusters: usize, per_cluster: usize, spread: f64) -> Vec<(u32, Point)> {
    let mut rng = Rng::new(0xC1A5_7E55_9999_ABCD);
    let centers: Vec<_> = (0..n_clusters)
        .map(|_| Point::new(rng.next_f64() * SIDE, rng.next_f64() * SIDE))
        .collect();
    let mut out = Vec::with_capacity(n_clusters * per_cluster);
    for c in centers {
        for _ in 0..per_cluster {
            let id = out.len() as u32;
            let dx = (rng.next_f64() - 0.5) * spread;
            let dy = (rng.next_f64() - 0.5) * spread;
            out.push((id, Point::new(c.x + dx, c.y + dy)));
        }
    }
    out
}

fn bounds() -> Rect {
    Rect::new(0.0, 0.0, SIDE, SIDE)
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    for &n in &[1_000usize, 10_000] {
        let points = gen_points(n, 0xCAFE_F00D_DEAD_BEEF);
        group.throughput(Throughput::Elements(n as u64));

        group.bench_function(format!("grid_32x32_n{n}"), |b| {
            b.iter_batched(
                || SpatialGrid::new(bounds(), 32, 32).unwrap(),
                |mut grid| {
                    grid.build(&points);
                    black_box(grid.len());
                },
                BatchSize::SmallInput,
            );
        });

        group.bench_function(format!("quadtree_n{n}"), |b| {
            b.iter_batched(
                || QuadTree::new(bounds(), QuadTreeConfig::default()).unwrap(),
                |mut tree| {
                    for (id, p) in &points {
                        tree.insert(*id, *p);
                    }
                    black_box(tree.leaf_count());
                },
                BatchSize::SmallInput,
            );
        });

        for (name, strategy) in [
            ("quadratic", SplitStrategy::Quadratic),
            ("linear", SplitStrategy::Linear),
            ("surface_area", SplitStrategy::SurfaceArea),
        ] {
            let ctx = RTreeContext::with_strategy(strategy);
            group.bench_function(format!("rtree_{name}_n{n}"), |b| {
                b.iter(|| {
                    let mut tree = RTree::new();
                    for (id, p) in &points {
                        tree = tree.add(&ctx, *id, Rect::from_center_size(*p, (4.0, 4.0)));
                    }
                    black_box(tree.height());
                });
            });
        }
    }
    group.finish();
}

fn bench_clustered_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_clustered");
    let points = gen_clustered_points(20, 500, 40.0);
    group.throughput(Throughput::Elements(points.len() as u64));
    group.bench_function("grid_32x32", |b| {
        b.iter_batched(
            || SpatialGrid::new(bounds(), 32, 32).unwrap(),
            |mut grid| {
                grid.build(&points);
                black_box(grid.len());
            },
            BatchSize::SmallInput,
        );
    });
    group.bench_function("quadtree", |b| {
        b.iter_batched(
            || QuadTree::new(bounds(), QuadTreeConfig::default()).unwrap(),
            |mut tree| {
                tree.build(&points);
                black_box(tree.depth());
            },
            BatchSize::SmallInput,
        );
    });
    group.finish();
}

fn bench_rtree_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("rtree_query");
    let points = gen_points(10_000, 0xBADC_F00D_1234_5678);
    let ctx = RTreeContext::default();
    let mut tree = RTree::new();
    for (id, p) in &points {
        tree = tree.add(&ctx, *id, Rect::from_center_size(*p, (8.0, 8.0)));
    }
    let probes = gen_points(256, 0x5EED);

    group.throughput(Throughput::Elements(probes.len() as u64));
    group.bench_function("pick_256", |b| {
        b.iter(|| {
            let hits = probes
                .iter()
                .filter(|(_, p)| tree.get_picked_object(*p).is_some())
                .count();
            black_box(hits);
        });
    });
    group.bench_function("viewport_256", |b| {
        b.iter(|| {
            let hits: usize = probes
                .iter()
                .map(|(_, p)| tree.query_rect(Rect::from_center_size(*p, (200.0, 150.0))).len())
                .sum();
            black_box(hits);
        });
    });
    group.bench_function("remove_then_add", |b| {
        b.iter(|| {
            let (id, p) = points[4242];
            let moved = tree
                .remove(&id)
                .add(&ctx, id, Rect::from_center_size(p + (3.0, 3.0), (8.0, 8.0)));
            black_box(moved.len());
        });
    });
    group.finish();
}

fn bench_nearest_node(c: &mut Criterion) {
    let mut group = c.benchmark_group("nearest_node");
    let points = gen_points(5_000, 0x0DDB_A11_u64);
    let graph = SimpleGraph::from_edges(points.iter().map(|(id, _)| *id), []);
    let model: LayoutModel<SimpleGraph<u32>> =
        LayoutModel::new(Arc::new(graph), LayoutSize::new(SIDE, SIDE)).unwrap();
    for (id, p) in &points {
        model.set(id, *p).unwrap();
    }
    let probes = gen_points(128, 0xFEED);
    group.throughput(Throughput::Elements(probes.len() as u64));

    let radius = RadiusAccessor::default();
    group.bench_function("radius_scan", |b| {
        b.iter(|| {
            for (_, p) in &probes {
                black_box(radius.node_at(&model, *p, 50.0));
            }
        });
    });

    let grid = GridAccessor::<u32>::new(64, 64);
    group.bench_function("grid_rings", |b| {
        b.iter(|| {
            for (_, p) in &probes {
                black_box(grid.node_at(&model, *p, 50.0));
            }
        });
    });

    let tree = QuadTreeAccessor::<u32>::default();
    group.bench_function("quadtree_best_first", |b| {
        b.iter(|| {
            for (_, p) in &probes {
                black_box(tree.node_at(&model, *p, 50.0));
            }
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_build,
    bench_clustered_build,
    bench_rtree_queries,
    bench_nearest_node
);
criterion_main!(benches);
