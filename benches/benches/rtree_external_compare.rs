// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

#![cfg(feature = "compare_rstar")]

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use kurbo::{Point, Rect};
use understory_spatial::{RTree, RTreeContext, SplitStrategy};

use rstar::primitives::Rectangle;
use rstar::{AABB, RTree as RStarTree};

fn gen_grid_rects(n: usize, cell: f64) -> Vec<Rect> {
    let mut out = Vec::with_capacity(n * n);
    for y in 0..n {
        for x in 0..n {
            let x0 = x as f64 * cell;
            let y0 = y as f64 * cell;
            out.push(Rect::new(x0, y0, x0 + cell, y0 + cell));
        }
    }
    out
}

fn to_rstar_rects(v: &[Rect]) -> Vec<Rectangle<[f64; 2]>> {
    v.iter()
        .map(|r| Rectangle::from_corners([r.x0, r.y0], [r.x1, r.y1]))
        .collect()
}

fn bench_rtree_external_compare_f64(c: &mut Criterion) {
    let mut group = c.benchmark_group("rtree_external_compare_f64");
    for &n in &[64usize, 128] {
        let rects = gen_grid_rects(n, 10.0);
        let query = Rect::new(100.0, 100.0, 500.0, 500.0);
        group.throughput(Throughput::Elements((n * n) as u64));

        for (name, strategy) in [
            ("quadratic", SplitStrategy::Quadratic),
            ("surface_area", SplitStrategy::SurfaceArea),
        ] {
            let ctx = RTreeContext::with_strategy(strategy);
            group.bench_function(format!("understory_{name}_build_query_n{n}"), |b| {
                b.iter(|| {
                    let mut tree = RTree::new();
                    for (i, r) in rects.iter().copied().enumerate() {
                        tree = tree.add(&ctx, i as u32, r);
                    }
                    black_box(tree.query_rect(query).len());
                });
            });
        }

        group.bench_function(format!("rstar_build_query_bulk_n{n}"), |b| {
            b.iter_batched(
                || to_rstar_rects(&rects),
                |rectangles| {
                    let tree = RStarTree::bulk_load(rectangles);
                    let aabb = AABB::from_corners([query.x0, query.y0], [query.x1, query.y1]);
                    black_box(tree.locate_in_envelope_intersecting(&aabb).count());
                },
                BatchSize::SmallInput,
            );
        });

        let mut built = RTree::new();
        let ctx = RTreeContext::default();
        for (i, r) in rects.iter().copied().enumerate() {
            built = built.add(&ctx, i as u32, r);
        }
        let external = RStarTree::bulk_load(to_rstar_rects(&rects));
        let probe = Point::new(n as f64 * 5.0 + 0.5, n as f64 * 5.0 + 0.5);
        group.bench_function(format!("understory_pick_n{n}"), |b| {
            b.iter(|| black_box(built.get_picked_object(probe)));
        });
        group.bench_function(format!("rstar_pick_n{n}"), |b| {
            b.iter(|| black_box(external.locate_at_point(&[probe.x, probe.y])));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_rtree_external_compare_f64);
criterion_main!(benches);
