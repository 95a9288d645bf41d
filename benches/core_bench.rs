use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::DVec3;
use spherical_construction::core::shapes::{Ellipse, Line};
use spherical_construction::{intersect, ConstructionGraph, EngineOptions, NodeId, Shape};
use std::hint::black_box;

/// Kette aus Linien und Schnittpunkten: jede Stufe hängt an der vorherigen.
fn build_chain(depth: usize) -> (ConstructionGraph, NodeId) {
    let mut graph = ConstructionGraph::new(EngineOptions::default());
    let root = graph
        .create_point(DVec3::new(0.1, 0.2, 1.0))
        .expect("Wurzelpunkt");
    let mut previous = root;

    for level in 0..depth {
        let angle = level as f64 * 0.37;
        let anchor = graph
            .create_point(DVec3::new(angle.cos(), angle.sin(), 0.4))
            .expect("Ankerpunkt");
        let other = graph
            .create_point(DVec3::new(-angle.sin(), angle.cos(), -0.3))
            .expect("Punkt");
        let line = graph.create_line(previous, anchor).expect("Linie");
        let guide = graph.create_line(other, root).expect("Leitlinie");
        let crossing = graph
            .create_intersection_point(guide, line, 0)
            .expect("Schnittpunkt");
        previous = crossing;
    }

    (graph, root)
}

fn bench_update_pass(c: &mut Criterion) {
    let mut group = c.benchmark_group("update_pass");

    for &depth in &[10usize, 100usize] {
        let (graph, root) = build_chain(depth);
        group.bench_with_input(BenchmarkId::new("chain", depth), &graph, |b, graph| {
            let mut graph = graph.clone();
            let mut step = 0.0_f64;
            b.iter(|| {
                step += 1e-3;
                let location = DVec3::new(0.1 + step.sin() * 0.05, 0.2, 1.0);
                graph
                    .set_free_point_location(root, black_box(location), None)
                    .expect("Update");
                black_box(graph.node_count())
            })
        });
    }

    group.finish();
}

fn bench_intersections(c: &mut Criterion) {
    let options = EngineOptions::default();
    let ellipse = Shape::Ellipse(Ellipse::through(
        DVec3::new(0.3, 0.0, 1.0).normalize(),
        DVec3::new(-0.3, 0.0, 1.0).normalize(),
        DVec3::new(0.0, 0.4, 1.0).normalize(),
        options.curve_sample_count,
    ));
    let line = Shape::Line(Line::through(DVec3::Z, DVec3::new(1.0, 0.3, 0.0)));
    let other = Shape::Line(Line::through(DVec3::X, DVec3::new(0.0, 0.6, 0.8)));

    c.bench_function("intersect_line_line", |b| {
        b.iter(|| black_box(intersect(black_box(&line), black_box(&other), &options)))
    });
    c.bench_function("intersect_ellipse_line", |b| {
        b.iter(|| black_box(intersect(black_box(&ellipse), black_box(&line), &options)))
    });
}

criterion_group!(benches, bench_update_pass, bench_intersections);
criterion_main!(benches);
