//! Integrationstests für Schnittpunkte:
//! - Großkreis × Großkreis (antipodales Paar, Referenzszenario)
//! - Ellipse × Linie (numerische Suche, feste Slot-Anzahl)
//! - Kreis × Kreis (Existenz beim Auseinanderziehen)
//! - Segment × Linie (Bogenfilter je Slot, auch beim Ziehen)

use glam::DVec3;
use spherical_construction::core::shapes::{Circle, Ellipse, Line};
use spherical_construction::{
    intersect, move_object, project_screen_point, AppState, ConstructionGraph, EngineOptions,
    Shape, SphereVector,
};

fn scenario_lines() -> (Line, Line) {
    let p = |x, y| project_screen_point(x, y, 250.0);
    (
        Line::through(p(71.0, 97.0), p(147.0, 181.0)),
        Line::through(p(71.0, 136.0), p(179.0, 53.0)),
    )
}

#[test]
fn test_referenzszenario_liefert_antipodales_paar() {
    let (first, second) = scenario_lines();
    let candidates = intersect(
        &Shape::Line(first),
        &Shape::Line(second),
        &EngineOptions::default(),
    );

    assert_eq!(candidates.len(), 2);
    for candidate in &candidates {
        assert!(candidate.exists);
        assert!(candidate.vector.dot(first.normal).abs() < 1e-12);
        assert!(candidate.vector.dot(second.normal).abs() < 1e-12);
    }
    assert!((candidates[0].vector + candidates[1].vector).length() < 1e-12);

    let expected = DVec3::new(-0.3756, -0.4927, -0.7850);
    let hit = candidates
        .iter()
        .any(|c| c.vector.distance(expected) < 1e-3 || c.vector.distance(-expected) < 1e-3);
    assert!(hit, "Schnittpunkt ±(-0.3756, -0.4927, -0.7850) erwartet");
}

#[test]
fn test_referenzszenario_im_graphen() {
    let mut graph = ConstructionGraph::new(EngineOptions::default());
    let radius = graph.options().sphere_radius_px;
    let mut point = |x, y| {
        graph
            .create_point(project_screen_point(x, y, radius))
            .expect("Punkt")
    };
    let ids = [point(71.0, 97.0), point(147.0, 181.0), point(71.0, 136.0), point(179.0, 53.0)];

    let first = graph.create_line(ids[0], ids[1]).expect("Linie 1");
    let second = graph.create_line(ids[2], ids[3]).expect("Linie 2");
    let crossings = graph.create_intersection_points(first, second).expect("Schnittpunkte");

    let v = graph.location(crossings[0]).expect("v");
    let w = graph.location(crossings[1]).expect("w");
    assert!((v + w).length() < 1e-12);
    assert!(crossings.iter().all(|id| graph.exists(*id)));
}

#[test]
fn test_ellipse_linie_kandidaten_liegen_auf_beiden_formen() {
    let options = EngineOptions::default();
    let ellipse = Ellipse::through(
        DVec3::new(0.3, 0.0, 1.0).normalize(),
        DVec3::new(-0.3, 0.0, 1.0).normalize(),
        DVec3::new(0.0, 0.4, 1.0).normalize(),
        options.curve_sample_count,
    );
    let line = Line::through(DVec3::Z, DVec3::X);
    let candidates = intersect(&Shape::Ellipse(ellipse.clone()), &Shape::Line(line), &options);

    assert_eq!(candidates.len(), 4);
    let existing: Vec<DVec3> = candidates.iter().filter(|c| c.exists).map(|c| c.vector).collect();
    assert!(existing.len() >= 2, "Hauptachse schneidet die Ellipse zweimal");
    for v in existing {
        assert!(ellipse.focal_excess(v).abs() < 1e-6);
        assert!(v.dot(line.normal).abs() < 1e-6);
    }
}

#[test]
fn test_kreise_verlieren_und_gewinnen_schnittpunkte() {
    let mut graph = ConstructionGraph::new(EngineOptions::default());
    let c1 = graph.create_point(DVec3::Z).expect("Zentrum 1");
    let r1 = graph.create_point(DVec3::new(0.5, 0.0, 1.0)).expect("Rand 1");
    let c2 = graph.create_point(DVec3::new(0.4, 0.0, 1.0)).expect("Zentrum 2");
    let r2 = graph.create_point(DVec3::new(0.4, 0.4, 1.0)).expect("Rand 2");
    let k1 = graph.create_circle(c1, r1).expect("Kreis 1");
    let k2 = graph.create_circle(c2, r2).expect("Kreis 2");
    let crossings = graph.create_intersection_points(k1, k2).expect("Schnittpunkte");
    assert_eq!(crossings.len(), 2);
    assert!(crossings.iter().all(|id| graph.exists(*id)));

    let before: Vec<DVec3> = crossings.iter().filter_map(|id| graph.location(*id)).collect();
    graph
        .set_free_point_location(r2, DVec3::new(0.42, 0.0, 1.0), None)
        .expect("Verschieben");
    assert!(crossings.iter().all(|id| !graph.exists(*id)));
    let frozen: Vec<DVec3> = crossings.iter().filter_map(|id| graph.location(*id)).collect();
    assert_eq!(before, frozen);

    graph
        .set_free_point_location(r2, DVec3::new(0.4, 0.4, 1.0), None)
        .expect("Verschieben");
    assert!(crossings.iter().all(|id| graph.exists(*id)));
    for (id, expected) in crossings.iter().zip(&before) {
        let v = graph.location(*id).expect("Ort");
        assert!(v.distance(*expected) < 1e-12, "Reihenfolge muss stabil bleiben");
    }
}

#[test]
fn test_kreis_naechster_punkt_ist_globales_minimum() {
    let circle = Circle::through(DVec3::new(0.1, 0.2, 1.0).normalize(), DVec3::new(0.5, 0.2, 1.0).normalize());
    let target = DVec3::new(-0.3, 0.9, 0.4).normalize();
    let closest = circle.closest_vector(target);

    assert!((closest.angle_to(circle.center) - circle.radius).abs() < 1e-12);
    let best = closest.angle_to(target);
    let rim = circle.closest_vector(DVec3::X);
    for step in 0..360 {
        let sample = rim.rotate_about(circle.center, step as f64 * std::f64::consts::TAU / 360.0);
        assert!(sample.angle_to(target) >= best - 1e-12);
    }
}

#[test]
fn test_segment_schnittpunkt_verlaesst_bogen_und_kehrt_zurueck() {
    let mut state = AppState::new(EngineOptions::default());
    let g = &mut state.graph;
    let start = g.create_point(DVec3::new(1.0, -0.2, 0.0)).expect("Start");
    let end = g.create_point(DVec3::Y).expect("Ende");
    let pole = g.create_point(DVec3::Z).expect("Pol");
    let x = g.create_point(DVec3::X).expect("X");
    let segment = g.create_segment(start, end).expect("Segment");
    let line = g.create_line(pole, x).expect("Linie");
    let crossings = g.create_intersection_points(segment, line).expect("Schnittpunkte");

    let on_arc: Vec<_> = crossings.iter().copied().filter(|id| g.exists(*id)).collect();
    assert_eq!(on_arc.len(), 1, "nur X liegt auf dem Bogen");
    let crossing = on_arc[0];
    assert!(g.location(crossing).expect("Ort").distance(DVec3::X) < 1e-12);

    // Startpunkt über X hinaus ziehen: der Bogen enthält X nicht mehr
    let previous = state.graph.location(start).expect("Ort");
    let current = previous.rotate_about(DVec3::Z, 0.5);
    move_object(&mut state, start, previous, current).expect("hin");
    assert!(crossings.iter().all(|id| !state.graph.exists(*id)));
    assert!(state.graph.location(crossing).expect("Ort").distance(DVec3::X) < 1e-12);

    move_object(&mut state, start, current, previous).expect("zurück");
    assert!(state.graph.exists(crossing));
    assert!(state.graph.location(crossing).expect("Ort").distance(DVec3::X) < 1e-12);
    let existing = crossings.iter().filter(|id| state.graph.exists(**id)).count();
    assert_eq!(existing, 1);
}
