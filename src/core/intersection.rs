//! Schnittpunkte zweier Formen mit fester, paarabhängiger Anzahl.
//!
//! Die Reihenfolge der Kandidaten ist stabil: ein Schnittpunkt-Node merkt sich
//! nur seinen Index (`order`) und findet nach jedem Update "seinen" Punkt wieder.
//!
//! | Paar | Anzahl | Reihenfolge |
//! |---|---|---|
//! | Linie/Segment × Linie/Segment | 2 | `[v, −v]` |
//! | Linie/Segment × Kreis | 2 | `[αu + βw, αu − βw]` |
//! | Kreis × Kreis | 2 | `[q + z·m, q − z·m]` |
//! | … × Ellipse | 4 | aufsteigender Ellipsenparameter |
//! | … × Parameterkurve | Slots der Kurve | aufsteigender Kurvenparameter |

use glam::DVec3;

use crate::core::shapes::sampled::{find_roots, SampledCurve};
use crate::core::shapes::{Circle, Shape, ShapeKind};
use crate::shared::EngineOptions;

/// Anzahl Kandidaten, sobald eine Ellipse beteiligt ist.
pub const ELLIPSE_SLOTS: usize = 4;

/// Numerisch gefundene Wurzeln müssen die implizite Funktion so genau erfüllen.
const ROOT_CHECK_TOLERANCE: f64 = 1e-6;

/// Ein Schnittkandidat; nicht existierende Kandidaten füllen die festen Slots auf.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub vector: DVec3,
    pub exists: bool,
}

impl Candidate {
    fn some(vector: DVec3) -> Self {
        Self {
            vector,
            exists: true,
        }
    }

    fn none() -> Self {
        Self {
            vector: DVec3::ZERO,
            exists: false,
        }
    }
}

/// Feste Anzahl Kandidaten für das Paar `(a, b)`.
pub fn slot_count(a: &Shape, b: &Shape) -> usize {
    match (a, b) {
        (Shape::Parametric(curve), _) | (_, Shape::Parametric(curve)) => curve.intersection_slots(),
        (Shape::Ellipse(_), _) | (_, Shape::Ellipse(_)) => ELLIPSE_SLOTS,
        _ => 2,
    }
}

/// Alle Schnittkandidaten von `a` und `b` in stabiler Reihenfolge.
pub fn intersect(a: &Shape, b: &Shape, options: &EngineOptions) -> Vec<Candidate> {
    let ideal = options.nearly_antipodal_ideal;
    let candidates = match (a, b) {
        (Shape::Line(_) | Shape::Segment(_), Shape::Line(_) | Shape::Segment(_)) => {
            match (a.great_circle_normal(), b.great_circle_normal()) {
                (Some(n1), Some(n2)) => line_line(n1, n2, ideal),
                _ => vec![Candidate::none(); 2],
            }
        }
        (Shape::Line(_) | Shape::Segment(_), Shape::Circle(circle))
        | (Shape::Circle(circle), Shape::Line(_) | Shape::Segment(_)) => {
            let normal = a
                .great_circle_normal()
                .or_else(|| b.great_circle_normal())
                .unwrap_or(DVec3::Z);
            line_circle(normal, circle, ideal)
        }
        (Shape::Circle(c1), Shape::Circle(c2)) => circle_circle(c1, c2, ideal),
        _ => numeric(a, b),
    };
    filter_segments(candidates, a, b, options.tolerance)
}

/// Kandidaten außerhalb eines beteiligten Segment-Bogens existieren nicht.
fn filter_segments(mut candidates: Vec<Candidate>, a: &Shape, b: &Shape, tolerance: f64) -> Vec<Candidate> {
    for shape in [a, b] {
        if let Shape::Segment(segment) = shape {
            for candidate in candidates.iter_mut().filter(|c| c.exists) {
                candidate.exists = segment.contains_on_arc(candidate.vector, tolerance);
            }
        }
    }
    candidates
}

fn line_line(n1: DVec3, n2: DVec3, ideal: f64) -> Vec<Candidate> {
    let cross = n1.cross(n2);
    if cross.length() < ideal {
        return vec![Candidate::none(); 2];
    }
    let v = cross.normalize();
    vec![Candidate::some(v), Candidate::some(-v)]
}

fn line_circle(normal: DVec3, circle: &Circle, ideal: f64) -> Vec<Candidate> {
    match plane_pair_points(normal, 0.0, circle.center, circle.radius.cos(), ideal) {
        Some([first, second]) => vec![Candidate::some(first), Candidate::some(second)],
        None => vec![Candidate::none(); 2],
    }
}

fn circle_circle(c1: &Circle, c2: &Circle, ideal: f64) -> Vec<Candidate> {
    match plane_pair_points(c1.center, c1.radius.cos(), c2.center, c2.radius.cos(), ideal) {
        Some([first, second]) => vec![Candidate::some(first), Candidate::some(second)],
        None => vec![Candidate::none(); 2],
    }
}

/// Einheitsvektoren X mit `X·n1 = d1` und `X·n2 = d2`.
///
/// `X = q ± z·m` mit `m = normalize(n1 × n2)` und `q` in der Ebene von n1, n2.
/// `None`, wenn die Ebenen parallel sind oder die Schnittgerade die Kugel verfehlt.
pub(crate) fn plane_pair_points(n1: DVec3, d1: f64, n2: DVec3, d2: f64, ideal: f64) -> Option<[DVec3; 2]> {
    let cross = n1.cross(n2);
    if cross.length() < ideal {
        return None;
    }
    let m = cross.normalize();
    let k = n1.dot(n2);
    let det = 1.0 - k * k;
    let x = (d1 - k * d2) / det;
    let y = (d2 - k * d1) / det;
    let q = n1 * x + n2 * y;
    let z_sq = 1.0 - q.length_squared();
    if z_sq < 0.0 {
        return None;
    }
    let z = z_sq.sqrt();
    Some([q + m * z, q - m * z])
}

/// Implizite Funktion einer Form: (Wert, Gradient); Nullstellenmenge = Form.
fn implicit(shape: &Shape, v: DVec3) -> (f64, DVec3) {
    match shape {
        Shape::Line(line) => (v.dot(line.normal), line.normal),
        Shape::Segment(segment) => (v.dot(segment.normal), segment.normal),
        Shape::Circle(circle) => (v.dot(circle.center) - circle.radius.cos(), circle.center),
        Shape::Ellipse(ellipse) => (ellipse.focal_excess(v), ellipse.focal_gradient(v)),
        Shape::Parametric(curve) => curve.signed_distance(v),
    }
}

/// Numerischer Schnitt: Nullstellen der impliziten Funktion der einen Form entlang
/// des Parameters der anderen (Parameterkurve vor Ellipse, sonst `a`).
fn numeric(a: &Shape, b: &Shape) -> Vec<Candidate> {
    let slots = slot_count(a, b);
    let (walked, other) = match (a.kind(), b.kind()) {
        (ShapeKind::Parametric, _) => (a, b),
        (_, ShapeKind::Parametric) => (b, a),
        (ShapeKind::Ellipse, _) => (a, b),
        _ => (b, a),
    };
    let Some(curve) = walked.as_curve() else {
        return vec![Candidate::none(); slots];
    };

    let roots = find_roots(curve, |t| {
        let point = curve.point(t);
        let (value, gradient) = implicit(other, point);
        (value, gradient.dot(curve.first_derivative(t)))
    });

    // Die Ellipsen-Funktion ist in den Brennpunkten nicht glatt: Wurzeln nachprüfen
    let mut candidates: Vec<Candidate> = roots
        .into_iter()
        .map(|t| curve.point(t))
        .filter(|v| implicit(other, *v).0.abs() < ROOT_CHECK_TOLERANCE)
        .map(Candidate::some)
        .take(slots)
        .collect();
    if candidates.len() < slots {
        log::trace!("{} von {slots} Schnitt-Slots belegt", candidates.len());
    }
    candidates.resize(slots, Candidate::none());
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::shapes::{Ellipse, Line, ParametricCurve, ParametricDefinition, Segment};
    use crate::core::vector::SphereVector;
    use approx::assert_abs_diff_eq;
    use indexmap::IndexMap;

    fn options() -> EngineOptions {
        EngineOptions::default()
    }

    #[test]
    fn line_line_returns_antipodal_pair() {
        let a = Shape::Line(Line::through(DVec3::X, DVec3::Y));
        let b = Shape::Line(Line::through(DVec3::X, DVec3::Z));
        let candidates = intersect(&a, &b, &options());
        assert_eq!(candidates.len(), 2);
        assert!(candidates.iter().all(|c| c.exists));
        assert!((candidates[0].vector + candidates[1].vector).length() < 1e-12);
        assert!(candidates[0].vector.distance(DVec3::X) < 1e-12 || candidates[1].vector.distance(DVec3::X) < 1e-12);
    }

    #[test]
    fn identical_lines_do_not_intersect() {
        let a = Shape::Line(Line::through(DVec3::X, DVec3::Y));
        let candidates = intersect(&a, &a.clone(), &options());
        assert_eq!(candidates.len(), 2);
        assert!(candidates.iter().all(|c| !c.exists));
    }

    #[test]
    fn segment_filters_line_candidates() {
        let segment = Shape::Segment(Segment::through(DVec3::new(1.0, -0.2, 0.0).normalize(), DVec3::Y));
        let line = Shape::Line(Line::through(DVec3::X, DVec3::Z));
        let candidates = intersect(&segment, &line, &options());
        let existing: Vec<_> = candidates.iter().filter(|c| c.exists).collect();
        assert_eq!(existing.len(), 1);
        assert!(existing[0].vector.distance(DVec3::X) < 1e-12);
    }

    #[test]
    fn circle_circle_points_lie_on_both() {
        let c1 = Circle::from_center_radius(DVec3::Z, 0.8);
        let c2 = Circle::from_center_radius(DVec3::new(0.5, 0.0, 0.85).normalize(), 0.6);
        let candidates = intersect(&Shape::Circle(c1), &Shape::Circle(c2), &options());
        for candidate in &candidates {
            assert!(candidate.exists);
            assert_abs_diff_eq!(candidate.vector.length(), 1.0, epsilon = 1e-12);
            assert!(c1.contains(candidate.vector, 1e-9));
            assert!(c2.contains(candidate.vector, 1e-9));
        }
    }

    #[test]
    fn disjoint_circles_have_no_candidates() {
        let c1 = Circle::from_center_radius(DVec3::Z, 0.2);
        let c2 = Circle::from_center_radius(-DVec3::Z, 0.2);
        let candidates = intersect(&Shape::Circle(c1), &Shape::Circle(c2), &options());
        assert!(candidates.iter().all(|c| !c.exists));
    }

    #[test]
    fn line_circle_points_lie_on_both() {
        let line = Line::through(DVec3::X, DVec3::new(0.0, 0.6, 0.8));
        let circle = Circle::from_center_radius(DVec3::new(0.3, 0.3, 0.9).normalize(), 0.7);
        let candidates = intersect(&Shape::Line(line), &Shape::Circle(circle), &options());
        for candidate in &candidates {
            assert!(candidate.exists);
            assert!(line.contains(candidate.vector, 1e-9));
            assert!(circle.contains(candidate.vector, 1e-9));
        }
        let swapped = intersect(&Shape::Circle(circle), &Shape::Line(line), &options());
        assert_eq!(candidates, swapped);
    }

    #[test]
    fn ellipse_line_has_four_slots() {
        let ellipse = Ellipse::through(
            DVec3::new(0.3, 0.0, 0.95).normalize(),
            DVec3::new(-0.3, 0.0, 0.95).normalize(),
            DVec3::new(0.0, 0.4, 0.9).normalize(),
            100,
        );
        // Großkreis durch den Ellipsenmittelpunkt: genau zwei Schnittpunkte
        let line = Line::through(DVec3::Z, DVec3::X);
        let candidates = intersect(&Shape::Ellipse(ellipse.clone()), &Shape::Line(line), &options());
        assert_eq!(candidates.len(), ELLIPSE_SLOTS);
        let existing: Vec<_> = candidates.iter().filter(|c| c.exists).collect();
        assert_eq!(existing.len(), 2);
        for candidate in existing {
            assert_abs_diff_eq!(candidate.vector.dot(line.normal), 0.0, epsilon = 1e-9);
            assert_abs_diff_eq!(ellipse.focal_excess(candidate.vector), 0.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn parametric_circle_uses_slot_count() {
        let definition =
            ParametricDefinition::parse("cos(t)", "sin(t)", "0", "0", "2*pi", Vec::new())
                .expect("Formeln gültig");
        let mut curve = ParametricCurve::new(definition, 100, 8);
        assert!(curve.refresh(IndexMap::new()));
        let circle = Circle::from_center_radius(DVec3::X, 0.5);
        let candidates = intersect(&Shape::Parametric(curve), &Shape::Circle(circle), &options());
        assert_eq!(candidates.len(), 8);
        let existing: Vec<_> = candidates.iter().filter(|c| c.exists).collect();
        assert_eq!(existing.len(), 2);
        for candidate in existing {
            assert_abs_diff_eq!(candidate.vector.z, 0.0, epsilon = 1e-9);
            assert_abs_diff_eq!(candidate.vector.angle_to(DVec3::X), 0.5, epsilon = 1e-9);
        }
    }
}
