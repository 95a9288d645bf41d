//! Lote und Tangenten durch einen Punkt, geliefert als Normalen der Ergebnis-Großkreise.

use glam::DVec3;

use crate::core::intersection::plane_pair_points;
use crate::core::shapes::sampled::{closest_parameter, find_roots, SampledCurve};
use crate::core::shapes::{Circle, Shape};
use crate::core::vector::SphereVector;
use crate::shared::EngineOptions;

/// Normalen aller Lote von `point` auf `shape`.
///
/// Linie/Segment/Kreis haben genau ein Lot: der Großkreis durch `point` und die
/// Achse trifft die Form in zwei antipodalen Fußpunkten (beim Kreis in den beiden
/// Punkten auf dem Meridian), beide liegen auf demselben Lot. Im entarteten Fall (Punkt auf der
/// Achse) wird `old_normal_hint` senkrecht zu `point` projiziert, damit das Lot
/// nicht springt.
pub fn normals_to_perpendicular_lines_thru(
    shape: &Shape,
    point: DVec3,
    old_normal_hint: DVec3,
    options: &EngineOptions,
) -> Vec<DVec3> {
    let axis = match shape {
        Shape::Line(line) => line.normal,
        Shape::Segment(segment) => segment.normal,
        Shape::Circle(circle) => circle.center,
        Shape::Ellipse(_) | Shape::Parametric(_) => {
            return match shape.as_curve() {
                Some(curve) => sampled_perpendiculars(curve, point, options),
                None => Vec::new(),
            };
        }
    };
    let cross = axis.cross(point);
    if cross.length() < options.nearly_antipodal_ideal {
        return vec![hint_normal(old_normal_hint, point)];
    }
    vec![cross.normalize()]
}

/// Normalen aller Tangenten an `shape` durch `point`.
pub fn normals_to_tangent_lines_thru(shape: &Shape, point: DVec3, options: &EngineOptions) -> Vec<DVec3> {
    match shape {
        Shape::Line(line) if line.contains(point, options.tolerance) => vec![line.normal],
        Shape::Segment(segment) if point.dot(segment.normal).abs() < options.tolerance => {
            vec![segment.normal]
        }
        Shape::Line(_) | Shape::Segment(_) => Vec::new(),
        Shape::Circle(circle) => circle_tangents(circle, point, options),
        Shape::Ellipse(_) | Shape::Parametric(_) => match shape.as_curve() {
            Some(curve) => sampled_tangents(curve, point, options),
            None => Vec::new(),
        },
    }
}

/// Projiziert den Hinweis senkrecht zu `point`; ohne brauchbaren Hinweis beliebig.
fn hint_normal(hint: DVec3, point: DVec3) -> DVec3 {
    hint.perpendicular_part(point)
        .try_normalize()
        .unwrap_or_else(|| point.any_perpendicular())
}

/// Tangentenpunkte Q erfüllen `Q·c = cos r` und `Q·P = (c·P)/cos r`.
fn circle_tangents(circle: &Circle, point: DVec3, options: &EngineOptions) -> Vec<DVec3> {
    let cos_r = circle.radius.cos();
    if cos_r.abs() < options.nearly_antipodal_ideal {
        // Radius π/2: der Kreis ist ein Großkreis
        return if point.dot(circle.center).abs() < options.tolerance {
            vec![circle.center]
        } else {
            Vec::new()
        };
    }
    if circle.contains(point, options.tolerance) {
        return (circle.center - cos_r * point)
            .try_normalize()
            .into_iter()
            .collect();
    }
    let target = circle.center.dot(point) / cos_r;
    match plane_pair_points(circle.center, cos_r, point, target, options.tolerance) {
        Some(touch_points) => touch_points
            .into_iter()
            .filter_map(|q| (circle.center - cos_r * q).try_normalize())
            .collect(),
        None => Vec::new(),
    }
}

/// Lote auf eine abgetastete Kurve: Nullstellen von `P'(t)·X`.
fn sampled_perpendiculars(curve: &dyn SampledCurve, point: DVec3, options: &EngineOptions) -> Vec<DVec3> {
    let roots = find_roots(curve, |t| {
        (
            curve.first_derivative(t).dot(point),
            curve.second_derivative(t).dot(point),
        )
    });
    let normals = roots.into_iter().filter_map(|t| {
        let foot = curve.point(t);
        let normal = point.cross(foot);
        if normal.length() < options.nearly_antipodal_ideal {
            // Punkt liegt auf der Kurve (oder ihr gegenüber): Lot = Tangentenrichtung
            curve.first_derivative(t).try_normalize()
        } else {
            normal.try_normalize()
        }
    });
    dedup_normals(normals, options.normal_dedup_tolerance)
}

/// Tangenten an eine abgetastete Kurve: Nullstellen von `X·(P × P')`.
fn sampled_tangents(curve: &dyn SampledCurve, point: DVec3, options: &EngineOptions) -> Vec<DVec3> {
    let tangent_normal = |t: f64| curve.point(t).cross(curve.first_derivative(t));
    let roots = find_roots(curve, |t| {
        (
            point.dot(tangent_normal(t)),
            point.dot(curve.point(t).cross(curve.second_derivative(t))),
        )
    });

    let mut normals: Vec<DVec3> = Vec::new();
    // Punkt auf der Kurve: die lokale Tangente ist immer dabei
    if let Some((t, foot)) = closest_parameter(curve, point) {
        if foot.distance(point) < options.nearly_antipodal_ideal {
            normals.extend(tangent_normal(t).try_normalize());
        }
    }
    normals.extend(roots.into_iter().filter_map(|t| tangent_normal(t).try_normalize()));
    dedup_normals(normals, options.normal_dedup_tolerance)
}

/// Entfernt Normalen, die (bis auf das Vorzeichen) bereits vorkommen.
fn dedup_normals(normals: impl IntoIterator<Item = DVec3>, tolerance: f64) -> Vec<DVec3> {
    let mut unique: Vec<DVec3> = Vec::new();
    for normal in normals {
        if unique.iter().all(|u| u.dot(normal).abs() <= 1.0 - tolerance) {
            unique.push(normal);
        }
    }
    unique
}
