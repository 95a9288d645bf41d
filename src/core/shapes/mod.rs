//! Eindimensionale Formen auf der Kugel.
//!
//! `Shape` ist ein geschlossener Enum; gemeinsame Fähigkeiten (nächster Punkt,
//! Hit-Test, Abbildung unter Isometrien) werden per `match` verteilt.

pub mod circle;
pub mod ellipse;
pub mod line;
pub mod parametric;
pub mod sampled;
pub mod segment;

pub use circle::Circle;
pub use ellipse::Ellipse;
pub use line::Line;
pub use parametric::{ParametricCurve, ParametricDefinition};
pub use sampled::{SampleGrid, SampledCurve};
pub use segment::Segment;

use anyhow::bail;
use glam::DVec3;

use crate::core::transformation::Isometry;
use crate::core::vector::SphereVector;

/// Art einer Form (für Namensvergabe, Logs und Slot-Regeln).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Line,
    Segment,
    Circle,
    Ellipse,
    Parametric,
}

/// Geometrischer Zustand einer Form.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Line(Line),
    Segment(Segment),
    Circle(Circle),
    Ellipse(Ellipse),
    Parametric(ParametricCurve),
}

impl Shape {
    /// Art der Form.
    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Line(_) => ShapeKind::Line,
            Shape::Segment(_) => ShapeKind::Segment,
            Shape::Circle(_) => ShapeKind::Circle,
            Shape::Ellipse(_) => ShapeKind::Ellipse,
            Shape::Parametric(_) => ShapeKind::Parametric,
        }
    }

    /// Normale des Großkreises für Linie und Segment.
    pub fn great_circle_normal(&self) -> Option<DVec3> {
        match self {
            Shape::Line(line) => Some(line.normal),
            Shape::Segment(segment) => Some(segment.normal),
            _ => None,
        }
    }

    /// Nächster Punkt der Form zu `target`.
    pub fn closest_vector(&self, target: DVec3) -> DVec3 {
        match self {
            Shape::Line(line) => line.closest_vector(target),
            Shape::Segment(segment) => segment.closest_vector(target),
            Shape::Circle(circle) => circle.closest_vector(target),
            Shape::Ellipse(ellipse) => ellipse.closest_vector(target),
            Shape::Parametric(curve) => curve.closest_vector(target),
        }
    }

    /// `true`, wenn `v` auf der Form liegt (Segmente: innerhalb des Bogens).
    pub fn contains(&self, v: DVec3, tolerance: f64) -> bool {
        match self {
            Shape::Line(line) => line.contains(v, tolerance),
            Shape::Segment(segment) => {
                v.dot(segment.normal).abs() < tolerance && segment.contains_on_arc(v, tolerance)
            }
            Shape::Circle(circle) => circle.contains(v, tolerance),
            Shape::Ellipse(ellipse) => ellipse.contains(v, tolerance),
            Shape::Parametric(curve) => curve.contains(v, tolerance),
        }
    }

    /// Hit-Test: Winkelabstand zum nächsten Punkt kleiner als `tolerance`.
    pub fn is_hit_at(&self, target: DVec3, tolerance: f64) -> bool {
        self.closest_vector(target).angle_to(target) < tolerance
    }

    /// Abgetastete Darstellung für Ellipse und Parameterkurve.
    pub fn as_curve(&self) -> Option<&dyn SampledCurve> {
        match self {
            Shape::Ellipse(ellipse) => Some(ellipse),
            Shape::Parametric(curve) => Some(curve),
            _ => None,
        }
    }

    /// Bild der Form unter einer Isometrie.
    ///
    /// Die Inversion bildet Formen nicht auf Formen derselben Art ab und wird abgelehnt.
    pub fn mapped(&self, isometry: &Isometry) -> anyhow::Result<Shape> {
        let Some(m) = isometry.linear_part() else {
            bail!("Inversion von {:?} wird nicht unterstützt", self.kind());
        };
        let normal = |n: DVec3| isometry.map_normal(n).unwrap_or(m * n);
        Ok(match self {
            Shape::Line(line) => Shape::Line(Line {
                start: m * line.start,
                end: m * line.end,
                normal: normal(line.normal),
            }),
            Shape::Segment(segment) => Shape::Segment(Segment {
                start: m * segment.start,
                end: m * segment.end,
                normal: normal(segment.normal),
                arc_length: segment.arc_length,
            }),
            Shape::Circle(circle) => Shape::Circle(Circle {
                center: m * circle.center,
                circle_point: m * circle.circle_point,
                radius: circle.radius,
            }),
            Shape::Ellipse(ellipse) => Shape::Ellipse(ellipse.mapped(m)),
            Shape::Parametric(curve) => Shape::Parametric(curve.mapped(m)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn segment_contains_only_its_arc() {
        let shape = Shape::Segment(Segment::through(DVec3::X, DVec3::Y));
        assert!(shape.contains(DVec3::new(1.0, 1.0, 0.0).normalize(), 1e-9));
        assert!(!shape.contains(-DVec3::X, 1e-9));
        assert!(!shape.contains(DVec3::Z, 1e-9));
    }

    #[test]
    fn hit_test_uses_angular_distance() {
        let shape = Shape::Circle(Circle::from_center_radius(DVec3::Z, 0.5));
        let near = DVec3::Z.rotate_about(DVec3::X, 0.52);
        assert!(shape.is_hit_at(near, 0.03));
        assert!(!shape.is_hit_at(near, 0.01));
    }

    #[test]
    fn reflected_segment_keeps_arc() {
        let segment = Segment::with_normal(DVec3::X, DVec3::Y, -DVec3::Z);
        let image = Shape::Segment(segment)
            .mapped(&Isometry::Reflection { normal: DVec3::X })
            .expect("Spiegelung");
        let Shape::Segment(image) = image else {
            panic!("Segment erwartet");
        };
        // Bogen läuft weiterhin über die Bilder der ursprünglichen Bogenpunkte
        let mid_before = segment.midpoint();
        assert!(image.midpoint().distance(mid_before.reflect_across(DVec3::X)) < 1e-12);
        assert_abs_diff_eq!(image.arc_length, segment.arc_length, epsilon = 1e-12);
    }

    #[test]
    fn mapped_line_normal_follows_mapped_points() {
        let line = Line::through(DVec3::new(0.3, 0.4, 0.8).normalize(), DVec3::new(-0.5, 0.2, 0.7).normalize());
        for iso in [
            Isometry::Reflection { normal: DVec3::new(1.0, -0.2, 0.1).normalize() },
            Isometry::Rotation { axis: DVec3::Y, angle: 0.9 },
        ] {
            let Ok(Shape::Line(image)) = Shape::Line(line).mapped(&iso) else {
                panic!("Linie erwartet");
            };
            let expected = image.start.cross(image.end).normalize();
            assert!(image.normal.distance(expected) < 1e-12, "{iso:?}");
        }
    }

    #[test]
    fn inversion_of_shapes_is_rejected() {
        let shape = Shape::Line(Line::through(DVec3::X, DVec3::Y));
        let inversion = Isometry::Inversion {
            center: DVec3::Z,
            radius: 0.4,
        };
        assert!(shape.mapped(&inversion).is_err());
    }
}
