//! Kreis auf der Kugel (Mittelpunkt + Winkelradius).

use glam::DVec3;
use std::f64::consts::PI;

use crate::core::vector::SphereVector;

/// Kreis mit Mittelpunkt, Kreispunkt und Winkelradius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    /// Mittelpunkt (Einheitsvektor)
    pub center: DVec3,
    /// Punkt auf dem Kreis, der den Radius festlegt
    pub circle_point: DVec3,
    /// Winkelradius in (0, π)
    pub radius: f64,
}

impl Circle {
    /// Kreis aus Mittelpunkt und Kreispunkt.
    pub fn through(center: DVec3, circle_point: DVec3) -> Self {
        Self {
            center,
            circle_point,
            radius: center.angle_to(circle_point),
        }
    }

    /// Kreis aus Mittelpunkt und Winkelradius; der Kreispunkt wird beliebig gewählt.
    pub fn from_center_radius(center: DVec3, radius: f64) -> Self {
        let circle_point = center * radius.cos() + center.any_perpendicular() * radius.sin();
        Self {
            center,
            circle_point,
            radius,
        }
    }

    /// Setzt Mittelpunkt und Kreispunkt neu und liefert die Existenz.
    ///
    /// Radius nahe 0 oder nahe π ist entartet (Kreis schrumpft auf einen Punkt).
    pub fn set_points(&mut self, center: DVec3, circle_point: DVec3, ideal: f64) -> bool {
        let radius = center.angle_to(circle_point);
        if radius < ideal || radius > PI - ideal {
            return false;
        }
        self.center = center;
        self.circle_point = circle_point;
        self.radius = radius;
        true
    }

    /// Nächster Punkt auf dem Kreis zu `target`.
    ///
    /// Für `target = ±center` sind alle Kreispunkte gleich weit entfernt; dann der Kreispunkt.
    pub fn closest_vector(&self, target: DVec3) -> DVec3 {
        match target.perpendicular_part(self.center).try_normalize() {
            Some(direction) => {
                self.center * self.radius.cos() + direction * self.radius.sin()
            }
            None => self.circle_point,
        }
    }

    /// `true`, wenn `v` auf dem Kreis liegt.
    pub fn contains(&self, v: DVec3, tolerance: f64) -> bool {
        (v.angle_to(self.center) - self.radius).abs() < tolerance
    }

    /// Einheitstangente am Kreispunkt `v` (gegen den Uhrzeigersinn um `center`).
    pub fn tangent_at(&self, v: DVec3) -> DVec3 {
        self.center.cross(v).normalize_or_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn sample_circle() -> Circle {
        Circle::through(
            DVec3::new(0.1, 0.2, 0.95).normalize(),
            DVec3::new(0.6, 0.1, 0.7).normalize(),
        )
    }

    #[test]
    fn closest_vector_lies_on_circle_and_minimizes_distance() {
        let circle = sample_circle();
        let targets = [
            DVec3::new(-0.4, 0.8, 0.2).normalize(),
            DVec3::new(0.9, -0.1, -0.3).normalize(),
            DVec3::new(0.0, 0.0, -1.0),
        ];
        for target in targets {
            let closest = circle.closest_vector(target);
            assert_abs_diff_eq!(closest.angle_to(circle.center), circle.radius, epsilon = 1e-12);

            // Globales Minimum gegenüber einer feinen Abtastung
            let best_distance = closest.angle_to(target);
            let axis = circle.center;
            for i in 0..720 {
                let sample = circle
                    .circle_point
                    .rotate_about(axis, i as f64 * std::f64::consts::TAU / 720.0);
                assert!(sample.angle_to(target) >= best_distance - 1e-12);
            }
        }
    }

    #[test]
    fn degenerate_radius_does_not_exist() {
        let mut circle = sample_circle();
        let before = circle;
        assert!(!circle.set_points(DVec3::Z, DVec3::Z, 1e-3));
        assert!(!circle.set_points(DVec3::Z, -DVec3::Z, 1e-3));
        assert_eq!(circle, before);
        assert!(circle.set_points(DVec3::Z, DVec3::X, 1e-3));
        assert_abs_diff_eq!(circle.radius, std::f64::consts::FRAC_PI_2, epsilon = 1e-12);
    }

    #[test]
    fn center_target_falls_back_to_circle_point() {
        let circle = sample_circle();
        assert_eq!(circle.closest_vector(circle.center), circle.circle_point);
    }

    #[test]
    fn from_center_radius_has_requested_radius() {
        let circle = Circle::from_center_radius(DVec3::Y, 0.4);
        assert_abs_diff_eq!(circle.circle_point.angle_to(DVec3::Y), 0.4, epsilon = 1e-12);
        assert!(circle.contains(circle.circle_point, 1e-12));
    }
}
