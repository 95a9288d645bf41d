//! Vektor-Hilfsfunktionen auf der Einheitskugel.
//!
//! Alle Orte sind Einheitsvektoren (`DVec3`); Winkel sind Radiant.

use glam::{DQuat, DVec3};

/// Erweiterung von `DVec3` um die sphärischen Grundoperationen.
pub trait SphereVector: Copy {
    /// Winkelabstand zweier Vektoren in [0, π], numerisch stabil über atan2.
    fn angle_to(self, other: Self) -> f64;
    /// `true`, wenn alle Komponenten betragsmäßig unter `tolerance` liegen.
    fn is_zero_within(self, tolerance: f64) -> bool;
    /// Spiegelung an der Ebene mit Einheitsnormale `normal`.
    fn reflect_across(self, normal: Self) -> Self;
    /// Drehung um die (nicht zwingend normierte) Achse `axis` um `angle`.
    fn rotate_about(self, axis: Self, angle: f64) -> Self;
    /// Anteil senkrecht zum Einheitsvektor `unit`.
    fn perpendicular_part(self, unit: Self) -> Self;
    /// Ein beliebiger Einheitsvektor senkrecht zu `self`.
    fn any_perpendicular(self) -> Self;
}

impl SphereVector for DVec3 {
    fn angle_to(self, other: Self) -> f64 {
        self.cross(other).length().atan2(self.dot(other))
    }

    fn is_zero_within(self, tolerance: f64) -> bool {
        self.x.abs() < tolerance && self.y.abs() < tolerance && self.z.abs() < tolerance
    }

    fn reflect_across(self, normal: Self) -> Self {
        self - 2.0 * self.dot(normal) * normal
    }

    fn rotate_about(self, axis: Self, angle: f64) -> Self {
        match axis.try_normalize() {
            Some(axis) => DQuat::from_axis_angle(axis, angle).mul_vec3(self),
            None => self,
        }
    }

    fn perpendicular_part(self, unit: Self) -> Self {
        self - self.dot(unit) * unit
    }

    fn any_perpendicular(self) -> Self {
        // Die betragsmäßig kleinste Komponente liefert die stabilste Kreuzprodukt-Basis
        let helper = if self.x.abs() <= self.y.abs() && self.x.abs() <= self.z.abs() {
            DVec3::X
        } else if self.y.abs() <= self.z.abs() {
            DVec3::Y
        } else {
            DVec3::Z
        };
        self.cross(helper).normalize_or_zero()
    }
}

/// Projiziert einen Screen-Punkt (Ursprung im Kugelmittelpunkt) auf die vordere Halbkugel.
///
/// Punkte außerhalb der Silhouette landen auf dem Rand (z = 0).
pub fn project_screen_point(x: f64, y: f64, sphere_radius_px: f64) -> DVec3 {
    let planar = DVec3::new(x / sphere_radius_px, y / sphere_radius_px, 0.0);
    let planar_sq = planar.length_squared();
    if planar_sq >= 1.0 {
        return planar.normalize_or_zero();
    }
    DVec3::new(planar.x, planar.y, (1.0 - planar_sq).sqrt())
}

/// Rotation, die `previous` auf `current` abbildet: (Achse, Winkel).
///
/// Gibt `None` zurück, wenn beide Vektoren (fast) parallel oder antipodal sind
/// und damit keine eindeutige Drehachse existiert.
pub fn drag_rotation(previous: DVec3, current: DVec3, tolerance: f64) -> Option<(DVec3, f64)> {
    let axis = previous.cross(current);
    if axis.length() < tolerance {
        return None;
    }
    Some((axis.normalize(), previous.angle_to(current)))
}

/// Schneller Test auf (fast) gleich oder antipodal über die Kreuzprodukt-Länge.
pub fn nearly_parallel(a: DVec3, b: DVec3, ideal: f64) -> bool {
    a.cross(b).length() < ideal
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn angle_to_is_stable_near_zero_and_pi() {
        let a = DVec3::X;
        let b = DVec3::new(1.0, 1e-9, 0.0).normalize();
        assert_abs_diff_eq!(a.angle_to(b), 1e-9, epsilon = 1e-15);
        assert_abs_diff_eq!(a.angle_to(-a), PI, epsilon = 1e-12);
        assert_abs_diff_eq!(a.angle_to(DVec3::Y), FRAC_PI_2, epsilon = 1e-12);
    }

    #[test]
    fn reflect_across_plane_flips_normal_component() {
        let v = DVec3::new(0.3, 0.4, 0.5);
        let reflected = v.reflect_across(DVec3::Z);
        assert_abs_diff_eq!(reflected.z, -0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(reflected.x, 0.3, epsilon = 1e-12);
    }

    #[test]
    fn rotate_about_quarter_turn() {
        let rotated = DVec3::X.rotate_about(DVec3::Z, FRAC_PI_2);
        assert_abs_diff_eq!(rotated.y, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(rotated.x, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn any_perpendicular_is_unit_and_orthogonal() {
        for v in [DVec3::X, DVec3::new(0.2, -0.9, 0.1).normalize(), DVec3::Z] {
            let p = v.any_perpendicular();
            assert_abs_diff_eq!(p.length(), 1.0, epsilon = 1e-12);
            assert_abs_diff_eq!(p.dot(v), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn screen_projection_lands_on_unit_sphere() {
        let v = project_screen_point(71.0, 97.0, 250.0);
        assert_abs_diff_eq!(v.length(), 1.0, epsilon = 1e-12);
        assert!(v.z > 0.0);

        let outside = project_screen_point(400.0, 0.0, 250.0);
        assert_abs_diff_eq!(outside.distance(DVec3::X), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn drag_rotation_maps_previous_onto_current() {
        let previous = DVec3::new(0.1, 0.2, 0.9).normalize();
        let current = DVec3::new(-0.3, 0.1, 0.8).normalize();
        let (axis, angle) = drag_rotation(previous, current, 1e-12).expect("Drehung erwartet");
        let moved = previous.rotate_about(axis, angle);
        assert_abs_diff_eq!(moved.distance(current), 0.0, epsilon = 1e-12);

        assert!(drag_rotation(previous, previous, 1e-12).is_none());
    }
}
