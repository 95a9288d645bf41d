//! Isometrien der Kugel und sphärische Inversion.
//!
//! Transformations-Nodes im Graphen lösen sich bei jedem Update zu einer
//! `Isometry` auf; Bild-Nodes wenden sie auf ihr Urbild an.

use glam::{DMat3, DVec3};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::core::vector::SphereVector;

/// Unterhalb dieses Winkels gilt ein Punkt bei der Inversion als Zentrum bzw. Antipode.
const INVERSION_POLE_TOLERANCE: f64 = 1e-12;

/// Eine aufgelöste Abbildung `DVec3 → DVec3`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Isometry {
    /// Keine Veränderung (z.B. solange die Transformation nicht existiert)
    Identity,
    /// Drehung um `axis` (Einheitsvektor) um `angle`
    Rotation { axis: DVec3, angle: f64 },
    /// Spiegelung an der Ebene mit Einheitsnormale `normal`
    Reflection { normal: DVec3 },
    /// Inversion am Kreis um `center` mit Winkelradius `radius`
    Inversion { center: DVec3, radius: f64 },
}

impl Isometry {
    /// Punktspiegelung an `center` = Drehung um π.
    pub fn point_reflection(center: DVec3) -> Self {
        Isometry::Rotation {
            axis: center,
            angle: PI,
        }
    }

    /// Verschiebung entlang eines Großkreises = Drehung um dessen Normale.
    pub fn translation(line_normal: DVec3, distance: f64) -> Self {
        Isometry::Rotation {
            axis: line_normal,
            angle: distance,
        }
    }

    /// Wendet die Abbildung auf einen Einheitsvektor an.
    pub fn apply(&self, v: DVec3) -> DVec3 {
        match *self {
            Isometry::Identity => v,
            Isometry::Rotation { axis, angle } => v.rotate_about(axis, angle),
            Isometry::Reflection { normal } => v.reflect_across(normal),
            Isometry::Inversion { center, radius } => invert(v, center, radius),
        }
    }

    /// Lineare Darstellung als orthogonale Matrix; `None` für die Inversion.
    pub fn linear_part(&self) -> Option<DMat3> {
        match *self {
            Isometry::Identity => Some(DMat3::IDENTITY),
            Isometry::Rotation { axis, angle } => Some(match axis.try_normalize() {
                Some(axis) => DMat3::from_axis_angle(axis, angle),
                None => DMat3::IDENTITY,
            }),
            Isometry::Reflection { normal } => Some(DMat3::from_cols(
                DVec3::X.reflect_across(normal),
                DVec3::Y.reflect_across(normal),
                DVec3::Z.reflect_across(normal),
            )),
            Isometry::Inversion { .. } => None,
        }
    }

    /// Bildet eine Ebenennormale ab: `det(M)·M·n`, damit `start × end` konsistent bleibt.
    pub fn map_normal(&self, normal: DVec3) -> Option<DVec3> {
        let m = self.linear_part()?;
        Some(m.determinant().signum() * (m * normal))
    }
}

/// Sphärische Inversion: tan(β/2) = tan²(r/2) / tan(α/2), α = Abstand zum Zentrum.
///
/// Das Zentrum geht auf seine Antipode, die Antipode auf das Zentrum; Punkte auf
/// dem Inversionskreis bleiben fest.
fn invert(v: DVec3, center: DVec3, radius: f64) -> DVec3 {
    let alpha = v.angle_to(center);
    if alpha < INVERSION_POLE_TOLERANCE {
        return -center;
    }
    if PI - alpha < INVERSION_POLE_TOLERANCE {
        return center;
    }
    let half_radius_tan = (radius / 2.0).tan();
    let beta = 2.0 * (half_radius_tan * half_radius_tan / (alpha / 2.0).tan()).atan();
    let direction = v.perpendicular_part(center).normalize_or_zero();
    center * beta.cos() + direction * beta.sin()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn inversion_fixes_circle_and_swaps_poles() {
        let center = DVec3::new(0.2, 0.3, 0.9).normalize();
        let radius = 0.6;
        let inversion = Isometry::Inversion { center, radius };

        let on_circle = center
            .rotate_about(center.any_perpendicular(), radius)
            .rotate_about(center, 1.3);
        assert!(inversion.apply(on_circle).distance(on_circle) < 1e-12);
        assert!(inversion.apply(center).distance(-center) < 1e-12);
        assert!(inversion.apply(-center).distance(center) < 1e-12);

        // Involution
        let v = DVec3::new(-0.4, 0.5, 0.7).normalize();
        assert!(inversion.apply(inversion.apply(v)).distance(v) < 1e-12);
        assert!(inversion.linear_part().is_none());
    }

    #[test]
    fn reflection_matrix_matches_apply() {
        let normal = DVec3::new(1.0, 2.0, -0.5).normalize();
        let reflection = Isometry::Reflection { normal };
        let m = reflection.linear_part().expect("linear");
        let v = DVec3::new(0.3, -0.1, 0.9).normalize();
        assert!((m * v).distance(reflection.apply(v)) < 1e-12);
        assert_abs_diff_eq!(m.determinant(), -1.0, epsilon = 1e-12);
    }

    #[test]
    fn mapped_normal_stays_consistent_with_mapped_points() {
        let (a, b) = (DVec3::new(0.3, 0.4, 0.8).normalize(), DVec3::new(-0.5, 0.2, 0.7).normalize());
        let normal = a.cross(b).normalize();
        for iso in [
            Isometry::Reflection { normal: DVec3::X },
            Isometry::Rotation { axis: DVec3::Y, angle: 0.7 },
            Isometry::point_reflection(DVec3::Z),
        ] {
            let expected = iso.apply(a).cross(iso.apply(b)).normalize();
            let mapped = iso.map_normal(normal).expect("linear");
            assert!(mapped.distance(expected) < 1e-12);
        }
    }

    #[test]
    fn translation_moves_along_line() {
        let translation = Isometry::translation(DVec3::Z, 0.5);
        let moved = translation.apply(DVec3::X);
        assert_abs_diff_eq!(moved.z, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(moved.angle_to(DVec3::X), 0.5, epsilon = 1e-12);
    }
}
