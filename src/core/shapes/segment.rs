//! Geodätisches Segment (Bogen eines Großkreises), auch länger als π.

use glam::DVec3;
use std::f64::consts::{PI, TAU};

use super::line::closest_on_great_circle;
use crate::core::vector::SphereVector;

/// Ein Bogen von `start` nach `end`, gegen den Uhrzeigersinn um `normal` gemessen.
///
/// Normale und Bogenlänge lassen sich bei antipodalen Endpunkten nicht aus den
/// Eltern rekonstruieren und werden deshalb im State-Capture mitgeschrieben.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    /// Startpunkt
    pub start: DVec3,
    /// Endpunkt
    pub end: DVec3,
    /// Einheitsnormale; bestimmt, welcher der beiden Bögen gemeint ist
    pub normal: DVec3,
    /// Bogenlänge in [0, 2π)
    pub arc_length: f64,
}

impl Segment {
    /// Kürzester Bogen zwischen zwei Punkten.
    pub fn through(start: DVec3, end: DVec3) -> Self {
        let normal = start
            .cross(end)
            .try_normalize()
            .unwrap_or_else(|| start.any_perpendicular());
        Self::with_normal(start, end, normal)
    }

    /// Bogen mit vorgegebener Orientierung (Normale wird senkrecht zu `start` gemacht).
    pub fn with_normal(start: DVec3, end: DVec3, normal_hint: DVec3) -> Self {
        let normal = normal_hint
            .perpendicular_part(start)
            .try_normalize()
            .unwrap_or_else(|| start.any_perpendicular());
        let mut segment = Self {
            start,
            end,
            normal,
            arc_length: 0.0,
        };
        segment.arc_length = segment.arc_parameter(end);
        segment
    }

    /// Setzt die Endpunkte neu und liefert die Existenz.
    ///
    /// Die Normale behält ihre Orientierung relativ zur vorherigen Normale, so dass ein
    /// Segment länger als π beim Ziehen nicht auf den kurzen Bogen umspringt.
    /// Antipodale Endpunkte: alte Normale (senkrecht zu `start` projiziert), Länge π.
    /// Zusammenfallende Endpunkte: Segment existiert nicht.
    pub fn set_points(&mut self, start: DVec3, end: DVec3, ideal: f64) -> bool {
        let cross = start.cross(end);
        if cross.length() < ideal {
            if start.dot(end) > 0.0 {
                return false;
            }
            let normal = self
                .normal
                .perpendicular_part(start)
                .try_normalize()
                .unwrap_or_else(|| start.any_perpendicular());
            self.start = start;
            self.end = end;
            self.normal = normal;
            self.arc_length = PI;
            return true;
        }

        let mut normal = cross.normalize();
        if normal.dot(self.normal) < 0.0 {
            normal = -normal;
        }
        self.start = start;
        self.end = end;
        self.normal = normal;
        self.arc_length = self.arc_parameter(end);
        true
    }

    /// Tangentialrichtung am Start (Richtung, in die der Bogen läuft).
    pub fn start_direction(&self) -> DVec3 {
        self.normal.cross(self.start)
    }

    /// Winkel von `start` bis zur Projektion von `v`, gegen den Uhrzeigersinn, in [0, 2π).
    pub fn arc_parameter(&self, v: DVec3) -> f64 {
        let angle = v.dot(self.start_direction()).atan2(v.dot(self.start));
        if angle < 0.0 {
            angle + TAU
        } else {
            angle
        }
    }

    /// `true`, wenn `v` auf dem Großkreis des Segments innerhalb des Bogens liegt.
    pub fn contains_on_arc(&self, v: DVec3, tolerance: f64) -> bool {
        let parameter = self.arc_parameter(v);
        parameter <= self.arc_length + tolerance || parameter >= TAU - tolerance
    }

    /// Punkt auf dem Bogen beim Parameter `angle` ab `start`.
    pub fn point_at(&self, angle: f64) -> DVec3 {
        self.start * angle.cos() + self.start_direction() * angle.sin()
    }

    /// Mittelpunkt des Bogens.
    pub fn midpoint(&self) -> DVec3 {
        self.point_at(self.arc_length / 2.0)
    }

    /// Nächster Punkt des Bogens: Projektion, sonst der nähere Endpunkt.
    pub fn closest_vector(&self, target: DVec3) -> DVec3 {
        let Some(projection) = closest_on_great_circle(self.normal, target) else {
            return self.start;
        };
        if self.contains_on_arc(projection, 0.0) {
            return projection;
        }
        if target.angle_to(self.start) <= target.angle_to(self.end) {
            self.start
        } else {
            self.end
        }
    }

    /// Dreht das Segment starr (Endpunkte und Normale).
    pub fn rotated(&self, axis: DVec3, angle: f64) -> Self {
        Self {
            start: self.start.rotate_about(axis, angle),
            end: self.end.rotate_about(axis, angle),
            normal: self.normal.rotate_about(axis, angle),
            arc_length: self.arc_length,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn short_arc_by_default() {
        let segment = Segment::through(DVec3::X, DVec3::Y);
        assert_abs_diff_eq!(segment.arc_length, FRAC_PI_2, epsilon = 1e-12);
        assert!(segment.contains_on_arc(DVec3::new(1.0, 1.0, 0.0).normalize(), 1e-9));
        assert!(!segment.contains_on_arc(DVec3::new(-1.0, -1.0, 0.0).normalize(), 1e-9));
    }

    #[test]
    fn long_arc_keeps_orientation_when_dragged() {
        // Normale -Z: Bogen läuft von X über -Y und -X nach Y (3π/2)
        let mut segment = Segment::with_normal(DVec3::X, DVec3::Y, -DVec3::Z);
        assert_abs_diff_eq!(segment.arc_length, 3.0 * FRAC_PI_2, epsilon = 1e-12);

        let moved_end = DVec3::new(-0.1, 1.0, 0.0).normalize();
        assert!(segment.set_points(DVec3::X, moved_end, 1e-3));
        assert!(segment.normal.z < 0.0);
        assert!(segment.arc_length > PI);
    }

    #[test]
    fn antipodal_endpoints_keep_previous_normal() {
        let mut segment = Segment::through(DVec3::X, DVec3::Y);
        assert!(segment.set_points(DVec3::X, -DVec3::X, 1e-3));
        assert_abs_diff_eq!(segment.arc_length, PI, epsilon = 1e-12);
        assert_abs_diff_eq!(segment.normal.dot(DVec3::Z), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(segment.midpoint().dot(DVec3::Y), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn coincident_endpoints_do_not_exist() {
        let mut segment = Segment::through(DVec3::X, DVec3::Y);
        assert!(!segment.set_points(DVec3::Z, DVec3::Z, 1e-3));
        assert_eq!(segment.start, DVec3::X);
    }

    #[test]
    fn closest_vector_clamps_to_endpoints() {
        let segment = Segment::through(DVec3::X, DVec3::Y);
        let inside = DVec3::new(1.0, 1.0, 0.5).normalize();
        let closest = segment.closest_vector(inside);
        assert_abs_diff_eq!(closest.z, 0.0, epsilon = 1e-12);

        let beyond_end = DVec3::new(-0.3, 1.0, 0.2).normalize();
        assert_eq!(segment.closest_vector(beyond_end), DVec3::Y);
        let beyond_start = DVec3::new(1.0, -0.3, 0.2).normalize();
        assert_eq!(segment.closest_vector(beyond_start), DVec3::X);
    }
}
