//! Sphärische Ellipse: Ort aller Punkte mit konstanter Winkelsumme zu zwei Brennpunkten.
//!
//! Die Kurve wird in Standardlage berechnet (Brennpunkte bei `(±sin d, 0, cos d)`)
//! und über eine Frame-Matrix in die Weltlage gedreht:
//!
//! `P(t) = (sin a·cos t, sin b·sin t, √(1 − sin²a·cos²t − sin²b·sin²t))`
//! mit `cos a = cos b · cos d`.

use glam::{DMat3, DVec3};
use std::f64::consts::{FRAC_PI_2, PI, TAU};

use super::sampled::{closest_parameter, SampleGrid, SampledCurve};
use crate::core::vector::{nearly_parallel, SphereVector};

/// Ellipse aus zwei Brennpunkten und einem Kurvenpunkt.
#[derive(Debug, Clone, PartialEq)]
pub struct Ellipse {
    /// Erster Brennpunkt
    pub focus1: DVec3,
    /// Zweiter Brennpunkt
    pub focus2: DVec3,
    /// Definierender Kurvenpunkt
    pub through: DVec3,
    /// Winkelsumme zu den ursprünglichen Brennpunkten (2a vor der Spiegelung)
    pub focal_sum: f64,
    semi_major: f64,
    semi_minor: f64,
    half_focal: f64,
    frame: DMat3,
    grid: SampleGrid,
    sample_count: usize,
}

impl Ellipse {
    /// Erstellt die Ellipse; Existenz prüft erst `set_points`.
    pub fn through(focus1: DVec3, focus2: DVec3, through: DVec3, sample_count: usize) -> Self {
        let mut ellipse = Self {
            focus1,
            focus2,
            through,
            focal_sum: focus1.angle_to(through) + focus2.angle_to(through),
            semi_major: 0.0,
            semi_minor: 0.0,
            half_focal: 0.0,
            frame: DMat3::IDENTITY,
            grid: SampleGrid::default(),
            sample_count,
        };
        ellipse.set_points(focus1, focus2, through, 0.0);
        ellipse
    }

    /// Berechnet a, b, Frame und Gitter neu und liefert die Existenz.
    ///
    /// Bei Nicht-Existenz bleibt der bisherige Zustand unverändert.
    pub fn set_points(&mut self, focus1: DVec3, focus2: DVec3, through: DVec3, ideal: f64) -> bool {
        if nearly_parallel(focus1, focus2, ideal.max(f64::EPSILON)) {
            return false;
        }

        let focal_sum = focus1.angle_to(through) + focus2.angle_to(through);
        let mut semi_major = focal_sum / 2.0;
        let half_focal = focus1.angle_to(focus2) / 2.0;
        let (mut f1, mut f2) = (focus1, focus2);
        if semi_major > FRAC_PI_2 {
            // Antipodale Brennpunkte mit π − a beschreiben dieselbe Punktmenge
            semi_major = PI - semi_major;
            f1 = -focus1;
            f2 = -focus2;
        }

        if semi_major - half_focal <= ideal || FRAC_PI_2 - semi_major <= ideal {
            return false;
        }

        let Some(center) = (f1 + f2).try_normalize() else {
            return false;
        };
        let Some(x_axis) = (f1 - f2).try_normalize() else {
            return false;
        };
        let y_axis = center.cross(x_axis);
        let cos_b = (semi_major.cos() / half_focal.cos()).clamp(-1.0, 1.0);

        self.focus1 = focus1;
        self.focus2 = focus2;
        self.through = through;
        self.focal_sum = focal_sum;
        self.semi_major = semi_major;
        self.semi_minor = cos_b.acos();
        self.half_focal = half_focal;
        self.frame = DMat3::from_cols(x_axis, y_axis, center);
        self.rebuild_grid();
        true
    }

    fn rebuild_grid(&mut self) {
        let (frame, sin_a, sin_b) = (self.frame, self.semi_major.sin(), self.semi_minor.sin());
        self.grid = SampleGrid::build(0.0, TAU, &[], self.sample_count, |t| {
            frame * standard_point(sin_a, sin_b, t)
        });
    }

    /// Große Halbachse a (nach eventueller Spiegelung, in (0, π/2)).
    pub fn semi_major(&self) -> f64 {
        self.semi_major
    }

    /// Kleine Halbachse b.
    pub fn semi_minor(&self) -> f64 {
        self.semi_minor
    }

    /// Frame-Matrix (Spalten: Brennpunktachse, Nebenachse, Mittelpunkt).
    pub fn frame(&self) -> DMat3 {
        self.frame
    }

    /// Abweichung der Winkelsumme von `focal_sum`; 0 genau auf der Kurve.
    pub fn focal_excess(&self, v: DVec3) -> f64 {
        v.angle_to(self.focus1) + v.angle_to(self.focus2) - self.focal_sum
    }

    /// Gradient von `focal_excess` (tangential zur Kugel).
    pub fn focal_gradient(&self, v: DVec3) -> DVec3 {
        angle_gradient(v, self.focus1) + angle_gradient(v, self.focus2)
    }

    /// Nächster Punkt auf der Ellipse.
    pub fn closest_vector(&self, target: DVec3) -> DVec3 {
        closest_parameter(self, target)
            .map(|(_, point)| point)
            .unwrap_or(self.through)
    }

    /// `true`, wenn `v` auf der Ellipse liegt.
    pub fn contains(&self, v: DVec3, tolerance: f64) -> bool {
        self.focal_excess(v).abs() < tolerance
    }

    /// Bild unter einer orthogonalen Abbildung `m` (Frame und Gitter werden mitgeführt).
    pub fn mapped(&self, m: DMat3) -> Self {
        Self {
            focus1: m * self.focus1,
            focus2: m * self.focus2,
            through: m * self.through,
            focal_sum: self.focal_sum,
            semi_major: self.semi_major,
            semi_minor: self.semi_minor,
            half_focal: self.half_focal,
            frame: m * self.frame,
            grid: self.grid.map_points(|v| m * v),
            sample_count: self.sample_count,
        }
    }
}

/// Gradient des Winkelabstands `angle(v, f)` nach `v` auf der Kugel.
fn angle_gradient(v: DVec3, f: DVec3) -> DVec3 {
    let sin = v.cross(f).length();
    if sin < f64::EPSILON {
        return DVec3::ZERO;
    }
    -f.perpendicular_part(v) / sin
}

fn standard_point(sin_a: f64, sin_b: f64, t: f64) -> DVec3 {
    let (s, c) = t.sin_cos();
    let z_sq = 1.0 - sin_a * sin_a * c * c - sin_b * sin_b * s * s;
    DVec3::new(sin_a * c, sin_b * s, z_sq.max(0.0).sqrt())
}

impl SampledCurve for Ellipse {
    fn point(&self, t: f64) -> DVec3 {
        self.frame * standard_point(self.semi_major.sin(), self.semi_minor.sin(), t)
    }

    fn first_derivative(&self, t: f64) -> DVec3 {
        let (sin_a, sin_b) = (self.semi_major.sin(), self.semi_minor.sin());
        let (s, c) = t.sin_cos();
        let z = standard_point(sin_a, sin_b, t).z;
        let k = sin_a * sin_a - sin_b * sin_b;
        self.frame * DVec3::new(-sin_a * s, sin_b * c, s * c * k / z)
    }

    fn second_derivative(&self, t: f64) -> DVec3 {
        let (sin_a, sin_b) = (self.semi_major.sin(), self.semi_minor.sin());
        let (s, c) = t.sin_cos();
        let z = standard_point(sin_a, sin_b, t).z;
        let k = sin_a * sin_a - sin_b * sin_b;
        let dz = s * c * k / z;
        let ddz = (k * (2.0 * t).cos() - dz * dz) / z;
        self.frame * DVec3::new(-sin_a * c, -sin_b * s, ddz)
    }

    fn grid(&self) -> &SampleGrid {
        &self.grid
    }

    fn is_closed(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn sample_ellipse() -> Ellipse {
        Ellipse::through(
            DVec3::new(0.3, 0.1, 0.9).normalize(),
            DVec3::new(-0.2, 0.3, 0.9).normalize(),
            DVec3::new(0.1, -0.5, 0.8).normalize(),
            100,
        )
    }

    #[test]
    fn focal_sum_is_constant_along_curve() {
        let ellipse = sample_ellipse();
        for i in 0..50 {
            let point = ellipse.point(i as f64 * TAU / 50.0);
            assert_abs_diff_eq!(point.length(), 1.0, epsilon = 1e-12);
            assert_abs_diff_eq!(ellipse.focal_excess(point), 0.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn wide_ellipse_uses_antipodal_foci() {
        let f1 = DVec3::new(0.3, 0.0, 0.95).normalize();
        let f2 = DVec3::new(-0.3, 0.0, 0.95).normalize();
        let through = DVec3::new(0.0, 0.3, -0.95).normalize();
        let mut ellipse = Ellipse::through(f1, f2, through, 100);
        assert!(ellipse.set_points(f1, f2, through, 1e-3));
        assert!(ellipse.focal_sum > PI);
        assert!(ellipse.semi_major() < FRAC_PI_2);
        for i in 0..20 {
            let point = ellipse.point(i as f64 * TAU / 20.0);
            assert_abs_diff_eq!(ellipse.focal_excess(point), 0.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn degenerate_configurations_do_not_exist() {
        let mut ellipse = sample_ellipse();
        let before = ellipse.clone();
        // Punkt auf dem Segment zwischen den Brennpunkten
        let midpoint = (before.focus1 + before.focus2).normalize();
        assert!(!ellipse.set_points(before.focus1, before.focus2, midpoint, 1e-3));
        // Zusammenfallende Brennpunkte
        assert!(!ellipse.set_points(before.focus1, before.focus1, before.through, 1e-3));
        // Antipodale Brennpunkte
        assert!(!ellipse.set_points(before.focus1, -before.focus1, before.through, 1e-3));
        assert_eq!(ellipse, before);
    }

    #[test]
    fn derivatives_match_finite_differences() {
        let ellipse = sample_ellipse();
        let h = 1e-5;
        for t in [0.3, 1.7, 4.0] {
            let numeric = (ellipse.point(t + h) - ellipse.point(t - h)) / (2.0 * h);
            assert!(numeric.distance(ellipse.first_derivative(t)) < 1e-7);
            let numeric2 =
                (ellipse.first_derivative(t + h) - ellipse.first_derivative(t - h)) / (2.0 * h);
            assert!(numeric2.distance(ellipse.second_derivative(t)) < 1e-6);
        }
    }

    #[test]
    fn closest_vector_lies_on_ellipse() {
        let ellipse = sample_ellipse();
        let target = DVec3::new(0.7, 0.2, 0.6).normalize();
        let closest = ellipse.closest_vector(target);
        assert_abs_diff_eq!(ellipse.focal_excess(closest), 0.0, epsilon = 1e-6);
        for i in 0..360 {
            let sample = ellipse.point(i as f64 * TAU / 360.0);
            assert!(sample.angle_to(target) >= closest.angle_to(target) - 1e-9);
        }
    }
}
