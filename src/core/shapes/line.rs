//! Großkreis (Line) durch zwei Punkte.

use glam::DVec3;

use crate::core::vector::{nearly_parallel, SphereVector};

/// Ein Großkreis mit Start-/Endpunkt und Ebenennormale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    /// Erster definierender Punkt
    pub start: DVec3,
    /// Zweiter definierender Punkt
    pub end: DVec3,
    /// Einheitsnormale der Großkreisebene (`start × end`, normiert)
    pub normal: DVec3,
}

impl Line {
    /// Erstellt eine Linie durch zwei Punkte. Bei entarteten Punkten wird eine
    /// beliebige zu `start` senkrechte Normale gewählt.
    pub fn through(start: DVec3, end: DVec3) -> Self {
        let normal = start
            .cross(end)
            .try_normalize()
            .unwrap_or_else(|| start.any_perpendicular());
        Self { start, end, normal }
    }

    /// Linie durch `point` mit vorgegebener Normale (Lote, Tangenten).
    ///
    /// `end` liegt 90° von `point` entfernt auf dem Großkreis.
    pub fn from_point_normal(point: DVec3, normal: DVec3) -> Self {
        let end = normal
            .cross(point)
            .try_normalize()
            .unwrap_or_else(|| normal.any_perpendicular());
        Self {
            start: point,
            end,
            normal,
        }
    }

    /// Setzt beide Definitionspunkte neu und liefert die Existenz.
    ///
    /// Gleiche oder antipodale Punkte definieren keinen eindeutigen Großkreis:
    /// dann bleibt die alte Normale stehen und das Ergebnis ist `false`.
    pub fn set_points(&mut self, start: DVec3, end: DVec3, ideal: f64) -> bool {
        if nearly_parallel(start, end, ideal) {
            return false;
        }
        self.start = start;
        self.end = end;
        self.normal = start.cross(end).normalize();
        true
    }

    /// Nächster Punkt auf dem Großkreis zu `target`.
    ///
    /// Für die beiden Pole (`±normal`) ist jeder Punkt gleich weit entfernt; dann `start`.
    pub fn closest_vector(&self, target: DVec3) -> DVec3 {
        closest_on_great_circle(self.normal, target).unwrap_or(self.start)
    }

    /// `true`, wenn `v` (bis auf `tolerance`) auf dem Großkreis liegt.
    pub fn contains(&self, v: DVec3, tolerance: f64) -> bool {
        v.dot(self.normal).abs() < tolerance
    }
}

/// Projektion von `target` auf den Großkreis mit Normale `normal`; `None` an den Polen.
pub fn closest_on_great_circle(normal: DVec3, target: DVec3) -> Option<DVec3> {
    target.perpendicular_part(normal).try_normalize()
}
