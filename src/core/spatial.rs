//! Spatial-Index (KD-Tree) über Punkt-Orte auf der Einheitskugel.
//!
//! Abfragen laufen über die Sehnenlänge `2·sin(θ/2)`, die monoton im
//! Winkelabstand θ ist; Ergebnisse werden wieder als Winkel zurückgegeben.

use glam::DVec3;
use kiddo::{KdTree, SquaredEuclidean};

use crate::core::ids::NodeId;

/// Ergebnis einer Abstandsabfrage gegen den Spatial-Index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialMatch {
    /// ID des gefundenen Punkts
    pub node_id: NodeId,
    /// Winkelabstand zum Suchpunkt
    pub angle: f64,
}

/// Read-only Spatial-Index über alle sichtbaren, existierenden Punkte.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    tree: KdTree<f64, 3>,
    node_ids: Vec<NodeId>,
}

fn chord_to_angle(chord: f64) -> f64 {
    2.0 * (chord / 2.0).clamp(0.0, 1.0).asin()
}

fn angle_to_chord(angle: f64) -> f64 {
    2.0 * (angle.clamp(0.0, std::f64::consts::PI) / 2.0).sin()
}

impl SpatialIndex {
    /// Erstellt einen leeren Spatial-Index.
    pub fn empty() -> Self {
        Self {
            tree: (&Vec::<[f64; 3]>::new()).into(),
            node_ids: Vec::new(),
        }
    }

    /// Baut einen Index aus (ID, Ort)-Paaren.
    pub fn from_points(points: impl IntoIterator<Item = (NodeId, DVec3)>) -> Self {
        let (node_ids, entries): (Vec<NodeId>, Vec<[f64; 3]>) = points
            .into_iter()
            .map(|(id, location)| (id, location.to_array()))
            .unzip();
        let tree: KdTree<f64, 3> = (&entries).into();
        Self { tree, node_ids }
    }

    /// Gibt die Anzahl indexierter Punkte zurück.
    pub fn len(&self) -> usize {
        self.node_ids.len()
    }

    /// Gibt `true` zurück, wenn keine Punkte im Index liegen.
    pub fn is_empty(&self) -> bool {
        self.node_ids.is_empty()
    }

    /// Findet den nächsten Punkt zum Suchvektor.
    pub fn nearest(&self, query: DVec3) -> Option<SpatialMatch> {
        if self.is_empty() {
            return None;
        }
        let result = self.tree.nearest_one::<SquaredEuclidean>(&query.to_array());
        let node_id = *self.node_ids.get(result.item as usize)?;
        Some(SpatialMatch {
            node_id,
            angle: chord_to_angle(result.distance.sqrt()),
        })
    }

    /// Findet alle Punkte innerhalb eines Winkelabstands, nach Abstand sortiert.
    pub fn within_angle(&self, query: DVec3, angle: f64) -> Vec<SpatialMatch> {
        if self.is_empty() || angle.is_sign_negative() {
            return Vec::new();
        }
        let chord = angle_to_chord(angle);
        let mut results = self
            .tree
            .within::<SquaredEuclidean>(&query.to_array(), chord * chord)
            .into_iter()
            .filter_map(|entry| {
                let node_id = *self.node_ids.get(entry.item as usize)?;
                Some(SpatialMatch {
                    node_id,
                    angle: chord_to_angle(entry.distance.sqrt()),
                })
            })
            .collect::<Vec<_>>();
        results.sort_by(|a, b| a.angle.total_cmp(&b.angle));
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::vector::SphereVector;
    use approx::assert_abs_diff_eq;

    fn sample_index() -> SpatialIndex {
        SpatialIndex::from_points([
            (NodeId(0), DVec3::Z),
            (NodeId(1), DVec3::Z.rotate_about(DVec3::X, 0.1)),
            (NodeId(2), DVec3::X),
        ])
    }

    #[test]
    fn nearest_reports_angle() {
        let index = sample_index();
        let query = DVec3::Z.rotate_about(DVec3::X, 0.09);
        let hit = index.nearest(query).expect("Treffer");
        assert_eq!(hit.node_id, NodeId(1));
        assert_abs_diff_eq!(hit.angle, 0.01, epsilon = 1e-9);
    }

    #[test]
    fn within_angle_is_sorted() {
        let index = sample_index();
        let query = DVec3::Z.rotate_about(DVec3::X, 0.04);
        let hits = index.within_angle(query, 0.2);
        let ids: Vec<_> = hits.iter().map(|m| m.node_id).collect();
        assert_eq!(ids, vec![NodeId(0), NodeId(1)]);
        assert!(index.within_angle(query, -1.0).is_empty());
    }

    #[test]
    fn empty_index_has_no_hits() {
        let index = SpatialIndex::empty();
        assert!(index.is_empty());
        assert!(index.nearest(DVec3::Z).is_none());
    }
}
