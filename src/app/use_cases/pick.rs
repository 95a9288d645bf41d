//! Use-Case: Objekte unter dem Mauszeiger finden.

use glam::DVec3;

use crate::app::AppState;
use crate::core::{NodeId, SphereVector};

/// Ein Treffer beim Picking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickedObject {
    pub node_id: NodeId,
    /// Winkelabstand zwischen Suchpunkt und Objekt
    pub angle: f64,
}

/// Sucht alle sichtbaren, existierenden Objekte nahe `target`.
///
/// Punkte kommen zuerst (über den Spatial-Index, nach Abstand sortiert), danach
/// Formen nach Abstand. Die Trefferdistanzen schrumpfen mit `state.magnification`.
pub fn pick_objects(state: &AppState, target: DVec3) -> Vec<PickedObject> {
    let graph = &state.graph;
    let Some(target) = target.try_normalize() else {
        return Vec::new();
    };

    let point_radius = graph.options().point_hit_distance(state.magnification);
    let mut picked: Vec<PickedObject> = graph
        .points_within(target, point_radius)
        .into_iter()
        .map(|m| PickedObject {
            node_id: m.node_id,
            angle: m.angle,
        })
        .collect();

    let mut shapes: Vec<PickedObject> = graph
        .iter()
        .filter(|n| n.shape().is_some())
        .filter(|n| graph.is_hit_at(n.id, target, state.magnification))
        .filter_map(|n| {
            let closest = graph.closest_vector(n.id, target).ok()?;
            Some(PickedObject {
                node_id: n.id,
                angle: closest.angle_to(target),
            })
        })
        .collect();
    shapes.sort_by(|a, b| a.angle.total_cmp(&b.angle));
    picked.extend(shapes);

    log::trace!("Picking bei {target:?}: {} Treffer", picked.len());
    picked
}
