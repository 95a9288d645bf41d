//! Use-Case: Objekte per Drag auf der Kugel verschieben.
//!
//! Ein Drag von `previous` nach `current` wird als Drehung um die Achse
//! `previous × current` ausgeführt. Freie Punkte drehen sich selbst, Punkte auf
//! Formen drehen sich und werden beim Update auf ihre Form zurückprojiziert.
//! Abgeleitete Punkte und Formen bewegen ihre freien Vorfahren starr mit;
//! ein gezogenes Segment dreht zusätzlich seine Normale, damit ein langer
//! Bogen seine Orientierung behält.

use anyhow::bail;
use glam::DVec3;

use crate::app::AppState;
use crate::core::{drag_rotation, NodeId, NodeKind, NodeSnapshot, PointConstraint, Shape};

/// Verschiebt `id` entsprechend dem Drag und aktualisiert alle Nachfahren.
///
/// Liefert die Snapshots aller neu berechneten Nodes in Besuchsreihenfolge.
/// Ist der Drag zu kurz für eine eindeutige Drehachse, passiert nichts.
pub fn move_object(
    state: &mut AppState,
    id: NodeId,
    previous: DVec3,
    current: DVec3,
) -> anyhow::Result<Vec<NodeSnapshot>> {
    let graph = &mut state.graph;
    let Some((axis, angle)) = drag_rotation(previous, current, graph.options().tolerance) else {
        log::trace!("Drag ohne eindeutige Drehachse ignoriert");
        return Ok(Vec::new());
    };

    let node = graph.node(id)?;
    let moved: Vec<NodeId> = match &node.kind {
        NodeKind::Point(point) => match point.constraint {
            PointConstraint::Free | PointConstraint::OnShape { .. } => vec![id],
            _ => graph.free_ancestors(id),
        },
        NodeKind::Shape(shape) => {
            let mut ids = graph.free_ancestors(id);
            if matches!(shape.shape, Shape::Segment(_)) {
                ids.push(id);
            }
            ids
        }
        NodeKind::Measurement(_) | NodeKind::Transformation(_) => {
            bail!("{} lässt sich nicht verschieben", node.name)
        }
    };
    if moved.is_empty() {
        log::debug!("{id} hat keine freien Vorfahren, nichts zu verschieben");
        return Ok(Vec::new());
    }

    graph.rotate_nodes(&moved, axis, angle)?;
    let mut snapshots = Vec::new();
    graph.update_roots(&moved, Some(&mut snapshots))?;
    log::debug!(
        "{id} um {:.4} rad verschoben, {} Nodes neu berechnet",
        angle,
        snapshots.len()
    );
    Ok(snapshots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::use_cases::undo_redo::undo;
    use crate::core::SphereVector;
    use crate::shared::EngineOptions;

    fn state_with_segment() -> (AppState, NodeId, NodeId, NodeId) {
        let mut state = AppState::new(EngineOptions::default());
        let a = state
            .graph
            .create_point(DVec3::new(0.2, 0.1, 1.0))
            .expect("Punkt a");
        let b = state
            .graph
            .create_point(DVec3::new(-0.3, 0.4, 1.0))
            .expect("Punkt b");
        let segment = state.graph.create_segment(a, b).expect("Segment");
        (state, a, b, segment)
    }

    #[test]
    fn dragging_free_point_rotates_it_onto_target() {
        let (mut state, a, _, _) = state_with_segment();
        let previous = state.graph.location(a).expect("Ort");
        let current = previous.rotate_about(DVec3::Y, 0.2);

        let snapshots = move_object(&mut state, a, previous, current).expect("Drag");

        let moved = state.graph.location(a).expect("Ort");
        assert!(moved.distance(current) < 1e-12);
        assert_eq!(snapshots.first().map(|s| s.id), Some(a));
    }

    #[test]
    fn dragging_shape_moves_free_ancestors_rigidly() {
        let (mut state, a, b, segment) = state_with_segment();
        let before = state.graph.location(a).expect("a").angle_to(state.graph.location(b).expect("b"));

        let previous = DVec3::Z;
        let current = DVec3::Z.rotate_about(DVec3::X, 0.3);
        move_object(&mut state, segment, previous, current).expect("Drag");

        let after = state.graph.location(a).expect("a").angle_to(state.graph.location(b).expect("b"));
        assert!((before - after).abs() < 1e-12);
    }

    #[test]
    fn drag_and_back_restores_descendants() {
        let (mut state, a, b, _) = state_with_segment();
        let line = state.graph.create_line(a, b).expect("Linie");
        let circle = state.graph.create_circle(b, a).expect("Kreis");
        let far = state
            .graph
            .create_intersection_point(line, circle, 1)
            .expect("Schnittpunkt");
        let start_far = state.graph.location(far).expect("Schnittpunkt");
        let start_b = state.graph.location(b).expect("b");

        let previous = state.graph.location(a).expect("a");
        let current = previous.rotate_about(DVec3::new(1.0, 1.0, 0.0).normalize(), 0.25);
        move_object(&mut state, a, previous, current).expect("hin");
        move_object(&mut state, a, current, previous).expect("zurück");

        assert!(state.graph.location(b).expect("b").distance(start_b) < 1e-12);
        assert!(state.graph.location(far).expect("Schnittpunkt").distance(start_far) < 1e-9);
    }

    #[test]
    fn measurement_cannot_be_dragged() {
        let (mut state, a, b, _) = state_with_segment();
        let distance = state.graph.create_point_distance(a, b).expect("Messwert");
        let result = move_object(&mut state, distance, DVec3::Z, DVec3::X);
        assert!(result.is_err());
    }

    #[test]
    fn undo_reverts_drag() {
        let (mut state, a, _, _) = state_with_segment();
        let previous = state.graph.location(a).expect("Ort");
        state.record_undo_snapshot();
        move_object(&mut state, a, previous, previous.rotate_about(DVec3::X, 0.4)).expect("Drag");

        assert!(undo(&mut state).expect("undo"));
        assert!(state.graph.location(a).expect("Ort").distance(previous) < 1e-12);
        assert!(state.can_redo());
    }
}
