//! Abhängigkeitsgraph der Konstruktion mit Update-Protokoll.
//!
//! Nodes liegen in einer Arena (`Vec<Option<Node>>`), adressiert über `NodeId`.
//! Ein Update markiert zuerst alle Nachfahren als veraltet und wertet dann lazy
//! topologisch aus: ein Node rechnet erst, wenn keiner seiner Eltern mehr
//! veraltet ist (`can_update_now`), und stößt danach seine Kinder an.

mod construct;
mod shallow_update;


use anyhow::{anyhow, bail};
use glam::DVec3;
use indexmap::IndexSet;

use super::ids::{IdAllocator, NodeId};
use super::node::{Node, NodeKind, NodeSnapshot, PointConstraint};
use super::shapes::Shape;
use super::spatial::{SpatialIndex, SpatialMatch};
use super::transformation::Isometry;
use super::vector::SphereVector;
use crate::shared::EngineOptions;

/// Zustand eines Update-Durchlaufs.
struct UpdatePass<'a> {
    /// In diesem Durchlauf bereits neu berechnete Nodes (Reihenfolge = Besuchsreihenfolge)
    visited: IndexSet<NodeId>,
    /// Optionaler Sammler für Zustands-Snapshots
    collector: Option<&'a mut Vec<NodeSnapshot>>,
}

/// Die gesamte Konstruktion.
#[derive(Debug, Clone)]
pub struct ConstructionGraph {
    nodes: Vec<Option<Node>>,
    names: IdAllocator,
    options: EngineOptions,
    /// Persistenter Spatial-Index über sichtbare Punkte
    spatial_index: SpatialIndex,
}

impl ConstructionGraph {
    /// Erstellt einen leeren Graphen mit eigenem Namens-Allocator.
    pub fn new(options: EngineOptions) -> Self {
        Self::with_allocator(options, IdAllocator::new())
    }

    /// Erstellt einen leeren Graphen mit injiziertem Namens-Allocator.
    pub fn with_allocator(options: EngineOptions, names: IdAllocator) -> Self {
        Self {
            nodes: Vec::new(),
            names,
            options,
            spatial_index: SpatialIndex::empty(),
        }
    }

    /// Aktive Optionen.
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    // ── Zugriff ─────────────────────────────────────────────────────

    /// Node zu einer ID, falls vorhanden.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    /// Node zu einer ID; unbekannte IDs sind ein Fehler.
    pub fn node(&self, id: NodeId) -> anyhow::Result<&Node> {
        self.get(id).ok_or_else(|| anyhow!("Unbekannter Node {id}"))
    }

    fn node_mut(&mut self, id: NodeId) -> anyhow::Result<&mut Node> {
        self.nodes
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or_else(|| anyhow!("Unbekannter Node {id}"))
    }

    /// Alle lebenden Nodes in ID-Reihenfolge.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().flatten()
    }

    /// Anzahl lebender Nodes.
    pub fn node_count(&self) -> usize {
        self.iter().count()
    }

    /// Ort eines Punkts.
    pub fn location(&self, id: NodeId) -> Option<DVec3> {
        self.get(id).and_then(Node::location)
    }

    /// Form eines Form-Nodes.
    pub fn shape(&self, id: NodeId) -> Option<&Shape> {
        self.get(id).and_then(Node::shape)
    }

    /// Wert eines Messwerts.
    pub fn value(&self, id: NodeId) -> Option<f64> {
        self.get(id).and_then(Node::value)
    }

    /// Aufgelöste Abbildung eines Transformations-Nodes.
    pub fn isometry(&self, id: NodeId) -> Option<Isometry> {
        match &self.get(id)?.kind {
            NodeKind::Transformation(transformation) => Some(transformation.isometry),
            _ => None,
        }
    }

    /// `true`, wenn der Node existiert (unbekannte IDs: `false`).
    pub fn exists(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(|n| n.exists)
    }

    /// Setzt die Sichtbarkeit eines Nodes.
    pub fn set_showing(&mut self, id: NodeId, showing: bool) -> anyhow::Result<()> {
        self.node_mut(id)?.showing = showing;
        self.rebuild_spatial_index();
        Ok(())
    }

    // ── Update-Protokoll ────────────────────────────────────────────

    /// Markiert alle Nachfahren von `id` als veraltet.
    pub fn mark_kids_out_of_date(&mut self, id: NodeId) {
        let mut stack: Vec<NodeId> = self.get(id).map(|n| n.kids.clone()).unwrap_or_default();
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get_mut(current.0).and_then(Option::as_mut) else {
                continue;
            };
            if node.out_of_date {
                continue;
            }
            node.out_of_date = true;
            stack.extend(node.kids.iter().copied());
        }
    }

    /// `true`, wenn kein Elternteil von `id` veraltet ist.
    pub fn can_update_now(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(|node| {
            node.parents
                .iter()
                .all(|p| self.get(*p).map_or(true, |parent| !parent.out_of_date))
        })
    }

    /// `true`, wenn `candidate` von `ancestor` abhängt (oder gleich ist).
    pub fn is_descendant(&self, candidate: NodeId, ancestor: NodeId) -> bool {
        let mut seen = IndexSet::new();
        let mut stack = vec![ancestor];
        while let Some(current) = stack.pop() {
            if current == candidate {
                return true;
            }
            if !seen.insert(current) {
                continue;
            }
            if let Some(node) = self.get(current) {
                stack.extend(node.kids.iter().copied());
            }
        }
        false
    }

    /// Aktualisiert `id` und alle Nachfahren. Liefert die Besuchsreihenfolge.
    pub fn update(
        &mut self,
        id: NodeId,
        collector: Option<&mut Vec<NodeSnapshot>>,
    ) -> anyhow::Result<Vec<NodeId>> {
        self.update_roots(&[id], collector)
    }

    /// Gemeinsamer Durchlauf über mehrere Wurzeln.
    ///
    /// Erst werden alle Wurzeln samt Nachfahren als veraltet markiert, dann wird
    /// jede Wurzel mit demselben Besuchs-Set aktualisiert.
    pub fn update_roots(
        &mut self,
        roots: &[NodeId],
        collector: Option<&mut Vec<NodeSnapshot>>,
    ) -> anyhow::Result<Vec<NodeId>> {
        for &root in roots {
            self.node(root)?;
        }
        for &root in roots {
            self.node_mut(root)?.out_of_date = true;
            self.mark_kids_out_of_date(root);
        }

        let mut pass = UpdatePass {
            visited: IndexSet::new(),
            collector,
        };
        for &root in roots {
            self.update_node(root, &mut pass);
        }

        self.verify_up_to_date();
        self.rebuild_spatial_index();
        log::trace!("Update-Durchlauf: {} Nodes neu berechnet", pass.visited.len());
        Ok(pass.visited.into_iter().collect())
    }

    fn update_node(&mut self, id: NodeId, pass: &mut UpdatePass<'_>) {
        if pass.visited.contains(&id) {
            log::trace!("{id} in diesem Durchlauf bereits berechnet");
            return;
        }
        if !self.can_update_now(id) {
            return;
        }
        pass.visited.insert(id);

        self.shallow_update(id);

        let Some(node) = self.get(id) else {
            return;
        };
        if let Some(collector) = pass.collector.as_deref_mut() {
            collector.push(node.capture());
        }
        let kids = node.kids.clone();
        for kid in kids {
            self.update_node(kid, pass);
        }
    }

    /// Nach einem Durchlauf darf kein Node mehr veraltet sein.
    fn verify_up_to_date(&self) {
        let stale: Vec<NodeId> = self
            .iter()
            .filter(|n| n.out_of_date)
            .map(|n| n.id)
            .collect();
        if !stale.is_empty() {
            log::warn!("Nodes nach Update-Durchlauf noch veraltet: {stale:?}");
            debug_assert!(stale.is_empty(), "veraltete Nodes: {stale:?}");
        }
    }

    // ── Bearbeiten ──────────────────────────────────────────────────

    /// Setzt einen freien Punkt und aktualisiert alle Nachfahren.
    pub fn set_free_point_location(
        &mut self,
        id: NodeId,
        location: DVec3,
        collector: Option<&mut Vec<NodeSnapshot>>,
    ) -> anyhow::Result<()> {
        let Some(location) = location.try_normalize() else {
            bail!("Nullvektor ist kein Ort auf der Kugel");
        };
        let node = self.node_mut(id)?;
        let NodeKind::Point(point) = &mut node.kind else {
            bail!("{} ist kein Punkt", node.name);
        };
        if point.constraint != PointConstraint::Free {
            bail!("{} ist kein freier Punkt", node.name);
        }
        point.location = location;
        self.update(id, collector)?;
        Ok(())
    }

    /// Freie Punkte, von denen `id` abhängt (`id` selbst eingeschlossen), in ID-Reihenfolge.
    pub fn free_ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut seen = IndexSet::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                continue;
            }
            if let Some(node) = self.get(current) {
                stack.extend(node.parents.iter().copied());
            }
        }
        let mut free: Vec<NodeId> = seen
            .into_iter()
            .filter(|n| self.get(*n).is_some_and(Node::is_free_point))
            .collect();
        free.sort();
        free
    }

    /// Dreht Nodes um `axis` ohne Update-Durchlauf.
    ///
    /// Freie Punkte und Punkte auf Formen drehen ihren Ort, Segmente ihre
    /// Normale; alle anderen Nodes bleiben unberührt.
    pub fn rotate_nodes(&mut self, ids: &[NodeId], axis: DVec3, angle: f64) -> anyhow::Result<()> {
        for &id in ids {
            let node = self.node_mut(id)?;
            match &mut node.kind {
                NodeKind::Point(point)
                    if matches!(
                        point.constraint,
                        PointConstraint::Free | PointConstraint::OnShape { .. }
                    ) =>
                {
                    point.location = point.location.rotate_about(axis, angle).normalize();
                }
                NodeKind::Shape(shape) => {
                    if let Shape::Segment(segment) = &mut shape.shape {
                        *segment = segment.rotated(axis, angle);
                    }
                }
                _ => log::trace!("{} wird beim Drehen übersprungen", node.name),
            }
        }
        Ok(())
    }

    /// Hält den aktuellen Zustand der angegebenen Nodes fest.
    pub fn capture_states(&self, ids: &[NodeId]) -> Vec<NodeSnapshot> {
        ids.iter()
            .filter_map(|id| self.get(*id))
            .map(Node::capture)
            .collect()
    }

    /// Schreibt festgehaltene Zustände zurück und rechnet alle Nachfahren neu.
    pub fn restore_states(&mut self, snapshots: &[NodeSnapshot]) -> anyhow::Result<()> {
        let mut roots = Vec::with_capacity(snapshots.len());
        for snapshot in snapshots {
            let Some(node) = self.nodes.get_mut(snapshot.id.0).and_then(Option::as_mut) else {
                log::debug!("Snapshot für gelöschten Node {} übersprungen", snapshot.id);
                continue;
            };
            if !node.restore(&snapshot.state) {
                bail!("Snapshot passt nicht zu {}", node.name);
            }
            roots.push(snapshot.id);
        }
        if !roots.is_empty() {
            self.update_roots(&roots, None)?;
        }
        Ok(())
    }

    // ── Abfragen ────────────────────────────────────────────────────

    /// Nächster Punkt eines Objekts zu `target` (Punkte: ihr Ort).
    pub fn closest_vector(&self, id: NodeId, target: DVec3) -> anyhow::Result<DVec3> {
        let node = self.node(id)?;
        match &node.kind {
            NodeKind::Point(point) => Ok(point.location),
            NodeKind::Shape(shape) => Ok(shape.shape.closest_vector(target)),
            _ => bail!("{} hat keine Geometrie", node.name),
        }
    }

    /// Hit-Test gegen ein Objekt; die Trefferdistanz schrumpft mit der Vergrößerung.
    pub fn is_hit_at(&self, id: NodeId, target: DVec3, magnification: f64) -> bool {
        let Some(node) = self.get(id) else {
            return false;
        };
        if !node.exists || !node.showing {
            return false;
        }
        match &node.kind {
            NodeKind::Point(point) => {
                point.location.angle_to(target) < self.options.point_hit_distance(magnification)
            }
            NodeKind::Shape(shape) => shape
                .shape
                .is_hit_at(target, self.options.shape_hit_distance(magnification)),
            _ => false,
        }
    }

    /// Sichtbare Punkte innerhalb eines Winkelabstands.
    pub fn points_within(&self, target: DVec3, angle: f64) -> Vec<SpatialMatch> {
        self.spatial_index.within_angle(target, angle)
    }

    /// Baut den Spatial-Index aus allen sichtbaren, existierenden Punkten neu.
    pub fn rebuild_spatial_index(&mut self) {
        let points = self
            .iter()
            .filter(|n| n.exists && n.showing)
            .filter_map(|n| n.location().map(|l| (n.id, l)));
        self.spatial_index = SpatialIndex::from_points(points);
    }
}
