//! Neuberechnung eines einzelnen Nodes aus seinen (aktuellen) Eltern.
//!
//! Der Node wird für die Dauer der Berechnung aus der Arena genommen, damit die
//! Eltern unverändert gelesen werden können. Schlägt eine Existenzprüfung fehl,
//! bleiben alle Vektoren auf ihrem letzten gültigen Stand.

use glam::DVec3;
use indexmap::IndexMap;

use super::ConstructionGraph;
use crate::core::ids::NodeId;
use crate::core::intersection::intersect;
use crate::core::node::{
    IntersectionData, IntersectionPair, Measure, MeasurementNode, Node, NodeKind, PointConstraint,
    PointNode, Provenance, ShapeNode, TransformationKind, TransformationNode,
};
use crate::core::perpendicular::{normals_to_perpendicular_lines_thru, normals_to_tangent_lines_thru};
use crate::core::shapes::{Line, Shape};
use crate::core::transformation::Isometry;
use crate::core::vector::SphereVector;

/// Ergebnis einer Neuberechnung.
struct Recomputed {
    exists: bool,
    /// Übernommenes Ausweichpaar eines Schnittpunkts (Kanten müssen umgehängt werden)
    swap: Option<IntersectionPair>,
}

impl Recomputed {
    fn exists(exists: bool) -> Self {
        Self { exists, swap: None }
    }
}

impl ConstructionGraph {
    /// Berechnet `id` neu, setzt `exists` und löscht das Veraltet-Flag.
    pub(super) fn shallow_update(&mut self, id: NodeId) {
        let Some(mut node) = self.nodes.get_mut(id.0).and_then(Option::take) else {
            return;
        };
        node.out_of_date = false;

        let parents_exist = node.parents.iter().all(|p| self.exists(*p));
        let outcome = if parents_exist || has_fallback(&node) {
            self.recompute(&mut node)
        } else {
            Recomputed::exists(false)
        };
        let was_existing = node.exists;
        node.exists = outcome.exists && (parents_exist || outcome.swap.is_some());
        if was_existing != node.exists {
            log::debug!(
                "{} {}",
                node.name,
                if node.exists { "existiert wieder" } else { "existiert nicht mehr" }
            );
        }
        self.nodes[id.0] = Some(node);

        if let Some(previous) = outcome.swap {
            self.rewire_parents(id);
            log::debug!(
                "Schnittpunkt {id}: Elternpaar {}/{} durch Ausweichpaar ersetzt",
                previous.first,
                previous.second
            );
        }
    }

    fn recompute(&self, node: &mut Node) -> Recomputed {
        let id = node.id;
        match &mut node.kind {
            NodeKind::Point(point) => self.recompute_point(id, point),
            NodeKind::Shape(shape) => self.recompute_shape(shape),
            NodeKind::Measurement(measurement) => self.recompute_measurement(&node.parents, measurement),
            NodeKind::Transformation(transformation) => self.recompute_transformation(transformation),
        }
    }

    // ── Punkte ──────────────────────────────────────────────────────

    fn recompute_point(&self, id: NodeId, point: &mut PointNode) -> Recomputed {
        let location = match &mut point.constraint {
            PointConstraint::Free => return Recomputed::exists(true),
            PointConstraint::OnShape { shape } => self
                .shape(*shape)
                .map(|s| s.closest_vector(point.location)),
            PointConstraint::Antipode { of } => self.location(*of).map(|v| -v),
            PointConstraint::IsometryImage {
                preimage,
                transformation,
            } => self
                .location(*preimage)
                .zip(self.isometry(*transformation))
                .map(|(v, iso)| iso.apply(v)),
            PointConstraint::Intersection(data) => {
                return self.recompute_intersection(id, data, &mut point.location);
            }
        };
        match location {
            Some(location) if location.is_finite() => {
                point.location = location;
                Recomputed::exists(true)
            }
            _ => Recomputed::exists(false),
        }
    }

    fn recompute_intersection(
        &self,
        id: NodeId,
        data: &mut IntersectionData,
        location: &mut DVec3,
    ) -> Recomputed {
        if let Some(twin) = data.antipode_of {
            return match self.location(twin) {
                Some(v) => {
                    *location = -v;
                    Recomputed::exists(true)
                }
                None => Recomputed::exists(false),
            };
        }

        if let Some(candidate) = self.pair_candidate(&data.principal) {
            *location = candidate;
            return Recomputed::exists(true);
        }

        // Ausweichpaare: nur aktuelle, existierende Formen, die nicht vom Punkt abhängen
        let tolerance = self.options.alternate_match_tolerance;
        let adopted = data.alternates.iter().enumerate().find_map(|(index, alternate)| {
            if !self.alternate_usable(id, alternate) {
                return None;
            }
            let candidate = self.pair_candidate(alternate)?;
            (candidate.distance(*location) < tolerance).then_some((index, candidate))
        });

        match adopted {
            Some((index, candidate)) => {
                let previous = std::mem::replace(&mut data.principal, data.alternates[index]);
                data.alternates[index] = previous;
                *location = candidate;
                Recomputed {
                    exists: true,
                    swap: Some(previous),
                }
            }
            None => Recomputed::exists(false),
        }
    }

    /// Existierender Kandidat des Paars am gemerkten Index.
    pub(super) fn pair_candidate(&self, pair: &IntersectionPair) -> Option<DVec3> {
        if !self.exists(pair.first) || !self.exists(pair.second) {
            return None;
        }
        let (a, b) = (self.shape(pair.first)?, self.shape(pair.second)?);
        intersect(a, b, &self.options)
            .get(pair.order)
            .filter(|c| c.exists)
            .map(|c| c.vector)
    }

    /// Ein Ausweichpaar ist nutzbar, wenn beide Formen aktuell sind, existieren und
    /// nicht selbst vom Schnittpunkt abhängen.
    pub(super) fn alternate_usable(&self, point: NodeId, pair: &IntersectionPair) -> bool {
        [pair.first, pair.second].iter().all(|shape| {
            self.get(*shape)
                .is_some_and(|n| n.exists && !n.out_of_date && n.shape().is_some())
                && !self.is_descendant(*shape, point)
        })
    }

    /// Setzt die Eltern eines Schnittpunkts auf sein aktuelles Hauptpaar (+ Zwilling).
    pub(super) fn rewire_parents(&mut self, id: NodeId) {
        let Some(node) = self.get(id) else {
            return;
        };
        let NodeKind::Point(PointNode {
            constraint: PointConstraint::Intersection(data),
            ..
        }) = &node.kind
        else {
            return;
        };
        let mut new_parents = vec![data.principal.first, data.principal.second];
        new_parents.extend(data.antipode_of);
        new_parents.dedup();
        let old_parents = node.parents.clone();

        for parent in old_parents.iter().filter(|p| !new_parents.contains(p)) {
            if let Some(parent) = self.nodes.get_mut(parent.0).and_then(Option::as_mut) {
                parent.kids.retain(|k| *k != id);
            }
        }
        for parent in new_parents.iter().filter(|p| !old_parents.contains(p)) {
            if let Some(parent) = self.nodes.get_mut(parent.0).and_then(Option::as_mut) {
                if !parent.kids.contains(&id) {
                    parent.kids.push(id);
                }
            }
        }
        if let Some(node) = self.nodes.get_mut(id.0).and_then(Option::as_mut) {
            node.parents = new_parents;
        }
    }

    // ── Formen ──────────────────────────────────────────────────────

    fn recompute_shape(&self, node: &mut ShapeNode) -> Recomputed {
        let ideal = self.options.nearly_antipodal_ideal;
        let exists = match (&node.provenance, &mut node.shape) {
            (Provenance::ThroughPoints(ids), shape) => {
                let Some(points) = ids
                    .iter()
                    .map(|id| self.location(*id))
                    .collect::<Option<Vec<DVec3>>>()
                else {
                    return Recomputed::exists(false);
                };
                match (shape, points.as_slice()) {
                    (Shape::Line(line), [start, end]) => line.set_points(*start, *end, ideal),
                    (Shape::Segment(segment), [start, end]) => segment.set_points(*start, *end, ideal),
                    (Shape::Circle(circle), [center, point]) => circle.set_points(*center, *point, ideal),
                    (Shape::Ellipse(ellipse), [f1, f2, point]) => ellipse.set_points(*f1, *f2, *point, ideal),
                    _ => false,
                }
            }
            (Provenance::Formula, Shape::Parametric(curve)) => {
                let bindings = self.measurement_bindings(&curve.definition().variables());
                match bindings {
                    Some(bindings) => curve.refresh(bindings),
                    None => false,
                }
            }
            (Provenance::Formula, _) => false,
            (
                Provenance::Perpendicular {
                    target,
                    through,
                    index,
                },
                Shape::Line(line),
            ) => match (self.shape(*target), self.location(*through)) {
                (Some(target), Some(point)) => {
                    let normals =
                        normals_to_perpendicular_lines_thru(target, point, line.normal, &self.options);
                    set_line_by_normal(line, point, normals.get(*index).copied())
                }
                _ => false,
            },
            (
                Provenance::Tangent {
                    target,
                    through,
                    index,
                },
                Shape::Line(line),
            ) => match (self.shape(*target), self.location(*through)) {
                (Some(target), Some(point)) => {
                    let normals = normals_to_tangent_lines_thru(target, point, &self.options);
                    set_line_by_normal(line, point, normals.get(*index).copied())
                }
                _ => false,
            },
            (Provenance::Perpendicular { .. } | Provenance::Tangent { .. }, _) => false,
            (
                Provenance::IsometryImage {
                    preimage,
                    transformation,
                },
                shape,
            ) => match (self.shape(*preimage), self.isometry(*transformation)) {
                (Some(preimage), Some(isometry)) => match preimage.mapped(&isometry) {
                    Ok(image) => {
                        *shape = image;
                        true
                    }
                    Err(e) => {
                        log::debug!("Bild nicht berechenbar: {e:#}");
                        false
                    }
                },
                _ => false,
            },
        };
        Recomputed::exists(exists)
    }

    /// Werte der benannten Messwerte; `None`, wenn einer fehlt.
    fn measurement_bindings(&self, names: &[String]) -> Option<IndexMap<String, f64>> {
        names
            .iter()
            .map(|name| {
                self.iter()
                    .find(|n| &n.name == name)
                    .and_then(Node::value)
                    .map(|v| (name.clone(), v))
            })
            .collect()
    }

    // ── Messwerte ───────────────────────────────────────────────────

    fn recompute_measurement(&self, parents: &[NodeId], node: &mut MeasurementNode) -> Recomputed {
        let value = match &node.measure {
            Measure::Formula(formula) => {
                let values: IndexMap<&str, f64> = parents
                    .iter()
                    .filter_map(|p| self.get(*p))
                    .filter_map(|n| n.value().map(|v| (n.name.as_str(), v)))
                    .collect();
                match formula.evaluate(0.0, &|name| values.get(name).copied()) {
                    Ok(value) => Some(value),
                    Err(e) => {
                        log::debug!("Formel {formula} nicht auswertbar: {e:#}");
                        None
                    }
                }
            }
            Measure::SegmentLength { segment } => match self.shape(*segment) {
                Some(Shape::Segment(segment)) => Some(segment.arc_length),
                _ => None,
            },
            Measure::PointDistance { a, b } => self
                .location(*a)
                .zip(self.location(*b))
                .map(|(a, b)| a.angle_to(b)),
        };
        match value {
            Some(value) if value.is_finite() => {
                node.value = value;
                Recomputed::exists(true)
            }
            _ => Recomputed::exists(false),
        }
    }

    // ── Transformationen ────────────────────────────────────────────

    fn recompute_transformation(&self, node: &mut TransformationNode) -> Recomputed {
        let isometry = match node.kind {
            TransformationKind::Rotation { center, angle } => self
                .location(center)
                .zip(self.value(angle))
                .map(|(axis, angle)| Isometry::Rotation { axis, angle }),
            TransformationKind::PointReflection { center } => {
                self.location(center).map(Isometry::point_reflection)
            }
            TransformationKind::Reflection { line } => self
                .shape(line)
                .and_then(Shape::great_circle_normal)
                .map(|normal| Isometry::Reflection { normal }),
            TransformationKind::Translation { line, distance } => self
                .shape(line)
                .and_then(Shape::great_circle_normal)
                .zip(self.value(distance))
                .map(|(normal, distance)| Isometry::translation(normal, distance)),
            TransformationKind::Inversion { circle } => match self.shape(circle) {
                Some(Shape::Circle(circle)) => Some(Isometry::Inversion {
                    center: circle.center,
                    radius: circle.radius,
                }),
                _ => None,
            },
        };
        match isometry {
            Some(isometry) => {
                node.isometry = isometry;
                Recomputed::exists(true)
            }
            None => Recomputed::exists(false),
        }
    }
}

/// Schnittpunkte mit Ausweichpaaren dürfen auch ohne existierendes Hauptpaar rechnen.
fn has_fallback(node: &Node) -> bool {
    matches!(
        &node.kind,
        NodeKind::Point(PointNode {
            constraint: PointConstraint::Intersection(IntersectionData {
                antipode_of: None,
                alternates,
                ..
            }),
            ..
        }) if !alternates.is_empty()
    )
}

/// Setzt eine Lot-/Tangentenlinie durch `point`; die Normale behält ihr Vorzeichen.
fn set_line_by_normal(line: &mut Line, point: DVec3, normal: Option<DVec3>) -> bool {
    let Some(mut normal) = normal else {
        return false;
    };
    if normal.dot(line.normal) < 0.0 {
        normal = -normal;
    }
    *line = Line::from_point_normal(point, normal);
    true
}
