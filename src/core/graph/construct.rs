//! Konstruktions-Operationen: Nodes anlegen, Kanten registrieren, Erst-Update.

use anyhow::{bail, ensure, Context};
use glam::DVec3;

use super::ConstructionGraph;
use crate::core::expression::Formula;
use crate::core::ids::NodeId;
use crate::core::intersection::slot_count;
use crate::core::node::{
    IntersectionData, IntersectionPair, Measure, MeasurementNode, Node, NodeKind, NodeSnapshot,
    PointConstraint, PointNode, Provenance, ShapeNode, TransformationKind, TransformationNode,
};
use crate::core::shapes::{
    Circle, Ellipse, Line, ParametricCurve, ParametricDefinition, Segment, Shape, ShapeKind,
};
use crate::core::transformation::Isometry;
use crate::core::vector::SphereVector;

impl ConstructionGraph {
    /// Legt einen Node an, registriert ihn bei seinen Eltern und rechnet ihn erstmals.
    fn insert_node(&mut self, parents: Vec<NodeId>, kind: NodeKind) -> anyhow::Result<NodeId> {
        for parent in &parents {
            self.node(*parent)?;
        }
        let id = NodeId(self.nodes.len());
        let name = self.names.next_name(kind.name_kind());
        for parent in &parents {
            if let Some(node) = self.nodes.get_mut(parent.0).and_then(Option::as_mut) {
                if !node.kids.contains(&id) {
                    node.kids.push(id);
                }
            }
        }
        self.nodes.push(Some(Node {
            id,
            name,
            exists: false,
            showing: true,
            out_of_date: true,
            parents,
            kids: Vec::new(),
            kind,
        }));
        self.update(id, None)?;
        if let Some(node) = self.get(id) {
            log::info!(
                "{} ({id}) erstellt{}",
                node.name,
                if node.exists { "" } else { ", existiert nicht" }
            );
        }
        Ok(id)
    }

    fn require_point(&self, id: NodeId) -> anyhow::Result<DVec3> {
        let node = self.node(id)?;
        node.location()
            .with_context(|| format!("{} ist kein Punkt", node.name))
    }

    fn require_shape(&self, id: NodeId) -> anyhow::Result<&Shape> {
        let node = self.node(id)?;
        node.shape()
            .with_context(|| format!("{} ist keine Form", node.name))
    }

    fn require_great_circle(&self, id: NodeId) -> anyhow::Result<()> {
        let shape = self.require_shape(id)?;
        ensure!(
            matches!(shape.kind(), ShapeKind::Line | ShapeKind::Segment),
            "{id} ist weder Linie noch Segment"
        );
        Ok(())
    }

    fn require_measurement(&self, id: NodeId) -> anyhow::Result<()> {
        let node = self.node(id)?;
        ensure!(node.value().is_some(), "{} ist kein Messwert", node.name);
        Ok(())
    }

    /// IDs der Messwerte zu den Variablennamen einer Formel.
    fn resolve_variables(&self, names: &[String]) -> anyhow::Result<Vec<NodeId>> {
        names
            .iter()
            .map(|name| {
                self.iter()
                    .find(|n| &n.name == name && n.value().is_some())
                    .map(|n| n.id)
                    .with_context(|| format!("Unbekannter Messwert '{name}'"))
            })
            .collect()
    }

    // ── Punkte ──────────────────────────────────────────────────────

    /// Freier Punkt.
    pub fn create_point(&mut self, location: DVec3) -> anyhow::Result<NodeId> {
        let Some(location) = location.try_normalize() else {
            bail!("Nullvektor ist kein Ort auf der Kugel");
        };
        self.insert_node(
            Vec::new(),
            NodeKind::Point(PointNode {
                location,
                constraint: PointConstraint::Free,
            }),
        )
    }

    /// Punkt auf einer Form, nahe `near`.
    pub fn create_point_on_shape(&mut self, shape: NodeId, near: DVec3) -> anyhow::Result<NodeId> {
        let location = self.require_shape(shape)?.closest_vector(near);
        self.insert_node(
            vec![shape],
            NodeKind::Point(PointNode {
                location,
                constraint: PointConstraint::OnShape { shape },
            }),
        )
    }

    /// Gegenpunkt eines Punkts.
    pub fn create_antipodal_point(&mut self, of: NodeId) -> anyhow::Result<NodeId> {
        let location = -self.require_point(of)?;
        self.insert_node(
            vec![of],
            NodeKind::Point(PointNode {
                location,
                constraint: PointConstraint::Antipode { of },
            }),
        )
    }

    // ── Formen durch Punkte ─────────────────────────────────────────

    fn insert_shape(&mut self, parents: Vec<NodeId>, shape: Shape, provenance: Provenance) -> anyhow::Result<NodeId> {
        self.insert_node(parents, NodeKind::Shape(ShapeNode { shape, provenance }))
    }

    /// Großkreis durch zwei Punkte.
    pub fn create_line(&mut self, start: NodeId, end: NodeId) -> anyhow::Result<NodeId> {
        let line = Line::through(self.require_point(start)?, self.require_point(end)?);
        self.insert_shape(
            vec![start, end],
            Shape::Line(line),
            Provenance::ThroughPoints(vec![start, end]),
        )
    }

    /// Kürzeres Segment zwischen zwei Punkten.
    pub fn create_segment(&mut self, start: NodeId, end: NodeId) -> anyhow::Result<NodeId> {
        let segment = Segment::through(self.require_point(start)?, self.require_point(end)?);
        self.insert_shape(
            vec![start, end],
            Shape::Segment(segment),
            Provenance::ThroughPoints(vec![start, end]),
        )
    }

    /// Segment mit vorgegebener Orientierung (auch der lange Bogen).
    pub fn create_segment_with_normal(
        &mut self,
        start: NodeId,
        end: NodeId,
        normal: DVec3,
    ) -> anyhow::Result<NodeId> {
        let segment = Segment::with_normal(self.require_point(start)?, self.require_point(end)?, normal);
        self.insert_shape(
            vec![start, end],
            Shape::Segment(segment),
            Provenance::ThroughPoints(vec![start, end]),
        )
    }

    /// Kreis um `center` durch `circle_point`.
    pub fn create_circle(&mut self, center: NodeId, circle_point: NodeId) -> anyhow::Result<NodeId> {
        let circle = Circle::through(self.require_point(center)?, self.require_point(circle_point)?);
        self.insert_shape(
            vec![center, circle_point],
            Shape::Circle(circle),
            Provenance::ThroughPoints(vec![center, circle_point]),
        )
    }

    /// Ellipse aus zwei Brennpunkten und einem Kurvenpunkt.
    pub fn create_ellipse(&mut self, focus1: NodeId, focus2: NodeId, through: NodeId) -> anyhow::Result<NodeId> {
        let ellipse = Ellipse::through(
            self.require_point(focus1)?,
            self.require_point(focus2)?,
            self.require_point(through)?,
            self.options.curve_sample_count,
        );
        self.insert_shape(
            vec![focus1, focus2, through],
            Shape::Ellipse(ellipse),
            Provenance::ThroughPoints(vec![focus1, focus2, through]),
        )
    }

    /// Parameterkurve; referenzierte Messwerte werden zu Eltern.
    pub fn create_parametric(&mut self, definition: ParametricDefinition) -> anyhow::Result<NodeId> {
        let parents = self.resolve_variables(&definition.variables())?;
        let curve = ParametricCurve::new(
            definition,
            self.options.curve_sample_count,
            self.options.parametric_intersection_slots,
        );
        self.insert_shape(parents, Shape::Parametric(curve), Provenance::Formula)
    }

    // ── Messwerte ───────────────────────────────────────────────────

    fn insert_measurement(&mut self, parents: Vec<NodeId>, measure: Measure) -> anyhow::Result<NodeId> {
        self.insert_node(
            parents,
            NodeKind::Measurement(MeasurementNode { value: 0.0, measure }),
        )
    }

    /// Messwert aus einer Formel über andere Messwerte (ohne `t`).
    pub fn create_formula(&mut self, source: &str) -> anyhow::Result<NodeId> {
        let formula = Formula::parse(source)?;
        ensure!(
            !formula.depends_on_parameter(),
            "Messwert-Formel '{source}' darf nicht von t abhängen"
        );
        let parents = self.resolve_variables(&formula.variables())?;
        self.insert_measurement(parents, Measure::Formula(formula))
    }

    /// Bogenlänge eines Segments.
    pub fn create_segment_length(&mut self, segment: NodeId) -> anyhow::Result<NodeId> {
        ensure!(
            matches!(self.require_shape(segment)?, Shape::Segment(_)),
            "{segment} ist kein Segment"
        );
        self.insert_measurement(vec![segment], Measure::SegmentLength { segment })
    }

    /// Winkelabstand zweier Punkte.
    pub fn create_point_distance(&mut self, a: NodeId, b: NodeId) -> anyhow::Result<NodeId> {
        self.require_point(a)?;
        self.require_point(b)?;
        self.insert_measurement(vec![a, b], Measure::PointDistance { a, b })
    }

    // ── Schnittpunkte ───────────────────────────────────────────────

    fn insert_intersection(
        &mut self,
        first: NodeId,
        second: NodeId,
        order: usize,
        antipode_of: Option<NodeId>,
    ) -> anyhow::Result<NodeId> {
        ensure!(first != second, "Eine Form schneidet sich nicht mit sich selbst");
        let slots = slot_count(self.require_shape(first)?, self.require_shape(second)?);
        ensure!(order < slots, "Index {order} außerhalb der {slots} Schnitt-Slots");

        let location = match antipode_of {
            Some(twin) => -self.require_point(twin)?,
            None => DVec3::Z,
        };
        let mut parents = vec![first, second];
        parents.extend(antipode_of);
        self.insert_node(
            parents,
            NodeKind::Point(PointNode {
                location,
                constraint: PointConstraint::Intersection(IntersectionData {
                    principal: IntersectionPair { first, second, order },
                    alternates: Vec::new(),
                    antipode_of,
                }),
            }),
        )
    }

    /// Schnittpunkt mit Index `order` in der Kandidatenliste von `(first, second)`.
    pub fn create_intersection_point(&mut self, first: NodeId, second: NodeId, order: usize) -> anyhow::Result<NodeId> {
        self.insert_intersection(first, second, order, None)
    }

    /// Alle Schnittpunkte eines Paars. Bei zwei vollen Linien wird der zweite Punkt
    /// als Gegenpunkt des ersten angelegt; sobald ein Segment beteiligt ist, rechnet
    /// jeder Slot selbst, da der Bogen die beiden Kandidaten unabhängig filtert.
    pub fn create_intersection_points(&mut self, first: NodeId, second: NodeId) -> anyhow::Result<Vec<NodeId>> {
        let (a, b) = (self.require_shape(first)?, self.require_shape(second)?);
        let slots = slot_count(a, b);
        let great_circles = matches!((a, b), (Shape::Line(_), Shape::Line(_)));

        let mut created = Vec::with_capacity(slots);
        let head = self.insert_intersection(first, second, 0, None)?;
        created.push(head);
        for order in 1..slots {
            let twin = (great_circles && order == 1).then_some(head);
            created.push(self.insert_intersection(first, second, order, twin)?);
        }
        Ok(created)
    }

    fn intersection_data_mut(&mut self, point: NodeId) -> anyhow::Result<&mut IntersectionData> {
        let node = self.node_mut(point)?;
        match &mut node.kind {
            NodeKind::Point(PointNode {
                constraint: PointConstraint::Intersection(data),
                ..
            }) => Ok(data),
            _ => bail!("{} ist kein Schnittpunkt", node.name),
        }
    }

    /// Schaltet den Gegenpunkt-Modus eines Schnittpunkts (Ort = −Zwilling) ein oder aus.
    pub fn set_antipode_mode(&mut self, point: NodeId, twin: Option<NodeId>) -> anyhow::Result<()> {
        self.intersection_data_mut(point)?;
        if let Some(twin) = twin {
            self.require_point(twin)?;
            ensure!(
                !self.is_descendant(twin, point),
                "{twin} hängt von {point} ab; Gegenpunkt-Modus würde einen Zyklus bilden"
            );
        }
        self.intersection_data_mut(point)?.antipode_of = twin;
        self.rewire_parents(point);
        self.update(point, None)?;
        Ok(())
    }

    /// Fügt ein Ausweichpaar hinzu, das den Schnittpunkt übernehmen kann.
    pub fn add_intersection_alternate(
        &mut self,
        point: NodeId,
        first: NodeId,
        second: NodeId,
        order: usize,
    ) -> anyhow::Result<()> {
        let slots = slot_count(self.require_shape(first)?, self.require_shape(second)?);
        ensure!(order < slots, "Index {order} außerhalb der {slots} Schnitt-Slots");
        let data = self.intersection_data_mut(point)?;
        let pair = IntersectionPair { first, second, order };
        if data.principal != pair && !data.alternates.contains(&pair) {
            data.alternates.push(pair);
        }
        Ok(())
    }

    /// Löst einen Schnittpunkt von einer seiner Hauptformen, indem ein passendes
    /// Ausweichpaar ohne diese Form übernommen wird.
    pub fn remove_intersection_parent(&mut self, point: NodeId, parent: NodeId) -> anyhow::Result<()> {
        let data = self.intersection_data_mut(point)?.clone();
        ensure!(
            data.principal.first == parent || data.principal.second == parent,
            "{parent} ist kein Hauptelternteil von {point}"
        );
        let location = self.require_point(point)?;
        let tolerance = self.options.alternate_match_tolerance;

        let adopted = data.alternates.iter().enumerate().find_map(|(index, alternate)| {
            if alternate.first == parent || alternate.second == parent {
                return None;
            }
            if !self.alternate_usable(point, alternate) {
                return None;
            }
            let candidate = self.pair_candidate(alternate)?;
            (candidate.distance(location) < tolerance).then_some(index)
        });
        let Some(index) = adopted else {
            bail!("Kein nutzbares Ausweichpaar für {point} ohne {parent}");
        };

        let target = self.intersection_data_mut(point)?;
        target.principal = data.alternates[index];
        target.alternates = data
            .alternates
            .iter()
            .enumerate()
            .filter(|(i, pair)| *i != index && pair.first != parent && pair.second != parent)
            .map(|(_, pair)| *pair)
            .collect();
        self.rewire_parents(point);
        self.update(point, None)?;
        log::info!("{point} von {parent} gelöst");
        Ok(())
    }

    /// Hebt den Gegenpunkt-Modus von `point` auf, falls `twin` sein Zwilling ist.
    /// Der Punkt rechnet danach allein aus seinem Hauptpaar.
    fn release_antipode(&mut self, point: NodeId, twin: NodeId) -> bool {
        let Ok(data) = self.intersection_data_mut(point) else {
            return false;
        };
        if data.antipode_of != Some(twin) {
            return false;
        }
        data.antipode_of = None;
        self.rewire_parents(point);
        log::info!("{point}: Gegenpunkt-Modus aufgehoben, Zwilling {twin} entfernt");
        true
    }

    // ── Lote und Tangenten ──────────────────────────────────────────

    /// Lot von `through` auf `target`; `index` wählt unter mehreren Loten.
    pub fn create_perpendicular_line(&mut self, target: NodeId, through: NodeId, index: usize) -> anyhow::Result<NodeId> {
        self.require_shape(target)?;
        let point = self.require_point(through)?;
        self.insert_shape(
            vec![target, through],
            Shape::Line(Line::from_point_normal(point, point.any_perpendicular())),
            Provenance::Perpendicular {
                target,
                through,
                index,
            },
        )
    }

    /// Tangente an `target` durch `through`; `index` wählt unter mehreren Tangenten.
    pub fn create_tangent_line(&mut self, target: NodeId, through: NodeId, index: usize) -> anyhow::Result<NodeId> {
        self.require_shape(target)?;
        let point = self.require_point(through)?;
        self.insert_shape(
            vec![target, through],
            Shape::Line(Line::from_point_normal(point, point.any_perpendicular())),
            Provenance::Tangent {
                target,
                through,
                index,
            },
        )
    }

    // ── Transformationen ────────────────────────────────────────────

    fn insert_transformation(&mut self, parents: Vec<NodeId>, kind: TransformationKind) -> anyhow::Result<NodeId> {
        self.insert_node(
            parents,
            NodeKind::Transformation(TransformationNode {
                kind,
                isometry: Isometry::Identity,
            }),
        )
    }

    /// Drehung um `center` um den Wert des Messwerts `angle`.
    pub fn create_rotation(&mut self, center: NodeId, angle: NodeId) -> anyhow::Result<NodeId> {
        self.require_point(center)?;
        self.require_measurement(angle)?;
        self.insert_transformation(vec![center, angle], TransformationKind::Rotation { center, angle })
    }

    /// Punktspiegelung an `center`.
    pub fn create_point_reflection(&mut self, center: NodeId) -> anyhow::Result<NodeId> {
        self.require_point(center)?;
        self.insert_transformation(vec![center], TransformationKind::PointReflection { center })
    }

    /// Spiegelung an einer Linie bzw. einem Segment.
    pub fn create_reflection(&mut self, line: NodeId) -> anyhow::Result<NodeId> {
        self.require_great_circle(line)?;
        self.insert_transformation(vec![line], TransformationKind::Reflection { line })
    }

    /// Verschiebung entlang einer Linie um den Wert des Messwerts `distance`.
    pub fn create_translation(&mut self, line: NodeId, distance: NodeId) -> anyhow::Result<NodeId> {
        self.require_great_circle(line)?;
        self.require_measurement(distance)?;
        self.insert_transformation(vec![line, distance], TransformationKind::Translation { line, distance })
    }

    /// Inversion an einem Kreis.
    pub fn create_inversion(&mut self, circle: NodeId) -> anyhow::Result<NodeId> {
        ensure!(
            matches!(self.require_shape(circle)?, Shape::Circle(_)),
            "{circle} ist kein Kreis"
        );
        self.insert_transformation(vec![circle], TransformationKind::Inversion { circle })
    }

    /// Bild eines Punkts oder einer Form unter einer Transformation.
    pub fn create_isometry_image(&mut self, preimage: NodeId, transformation: NodeId) -> anyhow::Result<NodeId> {
        let kind = match &self.node(transformation)?.kind {
            NodeKind::Transformation(t) => t.kind,
            _ => bail!("{transformation} ist keine Transformation"),
        };
        let source = self.node(preimage)?;
        match &source.kind {
            NodeKind::Point(point) => {
                let location = point.location;
                self.insert_node(
                    vec![preimage, transformation],
                    NodeKind::Point(PointNode {
                        location,
                        constraint: PointConstraint::IsometryImage {
                            preimage,
                            transformation,
                        },
                    }),
                )
            }
            NodeKind::Shape(shape) => {
                if matches!(kind, TransformationKind::Inversion { .. }) {
                    bail!(
                        "Inversion von {} ergibt keine Form derselben Art",
                        source.name
                    );
                }
                let shape = shape.shape.clone();
                self.insert_shape(
                    vec![preimage, transformation],
                    shape,
                    Provenance::IsometryImage {
                        preimage,
                        transformation,
                    },
                )
            }
            _ => bail!("{} ist weder Punkt noch Form", source.name),
        }
    }

    // ── Entfernen ───────────────────────────────────────────────────

    /// Entfernt einen Node samt allen Nachfahren ohne andere Stütze.
    ///
    /// Schnittpunkte mit einem nutzbaren Ausweichpaar überleben durch Tausch,
    /// Gegenpunkte überleben ihren Zwilling ohne Gegenpunkt-Modus.
    /// Liefert die entfernten IDs; `collector` erhält je entferntem Node einen Snapshot.
    pub fn remove_node(
        &mut self,
        id: NodeId,
        mut collector: Option<&mut Vec<NodeSnapshot>>,
    ) -> anyhow::Result<Vec<NodeId>> {
        self.node(id)?;
        let mut removed = Vec::new();
        let mut survivors = Vec::new();
        let mut stack = vec![id];

        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get_mut(current.0).and_then(Option::take) else {
                continue;
            };
            for parent in &node.parents {
                if let Some(parent) = self.nodes.get_mut(parent.0).and_then(Option::as_mut) {
                    parent.kids.retain(|k| *k != current);
                }
            }
            if let Some(collector) = collector.as_deref_mut() {
                collector.push(node.capture());
            }
            log::info!("{} ({current}) entfernt", node.name);
            removed.push(current);

            for kid in node.kids {
                if self.get(kid).is_none() {
                    continue;
                }
                if self.release_antipode(kid, current)
                    || self.remove_intersection_parent(kid, current).is_ok()
                {
                    survivors.push(kid);
                } else {
                    stack.push(kid);
                }
            }
        }

        // Ausweichpaare sind keine Kanten: Verweise auf entfernte Formen aufräumen
        for node in self.nodes.iter_mut().flatten() {
            if let NodeKind::Point(PointNode {
                constraint: PointConstraint::Intersection(data),
                ..
            }) = &mut node.kind
            {
                data.alternates
                    .retain(|pair| !removed.contains(&pair.first) && !removed.contains(&pair.second));
            }
        }

        survivors.retain(|s| self.get(*s).is_some());
        if !survivors.is_empty() {
            self.update_roots(&survivors, None)?;
        }
        self.rebuild_spatial_index();
        Ok(removed)
    }
}
