//! Graph-Nodes: Punkte, Formen, Messwerte und Transformationen.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use super::expression::Formula;
use super::ids::{NameKind, NodeId};
use super::shapes::{Shape, ShapeKind};
use super::transformation::Isometry;

/// Ein Knoten im Abhängigkeitsgraphen.
#[derive(Debug, Clone)]
pub struct Node {
    /// Stabile Arena-ID
    pub id: NodeId,
    /// Anzeigename aus dem `IdAllocator`
    pub name: String,
    /// Geometrisch definiert (nie `true`, solange ein Elternteil nicht existiert)
    pub exists: bool,
    /// Sichtbarkeit (nur für Picking relevant)
    pub showing: bool,
    /// Ergebnis spiegelt die aktuellen Eltern noch nicht wider
    pub out_of_date: bool,
    /// Eltern in definierender Reihenfolge
    pub parents: Vec<NodeId>,
    /// Kinder in Erstellungsreihenfolge
    pub kids: Vec<NodeId>,
    /// Art-spezifische Daten
    pub kind: NodeKind,
}

/// Art-spezifische Node-Daten.
#[derive(Debug, Clone)]
pub enum NodeKind {
    Point(PointNode),
    Shape(ShapeNode),
    Measurement(MeasurementNode),
    Transformation(TransformationNode),
}

impl NodeKind {
    /// Namensart für die ID-Vergabe.
    pub fn name_kind(&self) -> NameKind {
        match self {
            NodeKind::Point(_) => NameKind::Point,
            NodeKind::Shape(shape) => match shape.shape.kind() {
                ShapeKind::Line => NameKind::Line,
                ShapeKind::Segment => NameKind::Segment,
                ShapeKind::Circle => NameKind::Circle,
                ShapeKind::Ellipse => NameKind::Ellipse,
                ShapeKind::Parametric => NameKind::Parametric,
            },
            NodeKind::Measurement(_) => NameKind::Measurement,
            NodeKind::Transformation(_) => NameKind::Transformation,
        }
    }
}

/// Ein Punkt mit Ort und Bindung.
#[derive(Debug, Clone)]
pub struct PointNode {
    /// Aktueller Ort (Einheitsvektor)
    pub location: DVec3,
    pub constraint: PointConstraint,
}

/// Wie ein Punkt seinen Ort bestimmt.
#[derive(Debug, Clone, PartialEq)]
pub enum PointConstraint {
    /// Frei verschiebbar, keine Eltern
    Free,
    /// Nächster Punkt der Form zum bisherigen Ort
    OnShape { shape: NodeId },
    /// Gegenpunkt eines anderen Punkts
    Antipode { of: NodeId },
    /// Schnittpunkt zweier Formen
    Intersection(IntersectionData),
    /// Bild eines Punkts unter einer Transformation
    IsometryImage {
        preimage: NodeId,
        transformation: NodeId,
    },
}

/// Ein geordnetes Formenpaar mit Kandidaten-Index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntersectionPair {
    pub first: NodeId,
    pub second: NodeId,
    pub order: usize,
}

/// Zustand eines Schnittpunkts.
#[derive(Debug, Clone, PartialEq)]
pub struct IntersectionData {
    /// Bestimmendes Paar samt Index
    pub principal: IntersectionPair,
    /// Ausweichpaare, die denselben Punkt liefern können (keine Graph-Kanten)
    pub alternates: Vec<IntersectionPair>,
    /// Gegenpunkt-Modus: Ort = −Zwilling
    pub antipode_of: Option<NodeId>,
}

/// Eine Form samt Herkunft.
#[derive(Debug, Clone)]
pub struct ShapeNode {
    pub shape: Shape,
    pub provenance: Provenance,
}

/// Wie eine Form aus ihren Eltern entsteht.
#[derive(Debug, Clone, PartialEq)]
pub enum Provenance {
    /// Linie/Segment (Start, Ende), Kreis (Zentrum, Kreispunkt), Ellipse (F1, F2, Punkt)
    ThroughPoints(Vec<NodeId>),
    /// Parameterkurve; Eltern sind die referenzierten Messwerte
    Formula,
    /// Lot von `through` auf `target`, `index` in der Normalenliste
    Perpendicular {
        target: NodeId,
        through: NodeId,
        index: usize,
    },
    /// Tangente an `target` durch `through`
    Tangent {
        target: NodeId,
        through: NodeId,
        index: usize,
    },
    /// Bild einer Form unter einer Transformation
    IsometryImage {
        preimage: NodeId,
        transformation: NodeId,
    },
}

/// Ein Zahlenwert.
#[derive(Debug, Clone)]
pub struct MeasurementNode {
    pub value: f64,
    pub measure: Measure,
}

/// Woraus ein Messwert berechnet wird.
#[derive(Debug, Clone, PartialEq)]
pub enum Measure {
    /// Formel über andere Messwerte (Eltern = referenzierte Messwerte)
    Formula(Formula),
    /// Bogenlänge eines Segments
    SegmentLength { segment: NodeId },
    /// Winkelabstand zweier Punkte
    PointDistance { a: NodeId, b: NodeId },
}

/// Eine benannte Abbildung.
#[derive(Debug, Clone)]
pub struct TransformationNode {
    pub kind: TransformationKind,
    /// Zuletzt aufgelöste Abbildung
    pub isometry: Isometry,
}

/// Transformationsarten mit ihren steuernden Eltern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformationKind {
    /// Drehung um einen Punkt um einen Messwert
    Rotation { center: NodeId, angle: NodeId },
    /// Punktspiegelung (Drehung um π)
    PointReflection { center: NodeId },
    /// Spiegelung an Linie/Segment
    Reflection { line: NodeId },
    /// Verschiebung entlang Linie/Segment um einen Messwert
    Translation { line: NodeId, distance: NodeId },
    /// Inversion an einem Kreis
    Inversion { circle: NodeId },
}

/// Festgehaltener Zustand eines Nodes für Undo/Redo.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub state: CapturedState,
}

/// Was ein Node zur Wiederherstellung braucht.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CapturedState {
    /// Vollständig aus den Eltern bestimmt
    Derived,
    /// Freier Punkt oder Punkt auf Form
    Location(DVec3),
    /// Segment: Normale und Bogenlänge sind nicht aus den Endpunkten rekonstruierbar
    SegmentState { normal: DVec3, arc_length: f64 },
}

impl Node {
    /// Ort, falls der Node ein Punkt ist.
    pub fn location(&self) -> Option<DVec3> {
        match &self.kind {
            NodeKind::Point(point) => Some(point.location),
            _ => None,
        }
    }

    /// Form, falls der Node eine Form ist.
    pub fn shape(&self) -> Option<&Shape> {
        match &self.kind {
            NodeKind::Shape(shape) => Some(&shape.shape),
            _ => None,
        }
    }

    /// Wert, falls der Node ein Messwert ist.
    pub fn value(&self) -> Option<f64> {
        match &self.kind {
            NodeKind::Measurement(measurement) => Some(measurement.value),
            _ => None,
        }
    }

    /// `true` für freie Punkte.
    pub fn is_free_point(&self) -> bool {
        matches!(
            &self.kind,
            NodeKind::Point(PointNode {
                constraint: PointConstraint::Free,
                ..
            })
        )
    }

    /// Aktuellen Zustand festhalten.
    pub fn capture(&self) -> NodeSnapshot {
        let state = match &self.kind {
            NodeKind::Point(point) => match point.constraint {
                PointConstraint::Free | PointConstraint::OnShape { .. } => {
                    CapturedState::Location(point.location)
                }
                _ => CapturedState::Derived,
            },
            NodeKind::Shape(ShapeNode {
                shape: Shape::Segment(segment),
                ..
            }) => CapturedState::SegmentState {
                normal: segment.normal,
                arc_length: segment.arc_length,
            },
            _ => CapturedState::Derived,
        };
        NodeSnapshot { id: self.id, state }
    }

    /// Festgehaltenen Zustand zurückschreiben. Liefert `false`, wenn er nicht passt.
    pub fn restore(&mut self, state: &CapturedState) -> bool {
        match (state, &mut self.kind) {
            (CapturedState::Derived, _) => true,
            (CapturedState::Location(location), NodeKind::Point(point)) => {
                point.location = *location;
                true
            }
            (
                CapturedState::SegmentState { normal, arc_length },
                NodeKind::Shape(ShapeNode {
                    shape: Shape::Segment(segment),
                    ..
                }),
            ) => {
                segment.normal = *normal;
                segment.arc_length = *arc_length;
                true
            }
            _ => false,
        }
    }
}
