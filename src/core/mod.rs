//! Core-Domänentypen: Vektoren, Formen, Schnitte, Transformationen und der Abhängigkeitsgraph.

pub mod expression;
pub mod graph;
pub mod ids;
pub mod intersection;
/// Graph-Nodes und ihre Zustands-Snapshots
///
/// Dieses Modul definiert die Node-Daten:
/// - Node: Arena-Eintrag mit Eltern, Kindern und Flags
/// - PointConstraint / Provenance: wie Punkte und Formen aus ihren Eltern entstehen
/// - NodeSnapshot: serialisierbarer Zustand für Undo/Redo
pub mod node;
pub mod perpendicular;
pub mod shapes;
pub mod spatial;
pub mod transformation;
pub mod vector;

pub use expression::Formula;
pub use graph::ConstructionGraph;
pub use ids::{IdAllocator, NameKind, NodeId};
pub use intersection::{intersect, Candidate};
pub use node::{
    CapturedState, IntersectionData, IntersectionPair, Measure, Node, NodeKind, NodeSnapshot,
    PointConstraint, Provenance, TransformationKind,
};
pub use perpendicular::{normals_to_perpendicular_lines_thru, normals_to_tangent_lines_thru};
pub use shapes::{
    Circle, Ellipse, Line, ParametricCurve, ParametricDefinition, Segment, Shape, ShapeKind,
};
pub use spatial::{SpatialIndex, SpatialMatch};
pub use transformation::Isometry;
pub use vector::{drag_rotation, project_screen_point, SphereVector};
