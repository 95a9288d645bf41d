//! Konstruktions-Engine für Kugelgeometrie.
//! Core-Funktionalität als Library exportiert für Tests und Wiederverwendung.

pub mod app;
pub mod core;
pub mod shared;

pub use app::{move_object, pick_objects, AppState, EditHistory, PickedObject, Snapshot};
pub use core::{
    drag_rotation, intersect, project_screen_point, Candidate, CapturedState, ConstructionGraph,
    IdAllocator, Isometry, Node, NodeId, NodeKind, NodeSnapshot, PointConstraint, Provenance,
    Shape, ShapeKind, SphereVector,
};
pub use core::{SpatialIndex, SpatialMatch};
pub use shared::EngineOptions;
