//! Application-Layer: State, Undo/Redo-History und Use-Cases.

pub mod history;
/// Application State
///
/// Hält Konstruktion, History und Ansichtsparameter zusammen.
pub mod state;
pub mod use_cases;

pub use history::{EditHistory, Snapshot};
pub use state::AppState;
pub use use_cases::move_objects::move_object;
pub use use_cases::pick::{pick_objects, PickedObject};
pub use use_cases::undo_redo::{redo, undo};
