//! Use-Cases der Application-Layer-Orchestrierung.

pub mod move_objects;
pub mod pick;
pub mod undo_redo;
