//! Geteilte Typen für layer-übergreifende Verträge.
//!
//! Enthält die Engine-Optionen, die sowohl von `core` als auch von `app`
//! gelesen werden, ohne direkte Abhängigkeiten zwischen den Layern zu erzeugen.
pub mod options;

pub use options::EngineOptions;
pub use options::{NEARLY_ANTIPODAL_IDEAL, SPHERE_RADIUS_PX, TOLERANCE};
