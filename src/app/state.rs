use crate::app::history::{EditHistory, Snapshot};
use crate::core::ConstructionGraph;
use crate::shared::EngineOptions;

/// Maximale Anzahl Undo-Schritte
const HISTORY_DEPTH: usize = 200;

/// Hauptzustand der Anwendung
pub struct AppState {
    /// Die Konstruktion
    pub graph: ConstructionGraph,
    /// Undo/Redo-History (Snapshot-basiert)
    pub history: EditHistory,
    /// Vergrößerung der Ansicht (skaliert die Trefferdistanzen)
    pub magnification: f64,
}

impl AppState {
    /// Erstellt einen neuen, leeren App-State
    pub fn new(options: EngineOptions) -> Self {
        Self {
            graph: ConstructionGraph::new(options),
            history: EditHistory::new_with_capacity(HISTORY_DEPTH),
            magnification: 1.0,
        }
    }

    /// Gibt die Anzahl der Nodes zurück
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Undo/Redo helpers
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    /// Gibt zurück, ob ein Redo-Schritt verfügbar ist.
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Erstellt einen Undo-Snapshot des aktuellen Zustands.
    pub fn record_undo_snapshot(&mut self) {
        let snap = Snapshot::from_state(self);
        self.history.record_snapshot(snap);
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(EngineOptions::default())
    }
}
