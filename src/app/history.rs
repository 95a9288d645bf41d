use std::collections::VecDeque;

use crate::app::AppState;
use crate::core::{NodeId, NodeSnapshot};

/// Zustände aller Nodes zu einem Zeitpunkt.
///
/// Abgeleitete Nodes tragen nur `CapturedState::Derived`; beim Anwenden werden
/// freie Punkte, Punkte auf Formen und Segment-Orientierungen zurückgeschrieben
/// und der Rest per Update-Durchlauf neu berechnet. Nodes, die seit dem
/// Snapshot gelöscht wurden, werden übersprungen.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub states: Vec<NodeSnapshot>,
}

impl Snapshot {
    /// Hält den Zustand aller lebenden Nodes fest.
    pub fn from_state(state: &AppState) -> Self {
        let ids: Vec<NodeId> = state.graph.iter().map(|n| n.id).collect();
        Self {
            states: state.graph.capture_states(&ids),
        }
    }

    /// Schreibt den Snapshot zurück.
    pub fn apply_to(self, state: &mut AppState) -> anyhow::Result<()> {
        state.graph.restore_states(&self.states)
    }
}

/// Undo/Redo-Manager mit begrenzter Tiefe.
#[derive(Debug, Default)]
pub struct EditHistory {
    undo_stack: VecDeque<Snapshot>,
    redo_stack: VecDeque<Snapshot>,
    max_depth: usize,
}

fn push_bounded(stack: &mut VecDeque<Snapshot>, snap: Snapshot, max_depth: usize) {
    if max_depth == 0 {
        return;
    }
    if stack.len() >= max_depth {
        stack.pop_front();
    }
    stack.push_back(snap);
}

impl EditHistory {
    /// Erstellt einen neuen History-Manager mit maximaler Tiefe.
    pub fn new_with_capacity(max_depth: usize) -> Self {
        Self {
            undo_stack: VecDeque::with_capacity(max_depth),
            redo_stack: VecDeque::with_capacity(max_depth),
            max_depth,
        }
    }

    /// Legt einen vorab erstellten Snapshot ab und verwirft den Redo-Stack.
    pub fn record_snapshot(&mut self, snap: Snapshot) {
        push_bounded(&mut self.undo_stack, snap, self.max_depth);
        self.redo_stack.clear();
    }

    /// Prüft ob Undo möglich ist.
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Prüft ob Redo möglich ist.
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Nimmt den letzten Undo-Eintrag und legt `current` auf den Redo-Stack.
    pub fn pop_undo_with_current(&mut self, current: Snapshot) -> Option<Snapshot> {
        let prev = self.undo_stack.pop_back()?;
        push_bounded(&mut self.redo_stack, current, self.max_depth);
        Some(prev)
    }

    /// Nimmt den letzten Redo-Eintrag und legt `current` auf den Undo-Stack.
    pub fn pop_redo_with_current(&mut self, current: Snapshot) -> Option<Snapshot> {
        let next = self.redo_stack.pop_back()?;
        push_bounded(&mut self.undo_stack, current, self.max_depth);
        Some(next)
    }
}
