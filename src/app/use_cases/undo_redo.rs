//! Use-Case: Undo/Redo über die Snapshot-History.

use crate::app::history::Snapshot;
use crate::app::AppState;

/// Führt einen Undo-Schritt aus. Liefert `false`, wenn nichts zu tun war.
pub fn undo(state: &mut AppState) -> anyhow::Result<bool> {
    let current = Snapshot::from_state(state);
    let Some(prev) = state.history.pop_undo_with_current(current) else {
        log::debug!("Undo: nichts zu tun");
        return Ok(false);
    };
    prev.apply_to(state)?;
    log::info!("Undo ausgeführt");
    Ok(true)
}

/// Führt einen Redo-Schritt aus. Liefert `false`, wenn nichts zu tun war.
pub fn redo(state: &mut AppState) -> anyhow::Result<bool> {
    let current = Snapshot::from_state(state);
    let Some(next) = state.history.pop_redo_with_current(current) else {
        log::debug!("Redo: nichts zu tun");
        return Ok(false);
    };
    next.apply_to(state)?;
    log::info!("Redo ausgeführt");
    Ok(true)
}
