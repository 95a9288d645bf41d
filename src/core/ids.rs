//! Stabile Node-IDs und injizierbare Namensvergabe.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Stabiler Arena-Index eines Nodes. Wird nach dem Löschen nie wiederverwendet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Objektart für die Namensvergabe (je Art ein eigener Zähler).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NameKind {
    Point,
    Line,
    Segment,
    Circle,
    Ellipse,
    Parametric,
    Measurement,
    Transformation,
}

impl NameKind {
    fn prefix(self) -> &'static str {
        match self {
            NameKind::Point => "P",
            NameKind::Line => "Li",
            NameKind::Segment => "Ls",
            NameKind::Circle => "C",
            NameKind::Ellipse => "E",
            NameKind::Parametric => "Pa",
            NameKind::Measurement => "M",
            NameKind::Transformation => "T",
        }
    }
}

/// Vergibt fortlaufende Namen pro Objektart.
///
/// Wird beim Erzeugen des Graphen übergeben, damit mehrere Konstruktionen
/// (oder Tests) unabhängige Zähler haben.
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    counters: HashMap<NameKind, u32>,
}

impl IdAllocator {
    /// Erstellt einen Allocator mit allen Zählern auf 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Liefert den nächsten Namen der Art, z.B. `P3` oder `Li1`.
    pub fn next_name(&mut self, kind: NameKind) -> String {
        let counter = self.counters.entry(kind).or_insert(0);
        *counter += 1;
        format!("{}{}", kind.prefix(), counter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_are_per_kind() {
        let mut ids = IdAllocator::new();
        assert_eq!(ids.next_name(NameKind::Point), "P1");
        assert_eq!(ids.next_name(NameKind::Point), "P2");
        assert_eq!(ids.next_name(NameKind::Line), "Li1");
        assert_eq!(ids.next_name(NameKind::Measurement), "M1");
    }

    #[test]
    fn independent_allocators_do_not_share_state() {
        let mut first = IdAllocator::new();
        let mut second = IdAllocator::new();
        first.next_name(NameKind::Circle);
        assert_eq!(second.next_name(NameKind::Circle), "C1");
    }
}
