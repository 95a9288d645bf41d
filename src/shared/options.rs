//! Zentrale Konfiguration fuer die Konstruktions-Engine.
//!
//! `EngineOptions` enthält alle zur Laufzeit änderbaren Toleranzen und Abtastwerte.
//! Die `const`-Werte bleiben als Fallback/Default erhalten.

use serde::{Deserialize, Serialize};

// ── Toleranzen ──────────────────────────────────────────────────────

/// Allgemeine Null-Toleranz für Skalarprodukte und Längen.
pub const TOLERANCE: f64 = 1e-9;
/// Schwelle für |a × b|, unterhalb der zwei Punkte als gleich oder antipodal gelten.
pub const NEARLY_ANTIPODAL_IDEAL: f64 = 1e-3;
/// Winkel-Toleranz, mit der ein alternatives Elternpaar die Lage eines Schnittpunkts treffen muss.
pub const ALTERNATE_MATCH_TOLERANCE: f64 = 1e-2;
/// Grenze für |n1 · n2|, ab der zwei Lot-/Tangenten-Normalen als identisch gelten.
pub const NORMAL_DEDUP_TOLERANCE: f64 = 1e-6;

// ── Kurven-Abtastung ────────────────────────────────────────────────

/// Anzahl der t-Stützstellen für Ellipsen und Parameterkurven.
pub const CURVE_SAMPLE_COUNT: usize = 100;
/// Feste Anzahl an Schnitt-Kandidaten, sobald eine Parameterkurve beteiligt ist.
pub const PARAMETRIC_INTERSECTION_SLOTS: usize = 8;

// ── Hit-Test ────────────────────────────────────────────────────────

/// Ideale Trefferdistanz (Radiant) für Punkte bei Vergrößerung 1.0.
pub const POINT_HIT_IDEAL_DISTANCE: f64 = 0.04;
/// Ideale Trefferdistanz (Radiant) für eindimensionale Objekte bei Vergrößerung 1.0.
pub const SHAPE_HIT_IDEAL_DISTANCE: f64 = 0.03;

// ── Projektion ──────────────────────────────────────────────────────

/// Radius der Kugel-Silhouette in Screen-Pixeln.
pub const SPHERE_RADIUS_PX: f64 = 250.0;

// ── Laufzeit-Optionen (serialisierbar) ─────────────────────────────

/// Alle zur Laufzeit änderbaren Engine-Optionen.
/// Wird als `spherical_construction.toml` neben der Binary gespeichert.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineOptions {
    // ── Toleranzen ──────────────────────────────────────────────
    /// Allgemeine Null-Toleranz
    pub tolerance: f64,
    /// Schwelle für zusammenfallende/antipodale Definitionspunkte
    pub nearly_antipodal_ideal: f64,
    /// Toleranz beim Wechsel auf ein alternatives Elternpaar
    #[serde(default = "default_alternate_match_tolerance")]
    pub alternate_match_tolerance: f64,
    /// Toleranz für das Zusammenfassen fast paralleler Normalen
    pub normal_dedup_tolerance: f64,

    // ── Kurven ──────────────────────────────────────────────────
    /// Stützstellen pro Ellipse/Parameterkurve
    pub curve_sample_count: usize,
    /// Schnitt-Slots für Paare mit Parameterkurve
    #[serde(default = "default_parametric_intersection_slots")]
    pub parametric_intersection_slots: usize,

    // ── Hit-Test ────────────────────────────────────────────────
    /// Trefferdistanz für Punkte (Radiant, Vergrößerung 1.0)
    pub point_hit_ideal_distance: f64,
    /// Trefferdistanz für Linien, Kreise, Kurven (Radiant, Vergrößerung 1.0)
    pub shape_hit_ideal_distance: f64,

    // ── Projektion ──────────────────────────────────────────────
    /// Radius der Kugel-Silhouette in Screen-Pixeln
    pub sphere_radius_px: f64,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            tolerance: TOLERANCE,
            nearly_antipodal_ideal: NEARLY_ANTIPODAL_IDEAL,
            alternate_match_tolerance: ALTERNATE_MATCH_TOLERANCE,
            normal_dedup_tolerance: NORMAL_DEDUP_TOLERANCE,

            curve_sample_count: CURVE_SAMPLE_COUNT,
            parametric_intersection_slots: PARAMETRIC_INTERSECTION_SLOTS,

            point_hit_ideal_distance: POINT_HIT_IDEAL_DISTANCE,
            shape_hit_ideal_distance: SHAPE_HIT_IDEAL_DISTANCE,

            sphere_radius_px: SPHERE_RADIUS_PX,
        }
    }
}

/// Serde-Default für `alternate_match_tolerance` (Abwärtskompatibilität bestehender TOML-Dateien).
fn default_alternate_match_tolerance() -> f64 {
    ALTERNATE_MATCH_TOLERANCE
}

/// Serde-Default für `parametric_intersection_slots` (Abwärtskompatibilität).
fn default_parametric_intersection_slots() -> usize {
    PARAMETRIC_INTERSECTION_SLOTS
}

impl EngineOptions {
    /// Lädt Optionen aus einer TOML-Datei. Bei Fehler: Standardwerte.
    pub fn load_from_file(path: &std::path::Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(opts) => {
                    log::info!("Optionen geladen aus: {}", path.display());
                    opts
                }
                Err(e) => {
                    log::warn!("Optionen-Datei fehlerhaft, verwende Standardwerte: {}", e);
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("Keine Optionen-Datei gefunden, verwende Standardwerte");
                Self::default()
            }
        }
    }

    /// Speichert Optionen als TOML-Datei.
    pub fn save_to_file(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        log::info!("Optionen gespeichert nach: {}", path.display());
        Ok(())
    }

    /// Ermittelt den Pfad zur Optionen-Datei neben der Binary.
    pub fn config_path() -> std::path::PathBuf {
        std::env::current_exe()
            .unwrap_or_else(|_| std::path::PathBuf::from("spherical_construction"))
            .parent()
            .unwrap_or_else(|| std::path::Path::new("."))
            .join("spherical_construction.toml")
    }

    /// Trefferdistanz für Punkte bei gegebener Vergrößerung.
    pub fn point_hit_distance(&self, magnification: f64) -> f64 {
        self.point_hit_ideal_distance / magnification.max(f64::EPSILON)
    }

    /// Trefferdistanz für eindimensionale Objekte bei gegebener Vergrößerung.
    pub fn shape_hit_distance(&self, magnification: f64) -> f64 {
        self.shape_hit_ideal_distance / magnification.max(f64::EPSILON)
    }
}
