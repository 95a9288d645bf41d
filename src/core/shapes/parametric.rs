//! Parameterkurve `t ↦ normalize(x(t), y(t), z(t))` aus drei Formeln.
//!
//! Formeln dürfen neben `t` die Namen von Messwerten referenzieren. Die Werte
//! werden bei jedem Update über `refresh` gebunden.

use anyhow::Context;
use glam::{DMat3, DVec3};
use indexmap::IndexMap;

use super::sampled::{closest_parameter, SampleGrid, SampledCurve};
use crate::core::expression::Formula;

/// Unter dieser Länge gilt der Rohvektor als Nullvektor (nicht normierbar).
const MIN_RAW_LENGTH: f64 = 1e-12;

/// Benutzereingabe einer Parameterkurve.
#[derive(Debug, Clone, PartialEq)]
pub struct ParametricDefinition {
    /// Koordinatenformeln x, y, z
    pub coordinates: [Formula; 3],
    /// Untere Intervallgrenze
    pub t_min: Formula,
    /// Obere Intervallgrenze
    pub t_max: Formula,
    /// Stellen, an denen die Ableitung springt
    pub discontinuities: Vec<f64>,
}

impl ParametricDefinition {
    /// Parst alle fünf Formeln.
    pub fn parse(
        x: &str,
        y: &str,
        z: &str,
        t_min: &str,
        t_max: &str,
        discontinuities: Vec<f64>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            coordinates: [
                Formula::parse(x).context("x-Koordinate")?,
                Formula::parse(y).context("y-Koordinate")?,
                Formula::parse(z).context("z-Koordinate")?,
            ],
            t_min: Formula::parse(t_min).context("t-Minimum")?,
            t_max: Formula::parse(t_max).context("t-Maximum")?,
            discontinuities,
        })
    }

    /// Alle referenzierten Messwert-Namen.
    pub fn variables(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .coordinates
            .iter()
            .chain([&self.t_min, &self.t_max])
            .flat_map(Formula::variables)
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

/// Eine auf die Kugel normierte Parameterkurve.
#[derive(Debug, Clone, PartialEq)]
pub struct ParametricCurve {
    definition: ParametricDefinition,
    first: [Formula; 3],
    second: [Formula; 3],
    bindings: IndexMap<String, f64>,
    t_min: f64,
    t_max: f64,
    closed: bool,
    frame: DMat3,
    grid: SampleGrid,
    sample_count: usize,
    slots: usize,
}

impl ParametricCurve {
    /// Erstellt die Kurve ohne gültiges Gitter; erst `refresh` macht sie benutzbar.
    pub fn new(definition: ParametricDefinition, sample_count: usize, slots: usize) -> Self {
        let first = definition.coordinates.clone().map(|f| f.derivative());
        let second = first.clone().map(|f| f.derivative());
        Self {
            definition,
            first,
            second,
            bindings: IndexMap::new(),
            t_min: 0.0,
            t_max: 0.0,
            closed: false,
            frame: DMat3::IDENTITY,
            grid: SampleGrid::default(),
            sample_count,
            slots,
        }
    }

    /// Die zugrunde liegende Definition.
    pub fn definition(&self) -> &ParametricDefinition {
        &self.definition
    }

    /// Aktuelles Parameterintervall.
    pub fn range(&self) -> (f64, f64) {
        (self.t_min, self.t_max)
    }

    /// Frame-Matrix (Identität, außer bei Isometrie-Bildern).
    pub fn frame(&self) -> DMat3 {
        self.frame
    }

    /// Anzahl Schnittpunkt-Slots mit anderen Formen.
    pub fn intersection_slots(&self) -> usize {
        self.slots
    }

    /// Bindet neue Messwerte, wertet das Intervall aus und baut das Gitter neu.
    ///
    /// Die Kurve wird erst auf einer Kopie validiert; nur eine gültige Kopie wird
    /// übernommen. Ungültig sind: Auswertungsfehler, leeres oder invertiertes
    /// Intervall, nicht endliche oder nicht normierbare Stützpunkte.
    pub fn refresh(&mut self, bindings: IndexMap<String, f64>) -> bool {
        match self.refreshed(bindings) {
            Ok(curve) => {
                *self = curve;
                true
            }
            Err(e) => {
                log::debug!("Parameterkurve ungültig: {e:#}");
                false
            }
        }
    }

    fn refreshed(&self, bindings: IndexMap<String, f64>) -> anyhow::Result<Self> {
        let mut curve = self.clone();
        curve.bindings = bindings;
        let lookup = |name: &str| curve.bindings.get(name).copied();
        let t_min = curve.definition.t_min.evaluate(0.0, &lookup)?;
        let t_max = curve.definition.t_max.evaluate(0.0, &lookup)?;
        anyhow::ensure!(
            t_min.is_finite() && t_max.is_finite() && t_max > t_min,
            "Intervall [{t_min}, {t_max}] ist leer oder invertiert"
        );
        curve.t_min = t_min;
        curve.t_max = t_max;

        let raw_lengths_ok = (0..=curve.sample_count.max(2)).all(|i| {
            let t = t_min + (t_max - t_min) * i as f64 / curve.sample_count.max(2) as f64;
            curve.raw(t).length() > MIN_RAW_LENGTH
        });
        anyhow::ensure!(raw_lengths_ok, "Kurve läuft durch den Kugelmittelpunkt");

        let grid = SampleGrid::build(
            t_min,
            t_max,
            &curve.definition.discontinuities,
            curve.sample_count,
            |t| curve.point(t),
        );
        anyhow::ensure!(!grid.is_empty() && grid.is_finite(), "Kurve nicht auswertbar");
        curve.grid = grid;
        curve.closed = curve.point(t_min).distance(curve.point(t_max)) < 1e-9;
        Ok(curve)
    }

    fn eval_vector(&self, formulas: &[Formula; 3], t: f64) -> DVec3 {
        let lookup = |name: &str| self.bindings.get(name).copied();
        let component = |f: &Formula| f.evaluate(t, &lookup).unwrap_or(f64::NAN);
        DVec3::new(
            component(&formulas[0]),
            component(&formulas[1]),
            component(&formulas[2]),
        )
    }

    fn raw(&self, t: f64) -> DVec3 {
        self.eval_vector(&self.definition.coordinates, t)
    }

    /// Rohvektor f, Länge r und deren Ableitungen.
    fn raw_derivatives(&self, t: f64) -> (DVec3, DVec3, DVec3) {
        (
            self.raw(t),
            self.eval_vector(&self.first, t),
            self.eval_vector(&self.second, t),
        )
    }

    /// Nächster Punkt auf der Kurve.
    pub fn closest_vector(&self, target: DVec3) -> DVec3 {
        closest_parameter(self, target)
            .map(|(_, point)| point)
            .unwrap_or_else(|| self.point(self.t_min))
    }

    /// Vorzeichenbehafteter Abstand zum lokalen Tangential-Großkreis am nächsten Kurvenpunkt.
    ///
    /// Liefert (Wert, Gradient). Null genau auf der Kurve; dient als implizite
    /// Funktion beim numerischen Schneiden.
    pub fn signed_distance(&self, v: DVec3) -> (f64, DVec3) {
        let Some((t, point)) = closest_parameter(self, v) else {
            return (f64::NAN, DVec3::ZERO);
        };
        let normal = point.cross(self.first_derivative(t)).normalize_or_zero();
        (v.dot(normal), normal)
    }

    /// `true`, wenn `v` auf der Kurve liegt.
    pub fn contains(&self, v: DVec3, tolerance: f64) -> bool {
        self.closest_vector(v).distance(v) < tolerance
    }

    /// Bild unter einer orthogonalen Abbildung `m`.
    pub fn mapped(&self, m: DMat3) -> Self {
        let mut curve = self.clone();
        curve.frame = m * self.frame;
        curve.grid = self.grid.map_points(|v| m * v);
        curve
    }
}

impl SampledCurve for ParametricCurve {
    fn point(&self, t: f64) -> DVec3 {
        self.frame * self.raw(t).normalize_or_zero()
    }

    fn first_derivative(&self, t: f64) -> DVec3 {
        // u = f/r, r' = u·f', u' = (f' − r'u)/r
        let (f, df, _) = self.raw_derivatives(t);
        let r = f.length();
        let u = f / r;
        let dr = u.dot(df);
        self.frame * ((df - dr * u) / r)
    }

    fn second_derivative(&self, t: f64) -> DVec3 {
        // r'' = (f'·f' + f·f'' − r'²)/r, u'' = (f'' − r''u − 2r'u')/r
        let (f, df, ddf) = self.raw_derivatives(t);
        let r = f.length();
        let u = f / r;
        let dr = u.dot(df);
        let du = (df - dr * u) / r;
        let ddr = (df.dot(df) + f.dot(ddf) - dr * dr) / r;
        self.frame * ((ddf - ddr * u - 2.0 * dr * du) / r)
    }

    fn grid(&self) -> &SampleGrid {
        &self.grid
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}
