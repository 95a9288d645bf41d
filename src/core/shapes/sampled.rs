//! Abtast- und Newton-Suche für Ellipsen und Parameterkurven.
//!
//! Beide Kurvenarten liefern Punkt, erste und zweite Ableitung nach `t`. Darauf aufbauend:
//! - `closest_parameter` : nächster Kurvenpunkt (Stützstelle je Teilbereich + Newton)
//! - `find_roots` : Nullstellen einer Funktion entlang der Kurve (Vorzeichenwechsel + Newton/Bisektion)

use glam::DVec3;

/// Maximale Newton-Schritte beim Verfeinern eines Minimums.
const NEWTON_MAX_STEPS: usize = 8;
/// Maximale Schritte für Nullstellen (geklammert bzw. Berührpunkte).
const ROOT_MAX_STEPS: usize = 60;
/// Abbruch, sobald der Parameter sich um weniger als diesen Wert ändert.
const PARAMETER_TOLERANCE: f64 = 1e-13;
/// Funktionswert, ab dem eine Nullstelle als gefunden gilt.
const ROOT_TOLERANCE: f64 = 1e-12;
/// Berührpunkte (doppelte Nullstellen) müssen mindestens so genau getroffen werden.
const TOUCH_TOLERANCE: f64 = 1e-10;
/// Nullstellen näher als dieser Parameterabstand werden zusammengefasst.
const ROOT_MERGE_DISTANCE: f64 = 1e-7;

/// Kurve mit Parametrisierung und Stützstellen-Gitter.
pub trait SampledCurve {
    /// Punkt bei Parameter `t` (Einheitsvektor)
    fn point(&self, t: f64) -> DVec3;
    /// Erste Ableitung nach `t`
    fn first_derivative(&self, t: f64) -> DVec3;
    /// Zweite Ableitung nach `t`
    fn second_derivative(&self, t: f64) -> DVec3;
    /// Vorberechnetes t-Gitter
    fn grid(&self) -> &SampleGrid;
    /// Geschlossene Kurve: Anfang und Ende fallen zusammen
    fn is_closed(&self) -> bool;
}

/// Ein C¹-stetiger Teilbereich des Parameterintervalls.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    /// Aufsteigende t-Werte inklusive beider Grenzen
    pub t_values: Vec<f64>,
    /// Kurvenpunkte zu `t_values`
    pub points: Vec<DVec3>,
}

impl Partition {
    fn bounds(&self) -> (f64, f64) {
        (
            self.t_values.first().copied().unwrap_or(0.0),
            self.t_values.last().copied().unwrap_or(0.0),
        )
    }
}

/// t-Gitter einer Kurve, an den Unstetigkeitsstellen der Ableitung aufgeteilt.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleGrid {
    partitions: Vec<Partition>,
}

impl SampleGrid {
    /// Baut das Gitter über `[t_min, t_max]`.
    ///
    /// Stützstellen werden proportional zur Teilbereichslänge verteilt, mindestens drei je Teilbereich.
    pub fn build(
        t_min: f64,
        t_max: f64,
        discontinuities: &[f64],
        sample_count: usize,
        point: impl Fn(f64) -> DVec3,
    ) -> Self {
        let total = t_max - t_min;
        if !(total > 0.0) {
            return Self::default();
        }

        let mut boundaries = vec![t_min];
        let mut inner: Vec<f64> = discontinuities
            .iter()
            .copied()
            .filter(|t| *t > t_min && *t < t_max)
            .collect();
        inner.sort_by(|a, b| a.total_cmp(b));
        inner.dedup();
        boundaries.extend(inner);
        boundaries.push(t_max);

        let partitions = boundaries
            .windows(2)
            .map(|w| {
                let (lo, hi) = (w[0], w[1]);
                let share = (sample_count as f64 * (hi - lo) / total).round() as usize;
                let count = share.max(3);
                let t_values: Vec<f64> = (0..count)
                    .map(|i| lo + (hi - lo) * i as f64 / (count - 1) as f64)
                    .collect();
                let points = t_values.iter().map(|&t| point(t)).collect();
                Partition { t_values, points }
            })
            .collect();

        Self { partitions }
    }

    /// Alle Teilbereiche.
    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    /// `true`, wenn kein Teilbereich vorhanden ist.
    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }

    /// `true`, wenn alle Stützpunkte endlich sind.
    pub fn is_finite(&self) -> bool {
        self.partitions
            .iter()
            .flat_map(|p| p.points.iter())
            .all(|p| p.is_finite())
    }

    /// Gitter mit transformierten Punkten (gleiche t-Werte), z.B. für Isometrie-Bilder.
    pub fn map_points(&self, f: impl Fn(DVec3) -> DVec3) -> Self {
        Self {
            partitions: self
                .partitions
                .iter()
                .map(|p| Partition {
                    t_values: p.t_values.clone(),
                    points: p.points.iter().map(|&v| f(v)).collect(),
                })
                .collect(),
        }
    }

    /// Alle Stützpunkte in Reihenfolge (für Hit-Tests und Export).
    pub fn points(&self) -> impl Iterator<Item = DVec3> + '_ {
        self.partitions.iter().flat_map(|p| p.points.iter().copied())
    }
}

/// Nächster Kurvenpunkt zu `target`: (Parameter, Punkt).
///
/// Je Teilbereich wird die beste Stützstelle mit Newton-Schritten auf `P'(t)·target = 0`
/// verfeinert; die Verfeinerung wird nur übernommen, wenn sie tatsächlich näher liegt.
pub fn closest_parameter<C: SampledCurve + ?Sized>(curve: &C, target: DVec3) -> Option<(f64, DVec3)> {
    let mut best: Option<(f64, DVec3, f64)> = None;

    for partition in curve.grid().partitions() {
        let Some((index, sample_dot)) = partition
            .points
            .iter()
            .map(|p| p.dot(target))
            .enumerate()
            .filter(|(_, dot)| dot.is_finite())
            .max_by(|a, b| a.1.total_cmp(&b.1))
        else {
            continue;
        };

        let (lo, hi) = partition.bounds();
        let mut t = partition.t_values[index];
        for _ in 0..NEWTON_MAX_STEPS {
            let slope = curve.first_derivative(t).dot(target);
            let curvature = curve.second_derivative(t).dot(target);
            if !slope.is_finite() || !curvature.is_finite() || curvature.abs() < 1e-14 {
                break;
            }
            let next = (t - slope / curvature).clamp(lo, hi);
            let step = (next - t).abs();
            t = next;
            if step < PARAMETER_TOLERANCE {
                break;
            }
        }

        let refined = curve.point(t);
        let refined_dot = refined.dot(target);
        let candidate = if refined_dot.is_finite() && refined_dot >= sample_dot {
            (t, refined, refined_dot)
        } else {
            (partition.t_values[index], partition.points[index], sample_dot)
        };

        if best.map_or(true, |b| candidate.2 > b.2) {
            best = Some(candidate);
        }
    }

    best.map(|(t, p, _)| (t, p))
}

/// Nullstellen von `f` entlang der Kurve, aufsteigend nach `t`.
///
/// `f` liefert (Wert, Ableitung nach t). Gefunden werden Vorzeichenwechsel zwischen
/// Stützstellen sowie Berührpunkte (lokale Minima von |f| ohne Vorzeichenwechsel).
pub fn find_roots<C: SampledCurve + ?Sized>(curve: &C, f: impl Fn(f64) -> (f64, f64)) -> Vec<f64> {
    let mut roots = Vec::new();

    for partition in curve.grid().partitions() {
        let values: Vec<f64> = partition.t_values.iter().map(|&t| f(t).0).collect();
        let t_values = &partition.t_values;

        for i in 0..t_values.len() {
            let value = values[i];
            if !value.is_finite() {
                continue;
            }
            if value == 0.0 {
                roots.push(t_values[i]);
                continue;
            }
            if i + 1 < t_values.len() {
                let next = values[i + 1];
                if next.is_finite() && next != 0.0 && value.signum() != next.signum() {
                    if let Some(root) = refine_bracketed(&f, t_values[i], t_values[i + 1], value) {
                        roots.push(root);
                    }
                    continue;
                }
            }
            if i > 0 && i + 1 < t_values.len() {
                let (prev, next) = (values[i - 1], values[i + 1]);
                let is_local_min = value.abs() <= prev.abs() && value.abs() <= next.abs();
                let same_sign = prev.signum() == value.signum() && next.signum() == value.signum();
                if is_local_min && same_sign {
                    if let Some(root) = refine_touching(&f, t_values[i - 1], t_values[i + 1], t_values[i]) {
                        roots.push(root);
                    }
                }
            }
        }
    }

    roots.sort_by(|a, b| a.total_cmp(b));
    roots.dedup_by(|a, b| (*a - *b).abs() < ROOT_MERGE_DISTANCE);

    if curve.is_closed() && roots.len() > 1 {
        let bounds = curve
            .grid()
            .partitions()
            .first()
            .map(|p| p.bounds().0)
            .zip(curve.grid().partitions().last().map(|p| p.bounds().1));
        if let Some((t_min, t_max)) = bounds {
            let first = roots[0];
            let last = roots[roots.len() - 1];
            if (first - t_min).abs() < ROOT_MERGE_DISTANCE && (t_max - last).abs() < ROOT_MERGE_DISTANCE {
                roots.pop();
            }
        }
    }

    roots
}

/// Geschützte Newton-Iteration im Vorzeichenwechsel-Intervall [lo, hi].
fn refine_bracketed(f: &impl Fn(f64) -> (f64, f64), lo: f64, hi: f64, f_lo: f64) -> Option<f64> {
    let (mut lo, mut hi, mut f_lo) = (lo, hi, f_lo);
    let mut t = 0.5 * (lo + hi);

    for _ in 0..ROOT_MAX_STEPS {
        let (value, slope) = f(t);
        if !value.is_finite() {
            return None;
        }
        if value.abs() < ROOT_TOLERANCE {
            return Some(t);
        }
        if value.signum() == f_lo.signum() {
            lo = t;
            f_lo = value;
        } else {
            hi = t;
        }
        if hi - lo < PARAMETER_TOLERANCE {
            return Some(0.5 * (lo + hi));
        }
        let newton = t - value / slope;
        t = if newton.is_finite() && newton > lo && newton < hi {
            newton
        } else {
            0.5 * (lo + hi)
        };
    }

    Some(t)
}

/// Newton-Iteration für Berührpunkte, begrenzt auf [lo, hi]; nur Treffer werden akzeptiert.
fn refine_touching(f: &impl Fn(f64) -> (f64, f64), lo: f64, hi: f64, start: f64) -> Option<f64> {
    let mut t = start;
    for _ in 0..ROOT_MAX_STEPS {
        let (value, slope) = f(t);
        if !value.is_finite() {
            return None;
        }
        if value.abs() < TOUCH_TOLERANCE {
            return Some(t);
        }
        if !slope.is_finite() || slope == 0.0 {
            return None;
        }
        t = (t - value / slope).clamp(lo, hi);
    }
    None
}
