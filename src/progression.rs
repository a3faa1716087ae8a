//! Interpolation disciplines between adjacent samples

use crate::timemap::{TangentMap, Tick, TimeMap};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Valid tension values for cubic-Hermite curves
pub const TENSION_RANGE: RangeInclusive<f32> = -10.0..=10.0;

pub const DEFAULT_TENSION: f32 = 1.0;

/// How values are interpolated from one sample to the next
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum Progression {
    /// Hold each value until the next sample
    #[default]
    Discrete,
    /// Straight line to the next sample
    Linear,
    /// Cubic Hermite spline using the cached tangents, scaled by `tension`
    CubicHermite { tension: f32 },
    /// 4-point Lagrange fit through the surrounding samples
    Parabolic,
}

/// Evaluation conditions signalled by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvalMode {
    #[default]
    Normal,
    /// Real-time overload: cheap interpolation, no waveform modulation
    Degraded,
}

impl EvalMode {
    #[inline]
    #[must_use]
    pub fn is_degraded(self) -> bool {
        matches!(self, EvalMode::Degraded)
    }
}

impl Progression {
    /// Ordinal used in persisted data
    #[must_use]
    pub fn ordinal(&self) -> u8 {
        match self {
            Progression::Discrete => 0,
            Progression::Linear => 1,
            Progression::CubicHermite { .. } => 2,
            Progression::Parabolic => 3,
        }
    }

    /// Inverse of [`Progression::ordinal`]; `tension` is only used for
    /// cubic-Hermite
    #[must_use]
    pub fn from_ordinal(ordinal: u8, tension: f32) -> Option<Self> {
        match ordinal {
            0 => Some(Progression::Discrete),
            1 => Some(Progression::Linear),
            2 => Some(Progression::CubicHermite { tension }),
            3 => Some(Progression::Parabolic),
            _ => None,
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Progression::Discrete => "Discrete",
            Progression::Linear => "Linear",
            Progression::CubicHermite { .. } => "Cubic Hermite",
            Progression::Parabolic => "Parabolic",
        }
    }

    #[must_use]
    pub fn tension(&self) -> Option<f32> {
        match self {
            Progression::CubicHermite { tension } => Some(*tension),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_cubic_hermite(&self) -> bool {
        matches!(self, Progression::CubicHermite { .. })
    }

    /// False for a cubic-Hermite progression whose tension is out of range
    #[must_use]
    pub fn is_valid(&self) -> bool {
        match self {
            Progression::CubicHermite { tension } => TENSION_RANGE.contains(tension),
            _ => true,
        }
    }

    /// Discipline actually used under `mode`: degraded evaluation demotes
    /// cubic-Hermite and parabolic to linear
    #[inline]
    #[must_use]
    pub fn effective(self, mode: EvalMode) -> Self {
        match (self, mode) {
            (Progression::CubicHermite { .. } | Progression::Parabolic, EvalMode::Degraded) => {
                Progression::Linear
            }
            (p, _) => p,
        }
    }

    /// Value at `offset` ticks past the sample at `index`.
    ///
    /// Returns 0 for an out-of-range index and the sample's own value when it
    /// is the last key.
    #[inline]
    #[must_use]
    pub fn evaluate(&self, map: &TimeMap, tangents: &TangentMap, index: usize, offset: Tick) -> f32 {
        let Some(k0) = map.sample(index) else {
            return 0.0;
        };
        let Some(k1) = map.sample(index + 1) else {
            return k0.value;
        };

        match self {
            Progression::Discrete => k0.value,
            Progression::Linear => {
                let slope = (k1.value - k0.value) / (k1.tick - k0.tick) as f32;
                k0.value + offset as f32 * slope
            }
            Progression::CubicHermite { tension } => {
                let n = (k1.tick - k0.tick) as f32;
                let t = offset as f32 / n;
                let m0 = tangents.get(k0.tick) * n * tension;
                let m1 = tangents.get(k1.tick) * n * tension;
                hermite(t, k0.value, m0, k1.value, m1)
            }
            Progression::Parabolic => lagrange4(map, index, k0.tick + offset),
        }
    }
}

impl std::fmt::Display for Progression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Cubic Hermite basis on the unit interval
#[inline]
fn hermite(t: f32, p0: f32, m0: f32, p1: f32, m1: f32) -> f32 {
    let t2 = t * t;
    let t3 = t2 * t;

    let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
    let h10 = t3 - 2.0 * t2 + t;
    let h01 = -2.0 * t3 + 3.0 * t2;
    let h11 = t3 - t2;

    h00 * p0 + h10 * m0 + h01 * p1 + h11 * m1
}

/// Lagrange polynomial through the keys at `index - 1 ..= index + 2`,
/// evaluated at tick `x`. Missing outer neighbours are extrapolated linearly
/// (`2·p1 − p2`).
fn lagrange4(map: &TimeMap, index: usize, x: Tick) -> f32 {
    let (Some(k1), Some(k2)) = (map.sample(index), map.sample(index + 1)) else {
        return 0.0;
    };
    let (x1, y1) = (f64::from(k1.tick), f64::from(k1.value));
    let (x2, y2) = (f64::from(k2.tick), f64::from(k2.value));

    let (x0, y0) = match index.checked_sub(1).and_then(|i| map.sample(i)) {
        Some(k) => (f64::from(k.tick), f64::from(k.value)),
        None => (2.0 * x1 - x2, 2.0 * y1 - y2),
    };
    let (x3, y3) = match map.sample(index + 2) {
        Some(k) => (f64::from(k.tick), f64::from(k.value)),
        None => (2.0 * x2 - x1, 2.0 * y2 - y1),
    };

    let xs = [x0, x1, x2, x3];
    let ys = [y0, y1, y2, y3];
    let x = f64::from(x);

    let mut value = 0.0;
    for i in 0..4 {
        let mut basis = 1.0;
        for j in 0..4 {
            if i != j {
                basis *= (x - xs[j]) / (xs[i] - xs[j]);
            }
        }
        value += basis * ys[i];
    }
    value as f32
}
