//! Quantization policy for inserting points
//!
//! Two independent step sizes: one on the tick axis, one on the value axis
//! (expressed as a fraction of the target range). The policy is a plain value
//! handed to each pattern, never process-wide state.

use crate::target::ValueRange;
use crate::timemap::Tick;
use serde::{Deserialize, Serialize};

/// Ticks in one bar (4 beats of 48 ticks)
pub const TICKS_PER_BAR: Tick = 192;

/// Default tick step: an eighth of a bar
pub const DEFAULT_TICK_STEP: Tick = TICKS_PER_BAR / 8;

/// Default value step: a sixteenth of the full range
pub const DEFAULT_VALUE_FRACTION: f32 = 1.0 / 16.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Quantization {
    /// Grid for point positions, in ticks. Values below 2 disable snapping.
    pub tick_step: Tick,
    /// Grid for values, as a fraction of the target range
    pub value_fraction: f32,
}

impl Default for Quantization {
    fn default() -> Self {
        Self {
            tick_step: DEFAULT_TICK_STEP,
            value_fraction: DEFAULT_VALUE_FRACTION,
        }
    }
}

impl Quantization {
    pub fn new(tick_step: Tick, value_fraction: f32) -> Self {
        Self {
            tick_step: tick_step.max(1),
            value_fraction: value_fraction.max(0.0),
        }
    }

    pub fn with_tick_step(mut self, tick_step: Tick) -> Self {
        self.tick_step = tick_step.max(1);
        self
    }

    pub fn with_value_fraction(mut self, fraction: f32) -> Self {
        self.value_fraction = fraction.max(0.0);
        self
    }

    /// Round `tick` to the nearest multiple of the tick step; ties go to the
    /// larger tick. Near the ends of the tick domain the nearest multiple that
    /// still fits is used.
    #[must_use]
    pub fn quantize_tick(&self, tick: Tick) -> Tick {
        if self.tick_step <= 1 {
            return tick;
        }
        let q = i64::from(self.tick_step);
        let t = i64::from(tick);
        let base = t.div_euclid(q) * q;
        let mut snapped = if t.rem_euclid(q) * 2 >= q { base + q } else { base };
        if snapped > i64::from(Tick::MAX) {
            snapped -= q;
        } else if snapped < i64::from(Tick::MIN) {
            snapped += q;
        }
        Tick::try_from(snapped).unwrap_or(tick)
    }

    /// Value grid size for a given range
    #[must_use]
    pub fn value_step(&self, range: &ValueRange) -> f32 {
        range.span() * self.value_fraction
    }

    /// Round `value` to the value grid anchored at `range.min`, clamped
    #[must_use]
    pub fn quantize_value(&self, value: f32, range: &ValueRange) -> f32 {
        snap(value, self.value_step(range), range)
    }

    /// Value reported for a raw pointer press: snapped to the value grid or
    /// the parameter's own step, whichever is coarser
    #[must_use]
    pub fn press_value(&self, raw: f32, range: &ValueRange) -> f32 {
        let step = self.value_step(range).max(range.step);
        snap(raw, step, range)
    }
}

fn snap(value: f32, step: f32, range: &ValueRange) -> f32 {
    if step <= 0.0 || !step.is_finite() {
        return range.clamp(value);
    }
    let steps = ((value - range.min) / step).round();
    range.clamp(range.min + steps * step)
}

/// How [`crate::AutomationPattern::put_value_with`] commits a point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PutOptions {
    /// Snap the tick to the tick grid
    pub quantize_position: bool,
    /// Keep neighbours closer than one tick step (only relevant when the
    /// position is quantized)
    pub ignore_surrounding: bool,
    /// Snap the value to the value grid
    pub quantize_value: bool,
}

impl Default for PutOptions {
    fn default() -> Self {
        Self {
            quantize_position: true,
            ignore_surrounding: true,
            quantize_value: false,
        }
    }
}

impl PutOptions {
    /// Commit exactly at the given tick and value
    pub fn exact() -> Self {
        Self {
            quantize_position: false,
            ignore_surrounding: true,
            quantize_value: false,
        }
    }

    pub fn with_quantize_position(mut self, on: bool) -> Self {
        self.quantize_position = on;
        self
    }

    pub fn with_ignore_surrounding(mut self, on: bool) -> Self {
        self.ignore_surrounding = on;
        self
    }

    pub fn with_quantize_value(mut self, on: bool) -> Self {
        self.quantize_value = on;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_steps() {
        let q = Quantization::default();
        assert_eq!(q.tick_step, 24);
        assert_eq!(q.value_step(&ValueRange::new(0.0, 1.0)), 0.0625);
    }

    #[test]
    fn test_quantize_tick_nearest() {
        let q = Quantization::default();
        assert_eq!(q.quantize_tick(0), 0);
        assert_eq!(q.quantize_tick(11), 0);
        assert_eq!(q.quantize_tick(12), 24); // tie goes up
        assert_eq!(q.quantize_tick(35), 24);
        assert_eq!(q.quantize_tick(37), 48);
        assert_eq!(q.quantize_tick(-13), -24);
    }

    #[test]
    fn test_quantize_tick_at_domain_edges() {
        let q = Quantization::default().with_tick_step(1000);
        assert_eq!(q.quantize_tick(Tick::MAX), 2_147_483_000);
        assert_eq!(q.quantize_tick(Tick::MIN), -2_147_483_000);
        assert_eq!(Quantization::default().quantize_tick(Tick::MAX), Tick::MAX / 24 * 24);
    }

    #[test]
    fn test_quantize_tick_disabled() {
        let q = Quantization::new(1, 0.0);
        assert_eq!(q.quantize_tick(37), 37);
    }

    #[test]
    fn test_quantize_value() {
        let q = Quantization::default();
        let range = ValueRange::new(-1.0, 1.0);
        // step = 2/16 = 0.125
        assert_eq!(q.quantize_value(0.3, &range), 0.25);
        assert_eq!(q.quantize_value(5.0, &range), 1.0);
    }

    #[test]
    fn test_press_value_uses_coarser_step() {
        let q = Quantization::default();
        let range = ValueRange::new(0.0, 10.0).with_step(1.0);
        // value grid 0.625 is finer than the parameter step
        assert_eq!(q.press_value(3.4, &range), 3.0);
        let fine = ValueRange::new(0.0, 10.0).with_step(0.01);
        assert_eq!(q.press_value(3.4, &fine), 3.125);
    }

    #[test]
    fn test_quantization_from_json_defaults_missing_fields() {
        let q: Quantization = serde_json::from_str(r#"{"tick_step": 48}"#).unwrap();
        assert_eq!(q.tick_step, 48);
        assert_eq!(q.value_fraction, DEFAULT_VALUE_FRACTION);
    }
}
