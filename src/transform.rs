//! Whole-curve transforms
//!
//! Each transform rewrites the time map in one pass, rebuilds all tangents
//! and notifies once.

use crate::pattern::AutomationPattern;
use crate::timemap::{Sample, Tick, TimeMap};
use log::debug;

/// Fraction of the range added or removed by the absolute shifts
pub const ABS_SHIFT_FRACTION: f32 = 1.0 / 32.0;

/// Factor applied to deviations by the relative shifts
pub const REL_SHIFT_FACTOR: f32 = 1.03125;

impl AutomationPattern {
    fn replace_time_map(&mut self, map: TimeMap) {
        debug_assert!(map.is_ordered());
        self.time_map = map;
        self.rebuild_tangents();
        self.changed();
    }

    /// Mirror the curve in time around `length / 2`.
    ///
    /// Ticks up to `length` map to `length − tick`; samples beyond `length`
    /// keep their position. Without a length the last key is used.
    pub fn flip_x(&mut self, length: Option<Tick>) {
        let length = length
            .or_else(|| self.time_map.last().map(|s| s.tick))
            .unwrap_or(0);
        let flipped: TimeMap = self
            .time_map
            .iter()
            .map(|s| {
                if s.tick <= length {
                    Sample::new(length - s.tick, s.value)
                } else {
                    s
                }
            })
            .collect();
        debug!("flip_x over {length} ticks");
        self.replace_time_map(flipped);
    }

    /// Mirror values within the pattern's own range
    pub fn flip_y(&mut self) {
        let range = self.range();
        self.flip_y_within(range.min, range.max);
    }

    /// Mirror values: `v → max − (v − min)`, or plain negation `v → −v` when
    /// `min` is negative. Results are clamped to the pattern's range.
    pub fn flip_y_within(&mut self, min: f32, max: f32) {
        let range = self.range();
        if min < 0.0 {
            self.time_map.map_values(|_, v| range.clamp(-v));
        } else {
            self.time_map.map_values(|_, v| range.clamp(max - (v - min)));
        }
        self.rebuild_tangents();
        self.changed();
    }

    /// Raise every sample by 1/32 of the range
    pub fn move_abs_up(&mut self) {
        self.shift_by(self.range().span() * ABS_SHIFT_FRACTION);
    }

    /// Lower every sample by 1/32 of the range
    pub fn move_abs_down(&mut self) {
        self.shift_by(-self.range().span() * ABS_SHIFT_FRACTION);
    }

    /// Stretch deviations from the value at tick 0 by 1.03125
    pub fn move_rel_up(&mut self) {
        self.scale_around_origin(REL_SHIFT_FACTOR);
    }

    /// Shrink deviations from the value at tick 0 by 1.03125
    pub fn move_rel_down(&mut self) {
        self.scale_around_origin(1.0 / REL_SHIFT_FACTOR);
    }

    fn shift_by(&mut self, delta: f32) {
        let range = self.range();
        self.time_map.map_values(|_, v| range.clamp(v + delta));
        self.rebuild_tangents();
        self.changed();
    }

    fn scale_around_origin(&mut self, factor: f32) {
        let range = self.range();
        let origin = self.base_value_at(0);
        self.time_map
            .map_values(|_, v| range.clamp(origin + (v - origin) * factor));
        self.rebuild_tangents();
        self.changed();
    }

    /// Split into two independent patterns at `tick`, consuming the original.
    ///
    /// The left part keeps every sample before `tick` and ends there; the right
    /// part starts at `tick` with its samples shifted left by `tick`. Both get
    /// a sample at the cut holding the curve's value there, so each half
    /// reproduces its side of the curve.
    #[must_use]
    pub fn split_at(self, tick: Tick) -> (AutomationPattern, AutomationPattern) {
        let tick = tick.max(0);
        let cut_value = self.base_value_at(tick);
        let defined_at_cut = self.time_map.first().is_some_and(|s| s.tick <= tick);

        let mut left = self.clone();
        let mut right = self;
        left.drag = None;
        right.drag = None;

        left.time_map.retain(|s| s.tick < tick);
        if defined_at_cut {
            left.time_map.insert(tick, cut_value);
        }
        left.length = tick;

        let mut shifted: TimeMap = right
            .time_map
            .iter()
            .filter(|s| s.tick >= tick)
            .map(|s| Sample::new(s.tick - tick, s.value))
            .collect();
        if defined_at_cut && !shifted.contains(0) {
            shifted.insert(0, cut_value);
        }
        right.position = right.position.saturating_add(tick);
        right.length = (right.length - tick).max(0);

        let left_map = std::mem::take(&mut left.time_map);
        left.replace_time_map(left_map);
        right.replace_time_map(shifted);
        debug!("split pattern {:?} at tick {tick}", left.name());
        (left, right)
    }
}
