//! Time map storage and tangent cache
//!
//! A [`TimeMap`] is the ground truth of an automation curve: an ordered set of
//! `(tick, value)` samples with unique ticks. The [`TangentMap`] mirrors its
//! keys with one slope per sample and is only meaningful for cubic-Hermite
//! curves; it can always be rebuilt from the time map.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Integer time unit, the engine's native time coordinate
pub type Tick = i32;

/// Single control point of a curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Position in ticks
    pub tick: Tick,
    /// Value at this position
    pub value: f32,
}

impl Sample {
    pub fn new(tick: Tick, value: f32) -> Self {
        Self { tick, value }
    }
}

/// Ordered `tick -> value` map with unique keys
///
/// Samples are kept in a sorted `Vec` and located with binary search, so
/// iteration always yields strictly increasing ticks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeMap {
    samples: Vec<Sample>,
}

impl TimeMap {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Sample> + '_ {
        self.samples.iter().copied()
    }

    pub fn ticks(&self) -> impl Iterator<Item = Tick> + '_ {
        self.samples.iter().map(|s| s.tick)
    }

    pub fn as_slice(&self) -> &[Sample] {
        &self.samples
    }

    #[must_use]
    pub fn first(&self) -> Option<Sample> {
        self.samples.first().copied()
    }

    #[must_use]
    pub fn last(&self) -> Option<Sample> {
        self.samples.last().copied()
    }

    /// Sample at a given index in key order
    #[inline]
    #[must_use]
    pub fn sample(&self, index: usize) -> Option<Sample> {
        self.samples.get(index).copied()
    }

    /// Value stored exactly at `tick`
    #[must_use]
    pub fn get(&self, tick: Tick) -> Option<f32> {
        self.search(tick).ok().map(|idx| self.samples[idx].value)
    }

    #[must_use]
    pub fn contains(&self, tick: Tick) -> bool {
        self.search(tick).is_ok()
    }

    #[inline]
    fn search(&self, tick: Tick) -> Result<usize, usize> {
        self.samples.binary_search_by_key(&tick, |s| s.tick)
    }

    /// Index of the exact key `tick`
    #[must_use]
    pub fn index_of(&self, tick: Tick) -> Option<usize> {
        self.search(tick).ok()
    }

    /// Index of the first key that is `>= tick` (may equal `len()`)
    #[inline]
    #[must_use]
    pub fn lower_bound(&self, tick: Tick) -> usize {
        match self.search(tick) {
            Ok(idx) | Err(idx) => idx,
        }
    }

    /// Index of the greatest key that is `<= tick`
    #[inline]
    #[must_use]
    pub fn floor_index(&self, tick: Tick) -> Option<usize> {
        match self.search(tick) {
            Ok(idx) => Some(idx),
            Err(0) => None,
            Err(idx) => Some(idx - 1),
        }
    }

    /// Insert or replace the value at `tick`, returning the previous value
    pub fn insert(&mut self, tick: Tick, value: f32) -> Option<f32> {
        match self.search(tick) {
            Ok(idx) => Some(std::mem::replace(&mut self.samples[idx].value, value)),
            Err(idx) => {
                self.samples.insert(idx, Sample::new(tick, value));
                None
            }
        }
    }

    /// Remove the sample at exactly `tick`
    pub fn remove(&mut self, tick: Tick) -> Option<f32> {
        let idx = self.search(tick).ok()?;
        Some(self.samples.remove(idx).value)
    }

    /// Remove every sample whose tick lies strictly between `lo` and `hi`,
    /// returning the removed ticks
    pub fn remove_between(&mut self, lo: Tick, hi: Tick) -> Vec<Tick> {
        if hi <= lo.saturating_add(1) {
            return Vec::new();
        }
        let start = self.lower_bound(lo.saturating_add(1));
        let end = self.lower_bound(hi).max(start);
        self.samples.drain(start..end).map(|s| s.tick).collect()
    }

    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&Sample) -> bool,
    {
        self.samples.retain(|s| keep(s));
    }

    /// Apply `f` to every value in place; keys are untouched
    pub fn map_values<F>(&mut self, mut f: F)
    where
        F: FnMut(Tick, f32) -> f32,
    {
        for sample in &mut self.samples {
            sample.value = f(sample.tick, sample.value);
        }
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Check the strictly-ascending key invariant
    #[must_use]
    pub fn is_ordered(&self) -> bool {
        self.samples.windows(2).all(|w| w[0].tick < w[1].tick)
    }
}

impl FromIterator<Sample> for TimeMap {
    /// Later samples win when two share a tick
    fn from_iter<I: IntoIterator<Item = Sample>>(iter: I) -> Self {
        let mut map = TimeMap::new();
        for sample in iter {
            map.insert(sample.tick, sample.value);
        }
        map
    }
}

impl FromIterator<(Tick, f32)> for TimeMap {
    fn from_iter<I: IntoIterator<Item = (Tick, f32)>>(iter: I) -> Self {
        iter.into_iter().map(|(t, v)| Sample::new(t, v)).collect()
    }
}

// ==================== Tangent Cache ====================

/// Per-key slopes used by cubic-Hermite evaluation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TangentMap {
    slopes: BTreeMap<Tick, f32>,
}

impl TangentMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slope at `tick`, zero when no tangent is cached
    #[inline]
    #[must_use]
    pub fn get(&self, tick: Tick) -> f32 {
        self.slopes.get(&tick).copied().unwrap_or(0.0)
    }

    #[must_use]
    pub fn contains(&self, tick: Tick) -> bool {
        self.slopes.contains_key(&tick)
    }

    pub fn remove(&mut self, tick: Tick) {
        self.slopes.remove(&tick);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slopes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slopes.is_empty()
    }

    pub fn clear(&mut self) {
        self.slopes.clear();
    }

    /// Regenerate `count` tangents starting at key index `start`.
    ///
    /// The first and last keys always get a zero slope and generation stops at
    /// the last key. Interior keys get the centered finite difference when
    /// `hermite` is set and zero otherwise.
    pub fn generate(&mut self, map: &TimeMap, start: usize, count: usize, hermite: bool) {
        if map.len() < 2 {
            if let Some(sample) = map.sample(start) {
                self.slopes.insert(sample.tick, 0.0);
            }
            return;
        }

        for idx in start..start.saturating_add(count) {
            let Some(sample) = map.sample(idx) else {
                return;
            };

            if idx + 1 == map.len() {
                self.slopes.insert(sample.tick, 0.0);
                return;
            }

            let slope = match (idx.checked_sub(1).and_then(|i| map.sample(i)), hermite) {
                (Some(prev), true) => {
                    // idx is interior here, so idx + 1 exists
                    let next = map.samples[idx + 1];
                    (next.value - prev.value) / (next.tick - prev.tick) as f32
                }
                _ => 0.0,
            };
            self.slopes.insert(sample.tick, slope);
        }
    }

    /// Drop every cached slope and regenerate all keys
    pub fn rebuild(&mut self, map: &TimeMap, hermite: bool) {
        self.slopes.clear();
        self.generate(map, 0, map.len(), hermite);
    }
}
