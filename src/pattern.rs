//! Automation pattern: one automated curve and the parameters it drives
//!
//! The pattern owns its [`TimeMap`] and [`TangentMap`] and evaluates them
//! through its [`Progression`] and waveform overlay. Target parameters are
//! referenced through [`ParameterKey`] handles only.

use crate::drag::DragSnapshot;
use crate::progression::{EvalMode, Progression, DEFAULT_TENSION, TENSION_RANGE};
use crate::quantize::{PutOptions, Quantization, TICKS_PER_BAR};
use crate::target::{ParameterId, ParameterKey, ParameterRegistry, TargetParameter, ValueRange};
use crate::timemap::{Sample, TangentMap, Tick, TimeMap};
use crate::waveform::{modulate, BuiltinWaveforms, SegmentPosition, WaveParams, WaveformTable};
use log::{debug, warn};
use std::fmt;
use std::sync::Arc;

/// Callback invoked once per logical mutation
pub type ChangeListener = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ObjectRef {
    pub(crate) key: ParameterKey,
    pub(crate) id: ParameterId,
}

/// Result of [`AutomationPattern::clean_objects`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanOutcome {
    /// Every referenced parameter is alive
    Intact,
    /// This many dead references moved to the pending queue
    Dropped(usize),
    /// The pattern shadowed a single parameter that is gone; the owner should
    /// discard the pattern
    Orphaned,
}

/// A sparse automation curve for a single parameter
#[derive(Clone)]
pub struct AutomationPattern {
    name: String,
    pub(crate) position: Tick,
    pub(crate) length: Tick,
    muted: bool,
    auto_repeat: bool,
    unit_length: Option<Tick>,

    pub(crate) time_map: TimeMap,
    pub(crate) tangents: TangentMap,
    progression: Progression,
    tension: f32,
    wave: WaveParams,
    waveforms: Arc<dyn WaveformTable>,
    pub(crate) quantization: Quantization,
    range: ValueRange,

    objects: Vec<ObjectRef>,
    pending: Vec<ParameterId>,
    shadow: bool,

    pub(crate) drag: Option<DragSnapshot>,

    listener: Option<ChangeListener>,
    dirty: bool,
}

impl Default for AutomationPattern {
    fn default() -> Self {
        Self::new()
    }
}

impl AutomationPattern {
    /// Create an empty pattern with a discrete progression and a 0..1 range
    pub fn new() -> Self {
        Self {
            name: String::new(),
            position: 0,
            length: TICKS_PER_BAR,
            muted: false,
            auto_repeat: false,
            unit_length: None,
            time_map: TimeMap::new(),
            tangents: TangentMap::new(),
            progression: Progression::default(),
            tension: DEFAULT_TENSION,
            wave: WaveParams::default(),
            waveforms: Arc::new(BuiltinWaveforms::default()),
            quantization: Quantization::default(),
            range: ValueRange::default(),
            objects: Vec::new(),
            pending: Vec::new(),
            shadow: false,
            drag: None,
            listener: None,
            dirty: false,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the progression; an invalid cubic-Hermite tension is ignored
    pub fn with_progression(mut self, progression: Progression) -> Self {
        self.set_progression(progression);
        self
    }

    pub fn with_tension(mut self, tension: f32) -> Self {
        self.set_tension(tension);
        self
    }

    pub fn with_wave(mut self, wave: WaveParams) -> Self {
        self.wave = wave;
        self
    }

    pub fn with_waveforms(mut self, table: Arc<dyn WaveformTable>) -> Self {
        self.waveforms = table;
        self
    }

    pub fn with_quantization(mut self, quantization: Quantization) -> Self {
        self.quantization = quantization;
        self
    }

    pub fn with_range(mut self, min: f32, max: f32) -> Self {
        self.range = ValueRange::new(min, max);
        self
    }

    pub fn with_length(mut self, length: Tick) -> Self {
        self.length = length.max(0);
        self
    }

    /// Add a sample at an exact tick (no quantization)
    pub fn with_point(mut self, tick: Tick, value: f32) -> Self {
        self.put_value_with(tick, value, PutOptions::exact());
        self
    }

    // ==================== Change Notification ====================

    pub fn set_change_listener(&mut self, listener: ChangeListener) {
        self.listener = Some(listener);
    }

    pub fn clear_change_listener(&mut self) {
        self.listener = None;
    }

    /// Return and reset the dirty flag
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn changed(&mut self) {
        self.dirty = true;
        if let Some(listener) = &self.listener {
            listener();
        }
    }

    // ==================== Metadata ====================

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.changed();
    }

    pub fn position(&self) -> Tick {
        self.position
    }

    pub fn set_position(&mut self, position: Tick) {
        self.position = position.max(0);
        self.changed();
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        self.changed();
    }

    // ==================== Configuration ====================

    pub fn progression(&self) -> Progression {
        self.progression
    }

    /// Change the interpolation discipline. Returns false, leaving the pattern
    /// untouched, for a cubic-Hermite tension outside [-10, 10].
    pub fn set_progression(&mut self, progression: Progression) -> bool {
        if !progression.is_valid() {
            debug!("ignoring progression {progression:?}: tension out of range");
            return false;
        }
        if let Some(tension) = progression.tension() {
            self.tension = tension;
        }
        self.progression = progression;
        self.rebuild_tangents();
        self.changed();
        true
    }

    /// Select a progression by its persisted ordinal, reusing the current tension
    pub fn set_progression_ordinal(&mut self, ordinal: u8) -> bool {
        match Progression::from_ordinal(ordinal, self.tension) {
            Some(p) => self.set_progression(p),
            None => {
                debug!("ignoring unknown progression ordinal {ordinal}");
                false
            }
        }
    }

    pub fn tension(&self) -> f32 {
        self.tension
    }

    /// Set the cubic-Hermite tension; remembered for later even when another
    /// progression is active
    pub fn set_tension(&mut self, tension: f32) -> bool {
        if !TENSION_RANGE.contains(&tension) {
            debug!("ignoring tension {tension}");
            return false;
        }
        self.tension = tension;
        if self.progression.is_cubic_hermite() {
            self.progression = Progression::CubicHermite { tension };
        }
        self.changed();
        true
    }

    pub fn wave(&self) -> &WaveParams {
        &self.wave
    }

    pub fn set_wave_bank(&mut self, bank: i32) -> bool {
        self.update_wave(|w| w.set_bank(bank))
    }

    pub fn set_wave_index(&mut self, index: i32) -> bool {
        self.update_wave(|w| w.set_index(index))
    }

    pub fn set_wave_ratio(&mut self, ratio: f32) -> bool {
        self.update_wave(|w| w.set_ratio(ratio))
    }

    pub fn set_wave_skew(&mut self, skew: f32) -> bool {
        self.update_wave(|w| w.set_skew(skew))
    }

    pub fn set_wave_amplitude(&mut self, amplitude: f32) -> bool {
        self.update_wave(|w| w.set_amplitude(amplitude))
    }

    pub fn set_wave_repeat(&mut self, repeat: f32) -> bool {
        self.update_wave(|w| w.set_repeat(repeat))
    }

    fn update_wave<F>(&mut self, set: F) -> bool
    where
        F: FnOnce(&mut WaveParams) -> bool,
    {
        if set(&mut self.wave) {
            self.changed();
            true
        } else {
            debug!("ignoring out-of-range wave parameter");
            false
        }
    }

    pub fn quantization(&self) -> Quantization {
        self.quantization
    }

    pub fn set_quantization(&mut self, quantization: Quantization) {
        self.quantization = quantization;
    }

    /// Range every evaluated value is clamped to
    pub fn range(&self) -> ValueRange {
        self.range
    }

    pub fn set_range(&mut self, range: ValueRange) {
        self.range = range;
        self.changed();
    }

    /// Snap a raw pointer value to the value grid of this pattern
    #[must_use]
    pub fn press_value(&self, raw: f32) -> f32 {
        self.quantization.press_value(raw, &self.range)
    }

    // ==================== Lengths ====================

    /// Last key rounded up to a whole bar; 0 when empty
    #[must_use]
    pub fn time_map_length(&self) -> Tick {
        match self.time_map.last() {
            Some(last) if last.tick > 0 => {
                let bar = i64::from(TICKS_PER_BAR);
                let rounded = (i64::from(last.tick) + bar - 1) / bar * bar;
                Tick::try_from(rounded).unwrap_or(Tick::MAX)
            }
            _ => 0,
        }
    }

    /// Positioned length of the pattern
    pub fn length(&self) -> Tick {
        self.length
    }

    pub fn set_length(&mut self, length: Tick) {
        self.length = length.max(0);
        self.changed();
    }

    /// Recompute the length from the time map, never shorter than one bar
    pub fn update_length(&mut self) {
        self.length = self.time_map_length().max(TICKS_PER_BAR);
        self.changed();
    }

    /// Span over which an auto-repeating pattern loops
    #[must_use]
    pub fn unit_length(&self) -> Tick {
        self.unit_length.unwrap_or_else(|| self.time_map_length())
    }

    /// Override the loop span; `None` falls back to the time map length
    pub fn set_unit_length(&mut self, unit_length: Option<Tick>) {
        self.unit_length = unit_length.filter(|l| *l > 0);
        self.changed();
    }

    pub fn auto_repeat(&self) -> bool {
        self.auto_repeat
    }

    pub fn set_auto_repeat(&mut self, on: bool) {
        self.auto_repeat = on;
        self.changed();
    }

    // ==================== Time Map Access ====================

    pub fn time_map(&self) -> &TimeMap {
        &self.time_map
    }

    pub fn tangents(&self) -> &TangentMap {
        &self.tangents
    }

    pub fn samples(&self) -> impl Iterator<Item = Sample> + '_ {
        self.time_map.iter()
    }

    /// True iff the pattern holds at least one sample
    #[must_use]
    pub fn has_automation(&self) -> bool {
        !self.time_map.is_empty()
    }

    /// Remove every sample
    pub fn clear(&mut self) {
        self.time_map.clear();
        self.tangents.clear();
        self.changed();
    }

    // ==================== Editing ====================

    /// Insert a sample, snapping the tick to the grid. Returns the committed tick.
    pub fn put_value(&mut self, tick: Tick, value: f32) -> Tick {
        self.put_value_with(tick, value, PutOptions::default())
    }

    /// Insert a sample with explicit quantization options. Returns the
    /// committed tick.
    pub fn put_value_with(&mut self, tick: Tick, value: f32, options: PutOptions) -> Tick {
        let committed = self.insert_sample(tick, value, options);
        self.changed();
        committed
    }

    /// Insert a sample at exactly `tick` with the value as given
    pub fn put_exact(&mut self, tick: Tick, value: f32) -> Tick {
        self.put_value_with(tick, value, PutOptions::exact())
    }

    /// Delete the sample at exactly `tick`; no-op when absent
    pub fn remove_value(&mut self, tick: Tick) {
        if self.time_map.remove(tick).is_some() {
            self.tangents.remove(tick);
            self.regenerate_around(tick);
            self.changed();
        }
    }

    /// Insert without notifying; shared by the public editors, drags and
    /// transforms
    pub(crate) fn insert_sample(&mut self, tick: Tick, value: f32, options: PutOptions) -> Tick {
        let q = self.quantization;
        let tick = if options.quantize_position {
            q.quantize_tick(tick)
        } else {
            tick
        }
        .max(0);
        let value = if options.quantize_value {
            q.quantize_value(value, &self.range)
        } else {
            value
        };

        if options.quantize_position && !options.ignore_surrounding {
            let step = q.tick_step.max(1);
            for removed in self.time_map.remove_between(tick - step, tick.saturating_add(step)) {
                self.tangents.remove(removed);
            }
        }

        self.time_map.insert(tick, value);
        self.regenerate_around(tick);
        tick
    }

    /// Refresh the tangents of the key before `tick`, at it and after it
    pub(crate) fn regenerate_around(&mut self, tick: Tick) {
        let start = self.time_map.lower_bound(tick).saturating_sub(1);
        let hermite = self.progression.is_cubic_hermite();
        self.tangents.generate(&self.time_map, start, 3, hermite);
    }

    /// Rebuild every tangent from scratch
    pub fn rebuild_tangents(&mut self) {
        let hermite = self.progression.is_cubic_hermite();
        self.tangents.rebuild(&self.time_map, hermite);
    }

    // ==================== Evaluation ====================

    /// Value at `tick`, clamped to the target range. An empty pattern yields 0.
    #[inline]
    #[must_use]
    pub fn value_at(&self, tick: Tick) -> f32 {
        self.value_at_with(tick, EvalMode::Normal)
    }

    /// Value at `tick` under the given evaluation mode
    #[inline]
    #[must_use]
    pub fn value_at_with(&self, tick: Tick, mode: EvalMode) -> f32 {
        if self.time_map.is_empty() {
            return 0.0;
        }
        let tick = self.wrap_tick(tick);
        self.range.clamp(self.evaluate(tick, mode))
    }

    /// Value at `tick` mapped through the parameter's own scaling
    #[must_use]
    pub fn scaled_value_at(&self, tick: Tick, param: &dyn TargetParameter) -> f32 {
        param.scaled_value(self.value_at(tick))
    }

    /// Values for every tick strictly after `tick` up to and including the
    /// next key. `None` when no key follows `tick`.
    #[must_use]
    pub fn values_after(&self, tick: Tick) -> Option<Vec<f32>> {
        let start = tick.checked_add(1)?;
        let next = self.time_map.sample(self.time_map.lower_bound(start))?;
        let values = (start..=next.tick)
            .map(|t| self.range.clamp(self.evaluate(t, EvalMode::Normal)))
            .collect();
        Some(values)
    }

    #[inline]
    fn wrap_tick(&self, tick: Tick) -> Tick {
        if !self.auto_repeat || tick < 0 {
            return tick;
        }
        match self.unit_length() {
            unit if unit > 0 => tick % unit,
            _ => tick,
        }
    }

    /// Curve value without range clamping
    fn evaluate(&self, tick: Tick, mode: EvalMode) -> f32 {
        let Some(idx) = self.time_map.floor_index(tick) else {
            return 0.0;
        };
        let Some(k0) = self.time_map.sample(idx) else {
            return 0.0;
        };
        let offset = tick - k0.tick;
        let next = self.time_map.sample(idx + 1);
        if next.is_none() && offset > 0 {
            return k0.value;
        }

        let progression = self.progression.effective(mode);
        let base = progression.evaluate(&self.time_map, &self.tangents, idx, offset);
        if mode.is_degraded() {
            return base;
        }

        match self.waveforms.lookup(self.wave.bank(), self.wave.index()) {
            Some(wave) if !wave.is_zero() => {
                let at = SegmentPosition {
                    offset,
                    length: next.map(|k1| k1.tick - k0.tick),
                    rise: next.map_or(0.0, |k1| k1.value - k0.value),
                };
                modulate(base, wave, &self.wave, at, &self.range)
            }
            _ => base,
        }
    }

    /// Base curve value without waveform, clamping or wrapping
    pub(crate) fn base_value_at(&self, tick: Tick) -> f32 {
        let Some(idx) = self.time_map.floor_index(tick) else {
            return 0.0;
        };
        let offset = self.time_map.sample(idx).map_or(0, |k0| tick - k0.tick);
        self.progression
            .evaluate(&self.time_map, &self.tangents, idx, offset)
    }

    // ==================== Target Parameters ====================

    /// Keys of the parameters this pattern automates
    pub fn objects(&self) -> impl Iterator<Item = ParameterKey> + '_ {
        self.objects.iter().map(|o| o.key)
    }

    /// Ids waiting to be re-resolved against a registry
    pub fn pending_ids(&self) -> &[ParameterId] {
        &self.pending
    }

    pub(crate) fn object_ids(&self) -> impl Iterator<Item = ParameterId> + '_ {
        self.objects.iter().map(|o| o.id)
    }

    pub(crate) fn queue_pending(&mut self, id: ParameterId) {
        if !self.pending.contains(&id) && !self.objects.iter().any(|o| o.id == id) {
            self.pending.push(id);
        }
    }

    /// Mark the pattern as the dedicated automation of a single parameter
    pub fn set_shadow(&mut self, shadow: bool) {
        self.shadow = shadow;
    }

    pub fn is_shadow(&self) -> bool {
        self.shadow
    }

    /// Start automating a parameter. The first parameter added to an empty
    /// pattern seeds tick 0 with its current value and supplies the range.
    pub fn add_object(&mut self, registry: &ParameterRegistry, key: ParameterKey) -> bool {
        if self.objects.iter().any(|o| o.key == key) {
            return false;
        }
        let (Some(param), Some(id)) = (registry.get(key), registry.id_of(key)) else {
            return false;
        };

        if self.objects.is_empty() {
            self.range = param.range();
            if self.time_map.is_empty() {
                let seed = param.inverse_scaled_value(param.raw_value());
                self.insert_sample(0, seed, PutOptions::exact());
            }
        }
        self.pending.retain(|p| *p != id);
        self.objects.push(ObjectRef { key, id });
        self.changed();
        true
    }

    /// Move references to destroyed parameters into the pending queue
    pub fn clean_objects(&mut self, registry: &ParameterRegistry) -> CleanOutcome {
        let before = self.objects.len();
        let mut dead = Vec::new();
        self.objects.retain(|o| {
            let alive = registry.contains(o.key);
            if !alive {
                dead.push(o.id);
            }
            alive
        });

        if dead.is_empty() {
            return CleanOutcome::Intact;
        }
        debug!("pattern {:?}: {} of {before} objects gone", self.name, dead.len());
        for id in dead.iter().copied() {
            self.queue_pending(id);
        }
        self.changed();

        if self.shadow && self.objects.is_empty() {
            CleanOutcome::Orphaned
        } else {
            CleanOutcome::Dropped(dead.len())
        }
    }

    /// Reconnect pending ids that are live in `registry`; returns how many were
    /// restored
    pub fn resolve_pending(&mut self, registry: &ParameterRegistry) -> usize {
        if self.pending.is_empty() {
            return 0;
        }
        let pending = std::mem::take(&mut self.pending);
        let mut resolved = 0;
        for id in pending {
            match registry.key_of(id) {
                Some(key) if !self.objects.iter().any(|o| o.key == key) => {
                    if self.objects.is_empty() {
                        if let Some(param) = registry.get(key) {
                            self.range = param.range();
                        }
                    }
                    self.objects.push(ObjectRef { key, id });
                    resolved += 1;
                }
                Some(_) => {}
                None => self.pending.push(id),
            }
        }

        if !self.pending.is_empty() {
            warn!(
                "pattern {:?}: {} object id(s) still unresolved",
                self.name,
                self.pending.len()
            );
        }
        if resolved > 0 {
            debug!("pattern {:?}: resolved {resolved} object(s)", self.name);
            self.changed();
        }
        resolved
    }
}

impl fmt::Debug for AutomationPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutomationPattern")
            .field("name", &self.name)
            .field("position", &self.position)
            .field("length", &self.length)
            .field("progression", &self.progression)
            .field("wave", &self.wave)
            .field("range", &self.range)
            .field("samples", &self.time_map.len())
            .field("objects", &self.objects.len())
            .field("dragging", &self.drag.is_some())
            .finish()
    }
}
