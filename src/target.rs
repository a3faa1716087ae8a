//! Target parameters and the registry that owns them
//!
//! A pattern never owns the parameters it automates. It holds
//! [`ParameterKey`] handles into a [`ParameterRegistry`]; once a parameter is
//! removed from the registry its handle simply stops resolving.

use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use std::collections::HashMap;
use std::fmt;

slotmap::new_key_type! {
    /// Weak handle to a parameter stored in a [`ParameterRegistry`]
    pub struct ParameterKey;
}

/// Stable identifier of a parameter, used across save/load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterId(pub u32);

impl fmt::Display for ParameterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Numeric range of an automated parameter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f32,
    pub max: f32,
    /// Smallest meaningful increment, 0 for continuous parameters
    #[serde(default)]
    pub step: f32,
}

impl ValueRange {
    /// Create a range; reversed bounds are swapped and a NaN bound collapses
    /// onto the other one
    pub fn new(min: f32, max: f32) -> Self {
        Self {
            min: min.min(max),
            max: max.max(min),
            step: 0.0,
        }
    }

    pub fn with_step(mut self, step: f32) -> Self {
        self.step = step.max(0.0);
        self
    }

    #[inline]
    #[must_use]
    pub fn span(&self) -> f32 {
        self.max - self.min
    }

    /// Clamp `value` into the range. Never panics: reversed bounds are
    /// ordered first, a NaN bound is ignored and a NaN value maps to the
    /// lower bound.
    #[inline]
    #[must_use]
    pub fn clamp(&self, value: f32) -> f32 {
        let lo = self.min.min(self.max);
        let hi = self.max.max(self.min);
        value.max(lo).min(hi)
    }

    #[must_use]
    pub fn contains(&self, value: f32) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

impl Default for ValueRange {
    fn default() -> Self {
        Self::new(0.0, 1.0)
    }
}

/// The contract a pattern consumes from the parameter it automates
pub trait TargetParameter: fmt::Debug + Send + Sync {
    fn min_value(&self) -> f32;
    fn max_value(&self) -> f32;
    fn step(&self) -> f32;
    /// Current value of the parameter, in its own units
    fn raw_value(&self) -> f32;

    /// Map an automation value into the parameter's (possibly non-linear) scale
    fn scaled_value(&self, value: f32) -> f32 {
        value
    }

    /// Inverse of [`TargetParameter::scaled_value`]
    fn inverse_scaled_value(&self, value: f32) -> f32 {
        value
    }

    fn range(&self) -> ValueRange {
        ValueRange::new(self.min_value(), self.max_value()).with_step(self.step())
    }
}

/// How a [`FloatParameter`] maps automation values to its own scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Scaling {
    #[default]
    Linear,
    Logarithmic,
}

/// Plain float parameter, e.g. a knob or fader model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloatParameter {
    pub name: String,
    pub value: f32,
    pub range: ValueRange,
    pub scaling: Scaling,
}

impl FloatParameter {
    pub fn new(name: impl Into<String>, value: f32, min: f32, max: f32) -> Self {
        let range = ValueRange::new(min, max);
        Self {
            name: name.into(),
            value: range.clamp(value),
            range,
            scaling: Scaling::Linear,
        }
    }

    pub fn with_step(mut self, step: f32) -> Self {
        self.range = self.range.with_step(step);
        self
    }

    pub fn with_scaling(mut self, scaling: Scaling) -> Self {
        self.scaling = scaling;
        self
    }

    pub fn set_value(&mut self, value: f32) {
        self.value = self.range.clamp(value);
    }

    fn normalized(&self, value: f32) -> f32 {
        let span = self.range.span();
        if span > 0.0 {
            ((value - self.range.min) / span).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

impl TargetParameter for FloatParameter {
    fn min_value(&self) -> f32 {
        self.range.min
    }

    fn max_value(&self) -> f32 {
        self.range.max
    }

    fn step(&self) -> f32 {
        self.range.step
    }

    fn raw_value(&self) -> f32 {
        self.value
    }

    fn scaled_value(&self, value: f32) -> f32 {
        match self.scaling {
            Scaling::Linear => value,
            Scaling::Logarithmic => {
                let n = self.normalized(value);
                let ValueRange { min, max, .. } = self.range;
                if min > 0.0 {
                    min * (max / min).powf(n)
                } else {
                    min + self.range.span() * n * n * n
                }
            }
        }
    }

    fn inverse_scaled_value(&self, value: f32) -> f32 {
        match self.scaling {
            Scaling::Linear => value,
            Scaling::Logarithmic => {
                let ValueRange { min, max, .. } = self.range;
                let span = self.range.span();
                let value = self.range.clamp(value);
                let n = if min > 0.0 {
                    (value / min).ln() / (max / min).ln()
                } else if span > 0.0 {
                    ((value - min) / span).cbrt()
                } else {
                    0.0
                };
                min + span * n
            }
        }
    }
}

struct Entry {
    id: ParameterId,
    param: Box<dyn TargetParameter>,
}

/// Arena of live target parameters
///
/// Keys are generational, so a handle to a removed parameter never aliases a
/// parameter inserted later in the same slot.
#[derive(Default)]
pub struct ParameterRegistry {
    params: SlotMap<ParameterKey, Entry>,
    ids: HashMap<ParameterId, ParameterKey>,
}

impl ParameterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a parameter under a stable id. A parameter already registered
    /// under the same id is dropped.
    pub fn insert<P>(&mut self, id: ParameterId, param: P) -> ParameterKey
    where
        P: TargetParameter + 'static,
    {
        if let Some(old) = self.ids.remove(&id) {
            self.params.remove(old);
        }
        let key = self.params.insert(Entry {
            id,
            param: Box::new(param),
        });
        self.ids.insert(id, key);
        key
    }

    /// Destroy a parameter; outstanding handles stop resolving
    pub fn remove(&mut self, key: ParameterKey) -> Option<Box<dyn TargetParameter>> {
        let entry = self.params.remove(key)?;
        self.ids.remove(&entry.id);
        Some(entry.param)
    }

    #[must_use]
    pub fn get(&self, key: ParameterKey) -> Option<&dyn TargetParameter> {
        self.params.get(key).map(|e| e.param.as_ref())
    }

    #[must_use]
    pub fn contains(&self, key: ParameterKey) -> bool {
        self.params.contains_key(key)
    }

    #[must_use]
    pub fn id_of(&self, key: ParameterKey) -> Option<ParameterId> {
        self.params.get(key).map(|e| e.id)
    }

    #[must_use]
    pub fn key_of(&self, id: ParameterId) -> Option<ParameterKey> {
        self.ids.get(&id).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

impl fmt::Debug for ParameterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterRegistry")
            .field("len", &self.params.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_swaps_reversed_bounds() {
        let r = ValueRange::new(1.0, -1.0);
        assert_eq!(r.min, -1.0);
        assert_eq!(r.max, 1.0);
        assert_eq!(r.span(), 2.0);
    }

    #[test]
    fn test_clamp_tolerates_bad_bounds() {
        let nan = ValueRange::new(f32::NAN, 1.0);
        assert_eq!(nan.clamp(0.5), 1.0);
        assert!(!nan.min.is_nan());

        // fields are public and serde skips `new`
        let reversed = ValueRange { min: 1.0, max: 0.0, step: 0.0 };
        assert_eq!(reversed.clamp(2.0), 1.0);
        assert_eq!(reversed.clamp(-2.0), 0.0);
        assert_eq!(reversed.clamp(0.25), 0.25);

        let loaded: ValueRange = serde_json::from_str(r#"{ "min": 5.0, "max": -5.0 }"#).unwrap();
        assert_eq!(loaded.clamp(9.0), 5.0);

        assert_eq!(ValueRange::default().clamp(f32::NAN), 0.0);
    }

    #[test]
    fn test_registry_handles_go_stale() {
        let mut reg = ParameterRegistry::new();
        let key = reg.insert(ParameterId(1), FloatParameter::new("volume", 0.5, 0.0, 1.0));
        assert!(reg.contains(key));
        assert_eq!(reg.id_of(key), Some(ParameterId(1)));

        reg.remove(key);
        assert!(!reg.contains(key));
        assert!(reg.get(key).is_none());
        assert_eq!(reg.key_of(ParameterId(1)), None);

        // A new parameter in the reused slot gets a different key
        let other = reg.insert(ParameterId(2), FloatParameter::new("pan", 0.0, -1.0, 1.0));
        assert_ne!(key, other);
        assert!(!reg.contains(key));
    }

    #[test]
    fn test_registry_reinsert_same_id_replaces() {
        let mut reg = ParameterRegistry::new();
        let first = reg.insert(ParameterId(3), FloatParameter::new("a", 0.0, 0.0, 1.0));
        let second = reg.insert(ParameterId(3), FloatParameter::new("b", 0.0, 0.0, 2.0));
        assert!(!reg.contains(first));
        assert_eq!(reg.key_of(ParameterId(3)), Some(second));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_log_scaling_round_trip() {
        let p = FloatParameter::new("cutoff", 1000.0, 20.0, 20000.0).with_scaling(Scaling::Logarithmic);
        let automation = p.inverse_scaled_value(1000.0);
        let back = p.scaled_value(automation);
        assert!((back - 1000.0).abs() < 0.5);
    }

    #[test]
    fn test_linear_scaling_is_identity() {
        let p = FloatParameter::new("gain", 0.3, 0.0, 1.0);
        assert_eq!(p.scaled_value(0.42), 0.42);
        assert_eq!(p.inverse_scaled_value(0.42), 0.42);
    }
}
