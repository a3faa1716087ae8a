//! Persisted attribute surface of a pattern
//!
//! A [`PatternRecord`] is a flat set of scalar attributes plus an ordered list
//! of child records, one per sample and one per automated parameter. It is
//! format-agnostic through serde; JSON helpers are provided.

use crate::error::{PatternError, Result};
use crate::pattern::AutomationPattern;
use crate::progression::DEFAULT_TENSION;
use crate::quantize::PutOptions;
use crate::target::ParameterId;
use crate::timemap::Tick;
use crate::waveform::WaveParams;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternRecord {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub pos: Tick,
    /// Absent lengths are recomputed from the samples on load
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub len: Option<Tick>,
    #[serde(default)]
    pub mute: bool,
    #[serde(default)]
    pub auto_repeat: bool,
    #[serde(default)]
    pub prog: u8,
    #[serde(default = "default_tension")]
    pub tension: f32,
    #[serde(default)]
    pub wave_bank: i32,
    #[serde(default)]
    pub wave_index: i32,
    #[serde(default)]
    pub wave_ratio: f32,
    #[serde(default = "default_one")]
    pub wave_skew: f32,
    #[serde(default = "default_one")]
    pub wave_amplitude: f32,
    #[serde(default)]
    pub wave_repeat: f32,
    #[serde(default)]
    pub children: Vec<ChildRecord>,
}

fn default_tension() -> f32 {
    DEFAULT_TENSION
}

fn default_one() -> f32 {
    1.0
}

/// One child element, tagged by kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tag", rename_all = "lowercase")]
pub enum ChildRecord {
    Time {
        #[serde(default)]
        pos: Tick,
        #[serde(default)]
        value: f32,
    },
    Object {
        id: ParameterId,
    },
    /// Anything this version does not understand
    #[serde(other)]
    Unknown,
}

impl PatternRecord {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl AutomationPattern {
    /// Capture the persisted attributes. Unresolved object ids are kept.
    #[must_use]
    pub fn to_record(&self) -> PatternRecord {
        let wave = self.wave();
        let mut children: Vec<ChildRecord> = self
            .samples()
            .map(|s| ChildRecord::Time {
                pos: s.tick,
                value: s.value,
            })
            .collect();
        children.extend(
            self.object_ids()
                .chain(self.pending_ids().iter().copied())
                .map(|id| ChildRecord::Object { id }),
        );

        PatternRecord {
            name: self.name().to_string(),
            pos: self.position(),
            len: Some(self.length()),
            mute: self.is_muted(),
            auto_repeat: self.auto_repeat(),
            prog: self.progression().ordinal(),
            tension: self.tension(),
            wave_bank: wave.bank(),
            wave_index: wave.index(),
            wave_ratio: wave.ratio(),
            wave_skew: wave.skew(),
            wave_amplitude: wave.amplitude(),
            wave_repeat: wave.repeat(),
            children,
        }
    }

    /// Build a pattern from persisted attributes.
    ///
    /// Out-of-range scalars fall back to their defaults, unknown children are
    /// skipped. Object ids are queued for [`AutomationPattern::resolve_pending`].
    /// Fails only for samples at negative ticks.
    pub fn from_record(record: &PatternRecord) -> Result<Self> {
        let mut pattern = AutomationPattern::new().with_name(record.name.clone());
        pattern.position = record.pos.max(0);
        pattern.set_muted(record.mute);
        pattern.set_auto_repeat(record.auto_repeat);

        if !pattern.set_tension(record.tension) {
            warn!("tension {} out of range, using default", record.tension);
        }
        if !pattern.set_progression_ordinal(record.prog) {
            warn!("unknown progression {}, using discrete", record.prog);
        }

        let mut wave = WaveParams::default();
        let accepted = [
            wave.set_bank(record.wave_bank),
            wave.set_index(record.wave_index),
            wave.set_ratio(record.wave_ratio),
            wave.set_skew(record.wave_skew),
            wave.set_amplitude(record.wave_amplitude),
            wave.set_repeat(record.wave_repeat),
        ];
        if accepted.contains(&false) {
            warn!("pattern {:?}: wave parameter out of range, using default", record.name);
        }
        pattern = pattern.with_wave(wave);

        for child in &record.children {
            match child {
                ChildRecord::Time { pos, .. } if *pos < 0 => {
                    return Err(PatternError::InvalidRecord(format!(
                        "sample at negative tick {pos}"
                    )));
                }
                ChildRecord::Time { pos, value } => {
                    pattern.insert_sample(*pos, *value, PutOptions::exact());
                }
                ChildRecord::Object { id } => pattern.queue_pending(*id),
                ChildRecord::Unknown => warn!("skipping unrecognized child record"),
            }
        }
        pattern.rebuild_tangents();

        match record.len {
            Some(len) => pattern.length = len.max(0),
            None => pattern.update_length(),
        }
        debug!(
            "loaded pattern {:?}: {} samples, {} pending objects",
            record.name,
            pattern.time_map().len(),
            pattern.pending_ids().len()
        );
        pattern.take_dirty();
        Ok(pattern)
    }

    pub fn to_json(&self) -> Result<String> {
        self.to_record().to_json()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_record(&PatternRecord::from_json(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progression::Progression;
    use crate::target::{FloatParameter, ParameterRegistry};

    #[test]
    fn test_record_round_trip() {
        let mut p = AutomationPattern::new()
            .with_name("filter sweep")
            .with_progression(Progression::CubicHermite { tension: 0.7 })
            .with_length(384);
        p.put_exact(0, 0.1);
        p.put_exact(96, 0.9);
        p.set_wave_index(2);
        p.set_wave_repeat(3.0);
        p.set_auto_repeat(true);

        let json = p.to_json().unwrap();
        let loaded = AutomationPattern::from_json(&json).unwrap();

        assert_eq!(loaded.name(), "filter sweep");
        assert_eq!(loaded.progression(), Progression::CubicHermite { tension: 0.7 });
        assert_eq!(loaded.length(), 384);
        assert!(loaded.auto_repeat());
        assert_eq!(loaded.wave(), p.wave());
        assert_eq!(loaded.time_map(), p.time_map());
        assert_eq!(loaded.tangents(), p.tangents());
    }

    #[test]
    fn test_missing_attributes_use_defaults() {
        let json = r#"{ "children": [ { "tag": "time", "pos": 200, "value": 0.5 } ] }"#;
        let p = AutomationPattern::from_json(json).unwrap();
        assert_eq!(p.progression(), Progression::Discrete);
        assert_eq!(p.tension(), DEFAULT_TENSION);
        assert_eq!(p.wave(), &WaveParams::default());
        // no len: recomputed from the samples
        assert_eq!(p.length(), 384);
    }

    #[test]
    fn test_unknown_children_are_skipped() {
        let json = r#"{
            "prog": 1,
            "children": [
                { "tag": "time", "pos": 0, "value": 0.0 },
                { "tag": "marker", "label": "drop" },
                { "tag": "time", "pos": 10, "value": 1.0 }
            ]
        }"#;
        let p = AutomationPattern::from_json(json).unwrap();
        assert_eq!(p.time_map().len(), 2);
        assert!((p.value_at(5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_out_of_range_scalars_fall_back() {
        let json = r#"{ "prog": 7, "tension": 50.0, "wave_ratio": 3.0, "wave_bank": 2 }"#;
        let p = AutomationPattern::from_json(json).unwrap();
        assert_eq!(p.progression(), Progression::Discrete);
        assert_eq!(p.tension(), DEFAULT_TENSION);
        assert_eq!(p.wave().ratio(), 0.0);
        assert_eq!(p.wave().bank(), 2);
    }

    #[test]
    fn test_negative_tick_is_rejected() {
        let json = r#"{ "children": [ { "tag": "time", "pos": -4, "value": 0.0 } ] }"#;
        assert!(matches!(
            AutomationPattern::from_json(json),
            Err(PatternError::InvalidRecord(_))
        ));
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(matches!(
            AutomationPattern::from_json("{ not json"),
            Err(PatternError::Json(_))
        ));
    }

    #[test]
    fn test_objects_resolve_after_load() {
        let json = r#"{ "children": [ { "tag": "object", "id": 42 } ] }"#;
        let mut p = AutomationPattern::from_json(json).unwrap();
        assert_eq!(p.pending_ids(), &[ParameterId(42)]);

        // the parameter is created later in the load
        let mut reg = ParameterRegistry::new();
        assert_eq!(p.resolve_pending(&reg), 0);
        reg.insert(ParameterId(42), FloatParameter::new("volume", 0.5, 0.0, 2.0));
        assert_eq!(p.resolve_pending(&reg), 1);
        assert_eq!(p.range().max, 2.0);

        let record = p.to_record();
        assert!(record.children.contains(&ChildRecord::Object { id: ParameterId(42) }));
    }
}
