//! # automation-pattern
//!
//! Automation curve engine for sequencer parameters.
//!
//! This crate provides:
//! - **Time maps** - Sparse, strictly ordered tick → value samples
//! - **Progressions** - Discrete, linear, cubic-Hermite with tension, and 4-point parabolic
//! - **Waveform overlay** - Periodic modulation with ratio/skew/amplitude/repeat
//! - **Live editing** - Quantized inserts and drag previews that roll back cleanly
//! - **Transforms** - Flip, shift, scale and split whole curves
//! - **Serialization support** - Save/load patterns with serde
//!
//! ## Quick Start
//!
//! ```rust
//! use automation_pattern::prelude::*;
//!
//! let mut pattern = AutomationPattern::new().with_progression(Progression::Linear);
//! pattern.put_value(0, 0.0);
//! pattern.put_value(192, 1.0);
//!
//! assert_eq!(pattern.value_at(0), 0.0);
//! assert!((pattern.value_at(96) - 0.5).abs() < 1e-6);
//! assert_eq!(pattern.value_at(300), 1.0); // held after the last key
//! assert_eq!(pattern.value_at(-5), 0.0); // zero before the first key
//! ```
//!
//! ## Progressions
//!
//! - **Discrete** - Hold each value until the next key
//! - **Linear** - Straight line between keys
//! - **`CubicHermite`** - Smooth spline through centered-difference tangents
//! - **Parabolic** - 4-point Lagrange fit through the surrounding keys
//!
//! Under [`EvalMode::Degraded`] the two smooth progressions fall back to
//! linear and the waveform overlay is skipped.
//!
//! ## Example: Drag Preview
//!
//! ```rust
//! use automation_pattern::prelude::*;
//!
//! let mut pattern = AutomationPattern::new()
//!     .with_progression(Progression::Linear)
//!     .with_point(0, 0.0)
//!     .with_point(96, 1.0);
//!
//! let mut drag = pattern.begin_drag(96, PutOptions::default());
//! drag.move_to(120, 0.5);
//! drag.move_to(144, 0.75);
//! drag.rollback();
//!
//! let ticks: Vec<Tick> = pattern.time_map().ticks().collect();
//! assert_eq!(ticks, vec![0, 96]);
//! ```

pub mod drag;
pub mod error;
pub mod pattern;
pub mod persist;
pub mod progression;
pub mod quantize;
pub mod shared;
pub mod target;
pub mod timemap;
pub mod transform;
pub mod waveform;

pub use drag::DragSession;
pub use error::{PatternError, Result};
pub use pattern::{AutomationPattern, ChangeListener, CleanOutcome};
pub use persist::{ChildRecord, PatternRecord};
pub use progression::{EvalMode, Progression};
pub use quantize::{PutOptions, Quantization, TICKS_PER_BAR};
pub use shared::SharedPattern;
pub use target::{
    FloatParameter, ParameterId, ParameterKey, ParameterRegistry, Scaling, TargetParameter,
    ValueRange,
};
pub use timemap::{Sample, TangentMap, Tick, TimeMap};
pub use waveform::{BuiltinWaveforms, WaveParams, WaveTable, Waveform, WaveformTable};

/// Prelude for common imports
pub mod prelude {
    pub use crate::drag::DragSession;
    pub use crate::pattern::{AutomationPattern, CleanOutcome};
    pub use crate::progression::{EvalMode, Progression};
    pub use crate::quantize::{PutOptions, Quantization};
    pub use crate::shared::SharedPattern;
    pub use crate::target::{FloatParameter, ParameterId, ParameterRegistry, TargetParameter};
    pub use crate::timemap::{Sample, Tick, TimeMap};
    pub use crate::waveform::WaveParams;
}
