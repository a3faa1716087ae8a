//! Periodic waveform overlay
//!
//! A waveform selected by `(bank, index)` is layered on top of each curve
//! segment. Its depth follows the segment's rise and the target range, its
//! cycle count is derived from the segment length and the `repeat` exponent.

use crate::quantize::TICKS_PER_BAR;
use crate::target::ValueRange;
use crate::timemap::Tick;
use std::f32::consts::TAU;
use std::ops::RangeInclusive;

pub const WAVE_BANK_RANGE: RangeInclusive<i32> = 0..=15;
pub const WAVE_INDEX_RANGE: RangeInclusive<i32> = 0..=127;
pub const WAVE_RATIO_RANGE: RangeInclusive<f32> = 0.0..=1.0;
pub const WAVE_SKEW_RANGE: RangeInclusive<f32> = 0.0..=1.0;
pub const WAVE_AMPLITUDE_RANGE: RangeInclusive<f32> = -10.0..=10.0;
pub const WAVE_REPEAT_RANGE: RangeInclusive<f32> = -10.0..=20.0;

/// Cycle counts below this are treated as silence
pub const MIN_CYCLES: f32 = 1.0 / 256.0;

/// A single-cycle shape evaluated over `phase ∈ [0, 1]`
#[derive(Debug, Clone, PartialEq)]
pub enum Waveform {
    /// No modulation
    Zero,
    Sine,
    Triangle,
    SawUp,
    SawDown,
    Square,
    /// Positive half of a sine over the whole cycle
    HalfSine,
    /// Exponential decay from 1 to ~0
    ExpDecay,
    /// User table, linearly interpolated and periodic
    Sampled(WaveTable),
}

/// Single-cycle sample table; silence is detected once when it is built
#[derive(Debug, Clone, PartialEq)]
pub struct WaveTable {
    samples: Vec<f32>,
    silent: bool,
}

impl WaveTable {
    pub fn new(samples: Vec<f32>) -> Self {
        let silent = samples.iter().all(|v| *v == 0.0);
        Self { samples, silent }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    #[must_use]
    pub fn is_silent(&self) -> bool {
        self.silent
    }
}

impl From<Vec<f32>> for WaveTable {
    fn from(samples: Vec<f32>) -> Self {
        Self::new(samples)
    }
}

impl Waveform {
    /// Evaluate at `phase`, clamped to `[0, 1]`
    #[inline]
    #[must_use]
    pub fn f(&self, phase: f32) -> f32 {
        let p = phase.clamp(0.0, 1.0);
        match self {
            Waveform::Zero => 0.0,
            Waveform::Sine => (TAU * p).sin(),
            Waveform::Triangle => {
                if p < 0.25 {
                    4.0 * p
                } else if p < 0.75 {
                    2.0 - 4.0 * p
                } else {
                    4.0 * p - 4.0
                }
            }
            Waveform::SawUp => 2.0 * p - 1.0,
            Waveform::SawDown => 1.0 - 2.0 * p,
            Waveform::Square => {
                if p < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::HalfSine => (std::f32::consts::PI * p).sin(),
            Waveform::ExpDecay => (-5.0 * p).exp(),
            Waveform::Sampled(table) => sampled(table.samples(), p),
        }
    }

    /// True for waveforms that never modulate; constant time
    #[inline]
    #[must_use]
    pub fn is_zero(&self) -> bool {
        match self {
            Waveform::Zero => true,
            Waveform::Sampled(table) => table.is_silent(),
            _ => false,
        }
    }
}

fn sampled(table: &[f32], phase: f32) -> f32 {
    match table.len() {
        0 => 0.0,
        1 => table[0],
        len => {
            let pos = phase * len as f32;
            let i = (pos.floor() as usize) % len;
            let frac = pos - pos.floor();
            let a = table[i];
            let b = table[(i + 1) % len];
            a + (b - a) * frac
        }
    }
}

/// Source of waveforms addressed by bank and index
pub trait WaveformTable: Send + Sync {
    fn lookup(&self, bank: i32, index: i32) -> Option<&Waveform>;
}

/// Built-in tables. Bank 0 holds the bipolar basics, bank 1 unipolar shapes;
/// index 0 of every bank is the zero waveform.
#[derive(Debug, Clone)]
pub struct BuiltinWaveforms {
    banks: Vec<Vec<Waveform>>,
}

impl Default for BuiltinWaveforms {
    fn default() -> Self {
        Self {
            banks: vec![
                vec![
                    Waveform::Zero,
                    Waveform::Sine,
                    Waveform::Triangle,
                    Waveform::SawUp,
                    Waveform::SawDown,
                    Waveform::Square,
                ],
                vec![Waveform::Zero, Waveform::HalfSine, Waveform::ExpDecay],
            ],
        }
    }
}

impl BuiltinWaveforms {
    /// Append a user bank, returning its bank number
    pub fn push_bank(&mut self, waveforms: Vec<Waveform>) -> i32 {
        self.banks.push(waveforms);
        (self.banks.len() - 1) as i32
    }
}

impl WaveformTable for BuiltinWaveforms {
    fn lookup(&self, bank: i32, index: i32) -> Option<&Waveform> {
        let bank = usize::try_from(bank).ok()?;
        let index = usize::try_from(index).ok()?;
        self.banks.get(bank)?.get(index)
    }
}

/// The six tunable waveform parameters, each validated on assignment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveParams {
    bank: i32,
    index: i32,
    ratio: f32,
    skew: f32,
    amplitude: f32,
    repeat: f32,
}

impl Default for WaveParams {
    fn default() -> Self {
        Self {
            bank: 0,
            index: 0,
            ratio: 0.0,
            skew: 1.0,
            amplitude: 1.0,
            repeat: 0.0,
        }
    }
}

fn accept<T: PartialOrd + Copy>(slot: &mut T, value: T, range: &RangeInclusive<T>) -> bool {
    if range.contains(&value) {
        *slot = value;
        true
    } else {
        false
    }
}

impl WaveParams {
    pub fn bank(&self) -> i32 {
        self.bank
    }
    pub fn index(&self) -> i32 {
        self.index
    }
    pub fn ratio(&self) -> f32 {
        self.ratio
    }
    pub fn skew(&self) -> f32 {
        self.skew
    }
    pub fn amplitude(&self) -> f32 {
        self.amplitude
    }
    pub fn repeat(&self) -> f32 {
        self.repeat
    }

    // Setters leave the value untouched and return false when out of range.

    pub fn set_bank(&mut self, bank: i32) -> bool {
        accept(&mut self.bank, bank, &WAVE_BANK_RANGE)
    }
    pub fn set_index(&mut self, index: i32) -> bool {
        accept(&mut self.index, index, &WAVE_INDEX_RANGE)
    }
    pub fn set_ratio(&mut self, ratio: f32) -> bool {
        accept(&mut self.ratio, ratio, &WAVE_RATIO_RANGE)
    }
    pub fn set_skew(&mut self, skew: f32) -> bool {
        accept(&mut self.skew, skew, &WAVE_SKEW_RANGE)
    }
    pub fn set_amplitude(&mut self, amplitude: f32) -> bool {
        accept(&mut self.amplitude, amplitude, &WAVE_AMPLITUDE_RANGE)
    }
    pub fn set_repeat(&mut self, repeat: f32) -> bool {
        accept(&mut self.repeat, repeat, &WAVE_REPEAT_RANGE)
    }
}

/// Where a query falls relative to its surrounding keys
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentPosition {
    /// Ticks past the left key
    pub offset: Tick,
    /// Distance to the right key, `None` after the last key
    pub length: Option<Tick>,
    /// Rise from the left key to the right key
    pub rise: f32,
}

/// Number of waveform cycles across a segment of `length` ticks.
///
/// `length · 2^repeat / 4 / 192` is snapped to a whole number when at least 1,
/// to a unit fraction `1/n` when between [`MIN_CYCLES`] and 1, and to 0 below.
#[must_use]
pub fn cycle_count(length: Tick, repeat: f32) -> f32 {
    let raw = length as f32 * repeat.exp2() / 4.0 / TICKS_PER_BAR as f32;
    if raw >= 1.0 {
        raw.round().max(1.0)
    } else if raw >= MIN_CYCLES {
        1.0 / (1.0 / raw).round()
    } else {
        0.0
    }
}

/// Add the waveform overlay to a base curve value
#[must_use]
pub fn modulate(
    value: f32,
    wave: &Waveform,
    params: &WaveParams,
    at: SegmentPosition,
    range: &ValueRange,
) -> f32 {
    if wave.is_zero() {
        return value;
    }

    let depth = ((1.0 - params.ratio) * at.rise + params.ratio * range.span()).abs();
    let w0 = wave.f(0.0);

    if at.offset == 0 {
        return value + depth * params.skew * w0 * params.amplitude;
    }

    let Some(length) = at.length.filter(|l| *l > 0) else {
        return value;
    };

    let cycles = cycle_count(length, params.repeat);
    if cycles == 0.0 {
        return value;
    }

    let x = at.offset as f32 / length as f32;
    let phase = (x * cycles).fract();
    // the ramp term cancels the waveform's own drift across the segment
    let ramp = (1.0 - params.skew) * (-w0 - x * (wave.f(1.0) - w0));
    value + depth * (wave.f(phase) + ramp) * params.amplitude
}
