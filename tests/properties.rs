//! Property-based tests for automation patterns
//!
//! Uses proptest to check the curve invariants over arbitrary sample sets,
//! progressions and edit sequences.

use automation_pattern::prelude::*;
use automation_pattern::target::ValueRange;
use proptest::prelude::*;
use proptest::test_runner::Config as ProptestConfig;

fn proptest_config() -> ProptestConfig {
    ProptestConfig {
        cases: 512,
        ..ProptestConfig::default()
    }
}

fn progression() -> impl Strategy<Value = Progression> {
    prop_oneof![
        Just(Progression::Discrete),
        Just(Progression::Linear),
        (-10.0f32..=10.0).prop_map(|tension| Progression::CubicHermite { tension }),
        Just(Progression::Parabolic),
    ]
}

fn samples() -> impl Strategy<Value = Vec<(Tick, f32)>> {
    prop::collection::vec((0..2_000i32, -4.0f32..4.0), 1..24)
}

fn wave() -> impl Strategy<Value = WaveParams> {
    (0..2i32, 0..6i32, 0.0f32..=1.0, 0.0f32..=1.0, -10.0f32..=10.0, -10.0f32..=20.0).prop_map(
        |(bank, index, ratio, skew, amplitude, repeat)| {
            let mut w = WaveParams::default();
            w.set_bank(bank);
            w.set_index(index);
            w.set_ratio(ratio);
            w.set_skew(skew);
            w.set_amplitude(amplitude);
            w.set_repeat(repeat);
            w
        },
    )
}

fn build(progression: Progression, points: &[(Tick, f32)]) -> AutomationPattern {
    let mut p = AutomationPattern::new().with_progression(progression);
    for (t, v) in points {
        p.put_exact(*t, *v);
    }
    p
}

fn pairs(p: &AutomationPattern) -> Vec<(Tick, f32)> {
    p.samples().map(|s| (s.tick, s.value)).collect()
}

/// Every evaluated value stays inside the target range
#[test]
fn test_values_stay_in_range() {
    proptest!(proptest_config(), |(
        prog in progression(),
        points in samples(),
        wave in wave(),
        (lo, hi) in (-2.0f32..0.5, 0.5f32..3.0),
        ticks in prop::collection::vec(-200..2_500i32, 16),
        degraded in any::<bool>(),
    )| {
        let mut p = build(prog, &points).with_wave(wave);
        p.set_range(ValueRange::new(lo, hi));
        let mode = if degraded { EvalMode::Degraded } else { EvalMode::Normal };
        for t in ticks {
            let v = p.value_at_with(t, mode);
            prop_assert!(v >= lo && v <= hi, "value {} at tick {} outside [{}, {}]", v, t, lo, hi);
        }
    });
}

/// Keys stay strictly ascending through arbitrary edits
#[test]
fn test_edits_keep_keys_ordered() {
    proptest!(proptest_config(), |(
        prog in progression(),
        edits in prop::collection::vec((0..3u8, -50..800i32, 0.0f32..1.0), 1..64),
    )| {
        let mut p = AutomationPattern::new().with_progression(prog);
        for (op, tick, value) in edits {
            match op {
                0 => { p.put_value(tick, value); }
                1 => p.remove_value(tick),
                _ => { p.put_value_with(tick, value, PutOptions::default().with_ignore_surrounding(false)); }
            }
            prop_assert!(p.time_map().is_ordered());
            prop_assert!(p.time_map().first().map_or(true, |s| s.tick >= 0));
        }
    });
}

/// Snapping a tick twice changes nothing, and lands on the grid
#[test]
fn test_quantize_tick_is_idempotent() {
    proptest!(proptest_config(), |(step in 1..400i32, tick in -100_000..100_000i32)| {
        let q = Quantization::default().with_tick_step(step);
        let once = q.quantize_tick(tick);
        prop_assert_eq!(q.quantize_tick(once), once);
        prop_assert_eq!(once.rem_euclid(step), 0);
        prop_assert!((once - tick).abs() * 2 <= step);
    });
}

/// Flipping twice over the same length restores the map
#[test]
fn test_flip_x_twice_is_identity() {
    proptest!(proptest_config(), |(
        length in 1..1_000i32,
        points in prop::collection::vec((0.0f64..=1.0, 0.0f32..1.0), 1..16),
    )| {
        let points: Vec<(Tick, f32)> = points
            .into_iter()
            .map(|(x, v)| ((x * f64::from(length)) as Tick, v))
            .collect();
        let mut p = build(Progression::Linear, &points);
        let before = pairs(&p);
        p.flip_x(Some(length));
        p.flip_x(Some(length));
        prop_assert_eq!(pairs(&p), before);
    });
}

/// A drag that is abandoned leaves the map as it found it
#[test]
fn test_cancelled_drag_restores_map() {
    proptest!(proptest_config(), |(
        points in samples(),
        start in 0..2_000i32,
        moves in prop::collection::vec((0..2_000i32, 0.0f32..1.0), 1..12),
    )| {
        let mut p = build(Progression::Linear, &points);
        let before = pairs(&p);
        for (t, v) in moves {
            if p.is_dragging() {
                p.set_drag_value(t, v, PutOptions::default());
            } else {
                p.set_drag_value(start, v, PutOptions::default());
            }
        }
        prop_assert!(p.cancel_drag());
        prop_assert_eq!(pairs(&p), before);
    });
}
