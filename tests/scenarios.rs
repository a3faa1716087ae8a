//! End-to-end scenarios across editing, evaluation, transforms and loading

use automation_pattern::prelude::*;
use automation_pattern::{CleanOutcome, PatternError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn pattern(progression: Progression, points: &[(Tick, f32)]) -> AutomationPattern {
    let mut p = AutomationPattern::new().with_progression(progression);
    for (t, v) in points {
        p.put_exact(*t, *v);
    }
    p
}

#[test]
fn test_linear_bar_ramp() {
    let p = pattern(Progression::Linear, &[(0, 0.0), (192, 1.0)]);
    assert!(p.wave().bank() == 0 && p.wave().index() == 0);

    assert_eq!(p.value_at(0), 0.0);
    assert!((p.value_at(96) - 0.5).abs() < 1e-6);
    assert_eq!(p.value_at(192), 1.0);
    assert_eq!(p.value_at(300), 1.0);
    assert_eq!(p.value_at(-5), 0.0);
    assert_eq!(p.time_map_length(), 192);
}

#[test]
fn test_discrete_holds_exactly() {
    let p = pattern(Progression::Discrete, &[(0, 0.2), (96, 0.8)]);
    assert_eq!(p.value_at(50), 0.2);
    assert_eq!(p.value_at(96), 0.8);
}

#[test]
fn test_parabolic_degrades_to_linear() {
    let p = pattern(Progression::Parabolic, &[(0, 0.0), (10, 1.0), (20, 0.0)]);
    assert!((p.value_at_with(5, EvalMode::Degraded) - 0.5).abs() < 1e-6);
    assert!((p.value_at(5) - 0.5).abs() > 1e-3);
}

#[test]
fn test_drag_through_five_positions_then_rollback() {
    let mut p = pattern(Progression::Linear, &[(10, 0.3)]);
    for (t, v) in [(30, 0.1), (50, 0.2), (70, 0.4), (90, 0.6), (110, 0.8)] {
        p.set_drag_value(t, v, PutOptions::default());
    }
    assert!(p.is_dragging());
    assert!(p.cancel_drag());
    let samples: Vec<Sample> = p.samples().collect();
    assert_eq!(samples, vec![Sample::new(10, 0.3)]);
}

#[test]
fn test_flip_twice_restores() {
    let mut p = pattern(Progression::Linear, &[(0, 0.1), (50, 0.9)]).with_length(100);
    let before: Vec<Sample> = p.samples().collect();
    p.flip_x(Some(100));
    p.flip_x(Some(100));
    assert_eq!(p.samples().collect::<Vec<_>>(), before);
}

#[test]
fn test_values_after_tick() {
    let p = pattern(Progression::Linear, &[(0, 0.0), (4, 1.0), (8, 0.0)]);
    assert_eq!(p.values_after(0), Some(vec![0.25, 0.5, 0.75, 1.0]));
    // between keys: up to and including the next key
    assert_eq!(p.values_after(2), Some(vec![0.75, 1.0]));
    assert_eq!(p.values_after(5), Some(vec![0.5, 0.25, 0.0]));
    assert_eq!(p.values_after(8), None);
}

#[test]
fn test_extreme_inputs_do_not_panic() {
    let p = AutomationPattern::new()
        .with_range(f32::NAN, 1.0)
        .with_point(0, 0.5)
        .with_point(Tick::MAX - 10, 0.5);
    assert_eq!(p.value_at(0), 1.0);
    assert_eq!(p.value_at(5), 1.0);
    assert_eq!(p.time_map_length(), Tick::MAX);
}

#[test]
fn test_auto_repeat_wraps() {
    let mut p = pattern(Progression::Linear, &[(0, 0.0), (96, 1.0), (192, 0.0)]);
    p.set_auto_repeat(true);
    assert_eq!(p.unit_length(), 192);
    assert!((p.value_at(192 + 48) - p.value_at(48)).abs() < 1e-6);
    assert!((p.value_at(384 + 96) - 1.0).abs() < 1e-6);
}

#[test]
fn test_listener_fires_once_per_transform() {
    let mut p = pattern(Progression::Linear, &[(0, 0.1), (48, 0.5), (96, 0.9)]);
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    p.set_change_listener(Arc::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    p.flip_y();
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    p.move_rel_up();
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[test]
fn test_parameter_lifecycle() {
    let mut registry = ParameterRegistry::new();
    let key = registry.insert(ParameterId(7), FloatParameter::new("pan", 0.25, -1.0, 1.0));

    let mut p = AutomationPattern::new().with_progression(Progression::Linear);
    p.set_shadow(true);
    assert!(p.add_object(&registry, key));
    // seeded from the parameter's current value
    assert_eq!(p.time_map().get(0), Some(0.25));
    assert_eq!(p.range().min, -1.0);

    registry.remove(key);
    assert_eq!(p.clean_objects(&registry), CleanOutcome::Orphaned);
    assert_eq!(p.pending_ids(), &[ParameterId(7)]);

    registry.insert(ParameterId(7), FloatParameter::new("pan", 0.0, -1.0, 1.0));
    assert_eq!(p.resolve_pending(&registry), 1);
    assert!(p.pending_ids().is_empty());
}

#[test]
fn test_save_and_reload() {
    let mut p = pattern(
        Progression::CubicHermite { tension: 0.4 },
        &[(0, 0.0), (48, 0.8), (144, 0.2), (192, 1.0)],
    )
    .with_name("resonance");
    p.set_wave_index(3);
    p.set_wave_amplitude(0.5);

    let json = p.to_json().unwrap();
    let loaded = AutomationPattern::from_json(&json).unwrap();
    for t in (0..=240).step_by(7) {
        assert_eq!(loaded.value_at(t), p.value_at(t), "mismatch at tick {t}");
    }
}

#[test]
fn test_load_rejects_garbage() {
    let err = AutomationPattern::from_json("[1, 2, 3]").unwrap_err();
    assert!(matches!(err, PatternError::Json(_)));
}

#[test]
fn test_shared_pattern_across_threads() {
    let shared = SharedPattern::new(pattern(Progression::Linear, &[(0, 0.0), (192, 1.0)]));
    let editor = shared.clone();
    std::thread::spawn(move || {
        editor.edit(|p| p.flip_y());
    })
    .join()
    .unwrap();
    assert_eq!(shared.render_value(0, false), 1.0);
    assert_eq!(shared.render_value(192, true), 0.0);
}
