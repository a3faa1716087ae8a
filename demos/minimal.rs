//! Minimal example showing the essential features

use automation_pattern::prelude::*;

fn main() {
    println!("🎵 Automation Pattern - Essential Features\n");

    // 1. Progressions
    progressions();

    // 2. Waveform overlay
    waveform();

    // 3. Dragging a point
    dragging();

    // 4. Saving and loading
    persistence();
}

fn ramp(progression: Progression) -> AutomationPattern {
    AutomationPattern::new()
        .with_progression(progression)
        .with_point(0, 0.0)
        .with_point(96, 1.0)
        .with_point(192, 0.25)
}

fn progressions() {
    println!("1️⃣  Progressions\n");

    for progression in [
        Progression::Discrete,
        Progression::Linear,
        Progression::CubicHermite { tension: 1.0 },
        Progression::Parabolic,
    ] {
        let p = ramp(progression);
        println!(
            "   {:<14} t=48: {:.3}  t=144: {:.3}  (degraded t=144: {:.3})",
            progression.name(),
            p.value_at(48),
            p.value_at(144),
            p.value_at_with(144, EvalMode::Degraded)
        );
    }
    println!();
}

fn waveform() {
    println!("2️⃣  Waveform Overlay\n");

    let mut p = ramp(Progression::Linear);
    p.set_wave_index(1); // sine
    p.set_wave_amplitude(0.25);
    p.set_wave_repeat(2.0);

    for t in (0..=96).step_by(12) {
        println!("   t={t:>3}: {:.3}", p.value_at(t));
    }
    println!();
}

fn dragging() {
    println!("3️⃣  Dragging\n");

    let mut p = ramp(Progression::Linear);
    let mut drag = p.begin_drag(96, PutOptions::default());
    for (t, v) in [(100, 0.9), (110, 0.7), (130, 0.5)] {
        let committed = drag.move_to(t, v);
        println!("   moved to {t} (snapped to {committed})");
    }
    drag.commit();

    let ticks: Vec<Tick> = p.time_map().ticks().collect();
    println!("   keys after commit: {ticks:?}\n");
}

fn persistence() {
    println!("4️⃣  Saving and Loading\n");

    let p = ramp(Progression::CubicHermite { tension: 0.5 }).with_name("cutoff");
    let json = match p.to_json() {
        Ok(json) => json,
        Err(e) => {
            eprintln!("   save failed: {e}");
            return;
        }
    };
    match AutomationPattern::from_json(&json) {
        Ok(loaded) => println!(
            "   reloaded {:?}: {} samples, t=48: {:.3}",
            loaded.name(),
            loaded.time_map().len(),
            loaded.value_at(48)
        ),
        Err(e) => eprintln!("   load failed: {e}"),
    }
}
