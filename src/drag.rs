//! Drag staging
//!
//! A pointer drag repeatedly repositions one sample. Each movement replays
//! from a snapshot taken when the drag began, so intermediate positions never
//! leave stray points behind. Two front-ends share the same state:
//!
//! - [`DragSession`], a borrowed transaction that commits or rolls back
//!   explicitly (and rolls back when dropped uncommitted), and
//! - the flag-style [`AutomationPattern::set_drag_value`] /
//!   [`AutomationPattern::apply_drag_value`] pair for callers that cannot hold
//!   a borrow across UI events.

use crate::pattern::AutomationPattern;
use crate::quantize::PutOptions;
use crate::timemap::{Tick, TimeMap};
use log::debug;

/// Time maps captured when a drag begins
#[derive(Debug, Clone)]
pub(crate) struct DragSnapshot {
    /// Map before anything was touched, restored on rollback
    original: TimeMap,
    /// Map with the dragged point removed, replayed on every movement
    baseline: TimeMap,
}

impl AutomationPattern {
    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// The map each drag movement is replayed on, while a drag is live
    pub fn old_time_map(&self) -> Option<&TimeMap> {
        self.drag.as_ref().map(|d| &d.baseline)
    }

    fn begin_drag_at(&mut self, tick: Tick, options: PutOptions) {
        let original = self.time_map.clone();
        let start = if options.quantize_position {
            self.quantization.quantize_tick(tick)
        } else {
            tick
        };
        if self.time_map.remove(start).is_some() {
            self.tangents.remove(start);
            self.regenerate_around(start);
        }
        debug!("drag begins at tick {start}");
        self.drag = Some(DragSnapshot {
            original,
            baseline: self.time_map.clone(),
        });
    }

    fn replay_drag(&mut self, tick: Tick, value: f32, options: PutOptions) -> Tick {
        if let Some(snapshot) = &self.drag {
            self.time_map.clone_from(&snapshot.baseline);
        }
        self.rebuild_tangents();
        self.insert_sample(tick, value, options)
    }

    /// Move the dragged point to `(tick, value)`. The first call starts the
    /// drag at `tick`, removing any sample already there. Returns the committed
    /// tick.
    pub fn set_drag_value(&mut self, tick: Tick, value: f32, options: PutOptions) -> Tick {
        if self.drag.is_none() {
            self.begin_drag_at(tick, options);
        }
        let committed = self.replay_drag(tick, value, options);
        self.changed();
        committed
    }

    /// Finish the drag, keeping the last position. Returns false when no drag
    /// was live.
    pub fn apply_drag_value(&mut self) -> bool {
        if self.drag.take().is_none() {
            return false;
        }
        debug!("drag committed");
        self.changed();
        true
    }

    /// Abandon the drag and restore the map from before it began
    pub fn cancel_drag(&mut self) -> bool {
        let Some(snapshot) = self.drag.take() else {
            return false;
        };
        self.time_map = snapshot.original;
        self.rebuild_tangents();
        debug!("drag rolled back");
        self.changed();
        true
    }

    /// Open a drag transaction starting at `tick`. A drag left open through
    /// the flag-style API is rolled back first.
    pub fn begin_drag(&mut self, tick: Tick, options: PutOptions) -> DragSession<'_> {
        if self.drag.is_some() {
            self.cancel_drag();
        }
        self.begin_drag_at(tick, options);
        DragSession {
            pattern: self,
            options,
            finished: false,
        }
    }
}

/// A live drag on a pattern
///
/// Holding the session borrows the pattern mutably, so at most one transaction
/// can be open per pattern. Dropping it without [`DragSession::commit`] rolls
/// the drag back.
#[must_use = "dropping a drag session rolls it back"]
pub struct DragSession<'a> {
    pattern: &'a mut AutomationPattern,
    options: PutOptions,
    finished: bool,
}

impl DragSession<'_> {
    /// Preview the dragged point at a new position; returns the committed tick
    pub fn move_to(&mut self, tick: Tick, value: f32) -> Tick {
        let committed = self.pattern.replay_drag(tick, value, self.options);
        self.pattern.changed();
        committed
    }

    /// Read the pattern in its current preview state
    pub fn pattern(&self) -> &AutomationPattern {
        self.pattern
    }

    pub fn commit(mut self) {
        self.finished = true;
        self.pattern.apply_drag_value();
    }

    pub fn rollback(mut self) {
        self.finished = true;
        self.pattern.cancel_drag();
    }
}

impl Drop for DragSession<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.pattern.cancel_drag();
        }
    }
}
