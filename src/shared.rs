//! Pattern shared between an editing thread and the render thread
//!
//! Edits take the lock for their whole read-modify-write sequence, so the
//! renderer never sees a half-applied drag or transform. The renderer only
//! ever calls `try_lock`; when an edit is in flight it returns the last value
//! it managed to compute instead of waiting.

use crate::pattern::AutomationPattern;
use crate::progression::EvalMode;
use crate::timemap::Tick;
use log::trace;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};

/// Cloneable handle to one pattern
#[derive(Clone)]
pub struct SharedPattern {
    inner: Arc<Mutex<AutomationPattern>>,
    /// Bits of the last value handed to the renderer
    last_good: Arc<AtomicU32>,
}

impl SharedPattern {
    pub fn new(pattern: AutomationPattern) -> Self {
        Self {
            inner: Arc::new(Mutex::new(pattern)),
            last_good: Arc::new(AtomicU32::new(0.0f32.to_bits())),
        }
    }

    /// Run `f` with exclusive access. Everything inside is atomic with
    /// respect to [`SharedPattern::render_value`].
    ///
    /// The lock is not reentrant: calling [`SharedPattern::lock`] or `edit` on
    /// this handle (or a clone) from inside `f` deadlocks. Compose the steps on
    /// the `&mut AutomationPattern` instead. `render_value` is safe to call
    /// anywhere since it never waits.
    pub fn edit<R>(&self, f: impl FnOnce(&mut AutomationPattern) -> R) -> R {
        let mut guard = self.lock();
        f(&mut guard)
    }

    /// Block until the pattern is available. A panic in another editor does
    /// not leave the pattern unusable; the map is always consistent between
    /// public calls. Must not be called while this thread already holds the
    /// lock through `edit` or another guard.
    pub fn lock(&self) -> MutexGuard<'_, AutomationPattern> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Value for the render path. Never blocks: if an edit holds the lock the
    /// last good value is returned. `overloaded` selects degraded evaluation.
    pub fn render_value(&self, tick: Tick, overloaded: bool) -> f32 {
        let mode = if overloaded {
            EvalMode::Degraded
        } else {
            EvalMode::Normal
        };
        let guard = match self.inner.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                trace!("pattern busy at tick {tick}, holding last value");
                return self.last_good();
            }
        };
        let value = guard.value_at_with(tick, mode);
        self.last_good.store(value.to_bits(), Ordering::Relaxed);
        value
    }

    pub fn last_good(&self) -> f32 {
        f32::from_bits(self.last_good.load(Ordering::Relaxed))
    }
}

impl std::fmt::Debug for SharedPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedPattern")
            .field("last_good", &self.last_good())
            .finish_non_exhaustive()
    }
}
