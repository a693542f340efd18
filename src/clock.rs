//! Virtual clock
//!
//! A deterministic logical-time source driving timers and
//! animation-frame-gated renders. No component observes wall-clock time;
//! everything scheduled here fires synchronously when the clock is driven.
//!
//! The clock is a cloneable handle over shared state, owned by the suite
//! runner and threaded explicitly into every program runner and plugin at
//! construction.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Milliseconds between animation frames
const FRAME_INTERVAL_MS: u64 = 16;

type Callback = Box<dyn FnOnce()>;

#[derive(Default)]
struct ClockInner {
    now_ms: u64,
    next_seq: u64,
    // Keyed by (fire time, registration order) so due callbacks fire in
    // fire-time then registration order.
    pending: BTreeMap<(u64, u64), Callback>,
}

/// Deterministic time source shared by the runner and its plugins
#[derive(Clone, Default)]
pub struct VirtualClock {
    inner: Rc<RefCell<ClockInner>>,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current logical time in milliseconds
    pub fn now_ms(&self) -> u64 {
        self.inner.borrow().now_ms
    }

    /// Clear all pending callbacks and zero the clock.
    ///
    /// The suite runner calls this between subjects.
    pub fn reset(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.now_ms = 0;
        inner.next_seq = 0;
        inner.pending.clear();
    }

    /// Schedule a callback to fire `delay_ms` from now
    pub fn schedule(&self, delay_ms: u64, callback: impl FnOnce() + 'static) {
        let mut inner = self.inner.borrow_mut();
        let fire_at = inner.now_ms + delay_ms;
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.pending.insert((fire_at, seq), Box::new(callback));
    }

    /// Schedule a callback for the next animation-frame boundary
    pub fn schedule_frame(&self, callback: impl FnOnce() + 'static) {
        let delay = {
            let inner = self.inner.borrow();
            FRAME_INTERVAL_MS - inner.now_ms % FRAME_INTERVAL_MS
        };
        self.schedule(delay, callback);
    }

    /// Fire all callbacks due at or before the next animation-frame
    /// boundary, synchronously, in fire-time then registration order.
    pub fn run_to_frame(&self) {
        let target = {
            let inner = self.inner.borrow();
            inner.now_ms + (FRAME_INTERVAL_MS - inner.now_ms % FRAME_INTERVAL_MS)
        };
        self.advance_to(target);
    }

    /// Advance logical time to `target_ms`, firing everything due on the way.
    ///
    /// Callbacks may schedule further callbacks; anything landing at or
    /// before the target fires in this same pass.
    pub fn advance_to(&self, target_ms: u64) {
        loop {
            let due = {
                let mut inner = self.inner.borrow_mut();
                let key = inner
                    .pending
                    .keys()
                    .next()
                    .copied()
                    .filter(|(fire, _)| *fire <= target_ms);
                match key {
                    Some(key) => {
                        inner.now_ms = key.0;
                        inner.pending.remove(&key)
                    }
                    None => None,
                }
            };
            // Borrow released before the callback runs so it can reschedule.
            match due {
                Some(callback) => callback(),
                None => break,
            }
        }
        // Logical time is monotonic; a stale target never rewinds it
        let mut inner = self.inner.borrow_mut();
        if target_ms > inner.now_ms {
            inner.now_ms = target_ms;
        }
    }

    /// Advance logical time by `delta_ms`
    pub fn advance(&self, delta_ms: u64) {
        let target = self.now_ms() + delta_ms;
        self.advance_to(target);
    }

    /// Number of callbacks not yet fired
    pub fn pending_count(&self) -> usize {
        self.inner.borrow().pending.len()
    }
}
