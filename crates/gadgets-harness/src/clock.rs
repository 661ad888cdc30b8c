#![forbid(unsafe_code)]

//! Manual virtual clock.
//!
//! Timers only fire from [`VirtualClock::advance`], in due-time order (ties in
//! scheduling order), with the clock set to each timer's due time while its
//! callback runs. Nothing fires on its own, which makes throttle windows
//! exact and reproducible.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use gadgets_runtime::Disposable;
use gadgets_runtime::host::TimerCallback;
use web_time::Duration;

struct Timer {
    id: u64,
    due: Duration,
    callback: TimerCallback,
}

/// Deterministic time source for [`FakeHost`](crate::FakeHost).
#[derive(Default)]
pub struct VirtualClock {
    now: Cell<Duration>,
    next_id: Cell<u64>,
    timers: RefCell<Vec<Timer>>,
    fired: Cell<u64>,
    cancelled: Cell<u64>,
}

impl std::fmt::Debug for VirtualClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualClock")
            .field("now", &self.now.get())
            .field("pending", &self.pending())
            .field("fired", &self.fired.get())
            .field("cancelled", &self.cancelled.get())
            .finish()
    }
}

impl VirtualClock {
    #[must_use]
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Time elapsed since the clock was created.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.now.get()
    }

    /// Schedule `callback` after `delay`. Disposing the handle cancels it;
    /// disposing after it fired does nothing.
    pub fn set_timeout(self: &Rc<Self>, delay: Duration, callback: TimerCallback) -> Disposable {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        let due = self.now.get() + delay;
        self.timers.borrow_mut().push(Timer { id, due, callback });
        tracing::trace!(id, ?due, "timer scheduled");

        let clock = Rc::downgrade(self);
        Disposable::new(move || {
            let Some(clock) = clock.upgrade() else {
                return;
            };
            let removed = {
                let mut timers = clock.timers.borrow_mut();
                let before = timers.len();
                timers.retain(|timer| timer.id != id);
                before != timers.len()
            };
            if removed {
                clock.cancelled.set(clock.cancelled.get() + 1);
                tracing::trace!(id, "timer cancelled");
            }
        })
    }

    /// Move time forward, firing every timer that comes due on the way,
    /// including timers scheduled by callbacks within the interval.
    pub fn advance(&self, by: Duration) {
        let target = self.now.get() + by;
        loop {
            let next = {
                let mut timers = self.timers.borrow_mut();
                let earliest = timers
                    .iter()
                    .enumerate()
                    .filter(|(_, timer)| timer.due <= target)
                    .min_by_key(|(_, timer)| (timer.due, timer.id))
                    .map(|(index, _)| index);
                earliest.map(|index| timers.remove(index))
            };
            let Some(timer) = next else {
                break;
            };
            self.now.set(timer.due);
            self.fired.set(self.fired.get() + 1);
            tracing::trace!(id = timer.id, "timer fired");
            (timer.callback)();
        }
        self.now.set(target);
    }

    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }

    /// Timers scheduled and not yet fired or cancelled.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.timers.borrow().len()
    }

    #[must_use]
    pub fn fired(&self) -> u64 {
        self.fired.get()
    }

    #[must_use]
    pub fn cancelled(&self) -> u64 {
        self.cancelled.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder(log: &Rc<RefCell<Vec<&'static str>>>, name: &'static str) -> TimerCallback {
        let log = Rc::clone(log);
        Box::new(move || log.borrow_mut().push(name))
    }

    #[test]
    fn fires_in_due_order() {
        let clock = VirtualClock::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let _late = clock.set_timeout(Duration::from_millis(50), recorder(&log, "late"));
        let _early = clock.set_timeout(Duration::from_millis(10), recorder(&log, "early"));

        clock.advance_ms(9);
        assert!(log.borrow().is_empty());
        clock.advance_ms(100);
        assert_eq!(*log.borrow(), vec!["early", "late"]);
        assert_eq!(clock.now(), Duration::from_millis(109));
    }

    #[test]
    fn cancel_before_due() {
        let clock = VirtualClock::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut handle = clock.set_timeout(Duration::from_millis(10), recorder(&log, "x"));
        handle.dispose();
        clock.advance_ms(20);
        assert!(log.borrow().is_empty());
        assert_eq!(clock.cancelled(), 1);
    }

    #[test]
    fn dispose_after_fire_is_not_a_cancel() {
        let clock = VirtualClock::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let handle = clock.set_timeout(Duration::from_millis(10), recorder(&log, "x"));
        clock.advance_ms(10);
        drop(handle);
        assert_eq!(clock.fired(), 1);
        assert_eq!(clock.cancelled(), 0);
    }
}
