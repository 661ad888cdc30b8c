#![forbid(unsafe_code)]

//! Trailing-edge throttle over host timers.
//!
//! The first trigger in an idle window arms a timer for the full window.
//! Further triggers while the timer is pending are coalesced into it. When
//! the timer fires the effect runs exactly once and the throttle returns to
//! idle, so a burst of any length yields one effect per window, fired at
//! window close.
//!
//! # Invariants
//!
//! 1. At most one timer is pending at any time.
//! 2. The effect never runs synchronously inside [`Throttle::trigger`].
//! 3. After [`Throttle::dispose`], the pending timer is cancelled and later
//!    triggers are ignored; the effect never runs again.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use web_time::Duration;

use crate::disposable::Disposable;
use crate::host::TimerCallback;

/// Arms a one-shot timer; disposing the handle cancels it.
pub type ScheduleFn = Rc<dyn Fn(Duration, TimerCallback) -> Disposable>;

/// Counters describing throttle activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThrottleStats {
    /// Triggers accepted while live.
    pub triggers: u64,
    /// Triggers absorbed into an already pending window.
    pub coalesced: u64,
    /// Times the effect ran.
    pub fired: u64,
}

struct ThrottleInner {
    window: Duration,
    schedule: ScheduleFn,
    effect: Rc<dyn Fn()>,
    pending: Option<Disposable>,
    disposed: bool,
    stats: ThrottleStats,
}

/// Shared handle to a trailing-edge throttle.
#[derive(Clone)]
pub struct Throttle {
    inner: Rc<RefCell<ThrottleInner>>,
}

impl fmt::Debug for Throttle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Throttle")
            .field("window", &inner.window)
            .field("pending", &inner.pending.is_some())
            .field("disposed", &inner.disposed)
            .field("stats", &inner.stats)
            .finish()
    }
}

impl Throttle {
    pub fn new(window: Duration, schedule: ScheduleFn, effect: impl Fn() + 'static) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ThrottleInner {
                window,
                schedule,
                effect: Rc::new(effect),
                pending: None,
                disposed: false,
                stats: ThrottleStats::default(),
            })),
        }
    }

    /// Note one source event.
    pub fn trigger(&self) {
        let (window, schedule) = {
            let mut inner = self.inner.borrow_mut();
            if inner.disposed {
                return;
            }
            inner.stats.triggers += 1;
            if inner.pending.is_some() {
                inner.stats.coalesced += 1;
                return;
            }
            (inner.window, Rc::clone(&inner.schedule))
        };

        let weak = Rc::downgrade(&self.inner);
        let callback: TimerCallback = Box::new(move || Self::fire(&weak));
        let handle = schedule(window, callback);

        let mut inner = self.inner.borrow_mut();
        if inner.disposed {
            drop(inner);
            let mut handle = handle;
            handle.dispose();
            return;
        }
        inner.pending = Some(handle);
    }

    fn fire(weak: &Weak<RefCell<ThrottleInner>>) {
        let Some(inner) = weak.upgrade() else {
            return;
        };
        let (effect, expired) = {
            let mut state = inner.borrow_mut();
            if state.disposed {
                return;
            }
            let expired = state.pending.take();
            state.stats.fired += 1;
            (Rc::clone(&state.effect), expired)
        };
        // The timer has already fired; releasing its handle is a host no-op.
        drop(expired);
        tracing::debug!(target: "gadgets.effect", "throttle window closed");
        effect();
    }

    /// Whether a window is currently open.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.inner.borrow().pending.is_some()
    }

    #[must_use]
    pub fn stats(&self) -> ThrottleStats {
        self.inner.borrow().stats
    }

    /// Cancel the pending timer and ignore every later trigger. Idempotent.
    pub fn dispose(&self) {
        let pending = {
            let mut inner = self.inner.borrow_mut();
            if inner.disposed {
                return;
            }
            inner.disposed = true;
            inner.pending.take()
        };
        if let Some(mut timer) = pending {
            tracing::debug!(target: "gadgets.effect", "cancelling pending throttle timer");
            timer.dispose();
        }
    }

    /// A handle that disposes this throttle, for a disposable group.
    pub fn disposable(&self) -> Disposable {
        let throttle = self.clone();
        Disposable::new(move || throttle.dispose())
    }
}
