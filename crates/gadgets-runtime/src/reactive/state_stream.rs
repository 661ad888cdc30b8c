#![forbid(unsafe_code)]

//! Left fold of an action channel into immutable state snapshots.
//!
//! [`StateStream`] subscribes to an [`EventChannel`] of actions and replaces
//! its snapshot with `reduce(previous, action)` for every action, in dispatch
//! order. The latest snapshot is readable synchronously through
//! [`StateStream::current`]; every new snapshot is also pushed to
//! subscribers.
//!
//! Derived slices come from [`StateStream::select`]: a projection of each
//! snapshot that emits only when the projected value actually changes. The
//! engine's gadget-registry slice is one; the command sync and the render
//! throttle hang off it.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::disposable::Disposable;
use crate::reactive::channel::EventChannel;

struct StreamInner<S> {
    current: RefCell<S>,
    version: Cell<u64>,
    snapshots: EventChannel<S>,
    source: RefCell<Disposable>,
}

/// Reducer-driven snapshot stream.
pub struct StateStream<S> {
    inner: Rc<StreamInner<S>>,
}

impl<S> Clone for StateStream<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<S: fmt::Debug> fmt::Debug for StateStream<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateStream")
            .field("current", &self.inner.current.borrow())
            .field("version", &self.inner.version.get())
            .finish()
    }
}

impl<S: Clone + 'static> StateStream<S> {
    /// Start folding `actions` from `initial` with `reduce`.
    ///
    /// `reduce` must be pure and total: an action it does not act on returns
    /// the previous state unchanged.
    pub fn new<A: 'static>(
        actions: &EventChannel<A>,
        initial: S,
        reduce: impl Fn(&S, &A) -> S + 'static,
    ) -> Self {
        let inner = Rc::new(StreamInner {
            current: RefCell::new(initial),
            version: Cell::new(0),
            snapshots: EventChannel::new(),
            source: RefCell::new(Disposable::empty()),
        });

        let weak = Rc::downgrade(&inner);
        let source = actions.subscribe(move |action: &A| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let next = reduce(&inner.current.borrow(), action);
            *inner.current.borrow_mut() = next.clone();
            inner.version.set(inner.version.get() + 1);
            let _ = inner.snapshots.dispatch(next);
        });
        *inner.source.borrow_mut() = source;

        Self { inner }
    }

    /// Latest snapshot.
    #[must_use]
    pub fn current(&self) -> S {
        self.inner.current.borrow().clone()
    }

    /// Borrow the latest snapshot without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.inner.current.borrow())
    }

    /// Number of reductions applied so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    /// Receive every new snapshot, in action order.
    pub fn subscribe(&self, handler: impl Fn(&S) + 'static) -> Disposable {
        self.inner.snapshots.subscribe(handler)
    }

    /// Project each snapshot through `project`, emitting only on change.
    pub fn select<T>(&self, project: impl Fn(&S) -> T + 'static) -> Slice<T>
    where
        T: Clone + PartialEq + 'static,
    {
        let inner = Rc::new(SliceInner {
            value: RefCell::new(self.with(&project)),
            changes: Cell::new(0),
            emits: EventChannel::new(),
        });
        let weak = Rc::downgrade(&inner);
        let link = self.subscribe(move |state| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let next = project(state);
            if *inner.value.borrow() == next {
                return;
            }
            *inner.value.borrow_mut() = next.clone();
            inner.changes.set(inner.changes.get() + 1);
            let _ = inner.emits.dispatch(next);
        });
        Slice { inner, link }
    }

    /// Detach from the action channel and drop snapshot subscribers.
    pub fn close(&self) {
        self.inner.source.borrow_mut().dispose();
        self.inner.snapshots.close();
    }
}

struct SliceInner<T> {
    value: RefCell<T>,
    changes: Cell<u64>,
    emits: EventChannel<T>,
}

/// Distinct-until-changed projection of a [`StateStream`].
///
/// A snapshot whose projection equals the last emitted value is swallowed,
/// so subscribers of the gadget slice only hear about registry changes, not
/// about renders or resizes. Emissions follow the channel's ordering rules.
///
/// Dropping the slice detaches it from the stream.
pub struct Slice<T> {
    inner: Rc<SliceInner<T>>,
    link: Disposable,
}

impl<T: Clone + PartialEq + 'static> Slice<T> {
    /// Last emitted projection (or the initial one).
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Called with the new value on every distinct change.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Disposable {
        self.inner.emits.subscribe(callback)
    }

    /// Number of distinct changes observed.
    #[must_use]
    pub fn changes(&self) -> u64 {
        self.inner.changes.get()
    }

    /// Detach from the stream.
    pub fn detach(&mut self) {
        self.link.dispose();
    }
}

impl<T: fmt::Debug> fmt::Debug for Slice<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slice")
            .field("value", &self.inner.value.borrow())
            .field("changes", &self.inner.changes.get())
            .field("attached", &!self.link.is_disposed())
            .finish()
    }
}
