#![forbid(unsafe_code)]

//! Disposable handles and the composite group that owns them.
//!
//! Every registration the engine makes (host listeners, commands, timers,
//! channel subscribers) hands back a [`Disposable`]. Releasing it runs the
//! registration's teardown exactly once, whether through an explicit
//! [`Disposable::dispose`] call or by dropping the handle.
//!
//! [`DisposableGroup`] collects handles so a whole activation can be torn
//! down in a single sweep.
//!
//! # Invariants
//!
//! 1. A release closure runs at most once.
//! 2. `dispose()` on an already-released handle is a no-op.
//! 3. A disposed group releases members in insertion order.
//! 4. Adding to a disposed group releases the new member immediately.

use std::fmt;

type Release = Box<dyn FnOnce()>;

/// RAII handle to a registered subscription, command or timer.
///
/// Dropping the handle releases it. Store the handle for as long as the
/// registration should stay live.
#[must_use = "dropping a Disposable releases the registration immediately"]
pub struct Disposable {
    release: Option<Release>,
}

impl Disposable {
    /// Wrap a teardown closure.
    pub fn new(release: impl FnOnce() + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// A handle with nothing to release.
    pub fn empty() -> Self {
        Self { release: None }
    }

    /// Release the registration. Idempotent.
    pub fn dispose(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }

    /// Whether the handle has been released (or never held anything).
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.release.is_none()
    }
}

impl Drop for Disposable {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for Disposable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disposable")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// A set of [`Disposable`]s released together.
#[derive(Default)]
pub struct DisposableGroup {
    members: Vec<Disposable>,
    disposed: bool,
}

impl DisposableGroup {
    /// Create an empty, live group.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of `disposable`. If the group has already been
    /// disposed the handle is released on the spot.
    pub fn add(&mut self, mut disposable: Disposable) {
        if self.disposed {
            disposable.dispose();
            return;
        }
        self.members.push(disposable);
    }

    /// Number of members still held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// True if the group holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Release every member in insertion order. Idempotent.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        let count = self.members.len();
        for mut member in self.members.drain(..) {
            member.dispose();
        }
        tracing::debug!(target: "gadgets.lifecycle", released = count, "disposable group released");
    }
}

impl Drop for DisposableGroup {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for DisposableGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisposableGroup")
            .field("members", &self.members.len())
            .field("disposed", &self.disposed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    fn counting(counter: &Rc<Cell<u32>>) -> Disposable {
        let counter = Rc::clone(counter);
        Disposable::new(move || counter.set(counter.get() + 1))
    }

    #[test]
    fn dispose_runs_release_once() {
        let count = Rc::new(Cell::new(0));
        let mut handle = counting(&count);
        assert!(!handle.is_disposed());

        handle.dispose();
        handle.dispose();
        assert_eq!(count.get(), 1);
        assert!(handle.is_disposed());

        drop(handle);
        assert_eq!(count.get(), 1, "drop after dispose must not release again");
    }

    #[test]
    fn drop_releases() {
        let count = Rc::new(Cell::new(0));
        {
            let _handle = counting(&count);
        }
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn empty_is_already_disposed() {
        let mut handle = Disposable::empty();
        assert!(handle.is_disposed());
        handle.dispose();
    }

    #[test]
    fn group_releases_in_insertion_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut group = DisposableGroup::new();
        for name in ["opener", "render", "destroy"] {
            let log = Rc::clone(&log);
            group.add(Disposable::new(move || log.borrow_mut().push(name)));
        }
        assert_eq!(group.len(), 3);

        group.dispose();
        assert_eq!(*log.borrow(), vec!["opener", "render", "destroy"]);
        assert!(group.is_empty());
        assert!(group.is_disposed());
    }

    #[test]
    fn group_dispose_is_idempotent() {
        let count = Rc::new(Cell::new(0));
        let mut group = DisposableGroup::new();
        group.add(counting(&count));
        group.dispose();
        group.dispose();
        drop(group);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn add_after_dispose_releases_immediately() {
        let count = Rc::new(Cell::new(0));
        let mut group = DisposableGroup::new();
        group.dispose();

        group.add(counting(&count));
        assert_eq!(count.get(), 1);
        assert!(group.is_empty());
    }
}
