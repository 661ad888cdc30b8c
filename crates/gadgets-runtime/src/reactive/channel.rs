#![forbid(unsafe_code)]

//! Ordered, synchronous multicast channel.
//!
//! # Design
//!
//! [`EventChannel<T>`] keeps its subscriber list in shared,
//! reference-counted storage (`Rc<RefCell<..>>`). [`EventChannel::dispatch`]
//! delivers the value to every live subscriber before returning. Cloning the
//! channel yields another handle to the same subscriber list.
//!
//! # Invariants
//!
//! 1. Between values, delivery is strictly FIFO for every subscriber.
//! 2. Within one value, subscribers run in registration order.
//! 3. A subscriber released before (or during) a delivery pass receives
//!    nothing further, including the remainder of that pass.
//! 4. A dispatch issued from inside a subscriber is queued and delivered
//!    after the current value reaches everyone, before the outermost
//!    `dispatch` returns. Subscribers never re-enter one another.
//! 5. After [`EventChannel::close`], `dispatch` returns [`ChannelClosed`]
//!    and no subscriber runs again.
//!
//! # Failure Modes
//!
//! - **Subscriber panic**: the panic propagates out of `dispatch`; queued
//!   values are dropped and the channel stays usable.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::disposable::Disposable;

type Handler<T> = Rc<dyn Fn(&T)>;

/// Returned by [`EventChannel::dispatch`] once the channel is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelClosed;

impl fmt::Display for ChannelClosed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("dispatch on a closed channel")
    }
}

impl std::error::Error for ChannelClosed {}

struct ChannelInner<T> {
    next_id: u64,
    subscribers: Vec<(u64, Handler<T>)>,
    queue: VecDeque<T>,
    delivering: bool,
    closed: bool,
    delivered: u64,
}

impl<T> ChannelInner<T> {
    fn is_subscribed(&self, id: u64) -> bool {
        self.subscribers.iter().any(|(sub, _)| *sub == id)
    }
}

/// Multicast channel with ordered, synchronous fan-out.
pub struct EventChannel<T> {
    inner: Rc<RefCell<ChannelInner<T>>>,
}

impl<T> Clone for EventChannel<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for EventChannel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("EventChannel")
            .field("subscribers", &inner.subscribers.len())
            .field("queued", &inner.queue.len())
            .field("closed", &inner.closed)
            .finish()
    }
}

impl<T: 'static> Default for EventChannel<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Clears the `delivering` flag even if a subscriber panics.
struct DeliveryGuard<'a, T> {
    inner: &'a RefCell<ChannelInner<T>>,
}

impl<T> Drop for DeliveryGuard<'_, T> {
    fn drop(&mut self) {
        let mut inner = self.inner.borrow_mut();
        inner.delivering = false;
        if std::thread::panicking() {
            inner.queue.clear();
        }
    }
}

impl<T: 'static> EventChannel<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(ChannelInner {
                next_id: 0,
                subscribers: Vec::new(),
                queue: VecDeque::new(),
                delivering: false,
                closed: false,
                delivered: 0,
            })),
        }
    }

    /// Register `handler`. The returned handle unsubscribes it.
    pub fn subscribe(&self, handler: impl Fn(&T) + 'static) -> Disposable {
        let id = {
            let mut inner = self.inner.borrow_mut();
            if inner.closed {
                return Disposable::empty();
            }
            let id = inner.next_id;
            inner.next_id += 1;
            inner.subscribers.push((id, Rc::new(handler)));
            id
        };
        let weak: Weak<RefCell<ChannelInner<T>>> = Rc::downgrade(&self.inner);
        Disposable::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.borrow_mut().subscribers.retain(|(sub, _)| *sub != id);
            }
        })
    }

    /// Deliver `value` to every subscriber.
    ///
    /// Called from inside a subscriber, the value is queued behind the one
    /// currently being delivered.
    pub fn dispatch(&self, value: T) -> Result<(), ChannelClosed> {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.closed {
                return Err(ChannelClosed);
            }
            inner.queue.push_back(value);
            if inner.delivering {
                return Ok(());
            }
            inner.delivering = true;
        }

        let _guard = DeliveryGuard { inner: &self.inner };
        loop {
            let (value, handlers) = {
                let mut inner = self.inner.borrow_mut();
                if inner.closed {
                    inner.queue.clear();
                    break;
                }
                let Some(value) = inner.queue.pop_front() else {
                    break;
                };
                inner.delivered += 1;
                (value, inner.subscribers.clone())
            };
            for (id, handler) in handlers {
                // Released mid-pass: skip.
                if !self.inner.borrow().is_subscribed(id) {
                    continue;
                }
                handler(&value);
            }
        }
        Ok(())
    }

    /// Drop every subscriber and refuse further dispatches. Idempotent.
    pub fn close(&self) {
        let released = {
            let mut inner = self.inner.borrow_mut();
            inner.closed = true;
            inner.queue.clear();
            std::mem::take(&mut inner.subscribers)
        };
        // Handlers may own Rc cycles back to this channel; drop them outside the borrow.
        drop(released);
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.borrow().closed
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }

    /// Total values delivered since creation.
    #[must_use]
    pub fn delivered(&self) -> u64 {
        self.inner.borrow().delivered
    }
}
