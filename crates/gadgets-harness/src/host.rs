#![forbid(unsafe_code)]

//! In-memory host workspace.
//!
//! [`FakeHost`] implements every host trait the runtime consumes. Tests
//! drive it directly (add, activate and destroy items, press pointers,
//! invoke commands, advance time) and inspect what the runtime registered.
//!
//! Listener lists are snapshotted before delivery, so a listener may
//! register or release registrations while being called.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use gadgets_runtime::host::{
    ActivePaneItemListener, CommandHandler, CommandRegistry, Document, Opener, PaneItemListener,
    PointerListener, Scheduler, TimerCallback, Workspace,
};
use gadgets_runtime::{
    Disposable, Element, GadgetLocation, ListenerPhase, PaneItemId, PaneItemRef, PointerEvent,
};
use web_time::Duration;

use crate::clock::VirtualClock;

/// One entry of the host command log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandEvent {
    Added { target: String, name: String },
    Removed { target: String, name: String },
}

struct Registered<T> {
    id: u64,
    value: T,
}

struct Command {
    id: u64,
    target: String,
    name: String,
    handler: CommandHandler,
}

#[derive(Default)]
struct HostState {
    next_id: u64,
    openers: Vec<Registered<Opener>>,
    item_observers: Vec<Registered<PaneItemListener>>,
    active_observers: Vec<Registered<ActivePaneItemListener>>,
    destroy_observers: Vec<Registered<PaneItemListener>>,
    pointer_listeners: Vec<Registered<(ListenerPhase, PointerListener)>>,
    commands: Vec<Command>,
    command_log: Vec<CommandEvent>,
    items: Vec<PaneItemRef>,
    active: Option<PaneItemRef>,
    opened: Vec<(String, GadgetLocation)>,
}

impl HostState {
    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn openers(&mut self) -> &mut Vec<Registered<Opener>> {
        &mut self.openers
    }

    fn item_observers(&mut self) -> &mut Vec<Registered<PaneItemListener>> {
        &mut self.item_observers
    }

    fn active_observers(&mut self) -> &mut Vec<Registered<ActivePaneItemListener>> {
        &mut self.active_observers
    }

    fn destroy_observers(&mut self) -> &mut Vec<Registered<PaneItemListener>> {
        &mut self.destroy_observers
    }

    fn pointer_listeners(&mut self) -> &mut Vec<Registered<(ListenerPhase, PointerListener)>> {
        &mut self.pointer_listeners
    }
}

/// Deterministic stand-in for the editor workspace and document.
pub struct FakeHost {
    state: Rc<RefCell<HostState>>,
    clock: Rc<VirtualClock>,
}

impl Default for FakeHost {
    fn default() -> Self {
        Self {
            state: Rc::new(RefCell::new(HostState::default())),
            clock: VirtualClock::new(),
        }
    }
}

impl std::fmt::Debug for FakeHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeHost")
            .field("registrations", &self.registration_count())
            .field("items", &self.state.borrow().items.len())
            .field("clock", &self.clock)
            .finish()
    }
}

/// Build a disposable that drops the registration `id` from one list.
fn release<T: 'static>(
    state: &Rc<RefCell<HostState>>,
    id: u64,
    list: fn(&mut HostState) -> &mut Vec<Registered<T>>,
) -> Disposable {
    let weak: Weak<RefCell<HostState>> = Rc::downgrade(state);
    Disposable::new(move || {
        if let Some(state) = weak.upgrade() {
            list(&mut state.borrow_mut()).retain(|entry| entry.id != id);
        }
    })
}

impl FakeHost {
    #[must_use]
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    #[must_use]
    pub fn clock(&self) -> &Rc<VirtualClock> {
        &self.clock
    }

    pub fn advance_ms(&self, ms: u64) {
        self.clock.advance_ms(ms);
    }

    // -- driving -----------------------------------------------------------

    /// Add `item` to a pane and notify item observers.
    pub fn add_item(&self, item: PaneItemRef) {
        self.state.borrow_mut().items.push(Rc::clone(&item));
        let observers = self.item_observers();
        for observer in observers {
            observer(&item);
        }
    }

    /// Make `item` the active pane item and notify.
    pub fn set_active(&self, item: Option<PaneItemRef>) {
        self.state.borrow_mut().active.clone_from(&item);
        let observers: Vec<ActivePaneItemListener> = self
            .state
            .borrow()
            .active_observers
            .iter()
            .map(|entry| Rc::clone(&entry.value))
            .collect();
        for observer in observers {
            observer(item.as_ref());
        }
    }

    /// Remove the item from its pane and notify destroy observers.
    /// Returns false if no such item exists.
    pub fn destroy_item(&self, id: PaneItemId) -> bool {
        let item = {
            let mut state = self.state.borrow_mut();
            let Some(index) = state.items.iter().position(|item| item.item_id() == id) else {
                return false;
            };
            let item = state.items.remove(index);
            if state
                .active
                .as_ref()
                .is_some_and(|active| active.item_id() == id)
            {
                state.active = None;
            }
            item
        };
        let observers: Vec<PaneItemListener> = self
            .state
            .borrow()
            .destroy_observers
            .iter()
            .map(|entry| Rc::clone(&entry.value))
            .collect();
        for observer in observers {
            observer(&item);
        }
        true
    }

    /// Deliver a pointer-down at `target`. Capture listeners always see it;
    /// bubble listeners only when the target does not stop propagation.
    pub fn pointer_down(&self, target: Rc<dyn Element>, stops_propagation: bool) {
        let event = PointerEvent { target };
        let listeners: Vec<(ListenerPhase, PointerListener)> = self
            .state
            .borrow()
            .pointer_listeners
            .iter()
            .map(|entry| (entry.value.0, Rc::clone(&entry.value.1)))
            .collect();
        for phase in [ListenerPhase::Capture, ListenerPhase::Bubble] {
            if phase == ListenerPhase::Bubble && stops_propagation {
                break;
            }
            for (listener_phase, listener) in &listeners {
                if *listener_phase == phase {
                    listener(&event);
                }
            }
        }
    }

    /// Invoke a registered command. Returns false if none matches.
    pub fn dispatch_command(&self, target: &str, name: &str) -> bool {
        let handler = self
            .state
            .borrow()
            .commands
            .iter()
            .find(|command| command.target == target && command.name == name)
            .map(|command| Rc::clone(&command.handler));
        match handler {
            Some(handler) => {
                handler();
                true
            }
            None => false,
        }
    }

    // -- inspection --------------------------------------------------------

    fn item_observers(&self) -> Vec<PaneItemListener> {
        self.state
            .borrow()
            .item_observers
            .iter()
            .map(|entry| Rc::clone(&entry.value))
            .collect()
    }

    /// Names of live commands, in registration order.
    #[must_use]
    pub fn command_names(&self) -> Vec<String> {
        self.state
            .borrow()
            .commands
            .iter()
            .map(|command| command.name.clone())
            .collect()
    }

    #[must_use]
    pub fn command_log(&self) -> Vec<CommandEvent> {
        self.state.borrow().command_log.clone()
    }

    /// URIs opened through [`Workspace::open`], with the requested location.
    #[must_use]
    pub fn opened(&self) -> Vec<(String, GadgetLocation)> {
        self.state.borrow().opened.clone()
    }

    #[must_use]
    pub fn items(&self) -> Vec<PaneItemRef> {
        self.state.borrow().items.clone()
    }

    /// Live listeners, openers and commands plus pending timers.
    #[must_use]
    pub fn registration_count(&self) -> usize {
        let state = self.state.borrow();
        state.openers.len()
            + state.item_observers.len()
            + state.active_observers.len()
            + state.destroy_observers.len()
            + state.pointer_listeners.len()
            + state.commands.len()
            + self.clock.pending()
    }

    #[must_use]
    pub fn pointer_listener_phases(&self) -> Vec<ListenerPhase> {
        self.state
            .borrow()
            .pointer_listeners
            .iter()
            .map(|entry| entry.value.0)
            .collect()
    }
}

impl Workspace for FakeHost {
    fn add_opener(&self, opener: Opener) -> Disposable {
        let id = {
            let mut state = self.state.borrow_mut();
            let id = state.allocate();
            state.openers.push(Registered { id, value: opener });
            id
        };
        release(&self.state, id, HostState::openers)
    }

    fn observe_pane_items(&self, listener: PaneItemListener) -> Disposable {
        let (id, existing) = {
            let mut state = self.state.borrow_mut();
            let id = state.allocate();
            state.item_observers.push(Registered {
                id,
                value: Rc::clone(&listener),
            });
            (id, state.items.clone())
        };
        for item in &existing {
            listener(item);
        }
        release(&self.state, id, HostState::item_observers)
    }

    fn on_did_change_active_pane_item(&self, listener: ActivePaneItemListener) -> Disposable {
        let id = {
            let mut state = self.state.borrow_mut();
            let id = state.allocate();
            state.active_observers.push(Registered {
                id,
                value: listener,
            });
            id
        };
        release(&self.state, id, HostState::active_observers)
    }

    fn on_did_destroy_pane_item(&self, listener: PaneItemListener) -> Disposable {
        let id = {
            let mut state = self.state.borrow_mut();
            let id = state.allocate();
            state.destroy_observers.push(Registered {
                id,
                value: listener,
            });
            id
        };
        release(&self.state, id, HostState::destroy_observers)
    }

    fn pane_items(&self) -> Vec<PaneItemRef> {
        self.items()
    }

    fn open(&self, uri: &str, location: GadgetLocation) -> Option<PaneItemRef> {
        self.state
            .borrow_mut()
            .opened
            .push((uri.to_string(), location));
        let openers: Vec<Opener> = self
            .state
            .borrow()
            .openers
            .iter()
            .map(|entry| Rc::clone(&entry.value))
            .collect();
        let item = openers.iter().find_map(|opener| opener(uri))?;
        self.add_item(Rc::clone(&item));
        self.set_active(Some(Rc::clone(&item)));
        Some(item)
    }
}

impl CommandRegistry for FakeHost {
    fn add_command(&self, target: &str, name: &str, handler: CommandHandler) -> Disposable {
        let id = {
            let mut state = self.state.borrow_mut();
            let id = state.allocate();
            state.commands.push(Command {
                id,
                target: target.to_string(),
                name: name.to_string(),
                handler,
            });
            state.command_log.push(CommandEvent::Added {
                target: target.to_string(),
                name: name.to_string(),
            });
            id
        };
        let weak = Rc::downgrade(&self.state);
        Disposable::new(move || {
            let Some(state) = weak.upgrade() else {
                return;
            };
            let mut state = state.borrow_mut();
            let Some(index) = state.commands.iter().position(|command| command.id == id) else {
                return;
            };
            let command = state.commands.remove(index);
            state.command_log.push(CommandEvent::Removed {
                target: command.target,
                name: command.name,
            });
        })
    }
}

impl Document for FakeHost {
    fn add_pointer_down_listener(
        &self,
        phase: ListenerPhase,
        listener: PointerListener,
    ) -> Disposable {
        let id = {
            let mut state = self.state.borrow_mut();
            let id = state.allocate();
            state.pointer_listeners.push(Registered {
                id,
                value: (phase, listener),
            });
            id
        };
        release(&self.state, id, HostState::pointer_listeners)
    }
}

impl Scheduler for FakeHost {
    fn set_timeout(&self, delay: Duration, callback: TimerCallback) -> Disposable {
        self.clock.set_timeout(delay, callback)
    }
}
