#![forbid(unsafe_code)]

//! Command facade: the only sanctioned way to produce actions.
//!
//! Each method maps one host occurrence to zero or more dispatched actions.
//! Methods may read the current snapshot, but never hold on to it across a
//! call into the host: anything read before an external call is re-read
//! after it.
//!
//! Registration calls decide success against the snapshot plus any
//! registry intents this facade has queued but the reducer has not applied
//! yet, so two calls made during one delivery pass still see each other.
//!
//! Once [`Commands::deactivate`] has run, every method is an inert no-op.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::action::{Action, ActionChannel};
use crate::config::GadgetsConfig;
use crate::disposable::Disposable;
use crate::error::GadgetsError;
use crate::host::{ContainerHandle, Host, PaneItem, PaneItemId, PaneItemRef};
use crate::orchestrator::command_sync::CommandLedger;
use crate::reactive::StateStream;
use crate::state::{GadgetDescriptor, GadgetId, GadgetsState};

/// Placeholder pane item handed to the host for a gadget URI.
///
/// The gadget's content is rendered into it once the gadget is registered.
#[derive(Debug)]
pub struct GadgetPaneItem {
    id: PaneItemId,
    gadget: GadgetId,
    uri: String,
}

impl GadgetPaneItem {
    fn new(gadget: GadgetId, uri: &str) -> Self {
        Self {
            id: PaneItemId::next(),
            gadget,
            uri: uri.to_string(),
        }
    }

    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }
}

impl PaneItem for GadgetPaneItem {
    fn item_id(&self) -> PaneItemId {
        self.id
    }

    fn gadget_id(&self) -> Option<GadgetId> {
        Some(self.gadget.clone())
    }
}

/// Latest registry intent for one id, and how many of the facade's
/// register/unregister actions for it are still undelivered.
#[derive(Debug, Clone, Copy)]
struct QueuedIntent {
    registered: bool,
    outstanding: usize,
}

type QueuedIntents = Rc<RefCell<BTreeMap<GadgetId, QueuedIntent>>>;

struct CommandsInner {
    actions: ActionChannel,
    state: StateStream<GadgetsState>,
    host: Rc<dyn Host>,
    config: Rc<GadgetsConfig>,
    ledger: CommandLedger,
    queued: QueuedIntents,
    settle: RefCell<Disposable>,
    deactivated: Cell<bool>,
}

/// Cloneable handle to the command facade.
#[derive(Clone)]
pub struct Commands {
    inner: Rc<CommandsInner>,
}

/// Non-owning handle, for callbacks the host keeps alive.
#[derive(Clone)]
pub struct WeakCommands {
    inner: Weak<CommandsInner>,
}

impl WeakCommands {
    #[must_use]
    pub fn upgrade(&self) -> Option<Commands> {
        self.inner.upgrade().map(|inner| Commands { inner })
    }
}

impl fmt::Debug for Commands {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Commands")
            .field("deactivated", &self.inner.deactivated.get())
            .field("host_commands", &self.inner.ledger.len())
            .finish()
    }
}

impl Commands {
    pub(crate) fn new(
        actions: ActionChannel,
        state: StateStream<GadgetsState>,
        host: Rc<dyn Host>,
        config: Rc<GadgetsConfig>,
    ) -> Self {
        // Subscribed after `state`, so an intent settles once it is reduced.
        let queued = QueuedIntents::default();
        let pending = Rc::clone(&queued);
        let settle = actions.subscribe(move |action: &Action| {
            let id = match action {
                Action::RegisterGadget(gadget) => gadget.id(),
                Action::UnregisterGadget(id) => id,
                _ => return,
            };
            settle_intent(&pending, id);
        });

        Self {
            inner: Rc::new(CommandsInner {
                actions,
                state,
                host,
                config,
                ledger: CommandLedger::default(),
                queued,
                settle: RefCell::new(settle),
                deactivated: Cell::new(false),
            }),
        }
    }

    #[must_use]
    pub fn downgrade(&self) -> WeakCommands {
        WeakCommands {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Latest state snapshot.
    #[must_use]
    pub fn state(&self) -> GadgetsState {
        self.inner.state.current()
    }

    #[must_use]
    pub fn config(&self) -> &GadgetsConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn is_deactivated(&self) -> bool {
        self.inner.deactivated.get()
    }

    pub(crate) fn host(&self) -> &Rc<dyn Host> {
        &self.inner.host
    }

    pub(crate) fn ledger(&self) -> &CommandLedger {
        &self.inner.ledger
    }

    fn dispatch(&self, action: Action) -> bool {
        if self.is_deactivated() {
            tracing::trace!(kind = action.kind(), "dispatch after deactivate ignored");
            return false;
        }
        let _span = tracing::debug_span!("gadgets.dispatch", kind = action.kind()).entered();
        match self.inner.actions.dispatch(action) {
            Ok(()) => true,
            Err(closed) => {
                tracing::debug!(error = %closed, "action dropped");
                false
            }
        }
    }

    /// Opener hook: a placeholder item for gadget URIs, `None` for anything
    /// else so the host can try other openers.
    pub fn open_uri(&self, uri: &str) -> Option<PaneItemRef> {
        if self.is_deactivated() {
            return None;
        }
        let gadget = self.inner.config.parse_gadget_uri(uri)?;
        let item = GadgetPaneItem::new(gadget.clone(), uri);
        let id = item.item_id();
        self.dispatch(Action::OpenUri {
            uri: uri.to_string(),
            gadget,
            item: id,
        });
        Some(Rc::new(item))
    }

    /// Ask the render effect to refresh every gadget pane item.
    pub fn render_pane_items(&self) {
        self.dispatch(Action::RenderPaneItems);
    }

    /// Release whatever was rendered into a destroyed item. Items that never
    /// hosted a gadget produce no action.
    pub fn clean_up_destroyed_pane_item(&self, item: &PaneItemRef) {
        let Some(gadget) = item.gadget_id() else {
            tracing::trace!(item = %item.item_id(), "destroyed item hosts no gadget");
            return;
        };
        self.dispatch(Action::CleanUpDestroyedPaneItem {
            item: item.item_id(),
            gadget,
        });
    }

    /// Record the container's current measured scale as its expanded scale.
    pub fn update_expanded_flex_scale(&self, container: &ContainerHandle) {
        let Some(scale) = container.flex_scale() else {
            return;
        };
        // A pane collapsed to zero is a real state; only NaN and infinities are noise.
        if !scale.is_finite() {
            tracing::debug!(container = %container.id(), scale, "ignoring unusable flex scale");
            return;
        }
        self.dispatch(Action::UpdateExpandedFlexScale {
            container: container.downgrade(),
            scale,
        });
    }

    /// Whether `id` is registered once every queued intent is applied.
    fn will_be_registered(&self, id: &GadgetId) -> bool {
        if let Some(intent) = self.inner.queued.borrow().get(id) {
            return intent.registered;
        }
        self.inner.state.with(|s| s.is_registered(id))
    }

    fn queue_intent(&self, id: &GadgetId, registered: bool) {
        let mut queued = self.inner.queued.borrow_mut();
        let intent = queued.entry(id.clone()).or_insert(QueuedIntent {
            registered,
            outstanding: 0,
        });
        intent.registered = registered;
        intent.outstanding += 1;
    }

    /// Add a gadget to the registry. An id that is registered, or whose
    /// registration is still queued, is refused.
    pub fn register_gadget(&self, gadget: GadgetDescriptor) -> Result<(), GadgetsError> {
        if self.is_deactivated() {
            return Err(GadgetsError::Deactivated);
        }
        let id = gadget.id().clone();
        if self.will_be_registered(&id) {
            return Err(GadgetsError::DuplicateGadget(id));
        }
        self.queue_intent(&id, true);
        if !self.dispatch(Action::RegisterGadget(gadget)) {
            settle_intent(&self.inner.queued, &id);
            return Err(GadgetsError::Deactivated);
        }
        Ok(())
    }

    /// Remove a gadget. Returns whether it was registered.
    pub fn unregister_gadget(&self, id: &GadgetId) -> bool {
        if self.is_deactivated() || !self.will_be_registered(id) {
            return false;
        }
        self.queue_intent(id, false);
        if !self.dispatch(Action::UnregisterGadget(id.clone())) {
            settle_intent(&self.inner.queued, id);
            return false;
        }
        true
    }

    /// Ask the host to open `id` at its default location.
    pub fn show_gadget(&self, id: &GadgetId) -> Result<Option<PaneItemRef>, GadgetsError> {
        if self.is_deactivated() {
            return Err(GadgetsError::Deactivated);
        }
        let location = self
            .inner
            .state
            .with(|s| s.gadget(id).map(GadgetDescriptor::location))
            .ok_or_else(|| GadgetsError::UnknownGadget(id.clone()))?;
        let uri = self.inner.config.gadget_uri(id);
        Ok(self.inner.host.open(&uri, location))
    }

    /// Terminal. Releases every host command this facade registered.
    /// Idempotent.
    pub fn deactivate(&self) {
        if self.inner.deactivated.replace(true) {
            return;
        }
        let released = self.inner.ledger.release_all();
        self.inner.settle.borrow_mut().dispose();
        self.inner.queued.borrow_mut().clear();
        tracing::debug!(released, "command facade deactivated");
    }
}

fn settle_intent(queued: &QueuedIntents, id: &GadgetId) {
    let mut queued = queued.borrow_mut();
    let drained = match queued.get_mut(id) {
        Some(intent) => {
            intent.outstanding = intent.outstanding.saturating_sub(1);
            intent.outstanding == 0
        }
        None => false,
    };
    if drained {
        queued.remove(id);
    }
}
