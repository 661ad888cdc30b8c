#![forbid(unsafe_code)]

//! Host workspace API consumed by the engine.
//!
//! The engine never reaches for a global workspace or document. Everything it
//! needs from the editor is injected as an `Rc<dyn Host>`, which lets tests
//! substitute a deterministic double (see the `gadgets-harness` crate).
//!
//! Every registration returns a [`Disposable`]; releasing it must detach the
//! listener, command or timer on the host side.
//!
//! Container models are discovered through capability queries on
//! [`ElementModel`] rather than by concrete type: a model is treated as a
//! resizable pane item container only when it answers both
//! [`ElementModel::as_item_container`] and [`ElementModel::as_flex_scaled`].

use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use web_time::Duration;

use crate::disposable::Disposable;
use crate::state::{GadgetId, GadgetLocation};

static NEXT_PANE_ITEM_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_CONTAINER_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of a pane item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PaneItemId(u64);

impl PaneItemId {
    /// Allocate a fresh id.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_PANE_ITEM_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PaneItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "item#{}", self.0)
    }
}

/// Process-unique identifier of a pane item container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContainerId(u64);

impl ContainerId {
    /// Allocate a fresh id.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_CONTAINER_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "container#{}", self.0)
    }
}

/// A displayable unit living in a host pane.
pub trait PaneItem {
    fn item_id(&self) -> PaneItemId;

    /// The gadget this item hosts, if any.
    fn gadget_id(&self) -> Option<GadgetId> {
        None
    }
}

pub type PaneItemRef = Rc<dyn PaneItem>;

/// Returns an item for URIs it understands, `None` to let other openers try.
pub type Opener = Rc<dyn Fn(&str) -> Option<PaneItemRef>>;
pub type PaneItemListener = Rc<dyn Fn(&PaneItemRef)>;
pub type ActivePaneItemListener = Rc<dyn Fn(Option<&PaneItemRef>)>;
pub type CommandHandler = Rc<dyn Fn()>;
pub type PointerListener = Rc<dyn Fn(&PointerEvent)>;
pub type TimerCallback = Box<dyn FnOnce()>;

/// Pane item storage and lifecycle notifications.
pub trait Workspace {
    fn add_opener(&self, opener: Opener) -> Disposable;

    /// Called for every existing item immediately, then for each added item.
    fn observe_pane_items(&self, listener: PaneItemListener) -> Disposable;

    fn on_did_change_active_pane_item(&self, listener: ActivePaneItemListener) -> Disposable;

    fn on_did_destroy_pane_item(&self, listener: PaneItemListener) -> Disposable;

    /// Snapshot of every item currently in a pane.
    fn pane_items(&self) -> Vec<PaneItemRef>;

    /// Open `uri` through the registered openers.
    fn open(&self, uri: &str, location: GadgetLocation) -> Option<PaneItemRef>;
}

/// Named command registration.
pub trait CommandRegistry {
    fn add_command(&self, target: &str, name: &str, handler: CommandHandler) -> Disposable;
}

/// DOM event delivery phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerPhase {
    /// Ancestors first; sees events that descendants stop from bubbling.
    Capture,
    Bubble,
}

/// Pointer-down delivered at the document root.
#[derive(Clone)]
pub struct PointerEvent {
    pub target: Rc<dyn Element>,
}

impl fmt::Debug for PointerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PointerEvent")
            .field("target", &self.target.tag_name())
            .finish()
    }
}

/// Document-root event observation.
pub trait Document {
    fn add_pointer_down_listener(
        &self,
        phase: ListenerPhase,
        listener: PointerListener,
    ) -> Disposable;
}

/// Host timer scheduling. Disposing the handle cancels a pending timer.
pub trait Scheduler {
    fn set_timeout(&self, delay: Duration, callback: TimerCallback) -> Disposable;
}

/// Everything the engine consumes from the host.
pub trait Host: Workspace + CommandRegistry + Document + Scheduler {}

impl<H: Workspace + CommandRegistry + Document + Scheduler + ?Sized> Host for H {}

/// A DOM element as seen by the resize tracker.
pub trait Element {
    fn tag_name(&self) -> String;
    fn previous_element_sibling(&self) -> Option<Rc<dyn Element>>;
    fn next_element_sibling(&self) -> Option<Rc<dyn Element>>;

    /// The model object the host attached to this element, if any.
    fn model(&self) -> Option<Rc<dyn ElementModel>>;
}

/// Capability surface of a model attached to a DOM element.
pub trait ElementModel {
    fn as_item_container(&self) -> Option<&dyn ItemContainer> {
        None
    }

    fn as_flex_scaled(&self) -> Option<&dyn FlexScaled> {
        None
    }
}

/// Item enumeration capability.
pub trait ItemContainer {
    fn container_id(&self) -> ContainerId;
    fn items(&self) -> Vec<PaneItemRef>;
}

/// Flex-scale accessor capability.
pub trait FlexScaled {
    fn flex_scale(&self) -> f64;
    fn set_flex_scale(&self, scale: f64);
}

/// A model proven to expose both container capabilities.
#[derive(Clone)]
pub struct ContainerHandle {
    id: ContainerId,
    model: Rc<dyn ElementModel>,
}

impl ContainerHandle {
    /// Accept `model` only if it enumerates items and exposes a flex scale.
    #[must_use]
    pub fn resolve(model: Rc<dyn ElementModel>) -> Option<Self> {
        let id = model.as_item_container()?.container_id();
        model.as_flex_scaled()?;
        Some(Self { id, model })
    }

    #[must_use]
    pub fn id(&self) -> ContainerId {
        self.id
    }

    #[must_use]
    pub fn items(&self) -> Vec<PaneItemRef> {
        self.model
            .as_item_container()
            .map(|container| container.items())
            .unwrap_or_default()
    }

    /// Current measured scale, `None` if the capability went away.
    #[must_use]
    pub fn flex_scale(&self) -> Option<f64> {
        self.model.as_flex_scaled().map(|scaled| scaled.flex_scale())
    }

    /// Weak reference suitable for carrying inside an action.
    #[must_use]
    pub fn downgrade(&self) -> ContainerRef {
        ContainerRef {
            id: self.id,
            model: Rc::downgrade(&self.model),
        }
    }
}

impl fmt::Debug for ContainerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ContainerHandle").field(&self.id).finish()
    }
}

/// Weak reference to a pane item container; compares by id.
#[derive(Clone)]
pub struct ContainerRef {
    id: ContainerId,
    model: Weak<dyn ElementModel>,
}

impl ContainerRef {
    #[must_use]
    pub fn id(&self) -> ContainerId {
        self.id
    }

    /// The live container, if the host still holds it.
    #[must_use]
    pub fn upgrade(&self) -> Option<ContainerHandle> {
        self.model.upgrade().and_then(ContainerHandle::resolve)
    }

    /// Whether the host still holds the container's model.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.model.strong_count() > 0
    }
}

impl PartialEq for ContainerRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl fmt::Debug for ContainerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerRef")
            .field("id", &self.id)
            .field("live", &(self.model.strong_count() > 0))
            .finish()
    }
}
