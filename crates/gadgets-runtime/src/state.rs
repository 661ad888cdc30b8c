#![forbid(unsafe_code)]

//! Gadget descriptors, the state snapshot, and the reducer.
//!
//! [`GadgetsState`] is an immutable snapshot backed by persistent maps
//! (`im::OrdMap`), so producing the next snapshot shares structure with the
//! previous one instead of copying it. A snapshot is only ever produced by
//! [`reduce`]; nothing mutates one in place.

use std::fmt;
use std::rc::Rc;

use im::OrdMap;

use crate::action::Action;
use crate::error::GadgetsError;
use crate::host::{ContainerId, ContainerRef, PaneItemId, PaneItemRef};

/// Validated gadget identifier.
///
/// Non-empty, free of whitespace and `/` so it can be embedded in URIs and
/// command names verbatim.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GadgetId(Rc<str>);

impl GadgetId {
    pub fn new(id: impl AsRef<str>) -> Result<Self, GadgetsError> {
        let id = id.as_ref();
        if id.is_empty() || id.chars().any(|c| c.is_whitespace() || c == '/') {
            return Err(GadgetsError::InvalidGadgetId(id.to_string()));
        }
        Ok(Self(Rc::from(id)))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GadgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a gadget opens by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GadgetLocation {
    #[default]
    ActivePane,
    Left,
    Right,
    Bottom,
}

/// Panel content factory for one gadget. Implemented outside this crate.
pub trait GadgetRenderer {
    /// Render the gadget's content into `item`. Called again on every
    /// re-render; implementations should update in place.
    fn render(&self, item: &PaneItemRef, gadget: &GadgetDescriptor);

    /// Tear down whatever `render` mounted into `item`.
    fn unmount(&self, item: PaneItemId);
}

/// A registered gadget.
///
/// Equality is structural on id, title and location, and by identity on the
/// renderer.
#[derive(Clone)]
pub struct GadgetDescriptor {
    id: GadgetId,
    title: String,
    location: GadgetLocation,
    renderer: Rc<dyn GadgetRenderer>,
}

impl GadgetDescriptor {
    pub fn new(id: GadgetId, title: impl Into<String>, renderer: Rc<dyn GadgetRenderer>) -> Self {
        Self {
            id,
            title: title.into(),
            location: GadgetLocation::default(),
            renderer,
        }
    }

    #[must_use]
    pub fn with_location(mut self, location: GadgetLocation) -> Self {
        self.location = location;
        self
    }

    #[must_use]
    pub fn id(&self) -> &GadgetId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn location(&self) -> GadgetLocation {
        self.location
    }

    #[must_use]
    pub fn renderer(&self) -> &Rc<dyn GadgetRenderer> {
        &self.renderer
    }
}

impl PartialEq for GadgetDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.title == other.title
            && self.location == other.location
            && Rc::ptr_eq(&self.renderer, &other.renderer)
    }
}

impl fmt::Debug for GadgetDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GadgetDescriptor")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

pub type GadgetMap = OrdMap<GadgetId, GadgetDescriptor>;

/// Expanded scale remembered for a container the host may since have dropped.
#[derive(Clone, Debug, PartialEq)]
struct ExpandedScale {
    container: ContainerRef,
    scale: f64,
}

/// Immutable engine state.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GadgetsState {
    gadgets: GadgetMap,
    flex_scales: OrdMap<ContainerId, ExpandedScale>,
}

impl GadgetsState {
    /// Snapshot the engine starts from when nothing else is supplied.
    #[must_use]
    pub fn initial() -> Self {
        Self::default()
    }

    /// Initial snapshot with `gadgets` already registered.
    #[must_use]
    pub fn with_gadgets(gadgets: impl IntoIterator<Item = GadgetDescriptor>) -> Self {
        Self {
            gadgets: gadgets
                .into_iter()
                .map(|gadget| (gadget.id().clone(), gadget))
                .collect(),
            flex_scales: OrdMap::new(),
        }
    }

    #[must_use]
    pub fn gadgets(&self) -> &GadgetMap {
        &self.gadgets
    }

    #[must_use]
    pub fn gadget(&self, id: &GadgetId) -> Option<&GadgetDescriptor> {
        self.gadgets.get(id)
    }

    #[must_use]
    pub fn is_registered(&self, id: &GadgetId) -> bool {
        self.gadgets.contains_key(id)
    }

    #[must_use]
    pub fn gadget_ids(&self) -> Vec<GadgetId> {
        self.gadgets.keys().cloned().collect()
    }

    /// Scale the container had when the user last started resizing it.
    #[must_use]
    pub fn expanded_flex_scale(&self, container: ContainerId) -> Option<f64> {
        self.flex_scales.get(&container).map(|entry| entry.scale)
    }

    /// Containers with a remembered expanded scale, in id order.
    #[must_use]
    pub fn expanded_containers(&self) -> Vec<ContainerId> {
        self.flex_scales.keys().copied().collect()
    }
}

/// Apply one action to a snapshot.
///
/// Pure and total: intents whose effects live outside the snapshot (opening,
/// rendering, cleanup) return the previous state unchanged.
#[must_use]
pub fn reduce(state: &GadgetsState, action: &Action) -> GadgetsState {
    match action {
        // First registration wins; a second descriptor for a taken id is
        // refused rather than swapped in.
        Action::RegisterGadget(gadget) => {
            if state.gadgets.contains_key(gadget.id()) {
                return state.clone();
            }
            GadgetsState {
                gadgets: state.gadgets.update(gadget.id().clone(), gadget.clone()),
                ..state.clone()
            }
        }
        Action::UnregisterGadget(id) => {
            if !state.gadgets.contains_key(id) {
                return state.clone();
            }
            GadgetsState {
                gadgets: state.gadgets.without(id),
                ..state.clone()
            }
        }
        // Entries for containers the host has dropped are pruned here, so
        // the map tracks live panes only.
        Action::UpdateExpandedFlexScale { container, scale } => {
            let mut flex_scales = state.flex_scales.clone();
            for (id, entry) in &state.flex_scales {
                if !entry.container.is_live() {
                    flex_scales.remove(id);
                }
            }
            flex_scales.insert(
                container.id(),
                ExpandedScale {
                    container: container.clone(),
                    scale: *scale,
                },
            );
            GadgetsState {
                flex_scales,
                ..state.clone()
            }
        }
        _ => state.clone(),
    }
}
