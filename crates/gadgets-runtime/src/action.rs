#![forbid(unsafe_code)]

//! Intent events carried by the action channel.

use crate::host::{ContainerRef, PaneItemId};
use crate::reactive::EventChannel;
use crate::state::{GadgetDescriptor, GadgetId};

/// The engine's action bus.
pub type ActionChannel = EventChannel<Action>;

/// An immutable, self-describing intent.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum Action {
    /// A gadget URI was opened; `item` is the placeholder handed to the host.
    OpenUri {
        uri: String,
        gadget: GadgetId,
        item: PaneItemId,
    },
    /// Re-render every pane item that hosts a registered gadget.
    RenderPaneItems,
    /// A pane item hosting `gadget` was destroyed by the host.
    CleanUpDestroyedPaneItem { item: PaneItemId, gadget: GadgetId },
    /// The user started resizing `container`; remember its expanded scale.
    UpdateExpandedFlexScale { container: ContainerRef, scale: f64 },
    RegisterGadget(GadgetDescriptor),
    UnregisterGadget(GadgetId),
}

impl Action {
    /// Stable name of the variant, used for telemetry and tracing.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::OpenUri { .. } => "open-uri",
            Self::RenderPaneItems => "render-pane-items",
            Self::CleanUpDestroyedPaneItem { .. } => "clean-up-destroyed-pane-item",
            Self::UpdateExpandedFlexScale { .. } => "update-expanded-flex-scale",
            Self::RegisterGadget(_) => "register-gadget",
            Self::UnregisterGadget(_) => "unregister-gadget",
        }
    }
}
