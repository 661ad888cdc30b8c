#![forbid(unsafe_code)]

//! Service object handed to other extensions.
//!
//! Every mutation goes through the command facade, and from there through
//! the action channel and the reducer; the service holds no state of its
//! own.

use crate::commands::{Commands, WeakCommands};
use crate::disposable::Disposable;
use crate::error::GadgetsError;
use crate::host::PaneItemRef;
use crate::state::{GadgetDescriptor, GadgetId};

#[derive(Clone)]
pub struct GadgetsService {
    commands: WeakCommands,
}

impl std::fmt::Debug for GadgetsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GadgetsService")
            .field("live", &self.live().is_some())
            .finish()
    }
}

impl GadgetsService {
    pub(crate) fn new(commands: &Commands) -> Self {
        Self {
            commands: commands.downgrade(),
        }
    }

    fn live(&self) -> Option<Commands> {
        self.commands
            .upgrade()
            .filter(|commands| !commands.is_deactivated())
    }

    fn commands(&self) -> Result<Commands, GadgetsError> {
        self.live().ok_or(GadgetsError::Deactivated)
    }

    /// Register `gadget`. Disposing the returned handle unregisters it.
    pub fn register_gadget(&self, gadget: GadgetDescriptor) -> Result<Disposable, GadgetsError> {
        let commands = self.commands()?;
        let id = gadget.id().clone();
        commands.register_gadget(gadget)?;
        let weak = commands.downgrade();
        Ok(Disposable::new(move || {
            if let Some(commands) = weak.upgrade() {
                commands.unregister_gadget(&id);
            }
        }))
    }

    /// Returns whether the gadget was registered.
    pub fn unregister_gadget(&self, id: &GadgetId) -> bool {
        self.live()
            .is_some_and(|commands| commands.unregister_gadget(id))
    }

    pub fn show_gadget(&self, id: &GadgetId) -> Result<Option<PaneItemRef>, GadgetsError> {
        self.commands()?.show_gadget(id)
    }

    #[must_use]
    pub fn gadget_ids(&self) -> Vec<GadgetId> {
        self.live()
            .map(|commands| commands.state().gadget_ids())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn descriptor(&self, id: &GadgetId) -> Option<GadgetDescriptor> {
        self.live()
            .and_then(|commands| commands.state().gadget(id).cloned())
    }

    #[must_use]
    pub fn is_registered(&self, id: &GadgetId) -> bool {
        self.live()
            .is_some_and(|commands| commands.state().is_registered(id))
    }
}
