#![forbid(unsafe_code)]

//! Keep one host command per registered gadget.
//!
//! # How it works
//!
//! 1. The distinct gadget-set slice emits a new map.
//! 2. [`CommandLedger::reconcile`] compares its ids with the ids currently
//!    holding a command registration.
//! 3. Removed ids are released, new ids are registered, and ids present in
//!    both are left untouched.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::commands::Commands;
use crate::disposable::Disposable;
use crate::reactive::Slice;
use crate::state::{GadgetId, GadgetMap};

/// Outcome of one [`CommandLedger::reconcile`] pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub started: Vec<GadgetId>,
    pub stopped: Vec<GadgetId>,
}

impl ReconcileReport {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.started.is_empty() && self.stopped.is_empty()
    }
}

/// Host command registrations keyed by gadget id.
///
/// Shared between the sync effect, which fills it, and the command facade,
/// which empties it on deactivation.
#[derive(Clone, Default)]
pub struct CommandLedger {
    registered: Rc<RefCell<BTreeMap<GadgetId, Disposable>>>,
}

impl CommandLedger {
    /// Bring the ledger in line with `gadgets`, calling `register` for each
    /// id that has no command yet.
    pub fn reconcile(
        &self,
        gadgets: &GadgetMap,
        mut register: impl FnMut(&GadgetId) -> Disposable,
    ) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        // Stop commands whose gadget is gone.
        let removed: Vec<(GadgetId, Disposable)> = {
            let mut registered = self.registered.borrow_mut();
            let gone: Vec<GadgetId> = registered
                .keys()
                .filter(|id| !gadgets.contains_key(*id))
                .cloned()
                .collect();
            gone.into_iter()
                .filter_map(|id| registered.remove(&id).map(|handle| (id, handle)))
                .collect()
        };
        for (id, mut handle) in removed {
            tracing::debug!(target: "gadgets.effect", gadget = %id, "unregistering gadget command");
            handle.dispose();
            report.stopped.push(id);
        }

        // Start commands for new gadgets.
        for id in gadgets.keys() {
            if self.registered.borrow().contains_key(id) {
                continue;
            }
            tracing::debug!(target: "gadgets.effect", gadget = %id, "registering gadget command");
            let handle = register(id);
            self.registered.borrow_mut().insert(id.clone(), handle);
            report.started.push(id.clone());
        }

        report
    }

    /// Release every registration. Returns how many were held.
    pub fn release_all(&self) -> usize {
        let drained = std::mem::take(&mut *self.registered.borrow_mut());
        let count = drained.len();
        for (_, mut handle) in drained {
            handle.dispose();
        }
        count
    }

    #[must_use]
    pub fn ids(&self) -> Vec<GadgetId> {
        self.registered.borrow().keys().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.registered.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registered.borrow().is_empty()
    }
}

/// Register the host command for `id`. Its handler opens the gadget.
fn register_command(commands: &Commands, id: &GadgetId) -> Disposable {
    let config = commands.config();
    let name = config.command_name(id);
    let weak = commands.downgrade();
    let gadget = id.clone();
    commands.host().add_command(
        &config.command_target,
        &name,
        Rc::new(move || {
            let Some(commands) = weak.upgrade() else {
                return;
            };
            if let Err(err) = commands.show_gadget(&gadget) {
                tracing::warn!(target: "gadgets.effect", gadget = %gadget, error = %err, "gadget command failed");
            }
        }),
    )
}

/// Sync host commands with the gadget set now and on every distinct change.
pub fn subscribe(gadgets: &Slice<GadgetMap>, commands: &Commands) -> Disposable {
    let sync = move |commands: &Commands, map: &GadgetMap| {
        if commands.is_deactivated() {
            return;
        }
        let report = commands
            .ledger()
            .reconcile(map, |id| register_command(commands, id));
        if !report.is_empty() {
            tracing::debug!(
                target: "gadgets.effect",
                started = report.started.len(),
                stopped = report.stopped.len(),
                "gadget commands reconciled"
            );
        }
    };

    sync(commands, &gadgets.get());
    let weak = commands.downgrade();
    gadgets.subscribe(move |map| {
        if let Some(commands) = weak.upgrade() {
            sync(&commands, map);
        }
    })
}
