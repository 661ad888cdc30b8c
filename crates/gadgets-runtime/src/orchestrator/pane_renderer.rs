#![forbid(unsafe_code)]

//! Render effect: keeps gadget content mounted in the host's pane items.
//!
//! Subscribed to the action channel after the state stream, so
//! `state.current()` already reflects the action being handled.
//!
//! The renderer remembers which descriptor mounted each item. That record,
//! not the current registry, decides what to unmount: an item whose gadget
//! was unregistered is still torn down by the renderer that mounted it.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use crate::action::Action;
use crate::host::{Host, PaneItemId, PaneItemRef};
use crate::reactive::StateStream;
use crate::state::{GadgetDescriptor, GadgetsState};

enum Step {
    Render(PaneItemRef, GadgetDescriptor),
    Unmount(PaneItemId, GadgetDescriptor),
}

pub struct PaneRenderer {
    host: Weak<dyn Host>,
    state: StateStream<GadgetsState>,
    mounted: RefCell<BTreeMap<PaneItemId, GadgetDescriptor>>,
}

impl PaneRenderer {
    pub fn new(host: &Rc<dyn Host>, state: StateStream<GadgetsState>) -> Self {
        Self {
            host: Rc::downgrade(host),
            state,
            mounted: RefCell::new(BTreeMap::new()),
        }
    }

    pub fn handle(&self, action: &Action) {
        match action {
            Action::RenderPaneItems => self.render_all(),
            Action::CleanUpDestroyedPaneItem { item, .. } => self.unmount(*item),
            _ => {}
        }
    }

    /// Render every gadget pane item against the current registry.
    pub fn render_all(&self) {
        let Some(host) = self.host.upgrade() else {
            return;
        };
        let items = host.pane_items();
        let state = self.state.current();

        let plan: Vec<Step> = {
            let mounted = self.mounted.borrow();
            let mut plan = Vec::new();
            for item in items {
                let Some(gadget) = item.gadget_id() else {
                    continue;
                };
                let id = item.item_id();
                let previous = mounted.get(&id);
                match state.gadget(&gadget) {
                    Some(descriptor) => {
                        if let Some(previous) = previous
                            && !Rc::ptr_eq(previous.renderer(), descriptor.renderer())
                        {
                            plan.push(Step::Unmount(id, previous.clone()));
                        }
                        plan.push(Step::Render(item, descriptor.clone()));
                    }
                    None => {
                        if let Some(previous) = previous {
                            plan.push(Step::Unmount(id, previous.clone()));
                        }
                    }
                }
            }
            plan
        };

        let mut rendered = 0usize;
        for step in plan {
            match step {
                Step::Render(item, descriptor) => {
                    self.mounted
                        .borrow_mut()
                        .insert(item.item_id(), descriptor.clone());
                    descriptor.renderer().render(&item, &descriptor);
                    rendered += 1;
                }
                Step::Unmount(id, descriptor) => {
                    self.mounted.borrow_mut().remove(&id);
                    descriptor.renderer().unmount(id);
                }
            }
        }
        tracing::debug!(target: "gadgets.effect", rendered, "pane items rendered");
    }

    /// Tear down `item` if this effect mounted it.
    pub fn unmount(&self, item: PaneItemId) {
        let Some(descriptor) = self.mounted.borrow_mut().remove(&item) else {
            tracing::trace!(target: "gadgets.effect", %item, "destroyed item was never rendered");
            return;
        };
        tracing::debug!(target: "gadgets.effect", %item, gadget = %descriptor.id(), "unmounting gadget");
        descriptor.renderer().unmount(item);
    }

    /// Items currently holding gadget content.
    #[must_use]
    pub fn mounted_items(&self) -> Vec<PaneItemId> {
        self.mounted.borrow().keys().copied().collect()
    }
}
