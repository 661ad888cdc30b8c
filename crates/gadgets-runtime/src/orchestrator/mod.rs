#![forbid(unsafe_code)]

//! Subscription orchestration.
//!
//! Turns independent host event sources into a fixed set of effects:
//!
//! | Source                                   | Effect                                   |
//! |------------------------------------------|------------------------------------------|
//! | pane item added, active item changed,    | one throttled `render_pane_items()` per  |
//! | gadget set changed                       | window                                   |
//! | pane item destroyed                      | `clean_up_destroyed_pane_item()`, 1:1    |
//! | gadget set changed                       | host command reconcile                   |
//! | pointer-down on a resize handle          | `update_expanded_flex_scale()` per side  |
//! | every action                             | render effect, telemetry                 |
//!
//! Every registration goes into the activation's [`DisposableGroup`], so a
//! single dispose releases all of them and cancels the pending render timer.

pub mod command_sync;
pub mod pane_renderer;
pub mod resize_tracker;
pub mod telemetry;
pub mod throttle;

use std::rc::Rc;

use web_time::Duration;

use crate::action::{Action, ActionChannel};
use crate::commands::Commands;
use crate::disposable::{Disposable, DisposableGroup};
use crate::host::{ListenerPhase, PaneItemRef, PointerEvent, TimerCallback};
use crate::reactive::StateStream;
use crate::state::{GadgetMap, GadgetsState};

pub use command_sync::{CommandLedger, ReconcileReport};
pub use pane_renderer::PaneRenderer;
pub use resize_tracker::ResizeFlexScaleTracker;
pub use telemetry::{ActionTelemetry, Analytics, NoopAnalytics};
pub use throttle::{ScheduleFn, Throttle, ThrottleStats};

/// Effects that outlive wiring and stay inspectable.
pub(crate) struct Effects {
    pub(crate) renderer: Rc<PaneRenderer>,
    pub(crate) telemetry: Rc<ActionTelemetry>,
    pub(crate) throttle: Throttle,
}

/// Register every effect. `state` must already be subscribed to `actions`.
pub(crate) fn wire(
    commands: &Commands,
    actions: &ActionChannel,
    state: &StateStream<GadgetsState>,
    analytics: Rc<dyn Analytics>,
    group: &mut DisposableGroup,
) -> Effects {
    let host = Rc::clone(commands.host());
    let config = commands.config().clone();

    // Raw action subscribers, after the state stream.
    let renderer = Rc::new(PaneRenderer::new(&host, state.clone()));
    let render_sink = Rc::clone(&renderer);
    group.add(actions.subscribe(move |action: &Action| render_sink.handle(action)));

    let telemetry = Rc::new(ActionTelemetry::new(analytics, config.telemetry.clone()));
    let telemetry_sink = Rc::clone(&telemetry);
    group.add(actions.subscribe(move |action: &Action| telemetry_sink.record(action)));

    // Opener.
    let weak = commands.downgrade();
    group.add(host.add_opener(Rc::new(move |uri: &str| {
        weak.upgrade().and_then(|commands| commands.open_uri(uri))
    })));

    // Render coalescing.
    let timer_host = Rc::downgrade(&host);
    let schedule: ScheduleFn = Rc::new(move |delay: Duration, callback: TimerCallback| {
        match timer_host.upgrade() {
            Some(host) => host.set_timeout(delay, callback),
            None => Disposable::empty(),
        }
    });
    let weak = commands.downgrade();
    let throttle = Throttle::new(config.render_throttle(), schedule, move || {
        if let Some(commands) = weak.upgrade() {
            commands.render_pane_items();
        }
    });
    group.add(throttle.disposable());

    let trigger = throttle.clone();
    group.add(host.observe_pane_items(Rc::new(move |_item: &PaneItemRef| trigger.trigger())));
    let trigger = throttle.clone();
    group.add(host.on_did_change_active_pane_item(Rc::new(
        move |_item: Option<&PaneItemRef>| trigger.trigger(),
    )));

    let gadgets = state.select(|s: &GadgetsState| s.gadgets().clone());
    let trigger = throttle.clone();
    group.add(gadgets.subscribe(move |_gadgets: &GadgetMap| trigger.trigger()));
    throttle.trigger();

    // Destroy cleanup, never throttled.
    let weak = commands.downgrade();
    group.add(host.on_did_destroy_pane_item(Rc::new(move |item: &PaneItemRef| {
        if let Some(commands) = weak.upgrade() {
            commands.clean_up_destroyed_pane_item(item);
        }
    })));

    // Host commands.
    group.add(command_sync::subscribe(&gadgets, commands));

    // Resize tracking.
    let tracker = ResizeFlexScaleTracker::new(config.resize_handle_tag.clone());
    let weak = commands.downgrade();
    group.add(host.add_pointer_down_listener(
        ListenerPhase::Capture,
        Rc::new(move |event: &PointerEvent| {
            let Some(commands) = weak.upgrade() else {
                return;
            };
            for container in tracker.containers(event) {
                commands.update_expanded_flex_scale(&container);
            }
        }),
    ));

    let mut gadgets = gadgets;
    group.add(Disposable::new(move || gadgets.detach()));

    let (actions, state) = (actions.clone(), state.clone());
    group.add(Disposable::new(move || {
        state.close();
        actions.close();
    }));

    tracing::debug!(target: "gadgets.effect", registrations = group.len(), "effects wired");

    Effects {
        renderer,
        telemetry,
        throttle,
    }
}
