#![forbid(unsafe_code)]

//! End-to-end effect tests against the fake host.
//!
//! Each test activates a fresh engine on a [`FakeHost`], drives host events
//! and virtual time, and checks what reached the host, the renderers and the
//! analytics sink.
//!
//! Run:
//!   cargo test -p gadgets-runtime --test orchestrator_effects

use std::rc::Rc;
use gadgets_runtime::host::Workspace;

use gadgets_harness::{
    CommandEvent, FakeContainer, FakeElement, FakeHost, FakeItem, PlainModel, RecordingAnalytics,
    RecordingRenderer, RenderEvent, gadget,
};
use gadgets_runtime::{
    Action, Activation, ElementModel, GadgetId, GadgetLocation, GadgetsConfig, ListenerPhase,
    PaneItemRef,
};

const RENDER: &str = "render-pane-items";
const CLEANUP: &str = "clean-up-destroyed-pane-item";
const FLEX: &str = "update-expanded-flex-scale";

struct Fixture {
    host: Rc<FakeHost>,
    analytics: Rc<RecordingAnalytics>,
    activation: Activation,
}

fn activate() -> Fixture {
    let host = FakeHost::new();
    let analytics = RecordingAnalytics::new();
    let activation = Activation::builder(host.clone())
        .analytics(analytics.clone())
        .activate()
        .unwrap();
    // Let the activation-time render window close.
    host.advance_ms(100);
    Fixture {
        host,
        analytics,
        activation,
    }
}

fn id(raw: &str) -> GadgetId {
    GadgetId::new(raw).unwrap()
}

// ============================================================================
// Render coalescing
// ============================================================================

#[test]
fn activation_renders_once_after_first_window() {
    let host = FakeHost::new();
    let activation = Activation::new(host.clone()).unwrap();
    assert_eq!(activation.telemetry().count(RENDER), 0);

    host.advance_ms(99);
    assert_eq!(activation.telemetry().count(RENDER), 0);
    host.advance_ms(1);
    assert_eq!(activation.telemetry().count(RENDER), 1);
}

#[test]
fn burst_in_one_window_renders_once_with_latest_state() {
    let fx = activate();
    let renderer = RecordingRenderer::new();
    let commands = fx.activation.commands().clone();
    let before = fx.activation.telemetry().count(RENDER);

    // t=0: item added
    fx.host.add_item(FakeItem::plain());
    // t=30: active item changed
    fx.host.advance_ms(30);
    fx.host.set_active(fx.host.items().first().cloned());
    // t=60: gadget set changed
    fx.host.advance_ms(30);
    commands.register_gadget(gadget("outline", &renderer)).unwrap();
    // t=90: a gadget item shows up
    fx.host.advance_ms(30);
    let late = FakeItem::hosting(&id("outline"));
    fx.host.add_item(late.clone());

    fx.host.advance_ms(9);
    assert_eq!(fx.activation.telemetry().count(RENDER), before);

    fx.host.advance_ms(1);
    assert_eq!(fx.activation.telemetry().count(RENDER), before + 1);
    assert_eq!(
        renderer.events(),
        vec![RenderEvent::Render {
            item: late.item_id(),
            gadget: id("outline"),
        }]
    );

    fx.host.advance_ms(500);
    assert_eq!(fx.activation.telemetry().count(RENDER), before + 1);
    let stats = fx.activation.render_throttle_stats();
    assert!(stats.coalesced >= 3, "{stats:?}");
}

#[test]
fn unregistered_gadget_is_unmounted_on_next_render() {
    let fx = activate();
    let renderer = RecordingRenderer::new();
    let commands = fx.activation.commands().clone();
    commands.register_gadget(gadget("outline", &renderer)).unwrap();
    let item = FakeItem::hosting(&id("outline"));
    fx.host.add_item(item.clone());
    fx.host.advance_ms(100);
    assert_eq!(fx.activation.mounted_items(), vec![item.item_id()]);

    renderer.clear();
    assert!(commands.unregister_gadget(&id("outline")));
    fx.host.advance_ms(100);
    assert_eq!(renderer.unmounted(), vec![item.item_id()]);
    assert!(fx.activation.mounted_items().is_empty());
}

// ============================================================================
// Destroy cleanup
// ============================================================================

#[test]
fn destroy_events_are_never_coalesced() {
    let fx = activate();
    let renderer = RecordingRenderer::new();
    fx.activation
        .commands()
        .register_gadget(gadget("outline", &renderer))
        .unwrap();

    let items: Vec<PaneItemRef> = (0..5).map(|_| FakeItem::hosting(&id("outline"))).collect();
    for item in &items {
        fx.host.add_item(item.clone());
    }
    fx.host.advance_ms(100);
    assert_eq!(fx.activation.mounted_items().len(), 5);

    for item in &items {
        assert!(fx.host.destroy_item(item.item_id()));
    }

    assert_eq!(fx.activation.telemetry().count(CLEANUP), 5);
    let expected: Vec<_> = items.iter().map(|item| item.item_id()).collect();
    assert_eq!(renderer.unmounted(), expected);
    assert!(fx.activation.mounted_items().is_empty());
}

#[test]
fn destroying_foreign_or_unrendered_items_is_harmless() {
    let fx = activate();
    let plain = FakeItem::plain();
    fx.host.add_item(plain.clone());
    assert!(fx.host.destroy_item(plain.item_id()));
    assert_eq!(fx.activation.telemetry().count(CLEANUP), 0);

    // Hosts a gadget nobody registered, so nothing was ever mounted.
    let orphan = FakeItem::hosting(&id("ghost"));
    fx.host.add_item(orphan.clone());
    assert!(fx.host.destroy_item(orphan.item_id()));
    assert_eq!(fx.activation.telemetry().count(CLEANUP), 1);
    assert!(fx.activation.mounted_items().is_empty());
}

// ============================================================================
// Command registry sync
// ============================================================================

#[test]
fn registry_diff_registers_and_unregisters_by_id() {
    let fx = activate();
    let renderer = RecordingRenderer::new();
    let commands = fx.activation.commands().clone();

    commands.register_gadget(gadget("a", &renderer)).unwrap();
    commands.register_gadget(gadget("b", &renderer)).unwrap();
    assert!(commands.unregister_gadget(&id("a")));

    let added = |name: &str| CommandEvent::Added {
        target: "atom-workspace".into(),
        name: name.into(),
    };
    let removed = |name: &str| CommandEvent::Removed {
        target: "atom-workspace".into(),
        name: name.into(),
    };
    assert_eq!(
        fx.host.command_log(),
        vec![
            added("gadgets:show-a"),
            added("gadgets:show-b"),
            removed("gadgets:show-a"),
        ]
    );
    assert_eq!(fx.host.command_names(), vec!["gadgets:show-b"]);
}

#[test]
fn initial_gadgets_get_commands_at_activation() {
    let host = FakeHost::new();
    let renderer = RecordingRenderer::new();
    let initial = gadgets_runtime::GadgetsState::with_gadgets([
        gadget("outline", &renderer),
        gadget("console", &renderer),
    ]);
    let _activation = Activation::builder(host.clone())
        .initial_state(initial)
        .activate()
        .unwrap();
    assert_eq!(
        host.command_names(),
        vec!["gadgets:show-console", "gadgets:show-outline"]
    );
}

#[test]
fn duplicate_registration_is_rejected() {
    let fx = activate();
    let renderer = RecordingRenderer::new();
    let commands = fx.activation.commands();
    commands.register_gadget(gadget("a", &renderer)).unwrap();
    let err = commands.register_gadget(gadget("a", &renderer)).unwrap_err();
    assert_eq!(err, gadgets_runtime::GadgetsError::DuplicateGadget(id("a")));
    assert_eq!(fx.host.command_names().len(), 1);
}

#[test]
fn registrations_queued_in_one_delivery_see_each_other() {
    use std::cell::{Cell, RefCell};

    let fx = activate();
    let first = RecordingRenderer::new();
    let second = RecordingRenderer::new();
    let results = Rc::new(RefCell::new(Vec::new()));

    let commands = fx.activation.commands().clone();
    let sink = Rc::clone(&results);
    let (r1, r2) = (first.clone(), second.clone());
    let done = Cell::new(false);
    let _during = fx.activation.actions().subscribe(move |action: &Action| {
        if !matches!(action, Action::RenderPaneItems) || done.replace(true) {
            return;
        }
        let mut out = sink.borrow_mut();
        out.push(commands.register_gadget(gadget("x", &r1)).is_ok());
        out.push(commands.register_gadget(gadget("x", &r2)).is_ok());
        out.push(commands.unregister_gadget(&id("x")));
        out.push(commands.unregister_gadget(&id("x")));
        out.push(commands.register_gadget(gadget("y", &r1)).is_ok());
        out.push(commands.register_gadget(gadget("y", &r2)).is_ok());
    });

    fx.activation.commands().render_pane_items();

    assert_eq!(*results.borrow(), vec![true, false, true, false, true, false]);
    let state = fx.activation.state();
    assert_eq!(state.gadget_ids(), vec![id("y")]);
    assert_eq!(state.gadget(&id("y")), Some(&gadget("y", &first)));

    // Settled: the snapshot alone decides from here on.
    let commands = fx.activation.commands();
    assert!(commands.register_gadget(gadget("x", &second)).is_ok());
    assert_eq!(
        commands.register_gadget(gadget("y", &second)),
        Err(gadgets_runtime::GadgetsError::DuplicateGadget(id("y")))
    );
    assert_eq!(fx.host.command_names().len(), 2);
}

#[test]
fn show_command_opens_gadget_at_its_location() {
    let fx = activate();
    let renderer = RecordingRenderer::new();
    fx.activation
        .commands()
        .register_gadget(gadget("outline", &renderer).with_location(GadgetLocation::Left))
        .unwrap();

    assert!(
        fx.host
            .dispatch_command("atom-workspace", "gadgets:show-outline")
    );
    assert_eq!(
        fx.host.opened(),
        vec![("atom://gadgets/outline".to_string(), GadgetLocation::Left)]
    );
    let opened = fx.host.items();
    assert_eq!(opened.len(), 1);
    assert_eq!(opened[0].gadget_id(), Some(id("outline")));

    fx.host.advance_ms(100);
    assert_eq!(renderer.render_count(), 1);
}

#[test]
fn custom_command_naming() {
    let host = FakeHost::new();
    let config = GadgetsConfig {
        command_target: "nuclide-workspace".into(),
        command_prefix: "panels:open-".into(),
        ..GadgetsConfig::default()
    };
    let activation = Activation::builder(host.clone())
        .config(config)
        .activate()
        .unwrap();
    let renderer = RecordingRenderer::new();
    activation
        .commands()
        .register_gadget(gadget("outline", &renderer))
        .unwrap();
    assert!(host.dispatch_command("nuclide-workspace", "panels:open-outline"));
    assert!(!host.dispatch_command("atom-workspace", "gadgets:show-outline"));
}

// ============================================================================
// Opener
// ============================================================================

#[test]
fn opener_claims_gadget_uris_only() {
    let fx = activate();
    let item = fx
        .activation
        .commands()
        .open_uri("atom://gadgets/outline")
        .unwrap();
    assert_eq!(item.gadget_id(), Some(id("outline")));
    assert_eq!(fx.analytics.kinds().last(), Some(&"open-uri"));

    let total = fx.activation.telemetry().total();
    assert!(fx.activation.commands().open_uri("file:///tmp/a.txt").is_none());
    assert!(fx.activation.commands().open_uri("atom://gadgets/a/b").is_none());
    assert_eq!(fx.activation.telemetry().total(), total);
}

#[test]
fn placeholder_renders_once_gadget_registers() {
    let fx = activate();
    let item = fx
        .host
        .open("atom://gadgets/outline", GadgetLocation::ActivePane)
        .unwrap();
    fx.host.advance_ms(100);
    assert!(fx.activation.mounted_items().is_empty());

    let renderer = RecordingRenderer::new();
    fx.activation
        .commands()
        .register_gadget(gadget("outline", &renderer))
        .unwrap();
    fx.host.advance_ms(100);
    assert_eq!(
        renderer.events(),
        vec![RenderEvent::Render {
            item: item.item_id(),
            gadget: id("outline"),
        }]
    );
}

// ============================================================================
// Resize tracking
// ============================================================================

fn model(container: &Rc<FakeContainer>) -> Option<Rc<dyn ElementModel>> {
    let model: Rc<dyn ElementModel> = container.clone();
    Some(model)
}

fn resize_row(
    left: Option<Rc<dyn ElementModel>>,
    right: Option<Rc<dyn ElementModel>>,
) -> Vec<Rc<FakeElement>> {
    let row = vec![
        FakeElement::new("atom-pane", left),
        FakeElement::new("atom-pane-resize-handle", None),
        FakeElement::new("atom-pane", right),
    ];
    FakeElement::row(&row);
    row
}

#[test]
fn resize_listener_uses_capture_phase() {
    let fx = activate();
    assert_eq!(fx.host.pointer_listener_phases(), vec![ListenerPhase::Capture]);

    // The handle stops propagation; the capture listener still sees it.
    let left = FakeContainer::resizable(0.25);
    let right = FakeContainer::resizable(0.75);
    let row = resize_row(model(&left), model(&right));
    fx.host.pointer_down(row[1].clone(), true);

    assert_eq!(fx.activation.telemetry().count(FLEX), 2);
    let state = fx.activation.state();
    assert_eq!(state.expanded_flex_scale(left.id()), Some(0.25));
    assert_eq!(state.expanded_flex_scale(right.id()), Some(0.75));
}

#[test]
fn non_handle_target_produces_no_flex_actions() {
    let fx = activate();
    let row = resize_row(
        model(&FakeContainer::resizable(0.5)),
        model(&FakeContainer::resizable(0.5)),
    );
    fx.host.pointer_down(row[0].clone(), false);
    fx.host.pointer_down(row[2].clone(), false);
    assert_eq!(fx.activation.telemetry().count(FLEX), 0);
}

#[test]
fn sibling_without_flex_scale_is_filtered() {
    let fx = activate();
    let left = FakeContainer::resizable(0.4);
    let row = resize_row(model(&left), model(&FakeContainer::fixed()));
    fx.host.pointer_down(row[1].clone(), true);

    assert_eq!(fx.activation.telemetry().count(FLEX), 1);
    assert_eq!(fx.activation.state().expanded_flex_scale(left.id()), Some(0.4));
}

#[test]
fn missing_or_plain_sibling_models_are_filtered() {
    let fx = activate();
    let plain: Rc<dyn ElementModel> = Rc::new(PlainModel);
    let row = resize_row(None, Some(plain));
    fx.host.pointer_down(row[1].clone(), true);

    let lone = FakeElement::new("atom-pane-resize-handle", None);
    fx.host.pointer_down(lone, true);
    assert_eq!(fx.activation.telemetry().count(FLEX), 0);
}

#[test]
fn rescaling_container_overwrites_expanded_scale() {
    use gadgets_runtime::FlexScaled;

    let fx = activate();
    let left = FakeContainer::resizable(0.3);
    let row = resize_row(model(&left), None);
    fx.host.pointer_down(row[1].clone(), true);
    left.set_flex_scale(0.6);
    fx.host.pointer_down(row[1].clone(), true);
    assert_eq!(fx.activation.state().expanded_flex_scale(left.id()), Some(0.6));
}

#[test]
fn collapsed_pane_records_zero_but_nan_is_ignored() {
    use gadgets_runtime::FlexScaled;

    let fx = activate();
    let left = FakeContainer::resizable(0.0);
    let right = FakeContainer::resizable(f64::NAN);
    let row = resize_row(model(&left), model(&right));
    fx.host.pointer_down(row[1].clone(), true);

    let state = fx.activation.state();
    assert_eq!(fx.activation.telemetry().count(FLEX), 1);
    assert_eq!(state.expanded_flex_scale(left.id()), Some(0.0));
    assert_eq!(state.expanded_flex_scale(right.id()), None);

    right.set_flex_scale(f64::INFINITY);
    fx.host.pointer_down(row[1].clone(), true);
    assert_eq!(fx.activation.telemetry().count(FLEX), 2);
}

#[test]
fn dropped_containers_leave_the_expanded_scales() {
    let fx = activate();
    for _ in 0..50 {
        let gone = FakeContainer::resizable(0.5);
        let row = resize_row(model(&gone), None);
        fx.host.pointer_down(row[1].clone(), true);
    }
    let kept = FakeContainer::resizable(0.5);
    let row = resize_row(model(&kept), None);
    fx.host.pointer_down(row[1].clone(), true);

    assert_eq!(fx.activation.telemetry().count(FLEX), 51);
    assert_eq!(fx.activation.state().expanded_containers(), vec![kept.id()]);
}

// ============================================================================
// Re-entrancy
// ============================================================================

#[test]
fn dispatch_from_subscriber_is_delivered_after_current_action() {
    let fx = activate();
    let commands = fx.activation.commands().clone();
    let _follow = fx.activation.actions().subscribe(move |action: &Action| {
        if matches!(action, Action::OpenUri { .. }) {
            commands.render_pane_items();
        }
    });
    let start = fx.analytics.kinds().len();

    fx.activation.commands().open_uri("atom://gadgets/outline");

    let kinds = fx.analytics.kinds();
    assert_eq!(&kinds[start..], &["open-uri", RENDER]);
}
