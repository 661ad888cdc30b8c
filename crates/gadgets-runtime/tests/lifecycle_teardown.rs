#![forbid(unsafe_code)]

//! Lifecycle and teardown guarantees.
//!
//! 1. Deactivation releases every host registration and pending timer.
//! 2. No effect fires after `deactivate()` returns.
//! 3. A second `deactivate()` changes nothing.
//! 4. Dropping an activation deactivates it.
//! 5. An invalid config never touches the host.
//!
//! Run:
//!   cargo test -p gadgets-runtime --test lifecycle_teardown

use std::rc::Rc;

use gadgets_harness::{
    FakeContainer, FakeElement, FakeHost, FakeItem, RecordingAnalytics, RecordingRenderer, gadget,
};
use gadgets_runtime::{
    Action, Activation, ElementModel, GadgetId, GadgetsConfig, GadgetsError, LifecycleState,
};

fn activate(host: &Rc<FakeHost>, analytics: &Rc<RecordingAnalytics>) -> Activation {
    Activation::builder(host.clone())
        .analytics(analytics.clone())
        .activate()
        .unwrap()
}

#[test]
fn lifecycle_transitions() {
    let host = FakeHost::new();
    let builder = Activation::builder(host.clone());
    assert_eq!(builder.lifecycle(), LifecycleState::Uninitialized);
    assert_eq!(host.registration_count(), 0);

    let mut activation = builder.activate().unwrap();
    assert_eq!(activation.lifecycle(), LifecycleState::Active);
    assert!(activation.is_active());

    activation.deactivate();
    assert_eq!(activation.lifecycle(), LifecycleState::Deactivated);
    assert!(activation.commands().is_deactivated());
}

#[test]
fn deactivate_releases_every_registration() {
    let host = FakeHost::new();
    let analytics = RecordingAnalytics::new();
    let mut activation = activate(&host, &analytics);
    let renderer = RecordingRenderer::new();
    activation
        .commands()
        .register_gadget(gadget("outline", &renderer))
        .unwrap();
    activation
        .commands()
        .register_gadget(gadget("console", &renderer))
        .unwrap();
    assert!(host.registration_count() > 0);

    activation.deactivate();
    assert_eq!(host.registration_count(), 0);
    assert!(host.command_names().is_empty());
}

#[test]
fn no_effects_after_deactivate() {
    let host = FakeHost::new();
    let analytics = RecordingAnalytics::new();
    let mut activation = activate(&host, &analytics);
    let renderer = RecordingRenderer::new();
    let commands = activation.commands().clone();
    commands.register_gadget(gadget("outline", &renderer)).unwrap();
    let item = FakeItem::hosting(&GadgetId::new("outline").unwrap());
    host.add_item(item.clone());
    host.advance_ms(100);

    let actions = activation.actions().clone();
    let service = activation.provide_gadgets_service();
    activation.deactivate();

    let tracked = analytics.tracked().len();
    let total = activation.telemetry().total();
    let log = host.command_log();
    renderer.clear();

    // Retained channel: closed.
    assert!(actions.dispatch(Action::RenderPaneItems).is_err());
    // Retained facade: inert.
    commands.render_pane_items();
    assert!(commands.open_uri("atom://gadgets/outline").is_none());
    assert_eq!(
        commands.register_gadget(gadget("late", &renderer)),
        Err(GadgetsError::Deactivated)
    );
    // Retained service: refuses.
    assert!(matches!(
        service.register_gadget(gadget("late", &renderer)),
        Err(GadgetsError::Deactivated)
    ));
    // Host keeps firing; nobody listens.
    host.add_item(FakeItem::plain());
    host.destroy_item(item.item_id());
    let row = vec![
        FakeElement::new("atom-pane", {
            let model: Rc<dyn ElementModel> = FakeContainer::resizable(0.5);
            Some(model)
        }),
        FakeElement::new("atom-pane-resize-handle", None),
    ];
    FakeElement::row(&row);
    host.pointer_down(row[1].clone(), true);
    assert!(!host.dispatch_command("atom-workspace", "gadgets:show-outline"));
    host.advance_ms(1_000);

    assert!(renderer.events().is_empty());
    assert_eq!(analytics.tracked().len(), tracked);
    assert_eq!(activation.telemetry().total(), total);
    assert_eq!(host.command_log(), log);
}

#[test]
fn pending_render_timer_is_cancelled() {
    let host = FakeHost::new();
    let analytics = RecordingAnalytics::new();
    let mut activation = activate(&host, &analytics);
    host.advance_ms(100);

    host.add_item(FakeItem::plain());
    assert_eq!(host.clock().pending(), 1);
    let fired = host.clock().fired();
    let renders = activation.telemetry().count("render-pane-items");

    activation.deactivate();
    assert_eq!(host.clock().pending(), 0);
    assert_eq!(host.clock().cancelled(), 1);

    host.advance_ms(1_000);
    assert_eq!(host.clock().fired(), fired);
    assert_eq!(activation.telemetry().count("render-pane-items"), renders);
}

#[test]
fn double_deactivate_is_a_no_op() {
    let host = FakeHost::new();
    let analytics = RecordingAnalytics::new();
    let mut activation = activate(&host, &analytics);
    let renderer = RecordingRenderer::new();
    activation
        .commands()
        .register_gadget(gadget("outline", &renderer))
        .unwrap();

    activation.deactivate();
    let log = host.command_log();
    let cancelled = host.clock().cancelled();

    activation.deactivate();
    activation.commands().deactivate();
    assert_eq!(host.command_log(), log);
    assert_eq!(host.clock().cancelled(), cancelled);
    assert_eq!(activation.lifecycle(), LifecycleState::Deactivated);

    let removals = log
        .iter()
        .filter(|event| matches!(event, gadgets_harness::CommandEvent::Removed { .. }))
        .count();
    assert_eq!(removals, 1);
}

#[test]
fn drop_deactivates() {
    let host = FakeHost::new();
    {
        let activation = Activation::new(host.clone()).unwrap();
        let renderer = RecordingRenderer::new();
        activation
            .commands()
            .register_gadget(gadget("outline", &renderer))
            .unwrap();
        assert!(host.registration_count() > 0);
    }
    assert_eq!(host.registration_count(), 0);
}

#[test]
fn invalid_config_is_refused_before_wiring() {
    let host = FakeHost::new();
    let config = GadgetsConfig {
        render_throttle_ms: 0,
        ..GadgetsConfig::default()
    };
    let err = Activation::builder(host.clone())
        .config(config)
        .activate()
        .unwrap_err();
    assert!(matches!(err, GadgetsError::InvalidConfig(ref problems) if problems.len() == 1));
    assert_eq!(host.registration_count(), 0);
}

#[test]
fn reactivation_needs_a_fresh_instance() {
    let host = FakeHost::new();
    let mut first = Activation::new(host.clone()).unwrap();
    first.deactivate();

    let second = Activation::new(host.clone()).unwrap();
    let renderer = RecordingRenderer::new();
    second
        .commands()
        .register_gadget(gadget("outline", &renderer))
        .unwrap();
    assert!(host.dispatch_command("atom-workspace", "gadgets:show-outline"));
    assert!(first.commands().is_deactivated());
}

#[test]
fn service_routes_through_facade() {
    let host = FakeHost::new();
    let analytics = RecordingAnalytics::new();
    let activation = activate(&host, &analytics);
    let service = activation.provide_gadgets_service();
    let renderer = RecordingRenderer::new();
    let outline = GadgetId::new("outline").unwrap();

    let mut registration = service.register_gadget(gadget("outline", &renderer)).unwrap();
    assert!(service.is_registered(&outline));
    assert_eq!(service.gadget_ids(), vec![outline.clone()]);
    assert_eq!(
        service.descriptor(&outline).map(|d| d.title().to_string()),
        Some("OUTLINE".to_string())
    );
    assert_eq!(analytics.kinds().last(), Some(&"register-gadget"));
    assert_eq!(activation.state().gadget_ids(), vec![outline.clone()]);

    assert!(service.show_gadget(&outline).unwrap().is_some());

    registration.dispose();
    assert!(!service.is_registered(&outline));
    assert_eq!(analytics.kinds().last(), Some(&"unregister-gadget"));
    assert!(!service.unregister_gadget(&outline));
    assert_eq!(
        service.show_gadget(&outline).err().unwrap(),
        GadgetsError::UnknownGadget(outline)
    );
}
