#![forbid(unsafe_code)]

//! Activation lifecycle.
//!
//! ```text
//! Uninitialized --activate()--> Active --deactivate()--> Deactivated
//! ```
//!
//! `Deactivated` is terminal. A deactivated [`Activation`] cannot be revived;
//! build a new one instead.
//!
//! Deactivation releases host commands through the facade first, then
//! disposes the subscription group. Every listener is gone and the pending
//! render timer is cancelled before `deactivate` returns.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut activation = Activation::builder(host)
//!     .config(GadgetsConfig::default())
//!     .analytics(Rc::new(MyAnalytics))
//!     .activate()?;
//!
//! let service = activation.provide_gadgets_service();
//! let _registration = service.register_gadget(outline)?;
//!
//! activation.deactivate();
//! ```

use std::fmt;
use std::rc::Rc;

use crate::action::ActionChannel;
use crate::commands::Commands;
use crate::config::GadgetsConfig;
use crate::disposable::DisposableGroup;
use crate::error::GadgetsError;
use crate::host::{Host, PaneItemId};
use crate::orchestrator::{self, ActionTelemetry, Analytics, Effects, NoopAnalytics, ThrottleStats};
use crate::reactive::StateStream;
use crate::service::GadgetsService;
use crate::state::{GadgetsState, reduce};

/// Where an activation is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Configured through an [`ActivationBuilder`], nothing wired yet.
    Uninitialized,
    Active,
    Deactivated,
}

/// Configures and creates an [`Activation`].
pub struct ActivationBuilder {
    host: Rc<dyn Host>,
    config: GadgetsConfig,
    initial_state: GadgetsState,
    analytics: Rc<dyn Analytics>,
}

impl ActivationBuilder {
    /// A builder has touched nothing on the host yet.
    #[must_use]
    pub fn lifecycle(&self) -> LifecycleState {
        LifecycleState::Uninitialized
    }

    #[must_use]
    pub fn config(mut self, config: GadgetsConfig) -> Self {
        self.config = config;
        self
    }

    /// Snapshot to start from, e.g. gadgets known ahead of activation.
    #[must_use]
    pub fn initial_state(mut self, state: GadgetsState) -> Self {
        self.initial_state = state;
        self
    }

    #[must_use]
    pub fn analytics(mut self, analytics: Rc<dyn Analytics>) -> Self {
        self.analytics = analytics;
        self
    }

    /// Validate the config and wire every component.
    pub fn activate(self) -> Result<Activation, GadgetsError> {
        let problems = self.config.validate();
        if !problems.is_empty() {
            tracing::warn!(?problems, "refusing to activate with invalid config");
            return Err(GadgetsError::InvalidConfig(problems));
        }

        tracing::debug!(from = ?self.lifecycle(), "wiring gadgets engine");
        let mut subscriptions = DisposableGroup::new();

        let actions = ActionChannel::new();
        let state = StateStream::new(&actions, self.initial_state, reduce);
        let commands = Commands::new(
            actions.clone(),
            state.clone(),
            self.host,
            Rc::new(self.config),
        );
        let effects = orchestrator::wire(
            &commands,
            &actions,
            &state,
            self.analytics,
            &mut subscriptions,
        );

        tracing::info!(
            gadgets = state.with(|s| s.gadgets().len()),
            subscriptions = subscriptions.len(),
            "gadgets activated"
        );

        Ok(Activation {
            lifecycle: LifecycleState::Active,
            actions,
            state,
            commands,
            effects,
            subscriptions,
        })
    }
}

/// A live gadgets engine bound to one host.
///
/// Dropping it deactivates.
pub struct Activation {
    lifecycle: LifecycleState,
    actions: ActionChannel,
    state: StateStream<GadgetsState>,
    commands: Commands,
    effects: Effects,
    subscriptions: DisposableGroup,
}

impl fmt::Debug for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Activation")
            .field("lifecycle", &self.lifecycle)
            .field("subscriptions", &self.subscriptions)
            .field("commands", &self.commands)
            .finish_non_exhaustive()
    }
}

impl Activation {
    pub fn builder(host: Rc<dyn Host>) -> ActivationBuilder {
        ActivationBuilder {
            host,
            config: GadgetsConfig::default(),
            initial_state: GadgetsState::initial(),
            analytics: Rc::new(NoopAnalytics),
        }
    }

    /// Activate with default configuration.
    pub fn new(host: Rc<dyn Host>) -> Result<Self, GadgetsError> {
        Self::builder(host).activate()
    }

    #[must_use]
    pub fn lifecycle(&self) -> LifecycleState {
        self.lifecycle
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.lifecycle == LifecycleState::Active
    }

    /// The live command facade.
    #[must_use]
    pub fn commands(&self) -> &Commands {
        &self.commands
    }

    /// Latest state snapshot.
    #[must_use]
    pub fn state(&self) -> GadgetsState {
        self.state.current()
    }

    #[must_use]
    pub fn state_stream(&self) -> &StateStream<GadgetsState> {
        &self.state
    }

    /// The raw action channel. Closed once deactivated.
    #[must_use]
    pub fn actions(&self) -> &ActionChannel {
        &self.actions
    }

    #[must_use]
    pub fn telemetry(&self) -> &ActionTelemetry {
        &self.effects.telemetry
    }

    /// Pane items currently holding rendered gadget content.
    #[must_use]
    pub fn mounted_items(&self) -> Vec<PaneItemId> {
        self.effects.renderer.mounted_items()
    }

    #[must_use]
    pub fn render_throttle_stats(&self) -> ThrottleStats {
        self.effects.throttle.stats()
    }

    #[must_use]
    pub fn config(&self) -> &GadgetsConfig {
        self.commands.config()
    }

    /// Service object for other extensions.
    #[must_use]
    pub fn provide_gadgets_service(&self) -> GadgetsService {
        GadgetsService::new(&self.commands)
    }

    /// Tear everything down. Idempotent.
    pub fn deactivate(&mut self) {
        if self.lifecycle == LifecycleState::Deactivated {
            return;
        }
        self.commands.deactivate();
        self.subscriptions.dispose();
        self.lifecycle = LifecycleState::Deactivated;
        tracing::info!("gadgets deactivated");
    }
}

impl Drop for Activation {
    fn drop(&mut self) {
        self.deactivate();
    }
}
