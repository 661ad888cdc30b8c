#![forbid(unsafe_code)]

//! Gadgets Runtime
//!
//! The activation-time engine of the gadgets panel extension: it accepts
//! intents from the host workspace, folds them into one authoritative state
//! snapshot, and drives rendering, command registration and telemetry from
//! that state, with a single idempotent teardown.
//!
//! # Key Components
//!
//! - [`EventChannel`] / [`ActionChannel`] - Ordered, synchronous multicast bus
//! - [`StateStream`] - Reducer fold with a synchronous `current()` and
//!   distinct [`Slice`]s
//! - [`Commands`] - The only sanctioned producer of [`Action`]s
//! - [`orchestrator`] - Throttled render, destroy cleanup, command sync,
//!   resize tracking and telemetry effects
//! - [`Activation`] - Lifecycle owner; deactivating releases everything
//! - [`GadgetsService`] - Registration surface for other extensions
//!
//! # Data flow
//!
//! ```text
//! host events -> Commands -> ActionChannel -> StateStream -> slices -> effects -> host
//! ```
//!
//! The host is injected as an `Rc<dyn Host>`; see [`host`] for the traits a
//! host (or the `gadgets-harness` test double) implements.

pub mod action;
pub mod activation;
pub mod commands;
pub mod config;
pub mod disposable;
pub mod error;
pub mod host;
pub mod orchestrator;
pub mod reactive;
pub mod service;
pub mod state;

pub use action::{Action, ActionChannel};
pub use activation::{Activation, ActivationBuilder, LifecycleState};
pub use commands::{Commands, GadgetPaneItem, WeakCommands};
#[cfg(feature = "config")]
pub use config::ConfigError;
pub use config::{GadgetsConfig, TelemetryConfig};
pub use disposable::{Disposable, DisposableGroup};
pub use error::{GadgetsError, TelemetryError};
pub use host::{
    ContainerHandle, ContainerId, ContainerRef, Element, ElementModel, FlexScaled, Host,
    ItemContainer, ListenerPhase, PaneItem, PaneItemId, PaneItemRef, PointerEvent,
};
pub use orchestrator::{ActionTelemetry, Analytics, NoopAnalytics, ThrottleStats};
pub use reactive::{ChannelClosed, EventChannel, Slice, StateStream};
pub use service::GadgetsService;
pub use state::{
    GadgetDescriptor, GadgetId, GadgetLocation, GadgetMap, GadgetRenderer, GadgetsState, reduce,
};
