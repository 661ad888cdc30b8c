#![forbid(unsafe_code)]

//! Gadgets Harness
//!
//! Deterministic doubles for everything `gadgets-runtime` consumes from its
//! environment:
//!
//! - [`FakeHost`] - workspace, command registry, document and scheduler in
//!   one in-memory object, backed by a [`VirtualClock`]
//! - [`FakeElement`] / [`FakeContainer`] - DOM siblings and pane container
//!   models with or without a flex-scale accessor
//! - [`FakeItem`] - pane items that do or do not host a gadget
//! - [`RecordingRenderer`] / [`RecordingAnalytics`] - call recorders
//!
//! ```rust,ignore
//! let host = FakeHost::new();
//! let activation = Activation::new(host.clone())?;
//! host.add_item(FakeItem::plain());
//! host.advance_ms(100);
//! ```

pub mod clock;
pub mod dom;
pub mod doubles;
pub mod host;

pub use clock::VirtualClock;
pub use dom::{FakeContainer, FakeElement, PlainModel};
pub use doubles::{FakeItem, RecordingAnalytics, RecordingRenderer, RenderEvent, SinkMode, gadget};
pub use host::{CommandEvent, FakeHost};
