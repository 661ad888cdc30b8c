#![forbid(unsafe_code)]

//! Single-threaded reactive primitives.
//!
//! - [`EventChannel`]: ordered multicast bus (the action channel).
//! - [`StateStream`]: reducer fold over a channel with a synchronous
//!   current-value accessor.
//! - [`Slice`]: distinct-until-changed projection of a stream.

pub mod channel;
pub mod state_stream;

pub use channel::{ChannelClosed, EventChannel};
pub use state_stream::{Slice, StateStream};
