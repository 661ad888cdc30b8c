#![forbid(unsafe_code)]

//! Error types.
//!
//! Most failures at this layer degrade to a logged no-op; the errors below
//! are the few surfaced to callers of the facade and service.

use std::fmt;

use crate::state::GadgetId;

/// Errors returned by activation, the command facade and the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GadgetsError {
    /// The configuration failed validation; one message per problem.
    InvalidConfig(Vec<String>),
    /// The string is not usable as a gadget id.
    InvalidGadgetId(String),
    /// A gadget with this id is already registered.
    DuplicateGadget(GadgetId),
    /// No gadget with this id is registered.
    UnknownGadget(GadgetId),
    /// The activation has been torn down.
    Deactivated,
}

impl fmt::Display for GadgetsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig(problems) => {
                write!(f, "invalid gadgets config: {}", problems.join("; "))
            }
            Self::InvalidGadgetId(raw) => write!(f, "invalid gadget id: {raw:?}"),
            Self::DuplicateGadget(id) => write!(f, "gadget already registered: {id}"),
            Self::UnknownGadget(id) => write!(f, "unknown gadget: {id}"),
            Self::Deactivated => f.write_str("gadgets engine is deactivated"),
        }
    }
}

impl std::error::Error for GadgetsError {}

/// Failure reported by an analytics sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryError {
    message: String,
}

impl TelemetryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "telemetry sink failed: {}", self.message)
    }
}

impl std::error::Error for TelemetryError {}
