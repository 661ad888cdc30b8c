#![forbid(unsafe_code)]

//! Action telemetry.
//!
//! A passive subscriber on the raw action channel. It counts action kinds and
//! forwards each kind to an [`Analytics`] sink. Nothing here mutates state or
//! dispatches; sink failures, including panics, are logged and dropped.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use crate::action::Action;
use crate::config::TelemetryConfig;
use crate::error::TelemetryError;

/// Analytics sink supplied by the host environment.
pub trait Analytics {
    fn track(&self, event: &str, kind: &'static str) -> Result<(), TelemetryError>;
}

/// Sink that accepts and discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAnalytics;

impl Analytics for NoopAnalytics {
    fn track(&self, _event: &str, _kind: &'static str) -> Result<(), TelemetryError> {
        Ok(())
    }
}

pub struct ActionTelemetry {
    sink: Rc<dyn Analytics>,
    config: TelemetryConfig,
    counts: RefCell<BTreeMap<&'static str, u64>>,
    failures: Cell<u64>,
}

impl ActionTelemetry {
    pub fn new(sink: Rc<dyn Analytics>, config: TelemetryConfig) -> Self {
        Self {
            sink,
            config,
            counts: RefCell::new(BTreeMap::new()),
            failures: Cell::new(0),
        }
    }

    /// Count `action` and report it to the sink. Never fails.
    pub fn record(&self, action: &Action) {
        let kind = action.kind();
        *self.counts.borrow_mut().entry(kind).or_insert(0) += 1;
        if !self.config.enabled {
            return;
        }

        let sink = Rc::clone(&self.sink);
        let event = self.config.event_name.as_str();
        match catch_unwind(AssertUnwindSafe(|| sink.track(event, kind))) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                self.failures.set(self.failures.get() + 1);
                tracing::warn!(target: "gadgets.telemetry", kind, error = %err, "analytics sink rejected action");
            }
            Err(payload) => {
                self.failures.set(self.failures.get() + 1);
                let reason = payload
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "non-string panic payload".to_string());
                tracing::warn!(target: "gadgets.telemetry", kind, %reason, "analytics sink panicked");
            }
        }
    }

    /// Occurrences of one action kind.
    #[must_use]
    pub fn count(&self, kind: &str) -> u64 {
        self.counts.borrow().get(kind).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn counts(&self) -> BTreeMap<&'static str, u64> {
        self.counts.borrow().clone()
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.counts.borrow().values().sum()
    }

    /// Sink errors and panics swallowed so far.
    #[must_use]
    pub fn failures(&self) -> u64 {
        self.failures.get()
    }
}

impl std::fmt::Debug for ActionTelemetry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionTelemetry")
            .field("enabled", &self.config.enabled)
            .field("counts", &self.counts.borrow())
            .field("failures", &self.failures.get())
            .finish()
    }
}
