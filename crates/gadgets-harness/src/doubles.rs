#![forbid(unsafe_code)]

//! Pane items, gadget renderers and analytics sinks that record what
//! happened to them.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use gadgets_runtime::{
    Analytics, GadgetDescriptor, GadgetId, GadgetRenderer, PaneItem, PaneItemId, PaneItemRef,
    TelemetryError,
};

/// Pane item that may or may not host a gadget.
#[derive(Debug)]
pub struct FakeItem {
    id: PaneItemId,
    gadget: Option<GadgetId>,
}

impl FakeItem {
    /// An ordinary editor-like item.
    pub fn plain() -> PaneItemRef {
        Rc::new(Self {
            id: PaneItemId::next(),
            gadget: None,
        })
    }

    /// An item hosting `gadget`.
    pub fn hosting(gadget: &GadgetId) -> PaneItemRef {
        Rc::new(Self {
            id: PaneItemId::next(),
            gadget: Some(gadget.clone()),
        })
    }
}

impl PaneItem for FakeItem {
    fn item_id(&self) -> PaneItemId {
        self.id
    }

    fn gadget_id(&self) -> Option<GadgetId> {
        self.gadget.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderEvent {
    Render { item: PaneItemId, gadget: GadgetId },
    Unmount { item: PaneItemId },
}

/// Renderer that logs every call.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    events: RefCell<Vec<RenderEvent>>,
}

impl RecordingRenderer {
    #[must_use]
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    #[must_use]
    pub fn events(&self) -> Vec<RenderEvent> {
        self.events.borrow().clone()
    }

    #[must_use]
    pub fn render_count(&self) -> usize {
        self.events
            .borrow()
            .iter()
            .filter(|event| matches!(event, RenderEvent::Render { .. }))
            .count()
    }

    #[must_use]
    pub fn unmounted(&self) -> Vec<PaneItemId> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                RenderEvent::Unmount { item } => Some(*item),
                RenderEvent::Render { .. } => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

impl GadgetRenderer for RecordingRenderer {
    fn render(&self, item: &PaneItemRef, gadget: &GadgetDescriptor) {
        self.events.borrow_mut().push(RenderEvent::Render {
            item: item.item_id(),
            gadget: gadget.id().clone(),
        });
    }

    fn unmount(&self, item: PaneItemId) {
        self.events.borrow_mut().push(RenderEvent::Unmount { item });
    }
}

/// Descriptor for `id` rendered by `renderer`.
///
/// # Panics
///
/// Panics if `id` is not a valid gadget id.
pub fn gadget(id: &str, renderer: &Rc<RecordingRenderer>) -> GadgetDescriptor {
    let id = GadgetId::new(id).unwrap_or_else(|err| panic!("test gadget id: {err}"));
    let renderer: Rc<dyn GadgetRenderer> = Rc::clone(renderer) as Rc<dyn GadgetRenderer>;
    let title = id.as_str().to_uppercase();
    GadgetDescriptor::new(id, title, renderer)
}

/// How [`RecordingAnalytics`] answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SinkMode {
    #[default]
    Accept,
    Fail,
    Panic,
}

/// Analytics sink that logs tracked kinds and can be told to misbehave.
#[derive(Debug, Default)]
pub struct RecordingAnalytics {
    tracked: RefCell<Vec<(String, &'static str)>>,
    mode: Cell<SinkMode>,
}

impl RecordingAnalytics {
    #[must_use]
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn set_mode(&self, mode: SinkMode) {
        self.mode.set(mode);
    }

    #[must_use]
    pub fn tracked(&self) -> Vec<(String, &'static str)> {
        self.tracked.borrow().clone()
    }

    #[must_use]
    pub fn kinds(&self) -> Vec<&'static str> {
        self.tracked.borrow().iter().map(|(_, kind)| *kind).collect()
    }
}

impl Analytics for RecordingAnalytics {
    fn track(&self, event: &str, kind: &'static str) -> Result<(), TelemetryError> {
        match self.mode.get() {
            SinkMode::Accept => {
                self.tracked.borrow_mut().push((event.to_string(), kind));
                Ok(())
            }
            SinkMode::Fail => Err(TelemetryError::new("sink offline")),
            SinkMode::Panic => panic!("analytics sink panicked on {kind}"),
        }
    }
}
