#![forbid(unsafe_code)]

//! Fake DOM elements and pane container models.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use gadgets_runtime::{
    ContainerId, Element, ElementModel, FlexScaled, ItemContainer, PaneItemRef,
};

/// Element with a tag, an optional model and sibling links.
pub struct FakeElement {
    tag: String,
    model: Option<Rc<dyn ElementModel>>,
    previous: RefCell<Weak<FakeElement>>,
    next: RefCell<Weak<FakeElement>>,
}

impl FakeElement {
    pub fn new(tag: impl Into<String>, model: Option<Rc<dyn ElementModel>>) -> Rc<Self> {
        Rc::new(Self {
            tag: tag.into(),
            model,
            previous: RefCell::new(Weak::new()),
            next: RefCell::new(Weak::new()),
        })
    }

    /// Link `elements` as consecutive siblings. The caller keeps them alive.
    pub fn row(elements: &[Rc<FakeElement>]) {
        for pair in elements.windows(2) {
            *pair[0].next.borrow_mut() = Rc::downgrade(&pair[1]);
            *pair[1].previous.borrow_mut() = Rc::downgrade(&pair[0]);
        }
    }
}

impl Element for FakeElement {
    fn tag_name(&self) -> String {
        self.tag.clone()
    }

    fn previous_element_sibling(&self) -> Option<Rc<dyn Element>> {
        self.previous
            .borrow()
            .upgrade()
            .map(|element| element as Rc<dyn Element>)
    }

    fn next_element_sibling(&self) -> Option<Rc<dyn Element>> {
        self.next
            .borrow()
            .upgrade()
            .map(|element| element as Rc<dyn Element>)
    }

    fn model(&self) -> Option<Rc<dyn ElementModel>> {
        self.model.clone()
    }
}

/// Pane container model; resizable only when built with a flex scale.
pub struct FakeContainer {
    id: ContainerId,
    items: RefCell<Vec<PaneItemRef>>,
    scale: Option<Cell<f64>>,
}

impl FakeContainer {
    pub fn resizable(scale: f64) -> Rc<Self> {
        Rc::new(Self {
            id: ContainerId::next(),
            items: RefCell::new(Vec::new()),
            scale: Some(Cell::new(scale)),
        })
    }

    /// Enumerates items but has no flex-scale accessor.
    pub fn fixed() -> Rc<Self> {
        Rc::new(Self {
            id: ContainerId::next(),
            items: RefCell::new(Vec::new()),
            scale: None,
        })
    }

    #[must_use]
    pub fn id(&self) -> ContainerId {
        self.id
    }

    pub fn push_item(&self, item: PaneItemRef) {
        self.items.borrow_mut().push(item);
    }
}

impl ItemContainer for FakeContainer {
    fn container_id(&self) -> ContainerId {
        self.id
    }

    fn items(&self) -> Vec<PaneItemRef> {
        self.items.borrow().clone()
    }
}

impl FlexScaled for FakeContainer {
    fn flex_scale(&self) -> f64 {
        self.scale.as_ref().map_or(0.0, Cell::get)
    }

    fn set_flex_scale(&self, scale: f64) {
        if let Some(cell) = &self.scale {
            cell.set(scale);
        }
    }
}

impl ElementModel for FakeContainer {
    fn as_item_container(&self) -> Option<&dyn ItemContainer> {
        Some(self)
    }

    fn as_flex_scaled(&self) -> Option<&dyn FlexScaled> {
        self.scale.as_ref().map(|_| self as &dyn FlexScaled)
    }
}

/// Model with no capabilities at all.
#[derive(Debug, Default)]
pub struct PlainModel;

impl ElementModel for PlainModel {}
