#![forbid(unsafe_code)]

//! Flex-scale capture when the user grabs a pane resize handle.
//!
//! Listens in capture phase: the handle stops propagation of its own
//! pointer-down, so a bubble listener never sees it.

use crate::host::{ContainerHandle, Element, PointerEvent};

#[derive(Debug, Clone)]
pub struct ResizeFlexScaleTracker {
    handle_tag: String,
}

impl ResizeFlexScaleTracker {
    pub fn new(handle_tag: impl Into<String>) -> Self {
        Self {
            handle_tag: handle_tag.into(),
        }
    }

    fn is_handle(&self, element: &dyn Element) -> bool {
        element.tag_name().eq_ignore_ascii_case(&self.handle_tag)
    }

    /// Containers on either side of the grabbed handle, previous first.
    /// Empty unless the event targets a resize handle.
    #[must_use]
    pub fn containers(&self, event: &PointerEvent) -> Vec<ContainerHandle> {
        let target = &event.target;
        if !self.is_handle(target.as_ref()) {
            return Vec::new();
        }
        [target.previous_element_sibling(), target.next_element_sibling()]
            .into_iter()
            .flatten()
            .filter_map(|sibling| sibling.model())
            .filter_map(ContainerHandle::resolve)
            .collect()
    }
}
