//! `vm-attr-<name>`: a DOM property or an attribute

use super::{BindCx, BindingDescriptor, BindingKind, Controller, Tracked, UpdateCx};
use crate::dom::NodeId;
use crate::error::BindError;
use crate::expression::Getter;
use crate::Value;

/// Writes the bound value to the element property of that name when the
/// element has one, and to the attribute otherwise.
pub struct AttrController {
    element: NodeId,
    name: String,
    data: Value,
    getter: Getter,
    tracked: Tracked,
}

impl AttrController {
    pub(crate) fn new(descriptor: &BindingDescriptor, cx: &mut BindCx<'_>) -> Result<Self, BindError> {
        Ok(Self {
            element: descriptor.element,
            name: descriptor.suffix.clone().unwrap_or_default(),
            data: cx.data.clone(),
            getter: cx.engine.compile_getter(&descriptor.value)?,
            tracked: Tracked::default(),
        })
    }

    /// Target property or attribute name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Controller for AttrController {
    fn kind(&self) -> BindingKind {
        BindingKind::Attr
    }

    fn element(&self) -> NodeId {
        self.element
    }

    fn update(&mut self, cx: &mut UpdateCx<'_>) -> bool {
        if self.name.is_empty() {
            return false;
        }
        let value = match self.tracked.next(&self.getter, &self.data) {
            Some(value) => value,
            None => return false,
        };
        if cx.document.has_property(self.element, &self.name) {
            cx.document.set_property(self.element, &self.name, value);
        } else {
            cx.document.set_attribute(self.element, &self.name, &value.to_string());
        }
        true
    }
}
