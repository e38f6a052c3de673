//! `vm-css-<prop>`: one inline style property

use super::{BindCx, BindingDescriptor, BindingKind, Controller, Tracked, UpdateCx};
use crate::dom::NodeId;
use crate::error::BindError;
use crate::expression::Getter;
use crate::Value;

/// Sets `style[property]` to the text of the bound value.
pub struct CssController {
    element: NodeId,
    property: String,
    data: Value,
    getter: Getter,
    tracked: Tracked,
}

impl CssController {
    pub(crate) fn new(descriptor: &BindingDescriptor, cx: &mut BindCx<'_>) -> Result<Self, BindError> {
        Ok(Self {
            element: descriptor.element,
            property: descriptor.suffix.clone().unwrap_or_default(),
            data: cx.data.clone(),
            getter: cx.engine.compile_getter(&descriptor.value)?,
            tracked: Tracked::default(),
        })
    }

    /// The style property.
    pub fn property(&self) -> &str {
        &self.property
    }
}

impl Controller for CssController {
    fn kind(&self) -> BindingKind {
        BindingKind::Css
    }

    fn element(&self) -> NodeId {
        self.element
    }

    fn update(&mut self, cx: &mut UpdateCx<'_>) -> bool {
        if self.property.is_empty() {
            return false;
        }
        match self.tracked.next(&self.getter, &self.data) {
            Some(value) => {
                cx.document.set_style(self.element, &self.property, &value.to_text());
                true
            }
            None => false,
        }
    }
}
