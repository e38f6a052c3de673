//! `vm-on-<event>`: an event handler

use std::rc::Rc;

use tracing::{trace, warn};

use super::{evaluate, BindCx, BindingDescriptor, BindingKind, Controller, UpdateCx};
use crate::dom::{Document, Event, ListenerId, NodeId};
use crate::error::{type_name, BindError};
use crate::expression::Getter;
use crate::Value;

/// Subscribes the function the expression evaluates to.
///
/// The handler is called with one argument, the event as `{type,
/// target}`. When the expression yields a different function the old
/// subscription is dropped first.
pub struct EventController {
    element: NodeId,
    event: String,
    data: Value,
    getter: Getter,
    handler: Option<Value>,
    listener: Option<ListenerId>,
}

impl EventController {
    pub(crate) fn new(descriptor: &BindingDescriptor, cx: &mut BindCx<'_>) -> Result<Self, BindError> {
        Ok(Self {
            element: descriptor.element,
            event: descriptor.suffix.clone().unwrap_or_default(),
            data: cx.data.clone(),
            getter: cx.engine.compile_getter(&descriptor.value)?,
            handler: None,
            listener: None,
        })
    }

    /// Event name.
    pub fn event(&self) -> &str {
        &self.event
    }
}

impl Controller for EventController {
    fn kind(&self) -> BindingKind {
        BindingKind::On
    }

    fn element(&self) -> NodeId {
        self.element
    }

    fn update(&mut self, cx: &mut UpdateCx<'_>) -> bool {
        if self.event.is_empty() {
            return false;
        }
        let handler = match evaluate(&self.getter, &self.data) {
            Some(handler) => handler,
            None => return false,
        };
        if self.handler.as_ref() == Some(&handler) {
            return false;
        }

        self.detach(cx.document);
        self.handler = Some(handler.clone());
        if !handler.is_callable() {
            warn!(
                expression = self.getter.source(),
                found = type_name(&handler),
                "event binding needs a function"
            );
            return true;
        }

        trace!(event = %self.event, "event handler bound");
        let source = self.getter.source().to_string();
        let listener = Rc::new(move |_: &Document, event: &Event| {
            if let Err(err) = handler.call(&[event.to_value()]) {
                warn!(expression = %source, error = %err, "event handler failed");
            }
        });
        self.listener = Some(cx.document.on(self.element, &self.event, listener));
        true
    }

    fn detach(&mut self, document: &mut Document) {
        if let Some(id) = self.listener.take() {
            document.off(self.element, &self.event, id);
        }
    }
}
