//! Binding controllers
//!
//! A controller ties one element to one binding expression. The
//! lifecycle manager builds controllers from [`BindingDescriptor`]s and
//! calls [`Controller::update`] on every flush; a controller writes to
//! its element only when the computed value changed since the previous
//! update.
//!
//! | Directive | Controller |
//! |---|---|
//! | `vm-html` | [`HtmlController`] |
//! | `vm-value` | [`FormController`] |
//! | `vm-css-<prop>` | [`CssController`] |
//! | `vm-attr-<name>` | [`AttrController`] |
//! | `vm-on-<event>` | [`EventController`] |

mod attr;
mod css;
mod event;
mod form;
mod html;

pub use attr::AttrController;
pub use css::CssController;
pub use event::EventController;
pub use form::{FormController, CHANGE_EVENT};
pub use html::HtmlController;

use std::fmt;

use tracing::warn;

use crate::dom::{Document, NodeId};
use crate::error::BindError;
use crate::expression::Getter;
use crate::template::TemplateEngine;
use crate::Value;

/// The five binding kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingKind {
    /// `vm-html`: element content
    Html,
    /// `vm-value`: two-way form value
    Value,
    /// `vm-css-<prop>`: one inline style property
    Css,
    /// `vm-attr-<name>`: a property or attribute
    Attr,
    /// `vm-on-<event>`: an event handler
    On,
}

impl BindingKind {
    /// Kind named by the `<kind>` part of `vm-<kind>[-<suffix>]`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "html" => Some(BindingKind::Html),
            "value" => Some(BindingKind::Value),
            "css" => Some(BindingKind::Css),
            "attr" => Some(BindingKind::Attr),
            "on" => Some(BindingKind::On),
            _ => None,
        }
    }

    /// The `<kind>` part of the directive.
    pub fn name(self) -> &'static str {
        match self {
            BindingKind::Html => "html",
            BindingKind::Value => "value",
            BindingKind::Css => "css",
            BindingKind::Attr => "attr",
            BindingKind::On => "on",
        }
    }
}

impl fmt::Display for BindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A directive found by a scan.
#[derive(Debug, Clone, PartialEq)]
pub struct BindingDescriptor {
    /// The bound element
    pub element: NodeId,
    /// Identity marker attribute added in place of the directive
    pub marker: String,
    /// Directive attribute name, e.g. `vm-css-color`
    pub name: String,
    /// Directive value: the binding expression
    pub value: String,
    /// Binding kind
    pub kind: BindingKind,
    /// Text after `vm-<kind>-`: a CSS property, attribute or event name
    pub suffix: Option<String>,
}

/// What a controller may touch while updating.
pub struct UpdateCx<'a> {
    /// The document holding the bound element
    pub document: &'a mut Document,
    /// Elements whose subtree must be scanned again after the flush
    pub rescan: &'a mut Vec<NodeId>,
}

/// What a controller may touch while being built.
pub struct BindCx<'a> {
    /// The document holding the bound element
    pub document: &'a mut Document,
    /// Engine compiling the binding expression
    pub engine: &'a TemplateEngine,
    /// The controller root's data
    pub data: &'a Value,
}

/// A live binding.
pub trait Controller {
    /// Binding kind.
    fn kind(&self) -> BindingKind;

    /// The bound element.
    fn element(&self) -> NodeId;

    /// Recompute the bound value and write it to the element if it
    /// changed. Returns whether the element was written.
    fn update(&mut self, cx: &mut UpdateCx<'_>) -> bool;

    /// Release event subscriptions held on the document.
    fn detach(&mut self, _document: &mut Document) {}
}

/// Build the controller for `descriptor`.
///
/// A binding expression that does not compile is logged and yields no
/// controller.
pub fn create(descriptor: &BindingDescriptor, cx: &mut BindCx<'_>) -> Option<Box<dyn Controller>> {
    let built: Result<Box<dyn Controller>, BindError> = match descriptor.kind {
        BindingKind::Html => HtmlController::new(descriptor, cx).map(|c| Box::new(c) as Box<dyn Controller>),
        BindingKind::Value => FormController::new(descriptor, cx).map(|c| Box::new(c) as Box<dyn Controller>),
        BindingKind::Css => CssController::new(descriptor, cx).map(|c| Box::new(c) as Box<dyn Controller>),
        BindingKind::Attr => AttrController::new(descriptor, cx).map(|c| Box::new(c) as Box<dyn Controller>),
        BindingKind::On => EventController::new(descriptor, cx).map(|c| Box::new(c) as Box<dyn Controller>),
    };
    match built {
        Ok(controller) => Some(controller),
        Err(err) => {
            warn!(directive = %descriptor.name, error = %err, "binding disabled");
            None
        }
    }
}

/// Last value a controller wrote, and the change test against it.
#[derive(Debug, Default)]
pub(crate) struct Tracked {
    last: Option<Value>,
}

impl Tracked {
    /// Evaluate `getter`; `Some(value)` when it differs from the last
    /// value, which it then replaces. A failing getter keeps the last
    /// value.
    pub(crate) fn next(&mut self, getter: &Getter, data: &Value) -> Option<Value> {
        let value = evaluate(getter, data)?;
        if self.last.as_ref() == Some(&value) {
            return None;
        }
        self.last = Some(value.clone());
        Some(value)
    }
}

/// Run a getter, logging a failure instead of returning it.
pub(crate) fn evaluate(getter: &Getter, data: &Value) -> Option<Value> {
    match getter.get(data) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(expression = getter.source(), error = %err, "binding evaluation failed");
            None
        }
    }
}
