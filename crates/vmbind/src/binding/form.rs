//! `vm-value`: two-way form binding

use std::rc::Rc;

use tracing::{trace, warn};

use super::{evaluate, BindCx, BindingDescriptor, BindingKind, Controller, UpdateCx};
use crate::dom::{Document, Event, ListenerId, NodeId};
use crate::error::BindError;
use crate::expression::{Getter, Setter};
use crate::Value;

/// Event fired on every element a form binding writes to.
pub const CHANGE_EVENT: &str = "vm_change";

/// How the element maps to the bound value.
#[derive(Debug, Clone, PartialEq)]
enum Shape {
    /// Text-like inputs and selects: the value is the element value.
    Text,
    /// Named radio group: the value of the checked member, or `""`.
    RadioGroup(Vec<NodeId>),
    /// Named checkbox group: the list of checked member values.
    CheckboxGroup(Vec<NodeId>),
    /// A lone radio or checkbox: its value when checked, else `""`.
    Single,
}

/// Event a control reports user edits with, by input type.
fn event_for(input_type: Option<&str>) -> Option<&'static str> {
    match input_type {
        Some("select-one" | "select-multiple" | "file") => Some("change"),
        None | Some("submit" | "reset" | "button") => None,
        Some("radio" | "checkbox") => Some("click"),
        Some(_) => Some("input"),
    }
}

/// Keeps a form control and a data path in sync.
///
/// User edits are written back through the setter. Grouped radios and
/// checkboxes share one value; only the first member of the group in
/// document order pushes data into the group, the others only listen.
///
/// Data is pushed only when it differs from what the element displays,
/// so a value the user just typed is never echoed back. On the first
/// update a control that already shows a value fills empty data instead.
pub struct FormController {
    element: NodeId,
    data: Value,
    getter: Getter,
    setter: Option<Setter>,
    shape: Shape,
    /// First member of its group, or ungrouped
    is_flag: bool,
    listener: Option<(String, ListenerId)>,
    /// Text of the last pushed value and of the display it produced
    pushed: Option<(String, String)>,
    settled: bool,
}

impl FormController {
    pub(crate) fn new(descriptor: &BindingDescriptor, cx: &mut BindCx<'_>) -> Result<Self, BindError> {
        let element = descriptor.element;
        let getter = cx.engine.compile_getter(&descriptor.value)?;
        let setter = match cx.engine.compile_setter(&descriptor.value) {
            Ok(setter) => Some(setter),
            Err(err) => {
                warn!(expression = %descriptor.value, error = %err, "form binding is read-only");
                None
            }
        };

        let input_type = cx.document.input_type(element);
        let name = cx.document.attribute(element, "name").map(str::to_string);
        let shape = match (input_type.as_deref(), name) {
            (Some("radio"), Some(name)) => Shape::RadioGroup(cx.document.input_group(&name)),
            (Some("checkbox"), Some(name)) => Shape::CheckboxGroup(cx.document.input_group(&name)),
            (Some("radio" | "checkbox"), None) => Shape::Single,
            _ => Shape::Text,
        };
        let is_flag = match &shape {
            Shape::RadioGroup(group) | Shape::CheckboxGroup(group) => group.first() == Some(&element),
            _ => true,
        };

        let mut controller = Self {
            element,
            data: cx.data.clone(),
            getter,
            setter,
            shape,
            is_flag,
            listener: None,
            pushed: None,
            settled: false,
        };
        if let (Some(event), Some(setter)) = (event_for(input_type.as_deref()), controller.setter.clone()) {
            let listener = controller.listener(setter);
            let id = cx.document.on(element, event, listener);
            controller.listener = Some((event.to_string(), id));
        }
        Ok(controller)
    }

    /// Event name the write-back listener is subscribed to.
    pub fn event(&self) -> Option<&str> {
        self.listener.as_ref().map(|(event, _)| event.as_str())
    }

    /// Whether this controller pushes data into its element (group).
    pub fn is_flag(&self) -> bool {
        self.is_flag
    }

    fn listener(&self, setter: Setter) -> Rc<dyn Fn(&Document, &Event)> {
        let data = self.data.clone();
        let shape = self.shape.clone();
        Rc::new(move |document: &Document, event: &Event| {
            let value = read(document, event.target, &shape);
            match setter.set(&data, value) {
                Ok(true) => trace!(path = ?setter.path(), "form value written back"),
                Ok(false) => {}
                Err(err) => warn!(path = ?setter.path(), error = %err, "form write-back failed"),
            }
        })
    }
}

/// The value a user edit stands for.
fn read(document: &Document, element: NodeId, shape: &Shape) -> Value {
    match shape {
        Shape::Text => Value::from(document.value(element)),
        Shape::RadioGroup(group) => Value::from(
            group
                .iter()
                .rev()
                .find(|&&input| document.checked(input))
                .map(|&input| document.value(input))
                .unwrap_or_default(),
        ),
        Shape::CheckboxGroup(group) => Value::list(
            group
                .iter()
                .filter(|&&input| document.checked(input))
                .map(|&input| Value::from(document.value(input)))
                .collect(),
        ),
        Shape::Single if document.checked(element) => Value::from(document.value(element)),
        Shape::Single => Value::from(""),
    }
}

/// Comparable text of a form value; objects have none.
fn stamp(value: &Value) -> Option<String> {
    match value {
        Value::Object(_) => None,
        other => Some(other.to_text()),
    }
}

impl FormController {
    /// Text the element (group) currently stands for.
    fn shown(&self, document: &Document) -> String {
        read(document, self.element, &self.shape).to_text()
    }

    /// Write a pre-filled control value into empty data.
    fn read_back(&self, document: &Document) -> bool {
        let setter = match &self.setter {
            Some(setter) => setter,
            None => return false,
        };
        match setter.set(&self.data, read(document, self.element, &self.shape)) {
            Ok(written) => {
                trace!(path = ?setter.path(), "pre-filled form value read back");
                written
            }
            Err(err) => {
                warn!(path = ?setter.path(), error = %err, "form read-back failed");
                false
            }
        }
    }
}

impl Controller for FormController {
    fn kind(&self) -> BindingKind {
        BindingKind::Value
    }

    fn element(&self) -> NodeId {
        self.element
    }

    fn update(&mut self, cx: &mut UpdateCx<'_>) -> bool {
        if !self.is_flag {
            return false;
        }
        let value = match evaluate(&self.getter, &self.data) {
            Some(value) => value,
            None => return false,
        };
        // Lists compare by their text, objects are never written.
        let wanted = match stamp(&value) {
            Some(wanted) => wanted,
            None => return false,
        };
        let shown = self.shown(&*cx.document);
        let first = !std::mem::replace(&mut self.settled, true);
        if first && wanted.is_empty() && !shown.is_empty() && self.read_back(&*cx.document) {
            return false;
        }
        if wanted == shown {
            return false;
        }
        // Pushed already and nothing changed since; the element cannot
        // show this value (a radio value no member carries).
        if self.pushed.as_ref() == Some(&(wanted.clone(), shown)) {
            return false;
        }

        let document = &mut *cx.document;
        match &self.shape {
            Shape::Text => {
                document.set_value(self.element, &value.to_text());
                document.trigger(self.element, CHANGE_EVENT);
            }
            Shape::RadioGroup(group) => {
                for &input in group {
                    let checked = Value::from(document.value(input)).loose_eq(&value);
                    document.set_checked(input, checked);
                    document.trigger(input, CHANGE_EVENT);
                }
            }
            Shape::CheckboxGroup(group) => {
                for &input in group {
                    let own = Value::from(document.value(input));
                    let checked = match &value {
                        Value::List(list) => list.index_of(&own).is_some(),
                        other => own.loose_eq(other),
                    };
                    document.set_checked(input, checked);
                    document.trigger(input, CHANGE_EVENT);
                }
            }
            Shape::Single => {
                let checked = value.loose_eq(&Value::from(document.value(self.element)));
                document.set_checked(self.element, checked);
                document.trigger(self.element, CHANGE_EVENT);
            }
        }
        self.pushed = Some((wanted, self.shown(document)));
        true
    }

    fn detach(&mut self, document: &mut Document) {
        if let Some((event, id)) = self.listener.take() {
            document.off(self.element, &event, id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use crate::template::TemplateEngine;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn bind(document: &mut Document, element: NodeId, path: &str, data: &Value) -> FormController {
        let engine = TemplateEngine::new();
        let descriptor = BindingDescriptor {
            element,
            marker: "vm_1".to_string(),
            name: "vm-value".to_string(),
            value: path.to_string(),
            kind: BindingKind::Value,
            suffix: None,
        };
        FormController::new(
            &descriptor,
            &mut BindCx {
                document,
                engine: &engine,
                data,
            },
        )
        .unwrap()
    }

    fn update(controller: &mut FormController, document: &mut Document) -> bool {
        let mut rescan = Vec::new();
        controller.update(&mut UpdateCx {
            document,
            rescan: &mut rescan,
        })
    }

    #[test]
    fn test_event_by_type() {
        assert_eq!(event_for(Some("text")), Some("input"));
        assert_eq!(event_for(Some("textarea")), Some("input"));
        assert_eq!(event_for(Some("select-one")), Some("change"));
        assert_eq!(event_for(Some("file")), Some("change"));
        assert_eq!(event_for(Some("checkbox")), Some("click"));
        assert_eq!(event_for(Some("submit")), None);
        assert_eq!(event_for(None), None);
    }

    #[test]
    fn test_text_round_trip_without_echo() {
        let mut document = Document::parse("<input id=i>");
        let input = document.get_element_by_id("i").unwrap();
        let data = Value::from(json!({"a": "x"}));
        let mut controller = bind(&mut document, input, "a", &data);
        assert_eq!(controller.event(), Some("input"));

        assert!(update(&mut controller, &mut document));
        assert_eq!(document.value(input), "x");

        document.set_value(input, "y");
        document.trigger(input, "input");
        assert_eq!(data.get_property("a"), Value::from("y"));

        let echoes = Rc::new(Cell::new(0));
        let count = Rc::clone(&echoes);
        document.on(input, CHANGE_EVENT, Rc::new(move |_: &Document, _: &Event| count.set(count.get() + 1)));
        assert!(!update(&mut controller, &mut document));
        assert_eq!(echoes.get(), 0);
        assert_eq!(document.value(input), "y");

        data.as_object().unwrap().set("a", Value::from("z")).unwrap();
        assert!(update(&mut controller, &mut document));
        assert_eq!(echoes.get(), 1);
        assert_eq!(document.value(input), "z");
    }

    #[test]
    fn test_radio_group() {
        let mut document = Document::parse(
            r#"<input type=radio name=c value=r id=r><input type=radio name=c value=g id=g>"#,
        );
        let r = document.get_element_by_id("r").unwrap();
        let g = document.get_element_by_id("g").unwrap();
        let data = Value::from(json!({"color": "g"}));
        let mut first = bind(&mut document, r, "color", &data);
        let mut second = bind(&mut document, g, "color", &data);
        assert!(first.is_flag());
        assert!(!second.is_flag());

        assert!(update(&mut first, &mut document));
        assert!(!update(&mut second, &mut document));
        assert!(!document.checked(r));
        assert!(document.checked(g));

        document.set_checked(g, false);
        document.set_checked(r, true);
        document.trigger(r, "click");
        assert_eq!(data.get_property("color"), Value::from("r"));
    }

    #[test]
    fn test_checkbox_group() {
        let mut document = Document::parse(
            r#"<input type=checkbox name=t value=a id=a><input type=checkbox name=t value=b id=b>"#,
        );
        let a = document.get_element_by_id("a").unwrap();
        let b = document.get_element_by_id("b").unwrap();
        let data = Value::from(json!({"tags": ["b"]}));
        let mut first = bind(&mut document, a, "tags", &data);
        let _second = bind(&mut document, b, "tags", &data);

        update(&mut first, &mut document);
        assert!(!document.checked(a));
        assert!(document.checked(b));

        document.set_checked(a, true);
        document.trigger(a, "click");
        assert_eq!(data.to_json()["tags"], json!(["a", "b"]));
    }

    #[test]
    fn test_single_checkbox() {
        let mut document = Document::parse("<input type=checkbox value=yes id=c>");
        let c = document.get_element_by_id("c").unwrap();
        let data = Value::from(json!({"agree": "yes"}));
        let mut controller = bind(&mut document, c, "agree", &data);
        update(&mut controller, &mut document);
        assert!(document.checked(c));

        document.set_checked(c, false);
        document.trigger(c, "click");
        assert_eq!(data.get_property("agree"), Value::from(""));
    }

    #[test]
    fn test_expression_binding_is_read_only() {
        let mut document = Document::parse("<input id=i>");
        let input = document.get_element_by_id("i").unwrap();
        let data = Value::from(json!({"a": 1}));
        let mut controller = bind(&mut document, input, "a + 1", &data);
        assert_eq!(controller.event(), None);
        update(&mut controller, &mut document);
        assert_eq!(document.value(input), "2");
        controller.detach(&mut document);
    }

    #[test]
    fn test_prefilled_control_fills_empty_data() {
        let mut document = Document::parse(r#"<input id=i value="draft">"#);
        let input = document.get_element_by_id("i").unwrap();
        let data = Value::from(json!({"note": ""}));
        let mut controller = bind(&mut document, input, "note", &data);

        assert!(!update(&mut controller, &mut document));
        assert_eq!(data.get_property("note"), Value::from("draft"));
        assert_eq!(document.value(input), "draft");

        data.as_object().unwrap().set("note", Value::from("")).unwrap();
        assert!(update(&mut controller, &mut document));
        assert_eq!(document.value(input), "");
    }

    #[test]
    fn test_edit_back_to_pushed_value_keeps_next_write() {
        let mut document = Document::parse("<input id=i>");
        let input = document.get_element_by_id("i").unwrap();
        let data = Value::from(json!({"a": "x"}));
        let mut controller = bind(&mut document, input, "a", &data);
        update(&mut controller, &mut document);

        for typed in ["y", "x"] {
            document.set_value(input, typed);
            document.trigger(input, "input");
        }
        assert!(!update(&mut controller, &mut document));

        data.as_object().unwrap().set("a", Value::from("q")).unwrap();
        assert!(update(&mut controller, &mut document));
        assert_eq!(document.value(input), "q");
    }

    #[test]
    fn test_unmatched_radio_value_is_pushed_once() {
        let mut document = Document::parse(r#"<input type=radio name=c value=r id=r>"#);
        let r = document.get_element_by_id("r").unwrap();
        let data = Value::from(json!({"color": "blue"}));
        let mut controller = bind(&mut document, r, "color", &data);

        assert!(update(&mut controller, &mut document));
        assert!(!document.checked(r));
        assert!(!update(&mut controller, &mut document));
    }
}
