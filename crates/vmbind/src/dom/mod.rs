//! In-memory document
//!
//! Nodes live in a [`SlotMap`] arena and are addressed by generational
//! [`NodeId`]s: an id of a removed node never resolves again, so holders
//! of stale ids can test liveness without keeping the node alive.
//!
//! Elements carry attributes (authoritative for serialization) and a
//! small set of DOM properties (`value`, `checked`, `selected`,
//! `disabled`, `hidden`, `id`) initialised from markup. Like a browser,
//! `value` and `checked` are not reflected back to attributes.

mod events;
mod parse;
mod serialize;

pub use events::{Event, Listener, ListenerId};

use indexmap::IndexMap;
use slotmap::{new_key_type, SlotMap};

use crate::Value;
use events::Registered;
use parse::{parse_fragment, Parsed, RAW_TEXT_ELEMENTS};

new_key_type! {
    /// Stable id of a document node.
    pub struct NodeId;
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
}

#[derive(Debug, Clone)]
pub(crate) enum NodeData {
    Document,
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
pub(crate) struct Element {
    tag: String,
    attributes: IndexMap<String, String>,
    properties: IndexMap<String, Value>,
}

/// An arena-backed element tree with an event interface.
pub struct Document {
    nodes: SlotMap<NodeId, Node>,
    root: NodeId,
    listeners: Vec<Registered>,
    next_listener: u64,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// An empty document.
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(Node {
            parent: None,
            children: Vec::new(),
            data: NodeData::Document,
        });
        Self {
            nodes,
            root,
            listeners: Vec::new(),
            next_listener: 0,
        }
    }

    /// Parse markup into a new document.
    pub fn parse(html: &str) -> Self {
        let mut doc = Self::new();
        let root = doc.root;
        doc.insert_parsed(root, parse_fragment(html));
        doc
    }

    /// The document node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Whether `id` still names a node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Tree Construction
    // ═══════════════════════════════════════════════════════════════════

    /// Create a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        let id = self.nodes.insert(Node {
            parent: None,
            children: Vec::new(),
            data: NodeData::Element(Element {
                tag: tag.to_ascii_lowercase(),
                attributes: IndexMap::new(),
                properties: IndexMap::new(),
            }),
        });
        self.init_properties(id);
        id
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.nodes.insert(Node {
            parent: None,
            children: Vec::new(),
            data: NodeData::Text(text.to_string()),
        })
    }

    /// Append `child` to `parent`, moving it from its old position.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if !self.contains(parent) || !self.contains(child) || self.is_inside(parent, child) {
            return;
        }
        self.detach(child);
        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.nodes.get_mut(parent) {
            node.children.push(child);
        }
    }

    /// Unlink a node from its parent; it stays in the arena.
    pub fn detach(&mut self, id: NodeId) {
        let parent = match self.nodes.get_mut(id) {
            Some(node) => node.parent.take(),
            None => return,
        };
        if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(p)) {
            parent.children.retain(|&c| c != id);
        }
    }

    /// Remove a node and its subtree from the document and the arena,
    /// dropping their event listeners.
    pub fn remove(&mut self, id: NodeId) {
        if id == self.root {
            return;
        }
        self.detach(id);
        let mut doomed = vec![id];
        doomed.extend(self.descendants(id));
        for node in &doomed {
            self.nodes.remove(*node);
        }
        self.listeners.retain(|l| !doomed.contains(&l.node));
    }

    /// Replace the children of `id` with parsed markup.
    ///
    /// Raw-text elements (`script`, `style`, `textarea`) get the markup
    /// as text.
    pub fn set_inner_html(&mut self, id: NodeId, html: &str) {
        if !self.contains(id) {
            return;
        }
        for child in self.children(id).to_vec() {
            self.remove(child);
        }
        let raw = self
            .tag(id)
            .is_some_and(|tag| RAW_TEXT_ELEMENTS.contains(&tag));
        if raw {
            if !html.is_empty() {
                let text = self.create_text(html);
                self.append_child(id, text);
            }
            if self.tag(id) == Some("textarea") {
                self.set_property(id, "value", Value::from(html));
            }
        } else {
            self.insert_parsed(id, parse_fragment(html));
        }
    }

    fn insert_parsed(&mut self, parent: NodeId, parsed: Vec<Parsed>) {
        for node in parsed {
            match node {
                Parsed::Text(text) => {
                    let id = self.create_text(&text);
                    self.append_child(parent, id);
                }
                Parsed::Element {
                    tag,
                    attributes,
                    children,
                } => {
                    let id = self.nodes.insert(Node {
                        parent: None,
                        children: Vec::new(),
                        data: NodeData::Element(Element {
                            tag,
                            attributes: attributes.into_iter().collect(),
                            properties: IndexMap::new(),
                        }),
                    });
                    self.append_child(parent, id);
                    self.insert_parsed(id, children);
                    self.init_properties(id);
                }
            }
        }
    }

    /// DOM properties an element starts with.
    fn init_properties(&mut self, id: NodeId) {
        let tag = match self.tag(id) {
            Some(tag) => tag.to_string(),
            None => return,
        };
        let mut props: Vec<(&str, Value)> = vec![
            ("id", Value::from(self.attribute(id, "id").unwrap_or(""))),
            ("hidden", Value::Bool(self.has_attribute(id, "hidden"))),
        ];
        let disabled = Value::Bool(self.has_attribute(id, "disabled"));
        match tag.as_str() {
            "input" => {
                props.push(("value", Value::from(self.attribute(id, "value").unwrap_or(""))));
                props.push(("checked", Value::Bool(self.has_attribute(id, "checked"))));
                props.push(("disabled", disabled));
            }
            "textarea" => {
                props.push(("value", Value::from(self.text_content(id))));
                props.push(("disabled", disabled));
            }
            "option" => {
                let value = match self.attribute(id, "value") {
                    Some(v) => v.to_string(),
                    None => self.text_content(id).trim().to_string(),
                };
                props.push(("value", Value::from(value)));
                props.push(("selected", Value::Bool(self.has_attribute(id, "selected"))));
                props.push(("disabled", disabled));
            }
            "select" | "button" => props.push(("disabled", disabled)),
            _ => {}
        }
        if let Some(element) = self.element_mut(id) {
            for (name, value) in props {
                element.properties.insert(name.to_string(), value);
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Navigation
    // ═══════════════════════════════════════════════════════════════════

    /// Parent of a node.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|n| n.parent)
    }

    /// Children of a node.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// All nodes below `id` in document order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev());
        }
        out
    }

    /// Elements below `id` in document order.
    pub fn descendant_elements(&self, id: NodeId) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|&n| self.is_element(n))
            .collect()
    }

    /// Whether `id` is `ancestor` or below it.
    pub fn is_inside(&self, id: NodeId, ancestor: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// Whether `id` is connected to the document node.
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.contains(id) && self.is_inside(id, self.root)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Queries
    // ═══════════════════════════════════════════════════════════════════

    /// First attached element with the given `id` attribute.
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.descendant_elements(self.root)
            .into_iter()
            .find(|&n| self.attribute(n, "id") == Some(id))
    }

    /// Attached elements carrying an attribute, in document order.
    pub fn elements_with_attribute(&self, name: &str) -> Vec<NodeId> {
        self.descendant_elements(self.root)
            .into_iter()
            .filter(|&n| self.has_attribute(n, name))
            .collect()
    }

    /// Attached elements with a tag name, in document order.
    pub fn elements_by_tag(&self, tag: &str) -> Vec<NodeId> {
        self.descendant_elements(self.root)
            .into_iter()
            .filter(|&n| self.tag(n) == Some(tag))
            .collect()
    }

    /// `input[name="..."]`: the radio or checkbox group of a name.
    pub fn input_group(&self, name: &str) -> Vec<NodeId> {
        self.elements_by_tag("input")
            .into_iter()
            .filter(|&n| self.attribute(n, "name") == Some(name))
            .collect()
    }

    // ═══════════════════════════════════════════════════════════════════
    // Elements and Attributes
    // ═══════════════════════════════════════════════════════════════════

    fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.nodes.get(id)?.data {
            NodeData::Element(element) => Some(element),
            _ => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes.get_mut(id)?.data {
            NodeData::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Whether `id` is an element.
    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    /// Tag name of an element, lowercase.
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.tag.as_str())
    }

    /// Attribute value.
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?.attributes.get(name).map(String::as_str)
    }

    /// Whether the attribute is present.
    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.element(id)
            .is_some_and(|e| e.attributes.contains_key(name))
    }

    /// Attributes in source order.
    pub fn attributes(&self, id: NodeId) -> Vec<(String, String)> {
        self.element(id)
            .map(|e| {
                e.attributes
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Set an attribute.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(element) = self.element_mut(id) {
            element.attributes.insert(name.to_string(), value.to_string());
        }
    }

    /// Remove an attribute, keeping the order of the others.
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Option<String> {
        self.element_mut(id)?.attributes.shift_remove(name)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Inline Style
    // ═══════════════════════════════════════════════════════════════════

    /// One inline style property.
    pub fn style(&self, id: NodeId, property: &str) -> Option<String> {
        let style = self.attribute(id, "style")?;
        parse_style(style)
            .into_iter()
            .find(|(k, _)| k == property)
            .map(|(_, v)| v)
    }

    /// Set one inline style property; an empty value removes it.
    pub fn set_style(&mut self, id: NodeId, property: &str, value: &str) {
        if !self.is_element(id) {
            return;
        }
        let mut style = parse_style(self.attribute(id, "style").unwrap_or(""));
        if value.is_empty() {
            style.shift_remove(property);
        } else {
            style.insert(property.to_string(), value.to_string());
        }
        let text = style
            .iter()
            .map(|(k, v)| format!("{}: {}", k, v))
            .collect::<Vec<_>>()
            .join("; ");
        if text.is_empty() {
            self.remove_attribute(id, "style");
        } else {
            self.set_attribute(id, "style", &text);
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Properties
    // ═══════════════════════════════════════════════════════════════════

    /// A DOM property.
    pub fn property(&self, id: NodeId, name: &str) -> Option<&Value> {
        self.element(id)?.properties.get(name)
    }

    /// Whether the element has the DOM property.
    pub fn has_property(&self, id: NodeId, name: &str) -> bool {
        self.element(id)
            .is_some_and(|e| e.properties.contains_key(name))
    }

    /// Set a DOM property. `id`, `hidden` and `disabled` reflect to their
    /// attributes.
    pub fn set_property(&mut self, id: NodeId, name: &str, value: Value) {
        match name {
            "id" => self.set_attribute(id, "id", &value.to_text()),
            "hidden" | "disabled" => {
                if value.truthy() {
                    self.set_attribute(id, name, "");
                } else {
                    self.remove_attribute(id, name);
                }
            }
            _ => {}
        }
        let value = match name {
            "checked" | "selected" | "hidden" | "disabled" => Value::Bool(value.truthy()),
            "value" | "id" => Value::from(value.to_text()),
            _ => value,
        };
        if let Some(element) = self.element_mut(id) {
            element.properties.insert(name.to_string(), value);
        }
    }

    /// Element type in the sense of a browser's `elem.type`.
    pub fn input_type(&self, id: NodeId) -> Option<String> {
        match self.tag(id)? {
            "input" => Some(
                self.attribute(id, "type")
                    .map(str::to_ascii_lowercase)
                    .unwrap_or_else(|| "text".to_string()),
            ),
            "select" if self.has_attribute(id, "multiple") => Some("select-multiple".to_string()),
            "select" => Some("select-one".to_string()),
            "textarea" => Some("textarea".to_string()),
            "button" => Some(
                self.attribute(id, "type")
                    .map(str::to_ascii_lowercase)
                    .unwrap_or_else(|| "submit".to_string()),
            ),
            _ => None,
        }
    }

    /// Current value of a form control; a select reports its selected
    /// option.
    pub fn value(&self, id: NodeId) -> String {
        if self.tag(id) == Some("select") {
            let options = self.options(id);
            let selected = options
                .iter()
                .find(|&&o| self.property(o, "selected").is_some_and(Value::truthy))
                .or_else(|| options.first());
            return selected
                .map(|&o| self.value(o))
                .unwrap_or_default();
        }
        self.property(id, "value").map(Value::to_text).unwrap_or_default()
    }

    /// Set the value of a form control; a select selects the matching
    /// option.
    pub fn set_value(&mut self, id: NodeId, value: &str) {
        if self.tag(id) == Some("select") {
            for option in self.options(id) {
                let selected = self.value(option) == value;
                self.set_property(option, "selected", Value::Bool(selected));
            }
            return;
        }
        self.set_property(id, "value", Value::from(value));
    }

    /// `checked` of a radio or checkbox.
    pub fn checked(&self, id: NodeId) -> bool {
        self.property(id, "checked").is_some_and(Value::truthy)
    }

    /// Set `checked`.
    pub fn set_checked(&mut self, id: NodeId, checked: bool) {
        self.set_property(id, "checked", Value::Bool(checked));
    }

    fn options(&self, select: NodeId) -> Vec<NodeId> {
        self.descendant_elements(select)
            .into_iter()
            .filter(|&n| self.tag(n) == Some("option"))
            .collect()
    }

    /// Concatenated text below `id`.
    pub fn text_content(&self, id: NodeId) -> String {
        match self.nodes.get(id).map(|n| &n.data) {
            Some(NodeData::Text(text)) => text.clone(),
            Some(_) => self
                .descendants(id)
                .into_iter()
                .filter_map(|n| match &self.nodes.get(n)?.data {
                    NodeData::Text(text) => Some(text.as_str()),
                    _ => None,
                })
                .collect(),
            None => String::new(),
        }
    }
}

fn parse_style(style: &str) -> IndexMap<String, String> {
    style
        .split(';')
        .filter_map(|decl| {
            let (k, v) = decl.split_once(':')?;
            let (k, v) = (k.trim(), v.trim());
            (!k.is_empty()).then(|| (k.to_string(), v.to_string()))
        })
        .collect()
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &self.nodes.len())
            .field("listeners", &self.listeners.len())
            .field("markup", &self.inner_html(self.root))
            .finish()
    }
}
