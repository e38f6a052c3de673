//! Directive discovery and liveness
//!
//! A scan walks the descendants of one element depth-first. Every
//! `vm-<kind>[-<suffix>]` attribute becomes a [`BindingDescriptor`]; the
//! attribute is stripped and a unique empty marker attribute (`vm_<n>`)
//! is added instead, so a later sweep can tell whether the element is
//! still part of its controller's markup. `<script>` subtrees are never
//! scanned and a nested `vm-controller` element ends the walk on that
//! branch: its subtree belongs to another controller root.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::binding::{BindingDescriptor, BindingKind};
use crate::config::Liveness;
use crate::dom::{Document, NodeId};

/// Attribute declaring a controller root.
pub const CONTROLLER_ATTRIBUTE: &str = "vm-controller";

static DIRECTIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^vm-([a-z]+)(?:-(.+))?$").expect("valid regex"));

/// Source of unique marker attribute names.
#[derive(Debug, Default)]
pub struct Markers {
    next: u64,
}

impl Markers {
    /// Next unused marker.
    pub fn next_marker(&mut self) -> String {
        self.next += 1;
        format!("vm_{}", self.next)
    }
}

/// What a scan found.
#[derive(Debug, Default)]
pub struct Scan {
    /// Directives, in document order
    pub descriptors: Vec<BindingDescriptor>,
    /// Nested controller boundaries: `(name, element)`
    pub controllers: Vec<(String, NodeId)>,
}

/// Scan the descendants of `element`.
pub fn scan(document: &mut Document, element: NodeId, markers: &mut Markers) -> Scan {
    let mut found = Scan::default();
    let mut stack: Vec<NodeId> = document.children(element).iter().rev().copied().collect();

    while let Some(node) = stack.pop() {
        match document.tag(node) {
            None | Some("script") => continue,
            Some(_) => {}
        }
        if let Some(name) = document.attribute(node, CONTROLLER_ATTRIBUTE) {
            if !name.is_empty() {
                found.controllers.push((name.to_string(), node));
            }
            continue;
        }

        for (name, value) in document.attributes(node) {
            let captures = match DIRECTIVE.captures(&name) {
                Some(captures) => captures,
                None => continue,
            };
            let kind = match BindingKind::from_name(&captures[1]) {
                Some(kind) => kind,
                None => {
                    debug!(directive = %name, "unknown directive left in place");
                    continue;
                }
            };
            let marker = markers.next_marker();
            document.remove_attribute(node, &name);
            document.set_attribute(node, &marker, "");
            found.descriptors.push(BindingDescriptor {
                element: node,
                marker,
                suffix: captures.get(2).map(|m| m.as_str().to_string()),
                name,
                value,
                kind,
            });
        }
        stack.extend(document.children(node).iter().rev());
    }

    debug!(
        bindings = found.descriptors.len(),
        controllers = found.controllers.len(),
        "scan complete"
    );
    found
}

/// Decides liveness of bound elements against a set of root elements.
pub struct LivenessCheck<'a> {
    document: &'a Document,
    roots: &'a [NodeId],
    strategy: Liveness,
    markup: String,
}

impl<'a> LivenessCheck<'a> {
    /// Prepare a check; the markup strategy serializes the roots once.
    pub fn new(document: &'a Document, roots: &'a [NodeId], strategy: Liveness) -> Self {
        let markup = match strategy {
            Liveness::Markup => roots.iter().map(|&r| document.inner_html(r)).collect(),
            Liveness::Arena => String::new(),
        };
        Self {
            document,
            roots,
            strategy,
            markup,
        }
    }

    /// Whether the binding described by `descriptor` is still live.
    pub fn is_live(&self, descriptor: &BindingDescriptor) -> bool {
        match self.strategy {
            Liveness::Arena => {
                let element = descriptor.element;
                self.document.contains(element)
                    && self
                        .roots
                        .iter()
                        .any(|&root| root != element && self.document.is_inside(element, root))
            }
            Liveness::Markup => self.markup.contains(&format!("{}=", descriptor.marker)),
        }
    }
}
