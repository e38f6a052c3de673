//! Named controller roots

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use indexmap::IndexMap;

use crate::binding::{BindingDescriptor, Controller};
use crate::dom::{Document, NodeId};
use crate::reactive::ChangeCallback;
use crate::Value;

/// Handle returned when adding an observe listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserveListenerId(pub u64);

/// Callbacks run after every flush of one controller root.
///
/// Shared between the application context and the data hooks installed
/// by `define`.
#[derive(Clone, Default)]
pub(crate) struct ObserveListeners {
    listeners: Rc<RefCell<IndexMap<u64, Value>>>,
    next: Rc<Cell<u64>>,
}

impl ObserveListeners {
    pub(crate) fn add(&self, listener: Value) -> ObserveListenerId {
        let id = self.next.get() + 1;
        self.next.set(id);
        self.listeners.borrow_mut().insert(id, listener);
        ObserveListenerId(id)
    }

    pub(crate) fn remove(&self, id: ObserveListenerId) -> bool {
        self.listeners.borrow_mut().shift_remove(&id.0).is_some()
    }

    /// Remove every registration of `listener`.
    pub(crate) fn remove_value(&self, listener: &Value) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|_, l| l != listener);
        listeners.len() != before
    }

    pub(crate) fn snapshot(&self) -> Vec<Value> {
        self.listeners.borrow().values().cloned().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.borrow().len()
    }
}

/// A discovered binding and, once data is defined, its controller.
pub(crate) struct Slot {
    pub(crate) descriptor: BindingDescriptor,
    pub(crate) controller: Option<Box<dyn Controller>>,
}

/// One named binding scope.
pub(crate) struct ControllerRoot {
    /// Scan boundaries, in registration order
    pub(crate) elements: Vec<NodeId>,
    /// Bindings in discovery order
    pub(crate) slots: Vec<Slot>,
    pub(crate) data: Option<Value>,
    /// Schedules this root's flush; attached to `data`
    pub(crate) on_change: Option<ChangeCallback>,
    pub(crate) listeners: ObserveListeners,
}

impl ControllerRoot {
    fn new() -> Self {
        Self {
            elements: Vec::new(),
            slots: Vec::new(),
            data: None,
            on_change: None,
            listeners: ObserveListeners::default(),
        }
    }

    /// Drop every controller, keeping the descriptors.
    pub(crate) fn detach_all(&mut self, document: &mut Document) {
        for slot in &mut self.slots {
            if let Some(mut controller) = slot.controller.take() {
                controller.detach(document);
            }
        }
    }

    pub(crate) fn controller_count(&self) -> usize {
        self.slots.iter().filter(|s| s.controller.is_some()).count()
    }
}

/// Every controller root of an application context, by name.
#[derive(Default)]
pub(crate) struct Registry {
    roots: IndexMap<String, ControllerRoot>,
}

impl Registry {
    pub(crate) fn get(&self, name: &str) -> Option<&ControllerRoot> {
        self.roots.get(name)
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut ControllerRoot> {
        self.roots.get_mut(name)
    }

    /// The root named `name`, created empty on first use.
    pub(crate) fn entry(&mut self, name: &str) -> &mut ControllerRoot {
        self.roots
            .entry(name.to_string())
            .or_insert_with(ControllerRoot::new)
    }

    pub(crate) fn names(&self) -> Vec<String> {
        self.roots.keys().cloned().collect()
    }

    /// Name of the root whose boundary element is nearest above (or is)
    /// `element`.
    pub(crate) fn owner(&self, document: &Document, element: NodeId) -> Option<String> {
        let mut current = Some(element);
        while let Some(node) = current {
            if let Some((name, _)) = self.roots.iter().find(|(_, r)| r.elements.contains(&node)) {
                return Some(name.clone());
            }
            current = document.parent(node);
        }
        None
    }

    /// Whether `element` is already a boundary of some root.
    pub(crate) fn is_boundary(&self, element: NodeId) -> bool {
        self.roots.values().any(|r| r.elements.contains(&element))
    }
}
