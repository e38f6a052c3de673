//! Change callbacks attached to observed nodes

use std::cell::RefCell;
use std::rc::Rc;

use tracing::trace;

use crate::Value;

/// Callback invoked synchronously after an observed write.
pub type ChangeCallback = Rc<dyn Fn(&Change)>;

/// One observed write.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    /// Dotted path of the written cell, relative to the observed root
    /// (`user.name`, `items.length`)
    pub path: String,

    /// Key written on the owning node (`length` for list mutators)
    pub key: String,

    /// The new value (the new length for list mutators)
    pub value: Value,
}

/// A callback together with the path of the node it is attached to.
#[derive(Clone)]
pub(crate) struct Observer {
    callback: ChangeCallback,
    path: Rc<str>,
}

impl Observer {
    pub(crate) fn root(callback: ChangeCallback) -> Self {
        Self {
            callback,
            path: Rc::from(""),
        }
    }

    /// The observer for a child node stored under `key`.
    pub(crate) fn child(&self, key: &str) -> Self {
        Self {
            callback: Rc::clone(&self.callback),
            path: Rc::from(join_path(&self.path, key)),
        }
    }

    pub(crate) fn path(&self) -> &str {
        &self.path
    }

    pub(crate) fn same_callback(&self, other: &Observer) -> bool {
        Rc::ptr_eq(&self.callback, &other.callback)
    }

    pub(crate) fn notify(&self, key: &str, value: &Value) {
        let change = Change {
            path: join_path(&self.path, key),
            key: key.to_string(),
            value: value.clone(),
        };
        trace!(path = %change.path, "observed write");
        (self.callback)(&change);
    }
}

fn join_path(base: &str, key: &str) -> String {
    if base.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", base, key)
    }
}

/// The subscriber list of one observed node.
#[derive(Default)]
pub(crate) struct Subscribers {
    observers: RefCell<Vec<Observer>>,
}

impl Subscribers {
    /// Whether this callback already intercepts the node.
    pub(crate) fn contains(&self, observer: &Observer) -> bool {
        self.observers
            .borrow()
            .iter()
            .any(|o| o.same_callback(observer))
    }

    pub(crate) fn attach(&self, observer: Observer) {
        self.observers.borrow_mut().push(observer);
    }

    /// Remove `callback`, returning whether it was attached.
    pub(crate) fn detach(&self, callback: &ChangeCallback) -> bool {
        let mut observers = self.observers.borrow_mut();
        let before = observers.len();
        observers.retain(|o| !Rc::ptr_eq(&o.callback, callback));
        observers.len() != before
    }

    /// Copy of the list, so callbacks may observe or write freely.
    pub(crate) fn snapshot(&self) -> Vec<Observer> {
        self.observers.borrow().clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.observers.borrow().len()
    }

    pub(crate) fn notify(&self, key: &str, value: &Value) {
        for observer in self.snapshot() {
            observer.notify(key, value);
        }
    }
}
