//! Observed objects: ordered maps of reactive cells

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use super::{Observer, Subscribers};
use crate::error::ObserveError;
use crate::Value;

/// A shared, ordered map whose writes notify the attached observers.
///
/// Cloning the handle shares the object; equality of handles is identity.
#[derive(Clone, Default)]
pub struct ObservedObject {
    inner: Rc<ObjectInner>,
}

#[derive(Default)]
struct ObjectInner {
    cells: RefCell<IndexMap<String, Value>>,
    subscribers: Subscribers,
}

impl ObservedObject {
    /// Create an empty object.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an object from key/value pairs (later keys win).
    pub fn from_entries<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let cells = entries.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Self {
            inner: Rc::new(ObjectInner {
                cells: RefCell::new(cells),
                subscribers: Subscribers::default(),
            }),
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Reads
    // ═══════════════════════════════════════════════════════════════════

    /// Current value of a cell, `undefined` when absent.
    pub fn get(&self, key: &str) -> Value {
        self.inner
            .cells
            .borrow()
            .get(key)
            .cloned()
            .unwrap_or(Value::Undefined)
    }

    /// Whether the key exists.
    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.cells.borrow().contains_key(key)
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.inner.cells.borrow().keys().cloned().collect()
    }

    /// Values in insertion order.
    pub fn values(&self) -> Vec<Value> {
        self.inner.cells.borrow().values().cloned().collect()
    }

    /// Snapshot of all entries in insertion order.
    pub fn entries(&self) -> Vec<(String, Value)> {
        self.inner
            .cells
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.inner.cells.borrow().len()
    }

    /// Whether the object has no keys.
    pub fn is_empty(&self) -> bool {
        self.inner.cells.borrow().is_empty()
    }

    // ═══════════════════════════════════════════════════════════════════
    // Writes
    // ═══════════════════════════════════════════════════════════════════

    /// Write a cell.
    ///
    /// Returns `Ok(false)` without notifying when the cell already holds
    /// an identical value. Container values are observed by this object's
    /// observers before they are stored; the cell is updated before any
    /// callback runs. Function values are stored silently.
    ///
    /// # Errors
    ///
    /// [`ObserveError::Cyclic`] when the value contains this object. The
    /// cell is left unchanged.
    pub fn set(&self, key: impl Into<String>, value: Value) -> Result<bool, ObserveError> {
        let key = key.into();
        let previous = self.inner.cells.borrow().get(&key).cloned();
        if previous.as_ref() == Some(&value) {
            return Ok(false);
        }

        if value.is_callable() {
            self.inner.cells.borrow_mut().insert(key, value);
            return Ok(true);
        }

        let observers = self.inner.subscribers.snapshot();
        super::adopt(&value, self.id(), &key, &observers)?;

        self.inner.cells.borrow_mut().insert(key.clone(), value.clone());
        for observer in &observers {
            observer.notify(&key, &value);
        }
        Ok(true)
    }

    /// Remove a cell, notifying with `undefined` when it existed.
    pub fn remove(&self, key: &str) -> Option<Value> {
        let removed = self.inner.cells.borrow_mut().shift_remove(key)?;
        if !removed.is_callable() {
            self.inner.subscribers.notify(key, &Value::Undefined);
        }
        Some(removed)
    }

    /// Store a value without observing or notifying.
    ///
    /// Meant for assembling data before it is handed to
    /// [`observe`](super::observe).
    pub fn insert_unobserved(&self, key: impl Into<String>, value: Value) {
        self.inner.cells.borrow_mut().insert(key.into(), value);
    }

    // ═══════════════════════════════════════════════════════════════════
    // Identity and Observation
    // ═══════════════════════════════════════════════════════════════════

    /// Whether two handles refer to the same object.
    pub fn ptr_eq(&self, other: &ObservedObject) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Stable identity of the shared object.
    pub fn id(&self) -> usize {
        Rc::as_ptr(&self.inner) as usize
    }

    /// Whether any callback is attached.
    pub fn is_observed(&self) -> bool {
        self.inner.subscribers.len() > 0
    }

    /// Number of attached callbacks.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }

    pub(crate) fn subscribers(&self) -> &Subscribers {
        &self.inner.subscribers
    }

    pub(crate) fn wrap(
        &self,
        observer: &Observer,
        wrapping: &mut Vec<usize>,
    ) -> Result<(), ObserveError> {
        let id = self.id();
        if wrapping.contains(&id) {
            return Err(ObserveError::Cyclic {
                path: observer.path().to_string(),
            });
        }
        if self.inner.subscribers.contains(observer) {
            return Ok(());
        }
        self.inner.subscribers.attach(observer.clone());

        let children: Vec<(String, Value)> = self
            .entries()
            .into_iter()
            .filter(|(_, v)| v.is_container())
            .collect();

        wrapping.push(id);
        let result = children
            .iter()
            .try_for_each(|(key, value)| super::wrap(value, &observer.child(key), wrapping));
        wrapping.pop();
        result
    }
}

impl std::fmt::Debug for ObservedObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", Value::Object(self.clone()))
    }
}
