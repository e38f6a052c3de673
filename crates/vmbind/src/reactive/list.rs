//! Observable lists

use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::Rc;

use super::{Observer, Subscribers};
use crate::error::ObserveError;
use crate::Value;

/// Most `undefined` slots a single index write may pad with.
pub const MAX_PADDING: usize = 1 << 16;

/// A shared list whose mutators notify the attached observers.
///
/// Every structural mutator fires exactly one notification, keyed
/// `length`, carrying the new length. New elements are observed before
/// they are stored.
#[derive(Clone, Default)]
pub struct ObservableList {
    inner: Rc<ListInner>,
}

#[derive(Default)]
struct ListInner {
    items: RefCell<Vec<Value>>,
    subscribers: Subscribers,
}

impl ObservableList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a list holding `items`.
    pub fn from_vec(items: Vec<Value>) -> Self {
        Self {
            inner: Rc::new(ListInner {
                items: RefCell::new(items),
                subscribers: Subscribers::default(),
            }),
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Reads
    // ═══════════════════════════════════════════════════════════════════

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.inner.items.borrow().len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.items.borrow().is_empty()
    }

    /// Element at `index`, `undefined` when out of range.
    pub fn get(&self, index: usize) -> Value {
        self.inner
            .items
            .borrow()
            .get(index)
            .cloned()
            .unwrap_or(Value::Undefined)
    }

    /// Snapshot of the elements.
    pub fn to_vec(&self) -> Vec<Value> {
        self.inner.items.borrow().clone()
    }

    /// Position of the first strictly equal element.
    pub fn index_of(&self, value: &Value) -> Option<usize> {
        self.inner.items.borrow().iter().position(|v| v == value)
    }

    /// Join the text form of the elements.
    pub fn join(&self, separator: &str) -> String {
        self.inner
            .items
            .borrow()
            .iter()
            .map(Value::to_text)
            .collect::<Vec<_>>()
            .join(separator)
    }

    /// A new, unobserved list with `other` appended. Does not notify.
    pub fn concat(&self, other: &[Value]) -> ObservableList {
        let mut items = self.to_vec();
        items.extend_from_slice(other);
        ObservableList::from_vec(items)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Mutators
    // ═══════════════════════════════════════════════════════════════════

    /// Append an element, returning the new length.
    pub fn push(&self, value: Value) -> Result<usize, ObserveError> {
        self.adopt(&[value.clone()])?;
        self.inner.items.borrow_mut().push(value);
        Ok(self.changed())
    }

    /// Remove and return the last element.
    pub fn pop(&self) -> Value {
        let popped = self.inner.items.borrow_mut().pop();
        match popped {
            Some(value) => {
                self.changed();
                value
            }
            None => Value::Undefined,
        }
    }

    /// Remove and return the first element.
    pub fn shift(&self) -> Value {
        let shifted = {
            let mut items = self.inner.items.borrow_mut();
            if items.is_empty() {
                None
            } else {
                Some(items.remove(0))
            }
        };
        match shifted {
            Some(value) => {
                self.changed();
                value
            }
            None => Value::Undefined,
        }
    }

    /// Prepend an element, returning the new length.
    pub fn unshift(&self, value: Value) -> Result<usize, ObserveError> {
        self.adopt(&[value.clone()])?;
        self.inner.items.borrow_mut().insert(0, value);
        Ok(self.changed())
    }

    /// Remove `delete_count` elements at `start` and insert `items` there.
    ///
    /// `start` is clamped to the length. Returns the removed elements.
    pub fn splice(
        &self,
        start: usize,
        delete_count: usize,
        items: Vec<Value>,
    ) -> Result<Vec<Value>, ObserveError> {
        self.adopt(&items)?;
        let removed: Vec<Value> = {
            let mut current = self.inner.items.borrow_mut();
            let start = start.min(current.len());
            let end = start.saturating_add(delete_count).min(current.len());
            current.splice(start..end, items).collect()
        };
        self.changed();
        Ok(removed)
    }

    /// Reverse in place.
    pub fn reverse(&self) {
        self.inner.items.borrow_mut().reverse();
        self.changed();
    }

    /// Sort by text form; `undefined` sorts last.
    pub fn sort(&self) {
        self.sort_by(|a, b| match (a.is_undefined(), b.is_undefined()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => a.to_string().cmp(&b.to_string()),
        });
    }

    /// Stable sort with a comparator.
    pub fn sort_by<F>(&self, compare: F)
    where
        F: FnMut(&Value, &Value) -> Ordering,
    {
        self.inner.items.borrow_mut().sort_by(compare);
        self.changed();
    }

    /// Replace the element at `index`, padding with `undefined` when
    /// writing past the end.
    ///
    /// Notifies with the index as key; returns `Ok(false)` when the slot
    /// already held an identical value.
    ///
    /// # Errors
    ///
    /// [`ObserveError::IndexOutOfRange`] when `index` lies more than
    /// [`MAX_PADDING`] elements past the end.
    pub fn set(&self, index: usize, value: Value) -> Result<bool, ObserveError> {
        let len = self.len();
        if index < len && self.get(index) == value {
            return Ok(false);
        }
        if index.saturating_sub(len) > MAX_PADDING {
            return Err(ObserveError::IndexOutOfRange { index, len });
        }
        let key = index.to_string();
        let observers = self.inner.subscribers.snapshot();
        super::adopt(&value, self.id(), &key, &observers)?;
        {
            let mut items = self.inner.items.borrow_mut();
            if index >= items.len() {
                items.resize(index.saturating_add(1), Value::Undefined);
            }
            items[index] = value.clone();
        }
        for observer in &observers {
            observer.notify(&key, &value);
        }
        Ok(true)
    }

    /// Store an element without observing or notifying.
    pub fn push_unobserved(&self, value: Value) {
        self.inner.items.borrow_mut().push(value);
    }

    // ═══════════════════════════════════════════════════════════════════
    // Identity and Observation
    // ═══════════════════════════════════════════════════════════════════

    /// Whether two handles refer to the same list.
    pub fn ptr_eq(&self, other: &ObservableList) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Stable identity of the shared list.
    pub fn id(&self) -> usize {
        Rc::as_ptr(&self.inner) as usize
    }

    /// Whether any callback is attached.
    pub fn is_observed(&self) -> bool {
        self.inner.subscribers.len() > 0
    }

    /// Observe incoming elements with every attached observer.
    fn adopt(&self, incoming: &[Value]) -> Result<(), ObserveError> {
        let observers = self.inner.subscribers.snapshot();
        let base = self.len();
        for (offset, value) in incoming.iter().enumerate() {
            super::adopt(value, self.id(), &(base + offset).to_string(), &observers)?;
        }
        Ok(())
    }

    /// Fire the single `length` notification for a structural change.
    fn changed(&self) -> usize {
        let len = self.len();
        self.inner.subscribers.notify("length", &Value::from(len));
        len
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

        let items = self.to_vec();
        wrapping.push(id);
        let result = items
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_container())
            .try_for_each(|(i, v)| super::wrap(v, &observer.child(&i.to_string()), wrapping));
        wrapping.pop();
        result
    }
}

impl std::fmt::Debug for ObservableList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", Value::List(self.clone()))
    }
}
