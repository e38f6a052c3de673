//! Reactive observation of data graphs
//!
//! Objects and lists are shared, interior-mutable containers. Observing a
//! graph attaches a change callback to every container reachable from the
//! root; every later write goes through the container API, which stores
//! the new value first and then notifies the attached callbacks.
//!
//! # Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use vmbind::reactive::{observe, Change};
//! use vmbind::Value;
//!
//! let data = Value::from(serde_json::json!({"user": {"name": "ann"}}));
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let sink = Rc::clone(&seen);
//! observe(&data, Rc::new(move |change: &Change| sink.borrow_mut().push(change.path.clone()))).unwrap();
//!
//! let user = data.get_property("user");
//! user.as_object().unwrap().set("name", Value::from("bob")).unwrap();
//! assert_eq!(*seen.borrow(), vec!["user.name".to_string()]);
//! ```

mod list;
mod object;
mod subscribers;

pub use list::{ObservableList, MAX_PADDING};
pub use object::ObservedObject;
pub use subscribers::{Change, ChangeCallback};

pub(crate) use subscribers::{Observer, Subscribers};

use std::collections::HashSet;

use crate::error::ObserveError;
use crate::Value;

/// Instrument every container reachable from `root` with `on_change`.
///
/// Returns the same value (containers are shared, so the caller's handle
/// is now observed too). Observing a graph twice with the same callback
/// attaches nothing new. Scalars are returned unchanged.
///
/// # Errors
///
/// [`ObserveError::Cyclic`] when a container contains one of its own
/// ancestors.
pub fn observe(root: &Value, on_change: ChangeCallback) -> Result<Value, ObserveError> {
    let observer = Observer::root(on_change);
    let mut wrapping = Vec::new();
    wrap(root, &observer, &mut wrapping)?;
    Ok(root.clone())
}

/// Detach `on_change` from every container reachable from `root`.
///
/// Returns how many containers it was attached to.
pub fn unobserve(root: &Value, on_change: &ChangeCallback) -> usize {
    let mut visited = HashSet::new();
    let mut stack = vec![root.clone()];
    let mut detached = 0;
    while let Some(current) = stack.pop() {
        let (id, children) = match &current {
            Value::Object(object) => (object.id(), object.values()),
            Value::List(list) => (list.id(), list.to_vec()),
            _ => continue,
        };
        if !visited.insert(id) {
            continue;
        }
        let attached = match &current {
            Value::Object(object) => object.subscribers().detach(on_change),
            Value::List(list) => list.subscribers().detach(on_change),
            _ => false,
        };
        if attached {
            detached += 1;
        }
        stack.extend(children);
    }
    detached
}

/// Attach `observer` to `value` and its descendants.
///
/// `wrapping` holds the identities of the containers on the current
/// recursion path.
pub(crate) fn wrap(
    value: &Value,
    observer: &Observer,
    wrapping: &mut Vec<usize>,
) -> Result<(), ObserveError> {
    match value {
        Value::Object(object) => object.wrap(observer, wrapping),
        Value::List(list) => list.wrap(observer, wrapping),
        _ => Ok(()),
    }
}

/// Whether storing `value` inside the container `target` would close a
/// cycle, i.e. `target` is reachable from `value`.
pub(crate) fn reaches(value: &Value, target: usize) -> bool {
    let mut visited = HashSet::new();
    let mut stack = vec![value.clone()];
    while let Some(current) = stack.pop() {
        let (id, children) = match &current {
            Value::Object(object) => (object.id(), object.values()),
            Value::List(list) => (list.id(), list.to_vec()),
            _ => continue,
        };
        if id == target {
            return true;
        }
        if visited.insert(id) {
            stack.extend(children);
        }
    }
    false
}

/// Check a pending write and attach the owner's observers to the value.
pub(crate) fn adopt(
    value: &Value,
    owner: usize,
    key: &str,
    observers: &[Observer],
) -> Result<(), ObserveError> {
    if !value.is_container() {
        return Ok(());
    }
    if reaches(value, owner) {
        let path = observers
            .first()
            .map(|o| o.child(key).path().to_string())
            .unwrap_or_else(|| key.to_string());
        return Err(ObserveError::Cyclic { path });
    }
    for observer in observers {
        wrap(value, &observer.child(key), &mut Vec::new())?;
    }
    Ok(())
}
