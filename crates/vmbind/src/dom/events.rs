//! Element event subscriptions and synthetic dispatch

use std::rc::Rc;

use slotmap::Key;

use super::{Document, NodeId};
use crate::Value;

/// A subscribed event handler.
pub type Listener = Rc<dyn Fn(&Document, &Event)>;

/// Handle returned by [`Document::on`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// An event delivered to listeners.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Event name, e.g. `input` or `click`
    pub kind: String,
    /// The element the event was dispatched on
    pub target: NodeId,
}

impl Event {
    /// The event as an interpreter value: `{type, target}`, with the
    /// target given as its numeric node key.
    pub fn to_value(&self) -> Value {
        Value::object([
            ("type", Value::from(self.kind.as_str())),
            ("target", Value::from(self.target.data().as_ffi() as f64)),
        ])
    }
}

pub(crate) struct Registered {
    pub(crate) id: ListenerId,
    pub(crate) node: NodeId,
    pub(crate) event: String,
    pub(crate) listener: Listener,
}

impl Document {
    /// Subscribe `listener` to `event` on `node`.
    pub fn on(&mut self, node: NodeId, event: &str, listener: Listener) -> ListenerId {
        self.next_listener += 1;
        let id = ListenerId(self.next_listener);
        self.listeners.push(Registered {
            id,
            node,
            event: event.to_string(),
            listener,
        });
        id
    }

    /// Unsubscribe one listener of `event` on `node`. Returns whether it
    /// was found.
    pub fn off(&mut self, node: NodeId, event: &str, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners
            .retain(|l| !(l.id == id && l.node == node && l.event == event));
        self.listeners.len() != before
    }

    /// Unsubscribe every listener of `event` on `node`.
    pub fn off_all(&mut self, node: NodeId, event: &str) -> usize {
        let before = self.listeners.len();
        self.listeners
            .retain(|l| !(l.node == node && l.event == event));
        before - self.listeners.len()
    }

    /// Synthetic notify: call every listener of `event` on `node`, in
    /// subscription order. Returns how many ran.
    ///
    /// Listeners added or removed by a running listener take effect on
    /// the next dispatch.
    pub fn trigger(&self, node: NodeId, event: &str) -> usize {
        let matching: Vec<Listener> = self
            .listeners
            .iter()
            .filter(|l| l.node == node && l.event == event)
            .map(|l| Rc::clone(&l.listener))
            .collect();
        let dispatched = Event {
            kind: event.to_string(),
            target: node,
        };
        for listener in &matching {
            listener(self, &dispatched);
        }
        matching.len()
    }

    /// Number of listeners of `event` on `node`.
    pub fn listener_count(&self, node: NodeId, event: &str) -> usize {
        self.listeners
            .iter()
            .filter(|l| l.node == node && l.event == event)
            .count()
    }
}
