//! Application context
//!
//! [`Vm`] owns the document, the template engine, the controller
//! registry and the scheduler. Data changes and scans only schedule
//! work; it runs when the host moves virtual time forward with
//! [`Vm::advance`] or [`Vm::run_until_idle`].
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use vmbind::{Document, Value, Vm};
//!
//! let document = Document::parse(r#"<div vm-controller="app"><b vm-html="count"></b></div>"#);
//! let mut vm = Vm::new(document);
//! let data = vm.define("app", Value::from(json!({"count": 1}))).unwrap();
//! vm.run_until_idle().unwrap();
//!
//! data.as_object().unwrap().set("count", Value::from(2)).unwrap();
//! vm.run_until_idle().unwrap();
//! let b = vm.document().elements_by_tag("b")[0];
//! assert_eq!(vm.document().text_content(b), "2");
//! ```

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::binding::{create, BindCx, UpdateCx};
use crate::config::VmConfig;
use crate::dom::{Document, NodeId};
use crate::error::{type_name, VmError};
use crate::reactive::{observe, unobserve, Change, ChangeCallback, ObservedObject};
use crate::registry::{ObserveListenerId, ObserveListeners, Registry, Slot};
use crate::scan::{scan, LivenessCheck, Markers, CONTROLLER_ATTRIBUTE};
use crate::scheduler::{Scheduler, Task};
use crate::template::TemplateEngine;
use crate::Value;

/// Data hook adding an observe listener.
pub const ADD_OBSERVE_HOOK: &str = "__addObserveEvent__";
/// Data hook removing an observe listener.
pub const REMOVE_OBSERVE_HOOK: &str = "__removeObserveEvent__";
/// Data hook requesting a flush.
pub const UPDATE_HOOK: &str = "__update__";

/// Reactive bindings over one document.
pub struct Vm {
    document: Document,
    engine: TemplateEngine,
    config: VmConfig,
    registry: Registry,
    markers: Markers,
    scheduler: Rc<RefCell<Scheduler>>,
}

impl Vm {
    /// Bind `document` with the default configuration.
    pub fn new(document: Document) -> Self {
        Self::with_config(document, VmConfig::default())
    }

    /// Bind `document`.
    ///
    /// Every `<script type="text/template" id="..">` is compiled into the
    /// template cache under its id, and every `vm-controller` element is
    /// registered under its named root and scanned.
    pub fn with_config(document: Document, config: VmConfig) -> Self {
        let engine = TemplateEngine::with_context(config.eval_context());
        let defaults = config.template.clone();
        engine.config(|options| *options = defaults);

        let mut vm = Self {
            document,
            engine,
            config,
            registry: Registry::default(),
            markers: Markers::default(),
            scheduler: Rc::new(RefCell::new(Scheduler::new())),
        };
        vm.register_templates();
        for element in vm.document.elements_with_attribute(CONTROLLER_ATTRIBUTE) {
            let name = vm
                .document
                .attribute(element, CONTROLLER_ATTRIBUTE)
                .unwrap_or_default()
                .to_string();
            if !name.is_empty() {
                vm.add_boundary(&name, element);
            }
        }
        vm
    }

    fn register_templates(&mut self) {
        for script in self.document.elements_by_tag("script") {
            if self.document.attribute(script, "type") != Some("text/template") {
                continue;
            }
            if let Some(id) = self.document.attribute(script, "id") {
                debug!(id, "template registered");
                self.engine.register(id, &self.document.text_content(script));
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Data
    // ═══════════════════════════════════════════════════════════════════

    /// Observe `data` and bind it to the controller root `name`.
    ///
    /// Returns the observed data; writes through it schedule a flush.
    /// Defining a name again replaces its data and rebuilds every
    /// controller against the new data.
    ///
    /// # Errors
    ///
    /// [`VmError::Observe`] when `data` is cyclic.
    pub fn define(&mut self, name: &str, data: Value) -> Result<Value, VmError> {
        let on_change = self.change_callback(name);
        // Release replaced data first so subtrees it shares with the new
        // data are attached again under their new paths.
        let previous = self.registry.entry(name).data.clone().filter(|previous| *previous != data);
        if let Some(previous) = &previous {
            let detached = unobserve(previous, &on_change);
            trace!(controller = name, detached, "previous data released");
        }
        let data = match observe(&data, Rc::clone(&on_change)) {
            Ok(data) => data,
            Err(err) => {
                if let Some(previous) = &previous {
                    if let Err(restore) = observe(previous, Rc::clone(&on_change)) {
                        warn!(controller = name, error = %restore, "previous data left unobserved");
                    }
                }
                return Err(err.into());
            }
        };

        let listeners = self.registry.entry(name).listeners.clone();
        if let Some(object) = data.as_object() {
            self.install_hooks(name, object, &listeners)?;
        }

        let root = self.registry.entry(name);
        if root.data.is_some() {
            root.detach_all(&mut self.document);
        }
        root.data = Some(data.clone());
        debug!(controller = name, bindings = root.slots.len(), "data defined");
        self.init_node(name);
        Ok(data)
    }

    /// The root's flush scheduler, created on first use and shared by
    /// every `define` of that root.
    fn change_callback(&mut self, name: &str) -> ChangeCallback {
        let root = self.registry.entry(name);
        if let Some(on_change) = &root.on_change {
            return Rc::clone(on_change);
        }
        let scheduler = Rc::clone(&self.scheduler);
        let task = Task::Flush(name.to_string());
        let delay = self.config.flush_delay();
        let on_change: ChangeCallback = Rc::new(move |change: &Change| {
            trace!(path = %change.path, "data changed");
            scheduler.borrow_mut().schedule(task.clone(), delay);
        });
        root.on_change = Some(Rc::clone(&on_change));
        on_change
    }

    fn install_hooks(
        &self,
        name: &str,
        data: &ObservedObject,
        listeners: &ObserveListeners,
    ) -> Result<(), VmError> {
        let add = listeners.clone();
        data.set(
            ADD_OBSERVE_HOOK,
            Value::builtin(ADD_OBSERVE_HOOK, 1, move |args| {
                if !args[0].is_callable() {
                    return Err(format!(
                        "observe listener must be a function, found {}",
                        type_name(&args[0])
                    ));
                }
                Ok(Value::from(add.add(args[0].clone()).0 as f64))
            }),
        )?;

        let remove = listeners.clone();
        data.set(
            REMOVE_OBSERVE_HOOK,
            Value::builtin(REMOVE_OBSERVE_HOOK, 1, move |args| {
                let removed = match &args[0] {
                    Value::Number(id) => remove.remove(ObserveListenerId(*id as u64)),
                    listener => remove.remove_value(listener),
                };
                Ok(Value::Bool(removed))
            }),
        )?;

        let scheduler = Rc::clone(&self.scheduler);
        let task = Task::Flush(name.to_string());
        let delay = self.config.flush_delay();
        data.set(
            UPDATE_HOOK,
            Value::builtin(UPDATE_HOOK, 0, move |_| {
                scheduler.borrow_mut().schedule(task.clone(), delay);
                Ok(Value::Undefined)
            }),
        )?;
        Ok(())
    }

    /// Data bound to `name`.
    pub fn data(&self, name: &str) -> Option<Value> {
        self.registry.get(name).and_then(|root| root.data.clone())
    }

    // ═══════════════════════════════════════════════════════════════════
    // Observe Listeners
    // ═══════════════════════════════════════════════════════════════════

    /// Run `listener` with the root name after every flush of `name`.
    pub fn add_observe_listener<F>(&mut self, name: &str, listener: F) -> Result<ObserveListenerId, VmError>
    where
        F: Fn(&str) + 'static,
    {
        let root = self.root(name)?;
        let listener = Value::builtin("observe", -1, move |args| {
            listener(&args.first().map(Value::to_text).unwrap_or_default());
            Ok(Value::Undefined)
        });
        Ok(root.listeners.add(listener))
    }

    /// Remove an observe listener. Returns whether it was registered.
    pub fn remove_observe_listener(&mut self, name: &str, id: ObserveListenerId) -> bool {
        self.registry
            .get(name)
            .is_some_and(|root| root.listeners.remove(id))
    }

    /// Request a flush of `name`.
    pub fn update(&mut self, name: &str) -> Result<(), VmError> {
        self.root(name)?;
        self.schedule(Task::Flush(name.to_string()), self.config.flush_delay());
        Ok(())
    }

    fn root(&self, name: &str) -> Result<&crate::registry::ControllerRoot, VmError> {
        self.registry.get(name).ok_or_else(|| VmError::UnknownController {
            name: name.to_string(),
        })
    }

    // ═══════════════════════════════════════════════════════════════════
    // Scanning and Liveness
    // ═══════════════════════════════════════════════════════════════════

    /// Register `element` as a scan boundary of `name` and scan it.
    fn add_boundary(&mut self, name: &str, element: NodeId) -> bool {
        if self.registry.is_boundary(element) {
            return false;
        }
        self.registry.entry(name).elements.push(element);
        debug!(controller = name, "controller element registered");
        self.scan_node(name, element);
        self.settle_later(name);
        true
    }

    /// Record the directives below `element` for `name`. Returns whether
    /// anything was found.
    fn scan_node(&mut self, name: &str, element: NodeId) -> bool {
        let found = scan(&mut self.document, element, &mut self.markers);
        let any = !found.descriptors.is_empty() || !found.controllers.is_empty();
        self.registry.entry(name).slots.extend(
            found
                .descriptors
                .into_iter()
                .map(|descriptor| Slot {
                    descriptor,
                    controller: None,
                }),
        );
        for (nested, boundary) in found.controllers {
            self.add_boundary(&nested, boundary);
        }
        any
    }

    fn settle_later(&self, name: &str) {
        self.schedule(Task::Settle(name.to_string()), self.config.scan_delay());
    }

    /// Instantiate pending controllers, drop dead ones, schedule a flush.
    fn init_node(&mut self, name: &str) {
        self.sweep_root(name);
        let root = match self.registry.get_mut(name) {
            Some(root) => root,
            None => return,
        };
        let data = match &root.data {
            Some(data) => data.clone(),
            None => return,
        };
        let mut cx = BindCx {
            document: &mut self.document,
            engine: &self.engine,
            data: &data,
        };
        root.slots.retain_mut(|slot| {
            if slot.controller.is_none() {
                slot.controller = create(&slot.descriptor, &mut cx);
                return slot.controller.is_some();
            }
            true
        });
        self.schedule(Task::Flush(name.to_string()), self.config.flush_delay());
    }

    fn sweep_root(&mut self, name: &str) -> usize {
        let strategy = self.config.liveness;
        let root = match self.registry.get_mut(name) {
            Some(root) => root,
            None => return 0,
        };
        let document = &mut self.document;
        root.elements.retain(|&element| document.contains(element));

        let live: Vec<bool> = {
            let check = LivenessCheck::new(document, &root.elements, strategy);
            root.slots.iter().map(|slot| check.is_live(&slot.descriptor)).collect()
        };
        let mut dropped = 0;
        for (slot, live) in std::mem::take(&mut root.slots).into_iter().zip(live) {
            if live {
                root.slots.push(slot);
            } else {
                if let Some(mut controller) = slot.controller {
                    controller.detach(document);
                }
                dropped += 1;
            }
        }
        if dropped > 0 {
            debug!(controller = name, dropped, "dead bindings swept");
        }
        dropped
    }

    /// Drop the bindings of `name` whose elements are gone. Returns how
    /// many were dropped.
    pub fn sweep(&mut self, name: &str) -> Result<usize, VmError> {
        self.root(name)?;
        Ok(self.sweep_root(name))
    }

    /// Scan `element` again for directives added since the last scan.
    ///
    /// The element belongs to the nearest controller root above it; an
    /// element outside every root is searched for new `vm-controller`
    /// elements instead.
    pub fn rescan(&mut self, element: NodeId) {
        if !self.document.contains(element) {
            return;
        }
        if let Some(owner) = self.registry.owner(&self.document, element) {
            self.scan_node(&owner, element);
            self.settle_later(&owner);
            return;
        }
        let mut candidates = vec![element];
        candidates.extend(self.document.descendant_elements(element));
        for node in candidates {
            let name = match self.document.attribute(node, CONTROLLER_ATTRIBUTE) {
                Some(name) if !name.is_empty() => name.to_string(),
                _ => continue,
            };
            self.add_boundary(&name, node);
        }
    }

    /// Replace the content of `element` with `html` and scan it.
    pub fn inject_html(&mut self, element: NodeId, html: &str) {
        self.document.set_inner_html(element, html);
        self.rescan(element);
    }

    /// Remove `element` from the document and schedule a sweep of every
    /// root that lost bindings or boundaries.
    pub fn remove_element(&mut self, element: NodeId) {
        let owner = self.registry.owner(&self.document, element);
        self.document.remove(element);

        let mut affected: Vec<String> = owner.into_iter().collect();
        for name in self.registry.names() {
            let lost = self.registry.get(&name).is_some_and(|root| {
                root.elements.iter().any(|&e| !self.document.contains(e))
                    || root
                        .slots
                        .iter()
                        .any(|s| !self.document.contains(s.descriptor.element))
            });
            if lost && !affected.contains(&name) {
                affected.push(name);
            }
        }
        for name in affected {
            self.settle_later(&name);
        }
    }

    /// Number of live controllers of `name`.
    pub fn controller_count(&self, name: &str) -> usize {
        self.registry
            .get(name)
            .map(|root| root.controller_count())
            .unwrap_or(0)
    }

    /// Scan boundaries of `name`.
    pub fn boundaries(&self, name: &str) -> Vec<NodeId> {
        self.registry
            .get(name)
            .map(|root| root.elements.clone())
            .unwrap_or_default()
    }

    /// Names of every controller root.
    pub fn controller_names(&self) -> Vec<String> {
        self.registry.names()
    }

    // ═══════════════════════════════════════════════════════════════════
    // Flushing
    // ═══════════════════════════════════════════════════════════════════

    fn flush(&mut self, name: &str) {
        let root = match self.registry.get_mut(name) {
            Some(root) => root,
            None => return,
        };
        let mut rescan = Vec::new();
        let mut updated = 0;
        let mut dead = 0;
        let mut cx = UpdateCx {
            document: &mut self.document,
            rescan: &mut rescan,
        };
        for slot in &mut root.slots {
            let controller = match slot.controller.as_mut() {
                Some(controller) => controller,
                None => continue,
            };
            // Removed by a render earlier in this pass, or by the host.
            if !cx.document.contains(controller.element()) {
                dead += 1;
                continue;
            }
            if controller.update(&mut cx) {
                updated += 1;
            }
        }
        let listeners = root.listeners.snapshot();
        debug!(controller = name, updated, "flush");
        if dead > 0 {
            self.sweep_root(name);
        }

        // Rendered markup without directives needs no settle pass.
        let mut found = false;
        for element in rescan {
            if self.document.contains(element) {
                found |= self.scan_node(name, element);
            }
        }
        if found {
            self.settle_later(name);
        }
        let arg = Value::from(name);
        for listener in listeners {
            if let Err(err) = listener.call(std::slice::from_ref(&arg)) {
                warn!(controller = name, error = %err, "observe listener failed");
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Time
    // ═══════════════════════════════════════════════════════════════════

    fn schedule(&self, task: Task, delay: Duration) {
        self.scheduler.borrow_mut().schedule(task, delay);
    }

    fn run(&mut self, task: Task) {
        trace!(?task, "task due");
        match task {
            Task::Flush(name) => self.flush(&name),
            Task::Settle(name) => self.init_node(&name),
        }
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.scheduler.borrow().now()
    }

    /// Number of pending tasks.
    pub fn pending_tasks(&self) -> usize {
        self.scheduler.borrow().len()
    }

    /// Move time forward by `duration`, running every task that falls
    /// due on the way. Returns how many ran.
    ///
    /// # Errors
    ///
    /// [`VmError::Unsettled`] when more than `max_idle_tasks` tasks fall
    /// due within the window.
    pub fn advance(&mut self, duration: Duration) -> Result<usize, VmError> {
        let target = self.now() + duration;
        let mut ran = 0;
        loop {
            let task = self.scheduler.borrow_mut().pop_due(target);
            match task {
                Some(task) if ran < self.config.max_idle_tasks => {
                    self.run(task);
                    ran += 1;
                }
                Some(task) => {
                    self.schedule(task, Duration::ZERO);
                    return Err(VmError::Unsettled { tasks: ran });
                }
                None => break,
            }
        }
        self.scheduler.borrow_mut().set_now(target);
        Ok(ran)
    }

    /// Run tasks until none are pending. Returns how many ran.
    ///
    /// # Errors
    ///
    /// [`VmError::Unsettled`] after `max_idle_tasks` tasks.
    pub fn run_until_idle(&mut self) -> Result<usize, VmError> {
        let mut ran = 0;
        loop {
            let due = self.scheduler.borrow().next_due();
            let due = match due {
                Some(due) => due,
                None => return Ok(ran),
            };
            if ran >= self.config.max_idle_tasks {
                return Err(VmError::Unsettled { tasks: ran });
            }
            let task = self.scheduler.borrow_mut().pop_due(due);
            if let Some(task) = task {
                self.run(task);
                ran += 1;
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // User Events
    // ═══════════════════════════════════════════════════════════════════

    /// Type into a text control: set its value and fire `input`.
    pub fn input(&mut self, element: NodeId, text: &str) -> usize {
        self.document.set_value(element, text);
        self.document.trigger(element, "input")
    }

    /// Choose a value in a select (or any control): set it and fire
    /// `change`.
    pub fn select(&mut self, element: NodeId, value: &str) -> usize {
        self.document.set_value(element, value);
        self.document.trigger(element, "change")
    }

    /// Click an element. Checkboxes toggle; a radio is checked and the
    /// rest of its group unchecked. Fires `click`.
    pub fn click(&mut self, element: NodeId) -> usize {
        match self.document.input_type(element).as_deref() {
            Some("checkbox") => {
                let checked = self.document.checked(element);
                self.document.set_checked(element, !checked);
            }
            Some("radio") => {
                if let Some(name) = self.document.attribute(element, "name").map(str::to_string) {
                    for other in self.document.input_group(&name) {
                        if other != element
                            && self.document.input_type(other).as_deref() == Some("radio")
                        {
                            self.document.set_checked(other, false);
                        }
                    }
                }
                self.document.set_checked(element, true);
            }
            _ => {}
        }
        self.document.trigger(element, "click")
    }

    /// Fire `event` on `element`.
    pub fn dispatch(&self, element: NodeId, event: &str) -> usize {
        self.document.trigger(element, event)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Accessors
    // ═══════════════════════════════════════════════════════════════════

    /// The bound document.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Mutable access to the document. Structural changes made here are
    /// only noticed after [`rescan`](Self::rescan) or a sweep.
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    /// The template engine used for templates and binding expressions.
    pub fn engine(&self) -> &TemplateEngine {
        &self.engine
    }

    /// Active configuration.
    pub fn config(&self) -> &VmConfig {
        &self.config
    }
}

impl std::fmt::Debug for Vm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vm")
            .field("controllers", &self.registry.names())
            .field("now", &self.now())
            .field("pending", &self.pending_tasks())
            .finish()
    }
}
