//! Name resolution for expressions and template logic
//!
//! Names are resolved innermost first: template and closure locals, then
//! the free variables bound when an evaluation starts (utilities, helpers
//! and data properties, in that order of precedence), then `self`.

mod frame;
pub(crate) mod prelude;

pub use frame::ScopeGuard;
pub use prelude::{utility_names, UTILITY_PREFIX};

use crate::error::EnvironmentError;
use crate::value::{BuiltinFn, Value};

/// One bound name.
#[derive(Debug, Clone)]
pub struct Binding {
    /// Name as written in source
    pub name: String,

    /// Current value
    pub value: Value,

    /// `let` or `let mut`
    pub mode: BindingMode,
}

/// Whether a binding may be reassigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingMode {
    /// `let x = ...`
    Immutable,

    /// `let mut x = ...`, closure captures, and names bound by the runtime
    Mutable,
}

/// Scoped bindings for one evaluation.
///
/// Bindings live in a single vector; a frame is the index where a scope
/// started, so leaving a scope is a truncate. Closure calls get a fresh
/// environment through [`for_call`](Self::for_call), which carries the
/// call depth forward.
///
/// # Example
///
/// ```
/// use vmbind::{Environment, Value};
///
/// let mut env = Environment::new();
/// env.define("item", Value::from("outer"));
///
/// env.push_frame();
/// env.define("item", Value::from("inner"));
/// env.define("index", Value::from(0));
/// assert_eq!(env.get("item"), Some(&Value::from("inner")));
///
/// env.pop_frame();
/// assert_eq!(env.get("item"), Some(&Value::from("outer")));
/// assert!(!env.contains("index"));
/// ```
#[derive(Debug, Clone)]
pub struct Environment {
    bindings: Vec<Binding>,
    frames: Vec<usize>,
    calls: usize,
    max_calls: usize,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    /// Empty environment with the default call depth.
    pub fn new() -> Self {
        Self::with_max_call_depth(256)
    }

    /// Empty environment allowing `max_depth` nested closure calls.
    pub fn with_max_call_depth(max_depth: usize) -> Self {
        Self {
            bindings: Vec::new(),
            frames: vec![0],
            calls: 0,
            max_calls: max_depth,
        }
    }

    /// Start a block, loop body or template scope.
    pub fn push_frame(&mut self) {
        self.frames.push(self.bindings.len());
    }

    /// Drop every binding made since the matching [`push_frame`](Self::push_frame).
    ///
    /// The outermost frame stays.
    pub fn pop_frame(&mut self) {
        if self.frames.len() == 1 {
            return;
        }
        if let Some(start) = self.frames.pop() {
            self.bindings.truncate(start);
        }
    }

    /// Number of open frames, counting the outermost.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Closure calls currently on the stack.
    pub fn call_depth(&self) -> usize {
        self.calls
    }

    /// Count one more nested call.
    pub fn enter_call(&mut self) -> Result<(), EnvironmentError> {
        if self.calls >= self.max_calls {
            return Err(EnvironmentError::StackOverflow {
                depth: self.calls,
                max: self.max_calls,
            });
        }
        self.calls += 1;
        Ok(())
    }

    /// Environment for a closure body called from here.
    pub fn for_call(&self) -> Result<Environment, EnvironmentError> {
        let mut callee = Environment::with_max_call_depth(self.max_calls);
        callee.calls = self.calls;
        callee.enter_call()?;
        Ok(callee)
    }

    /// Bind `name` immutably in the current frame, shadowing outer bindings.
    pub fn define(&mut self, name: impl Into<String>, value: Value) {
        self.define_with_mode(name, value, BindingMode::Immutable);
    }

    /// Bind `name` in the current frame.
    pub fn define_with_mode(&mut self, name: impl Into<String>, value: Value, mode: BindingMode) {
        let name = name.into();
        self.bindings.push(Binding { name, value, mode });
    }

    /// Bind a native function under its own name.
    pub fn define_builtin(&mut self, builtin: BuiltinFn) {
        let name = builtin.name.clone();
        self.define(name, Value::BuiltinFn(builtin));
    }

    fn lookup(&self, name: &str) -> Option<usize> {
        self.bindings.iter().rposition(|b| b.name == name)
    }

    /// Innermost value bound to `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.lookup(name).map(|i| &self.bindings[i].value)
    }

    /// Whether `name` is bound in any open frame.
    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Reassign the innermost binding of `name`.
    ///
    /// Fails when the name is unbound or was bound with plain `let`.
    pub fn assign(&mut self, name: &str, value: Value) -> Result<(), EnvironmentError> {
        let index = self.lookup(name).ok_or_else(|| EnvironmentError::UndefinedVariable {
            name: name.to_string(),
        })?;
        let binding = &mut self.bindings[index];
        if binding.mode == BindingMode::Immutable {
            return Err(EnvironmentError::ImmutableBinding {
                name: name.to_string(),
            });
        }
        binding.value = value;
        Ok(())
    }
}
