//! Interpreter limits
//!
//! Binding expressions and template bodies come from markup, so every
//! evaluation runs under a budget: a call depth, a per-loop iteration
//! cap and a host-controlled stop flag.

use std::cell::Cell;
use std::rc::Rc;

/// Budget shared by one engine and everything it evaluates.
///
/// Clones share the stop flag, so a host holding one clone can halt
/// evaluations running under another.
#[derive(Debug, Clone)]
pub struct EvalContext {
    /// Deepest closure nesting allowed
    pub max_call_depth: usize,

    /// Iterations any single loop may run
    pub max_loop_iterations: usize,

    /// Log every evaluated expression at `trace` level
    pub trace: bool,

    stop: Rc<Cell<bool>>,
}

impl Default for EvalContext {
    fn default() -> Self {
        Self {
            max_call_depth: 256,
            max_loop_iterations: 100_000,
            trace: false,
            stop: Rc::new(Cell::new(false)),
        }
    }
}

impl EvalContext {
    /// Default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Default limits with a different call depth.
    pub fn with_max_call_depth(max_depth: usize) -> Self {
        Self {
            max_call_depth: max_depth,
            ..Self::default()
        }
    }

    /// Replace the loop iteration cap.
    pub fn loop_limit(mut self, limit: usize) -> Self {
        self.max_loop_iterations = limit;
        self
    }

    /// Enable expression tracing.
    pub fn traced(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    /// Whether [`interrupt`](Self::interrupt) was requested.
    pub fn is_interrupted(&self) -> bool {
        self.stop.get()
    }

    /// Make running and future evaluations fail with
    /// [`EvalError::Interrupted`](crate::EvalError::Interrupted).
    pub fn interrupt(&self) {
        self.stop.set(true);
    }

    /// Clear a pending interrupt.
    pub fn reset_interrupt(&self) {
        self.stop.set(false);
    }
}
