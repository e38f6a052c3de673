//! Callable value types: closures and builtins

use std::rc::Rc;

use super::Value;

/// Type alias for builtin function pointers to reduce complexity
pub type BuiltinFnPtr = Rc<dyn Fn(&[Value]) -> Result<Value, String>>;

/// A closure with captured environment.
///
/// Free variables of the body are copied out of the defining scope when
/// the closure expression is evaluated. Containers are shared by
/// reference, so writes through a captured object are visible outside.
#[derive(Debug, Clone)]
pub struct ClosureValue {
    /// Parameter patterns (`x`, `_`, `(k, v)`)
    pub params: Vec<syn::Pat>,

    /// The closure body
    pub body: Rc<syn::Expr>,

    /// Captured variables (name -> value)
    pub captures: Vec<(String, Value)>,
}

impl PartialEq for ClosureValue {
    /// Two closures are the same handler when they were created from the
    /// same source with the same captured values.
    fn eq(&self, other: &Self) -> bool {
        self.params == other.params
            && (Rc::ptr_eq(&self.body, &other.body) || self.body == other.body)
            && self.captures == other.captures
    }
}

/// A built-in native function.
///
/// These are Rust functions exposed to the interpreter: template
/// utilities, user helpers, and the `print`/`include` pseudo-functions.
#[derive(Clone)]
pub struct BuiltinFn {
    /// Function name (for display/debugging)
    pub name: String,

    /// Arity (-1 for variadic)
    pub arity: i32,

    /// The actual function pointer
    pub func: BuiltinFnPtr,
}

impl BuiltinFn {
    /// Create a builtin with a fixed arity.
    pub fn new<F>(name: impl Into<String>, arity: i32, func: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, String> + 'static,
    {
        Self {
            name: name.into(),
            arity,
            func: Rc::new(func),
        }
    }

    /// Create a variadic builtin.
    pub fn variadic<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, String> + 'static,
    {
        Self::new(name, -1, func)
    }
}

impl std::fmt::Debug for BuiltinFn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BuiltinFn({})", self.name)
    }
}
