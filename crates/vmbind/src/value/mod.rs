//! Value representation for runtime values

mod callable;
mod display;
mod impls;
mod json;

pub use callable::{BuiltinFn, BuiltinFnPtr, ClosureValue};
pub use display::format_number;

use std::rc::Rc;

use crate::reactive::{ObservableList, ObservedObject};

/// Runtime value shared by the interpreter, the reactive tree and the
/// binding controllers.
///
/// Values are dynamically typed:
/// - Scalars are stored inline
/// - Lists and objects are reactive containers with reference identity
/// - Callables are closures (AST + captures) or native builtins
#[derive(Clone)]
pub enum Value {
    // ═══════════════════════════════════════════════════════════════════
    // Scalars
    // ═══════════════════════════════════════════════════════════════════
    /// Missing value: unknown fields, empty blocks, absent arguments
    Undefined,

    /// Explicit absence of a value
    Null,

    /// Boolean: `true` or `false`
    Bool(bool),

    /// All numbers are doubles
    Number(f64),

    /// Immutable shared string
    String(Rc<str>),

    // ═══════════════════════════════════════════════════════════════════
    // Reactive Containers
    // ═══════════════════════════════════════════════════════════════════
    /// Ordered list with observable mutators
    List(ObservableList),

    /// Ordered map of observed cells
    Object(ObservedObject),

    // ═══════════════════════════════════════════════════════════════════
    // Callables
    // ═══════════════════════════════════════════════════════════════════
    /// Closure: `|x| x + 1`
    Closure(Rc<ClosureValue>),

    /// Native function (helpers, utilities, pseudo-functions)
    BuiltinFn(BuiltinFn),
}
