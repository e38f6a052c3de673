//! # vmbind
//!
//! Reactive data binding for markup.
//!
//! Plain data becomes an observed tree of objects and lists; writes to it
//! are coalesced on a virtual clock and pushed into the elements that
//! bind to it through `vm-*` directive attributes. Binding expressions
//! and template logic are written in Rust expression syntax, parsed with
//! `syn` and run by a small tree-walking interpreter with dynamic values.
//!
//! ## Architecture
//!
//! - **Reactive**: [`ObservedObject`] and [`ObservableList`] cells that
//!   notify on change
//! - **Interpreter**: [`Evaluate`] over `syn` nodes in an [`Environment`]
//! - **Templates**: [`TemplateEngine`] compiles `<% %>` templates
//! - **Expressions**: [`Getter`] and [`Setter`] compiled per binding
//! - **Bindings**: one [`Controller`](binding::Controller) per directive
//! - **Application**: [`Vm`] scans a [`Document`], schedules flushes and
//!   sweeps dead bindings
//!
//! ## Directives
//!
//! | Attribute | Binding |
//! |---|---|
//! | `vm-controller="name"` | names a binding root |
//! | `vm-html="expr"` | element content |
//! | `vm-value="path"` | two-way form value |
//! | `vm-css-<prop>="expr"` | inline style property |
//! | `vm-attr-<name>="expr"` | property or attribute |
//! | `vm-on-<event>="expr"` | event handler |

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod binding;
pub mod config;
pub mod context;
pub mod dom;
pub mod environment;
pub mod error;
pub mod eval;
pub mod expression;
pub mod reactive;
mod registry;
pub mod scan;
pub mod scheduler;
pub mod template;
pub mod value;
pub mod vm;

// Re-export main types
pub use binding::{BindingDescriptor, BindingKind};
pub use config::{Liveness, VmConfig};
pub use context::EvalContext;
pub use dom::{Document, Event, ListenerId, NodeId};
pub use environment::{Binding, BindingMode, Environment, ScopeGuard};
pub use error::{
    BindError, ConfigError, EnvironmentError, EvalError, ObserveError, Result, TemplateError,
    VmError,
};
pub use eval::{eval_block, eval_expr, ControlFlow, Evaluate};
pub use expression::{Getter, Setter};
pub use reactive::{observe, unobserve, Change, ChangeCallback, ObservableList, ObservedObject};
pub use registry::ObserveListenerId;
pub use template::{Render, TemplateEngine, TemplateOptions, TEMPLATE_ERROR};
pub use value::{BuiltinFn, BuiltinFnPtr, ClosureValue, Value};
pub use vm::Vm;

/// vmbind version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
