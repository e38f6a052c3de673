//! Error types for vmbind

use thiserror::Error;

use crate::eval::ControlFlow;
use crate::Value;

/// Errors raised while evaluating an expression or template body.
#[derive(Error, Debug)]
pub enum EvalError {
    /// A name was neither bound locally nor resolvable as data.
    #[error("undefined variable `{name}`")]
    UndefinedVariable {
        /// The unresolved name
        name: String,
    },

    /// A value of the wrong kind was used.
    #[error("type error: {message}")]
    TypeError {
        /// Description of the mismatch
        message: String,
    },

    /// Property read on `undefined`/`null` or on a value without properties.
    #[error("cannot read property `{property}` of {base}")]
    UndefinedProperty {
        /// The property being read
        property: String,
        /// Type name of the base value
        base: String,
    },

    /// Syntax the interpreter does not evaluate.
    #[error("unsupported expression: {kind}")]
    UnsupportedExpr {
        /// Kind of expression
        kind: String,
    },

    /// Wrong number of arguments passed to a callable.
    #[error("`{name}` expects {expected} argument(s), got {got}")]
    ArityMismatch {
        /// Callable name
        name: String,
        /// Declared arity
        expected: usize,
        /// Arguments supplied
        got: usize,
    },

    /// A native helper reported a failure.
    #[error("helper `{name}` failed: {message}")]
    BuiltinError {
        /// Helper name
        name: String,
        /// Message returned by the helper
        message: String,
    },

    /// A list write past the end of the list.
    #[error("index {index} out of bounds for list of length {len}")]
    IndexOutOfBounds {
        /// Requested index
        index: usize,
        /// List length
        len: usize,
    },

    /// The left-hand side of an assignment cannot be written.
    #[error("invalid assignment target: {kind}")]
    InvalidAssignTarget {
        /// Kind of target
        kind: String,
    },

    /// A `let` or `for` pattern did not match the value.
    #[error("pattern `{pattern}` does not match a {found}")]
    RefutablePattern {
        /// The pattern source
        pattern: String,
        /// Type name of the value
        found: String,
    },

    /// Loop ran past the configured iteration limit.
    #[error("loop exceeded {limit} iterations")]
    LoopLimit {
        /// Configured limit
        limit: usize,
    },

    /// Evaluation was interrupted through the context flag.
    #[error("evaluation interrupted")]
    Interrupted,

    /// Scope or binding failure.
    #[error(transparent)]
    Environment(#[from] EnvironmentError),

    /// A write was refused by the reactive tree.
    #[error(transparent)]
    Observe(#[from] ObserveError),

    /// `break`, `continue` or `return` travelling up to its target.
    #[error("`{}` outside of its enclosing loop or closure", .0.keyword())]
    ControlFlow(ControlFlow),
}

/// Errors raised by [`Environment`](crate::Environment) operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EnvironmentError {
    /// Assignment to a name that was never bound.
    #[error("cannot assign to undefined variable `{name}`")]
    UndefinedVariable {
        /// The name
        name: String,
    },

    /// Assignment to an immutable binding.
    #[error("cannot assign twice to immutable variable `{name}`")]
    ImmutableBinding {
        /// The name
        name: String,
    },

    /// Call depth exceeded.
    #[error("call depth {depth} exceeds the maximum of {max}")]
    StackOverflow {
        /// Depth reached
        depth: usize,
        /// Configured maximum
        max: usize,
    },
}

/// Errors raised while observing or writing a data graph.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ObserveError {
    /// The data graph refers back to one of its own ancestors.
    #[error("cyclic data at `{path}`")]
    Cyclic {
        /// Path at which the cycle closes
        path: String,
    },

    /// A list write too far past the end to pad.
    #[error("list index {index} is out of range for length {len}")]
    IndexOutOfRange {
        /// Requested index
        index: usize,
        /// Length at the time of the write
        len: usize,
    },
}

/// Errors reported through the template error hook.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TemplateError {
    /// The template body could not be parsed.
    #[error("Syntax Error in {filename}: {message}{}", line_suffix(*.line, .source_line))]
    Compile {
        /// Template name, `anonymous` when none was given
        filename: String,
        /// Template line of the failure, when known
        line: Option<usize>,
        /// The offending template line, trimmed
        source_line: Option<String>,
        /// Parser message
        message: String,
    },

    /// Rendering failed at runtime.
    #[error("Render Error in {filename}: {message}{}", line_suffix(*.line, .source_line))]
    Render {
        /// Template name, `anonymous` when none was given
        filename: String,
        /// Template line of the failure (debug mode only)
        line: Option<usize>,
        /// The offending template line, trimmed
        source_line: Option<String>,
        /// Evaluation message
        message: String,
    },

    /// `include`/`render_file` of a name that is not in the cache.
    #[error("Render Error in {filename}: Template not found")]
    NotFound {
        /// Requested template name
        filename: String,
    },
}

impl TemplateError {
    /// Short category name, as shown in error reports.
    pub fn name(&self) -> &'static str {
        match self {
            TemplateError::Compile { .. } => "Syntax Error",
            TemplateError::Render { .. } | TemplateError::NotFound { .. } => "Render Error",
        }
    }

    /// Template name the error refers to.
    pub fn filename(&self) -> &str {
        match self {
            TemplateError::Compile { filename, .. }
            | TemplateError::Render { filename, .. }
            | TemplateError::NotFound { filename } => filename,
        }
    }

    /// Template line, when known.
    pub fn line(&self) -> Option<usize> {
        match self {
            TemplateError::Compile { line, .. } | TemplateError::Render { line, .. } => *line,
            TemplateError::NotFound { .. } => None,
        }
    }
}

fn line_suffix(line: Option<usize>, source_line: &Option<String>) -> String {
    match (line, source_line) {
        (Some(line), Some(src)) => format!(" (line {}: {})", line, src),
        (Some(line), None) => format!(" (line {})", line),
        _ => String::new(),
    }
}

/// Errors raised when compiling a binding expression.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BindError {
    /// The expression text is not valid syntax.
    #[error("cannot compile `{expression}`: {message}")]
    Parse {
        /// Expression source
        expression: String,
        /// Parser message
        message: String,
    },

    /// A setter was requested for something other than a dotted path.
    #[error("`{path}` is not an assignable path")]
    NotAssignable {
        /// The rejected path
        path: String,
    },
}

/// Errors raised by the application context.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VmError {
    /// The data handed to `define` could not be observed.
    #[error(transparent)]
    Observe(#[from] ObserveError),

    /// No controller root with that name exists.
    #[error("unknown controller `{name}`")]
    UnknownController {
        /// Requested name
        name: String,
    },

    /// `run_until_idle` kept finding work.
    #[error("scheduler did not settle after {tasks} tasks")]
    Unsettled {
        /// Tasks executed before giving up
        tasks: usize,
    },
}

/// Errors raised while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Malformed JSON configuration.
    #[error("invalid configuration: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for evaluation.
pub type Result<T> = std::result::Result<T, EvalError>;

/// Get the runtime type name of a value for error messages.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Undefined => "undefined",
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::List(_) => "list",
        Value::Object(_) => "object",
        Value::Closure(_) | Value::BuiltinFn(_) => "function",
    }
}
