//! Template engine
//!
//! Templates mix literal markup with logic runs between `<%` and `%>`:
//!
//! - `<%= expr %>` emits `expr`, HTML-escaped
//! - `<%== expr %>` and `<%=# expr %>` emit it raw
//! - anything else is pasted in as statements
//!
//! Logic is written in the expression language of the [`eval`](crate::eval)
//! module. Free variables resolve, in order, to the `print`/`include`
//! pseudo-functions, the `__escape`/`__string`/`__each`/`__include`
//! utilities, registered helpers, and finally fields of the data. `self`
//! is the data itself.
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use vmbind::{TemplateEngine, Value};
//!
//! let engine = TemplateEngine::new();
//! let data = Value::from(json!({"items": ["a", "<b>"]}));
//! let out = engine.render("<% for item in items { %>[<%= item %>]<% } %>", &data);
//! assert_eq!(out, "[a][&#60;b&#62;]");
//! ```

mod compiler;
pub mod escape;
mod options;
mod render;

pub use options::{ParserHook, TemplateOptions};
pub use render::Render;

pub(crate) use render::resolve;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::{debug, error};

use crate::error::TemplateError;
use crate::value::BuiltinFn;
use crate::{EvalContext, Value};

/// What a failed template renders instead of its content.
pub const TEMPLATE_ERROR: &str = "{Template Error}";

/// Receives every compile and render failure.
pub type ErrorHook = Rc<dyn Fn(&TemplateError)>;

/// Compiles, caches and renders templates.
///
/// Cheap to clone; clones share the cache, helpers and defaults.
#[derive(Clone)]
pub struct TemplateEngine {
    inner: Rc<EngineInner>,
}

pub(crate) struct EngineInner {
    defaults: RefCell<TemplateOptions>,
    cache: RefCell<HashMap<String, Render>>,
    helpers: RefCell<IndexMap<String, Value>>,
    on_error: RefCell<ErrorHook>,
    pub(crate) expressions: RefCell<HashMap<String, Rc<syn::Expr>>>,
    context: EvalContext,
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateEngine {
    /// Engine with default options and evaluation limits.
    pub fn new() -> Self {
        Self::with_context(EvalContext::default())
    }

    /// Engine whose templates and expressions run under `context`.
    pub fn with_context(context: EvalContext) -> Self {
        Self {
            inner: Rc::new(EngineInner {
                defaults: RefCell::new(TemplateOptions::default()),
                cache: RefCell::new(HashMap::new()),
                helpers: RefCell::new(IndexMap::new()),
                on_error: RefCell::new(Rc::new(default_error_hook)),
                expressions: RefCell::new(HashMap::new()),
                context,
            }),
        }
    }

    pub(crate) fn from_inner(inner: Rc<EngineInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn inner(&self) -> &EngineInner {
        &self.inner
    }

    /// Evaluation limits.
    pub fn context(&self) -> &EvalContext {
        &self.inner.context
    }

    // ═══════════════════════════════════════════════════════════════════
    // Options
    // ═══════════════════════════════════════════════════════════════════

    /// A copy of the engine-wide default options.
    pub fn defaults(&self) -> TemplateOptions {
        self.inner.defaults.borrow().clone()
    }

    /// Change the engine-wide default options.
    pub fn config(&self, f: impl FnOnce(&mut TemplateOptions)) {
        f(&mut self.inner.defaults.borrow_mut());
    }

    // ═══════════════════════════════════════════════════════════════════
    // Compiling and Rendering
    // ═══════════════════════════════════════════════════════════════════

    /// Compile `source`.
    ///
    /// A compile failure is reported to the error hook and yields a
    /// renderer that always produces [`TEMPLATE_ERROR`]. Successful
    /// compiles are cached when `options` has a filename and `cache` set.
    pub fn compile(&self, source: &str, options: TemplateOptions) -> Render {
        let program = compiler::compile(source, &options);
        if let Err(err) = &program {
            self.report(err);
        }
        let failed = program.is_err();
        let render = Render::new(source, options, program, Rc::downgrade(&self.inner));

        if !failed && render.options().cache {
            if let Some(filename) = &render.options().filename {
                debug!(filename = %filename, "template cached");
                self.inner
                    .cache
                    .borrow_mut()
                    .insert(filename.clone(), render.clone());
            }
        }
        render
    }

    /// Compile `source` with the default options and render `data`.
    pub fn render(&self, source: &str, data: &Value) -> String {
        self.compile(source, self.defaults()).render(data)
    }

    /// Compile `source` and cache it under `filename`.
    pub fn register(&self, filename: &str, source: &str) -> Render {
        self.compile(source, self.defaults().with_filename(filename))
    }

    /// A cached template.
    pub fn get(&self, filename: &str) -> Option<Render> {
        self.inner.cache.borrow().get(filename).cloned()
    }

    /// Render a cached template.
    ///
    /// A missing template is reported as `Template not found` and renders
    /// the placeholder.
    pub fn render_file(&self, filename: &str, data: &Value) -> String {
        match self.get(filename) {
            Some(render) => render.render(data),
            None => {
                self.report(&TemplateError::NotFound {
                    filename: filename.to_string(),
                });
                TEMPLATE_ERROR.to_string()
            }
        }
    }

    /// Drop a cached template.
    pub fn remove(&self, filename: &str) -> Option<Render> {
        self.inner.cache.borrow_mut().remove(filename)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Helpers
    // ═══════════════════════════════════════════════════════════════════

    /// Register a native helper, callable unqualified in templates and
    /// binding expressions.
    pub fn helper<F>(&self, name: &str, func: F)
    where
        F: Fn(&[Value]) -> Result<Value, String> + 'static,
    {
        self.helper_value(name, Value::BuiltinFn(BuiltinFn::variadic(name, func)));
    }

    /// Register any value as a helper, typically a closure.
    pub fn helper_value(&self, name: &str, value: Value) {
        self.inner.helpers.borrow_mut().insert(name.to_string(), value);
    }

    pub(crate) fn helper_named(&self, name: &str) -> Option<Value> {
        self.inner.helpers.borrow().get(name).cloned()
    }

    // ═══════════════════════════════════════════════════════════════════
    // Error Reporting
    // ═══════════════════════════════════════════════════════════════════

    /// Replace the error hook.
    pub fn set_error_hook<F>(&self, hook: F)
    where
        F: Fn(&TemplateError) + 'static,
    {
        *self.inner.on_error.borrow_mut() = Rc::new(hook);
    }

    pub(crate) fn report(&self, err: &TemplateError) {
        let hook = self.inner.on_error.borrow().clone();
        hook(err);
    }
}

impl std::fmt::Debug for TemplateEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateEngine")
            .field("defaults", &self.inner.defaults.borrow())
            .field("cached", &self.inner.cache.borrow().len())
            .field("helpers", &self.inner.helpers.borrow().len())
            .finish()
    }
}

/// Log the failure at `error` level.
pub(crate) fn default_error_hook(err: &TemplateError) {
    error!(
        name = err.name(),
        filename = err.filename(),
        line = ?err.line(),
        "Template Error: {}",
        err
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::cell::Cell;

    fn data(json: serde_json::Value) -> Value {
        Value::from(json)
    }

    #[test]
    fn test_escape_and_raw() {
        let engine = TemplateEngine::new();
        let d = data(json!({"a": "<b>"}));
        assert_eq!(engine.render("<%= a %>", &d), "&#60;b&#62;");
        assert_eq!(engine.render("<%==a%>", &d), "<b>");
        assert_eq!(engine.render("<%=#a%>", &d), "<b>");
    }

    #[test]
    fn test_missing_field_renders_empty() {
        let engine = TemplateEngine::new();
        assert_eq!(engine.render("[<%= a %>]", &data(json!({}))), "[]");
        assert_eq!(engine.render("[<%= a %>]", &Value::Undefined), "[]");
    }

    #[test]
    fn test_helpers_shadow_data() {
        let engine = TemplateEngine::new();
        engine.helper("shout", |args| Ok(Value::from(args[0].to_text().to_uppercase())));
        let d = data(json!({"shout": "data", "name": "ann"}));
        assert_eq!(engine.render("<%= shout(name) %>", &d), "ANN");
    }

    #[test]
    fn test_compile_error_placeholder_and_hook() {
        let engine = TemplateEngine::new();
        let reported = Rc::new(Cell::new(0));
        let seen = Rc::clone(&reported);
        engine.set_error_hook(move |_| seen.set(seen.get() + 1));

        let render = engine.compile("<% if { %>", engine.defaults());
        assert!(render.error().is_some());
        assert_eq!(render.render(&Value::Undefined), TEMPLATE_ERROR);
        assert_eq!(reported.get(), 1);
    }

    #[test]
    fn test_runtime_error_escalates_to_debug() {
        let engine = TemplateEngine::new();
        let errors = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&errors);
        engine.set_error_hook(move |e| sink.borrow_mut().push(e.clone()));

        let render = engine.register("broken", "ok\n<%= user.name %>");
        assert_eq!(render.render(&data(json!({}))), TEMPLATE_ERROR);

        let errors = errors.borrow();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].line(), Some(2));
        assert_eq!(errors[0].filename(), "broken");
        assert!(engine.get("broken").is_some_and(|r| r.options().debug));
    }

    #[test]
    fn test_cache_requires_filename_and_cache() {
        let engine = TemplateEngine::new();
        engine.compile("x", engine.defaults());
        engine.compile("y", engine.defaults().with_filename("nocache").with_cache(false));
        engine.register("row", "<li><%= self %></li>");
        assert!(engine.get("nocache").is_none());
        assert_eq!(engine.render_file("row", &Value::from("a")), "<li>a</li>");
        assert!(engine.remove("row").is_some());
        assert_eq!(engine.render_file("row", &Value::from("a")), TEMPLATE_ERROR);
    }

    #[test]
    fn test_config_changes_defaults() {
        let engine = TemplateEngine::new();
        engine.config(|o| {
            o.open_tag = "{{".to_string();
            o.close_tag = "}}".to_string();
        });
        assert_eq!(engine.render("{{= n * 2 }}", &data(json!({"n": 4}))), "8");
    }
}
