//! Compiled templates and their execution

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use super::compiler::{self, Program, DATA_NAME, LINE_FN, OUTPUT_FN};
use super::options::TemplateOptions;
use super::{EngineInner, TemplateEngine, TEMPLATE_ERROR};
use crate::environment::prelude::utilities;
use crate::error::TemplateError;
use crate::eval::eval_stmts;
use crate::value::BuiltinFn;
use crate::{BindingMode, Environment, Value};

/// A compiled template, ready to render data.
///
/// Cheap to clone. A template that failed to compile renders the
/// `{Template Error}` placeholder.
#[derive(Clone)]
pub struct Render {
    inner: Rc<RenderInner>,
}

struct RenderInner {
    source: String,
    options: TemplateOptions,
    program: Result<Program, TemplateError>,
    engine: Weak<EngineInner>,
    /// Line-tracking recompile, built after the first runtime failure
    escalated: RefCell<Option<Render>>,
}

impl Render {
    pub(crate) fn new(
        source: &str,
        options: TemplateOptions,
        program: Result<Program, TemplateError>,
        engine: Weak<EngineInner>,
    ) -> Self {
        Self {
            inner: Rc::new(RenderInner {
                source: source.to_string(),
                options,
                program,
                engine,
                escalated: RefCell::new(None),
            }),
        }
    }

    /// The compile error, when this is a placeholder renderer.
    pub fn error(&self) -> Option<&TemplateError> {
        self.inner.program.as_ref().err()
    }

    /// The options this template was compiled with.
    pub fn options(&self) -> &TemplateOptions {
        &self.inner.options
    }

    /// Template source.
    pub fn source(&self) -> &str {
        &self.inner.source
    }

    /// Render `data`.
    ///
    /// Failures never escape: the first runtime failure recompiles the
    /// template with line tracking and retries; a failure in that mode is
    /// reported to the error hook and the placeholder is returned.
    pub fn render(&self, data: &Value) -> String {
        match self.try_render(data) {
            Ok(out) => out,
            Err(_) if self.error().is_some() => TEMPLATE_ERROR.to_string(),
            Err(err) => {
                if !self.inner.options.debug {
                    if let Some(debug) = self.escalate() {
                        return debug.render(data);
                    }
                }
                self.report(&err);
                TEMPLATE_ERROR.to_string()
            }
        }
    }

    /// Render `data`, returning the failure instead of reporting it.
    pub fn try_render(&self, data: &Value) -> Result<String, TemplateError> {
        let program = self.inner.program.as_ref().map_err(Clone::clone)?;
        let output = Rc::new(RefCell::new(String::new()));
        let line = Rc::new(Cell::new(0usize));
        let engine = self.inner.engine.upgrade().map(TemplateEngine::from_inner);

        let mut env = match &engine {
            Some(engine) => Environment::with_max_call_depth(engine.context().max_call_depth),
            None => Environment::new(),
        };
        env.define(OUTPUT_FN, Value::BuiltinFn(output_fn(&output)));
        env.define(LINE_FN, Value::BuiltinFn(line_fn(&line)));
        env.define(DATA_NAME, data.clone());

        for name in &program.variables {
            let value = match name.as_str() {
                "print" => Value::BuiltinFn(print_fn(&output)),
                "include" => Value::BuiltinFn(include_fn(&output, &self.inner.engine, data)),
                "__include" => Value::BuiltinFn(include_utility(&self.inner.engine)),
                other => resolve(other, engine.as_ref(), data),
            };
            env.define_with_mode(name.clone(), value, BindingMode::Mutable);
        }

        let ctx = engine.as_ref().map(|e| e.context().clone()).unwrap_or_default();
        match eval_stmts(&program.block.stmts, &mut env, &ctx) {
            Ok(_) => Ok(output.take()),
            Err(e) => {
                let line = (self.inner.options.debug && line.get() > 0).then(|| line.get());
                Err(TemplateError::Render {
                    filename: self.inner.options.display_name().to_string(),
                    line,
                    source_line: line.and_then(|l| compiler::source_line(&self.inner.source, l)),
                    message: e.to_string(),
                })
            }
        }
    }

    fn escalate(&self) -> Option<Render> {
        if let Some(debug) = self.inner.escalated.borrow().as_ref() {
            return Some(debug.clone());
        }
        let engine = TemplateEngine::from_inner(self.inner.engine.upgrade()?);
        let options = self.inner.options.clone().with_debug(true);
        let debug = engine.compile(&self.inner.source, options);
        *self.inner.escalated.borrow_mut() = Some(debug.clone());
        Some(debug)
    }

    fn report(&self, err: &TemplateError) {
        match self.inner.engine.upgrade() {
            Some(inner) => TemplateEngine::from_inner(inner).report(err),
            None => super::default_error_hook(err),
        }
    }
}

impl fmt::Debug for Render {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Render")
            .field("filename", &self.inner.options.filename)
            .field("failed", &self.inner.program.is_err())
            .finish()
    }
}

/// Binding precedence below the pseudo-functions: utilities, then
/// helpers, then a field of the data.
pub(crate) fn resolve(name: &str, engine: Option<&TemplateEngine>, data: &Value) -> Value {
    if let Some(utility) = utilities().into_iter().find(|u| u.name == name) {
        return Value::BuiltinFn(utility);
    }
    if let Some(helper) = engine.and_then(|e| e.helper_named(name)) {
        return helper;
    }
    data.get_property(name)
}

// ═══════════════════════════════════════════════════════════════════════
// Output Functions
// ═══════════════════════════════════════════════════════════════════════

fn output_fn(output: &Rc<RefCell<String>>) -> BuiltinFn {
    let output = Rc::clone(output);
    BuiltinFn::variadic(OUTPUT_FN, move |args| {
        let mut out = output.borrow_mut();
        for arg in args {
            out.push_str(&arg.to_text());
        }
        Ok(Value::Undefined)
    })
}

fn line_fn(line: &Rc<Cell<usize>>) -> BuiltinFn {
    let line = Rc::clone(line);
    BuiltinFn::new(LINE_FN, 1, move |args| {
        line.set(args[0].to_number() as usize);
        Ok(Value::Undefined)
    })
}

/// `print(a, b, ..)` appends its arguments to the output.
fn print_fn(output: &Rc<RefCell<String>>) -> BuiltinFn {
    let output = Rc::clone(output);
    BuiltinFn::variadic("print", move |args| {
        let mut out = output.borrow_mut();
        for arg in args {
            out.push_str(&arg.to_text());
        }
        Ok(Value::Undefined)
    })
}

/// `include(filename[, data])` renders a cached template into the
/// output, with the current data by default.
fn include_fn(output: &Rc<RefCell<String>>, engine: &Weak<EngineInner>, data: &Value) -> BuiltinFn {
    let output = Rc::clone(output);
    let engine = engine.clone();
    let data = data.clone();
    BuiltinFn::variadic("include", move |args| {
        let engine = engine.upgrade().ok_or("template engine dropped")?;
        let filename = args.first().map(Value::to_text).unwrap_or_default();
        let data = match args.get(1) {
            Some(d) if !d.is_undefined() => d.clone(),
            _ => data.clone(),
        };
        let text = TemplateEngine::from_inner(engine).render_file(&filename, &data);
        output.borrow_mut().push_str(&text);
        Ok(Value::Undefined)
    })
}

/// `__include(filename, data)` returns the rendered text.
fn include_utility(engine: &Weak<EngineInner>) -> BuiltinFn {
    let engine = engine.clone();
    BuiltinFn::variadic("__include", move |args| {
        let engine = engine.upgrade().ok_or("template engine dropped")?;
        let filename = args.first().map(Value::to_text).unwrap_or_default();
        let data = args.get(1).cloned().unwrap_or_default();
        Ok(Value::from(
            TemplateEngine::from_inner(engine).render_file(&filename, &data),
        ))
    })
}
