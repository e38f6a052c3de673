//! Binding expression compiler
//!
//! A getter evaluates an expression against a data root: every free
//! identifier is pre-bound to a utility, a helper or a field of the data,
//! so `user.name` reads naturally. A setter writes through a dotted path.

use std::rc::Rc;

use crate::error::{type_name, BindError};
use crate::eval::field::read_property;
use crate::eval::{free_variables, Evaluate};
use crate::template::{resolve, TemplateEngine};
use crate::{BindingMode, Environment, EvalError, Value};

/// A compiled read of a binding expression.
#[derive(Clone)]
pub struct Getter {
    source: Rc<str>,
    expr: Rc<syn::Expr>,
    variables: Rc<[String]>,
    engine: TemplateEngine,
}

impl Getter {
    /// Expression source.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate against `data`.
    pub fn get(&self, data: &Value) -> Result<Value, EvalError> {
        let ctx = self.engine.context();
        let mut env = Environment::with_max_call_depth(ctx.max_call_depth);
        env.define("self", data.clone());
        for name in self.variables.iter() {
            let value = resolve(name, Some(&self.engine), data);
            env.define_with_mode(name.clone(), value, BindingMode::Mutable);
        }
        self.expr.eval(&mut env, ctx)
    }
}

impl std::fmt::Debug for Getter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Getter").field(&self.source).finish()
    }
}

/// A compiled write through a dotted path.
#[derive(Debug, Clone, PartialEq)]
pub struct Setter {
    path: Vec<String>,
}

impl Setter {
    /// Path segments, root first.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Write `value` at the path below `data`.
    ///
    /// Returns whether the stored value changed.
    pub fn set(&self, data: &Value, value: Value) -> Result<bool, EvalError> {
        let (last, parents) = match self.path.split_last() {
            Some(split) => split,
            None => return Ok(false),
        };
        let mut base = data.clone();
        for segment in parents {
            base = read_property(&base, segment)?;
        }
        match &base {
            Value::Object(object) => Ok(object.set(last.clone(), value)?),
            Value::List(list) => {
                let index = last.parse::<usize>().map_err(|_| EvalError::TypeError {
                    message: format!("cannot assign to list property `{}`", last),
                })?;
                Ok(list.set(index, value)?)
            }
            other => Err(EvalError::UndefinedProperty {
                property: last.clone(),
                base: type_name(other).to_string(),
            }),
        }
    }
}

impl TemplateEngine {
    /// Compile a getter for `expr`.
    ///
    /// The parsed expression is cached per source string.
    pub fn compile_getter(&self, expr: &str) -> Result<Getter, BindError> {
        let parsed = self.parse_expression(expr)?;
        let variables: Vec<String> = free_variables(&parsed)
            .into_iter()
            .filter(|name| name != "self")
            .collect();
        Ok(Getter {
            source: Rc::from(expr.trim()),
            expr: parsed,
            variables: variables.into(),
            engine: self.clone(),
        })
    }

    /// Compile a setter for a dotted path such as `user.name` or `rows.0`.
    pub fn compile_setter(&self, path: &str) -> Result<Setter, BindError> {
        let parsed = self.parse_expression(path)?;
        let mut segments = Vec::new();
        if !dotted_path(&parsed, &mut segments) {
            return Err(BindError::NotAssignable {
                path: path.trim().to_string(),
            });
        }
        if segments.first().map(String::as_str) == Some("self") {
            segments.remove(0);
        }
        if segments.is_empty() {
            return Err(BindError::NotAssignable {
                path: path.trim().to_string(),
            });
        }
        Ok(Setter { path: segments })
    }

    fn parse_expression(&self, source: &str) -> Result<Rc<syn::Expr>, BindError> {
        let key = source.trim();
        if let Some(expr) = self.inner().expressions.borrow().get(key) {
            return Ok(Rc::clone(expr));
        }
        let expr: syn::Expr = syn::parse_str(key).map_err(|e| BindError::Parse {
            expression: key.to_string(),
            message: e.to_string(),
        })?;
        let expr = Rc::new(expr);
        self.inner()
            .expressions
            .borrow_mut()
            .insert(key.to_string(), Rc::clone(&expr));
        Ok(expr)
    }
}

fn dotted_path(expr: &syn::Expr, segments: &mut Vec<String>) -> bool {
    match expr {
        syn::Expr::Path(path) => match crate::eval::path::path_ident(path) {
            Some(name) => {
                segments.push(name);
                true
            }
            None => false,
        },
        syn::Expr::Field(field) => {
            if !dotted_path(&field.base, segments) {
                return false;
            }
            segments.push(crate::eval::field::member_name(&field.member));
            true
        }
        syn::Expr::Paren(paren) => dotted_path(&paren.expr, segments),
        _ => false,
    }
}
