//! Path (variable reference) evaluation

use super::Evaluate;
use crate::{Environment, EvalContext, EvalError, Value};

/// Names that evaluate to a constant unless shadowed by a binding.
pub const CONSTANT_NAMES: &[&str] = &["undefined", "null", "NaN", "Infinity"];

impl Evaluate for syn::ExprPath {
    fn eval(&self, env: &mut Environment, _ctx: &EvalContext) -> Result<Value, EvalError> {
        let name = path_ident(self).ok_or_else(|| EvalError::UnsupportedExpr {
            kind: format!("path `{}`", super::source_text(&self.path)),
        })?;

        if let Some(value) = env.get(&name) {
            return Ok(value.clone());
        }
        constant(&name).ok_or(EvalError::UndefinedVariable { name })
    }
}

/// The identifier of a single-segment path without generics.
pub fn path_ident(path: &syn::ExprPath) -> Option<String> {
    if path.qself.is_some() || path.path.segments.len() != 1 {
        return None;
    }
    let segment = path.path.segments.first()?;
    match segment.arguments {
        syn::PathArguments::None => Some(segment.ident.to_string()),
        _ => None,
    }
}

fn constant(name: &str) -> Option<Value> {
    match name {
        "undefined" => Some(Value::Undefined),
        "null" => Some(Value::Null),
        "NaN" => Some(Value::Number(f64::NAN)),
        "Infinity" => Some(Value::Number(f64::INFINITY)),
        _ => None,
    }
}
