//! Let statements and pattern binding

use syn::punctuated::Punctuated;

use super::{source_text, Evaluate};
use crate::error::type_name;
use crate::{BindingMode, Environment, EvalContext, EvalError, Value};

/// Evaluate `let pat = init;` (or `let pat;`, which binds `undefined`).
pub fn eval_local(
    local: &syn::Local,
    env: &mut Environment,
    ctx: &EvalContext,
) -> Result<(), EvalError> {
    let value = match &local.init {
        Some(init) if init.diverge.is_some() => {
            return Err(EvalError::UnsupportedExpr {
                kind: "let-else".to_string(),
            })
        }
        Some(init) => init.expr.eval(env, ctx)?,
        None => Value::Undefined,
    };
    bind_pattern(&local.pat, &value, env)
}

/// Bind the names of an irrefutable pattern.
///
/// Identifiers take their mutability from the pattern; tuple and slice
/// patterns destructure lists positionally, with missing elements bound
/// to `undefined`. Type ascriptions are ignored.
pub fn bind_pattern(
    pat: &syn::Pat,
    value: &Value,
    env: &mut Environment,
) -> Result<(), EvalError> {
    match pat {
        syn::Pat::Ident(p) => {
            if p.subpat.is_some() {
                return Err(EvalError::UnsupportedExpr {
                    kind: "binding with subpattern".to_string(),
                });
            }
            let mode = if p.mutability.is_some() {
                BindingMode::Mutable
            } else {
                BindingMode::Immutable
            };
            env.define_with_mode(p.ident.to_string(), value.clone(), mode);
            Ok(())
        }
        syn::Pat::Wild(_) => Ok(()),
        syn::Pat::Type(p) => bind_pattern(&p.pat, value, env),
        syn::Pat::Reference(p) => bind_pattern(&p.pat, value, env),
        syn::Pat::Paren(p) => bind_pattern(&p.pat, value, env),
        syn::Pat::Tuple(p) => destructure(&p.elems, pat, value, env),
        syn::Pat::Slice(p) => destructure(&p.elems, pat, value, env),
        _ => Err(EvalError::UnsupportedExpr {
            kind: format!("pattern `{}`", source_text(pat)),
        }),
    }
}

fn destructure(
    elems: &Punctuated<syn::Pat, syn::Token![,]>,
    pat: &syn::Pat,
    value: &Value,
    env: &mut Environment,
) -> Result<(), EvalError> {
    let list = value.as_list().ok_or_else(|| EvalError::RefutablePattern {
        pattern: source_text(pat),
        found: type_name(value).to_string(),
    })?;
    for (index, elem) in elems.iter().enumerate() {
        if let syn::Pat::Rest(_) = elem {
            break;
        }
        bind_pattern(elem, &list.get(index), env)?;
    }
    Ok(())
}
