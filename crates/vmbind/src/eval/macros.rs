//! The two macros the interpreter understands: `vec![..]` and `format!(..)`

use syn::punctuated::Punctuated;

use super::Evaluate;
use crate::{Environment, EvalContext, EvalError, Value};

impl Evaluate for syn::ExprMacro {
    fn eval(&self, env: &mut Environment, ctx: &EvalContext) -> Result<Value, EvalError> {
        eval_macro(&self.mac, env, ctx)
    }
}

/// Evaluate a macro invocation in expression or statement position.
pub fn eval_macro(
    mac: &syn::Macro,
    env: &mut Environment,
    ctx: &EvalContext,
) -> Result<Value, EvalError> {
    let name = mac
        .path
        .get_ident()
        .map(ToString::to_string)
        .unwrap_or_default();

    match name.as_str() {
        "vec" => {
            if let Ok((item, len)) = mac.parse_body_with(parse_repeat) {
                let repeat = syn::ExprRepeat {
                    attrs: Vec::new(),
                    bracket_token: Default::default(),
                    expr: Box::new(item),
                    semi_token: Default::default(),
                    len: Box::new(len),
                };
                return repeat.eval(env, ctx);
            }
            let items = args(mac)?
                .iter()
                .map(|e| e.eval(env, ctx))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::list(items))
        }
        "format" => {
            let args = args(mac)?;
            let mut iter = args.iter();
            let template = match iter.next() {
                Some(syn::Expr::Lit(syn::ExprLit {
                    lit: syn::Lit::Str(s),
                    ..
                })) => s.value(),
                _ => {
                    return Err(EvalError::TypeError {
                        message: "format! expects a string literal first".to_string(),
                    })
                }
            };
            let values = iter
                .map(|e| e.eval(env, ctx))
                .collect::<Result<Vec<_>, _>>()?;
            format_string(&template, &values, env).map(Value::from)
        }
        _ => Err(EvalError::UnsupportedExpr {
            kind: format!("macro `{}!`", name),
        }),
    }
}

/// `x; n`, the body of `vec![x; n]`.
pub(crate) fn parse_repeat(input: syn::parse::ParseStream) -> syn::Result<(syn::Expr, syn::Expr)> {
    let item: syn::Expr = input.parse()?;
    input.parse::<syn::Token![;]>()?;
    let len: syn::Expr = input.parse()?;
    Ok((item, len))
}

fn args(mac: &syn::Macro) -> Result<Punctuated<syn::Expr, syn::Token![,]>, EvalError> {
    mac.parse_body_with(Punctuated::parse_terminated)
        .map_err(|e| EvalError::TypeError {
            message: format!("invalid macro arguments: {}", e),
        })
}

/// Substitute `{}`, `{:?}` and `{name}` placeholders; `{{`/`}}` escape.
fn format_string(template: &str, values: &[Value], env: &Environment) -> Result<String, EvalError> {
    let mut out = String::with_capacity(template.len());
    let mut next = values.iter();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let spec: String = chars.by_ref().take_while(|&c| c != '}').collect();
                let (name, debug) = match spec.split_once(':') {
                    Some((name, fmt)) => (name, fmt == "?"),
                    None => (spec.as_str(), false),
                };
                let value = if name.is_empty() {
                    next.next().cloned().ok_or_else(|| EvalError::TypeError {
                        message: "format! is missing an argument".to_string(),
                    })?
                } else {
                    env.get(name)
                        .cloned()
                        .ok_or_else(|| EvalError::UndefinedVariable {
                            name: name.to_string(),
                        })?
                };
                if debug {
                    out.push_str(&format!("{:?}", value));
                } else {
                    out.push_str(&value.to_string());
                }
            }
            other => out.push(other),
        }
    }
    Ok(out)
}
