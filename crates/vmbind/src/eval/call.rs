//! Function and method call evaluation
//!
//! Closures run in a fresh environment holding only their captures and
//! parameters. Builtins receive the evaluated arguments. Method calls on
//! objects first look for a function-valued field of that name, then fall
//! back to the builtin methods of the receiver's type.

use std::cmp::Ordering;

use super::control::ControlFlow;
use super::local::bind_pattern;
use super::{source_text, Evaluate};
use crate::error::type_name;
use crate::reactive::{ObservableList, ObservedObject};
use crate::value::{format_number, ClosureValue};
use crate::{BindingMode, Environment, EvalContext, EvalError, Value};

impl Evaluate for syn::ExprCall {
    fn eval(&self, env: &mut Environment, ctx: &EvalContext) -> Result<Value, EvalError> {
        let func = self.func.eval(env, ctx)?;
        if !func.is_callable() {
            return Err(EvalError::TypeError {
                message: format!(
                    "`{}` is not a function (found {})",
                    source_text(&self.func),
                    type_name(&func)
                ),
            });
        }
        let args = eval_args(&self.args, env, ctx)?;
        call_value(&func, &args, env, ctx)
    }
}

impl Evaluate for syn::ExprMethodCall {
    fn eval(&self, env: &mut Environment, ctx: &EvalContext) -> Result<Value, EvalError> {
        let receiver = self.receiver.eval(env, ctx)?;
        let args = eval_args(&self.args, env, ctx)?;
        call_method(&receiver, &self.method.to_string(), &args, env, ctx)
    }
}

fn eval_args<'a>(
    args: impl IntoIterator<Item = &'a syn::Expr>,
    env: &mut Environment,
    ctx: &EvalContext,
) -> Result<Vec<Value>, EvalError> {
    args.into_iter().map(|a| a.eval(env, ctx)).collect()
}

// ═══════════════════════════════════════════════════════════════════════
// Calling Values
// ═══════════════════════════════════════════════════════════════════════

/// Call a closure or builtin.
///
/// Missing closure arguments are `undefined`; extra ones are ignored.
/// Builtins with a fixed arity must get exactly that many.
pub fn call_value(
    func: &Value,
    args: &[Value],
    env: &mut Environment,
    ctx: &EvalContext,
) -> Result<Value, EvalError> {
    match func {
        Value::BuiltinFn(builtin) => {
            if builtin.arity >= 0 && args.len() != builtin.arity as usize {
                return Err(EvalError::ArityMismatch {
                    name: builtin.name.clone(),
                    expected: builtin.arity as usize,
                    got: args.len(),
                });
            }
            (builtin.func)(args).map_err(|message| EvalError::BuiltinError {
                name: builtin.name.clone(),
                message,
            })
        }
        Value::Closure(closure) => call_closure(closure, args, env, ctx),
        other => Err(EvalError::TypeError {
            message: format!("a {} is not a function", type_name(other)),
        }),
    }
}

fn call_closure(
    closure: &ClosureValue,
    args: &[Value],
    env: &mut Environment,
    ctx: &EvalContext,
) -> Result<Value, EvalError> {
    let mut callee = env.for_call()?;
    for (name, value) in &closure.captures {
        callee.define_with_mode(name.clone(), value.clone(), BindingMode::Mutable);
    }
    for (index, pat) in closure.params.iter().enumerate() {
        let arg = args.get(index).cloned().unwrap_or(Value::Undefined);
        bind_pattern(pat, &arg, &mut callee)?;
    }
    match closure.body.eval(&mut callee, ctx) {
        Err(EvalError::ControlFlow(ControlFlow::Return { value })) => Ok(value),
        other => other,
    }
}

impl Value {
    /// Call this value with default evaluation limits.
    ///
    /// Used by native code (helpers, event handlers) that holds a
    /// callable but no interpreter state.
    pub fn call(&self, args: &[Value]) -> Result<Value, EvalError> {
        call_value(self, args, &mut Environment::new(), &EvalContext::default())
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Method Dispatch
// ═══════════════════════════════════════════════════════════════════════

/// Call `receiver.method(args)`.
pub fn call_method(
    receiver: &Value,
    method: &str,
    args: &[Value],
    env: &mut Environment,
    ctx: &EvalContext,
) -> Result<Value, EvalError> {
    if let Value::Object(object) = receiver {
        let field = object.get(method);
        if field.is_callable() {
            return call_value(&field, args, env, ctx);
        }
    }

    let result = match receiver {
        Value::String(s) => string_method(s, method, args)?,
        Value::List(list) => list_method(list, method, args, env, ctx)?,
        Value::Object(object) => object_method(object, method, args)?,
        Value::Number(n) => number_method(*n, method, args)?,
        Value::Closure(_) | Value::BuiltinFn(_) if method == "call" => {
            return call_value(receiver, args, env, ctx)
        }
        Value::Undefined | Value::Null => {
            return Err(EvalError::UndefinedProperty {
                property: method.to_string(),
                base: type_name(receiver).to_string(),
            })
        }
        _ => None,
    };

    if let Some(value) = result {
        return Ok(value);
    }
    match method {
        "to_string" | "toString" => Ok(Value::from(receiver.to_string())),
        "clone" => Ok(receiver.clone()),
        _ => Err(EvalError::TypeError {
            message: format!("no method `{}` on a {}", method, type_name(receiver)),
        }),
    }
}

fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or(Value::Undefined)
}

/// Resolve a possibly negative index against a length, clamped.
fn relative_index(value: &Value, len: usize, default: usize) -> usize {
    if value.is_undefined() {
        return default;
    }
    let n = value.to_number();
    if n.is_nan() {
        return 0;
    }
    let n = n.trunc();
    if n < 0.0 {
        (len as f64 + n).max(0.0) as usize
    } else {
        (n as usize).min(len)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// String Methods
// ═══════════════════════════════════════════════════════════════════════

fn string_method(s: &str, method: &str, args: &[Value]) -> Result<Option<Value>, EvalError> {
    let text = |i: usize| arg(args, i).to_string();
    let value = match method {
        "len" | "length" => Value::from(s.chars().count()),
        "is_empty" => Value::Bool(s.is_empty()),
        "to_uppercase" | "toUpperCase" => Value::from(s.to_uppercase()),
        "to_lowercase" | "toLowerCase" => Value::from(s.to_lowercase()),
        "trim" => Value::from(s.trim()),
        "trim_start" | "trimStart" => Value::from(s.trim_start()),
        "trim_end" | "trimEnd" => Value::from(s.trim_end()),
        "contains" | "includes" => Value::Bool(s.contains(text(0).as_str())),
        "starts_with" | "startsWith" => Value::Bool(s.starts_with(text(0).as_str())),
        "ends_with" | "endsWith" => Value::Bool(s.ends_with(text(0).as_str())),
        "replace" => Value::from(s.replace(text(0).as_str(), &text(1))),
        "repeat" => {
            let count = arg(args, 0).to_number();
            if !(count >= 0.0 && count.is_finite()) {
                return Err(EvalError::TypeError {
                    message: format!("invalid repeat count {}", format_number(count)),
                });
            }
            Value::from(s.repeat(count as usize))
        }
        "split" => {
            let parts: Vec<Value> = match arg(args, 0) {
                Value::Undefined => vec![Value::from(s)],
                sep => {
                    let sep = sep.to_string();
                    if sep.is_empty() {
                        s.chars().map(|c| Value::from(c.to_string())).collect()
                    } else {
                        s.split(sep.as_str()).map(Value::from).collect()
                    }
                }
            };
            Value::list(parts)
        }
        "chars" => Value::list(s.chars().map(|c| Value::from(c.to_string())).collect()),
        "index_of" | "indexOf" => {
            let needle = text(0);
            match s.find(needle.as_str()) {
                Some(byte) => Value::from(s[..byte].chars().count()),
                None => Value::from(-1),
            }
        }
        "slice" | "substring" => {
            let chars: Vec<char> = s.chars().collect();
            let start = relative_index(&arg(args, 0), chars.len(), 0);
            let end = relative_index(&arg(args, 1), chars.len(), chars.len());
            if start >= end {
                Value::from("")
            } else {
                Value::from(chars[start..end].iter().collect::<String>())
            }
        }
        "char_at" | "charAt" => {
            let index = arg(args, 0).to_number();
            let c = if index >= 0.0 {
                s.chars().nth(index as usize)
            } else {
                None
            };
            Value::from(c.map(|c| c.to_string()).unwrap_or_default())
        }
        "parse" => Value::Number(Value::from(s).to_number()),
        "concat" => {
            let mut out = s.to_string();
            for a in args {
                out.push_str(&a.to_string());
            }
            Value::from(out)
        }
        _ => return Ok(None),
    };
    Ok(Some(value))
}

// ═══════════════════════════════════════════════════════════════════════
// List Methods
// ═══════════════════════════════════════════════════════════════════════

fn list_method(
    list: &ObservableList,
    method: &str,
    args: &[Value],
    env: &mut Environment,
    ctx: &EvalContext,
) -> Result<Option<Value>, EvalError> {
    let value = match method {
        "len" | "length" => Value::from(list.len()),
        "is_empty" => Value::Bool(list.is_empty()),
        "push" => {
            let mut len = list.len();
            for a in args {
                len = list.push(a.clone())?;
            }
            Value::from(len)
        }
        "pop" => list.pop(),
        "shift" => list.shift(),
        "unshift" => {
            let mut len = list.len();
            for a in args.iter().rev() {
                len = list.unshift(a.clone())?;
            }
            Value::from(len)
        }
        "splice" => {
            let len = list.len();
            let start = relative_index(&arg(args, 0), len, 0);
            let count = match args.get(1) {
                None => len - start,
                Some(n) => {
                    let n = n.to_number();
                    if n.is_nan() || n < 0.0 {
                        0
                    } else {
                        n as usize
                    }
                }
            };
            let items = args.iter().skip(2).cloned().collect();
            Value::list(list.splice(start, count, items)?)
        }
        "sort" => {
            match args.first() {
                Some(compare) if compare.is_callable() => {
                    // Sort a copy: the comparator may read the list.
                    let mut items = list.to_vec();
                    let mut failure = None;
                    items.sort_by(|a, b| {
                        if failure.is_some() {
                            return Ordering::Equal;
                        }
                        match call_value(compare, &[a.clone(), b.clone()], env, ctx) {
                            Ok(result) => ordering_of(&result),
                            Err(e) => {
                                failure = Some(e);
                                Ordering::Equal
                            }
                        }
                    });
                    if let Some(e) = failure {
                        return Err(e);
                    }
                    list.splice(0, items.len(), items)?;
                }
                _ => list.sort(),
            }
            Value::List(list.clone())
        }
        "reverse" => {
            list.reverse();
            Value::List(list.clone())
        }
        "join" => {
            let sep = match arg(args, 0) {
                Value::Undefined => ",".to_string(),
                sep => sep.to_string(),
            };
            Value::from(list.join(&sep))
        }
        "concat" => {
            let mut extra = Vec::new();
            for a in args {
                match a {
                    Value::List(other) => extra.extend(other.to_vec()),
                    other => extra.push(other.clone()),
                }
            }
            Value::List(list.concat(&extra))
        }
        "index_of" | "indexOf" => match list.index_of(&arg(args, 0)) {
            Some(i) => Value::from(i),
            None => Value::from(-1),
        },
        "contains" | "includes" => Value::Bool(list.index_of(&arg(args, 0)).is_some()),
        "slice" => {
            let items = list.to_vec();
            let start = relative_index(&arg(args, 0), items.len(), 0);
            let end = relative_index(&arg(args, 1), items.len(), items.len());
            let slice = if start < end {
                items[start..end].to_vec()
            } else {
                Vec::new()
            };
            Value::list(slice)
        }
        "first" => list.get(0),
        "last" => match list.len() {
            0 => Value::Undefined,
            n => list.get(n - 1),
        },
        "get" => match arg(args, 0).to_number() {
            n if n >= 0.0 => list.get(n as usize),
            _ => Value::Undefined,
        },
        "set" => {
            let index = arg(args, 0).to_number();
            if !(index >= 0.0 && index.is_finite()) {
                return Err(EvalError::TypeError {
                    message: format!("invalid list index {}", format_number(index)),
                });
            }
            Value::Bool(list.set(index as usize, arg(args, 1))?)
        }
        "iter" | "into_iter" => Value::List(list.clone()),
        "to_vec" => Value::list(list.to_vec()),
        "map" | "filter" | "for_each" | "forEach" | "find" | "find_index" | "findIndex"
        | "any" | "some" | "all" | "every" => {
            return iterate(list, method, &arg(args, 0), env, ctx).map(Some)
        }
        "reduce" => {
            let f = arg(args, 0);
            let mut items = list.to_vec().into_iter().enumerate();
            let mut acc = match args.get(1) {
                Some(init) => init.clone(),
                None => match items.next() {
                    Some((_, first)) => first,
                    None => {
                        return Err(EvalError::TypeError {
                            message: "reduce of empty list with no initial value".to_string(),
                        })
                    }
                },
            };
            for (index, item) in items {
                acc = call_value(&f, &[acc, item, Value::from(index)], env, ctx)?;
            }
            acc
        }
        _ => return Ok(None),
    };
    Ok(Some(value))
}

/// Callback-driven list methods. The callback gets `(item, index)`.
fn iterate(
    list: &ObservableList,
    method: &str,
    f: &Value,
    env: &mut Environment,
    ctx: &EvalContext,
) -> Result<Value, EvalError> {
    if !f.is_callable() {
        return Err(EvalError::TypeError {
            message: format!("`{}` expects a function, found {}", method, type_name(f)),
        });
    }
    let mut mapped = Vec::new();
    for (index, item) in list.to_vec().into_iter().enumerate() {
        let result = call_value(f, &[item.clone(), Value::from(index)], env, ctx)?;
        match method {
            "map" => mapped.push(result),
            "filter" if result.truthy() => mapped.push(item),
            "find" if result.truthy() => return Ok(item),
            "find_index" | "findIndex" if result.truthy() => return Ok(Value::from(index)),
            "any" | "some" if result.truthy() => return Ok(Value::Bool(true)),
            "all" | "every" if !result.truthy() => return Ok(Value::Bool(false)),
            _ => {}
        }
    }
    Ok(match method {
        "map" | "filter" => Value::list(mapped),
        "find_index" | "findIndex" => Value::from(-1),
        "any" | "some" => Value::Bool(false),
        "all" | "every" => Value::Bool(true),
        _ => Value::Undefined,
    })
}

/// Comparator results: negative, zero or positive numbers; booleans mean
/// "a sorts before b".
fn ordering_of(result: &Value) -> Ordering {
    match result {
        Value::Bool(true) => Ordering::Less,
        Value::Bool(false) => Ordering::Greater,
        other => other
            .to_number()
            .partial_cmp(&0.0)
            .unwrap_or(Ordering::Equal),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Object Methods
// ═══════════════════════════════════════════════════════════════════════

fn object_method(
    object: &ObservedObject,
    method: &str,
    args: &[Value],
) -> Result<Option<Value>, EvalError> {
    let key = || arg(args, 0).to_string();
    let value = match method {
        "keys" => Value::list(object.keys().into_iter().map(Value::from).collect()),
        "values" => Value::list(object.values()),
        "entries" => Value::list(
            object
                .entries()
                .into_iter()
                .map(|(k, v)| Value::list(vec![Value::from(k), v]))
                .collect(),
        ),
        "get" => object.get(&key()),
        "set" => Value::Bool(object.set(key(), arg(args, 1))?),
        "has" | "contains_key" | "hasOwnProperty" => Value::Bool(object.contains_key(&key())),
        "remove" | "delete" => object.remove(&key()).unwrap_or(Value::Undefined),
        "len" => Value::from(object.len()),
        "is_empty" => Value::Bool(object.is_empty()),
        _ => return Ok(None),
    };
    Ok(Some(value))
}

// ═══════════════════════════════════════════════════════════════════════
// Number Methods
// ═══════════════════════════════════════════════════════════════════════

fn number_method(n: f64, method: &str, args: &[Value]) -> Result<Option<Value>, EvalError> {
    let other = || arg(args, 0).to_number();
    let value = match method {
        "to_fixed" | "toFixed" => {
            let digits = arg(args, 0).to_number();
            let digits = if digits.is_nan() { 0 } else { digits.clamp(0.0, 100.0) as usize };
            Value::from(format!("{:.*}", digits, n))
        }
        "floor" => Value::Number(n.floor()),
        "ceil" => Value::Number(n.ceil()),
        "round" => Value::Number((n + 0.5).floor()),
        "trunc" => Value::Number(n.trunc()),
        "abs" => Value::Number(n.abs()),
        "sqrt" => Value::Number(n.sqrt()),
        "pow" | "powf" | "powi" => Value::Number(n.powf(other())),
        "min" => Value::Number(n.min(other())),
        "max" => Value::Number(n.max(other())),
        "is_nan" => Value::Bool(n.is_nan()),
        _ => return Ok(None),
    };
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn eval_with(env: &mut Environment, src: &str) -> Result<Value, EvalError> {
        let block: syn::Block = syn::parse_str(&format!("{{ {} }}", src)).unwrap();
        super::super::eval_stmts(&block.stmts, env, &EvalContext::default())
    }

    fn eval(src: &str) -> Result<Value, EvalError> {
        eval_with(&mut Environment::new(), src)
    }

    #[test]
    fn test_closure_call_with_missing_args() {
        assert_eq!(eval("let f = |a, b| b; f(1)").unwrap(), Value::Undefined);
        assert_eq!(eval("let add = |a, b| a + b; add(2, 3)").unwrap(), Value::from(5));
    }

    #[test]
    fn test_return_inside_closure() {
        let v = eval("let f = |x| { if x > 1 { return \"big\"; } \"small\" }; f(5) + f(0)").unwrap();
        assert_eq!(v, Value::from("bigsmall"));
    }

    #[test]
    fn test_call_non_function() {
        let mut env = Environment::new();
        env.define("n", Value::from(1));
        assert!(matches!(eval_with(&mut env, "n(1)"), Err(EvalError::TypeError { .. })));
    }

    #[test]
    fn test_recursion_depth_limit() {
        let mut env = Environment::with_max_call_depth(8);
        let fact = "let f = |f, n| if n <= 1 { 1 } else { n * f(f, n - 1) };";
        assert_eq!(
            eval_with(&mut env, &format!("{} f(f, 5)", fact)).unwrap(),
            Value::from(120)
        );
        assert!(matches!(
            eval_with(&mut env, &format!("{} f(f, 50)", fact)),
            Err(EvalError::Environment(_))
        ));
    }

    #[test]
    fn test_builtin_arity_and_errors() {
        let mut env = Environment::new();
        env.define("one", Value::builtin("one", 1, |a| Ok(a[0].clone())));
        env.define("boom", Value::builtin("boom", -1, |_| Err("no".to_string())));
        assert!(matches!(
            eval_with(&mut env, "one()"),
            Err(EvalError::ArityMismatch { expected: 1, got: 0, .. })
        ));
        assert!(matches!(
            eval_with(&mut env, "boom(1, 2)"),
            Err(EvalError::BuiltinError { message, .. }) if message == "no"
        ));
    }

    #[test]
    fn test_string_methods() {
        assert_eq!(eval("\"a-b-c\".split(\"-\").len()").unwrap(), Value::from(3));
        assert_eq!(eval("\"Hello\".toUpperCase()").unwrap(), Value::from("HELLO"));
        assert_eq!(eval("\"héllo\".slice(1, -1)").unwrap(), Value::from("éll"));
        assert_eq!(eval("\"abc\".indexOf(\"z\")").unwrap(), Value::from(-1));
        assert_eq!(eval("\" x \".trim().repeat(3)").unwrap(), Value::from("xxx"));
    }

    #[test]
    fn test_list_methods() {
        let mut env = Environment::new();
        let items = Value::from(json!([3, 1, 2]));
        env.define("items", items.clone());
        assert_eq!(
            eval_with(&mut env, "items.iter().map(|x, i| x * 10 + i).join(\"|\")").unwrap(),
            Value::from("30|11|22")
        );
        assert_eq!(
            eval_with(&mut env, "items.filter(|x| x > 1).len()").unwrap(),
            Value::from(2)
        );
        eval_with(&mut env, "items.sort(|a, b| b - a); items.push(0, -1);").unwrap();
        assert_eq!(items.to_json(), json!([3, 2, 1, 0, -1]));
        assert_eq!(
            eval_with(&mut env, "items.splice(1, 2).join()").unwrap(),
            Value::from("2,1")
        );
        assert_eq!(
            eval_with(&mut env, "items.reduce(|acc, x| acc + x, 100)").unwrap(),
            Value::from(102)
        );
    }

    #[test]
    fn test_object_methods_and_function_fields() {
        let mut env = Environment::new();
        let obj = Value::from(json!({"a": 1}));
        obj.as_object()
            .unwrap()
            .set("double", Value::builtin("double", 1, |a| Ok(Value::from(a[0].to_number() * 2.0))))
            .unwrap();
        env.define("obj", obj);
        assert_eq!(eval_with(&mut env, "obj.double(21)").unwrap(), Value::from(42));
        assert_eq!(eval_with(&mut env, "obj.keys().join()").unwrap(), Value::from("a,double"));
        assert_eq!(eval_with(&mut env, "obj.has(\"a\")").unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_number_methods() {
        assert_eq!(eval("(2.345).toFixed(2)").unwrap(), Value::from("2.35"));
        assert_eq!(eval("(-2.5).round()").unwrap(), Value::from(-2));
        assert_eq!(eval("(7).to_string()").unwrap(), Value::from("7"));
    }

    #[test]
    fn test_method_on_undefined() {
        let mut env = Environment::new();
        env.define("x", Value::Undefined);
        assert!(matches!(
            eval_with(&mut env, "x.len()"),
            Err(EvalError::UndefinedProperty { .. })
        ));
    }
}
