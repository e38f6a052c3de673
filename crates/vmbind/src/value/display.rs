//! Display and Debug implementations for Value

use std::fmt;

use super::*;

/// Format a number the way it appears when converted to text.
///
/// Integral values print without a fractional part, `-0` prints as `0`,
/// and the non-finite values use their conventional names.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    if n.fract() == 0.0 && n.abs() < 1e21 {
        return format!("{:.0}", n);
    }
    format!("{}", n)
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::String(s) => write!(f, "{:?}", s.as_ref()),

            Value::List(list) => {
                write!(f, "[")?;
                for (i, item) in list.to_vec().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{:?}", item)?;
                }
                write!(f, "]")
            }

            Value::Object(object) => {
                write!(f, "{{")?;
                for (i, (key, value)) in object.entries().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {:?}", key, value)?;
                }
                write!(f, "}}")
            }

            Value::Closure(closure) => write!(f, "<closure/{}>", closure.params.len()),
            Value::BuiltinFn(builtin) => write!(f, "<builtin {}>", builtin.name),
        }
    }
}

/// Text conversion, as used by string concatenation and `__string`.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::String(s) => write!(f, "{}", s),

            // Lists join their items with commas; missing items are empty.
            Value::List(list) => {
                for (i, item) in list.to_vec().iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", item.to_text())?;
                }
                Ok(())
            }

            Value::Object(_) => write!(f, "[object Object]"),
            Value::Closure(_) => write!(f, "[closure]"),
            Value::BuiltinFn(builtin) => write!(f, "[builtin {}]", builtin.name),
        }
    }
}
