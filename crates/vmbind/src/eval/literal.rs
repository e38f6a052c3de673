//! Literal evaluation

use super::Evaluate;
use crate::{Environment, EvalContext, EvalError, Value};

impl Evaluate for syn::ExprLit {
    fn eval(&self, _env: &mut Environment, _ctx: &EvalContext) -> Result<Value, EvalError> {
        eval_lit(&self.lit)
    }
}

/// Convert a literal token to a value. Numeric suffixes are ignored:
/// every number is a double.
pub fn eval_lit(lit: &syn::Lit) -> Result<Value, EvalError> {
    match lit {
        syn::Lit::Str(s) => Ok(Value::from(s.value())),
        syn::Lit::Char(c) => Ok(Value::from(c.value().to_string())),
        syn::Lit::Bool(b) => Ok(Value::Bool(b.value)),
        syn::Lit::Int(i) => i
            .base10_parse::<u64>()
            .map(|n| Value::Number(n as f64))
            .or_else(|_| i.base10_parse::<f64>().map(Value::Number))
            .map_err(|e| EvalError::TypeError {
                message: format!("invalid integer literal: {}", e),
            }),
        syn::Lit::Float(f) => f
            .base10_parse::<f64>()
            .map(Value::Number)
            .map_err(|e| EvalError::TypeError {
                message: format!("invalid float literal: {}", e),
            }),
        syn::Lit::Byte(_) | syn::Lit::ByteStr(_) => Err(EvalError::UnsupportedExpr {
            kind: "byte literal".to_string(),
        }),
        _ => Err(EvalError::UnsupportedExpr {
            kind: "literal".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(src: &str) -> Result<Value, EvalError> {
        let expr: syn::ExprLit = syn::parse_str(src).unwrap();
        expr.eval(&mut Environment::new(), &EvalContext::default())
    }

    #[test]
    fn test_numeric_literals_are_doubles() {
        assert_eq!(lit("42").unwrap(), Value::Number(42.0));
        assert_eq!(lit("42u8").unwrap(), Value::Number(42.0));
        assert_eq!(lit("0x1F").unwrap(), Value::Number(31.0));
        assert_eq!(lit("2.5").unwrap(), Value::Number(2.5));
    }

    #[test]
    fn test_char_is_string() {
        assert_eq!(lit("'x'").unwrap(), Value::from("x"));
    }

    #[test]
    fn test_byte_string_unsupported() {
        assert!(matches!(lit("b\"x\""), Err(EvalError::UnsupportedExpr { .. })));
    }
}
