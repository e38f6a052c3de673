//! Range evaluation: `a..b` and `a..=b` produce lists of numbers

use super::Evaluate;
use crate::{Environment, EvalContext, EvalError, Value};

impl Evaluate for syn::ExprRange {
    fn eval(&self, env: &mut Environment, ctx: &EvalContext) -> Result<Value, EvalError> {
        let (Some(start), Some(end)) = (&self.start, &self.end) else {
            return Err(EvalError::UnsupportedExpr {
                kind: "open range".to_string(),
            });
        };
        let start = start.eval(env, ctx)?.to_number();
        let end = end.eval(env, ctx)?.to_number();
        if !start.is_finite() || !end.is_finite() {
            return Err(EvalError::TypeError {
                message: "range bounds must be finite numbers".to_string(),
            });
        }

        let inclusive = matches!(self.limits, syn::RangeLimits::Closed(_));
        let mut items = Vec::new();
        let mut n = start;
        while n < end || (inclusive && n == end) {
            if items.len() >= ctx.max_loop_iterations {
                return Err(EvalError::LoopLimit {
                    limit: ctx.max_loop_iterations,
                });
            }
            items.push(Value::Number(n));
            n += 1.0;
        }
        Ok(Value::list(items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(src: &str) -> Result<Value, EvalError> {
        let expr: syn::Expr = syn::parse_str(src).unwrap();
        expr.eval(&mut Environment::new(), &EvalContext::default())
    }

    #[test]
    fn test_half_open_and_closed() {
        assert_eq!(eval("0..3").unwrap().to_string(), "0,1,2");
        assert_eq!(eval("1..=3").unwrap().to_string(), "1,2,3");
        assert_eq!(eval("3..1").unwrap().to_string(), "");
    }

    #[test]
    fn test_open_range_unsupported() {
        assert!(matches!(eval("0.."), Err(EvalError::UnsupportedExpr { .. })));
    }

    #[test]
    fn test_range_respects_limit() {
        let expr: syn::Expr = syn::parse_str("0..100").unwrap();
        let ctx = EvalContext::default().loop_limit(10);
        assert!(matches!(
            expr.eval(&mut Environment::new(), &ctx),
            Err(EvalError::LoopLimit { limit: 10 })
        ));
    }
}
