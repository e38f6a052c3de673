//! Array, tuple and repeat literals, all of which build lists

use super::Evaluate;
use crate::{Environment, EvalContext, EvalError, Value};

impl Evaluate for syn::ExprArray {
    fn eval(&self, env: &mut Environment, ctx: &EvalContext) -> Result<Value, EvalError> {
        let items = self
            .elems
            .iter()
            .map(|e| e.eval(env, ctx))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Value::list(items))
    }
}

impl Evaluate for syn::ExprTuple {
    fn eval(&self, env: &mut Environment, ctx: &EvalContext) -> Result<Value, EvalError> {
        // `()` has no value
        if self.elems.is_empty() {
            return Ok(Value::Undefined);
        }
        let items = self
            .elems
            .iter()
            .map(|e| e.eval(env, ctx))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Value::list(items))
    }
}

impl Evaluate for syn::ExprRepeat {
    fn eval(&self, env: &mut Environment, ctx: &EvalContext) -> Result<Value, EvalError> {
        let item = self.expr.eval(env, ctx)?;
        let count = self.len.eval(env, ctx)?.to_number();
        if !(count >= 0.0 && count.is_finite()) {
            return Err(EvalError::TypeError {
                message: format!("invalid repeat count {}", count),
            });
        }
        let count = count as usize;
        if count > ctx.max_loop_iterations {
            return Err(EvalError::LoopLimit {
                limit: ctx.max_loop_iterations,
            });
        }
        Ok(Value::list(vec![item; count]))
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
    fn test_array_literal() {
        let list = eval("[1, \"a\", true]").unwrap();
        assert_eq!(list.to_string(), "1,a,true");
    }

    #[test]
    fn test_tuple_is_list_and_unit_is_undefined() {
        assert_eq!(eval("(1, 2)").unwrap().get_property("length"), Value::from(2));
        assert_eq!(eval("()").unwrap(), Value::Undefined);
    }

    #[test]
    fn test_repeat() {
        assert_eq!(eval("[0; 3]").unwrap().to_string(), "0,0,0");
        assert!(matches!(eval("[0; -1]"), Err(EvalError::TypeError { .. })));
    }
}
