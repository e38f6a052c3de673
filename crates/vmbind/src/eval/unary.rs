//! Unary operator evaluation

use super::Evaluate;
use crate::{Environment, EvalContext, EvalError, Value};

impl Evaluate for syn::ExprUnary {
    fn eval(&self, env: &mut Environment, ctx: &EvalContext) -> Result<Value, EvalError> {
        let operand = self.expr.eval(env, ctx)?;
        match self.op {
            syn::UnOp::Neg(_) => Ok(Value::Number(-operand.to_number())),
            syn::UnOp::Not(_) => Ok(Value::Bool(!operand.truthy())),
            // Values are not references; `*x` is `x`
            syn::UnOp::Deref(_) => Ok(operand),
            _ => Err(EvalError::UnsupportedExpr {
                kind: "unary operator".to_string(),
            }),
        }
    }
}
