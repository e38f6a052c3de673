//! Index expression evaluation: `a[0]`, `a["key"]`

use super::Evaluate;
use crate::{Environment, EvalContext, EvalError, Value};

impl Evaluate for syn::ExprIndex {
    fn eval(&self, env: &mut Environment, ctx: &EvalContext) -> Result<Value, EvalError> {
        let base = self.expr.eval(env, ctx)?;
        let key = self.index.eval(env, ctx)?;
        super::field::read_property(&base, &key.to_string())
    }
}
