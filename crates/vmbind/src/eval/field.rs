//! Field access evaluation

use super::Evaluate;
use crate::error::type_name;
use crate::{Environment, EvalContext, EvalError, Value};

impl Evaluate for syn::ExprField {
    fn eval(&self, env: &mut Environment, ctx: &EvalContext) -> Result<Value, EvalError> {
        let base = self.base.eval(env, ctx)?;
        read_property(&base, &member_name(&self.member))
    }
}

/// `a.b` gives `b`, `t.0` gives `0`.
pub fn member_name(member: &syn::Member) -> String {
    match member {
        syn::Member::Named(ident) => ident.to_string(),
        syn::Member::Unnamed(index) => index.index.to_string(),
    }
}

/// Read a property, failing only when the base is `undefined` or `null`.
pub fn read_property(base: &Value, key: &str) -> Result<Value, EvalError> {
    if base.is_nullish() {
        return Err(EvalError::UndefinedProperty {
            property: key.to_string(),
            base: type_name(base).to_string(),
        });
    }
    Ok(base.get_property(key))
}
