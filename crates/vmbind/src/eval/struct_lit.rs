//! Struct literal evaluation: `Object { name: "a", count }` builds an object
//!
//! The struct name is not significant. `..base` copies the entries of
//! another object before the explicit fields are applied.

use super::field::member_name;
use super::Evaluate;
use crate::error::type_name;
use crate::reactive::ObservedObject;
use crate::{Environment, EvalContext, EvalError, Value};

impl Evaluate for syn::ExprStruct {
    fn eval(&self, env: &mut Environment, ctx: &EvalContext) -> Result<Value, EvalError> {
        let object = ObservedObject::new();

        if let Some(rest) = &self.rest {
            match rest.eval(env, ctx)? {
                Value::Object(base) => {
                    for (key, value) in base.entries() {
                        object.insert_unobserved(key, value);
                    }
                }
                other => {
                    return Err(EvalError::TypeError {
                        message: format!("cannot spread a {} into an object", type_name(&other)),
                    })
                }
            }
        }

        for field in &self.fields {
            let value = field.expr.eval(env, ctx)?;
            object.insert_unobserved(member_name(&field.member), value);
        }
        Ok(Value::Object(object))
    }
}
