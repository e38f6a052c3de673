//! Assignment evaluation

use super::{expr_kind_name, Evaluate};
use crate::error::type_name;
use crate::{Environment, EvalContext, EvalError, Value};

impl Evaluate for syn::ExprAssign {
    fn eval(&self, env: &mut Environment, ctx: &EvalContext) -> Result<Value, EvalError> {
        let value = self.right.eval(env, ctx)?;
        assign_to(&self.left, value.clone(), env, ctx)?;
        Ok(value)
    }
}

/// Write `value` to an assignment target.
///
/// Variables must be mutable bindings. Object fields and list indexes
/// are written through the reactive containers, so observers see them.
pub fn assign_to(
    target: &syn::Expr,
    value: Value,
    env: &mut Environment,
    ctx: &EvalContext,
) -> Result<(), EvalError> {
    match target {
        syn::Expr::Path(path) => {
            let name = super::path::path_ident(path).ok_or_else(|| invalid(target))?;
            env.assign(&name, value)?;
            Ok(())
        }

        syn::Expr::Field(field) => {
            let base = field.base.eval(env, ctx)?;
            let key = super::field::member_name(&field.member);
            write_property(&base, &key, value)
        }

        syn::Expr::Index(index) => {
            let base = index.expr.eval(env, ctx)?;
            let key = index.index.eval(env, ctx)?;
            write_property(&base, &key.to_string(), value)
        }

        syn::Expr::Paren(paren) => assign_to(&paren.expr, value, env, ctx),
        syn::Expr::Unary(unary) if matches!(unary.op, syn::UnOp::Deref(_)) => {
            assign_to(&unary.expr, value, env, ctx)
        }

        _ => Err(invalid(target)),
    }
}

/// Write a property of an object or an element of a list.
pub fn write_property(base: &Value, key: &str, value: Value) -> Result<(), EvalError> {
    match base {
        Value::Object(object) => {
            object.set(key, value)?;
            Ok(())
        }
        Value::List(list) => {
            let index = key.parse::<usize>().map_err(|_| EvalError::TypeError {
                message: format!("cannot assign to list property `{}`", key),
            })?;
            list.set(index, value)?;
            Ok(())
        }
        Value::Undefined | Value::Null => Err(EvalError::UndefinedProperty {
            property: key.to_string(),
            base: type_name(base).to_string(),
        }),
        other => Err(EvalError::TypeError {
            message: format!("cannot assign property `{}` on a {}", key, type_name(other)),
        }),
    }
}

fn invalid(target: &syn::Expr) -> EvalError {
    EvalError::InvalidAssignTarget {
        kind: expr_kind_name(target).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn eval_with(env: &mut Environment, src: &str) -> Result<Value, EvalError> {
        let block: syn::Block = syn::parse_str(&format!("{{ {} }}", src)).unwrap();
        super::super::eval_stmts(&block.stmts, env, &EvalContext::default())
    }

    #[test]
    fn test_field_assignment_writes_object() {
        let mut env = Environment::new();
        let user = Value::from(json!({"name": "a"}));
        env.define("user", user.clone());
        eval_with(&mut env, "user.name = \"b\";").unwrap();
        assert_eq!(user.get_property("name"), Value::from("b"));
    }

    #[test]
    fn test_index_assignment_and_compound() {
        let mut env = Environment::new();
        let items = Value::from(json!([1, 2]));
        env.define("items", items.clone());
        eval_with(&mut env, "items[1] += 10; items[\"0\"] = 5;").unwrap();
        assert_eq!(items.to_json(), json!([5, 12]));
    }

    #[test]
    fn test_assign_on_undefined_base() {
        let mut env = Environment::new();
        env.define("x", Value::Undefined);
        assert!(matches!(
            eval_with(&mut env, "x.y = 1;"),
            Err(EvalError::UndefinedProperty { .. })
        ));
    }

    #[test]
    fn test_assign_to_call_is_invalid() {
        let mut env = Environment::new();
        assert!(matches!(
            eval_with(&mut env, "f() = 1;"),
            Err(EvalError::InvalidAssignTarget { .. })
        ));
    }
}
