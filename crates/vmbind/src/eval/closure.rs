//! Closure creation

use std::collections::HashSet;
use std::rc::Rc;

use super::variables::{free_variables, pattern_names};
use super::Evaluate;
use crate::value::ClosureValue;
use crate::{Environment, EvalContext, EvalError, Value};

impl Evaluate for syn::ExprClosure {
    fn eval(&self, env: &mut Environment, _ctx: &EvalContext) -> Result<Value, EvalError> {
        let params: Vec<syn::Pat> = self.inputs.iter().cloned().collect();

        let param_names: HashSet<String> = params.iter().flat_map(pattern_names).collect();
        let captures = free_variables(&self.body)
            .into_iter()
            .filter(|name| !param_names.contains(name))
            .filter_map(|name| env.get(&name).cloned().map(|value| (name, value)))
            .collect();

        Ok(Value::Closure(Rc::new(ClosureValue {
            params,
            body: Rc::new((*self.body).clone()),
            captures,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval_in(env: &mut Environment, src: &str) -> Value {
        let expr: syn::Expr = syn::parse_str(src).unwrap();
        expr.eval(env, &EvalContext::default()).unwrap()
    }

    #[test]
    fn test_captures_only_free_bound_names() {
        let mut env = Environment::new();
        env.define("factor", Value::from(3));
        env.define("unused", Value::from(0));
        let closure = eval_in(&mut env, "|x| x * factor + missing");
        match closure {
            Value::Closure(c) => {
                let names: Vec<&str> = c.captures.iter().map(|(n, _)| n.as_str()).collect();
                assert_eq!(names, vec!["factor"]);
            }
            other => panic!("expected closure, got {:?}", other),
        }
    }

    #[test]
    fn test_same_source_and_captures_compare_equal() {
        let mut env = Environment::new();
        env.define("n", Value::from(1));
        let a = eval_in(&mut env, "|e| n + e");
        let b = eval_in(&mut env, "|e| n + e");
        assert_eq!(a, b);

        env.define("n", Value::from(2));
        let c = eval_in(&mut env, "|e| n + e");
        assert_ne!(a, c);
    }
}
