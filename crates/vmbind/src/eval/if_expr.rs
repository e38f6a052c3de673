//! If expressions, blocks and statements

use super::Evaluate;
use crate::{Environment, EvalContext, EvalError, Value};

impl Evaluate for syn::ExprIf {
    fn eval(&self, env: &mut Environment, ctx: &EvalContext) -> Result<Value, EvalError> {
        if let syn::Expr::Let(_) = &*self.cond {
            return Err(EvalError::UnsupportedExpr {
                kind: "if let".to_string(),
            });
        }

        let cond = self.cond.eval(env, ctx)?;
        if cond.truthy() {
            eval_block(&self.then_branch, env, ctx)
        } else if let Some((_, else_branch)) = &self.else_branch {
            else_branch.eval(env, ctx)
        } else {
            Ok(Value::Undefined)
        }
    }
}

/// Evaluate a block in its own scope.
///
/// The value is the trailing expression; a block ending in a statement
/// is `undefined`.
pub fn eval_block(
    block: &syn::Block,
    env: &mut Environment,
    ctx: &EvalContext,
) -> Result<Value, EvalError> {
    let mut scope = env.scope_guard();
    eval_stmts(&block.stmts, &mut scope, ctx)
}

/// Evaluate statements in the current scope.
pub fn eval_stmts(
    stmts: &[syn::Stmt],
    env: &mut Environment,
    ctx: &EvalContext,
) -> Result<Value, EvalError> {
    let mut last = Value::Undefined;
    for stmt in stmts {
        last = match stmt {
            syn::Stmt::Local(local) => {
                super::local::eval_local(local, env, ctx)?;
                Value::Undefined
            }
            syn::Stmt::Expr(expr, None) => expr.eval(env, ctx)?,
            syn::Stmt::Expr(expr, Some(_)) => {
                expr.eval(env, ctx)?;
                Value::Undefined
            }
            syn::Stmt::Macro(stmt) => {
                let value = super::macros::eval_macro(&stmt.mac, env, ctx)?;
                if stmt.semi_token.is_some() {
                    Value::Undefined
                } else {
                    value
                }
            }
            syn::Stmt::Item(_) => {
                return Err(EvalError::UnsupportedExpr {
                    kind: "item declaration".to_string(),
                })
            }
        };
    }
    Ok(last)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(src: &str) -> Result<Value, EvalError> {
        let expr: syn::Expr = syn::parse_str(src).unwrap();
        expr.eval(&mut Environment::new(), &EvalContext::default())
    }

    #[test]
    fn test_if_uses_truthiness() {
        assert_eq!(eval("if \"\" { 1 } else { 2 }").unwrap(), Value::from(2));
        assert_eq!(eval("if [0] { 1 } else { 2 }").unwrap(), Value::from(1));
    }

    #[test]
    fn test_if_without_else_is_undefined() {
        assert_eq!(eval("if false { 1 }").unwrap(), Value::Undefined);
    }

    #[test]
    fn test_block_trailing_semicolon() {
        assert_eq!(eval("{ 1; }").unwrap(), Value::Undefined);
        assert_eq!(eval("{ let a = 2; a * 3 }").unwrap(), Value::from(6));
    }

    #[test]
    fn test_block_scope_is_dropped() {
        let mut env = Environment::new();
        let expr: syn::Expr = syn::parse_str("{ let inner = 1; inner }").unwrap();
        expr.eval(&mut env, &EvalContext::default()).unwrap();
        assert!(!env.contains("inner"));
    }

    #[test]
    fn test_items_unsupported() {
        assert!(matches!(
            eval("{ fn f() {} }"),
            Err(EvalError::UnsupportedExpr { .. })
        ));
    }
}
