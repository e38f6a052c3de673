//! Loop expression evaluation

use super::control::ControlFlow;
use super::if_expr::eval_block;
use super::Evaluate;
use crate::error::type_name;
use crate::{Environment, EvalContext, EvalError, Value};

/// What the loop should do after one body evaluation.
enum Step {
    Next,
    Exit(Value),
}

/// Route a body result: matching `break`/`continue` are consumed, other
/// signals and errors propagate.
fn step(result: Result<Value, EvalError>, label: Option<&str>) -> Result<Step, EvalError> {
    match result {
        Ok(_) => Ok(Step::Next),
        Err(EvalError::ControlFlow(cf)) if cf.matches_label(label) => match cf {
            ControlFlow::Break { value, .. } => Ok(Step::Exit(value)),
            _ => Ok(Step::Next),
        },
        Err(e) => Err(e),
    }
}

/// Counts iterations against the context limits.
struct Budget<'a> {
    ctx: &'a EvalContext,
    used: usize,
}

impl<'a> Budget<'a> {
    fn new(ctx: &'a EvalContext) -> Self {
        Self { ctx, used: 0 }
    }

    fn tick(&mut self) -> Result<(), EvalError> {
        if self.ctx.is_interrupted() {
            return Err(EvalError::Interrupted);
        }
        self.used += 1;
        if self.used > self.ctx.max_loop_iterations {
            return Err(EvalError::LoopLimit {
                limit: self.ctx.max_loop_iterations,
            });
        }
        Ok(())
    }
}

fn label_of(label: &Option<syn::Label>) -> Option<String> {
    label.as_ref().map(|l| l.name.ident.to_string())
}

// ═══════════════════════════════════════════════════════════════════════
// loop expression
// ═══════════════════════════════════════════════════════════════════════

impl Evaluate for syn::ExprLoop {
    fn eval(&self, env: &mut Environment, ctx: &EvalContext) -> Result<Value, EvalError> {
        let label = label_of(&self.label);
        let mut budget = Budget::new(ctx);
        loop {
            budget.tick()?;
            if let Step::Exit(value) = step(eval_block(&self.body, env, ctx), label.as_deref())? {
                return Ok(value);
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// while expression
// ═══════════════════════════════════════════════════════════════════════

impl Evaluate for syn::ExprWhile {
    fn eval(&self, env: &mut Environment, ctx: &EvalContext) -> Result<Value, EvalError> {
        let label = label_of(&self.label);
        let mut budget = Budget::new(ctx);
        loop {
            budget.tick()?;
            if !self.cond.eval(env, ctx)?.truthy() {
                return Ok(Value::Undefined);
            }
            if let Step::Exit(_) = step(eval_block(&self.body, env, ctx), label.as_deref())? {
                return Ok(Value::Undefined);
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// for expression
// ═══════════════════════════════════════════════════════════════════════

impl Evaluate for syn::ExprForLoop {
    fn eval(&self, env: &mut Environment, ctx: &EvalContext) -> Result<Value, EvalError> {
        let label = label_of(&self.label);
        let items = iteration_items(&self.expr.eval(env, ctx)?)?;
        let mut budget = Budget::new(ctx);

        for item in items {
            budget.tick()?;
            let result = {
                let mut scope = env.scope_guard();
                super::local::bind_pattern(&self.pat, &item, &mut scope)?;
                eval_block(&self.body, &mut scope, ctx)
            };
            if let Step::Exit(_) = step(result, label.as_deref())? {
                break;
            }
        }
        Ok(Value::Undefined)
    }
}

/// The sequence a `for` loop walks.
///
/// Lists yield a snapshot of their elements, objects their keys, strings
/// their characters; `undefined` and `null` yield nothing.
pub fn iteration_items(value: &Value) -> Result<Vec<Value>, EvalError> {
    match value {
        Value::List(list) => Ok(list.to_vec()),
        Value::Object(object) => Ok(object.keys().into_iter().map(Value::from).collect()),
        Value::String(s) => Ok(s.chars().map(|c| Value::from(c.to_string())).collect()),
        Value::Undefined | Value::Null => Ok(Vec::new()),
        other => Err(EvalError::TypeError {
            message: format!("cannot iterate over a {}", type_name(other)),
        }),
    }
}
