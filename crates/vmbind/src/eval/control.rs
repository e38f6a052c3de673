//! Control flow mechanism for break/continue/return

use super::Evaluate;
use crate::{Environment, EvalContext, EvalError, Value};

/// Control flow signal for non-local jumps.
///
/// `break`, `continue` and `return` evaluate to
/// `Err(EvalError::ControlFlow(..))`, which propagates up until the
/// enclosing loop or closure catches it.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlFlow {
    /// Break out of a loop, optionally with a value.
    Break {
        /// Value to return from the loop
        value: Value,
        /// Optional loop label (`break 'outer`)
        label: Option<String>,
    },

    /// Continue to next iteration of a loop.
    Continue {
        /// Optional loop label
        label: Option<String>,
    },

    /// Return from a closure (or from a template body) with a value.
    Return {
        /// Value to return
        value: Value,
    },
}

impl ControlFlow {
    /// The keyword that produced this signal.
    pub fn keyword(&self) -> &'static str {
        match self {
            ControlFlow::Break { .. } => "break",
            ControlFlow::Continue { .. } => "continue",
            ControlFlow::Return { .. } => "return",
        }
    }

    /// Check if this signal targets a loop with the given label.
    /// Unlabeled signals match the innermost loop.
    pub fn matches_label(&self, loop_label: Option<&str>) -> bool {
        match self {
            ControlFlow::Break { label, .. } | ControlFlow::Continue { label } => {
                match (label, loop_label) {
                    (None, _) => true,
                    (Some(l), Some(ll)) => l == ll,
                    (Some(_), None) => false,
                }
            }
            ControlFlow::Return { .. } => false,
        }
    }
}

fn label_name(label: &Option<syn::Lifetime>) -> Option<String> {
    label.as_ref().map(|l| l.ident.to_string())
}

impl Evaluate for syn::ExprBreak {
    fn eval(&self, env: &mut Environment, ctx: &EvalContext) -> Result<Value, EvalError> {
        let value = match &self.expr {
            Some(expr) => expr.eval(env, ctx)?,
            None => Value::Undefined,
        };
        Err(EvalError::ControlFlow(ControlFlow::Break {
            value,
            label: label_name(&self.label),
        }))
    }
}

impl Evaluate for syn::ExprContinue {
    fn eval(&self, _env: &mut Environment, _ctx: &EvalContext) -> Result<Value, EvalError> {
        Err(EvalError::ControlFlow(ControlFlow::Continue {
            label: label_name(&self.label),
        }))
    }
}

impl Evaluate for syn::ExprReturn {
    fn eval(&self, env: &mut Environment, ctx: &EvalContext) -> Result<Value, EvalError> {
        let value = match &self.expr {
            Some(expr) => expr.eval(env, ctx)?,
            None => Value::Undefined,
        };
        Err(EvalError::ControlFlow(ControlFlow::Return { value }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unlabeled_matches_any_loop() {
        let cf = ControlFlow::Continue { label: None };
        assert!(cf.matches_label(None));
        assert!(cf.matches_label(Some("outer")));
    }

    #[test]
    fn test_labeled_matches_only_its_loop() {
        let cf = ControlFlow::Break {
            value: Value::Undefined,
            label: Some("outer".to_string()),
        };
        assert!(cf.matches_label(Some("outer")));
        assert!(!cf.matches_label(Some("inner")));
        assert!(!cf.matches_label(None));
    }

    #[test]
    fn test_return_never_matches_loop() {
        let cf = ControlFlow::Return { value: Value::Null };
        assert!(!cf.matches_label(None));
        assert_eq!(cf.keyword(), "return");
    }
}
