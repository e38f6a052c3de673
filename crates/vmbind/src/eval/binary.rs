//! Binary operation evaluation

use super::Evaluate;
use crate::{Environment, EvalContext, EvalError, Value};

/// An arithmetic, comparison or bitwise operator, with compound
/// assignments mapped to their underlying operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Rem,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `&`
    BitAnd,
    /// `|`
    BitOr,
    /// `^`
    BitXor,
    /// `<<`
    Shl,
    /// `>>`
    Shr,
}

impl Evaluate for syn::ExprBinary {
    fn eval(&self, env: &mut Environment, ctx: &EvalContext) -> Result<Value, EvalError> {
        // Short-circuit evaluation for && and ||, returning the deciding operand
        match &self.op {
            syn::BinOp::And(_) => {
                let left = self.left.eval(env, ctx)?;
                return if left.truthy() {
                    self.right.eval(env, ctx)
                } else {
                    Ok(left)
                };
            }
            syn::BinOp::Or(_) => {
                let left = self.left.eval(env, ctx)?;
                return if left.truthy() {
                    Ok(left)
                } else {
                    self.right.eval(env, ctx)
                };
            }
            _ => {}
        }

        let (op, compound) = classify(&self.op).ok_or_else(|| EvalError::UnsupportedExpr {
            kind: "binary operator".to_string(),
        })?;

        let left = self.left.eval(env, ctx)?;
        let right = self.right.eval(env, ctx)?;
        let result = apply(op, &left, &right);

        if compound {
            // x += y  →  x = x + y
            super::assign::assign_to(&self.left, result.clone(), env, ctx)?;
        }
        Ok(result)
    }
}

/// Map a syn operator to `(operator, is_compound_assignment)`.
fn classify(op: &syn::BinOp) -> Option<(Operator, bool)> {
    let mapped = match op {
        syn::BinOp::Add(_) => (Operator::Add, false),
        syn::BinOp::Sub(_) => (Operator::Sub, false),
        syn::BinOp::Mul(_) => (Operator::Mul, false),
        syn::BinOp::Div(_) => (Operator::Div, false),
        syn::BinOp::Rem(_) => (Operator::Rem, false),
        syn::BinOp::Eq(_) => (Operator::Eq, false),
        syn::BinOp::Ne(_) => (Operator::Ne, false),
        syn::BinOp::Lt(_) => (Operator::Lt, false),
        syn::BinOp::Le(_) => (Operator::Le, false),
        syn::BinOp::Gt(_) => (Operator::Gt, false),
        syn::BinOp::Ge(_) => (Operator::Ge, false),
        syn::BinOp::BitAnd(_) => (Operator::BitAnd, false),
        syn::BinOp::BitOr(_) => (Operator::BitOr, false),
        syn::BinOp::BitXor(_) => (Operator::BitXor, false),
        syn::BinOp::Shl(_) => (Operator::Shl, false),
        syn::BinOp::Shr(_) => (Operator::Shr, false),
        syn::BinOp::AddAssign(_) => (Operator::Add, true),
        syn::BinOp::SubAssign(_) => (Operator::Sub, true),
        syn::BinOp::MulAssign(_) => (Operator::Mul, true),
        syn::BinOp::DivAssign(_) => (Operator::Div, true),
        syn::BinOp::RemAssign(_) => (Operator::Rem, true),
        syn::BinOp::BitAndAssign(_) => (Operator::BitAnd, true),
        syn::BinOp::BitOrAssign(_) => (Operator::BitOr, true),
        syn::BinOp::BitXorAssign(_) => (Operator::BitXor, true),
        syn::BinOp::ShlAssign(_) => (Operator::Shl, true),
        syn::BinOp::ShrAssign(_) => (Operator::Shr, true),
        _ => return None,
    };
    Some(mapped)
}

/// Apply an operator to two values. Never fails: mismatched operands
/// coerce (to text for `+` with a string, to numbers otherwise).
pub fn apply(op: Operator, left: &Value, right: &Value) -> Value {
    match op {
        Operator::Add => add(left, right),
        Operator::Sub => Value::Number(left.to_number() - right.to_number()),
        Operator::Mul => Value::Number(left.to_number() * right.to_number()),
        Operator::Div => Value::Number(left.to_number() / right.to_number()),
        Operator::Rem => Value::Number(left.to_number() % right.to_number()),

        Operator::Eq => Value::Bool(left.loose_eq(right)),
        Operator::Ne => Value::Bool(!left.loose_eq(right)),
        Operator::Lt => Value::Bool(compare(left, right, |o| o.is_lt())),
        Operator::Le => Value::Bool(compare(left, right, |o| o.is_le())),
        Operator::Gt => Value::Bool(compare(left, right, |o| o.is_gt())),
        Operator::Ge => Value::Bool(compare(left, right, |o| o.is_ge())),

        Operator::BitAnd => Value::from(left.to_i32() & right.to_i32()),
        Operator::BitOr => Value::from(left.to_i32() | right.to_i32()),
        Operator::BitXor => Value::from(left.to_i32() ^ right.to_i32()),
        Operator::Shl => Value::from(left.to_i32().wrapping_shl(shift_amount(right))),
        Operator::Shr => Value::from(left.to_i32().wrapping_shr(shift_amount(right))),
    }
}

fn add(left: &Value, right: &Value) -> Value {
    let textual = |v: &Value| matches!(v, Value::String(_) | Value::List(_) | Value::Object(_));
    if textual(left) || textual(right) {
        Value::from(format!("{}{}", left, right))
    } else {
        Value::Number(left.to_number() + right.to_number())
    }
}

/// Strings compare lexicographically; everything else numerically, where
/// any `NaN` makes the comparison false.
fn compare(left: &Value, right: &Value, test: impl Fn(std::cmp::Ordering) -> bool) -> bool {
    if let (Value::String(a), Value::String(b)) = (left, right) {
        return test(a.cmp(b));
    }
    left.to_number()
        .partial_cmp(&right.to_number())
        .map(test)
        .unwrap_or(false)
}

fn shift_amount(value: &Value) -> u32 {
    (value.to_i32() as u32) & 0x1f
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_concatenates_with_strings() {
        assert_eq!(apply(Operator::Add, &Value::from("n"), &Value::from(1)), Value::from("n1"));
        assert_eq!(apply(Operator::Add, &Value::from(1), &Value::from(2)), Value::from(3));
        assert!(apply(Operator::Add, &Value::from(1), &Value::Undefined)
            .to_number()
            .is_nan());
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(apply(Operator::Lt, &Value::from("a"), &Value::from("b")), Value::Bool(true));
        assert_eq!(apply(Operator::Lt, &Value::from("10"), &Value::from(9)), Value::Bool(false));
        assert_eq!(apply(Operator::Ge, &Value::from(f64::NAN), &Value::from(1)), Value::Bool(false));
        assert_eq!(apply(Operator::Eq, &Value::from("1"), &Value::from(1)), Value::Bool(true));
    }

    #[test]
    fn test_bitwise_on_i32() {
        assert_eq!(apply(Operator::BitOr, &Value::from(5.7), &Value::from(0)), Value::from(5));
        assert_eq!(apply(Operator::Shl, &Value::from(1), &Value::from(33)), Value::from(2));
        assert_eq!(apply(Operator::Shr, &Value::from(-8), &Value::from(1)), Value::from(-4));
    }
}
