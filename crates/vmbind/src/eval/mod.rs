//! Expression evaluation
//!
//! Expressions and statements are parsed with `syn` and evaluated
//! directly over the AST with dynamic value semantics: `+` concatenates
//! when either side is a string, conditions use truthiness, `==` is
//! loose, and reading a missing field yields `undefined`.

pub mod array;
pub mod assign;
pub mod binary;
pub mod call;
pub mod closure;
pub mod control;
pub mod field;
pub mod if_expr;
pub mod index;
pub mod literal;
pub mod local;
pub mod loops;
pub mod macros;
pub mod path;
pub mod range;
pub mod struct_lit;
pub mod unary;
pub mod variables;

use quote::ToTokens;
use tracing::trace;

use crate::{Environment, EvalContext, EvalError, Value};

/// Trait for evaluating AST nodes to values.
///
/// This is the core abstraction for the tree-walking interpreter.
/// Each supported `syn` node type implements this trait.
pub trait Evaluate {
    /// Evaluate this AST node in the given environment.
    fn eval(&self, env: &mut Environment, ctx: &EvalContext) -> Result<Value, EvalError>;
}

// ═══════════════════════════════════════════════════════════════════════
// Main Expression Dispatcher
// ═══════════════════════════════════════════════════════════════════════

impl Evaluate for syn::Expr {
    fn eval(&self, env: &mut Environment, ctx: &EvalContext) -> Result<Value, EvalError> {
        if ctx.is_interrupted() {
            return Err(EvalError::Interrupted);
        }
        if ctx.trace {
            trace!(kind = expr_kind_name(self), "eval");
        }

        match self {
            // Operands
            syn::Expr::Lit(expr) => expr.eval(env, ctx),
            syn::Expr::Path(expr) => expr.eval(env, ctx),
            syn::Expr::Array(expr) => expr.eval(env, ctx),
            syn::Expr::Tuple(expr) => expr.eval(env, ctx),
            syn::Expr::Repeat(expr) => expr.eval(env, ctx),
            syn::Expr::Struct(expr) => expr.eval(env, ctx),
            syn::Expr::Range(expr) => expr.eval(env, ctx),
            syn::Expr::Macro(expr) => expr.eval(env, ctx),

            // Operators
            syn::Expr::Unary(expr) => expr.eval(env, ctx),
            syn::Expr::Binary(expr) => expr.eval(env, ctx),
            syn::Expr::Assign(expr) => expr.eval(env, ctx),
            syn::Expr::Field(expr) => expr.eval(env, ctx),
            syn::Expr::Index(expr) => expr.eval(env, ctx),

            // Control flow
            syn::Expr::If(expr) => expr.eval(env, ctx),
            syn::Expr::Loop(expr) => expr.eval(env, ctx),
            syn::Expr::While(expr) => expr.eval(env, ctx),
            syn::Expr::ForLoop(expr) => expr.eval(env, ctx),
            syn::Expr::Break(expr) => expr.eval(env, ctx),
            syn::Expr::Continue(expr) => expr.eval(env, ctx),
            syn::Expr::Return(expr) => expr.eval(env, ctx),

            // Functions
            syn::Expr::Call(expr) => expr.eval(env, ctx),
            syn::Expr::MethodCall(expr) => expr.eval(env, ctx),
            syn::Expr::Closure(expr) => expr.eval(env, ctx),

            // Blocks
            syn::Expr::Block(expr) => eval_block(&expr.block, env, ctx),

            // Transparent wrappers: `(x)`, invisible groups, `&x`
            syn::Expr::Paren(expr) => expr.expr.eval(env, ctx),
            syn::Expr::Group(expr) => expr.expr.eval(env, ctx),
            syn::Expr::Reference(expr) => expr.expr.eval(env, ctx),

            _ => Err(EvalError::UnsupportedExpr {
                kind: expr_kind_name(self).to_string(),
            }),
        }
    }
}

/// Short name of an expression kind, for traces and errors.
pub(crate) fn expr_kind_name(expr: &syn::Expr) -> &'static str {
    use syn::Expr::*;
    match expr {
        Lit(_) => "literal",
        Path(_) => "variable",
        Array(_) | Repeat(_) => "list literal",
        Tuple(_) => "tuple",
        Struct(_) => "object literal",
        Range(_) => "range",
        Macro(_) => "macro invocation",
        Unary(_) | Binary(_) => "operator",
        Assign(_) => "assignment",
        Field(_) => "field access",
        Index(_) => "index",
        If(_) => "if",
        Loop(_) | While(_) | ForLoop(_) => "loop",
        Break(_) | Continue(_) | Return(_) => "jump",
        Call(_) | MethodCall(_) => "call",
        Closure(_) => "closure",
        Block(_) | Paren(_) | Group(_) | Reference(_) => "block",
        Match(_) => "match",
        Async(_) | Await(_) => "async",
        Cast(_) => "cast",
        Try(_) | TryBlock(_) => "try",
        Let(_) => "let guard",
        Unsafe(_) | Const(_) => "unsafe or const block",
        _ => "expression",
    }
}

/// Source text of a node, for error messages.
pub(crate) fn source_text(node: &impl ToTokens) -> String {
    node.to_token_stream().to_string()
}

// ═══════════════════════════════════════════════════════════════════════
// Convenience Functions
// ═══════════════════════════════════════════════════════════════════════

/// Evaluate an expression (convenience wrapper).
pub fn eval_expr(
    expr: &syn::Expr,
    env: &mut Environment,
    ctx: &EvalContext,
) -> Result<Value, EvalError> {
    expr.eval(env, ctx)
}

pub use call::call_value;
pub use control::ControlFlow;
pub use if_expr::{eval_block, eval_stmts};
pub use local::bind_pattern;
pub use variables::{block_free_variables, free_variables, pattern_names};
