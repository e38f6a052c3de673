//! Static free-variable extraction
//!
//! A free variable is an identifier used as a value that is not bound by
//! any `let`, closure parameter or `for` pattern inside the analysed
//! code. Template bodies and binding expressions bind exactly these names
//! before evaluation; closures capture them.

use std::collections::HashSet;

use indexmap::IndexSet;
use syn::punctuated::Punctuated;
use syn::visit::{self, Visit};

use super::path::{path_ident, CONSTANT_NAMES};

#[derive(Default)]
struct Collector {
    used: IndexSet<String>,
    bound: HashSet<String>,
}

impl Collector {
    fn finish(self) -> Vec<String> {
        let Collector { used, bound } = self;
        used.into_iter()
            .filter(|name| !bound.contains(name) && !CONSTANT_NAMES.contains(&name.as_str()))
            .collect()
    }

    /// `vec![..]` and `format!(..)` hide their arguments in a token
    /// stream; parse them as a comma list so their names are seen.
    fn visit_macro_args(&mut self, mac: &syn::Macro) {
        if let Ok((item, len)) = mac.parse_body_with(super::macros::parse_repeat) {
            self.visit_expr(&item);
            self.visit_expr(&len);
            return;
        }
        let parser = Punctuated::<syn::Expr, syn::Token![,]>::parse_terminated;
        if let Ok(args) = mac.parse_body_with(parser) {
            for arg in &args {
                self.visit_expr(arg);
            }
        }
    }
}

impl<'ast> Visit<'ast> for Collector {
    fn visit_expr_path(&mut self, node: &'ast syn::ExprPath) {
        if let Some(name) = path_ident(node) {
            self.used.insert(name);
        }
    }

    fn visit_pat_ident(&mut self, node: &'ast syn::PatIdent) {
        self.bound.insert(node.ident.to_string());
        visit::visit_pat_ident(self, node);
    }

    fn visit_expr_macro(&mut self, node: &'ast syn::ExprMacro) {
        self.visit_macro_args(&node.mac);
    }

    fn visit_stmt_macro(&mut self, node: &'ast syn::StmtMacro) {
        self.visit_macro_args(&node.mac);
    }
}

/// Free variables of an expression, in order of first use.
pub fn free_variables(expr: &syn::Expr) -> Vec<String> {
    let mut collector = Collector::default();
    collector.visit_expr(expr);
    collector.finish()
}

/// Free variables of a block, in order of first use.
pub fn block_free_variables(block: &syn::Block) -> Vec<String> {
    let mut collector = Collector::default();
    collector.visit_block(block);
    collector.finish()
}

/// Names bound by a pattern.
pub fn pattern_names(pat: &syn::Pat) -> Vec<String> {
    let mut collector = Collector::default();
    collector.visit_pat(pat);
    collector.bound.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn vars(src: &str) -> Vec<String> {
        let block: syn::Block = syn::parse_str(&format!("{{ {} }}", src)).unwrap();
        block_free_variables(&block)
    }

    #[test]
    fn test_roots_of_paths_only() {
        assert_eq!(vars("user.name + items[i].title"), vec!["user", "items", "i"]);
    }

    #[test]
    fn test_locals_and_params_excluded() {
        assert_eq!(
            vars("let n = 1; for item in list { total += item * n; } __each(rows, |r, i| fmt(r))"),
            vec!["list", "total", "__each", "rows", "fmt"]
        );
    }

    #[test]
    fn test_method_names_and_fields_are_not_variables() {
        assert_eq!(vars("a.len() + b.c.d()"), vec!["a", "b"]);
    }

    #[test]
    fn test_macro_arguments_are_seen() {
        assert_eq!(vars("format!(\"{}-{}\", a, b); vec![c]"), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_constants_excluded() {
        assert_eq!(vars("if x == null { undefined } else { y }"), vec!["x", "y"]);
    }

    #[test]
    fn test_struct_literal_name_is_not_a_variable() {
        assert_eq!(vars("Row { id, label: name }"), vec!["id", "name"]);
    }
}
