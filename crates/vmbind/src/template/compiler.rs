//! Template source to statement block
//!
//! The source is split on the delimiters into literal and logic runs and
//! turned into one block of statements:
//!
//! ```text
//! <li><%= item.name %></li>      __out("<li>");
//!                          ==>   __out(__escape(item.name));
//!                                __out("</li>");
//! ```
//!
//! Logic runs are pasted verbatim, so `<% for item in items { %>` and
//! `<% } %>` bracket the literal runs between them. The block is parsed
//! with `syn`; its free variables are bound by the renderer.

use once_cell::sync::Lazy;
use regex::Regex;

use super::options::TemplateOptions;
use crate::environment::utility_names;
use crate::error::TemplateError;
use crate::eval::block_free_variables;

/// Internal names the generated code uses; never bound from data.
pub(crate) const OUTPUT_FN: &str = "__out";
pub(crate) const LINE_FN: &str = "__line";
pub(crate) const DATA_NAME: &str = "self";

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static HTML_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"<!--[\s\S]*?-->").expect("valid regex"));
static EMIT_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^=[=#]?").expect("valid regex"));
static EMIT_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s;]*$").expect("valid regex"));

/// A compiled template body.
#[derive(Debug, Clone)]
pub(crate) struct Program {
    /// The generated statements
    pub block: syn::Block,

    /// Free variables of the block, in order of first use
    pub variables: Vec<String>,
}

/// Compile `source` into a statement block.
pub(crate) fn compile(source: &str, options: &TemplateOptions) -> Result<Program, TemplateError> {
    let mut generator = Generator::new(options);
    for (index, fragment) in source.split(options.open_tag.as_str()).enumerate() {
        if index == 0 {
            generator.html(fragment);
            continue;
        }
        match fragment.split_once(options.close_tag.as_str()) {
            Some((logic, html)) => {
                generator.logic(logic);
                generator.html(html);
            }
            None => generator.html(fragment),
        }
    }

    let code = format!("{{\n{}\n}}", generator.code.join("\n"));
    let block: syn::Block = syn::parse_str(&code).map_err(|e| {
        let line = generator.template_line(e.span().start().line);
        TemplateError::Compile {
            filename: options.display_name().to_string(),
            line,
            source_line: line.and_then(|l| source_line(source, l)),
            message: e.to_string(),
        }
    })?;

    let variables = block_free_variables(&block)
        .into_iter()
        .filter(|name| !matches!(name.as_str(), OUTPUT_FN | LINE_FN | DATA_NAME))
        .collect();
    Ok(Program { block, variables })
}

/// The trimmed text of a 1-based template line.
pub(crate) fn source_line(source: &str, line: usize) -> Option<String> {
    source
        .lines()
        .nth(line.checked_sub(1)?)
        .map(|l| l.trim_start().to_string())
}

struct Generator<'a> {
    options: &'a TemplateOptions,
    /// Generated code, one entry per line
    code: Vec<String>,
    /// Template line of each generated line
    lines: Vec<usize>,
    /// Current template line
    line: usize,
}

impl<'a> Generator<'a> {
    fn new(options: &'a TemplateOptions) -> Self {
        Self {
            options,
            code: Vec::new(),
            lines: Vec::new(),
            line: 1,
        }
    }

    fn push(&mut self, chunk: &str, line: usize) {
        for (offset, text) in chunk.split('\n').enumerate() {
            self.code.push(text.to_string());
            self.lines.push(line + offset);
        }
    }

    /// Map a line of the wrapped code (1-based, after the opening `{`)
    /// back to the template.
    fn template_line(&self, code_line: usize) -> Option<usize> {
        code_line
            .checked_sub(2)
            .and_then(|index| self.lines.get(index).copied())
            .or_else(|| self.lines.last().copied())
    }

    fn html(&mut self, text: &str) {
        let start = self.line;
        self.line += text.matches('\n').count();

        let text = if self.options.compress {
            let collapsed = WHITESPACE.replace_all(text, " ");
            HTML_COMMENT.replace_all(&collapsed, "").into_owned()
        } else {
            text.to_string()
        };
        if !text.is_empty() {
            let literal = proc_macro2::Literal::string(&text);
            self.push(&format!("{}({});", OUTPUT_FN, literal), start);
        }
    }

    fn logic(&mut self, text: &str) {
        let start = self.line;
        self.line += text.matches('\n').count();

        let code = match &self.options.parser {
            Some(parser) => parser(text, self.options),
            None => text.to_string(),
        };

        let statement = if code.starts_with('=') {
            self.emission(&code)
        } else {
            terminate(&code)
        };

        if self.options.debug {
            self.push(&format!("{}({}); {}", LINE_FN, start, statement), start);
        } else {
            self.push(&statement, start);
        }
    }

    /// `=expr`, `==expr` and `=#expr`.
    fn emission(&self, code: &str) -> String {
        let raw = !self.options.escape || EMIT_PREFIX.find(code).is_some_and(|m| m.len() > 1);
        let stripped = EMIT_PREFIX.replace(code, "");
        let expr = EMIT_SUFFIX.replace(&stripped, "");
        let head = leading_ident(&expr);

        if matches!(head, "print" | "include") {
            // These write to the output themselves.
            format!("{};", expr)
        } else if utility_names().contains(&head) {
            format!("{}({});", OUTPUT_FN, expr)
        } else if raw {
            format!("{}(__string({}));", OUTPUT_FN, expr)
        } else {
            format!("{}(__escape({}));", OUTPUT_FN, expr)
        }
    }
}

/// Close a statement run with `;` unless it opens a block or already
/// ends one statement. Stray `;` after a block are empty statements.
fn terminate(code: &str) -> String {
    let trimmed = code.trim_end();
    if trimmed.is_empty() || trimmed.ends_with('{') || trimmed.ends_with(';') {
        code.to_string()
    } else {
        format!("{};", code)
    }
}

fn leading_ident(expr: &str) -> &str {
    let expr = expr.trim_start();
    let end = expr
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(expr.len());
    &expr[..end]
}
