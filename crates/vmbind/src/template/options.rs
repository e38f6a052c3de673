//! Template compile options

use std::fmt;
use std::rc::Rc;

use serde::Deserialize;

/// Syntax hook: rewrites the text of one logic run before compilation.
pub type ParserHook = Rc<dyn Fn(&str, &TemplateOptions) -> String>;

/// Options for one compile, with engine-wide defaults.
///
/// Deserializable so hosts can keep template defaults in their
/// configuration; the parser hook can only be set from code.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct TemplateOptions {
    /// Opening delimiter of a logic run
    pub open_tag: String,

    /// Closing delimiter of a logic run
    pub close_tag: String,

    /// HTML-escape `<%= %>` output
    pub escape: bool,

    /// Cache the compiled template under its filename
    pub cache: bool,

    /// Collapse whitespace and drop HTML comments in literal runs
    pub compress: bool,

    /// Track template lines and report them on failure
    pub debug: bool,

    /// Name used for caching and error reports
    pub filename: Option<String>,

    /// Logic-run rewrite hook
    #[serde(skip)]
    pub parser: Option<ParserHook>,
}

impl Default for TemplateOptions {
    fn default() -> Self {
        Self {
            open_tag: "<%".to_string(),
            close_tag: "%>".to_string(),
            escape: true,
            cache: true,
            compress: false,
            debug: false,
            filename: None,
            parser: None,
        }
    }
}

impl TemplateOptions {
    /// Default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the delimiters.
    pub fn with_tags(mut self, open: impl Into<String>, close: impl Into<String>) -> Self {
        self.open_tag = open.into();
        self.close_tag = close.into();
        self
    }

    /// Name the template.
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Enable or disable escaping of `<%= %>`.
    pub fn with_escape(mut self, escape: bool) -> Self {
        self.escape = escape;
        self
    }

    /// Enable or disable caching.
    pub fn with_cache(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }

    /// Enable or disable literal compression.
    pub fn with_compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Enable or disable line tracking.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Install a logic-run rewrite hook.
    pub fn with_parser<F>(mut self, parser: F) -> Self
    where
        F: Fn(&str, &TemplateOptions) -> String + 'static,
    {
        self.parser = Some(Rc::new(parser));
        self
    }

    /// Template name for reports.
    pub fn display_name(&self) -> &str {
        self.filename.as_deref().unwrap_or("anonymous")
    }
}

impl fmt::Debug for TemplateOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateOptions")
            .field("open_tag", &self.open_tag)
            .field("close_tag", &self.close_tag)
            .field("escape", &self.escape)
            .field("cache", &self.cache)
            .field("compress", &self.compress)
            .field("debug", &self.debug)
            .field("filename", &self.filename)
            .field("parser", &self.parser.as_ref().map(|_| "<hook>"))
            .finish()
    }
}
