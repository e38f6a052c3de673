//! Tolerant markup parser
//!
//! Good enough for application markup: elements, attributes (quoted,
//! unquoted or bare), void and self-closing tags, raw-text elements and
//! text. Comments, doctypes and processing instructions are dropped.
//! Entities are kept verbatim.

/// A parsed node, before insertion into a document.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Parsed {
    Element {
        tag: String,
        attributes: Vec<(String, String)>,
        children: Vec<Parsed>,
    },
    Text(String),
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Elements whose content is text up to the matching end tag.
pub(crate) const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea"];

/// Elements closed by an opening tag of the same name.
const SELF_NESTING_CLOSED: &[&str] = &["li", "option", "p"];

/// Whether `tag` never has children.
pub(crate) fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

struct Open {
    tag: String,
    attributes: Vec<(String, String)>,
    children: Vec<Parsed>,
}

impl Open {
    fn close(self) -> Parsed {
        Parsed::Element {
            tag: self.tag,
            attributes: self.attributes,
            children: self.children,
        }
    }
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    stack: Vec<Open>,
    top: Vec<Parsed>,
}

/// Parse a fragment into top-level nodes.
pub(crate) fn parse_fragment(html: &str) -> Vec<Parsed> {
    let mut parser = Parser {
        src: html,
        pos: 0,
        stack: Vec::new(),
        top: Vec::new(),
    };
    parser.run();
    while let Some(open) = parser.stack.pop() {
        parser.append(open.close());
    }
    parser.top
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn append(&mut self, node: Parsed) {
        match self.stack.last_mut() {
            Some(open) => open.children.push(node),
            None => self.top.push(node),
        }
    }

    fn run(&mut self) {
        while self.pos < self.src.len() {
            let rest = self.rest();
            if rest.starts_with("<!--") {
                self.pos = match rest[4..].find("-->") {
                    Some(end) => self.pos + 4 + end + 3,
                    None => self.src.len(),
                };
            } else if rest.starts_with("</") {
                self.end_tag();
            } else if rest.starts_with("<!") || rest.starts_with("<?") {
                self.skip_past('>');
            } else if rest.starts_with('<')
                && rest[1..].starts_with(|c: char| c.is_ascii_alphabetic())
            {
                self.start_tag();
            } else {
                self.text();
            }
        }
    }

    fn skip_past(&mut self, c: char) {
        self.pos = match self.rest().find(c) {
            Some(i) => self.pos + i + c.len_utf8(),
            None => self.src.len(),
        };
    }

    fn text(&mut self) {
        // A lone `<` is text; continue to the next `<` after it.
        let rest = self.rest();
        let first = rest.chars().next().map(char::len_utf8).unwrap_or(1);
        let end = rest[first..]
            .find('<')
            .map(|i| self.pos + first + i)
            .unwrap_or(self.src.len());
        let text = self.src[self.pos..end].to_string();
        self.pos = end;
        self.append(Parsed::Text(text));
    }

    fn end_tag(&mut self) {
        let rest = &self.rest()[2..];
        let name_len = rest.find('>').unwrap_or(rest.len());
        let tag = rest[..name_len].trim().to_ascii_lowercase();
        self.skip_past('>');

        if let Some(depth) = self.stack.iter().rposition(|open| open.tag == tag) {
            while self.stack.len() > depth {
                if let Some(open) = self.stack.pop() {
                    self.append(open.close());
                }
            }
        }
    }

    fn start_tag(&mut self) {
        self.pos += 1;
        let tag = self.take_while(|c| c.is_ascii_alphanumeric() || c == '-').to_ascii_lowercase();
        let mut attributes: Vec<(String, String)> = Vec::new();
        let mut self_closing = false;

        loop {
            self.take_while(char::is_whitespace);
            let rest = self.rest();
            if rest.is_empty() {
                break;
            }
            if rest.starts_with("/>") {
                self.pos += 2;
                self_closing = true;
                break;
            }
            if rest.starts_with('>') {
                self.pos += 1;
                break;
            }
            let name = self.take_while(|c| !c.is_whitespace() && !matches!(c, '=' | '>' | '/'));
            if name.is_empty() {
                // Stray `/` or `=`.
                self.pos += 1;
                continue;
            }
            self.take_while(char::is_whitespace);
            let value = if self.rest().starts_with('=') {
                self.pos += 1;
                self.take_while(char::is_whitespace);
                self.attribute_value()
            } else {
                String::new()
            };
            if !attributes.iter().any(|(n, _)| *n == name) {
                attributes.push((name, value));
            }
        }

        if SELF_NESTING_CLOSED.contains(&tag.as_str())
            && self.stack.last().is_some_and(|open| open.tag == tag)
        {
            if let Some(open) = self.stack.pop() {
                self.append(open.close());
            }
        }

        if is_void(&tag) || self_closing {
            self.append(Parsed::Element {
                tag,
                attributes,
                children: Vec::new(),
            });
        } else if RAW_TEXT_ELEMENTS.contains(&tag.as_str()) {
            let text = self.raw_text(&tag);
            let children = if text.is_empty() {
                Vec::new()
            } else {
                vec![Parsed::Text(text)]
            };
            self.append(Parsed::Element {
                tag,
                attributes,
                children,
            });
        } else {
            self.stack.push(Open {
                tag,
                attributes,
                children: Vec::new(),
            });
        }
    }

    fn attribute_value(&mut self) -> String {
        let rest = self.rest();
        match rest.chars().next() {
            Some(quote @ ('"' | '\'')) => {
                let body = &rest[1..];
                let end = body.find(quote).unwrap_or(body.len());
                let value = body[..end].to_string();
                self.pos = (self.pos + 1 + end + 1).min(self.src.len());
                value
            }
            _ => self.take_while(|c| !c.is_whitespace() && c != '>'),
        }
    }

    /// Text up to `</tag`, case-insensitively; consumes the end tag.
    fn raw_text(&mut self, tag: &str) -> String {
        let closing = format!("</{}", tag);
        let lower = self.rest().to_ascii_lowercase();
        match lower.find(&closing) {
            Some(end) => {
                let text = self.rest()[..end].to_string();
                self.pos += end;
                self.skip_past('>');
                text
            }
            None => {
                let text = self.rest().to_string();
                self.pos = self.src.len();
                text
            }
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let rest = self.rest();
        let len = rest
            .char_indices()
            .find(|&(_, c)| !pred(c))
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        self.pos += len;
        rest[..len].to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn element(tag: &str, attributes: &[(&str, &str)], children: Vec<Parsed>) -> Parsed {
        Parsed::Element {
            tag: tag.to_string(),
            attributes: attributes
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            children,
        }
    }

    fn text(s: &str) -> Parsed {
        Parsed::Text(s.to_string())
    }

    #[test]
    fn test_nested_elements_and_attributes() {
        let parsed = parse_fragment(r#"<div id=a class="x y" hidden><b>hi</b> there</div>"#);
        assert_eq!(
            parsed,
            vec![element(
                "div",
                &[("id", "a"), ("class", "x y"), ("hidden", "")],
                vec![element("b", &[], vec![text("hi")]), text(" there")]
            )]
        );
    }

    #[test]
    fn test_void_and_self_closing() {
        let parsed = parse_fragment("<input value='1'><br/><span/>x");
        assert_eq!(
            parsed,
            vec![
                element("input", &[("value", "1")], vec![]),
                element("br", &[], vec![]),
                element("span", &[], vec![]),
                text("x"),
            ]
        );
    }

    #[test]
    fn test_raw_text_and_comments() {
        let parsed = parse_fragment("<!-- gone --><script type=\"text/template\"><p><%= a %></p></SCRIPT>");
        assert_eq!(
            parsed,
            vec![element(
                "script",
                &[("type", "text/template")],
                vec![text("<p><%= a %></p>")]
            )]
        );
    }

    #[test]
    fn test_unclosed_and_stray_end_tags() {
        let parsed = parse_fragment("<ul><li>a<li>b</ul></p>c < d");
        assert_eq!(
            parsed,
            vec![
                element(
                    "ul",
                    &[],
                    vec![
                        element("li", &[], vec![text("a")]),
                        element("li", &[], vec![text("b")]),
                    ]
                ),
                text("c "),
                text("< d"),
            ]
        );
    }
}
