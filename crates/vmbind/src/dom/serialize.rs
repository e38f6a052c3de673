//! Markup serialization

use super::parse::{is_void, RAW_TEXT_ELEMENTS};
use super::{Document, NodeData, NodeId};

impl Document {
    /// Markup of the children of `id`.
    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        let raw = self
            .tag(id)
            .is_some_and(|tag| RAW_TEXT_ELEMENTS.contains(&tag));
        for &child in self.children(id) {
            self.write_node(child, raw, &mut out);
        }
        out
    }

    /// Markup of `id` itself, tag included.
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        let raw = self
            .parent(id)
            .and_then(|p| self.tag(p))
            .is_some_and(|tag| RAW_TEXT_ELEMENTS.contains(&tag));
        self.write_node(id, raw, &mut out);
        out
    }

    fn write_node(&self, id: NodeId, raw_parent: bool, out: &mut String) {
        let node = match self.nodes.get(id) {
            Some(node) => node,
            None => return,
        };
        match &node.data {
            NodeData::Document => out.push_str(&self.inner_html(id)),
            NodeData::Text(text) if raw_parent => out.push_str(text),
            NodeData::Text(text) => out.push_str(&escape_text(text)),
            NodeData::Element(element) => {
                out.push('<');
                out.push_str(&element.tag);
                for (name, value) in &element.attributes {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&value.replace('"', "&quot;"));
                    out.push('"');
                }
                out.push('>');
                if is_void(&element.tag) {
                    return;
                }
                out.push_str(&self.inner_html(id));
                out.push_str("</");
                out.push_str(&element.tag);
                out.push('>');
            }
        }
    }
}

/// Text nodes keep entities verbatim; only a bare `<` needs escaping.
fn escape_text(text: &str) -> String {
    text.replace('<', "&lt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_round_trip() {
        let html = r#"<div id="a" hidden=""><input value="x"><p>one &amp; two</p></div>"#;
        let doc = Document::parse(html);
        assert_eq!(doc.inner_html(doc.root()), html);
    }

    #[test]
    fn test_outer_html_and_quotes() {
        let mut doc = Document::parse("<span>t</span>");
        let span = doc.elements_by_tag("span")[0];
        doc.set_attribute(span, "title", "say \"hi\"");
        assert_eq!(
            doc.outer_html(span),
            "<span title=\"say &quot;hi&quot;\">t</span>"
        );
    }

    #[test]
    fn test_raw_text_and_stray_lt() {
        let doc = Document::parse("<script type=\"text/template\"><b><%= a %></b></script>a < b");
        assert_eq!(
            doc.inner_html(doc.root()),
            "<script type=\"text/template\"><b><%= a %></b></script>a &lt; b"
        );
    }

    #[test]
    fn test_set_inner_html() {
        let mut doc = Document::parse("<ul id=list><li>old</li></ul>");
        let ul = doc.get_element_by_id("list").unwrap();
        let old = doc.children(ul)[0];
        doc.set_inner_html(ul, "<li>a</li><li>b</li>");
        assert!(!doc.contains(old));
        assert_eq!(doc.inner_html(ul), "<li>a</li><li>b</li>");
        assert_eq!(doc.text_content(ul), "ab");
    }
}
