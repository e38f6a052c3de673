//! `vm-html`: element content

use tracing::trace;

use super::{BindCx, BindingDescriptor, BindingKind, Controller, Tracked, UpdateCx};
use crate::dom::NodeId;
use crate::error::BindError;
use crate::expression::Getter;
use crate::template::Render;
use crate::Value;

/// Replaces the content of its element.
///
/// When the element holds `<script>` children their text is a template,
/// compiled once and rendered with the data whenever the bound value
/// changes. Otherwise the value itself is written as markup. Either way
/// the element is scanned again afterwards.
pub struct HtmlController {
    element: NodeId,
    data: Value,
    getter: Getter,
    template: Option<Render>,
    tracked: Tracked,
}

impl HtmlController {
    pub(crate) fn new(descriptor: &BindingDescriptor, cx: &mut BindCx<'_>) -> Result<Self, BindError> {
        let getter = cx.engine.compile_getter(&descriptor.value)?;
        let source: String = cx
            .document
            .descendant_elements(descriptor.element)
            .into_iter()
            .filter(|&n| cx.document.tag(n) == Some("script"))
            .map(|n| cx.document.text_content(n))
            .collect();
        let template = (!source.is_empty()).then(|| cx.engine.compile(&source, cx.engine.defaults()));
        Ok(Self {
            element: descriptor.element,
            data: cx.data.clone(),
            getter,
            template,
            tracked: Tracked::default(),
        })
    }

    /// The embedded template, if the element had one.
    pub fn template(&self) -> Option<&Render> {
        self.template.as_ref()
    }
}

impl Controller for HtmlController {
    fn kind(&self) -> BindingKind {
        BindingKind::Html
    }

    fn element(&self) -> NodeId {
        self.element
    }

    fn update(&mut self, cx: &mut UpdateCx<'_>) -> bool {
        let value = match self.tracked.next(&self.getter, &self.data) {
            Some(value) => value,
            None => return false,
        };
        let html = match &self.template {
            Some(template) => template.render(&self.data),
            None => value.to_text(),
        };
        trace!(expression = self.getter.source(), "html binding updated");
        cx.document.set_inner_html(self.element, &html);
        cx.rescan.push(self.element);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;
    use crate::template::TemplateEngine;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn build(markup: &str, expr: &str, data: &Value) -> (Document, HtmlController) {
        let engine = TemplateEngine::new();
        let mut document = Document::parse(markup);
        let element = document.get_element_by_id("t").unwrap();
        let descriptor = BindingDescriptor {
            element,
            marker: "vm_1".to_string(),
            name: "vm-html".to_string(),
            value: expr.to_string(),
            kind: BindingKind::Html,
            suffix: None,
        };
        let controller = HtmlController::new(
            &descriptor,
            &mut BindCx {
                document: &mut document,
                engine: &engine,
                data,
            },
        )
        .unwrap();
        (document, controller)
    }

    #[test]
    fn test_plain_value() {
        let data = Value::from(json!({"n": 3, "missing": null}));
        let (mut document, mut controller) = build("<p id=t>old</p>", "n * 2", &data);
        let mut rescan = Vec::new();
        let mut cx = UpdateCx {
            document: &mut document,
            rescan: &mut rescan,
        };
        assert!(controller.update(&mut cx));
        assert!(!controller.update(&mut cx));
        assert_eq!(rescan, vec![controller.element()]);
        assert_eq!(document.text_content(controller.element()), "6");
    }

    #[test]
    fn test_embedded_template() {
        let data = Value::from(json!({"items": ["a", "b"]}));
        let (mut document, mut controller) = build(
            r#"<ul id=t><script type="text/template"><% for i in items { %><li><%= i %></li><% } %></script></ul>"#,
            "items.length",
            &data,
        );
        assert!(controller.template().is_some());
        let mut rescan = Vec::new();
        controller.update(&mut UpdateCx {
            document: &mut document,
            rescan: &mut rescan,
        });
        assert_eq!(
            document.inner_html(controller.element()),
            "<li>a</li><li>b</li>"
        );
    }

    #[test]
    fn test_undefined_renders_empty() {
        let data = Value::from(json!({}));
        let (mut document, mut controller) = build("<p id=t>old</p>", "nothing", &data);
        let mut rescan = Vec::new();
        controller.update(&mut UpdateCx {
            document: &mut document,
            rescan: &mut rescan,
        });
        assert_eq!(document.inner_html(controller.element()), "");
    }
}
