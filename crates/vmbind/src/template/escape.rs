//! Output coercion and HTML escaping

use std::borrow::Cow;

use crate::value::format_number;
use crate::Value;

/// Escape markup-significant characters.
///
/// `&` is left alone when it already starts an entity (`&amp;`, `&#60;`).
pub fn escape_html(text: &str) -> Cow<'_, str> {
    if !text.contains(['<', '>', '"', '\'', '&']) {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len() + 16);
    for (index, c) in text.char_indices() {
        match c {
            '<' => out.push_str("&#60;"),
            '>' => out.push_str("&#62;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            '&' if !starts_entity(&text[index + 1..]) => out.push_str("&#38;"),
            other => out.push(other),
        }
    }
    Cow::Owned(out)
}

/// `[\w#]+;` at the start of `rest`.
fn starts_entity(rest: &str) -> bool {
    let name_len = rest
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == '#')
        .map(char::len_utf8)
        .sum::<usize>();
    name_len > 0 && rest[name_len..].starts_with(';')
}

/// The text a template emits for a value.
///
/// Strings pass through, numbers are formatted, functions are called with
/// no arguments and their result coerced again. Everything else, including
/// `undefined`, emits nothing.
pub fn to_output_string(value: &Value) -> Result<String, String> {
    match value {
        Value::String(s) => Ok(s.to_string()),
        Value::Number(n) => Ok(format_number(*n)),
        Value::Closure(_) | Value::BuiltinFn(_) => {
            let result = value.call(&[]).map_err(|e| e.to_string())?;
            to_output_string(&result)
        }
        _ => Ok(String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_escape_map() {
        assert_eq!(escape_html("<b>\"x\" & 'y'</b>"), "&#60;b&#62;&#34;x&#34; &#38; &#39;y&#39;&#60;/b&#62;");
    }

    #[test]
    fn test_existing_entities_untouched() {
        assert_eq!(escape_html("a &amp; b &#60; c &x"), "a &amp; b &#60; c &#38;x");
        assert_eq!(escape_html("&;"), "&#38;;");
    }

    #[test]
    fn test_plain_text_borrowed() {
        assert!(matches!(escape_html("plain"), Cow::Borrowed("plain")));
    }

    #[test]
    fn test_output_string() {
        assert_eq!(to_output_string(&Value::from(1.5)).unwrap(), "1.5");
        assert_eq!(to_output_string(&Value::Undefined).unwrap(), "");
        assert_eq!(to_output_string(&Value::Bool(true)).unwrap(), "");
        let f = Value::builtin("f", 0, |_| Ok(Value::from(3)));
        assert_eq!(to_output_string(&f).unwrap(), "3");
    }
}
