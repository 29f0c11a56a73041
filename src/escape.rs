//! HTML escaping for rendered output.

/// Escapes the five HTML-significant characters using named entities.
///
/// The evaluator applies this to every `{{...}}` value that is not a safe
/// string; helpers producing safe strings can call it themselves on the
/// parts they want escaped. `'` and `"` are both mapped so attribute
/// positions are covered regardless of quoting style.
pub fn escape(s: &str) -> String {
    // Fast path: most content has nothing to escape.
    if !s.bytes().any(|b| matches!(b, b'&' | b'\'' | b'<' | b'>' | b'"')) {
        return s.to_string();
    }

    let mut out = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '\'' => out.push_str("&apos;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escapes_all_special_chars() {
        assert_eq!(escape(r#"foo & bar"#), "foo &amp; bar");
        assert_eq!(escape(r#"<div class="a">"#), "&lt;div class=&quot;a&quot;&gt;");
        assert_eq!(escape("it's"), "it&apos;s");
    }

    #[test]
    fn test_passthrough() {
        assert_eq!(escape("plain text, no entities"), "plain text, no entities");
        assert_eq!(escape(""), "");
    }

    #[test]
    fn test_not_idempotent_on_entities() {
        // Escaping already-escaped text escapes the ampersands again.
        assert_eq!(escape("&amp;"), "&amp;amp;");
    }
}
