//! Custom filters for manifest templating
//!
//! - `quote`: emit a string as a YAML double-quoted scalar

/// Quote filter - renders `value` as a double-quoted YAML scalar
///
/// Quotes, backslashes and every control character are escaped, so the
/// result is always a single scalar whatever the input holds.
///
/// Usage: `{{ Name | quote }}`
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() || c == '\u{2028}' || c == '\u{2029}' || c == '\u{feff}' => {
                out.push_str(&format!("\\u{:04X}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_wrapped() {
        assert_eq!(quote("survivors"), "\"survivors\"");
        assert_eq!(quote(""), "\"\"");
    }

    #[test]
    fn test_quotes_and_backslashes_are_escaped() {
        assert_eq!(quote(r#"Bob's "best" server"#), r#""Bob's \"best\" server""#);
        assert_eq!(quote(r"C:\games"), r#""C:\\games""#);
    }

    #[test]
    fn test_line_breaks_and_controls_are_escaped() {
        assert_eq!(quote("a\nb\tc"), r#""a\nb\tc""#);
        assert_eq!(quote("bell\u{7}"), r#""bell\u0007""#);
        assert!(!quote("x\"\n  - name: INJECTED").contains('\n'));
    }

    #[test]
    fn test_quoted_value_parses_back_to_input() {
        let name = "x\"\n            - name: INJECTED\r\u{85}é";
        let doc = format!("name: {}\n", quote(name));
        let parsed = crate::yaml::parse_single_document(&doc).unwrap();
        assert_eq!(parsed["name"], name);
    }
}
