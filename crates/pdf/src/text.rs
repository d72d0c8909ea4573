use std::sync::OnceLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

const LIGATURES: [(char, &str); 5] = [
    ('\u{FB00}', "ff"),
    ('\u{FB01}', "fi"),
    ('\u{FB02}', "fl"),
    ('\u{FB03}', "ffi"),
    ('\u{FB04}', "ffl"),
];

/// Clean up the text of a single extracted span.
///
/// Applies NFC normalization, expands ligatures, drops replacement and
/// control characters, and collapses whitespace runs into one space.
/// Leading and trailing whitespace is kept; trimming happens during
/// normalization.
pub fn clean_span_text(text: &str) -> String {
    let mut result = String::with_capacity(text.len());

    for c in text.nfc() {
        match LIGATURES.iter().find(|(lig, _)| *lig == c) {
            Some((_, expanded)) => result.push_str(expanded),
            None if c == '\u{FFFD}' => {}
            // Tabs and newlines become spaces; other controls are dropped.
            None if c.is_control() && !c.is_whitespace() => {}
            None => result.push(c),
        }
    }

    static RE_WHITESPACE: OnceLock<Regex> = OnceLock::new();
    let re_whitespace = RE_WHITESPACE.get_or_init(|| Regex::new(r"\s+").unwrap());
    re_whitespace.replace_all(&result, " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passthrough() {
        assert_eq!(clean_span_text("Annual Report 2024"), "Annual Report 2024");
    }

    #[test]
    fn test_ligature_fix() {
        assert_eq!(clean_span_text("\u{FB01}nal"), "final");
        assert_eq!(clean_span_text("a\u{FB04}uent"), "affluent");
        assert_eq!(clean_span_text("o\u{FB00}er"), "offer");
    }

    #[test]
    fn test_replacement_char_removed() {
        assert_eq!(clean_span_text("Hello\u{FFFD}World"), "HelloWorld");
    }

    #[test]
    fn test_control_chars_removed() {
        assert_eq!(clean_span_text("Ti\u{0000}tle\u{0007}"), "Title");
    }

    #[test]
    fn test_whitespace_collapsed_not_trimmed() {
        assert_eq!(clean_span_text("  Field \t\n Survey   "), " Field Survey ");
    }

    #[test]
    fn test_nfc_normalization() {
        assert_eq!(clean_span_text("caf\u{0065}\u{0301}"), "caf\u{00E9}");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(clean_span_text(""), "");
        assert_eq!(clean_span_text("\u{FFFD}"), "");
    }
}
