use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;

/// Everything outside the RFC 3986 unreserved set is escaped.
const URL_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Strips markup from free-text fields and percent-encodes values bound
/// for request URLs.
///
/// Titles and descriptions are sanitized before storage and before
/// dedup-key computation, so cosmetic markup differences never create
/// duplicate or mismatched articles.
#[derive(Debug, Clone)]
pub struct TextSanitizer {
    tag_re: Regex,
}

impl TextSanitizer {
    pub fn new() -> Self {
        // closed tags, plus a trailing unclosed tag in truncated content
        let tag_re = Regex::new(r"<[^>]*>?").expect("valid tag regex");
        Self { tag_re }
    }

    /// Removes angle-bracket tags and collapses the resulting whitespace.
    pub fn strip_markup(&self, text: &str) -> String {
        let stripped = self.tag_re.replace_all(text, " ");
        stripped.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Percent-encodes reserved characters for safe URL construction.
    pub fn url_encode(&self, value: &str) -> String {
        utf8_percent_encode(value, URL_ENCODE_SET).to_string()
    }
}

impl Default for TextSanitizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags() {
        let s = TextSanitizer::new();
        assert_eq!(s.strip_markup("<p>Hello <b>world</b></p>"), "Hello world");
    }

    #[test]
    fn strips_tags_with_attributes() {
        let s = TextSanitizer::new();
        assert_eq!(
            s.strip_markup(r#"<a href="https://example.com" class="x">link</a> text"#),
            "link text"
        );
    }

    #[test]
    fn strips_unclosed_trailing_tag() {
        let s = TextSanitizer::new();
        assert_eq!(s.strip_markup("truncated content <a href="), "truncated content");
    }

    #[test]
    fn collapses_whitespace() {
        let s = TextSanitizer::new();
        assert_eq!(s.strip_markup("  spaced\n\tout   text  "), "spaced out text");
        assert_eq!(s.strip_markup("<p>a</p><p>b</p>"), "a b");
    }

    #[test]
    fn plain_text_passes_through() {
        let s = TextSanitizer::new();
        assert_eq!(s.strip_markup("no markup here"), "no markup here");
        assert_eq!(s.strip_markup(""), "");
    }

    #[test]
    fn url_encode_escapes_reserved_characters() {
        let s = TextSanitizer::new();
        assert_eq!(s.url_encode("a b&c=d"), "a%20b%26c%3Dd");
        assert_eq!(s.url_encode("100%"), "100%25");
    }

    #[test]
    fn url_encode_keeps_unreserved_characters() {
        let s = TextSanitizer::new();
        assert_eq!(s.url_encode("AZaz09-_.~"), "AZaz09-_.~");
    }

    #[test]
    fn url_encode_handles_non_ascii() {
        let s = TextSanitizer::new();
        assert_eq!(s.url_encode("café"), "caf%C3%A9");
    }
}
