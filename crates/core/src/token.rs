//! Token grammar: `{` + one or more uppercase ASCII letters or underscores + `}`.
//!
//! The braces are not part of the name. Lowercase, digits and spaces inside
//! the braces make the text a non-token.

use std::sync::OnceLock;

use regex::Regex;

fn token_pattern() -> &'static Regex {
    static RE_TOKEN: OnceLock<Regex> = OnceLock::new();
    RE_TOKEN.get_or_init(|| Regex::new(r"\{([A-Z_]+)\}").unwrap())
}

fn name_pattern() -> &'static Regex {
    static RE_NAME: OnceLock<Regex> = OnceLock::new();
    RE_NAME.get_or_init(|| Regex::new(r"^[A-Z_]+$").unwrap())
}

/// One token occurrence inside a piece of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenMatch<'a> {
    /// Name without braces, e.g. `NAME`.
    pub name: &'a str,
    /// The literal matched text, e.g. `{NAME}`.
    pub literal: &'a str,
    /// Byte offset of `{` in the source text.
    pub start: usize,
    /// Byte offset one past `}` in the source text.
    pub end: usize,
}

/// Every non-overlapping token in `text`, left to right.
pub fn find_tokens(text: &str) -> Vec<TokenMatch<'_>> {
    token_pattern()
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let name = caps.get(1)?;
            Some(TokenMatch {
                name: name.as_str(),
                literal: whole.as_str(),
                start: whole.start(),
                end: whole.end(),
            })
        })
        .collect()
}

/// `true` when `name` may be used as a field name.
pub fn is_valid_token_name(name: &str) -> bool {
    name_pattern().is_match(name)
}

/// Horizontal slice of a text box covered by `m`.
///
/// Characters are assumed to share the box width evenly. Returns
/// `(x_offset, width)` relative to the box origin. A match covering the whole
/// text returns `(0.0, box_width)`.
pub fn proportional_span(text: &str, m: &TokenMatch<'_>, box_width: f32) -> (f32, f32) {
    let total = text.chars().count();
    if total == 0 {
        return (0.0, box_width);
    }
    let before = text[..m.start].chars().count();
    let inside = text[m.start..m.end].chars().count();
    if before == 0 && inside == total {
        return (0.0, box_width);
    }
    let per_char = box_width / total as f32;
    (before as f32 * per_char, inside as f32 * per_char)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_single_token() {
        let tokens = find_tokens("{NAME}");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].name, "NAME");
        assert_eq!(tokens[0].literal, "{NAME}");
        assert_eq!((tokens[0].start, tokens[0].end), (0, 6));
    }

    #[test]
    fn test_find_multiple_tokens_in_order() {
        let tokens = find_tokens("Hello {FIRST_NAME} {LAST_NAME}!");
        let names: Vec<_> = tokens.iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["FIRST_NAME", "LAST_NAME"]);
    }

    #[test]
    fn test_non_tokens_are_ignored() {
        assert!(find_tokens("{name}").is_empty());
        assert!(find_tokens("{NAME1}").is_empty());
        assert!(find_tokens("{FULL NAME}").is_empty());
        assert!(find_tokens("{}").is_empty());
        assert!(find_tokens("NAME").is_empty());
    }

    #[test]
    fn test_token_inside_larger_text() {
        let tokens = find_tokens("Awarded on {DATE}.");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].name, "DATE");
        assert_eq!(tokens[0].start, 11);
    }

    #[test]
    fn test_valid_token_names() {
        assert!(is_valid_token_name("NAME"));
        assert!(is_valid_token_name("CERT_ID"));
        assert!(is_valid_token_name("_"));
        assert!(!is_valid_token_name(""));
        assert!(!is_valid_token_name("Name"));
        assert!(!is_valid_token_name("{NAME}"));
        assert!(!is_valid_token_name("NAME2"));
    }

    #[test]
    fn test_proportional_span_full_match() {
        let text = "{NAME}";
        let m = find_tokens(text)[0];
        assert_eq!(proportional_span(text, &m, 120.0), (0.0, 120.0));
    }

    #[test]
    fn test_proportional_span_partial_match() {
        // 10 chars total, token covers chars 4..10
        let text = "Mr. {NAME}";
        let m = find_tokens(text)[0];
        let (offset, width) = proportional_span(text, &m, 100.0);
        assert!((offset - 40.0).abs() < 1e-4);
        assert!((width - 60.0).abs() < 1e-4);
    }

    #[test]
    fn test_proportional_span_counts_chars_not_bytes() {
        let text = "é {A}";
        let m = find_tokens(text)[0];
        let (offset, width) = proportional_span(text, &m, 50.0);
        assert!((offset - 20.0).abs() < 1e-4);
        assert!((width - 30.0).abs() < 1e-4);
    }
}
