// Link destination classification, used when dispatching hover and click
// on link areas: external URLs open in a browser, anchors scroll, anything
// else is a page reference for the host to resolve.

use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    /// An absolute URL with a scheme, e.g. https://example.com
    External(String),
    /// An in-document anchor, e.g. #section
    Anchor(String),
    /// A relative page reference, including [[wiki]] destinations
    Page(String),
}

impl LinkTarget {
    pub fn destination(&self) -> &str {
        match self {
            LinkTarget::External(d) | LinkTarget::Anchor(d) | LinkTarget::Page(d) => d,
        }
    }
}

/// Classify a raw link destination string
pub fn classify(destination: &str) -> LinkTarget {
    if let Some(anchor) = destination.strip_prefix('#') {
        return LinkTarget::Anchor(anchor.to_string());
    }
    static SCHEME_RE: OnceLock<Regex> = OnceLock::new();
    let scheme_re =
        SCHEME_RE.get_or_init(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.-]*://").unwrap());
    if scheme_re.is_match(destination) || destination.starts_with("mailto:") {
        return LinkTarget::External(destination.to_string());
    }
    LinkTarget::Page(destination.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_are_external() {
        assert_eq!(
            classify("https://example.com/a"),
            LinkTarget::External("https://example.com/a".to_string())
        );
        assert_eq!(
            classify("mailto:me@example.com"),
            LinkTarget::External("mailto:me@example.com".to_string())
        );
    }

    #[test]
    fn hashes_are_anchors() {
        assert_eq!(classify("#intro"), LinkTarget::Anchor("intro".to_string()));
    }

    #[test]
    fn everything_else_is_a_page() {
        assert_eq!(classify("SomePage"), LinkTarget::Page("SomePage".to_string()));
        assert_eq!(
            classify("notes/today.md"),
            LinkTarget::Page("notes/today.md".to_string())
        );
    }
}
