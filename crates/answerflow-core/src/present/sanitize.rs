//! HTML sanitization.
//!
//! The allow-lists below are the contract; the engine behind them is pluggable.
//! `AllowListSanitizer` enforces them with ammonia (cargo feature `sanitize`).

#[cfg(feature = "sanitize")]
use std::sync::LazyLock;

/// Tags that survive sanitization.
pub const ALLOWED_TAGS: &[&str] = &[
    "p", "br", "em", "strong", "b", "i", "u", "h1", "h2", "h3", "h4", "h5", "h6", "ul", "ol",
    "li", "blockquote", "code", "pre", "a", "sup", "sub", "div", "span",
];

/// Attributes allowed on any allowed tag.
pub const ALLOWED_ATTRIBUTES: &[&str] = &["class", "id", "title", "data-citation"];

/// Attributes allowed on links only.
pub const ALLOWED_LINK_ATTRIBUTES: &[&str] = &["href", "target"];

/// Elements removed together with their content.
pub const DROPPED_CONTENT_TAGS: &[&str] = &["script", "style"];

/// Pluggable markup sanitizer.
pub trait Sanitizer: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Strips everything outside the allow-lists.
    fn sanitize(&self, html: &str) -> String;
}

/// Allow-list sanitizer backed by ammonia.
#[cfg(feature = "sanitize")]
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowListSanitizer;

#[cfg(feature = "sanitize")]
static CLEANER: LazyLock<ammonia::Builder<'static>> = LazyLock::new(|| {
    use std::collections::{HashMap, HashSet};

    let mut builder = ammonia::Builder::empty();
    builder
        .tags(ALLOWED_TAGS.iter().copied().collect())
        .generic_attributes(ALLOWED_ATTRIBUTES.iter().copied().collect())
        .tag_attributes(HashMap::from([(
            "a",
            ALLOWED_LINK_ATTRIBUTES.iter().copied().collect(),
        )]))
        .url_schemes(HashSet::from(["http", "https", "mailto"]))
        .link_rel(Some("noopener noreferrer"))
        .clean_content_tags(DROPPED_CONTENT_TAGS.iter().copied().collect());
    builder
});

#[cfg(feature = "sanitize")]
impl Sanitizer for AllowListSanitizer {
    fn name(&self) -> &'static str {
        "ammonia"
    }

    fn sanitize(&self, html: &str) -> String {
        CLEANER.clean(html).to_string()
    }
}
