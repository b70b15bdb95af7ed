//! Citation resolution.
//!
//! Reconciles two independent citation sources into one ordered reference list:
//! - structured `SourceRecord`s supplied by the backend (trusted, processed first)
//! - parenthesized text in the answer that looks like a citation (heuristic)
//!
//! Ordinals are assigned in first-seen order and never reused within a pass.
//! Every literal `(key)` in the answer is then replaced with a positional
//! placeholder that the presenter later turns into a reference marker.
//!
//! The heuristic is best-effort: missed citations and false positives are
//! accepted. Keys are compared exactly, so a heuristic match that differs from a
//! structured key only in formatting becomes a separate reference.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::answer::SourceRecord;

/// Keywords that make a parenthetical likely to be a citation (case-insensitive substring match).
pub const DEFAULT_KEYWORDS: &[&str] = &[
    "manual",
    "page",
    "guide",
    "guideline",
    "handbook",
    "section",
    "chapter",
    "protocol",
    "procedure",
    "policy",
    "standard",
    "appendix",
    "table",
    "figure",
    "document",
    "report",
    "reference",
    "source",
];

/// Parentheticals that are never citations, compared exactly after trimming.
const FALSE_POSITIVES: &[&str] = &["e.g.", "i.e.", "etc.", "vs."];

/// Private-use delimiters keep placeholders clear of markdown syntax and answer text.
pub const PLACEHOLDER_START: char = '\u{E000}';
pub const PLACEHOLDER_END: char = '\u{E001}';
const PLACEHOLDER_TAG: &str = "cite:";

/// Returns the placeholder token for an ordinal.
pub fn placeholder(ordinal: usize) -> String {
    format!("{PLACEHOLDER_START}{PLACEHOLDER_TAG}{ordinal}{PLACEHOLDER_END}")
}

/// Replaces every placeholder token in `text` with `marker(ordinal)`.
///
/// Malformed tokens are left in place.
pub fn replace_placeholders(text: &str, mut marker: impl FnMut(usize) -> String) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find(PLACEHOLDER_START) {
        out.push_str(&rest[..start]);
        let after = &rest[start + PLACEHOLDER_START.len_utf8()..];
        let parsed = after.strip_prefix(PLACEHOLDER_TAG).and_then(|tail| {
            let end = tail.find(PLACEHOLDER_END)?;
            let ordinal = tail[..end].parse::<usize>().ok()?;
            Some((ordinal, &tail[end + PLACEHOLDER_END.len_utf8()..]))
        });
        match parsed {
            Some((ordinal, tail)) => {
                out.push_str(&marker(ordinal));
                rest = tail;
            }
            None => {
                out.push(PLACEHOLDER_START);
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

/// One entry of the reference list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    /// De-duplication identity: `source[, Page N]` or the raw parenthetical text.
    pub key: String,
    /// 1-based position in the reference list.
    pub ordinal: usize,
    pub excerpt: Option<String>,
    pub confidence: Option<f64>,
}

/// Key → ordinal map for one resolution pass. Insertion order is ordinal order.
#[derive(Debug, Clone, Default)]
pub struct ReferenceMap {
    citations: Vec<Citation>,
    ordinals: HashMap<String, usize>,
}

impl ReferenceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the ordinal for `key`, assigning the next unused one if the key is new.
    ///
    /// Excerpt and confidence are only recorded on first sight.
    pub fn insert(
        &mut self,
        key: String,
        excerpt: Option<String>,
        confidence: Option<f64>,
    ) -> usize {
        if let Some(&ordinal) = self.ordinals.get(&key) {
            return ordinal;
        }
        let ordinal = self.citations.len() + 1;
        self.ordinals.insert(key.clone(), ordinal);
        self.citations.push(Citation {
            key,
            ordinal,
            excerpt,
            confidence,
        });
        ordinal
    }

    pub fn ordinal(&self, key: &str) -> Option<usize> {
        self.ordinals.get(key).copied()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.ordinals.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.citations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.citations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Citation> {
        self.citations.iter()
    }

    pub fn into_citations(self) -> Vec<Citation> {
        self.citations
    }
}

/// Output of a resolution pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Answer text with every `(key)` replaced by its placeholder.
    pub cleaned_text: String,
    /// References in ordinal order.
    pub references: Vec<Citation>,
}

/// Matches inline citations and source records into one reference list.
#[derive(Debug, Clone)]
pub struct CitationResolver {
    keywords: Vec<String>,
}

impl Default for CitationResolver {
    fn default() -> Self {
        Self {
            keywords: DEFAULT_KEYWORDS.iter().map(|k| (*k).to_string()).collect(),
        }
    }
}

impl CitationResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds keywords on top of [`DEFAULT_KEYWORDS`]. Blank and duplicate entries are ignored.
    #[must_use]
    pub fn with_extra_keywords<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for keyword in extra {
            let keyword = keyword.as_ref().trim().to_lowercase();
            if !keyword.is_empty() && !self.keywords.contains(&keyword) {
                self.keywords.push(keyword);
            }
        }
        self
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Resolves citations in `answer_text` against `records`.
    ///
    /// Must only run on final text: ordinals depend on everything seen.
    pub fn resolve(&self, answer_text: &str, records: &[SourceRecord]) -> Resolution {
        let mut references = ReferenceMap::new();

        for record in records {
            let key = record.citation_key();
            if key.is_empty() {
                tracing::debug!("skipping source record without a name");
                continue;
            }
            references.insert(
                key,
                record.best_excerpt().map(str::to_string),
                record.clamped_confidence(),
            );
        }

        let structured = references.len();
        for inner in parentheticals(answer_text) {
            if !references.contains(inner) && self.is_citation_like(inner) {
                references.insert(inner.to_string(), None, None);
            }
        }
        tracing::debug!(
            structured,
            inline = references.len() - structured,
            "resolved citations"
        );

        let mut cleaned_text = answer_text.to_string();
        for citation in references.iter() {
            let literal = format!("({})", citation.key);
            if cleaned_text.contains(&literal) {
                cleaned_text = cleaned_text.replace(&literal, &placeholder(citation.ordinal));
            }
        }

        Resolution {
            cleaned_text,
            references: references.into_citations(),
        }
    }

    fn is_citation_like(&self, inner: &str) -> bool {
        let trimmed = inner.trim();
        if trimmed.is_empty() {
            return false;
        }
        let lowered = trimmed.to_lowercase();
        if FALSE_POSITIVES.contains(&lowered.as_str()) {
            return false;
        }
        self.keywords.iter().any(|keyword| lowered.contains(keyword))
    }
}

/// Yields the contents of innermost parenthesized spans, in text order.
fn parentheticals(text: &str) -> impl Iterator<Item = &str> {
    let mut open: Option<usize> = None;
    text.char_indices().filter_map(move |(idx, ch)| match ch {
        '(' => {
            open = Some(idx + 1);
            None
        }
        ')' => open.take().map(|start| &text[start..idx]),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manual_a_page_3() -> SourceRecord {
        SourceRecord::new("Manual A").with_page(3)
    }

    #[test]
    fn test_duplicate_records_collapse_to_one_citation() {
        let resolver = CitationResolver::new();
        let records = vec![manual_a_page_3(), manual_a_page_3()];

        let resolution = resolver.resolve("Some answer.", &records);

        assert_eq!(resolution.references.len(), 1);
        assert_eq!(resolution.references[0].key, "Manual A, Page 3");
        assert_eq!(resolution.references[0].ordinal, 1);
    }

    #[test]
    fn test_inline_citation_without_record_is_detected() {
        let resolver = CitationResolver::new();
        let text = "Insulin stacking occurs... (Manual A, Page 3)";

        let resolution = resolver.resolve(text, &[]);

        assert_eq!(resolution.references.len(), 1);
        assert_eq!(resolution.references[0].key, "Manual A, Page 3");
        assert_eq!(resolution.references[0].ordinal, 1);
        assert_eq!(resolution.references[0].excerpt, None);
        assert_eq!(
            resolution.cleaned_text,
            format!("Insulin stacking occurs... {}", placeholder(1))
        );
    }

    #[test]
    fn test_structured_records_take_ordinals_before_inline_matches() {
        let resolver = CitationResolver::new();
        let records = vec![
            SourceRecord::new("Guide B")
                .with_excerpt("excerpt b")
                .with_confidence(0.9),
            manual_a_page_3(),
        ];
        let text = "First (Handbook C). Then (Manual A, Page 3). Again (Handbook C).";

        let resolution = resolver.resolve(text, &records);

        let keys: Vec<_> = resolution
            .references
            .iter()
            .map(|c| (c.key.as_str(), c.ordinal))
            .collect();
        assert_eq!(
            keys,
            vec![("Guide B", 1), ("Manual A, Page 3", 2), ("Handbook C", 3)]
        );
        assert_eq!(resolution.references[0].excerpt.as_deref(), Some("excerpt b"));
        assert_eq!(resolution.references[0].confidence, Some(0.9));
        assert_eq!(
            resolution.cleaned_text,
            format!(
                "First {}. Then {}. Again {}.",
                placeholder(3),
                placeholder(2),
                placeholder(3)
            )
        );
    }

    #[test]
    fn test_false_positives_and_non_citations_are_left_alone() {
        let resolver = CitationResolver::new();
        let text = "Use a meter (e.g.) or a strip (i.e.) and so on (etc.) (vs.) (see below).";

        let resolution = resolver.resolve(text, &[]);

        assert!(resolution.references.is_empty());
        assert_eq!(resolution.cleaned_text, text);
    }

    #[test]
    fn test_keyword_match_is_case_insensitive() {
        let resolver = CitationResolver::new();
        let resolution = resolver.resolve("Dose it right (DOSING PROTOCOL v2).", &[]);
        assert_eq!(resolution.references[0].key, "DOSING PROTOCOL v2");
    }

    #[test]
    fn test_extra_keywords_extend_detection() {
        let resolver = CitationResolver::new().with_extra_keywords(["Leaflet", " ", "manual"]);
        assert_eq!(
            resolver.keywords().len(),
            DEFAULT_KEYWORDS.len() + 1,
            "blank and duplicate keywords are ignored"
        );

        let resolution = resolver.resolve("Read it (Patient leaflet 4).", &[]);
        assert_eq!(resolution.references.len(), 1);
    }

    #[test]
    fn test_nested_parentheses_use_innermost_span() {
        let resolver = CitationResolver::new();
        let resolution = resolver.resolve("Note (see (Manual A, Page 3) for details).", &[]);

        assert_eq!(resolution.references.len(), 1);
        assert_eq!(resolution.references[0].key, "Manual A, Page 3");
        assert_eq!(
            resolution.cleaned_text,
            format!("Note (see {} for details).", placeholder(1))
        );
    }

    #[test]
    fn test_key_with_regex_metacharacters_is_replaced_literally() {
        let resolver = CitationResolver::new();
        let records = vec![SourceRecord::new("Guide [v1.2] *draft*+?")];
        let text = "Careful (Guide [v1.2] *draft*+?).";

        let resolution = resolver.resolve(text, &records);

        assert_eq!(resolution.cleaned_text, format!("Careful {}.", placeholder(1)));
    }

    #[test]
    fn test_loosely_matching_keys_stay_distinct() {
        let resolver = CitationResolver::new();
        let records = vec![manual_a_page_3()];

        let resolution = resolver.resolve("See (Manual A,  Page 3).", &records);

        assert_eq!(resolution.references.len(), 2);
        assert_eq!(resolution.references[1].key, "Manual A,  Page 3");
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let resolver = CitationResolver::new();
        let records = vec![manual_a_page_3(), SourceRecord::new("Guide B")];
        let text = "A (Guide B). B (Section 4.2). C (Manual A, Page 3).";

        let first = resolver.resolve(text, &records);
        let second = resolver.resolve(text, &records);

        assert_eq!(first, second);
    }

    #[test]
    fn test_reference_map_keeps_first_metadata() {
        let mut map = ReferenceMap::new();
        assert_eq!(map.insert("a".into(), Some("first".into()), Some(0.5)), 1);
        assert_eq!(map.insert("b".into(), None, None), 2);
        assert_eq!(map.insert("a".into(), Some("second".into()), Some(0.9)), 1);

        assert_eq!(map.ordinal("b"), Some(2));
        let citations = map.into_citations();
        assert_eq!(citations[0].excerpt.as_deref(), Some("first"));
        assert_eq!(citations[0].confidence, Some(0.5));
    }

    #[test]
    fn test_replace_placeholders_maps_ordinals() {
        let text = format!("a{}b{}c", placeholder(1), placeholder(12));
        let replaced = replace_placeholders(&text, |n| format!("[{n}]"));
        assert_eq!(replaced, "a[1]b[12]c");
    }

    #[test]
    fn test_replace_placeholders_keeps_malformed_tokens() {
        let text = format!("x{PLACEHOLDER_START}cite:zz{PLACEHOLDER_END}y");
        let replaced = replace_placeholders(&text, |n| format!("[{n}]"));
        assert_eq!(replaced, text);
    }
}
