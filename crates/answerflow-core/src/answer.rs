//! Answer and source-record shapes exchanged with the backend.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Page reference on a source record.
///
/// Backends send either a number or a free-form label ("iv", "12-13").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Page {
    Number(u64),
    Label(String),
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Page::Number(n) => write!(f, "{n}"),
            Page::Label(label) => write!(f, "{}", label.trim()),
        }
    }
}

impl From<u64> for Page {
    fn from(n: u64) -> Self {
        Page::Number(n)
    }
}

/// Structured source metadata supplied by the backend. Immutable once received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<Page>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_excerpt: Option<String>,
    /// Retrieval confidence in `[0, 1]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl SourceRecord {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            page: None,
            excerpt: None,
            full_excerpt: None,
            confidence: None,
        }
    }

    #[must_use]
    pub fn with_page(mut self, page: impl Into<Page>) -> Self {
        self.page = Some(page.into());
        self
    }

    #[must_use]
    pub fn with_excerpt(mut self, excerpt: impl Into<String>) -> Self {
        self.excerpt = Some(excerpt.into());
        self
    }

    #[must_use]
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Citation key: `source`, plus `, Page N` when a page is known.
    pub fn citation_key(&self) -> String {
        let source = self.source.trim();
        match &self.page {
            Some(page) => format!("{source}, Page {page}"),
            None => source.to_string(),
        }
    }

    /// Longest excerpt available, preferring `full_excerpt`.
    pub fn best_excerpt(&self) -> Option<&str> {
        self.full_excerpt
            .as_deref()
            .or(self.excerpt.as_deref())
            .filter(|text| !text.trim().is_empty())
    }

    /// Confidence clamped into `[0, 1]`; non-finite values are dropped.
    pub fn clamped_confidence(&self) -> Option<f64> {
        self.confidence
            .filter(|c| c.is_finite())
            .map(|c| c.clamp(0.0, 1.0))
    }
}

/// How a streamed answer reached its final state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Completion {
    /// The backend sent its terminal `end` event.
    #[default]
    Complete,
    /// The transport dropped after at least one fragment; the text is partial.
    Interrupted,
}

/// Final answer handed to presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub query: String,
    #[serde(default)]
    pub classification: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub severity: Option<String>,
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<SourceRecord>,
    #[serde(default)]
    pub disclaimer: String,
    #[serde(default)]
    pub completion: Completion,
}

impl Answer {
    pub fn is_interrupted(&self) -> bool {
        self.completion == Completion::Interrupted
    }
}

/// Answer-shaped metadata from the companion source lookup.
///
/// Every field is optional; only the present ones are merged into a streamed answer.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AnswerMetadata {
    #[serde(default)]
    pub classification: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub sources: Vec<SourceRecord>,
}
