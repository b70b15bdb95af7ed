//! Render + sanitize adapter.
//!
//! Turns resolved answer text into safe HTML:
//! 1. markdown → HTML via the configured renderer (or the built-in fallback)
//! 2. citation placeholders in the rendered HTML → `<sup>` reference markers
//! 3. HTML → allow-listed HTML via the configured sanitizer
//!
//! Placeholders survive rendering untouched, so markers are spliced in after the
//! markdown pass and citation keys never reach the markdown syntax.
//!
//! A presenter without a sanitizer still works, but every output is flagged
//! `sanitized: false` and logged as a degraded-security condition.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;

use crate::answer::Answer;
use crate::citations::{Citation, CitationResolver, replace_placeholders};

pub mod markdown;
pub mod sanitize;

pub use markdown::{FallbackRenderer, MarkdownRenderer};
pub use sanitize::Sanitizer;

/// Presentation output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Presented {
    pub html: String,
    /// False when no sanitizer was available; the HTML must not be trusted.
    pub sanitized: bool,
}

/// A fully presented answer: references plus safe markup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerView {
    /// Resolved plain text with `[n]` labels where citations stood.
    pub text: String,
    pub references: Vec<Citation>,
    pub presented: Presented,
    pub disclaimer: String,
}

/// Markdown renderer + sanitizer pair.
pub struct Presenter {
    renderer: Option<Box<dyn MarkdownRenderer>>,
    sanitizer: Option<Box<dyn Sanitizer>>,
    warned_unsanitized: AtomicBool,
}

impl fmt::Debug for Presenter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Presenter")
            .field("renderer", &self.renderer.as_ref().map(|r| r.name()))
            .field("sanitizer", &self.sanitizer.as_ref().map(|s| s.name()))
            .finish_non_exhaustive()
    }
}

impl Default for Presenter {
    /// Uses every capability compiled into this build.
    fn default() -> Self {
        Self::new(default_renderer(), default_sanitizer())
    }
}

impl Presenter {
    /// Creates a presenter. `None` selects the fallback renderer or disables sanitization.
    pub fn new(
        renderer: Option<Box<dyn MarkdownRenderer>>,
        sanitizer: Option<Box<dyn Sanitizer>>,
    ) -> Self {
        Self {
            renderer,
            sanitizer,
            warned_unsanitized: AtomicBool::new(false),
        }
    }

    pub fn renderer_name(&self) -> &'static str {
        self.renderer
            .as_ref()
            .map_or(FallbackRenderer.name(), |r| r.name())
    }

    pub fn is_sanitizing(&self) -> bool {
        self.sanitizer.is_some()
    }

    /// Presents resolved text: render, turn placeholders into reference markers, sanitize.
    pub fn present(&self, cleaned_text: &str, references: &[Citation]) -> Presented {
        let rendered = self.render(cleaned_text);
        let marked = replace_placeholders(&rendered, |ordinal| {
            references
                .iter()
                .find(|c| c.ordinal == ordinal)
                .map_or_else(|| format!("[{ordinal}]"), citation_marker)
        });
        self.sanitize(marked)
    }

    /// Presents an in-progress prefix (no citation substitution).
    pub fn present_partial(&self, text: &str) -> Presented {
        self.sanitize(self.render(text))
    }

    /// Resolves citations in a final answer and presents it.
    pub fn present_answer(&self, answer: &Answer, resolver: &CitationResolver) -> AnswerView {
        let resolution = resolver.resolve(&answer.answer, &answer.sources);
        let presented = self.present(&resolution.cleaned_text, &resolution.references);
        AnswerView {
            text: replace_placeholders(&resolution.cleaned_text, |ordinal| format!("[{ordinal}]")),
            references: resolution.references,
            presented,
            disclaimer: answer.disclaimer.clone(),
        }
    }

    fn render(&self, text: &str) -> String {
        match &self.renderer {
            Some(renderer) => renderer.render(text),
            None => FallbackRenderer.render(text),
        }
    }

    fn sanitize(&self, html: String) -> Presented {
        match &self.sanitizer {
            Some(sanitizer) => Presented {
                html: sanitizer.sanitize(&html),
                sanitized: true,
            },
            None => {
                if !self.warned_unsanitized.swap(true, Ordering::Relaxed) {
                    tracing::warn!("no sanitizer available; presenting unsanitized HTML");
                }
                Presented {
                    html,
                    sanitized: false,
                }
            }
        }
    }
}

/// Superscript marker: ordinal as label, citation key as tooltip.
pub fn citation_marker(citation: &Citation) -> String {
    format!(
        r#"<sup class="citation" data-citation="{ordinal}" title="{title}">[{ordinal}]</sup>"#,
        ordinal = citation.ordinal,
        title = escape_html(&citation.key),
    )
}

/// Escapes text for use inside HTML attributes and text nodes.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}

fn default_renderer() -> Option<Box<dyn MarkdownRenderer>> {
    #[cfg(feature = "cmark")]
    {
        Some(Box::new(markdown::CmarkRenderer))
    }
    #[cfg(not(feature = "cmark"))]
    {
        None
    }
}

fn default_sanitizer() -> Option<Box<dyn Sanitizer>> {
    #[cfg(feature = "sanitize")]
    {
        Some(Box::new(sanitize::AllowListSanitizer))
    }
    #[cfg(not(feature = "sanitize"))]
    {
        None
    }
}
