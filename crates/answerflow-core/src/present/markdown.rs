//! Markdown → HTML rendering.
//!
//! `CmarkRenderer` uses pulldown-cmark (cargo feature `cmark`). When no renderer
//! is configured, `FallbackRenderer` covers headers, emphasis, lists and
//! paragraphs. Raw inline HTML passes through both; the sanitizer runs after.

use std::fmt::Write as _;
use std::sync::LazyLock;

use regex::Regex;

/// Pluggable lightweight-markup renderer.
pub trait MarkdownRenderer: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Renders markdown to HTML.
    fn render(&self, markdown: &str) -> String;
}

/// CommonMark renderer backed by pulldown-cmark.
#[cfg(feature = "cmark")]
#[derive(Debug, Clone, Copy, Default)]
pub struct CmarkRenderer;

#[cfg(feature = "cmark")]
impl MarkdownRenderer for CmarkRenderer {
    fn name(&self) -> &'static str {
        "pulldown-cmark"
    }

    fn render(&self, markdown: &str) -> String {
        use pulldown_cmark::{Options, Parser, html};

        let parser = Parser::new_ext(markdown, Options::ENABLE_STRIKETHROUGH);
        let mut out = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut out, parser);
        out
    }
}

static HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s{0,3}(#{1,6})\s+(.*?)\s*#*\s*$").expect("header regex"));
static UNORDERED_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[-*+]\s+(.*)$").expect("unordered item regex"));
static ORDERED_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d+[.)]\s+(.*)$").expect("ordered item regex"));
static BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*([^*\n]+?)\*\*|__([^_\n]+?)__").expect("bold regex"));
static ITALIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\*([^*\s][^*\n]*?)\*|\b_([^_\n]+?)_\b").expect("italic regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Unordered,
    Ordered,
}

impl ListKind {
    fn tag(self) -> &'static str {
        match self {
            ListKind::Unordered => "ul",
            ListKind::Ordered => "ol",
        }
    }
}

/// Minimal built-in renderer used when no markdown engine is available.
///
/// Supports ATX headers (1–6), `**bold**`/`__bold__`, `*italic*`/`_italic_`,
/// ordered and unordered lists, blank-line paragraphs and single-newline breaks.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackRenderer;

impl MarkdownRenderer for FallbackRenderer {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn render(&self, markdown: &str) -> String {
        let mut state = FallbackState::default();
        let normalized = markdown.replace("\r\n", "\n");

        for line in normalized.lines() {
            if line.trim().is_empty() {
                state.flush_paragraph();
                state.close_list();
            } else if let Some(caps) = HEADER.captures(line) {
                state.flush_paragraph();
                state.close_list();
                let level = caps[1].len();
                let _ = writeln!(state.out, "<h{level}>{}</h{level}>", inline(&caps[2]));
            } else if let Some(caps) = UNORDERED_ITEM.captures(line) {
                state.list_item(ListKind::Unordered, &caps[1]);
            } else if let Some(caps) = ORDERED_ITEM.captures(line) {
                state.list_item(ListKind::Ordered, &caps[1]);
            } else {
                state.close_list();
                state.paragraph.push(inline(line.trim()));
            }
        }

        state.flush_paragraph();
        state.close_list();
        state.out
    }
}

#[derive(Default)]
struct FallbackState {
    out: String,
    paragraph: Vec<String>,
    list: Option<ListKind>,
}

impl FallbackState {
    fn flush_paragraph(&mut self) {
        if self.paragraph.is_empty() {
            return;
        }
        let _ = writeln!(self.out, "<p>{}</p>", self.paragraph.join("<br>\n"));
        self.paragraph.clear();
    }

    fn close_list(&mut self) {
        if let Some(kind) = self.list.take() {
            let _ = writeln!(self.out, "</{}>", kind.tag());
        }
    }

    fn list_item(&mut self, kind: ListKind, text: &str) {
        self.flush_paragraph();
        if self.list != Some(kind) {
            self.close_list();
            let _ = writeln!(self.out, "<{}>", kind.tag());
            self.list = Some(kind);
        }
        let _ = writeln!(self.out, "<li>{}</li>", inline(text.trim()));
    }
}

fn inline(text: &str) -> String {
    let bold = BOLD.replace_all(text, "<strong>${1}${2}</strong>");
    ITALIC.replace_all(&bold, "<em>${1}${2}</em>").into_owned()
}
