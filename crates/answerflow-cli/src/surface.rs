//! Terminal answer surface.
//!
//! On a terminal, revealed text goes to stdout as it is paced in. Piped output
//! gets the resolved answer once, with `[n]` labels in place of citations.
//! Status and errors go to stderr so stdout stays pipeable.

use std::io::{self, IsTerminal, Write};

use answerflow_core::answer::Answer;
use answerflow_core::core::{AnswerSurface, Frame};
use answerflow_core::present::{AnswerView, escape_html};
use answerflow_core::transport::TransportError;

const PENDING: &str = "Waiting for answer...";

pub struct TerminalSurface<O, E> {
    out: O,
    err: E,
    html: bool,
    progress: bool,
    live: bool,
    pending_visible: bool,
    /// Bytes of the answer already written to `out`.
    printed: usize,
}

impl TerminalSurface<io::Stdout, io::Stderr> {
    /// Surface over stdout/stderr. Progress and live text only show on a terminal.
    pub fn stdio(html: bool) -> Self {
        let progress = io::stderr().is_terminal();
        Self::new(io::stdout(), io::stderr(), html, progress)
            .with_live_text(io::stdout().is_terminal())
    }
}

impl<O: Write, E: Write> TerminalSurface<O, E> {
    pub fn new(out: O, err: E, html: bool, progress: bool) -> Self {
        Self {
            out,
            err,
            html,
            progress,
            live: true,
            pending_visible: false,
            printed: 0,
        }
    }

    /// Whether revealed text is written while the answer streams.
    #[must_use]
    pub fn with_live_text(mut self, live: bool) -> Self {
        self.live = live;
        self
    }

    fn clear_pending(&mut self) {
        if self.pending_visible {
            let _ = write!(self.err, "\r\x1b[2K");
            let _ = self.err.flush();
            self.pending_visible = false;
        }
    }

    fn write_text(&mut self, answer: &Answer, view: &AnswerView) -> io::Result<()> {
        if self.printed == 0 {
            self.out.write_all(view.text.as_bytes())?;
        } else {
            // Streamed text is already on screen with its inline citations.
            let rest = answer.answer.get(self.printed..).unwrap_or_default();
            self.out.write_all(rest.as_bytes())?;
        }
        self.printed = answer.answer.len();
        writeln!(self.out)?;

        if !view.references.is_empty() {
            writeln!(self.out, "\nReferences:")?;
            for citation in &view.references {
                writeln!(self.out, "  [{}] {}", citation.ordinal, citation.key)?;
                if let Some(excerpt) = &citation.excerpt {
                    writeln!(self.out, "      {}", excerpt.trim())?;
                }
            }
        }

        let disclaimer = view.disclaimer.trim();
        if !disclaimer.is_empty() {
            writeln!(self.out, "\n{disclaimer}")?;
        }
        Ok(())
    }

    fn write_html(&mut self, view: &AnswerView) -> io::Result<()> {
        writeln!(self.out, "{}", view.presented.html.trim_end())?;

        if !view.references.is_empty() {
            writeln!(self.out, r#"<ol class="references">"#)?;
            for citation in &view.references {
                writeln!(
                    self.out,
                    r#"<li id="ref-{}">{}</li>"#,
                    citation.ordinal,
                    escape_html(&citation.key)
                )?;
            }
            writeln!(self.out, "</ol>")?;
        }

        let disclaimer = view.disclaimer.trim();
        if !disclaimer.is_empty() {
            writeln!(
                self.out,
                r#"<p class="disclaimer">{}</p>"#,
                escape_html(disclaimer)
            )?;
        }
        Ok(())
    }

    #[cfg(test)]
    fn into_parts(self) -> (O, E) {
        (self.out, self.err)
    }
}

impl<O: Write, E: Write> AnswerSurface for TerminalSurface<O, E> {
    fn show_pending(&mut self) {
        if self.progress {
            let _ = write!(self.err, "{PENDING}");
            let _ = self.err.flush();
            self.pending_visible = true;
        }
    }

    fn begin_answer(&mut self) {
        self.clear_pending();
    }

    fn render_frame(&mut self, frame: &Frame<'_>) {
        // HTML is only meaningful once citations are resolved.
        if self.html || !self.live {
            return;
        }
        let _ = self.out.write_all(frame.delta.as_bytes());
        let _ = self.out.flush();
        self.printed = frame.revealed.len();
    }

    fn scroll_to_bottom(&mut self) {}

    fn render_final(&mut self, answer: &Answer, view: &AnswerView) {
        self.clear_pending();
        let written = if self.html {
            self.write_html(view)
        } else {
            self.write_text(answer, view)
        };
        if let Err(err) = written.and_then(|()| self.out.flush()) {
            tracing::warn!(error = %err, "failed to write answer");
        }
    }

    fn show_error(&mut self, error: &TransportError) {
        self.clear_pending();
        let _ = writeln!(self.err, "Error: {}", error.message);
        if let Some(details) = &error.details {
            tracing::debug!(details = %details, "transport error details");
        }
    }
}
