//! Answer surface: where a session writes what the user sees.
//!
//! A session holds the surface by `&mut` for its whole lifetime, so there is
//! exactly one writer per surface.

use tokio::time::Instant;

use crate::answer::Answer;
use crate::present::{AnswerView, Presented};
use crate::transport::TransportError;

/// One paced reveal step.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    /// Everything revealed so far.
    pub revealed: &'a str,
    /// The part revealed by this step.
    pub delta: &'a str,
    /// `revealed` rendered and sanitized.
    pub presented: &'a Presented,
}

/// Display target for a streamed answer.
pub trait AnswerSurface {
    /// Shows the "waiting for answer" indicator.
    fn show_pending(&mut self);

    /// Replaces the pending indicator with an empty answer area.
    fn begin_answer(&mut self);

    /// Replaces the answer area with a newly revealed prefix.
    fn render_frame(&mut self, frame: &Frame<'_>);

    fn scroll_to_bottom(&mut self);

    /// Replaces the answer area with the final, citation-resolved answer.
    fn render_final(&mut self, answer: &Answer, view: &AnswerView);

    /// Replaces the pending indicator with an error message.
    fn show_error(&mut self, error: &TransportError);
}

/// A write recorded by [`RecordingSurface`].
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceWrite {
    Pending,
    BeginAnswer,
    Frame { revealed: String, html: String },
    ScrollToBottom,
    Final { answer: Box<Answer>, view: AnswerView },
    Error { message: String },
}

/// Surface that records every write with its timestamp.
///
/// Used headless and in tests.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    writes: Vec<(Instant, SurfaceWrite)>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writes(&self) -> impl Iterator<Item = &SurfaceWrite> {
        self.writes.iter().map(|(_, write)| write)
    }

    pub fn timestamps(&self) -> impl Iterator<Item = Instant> + '_ {
        self.writes.iter().map(|(at, _)| *at)
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// Revealed prefixes, in render order.
    pub fn frames(&self) -> Vec<&str> {
        self.writes()
            .filter_map(|write| match write {
                SurfaceWrite::Frame { revealed, .. } => Some(revealed.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn scroll_count(&self) -> usize {
        self.writes()
            .filter(|write| matches!(write, SurfaceWrite::ScrollToBottom))
            .count()
    }

    pub fn final_view(&self) -> Option<&AnswerView> {
        self.writes().find_map(|write| match write {
            SurfaceWrite::Final { view, .. } => Some(view),
            _ => None,
        })
    }

    pub fn error_message(&self) -> Option<&str> {
        self.writes().find_map(|write| match write {
            SurfaceWrite::Error { message } => Some(message.as_str()),
            _ => None,
        })
    }

    fn record(&mut self, write: SurfaceWrite) {
        self.writes.push((Instant::now(), write));
    }
}

impl AnswerSurface for RecordingSurface {
    fn show_pending(&mut self) {
        self.record(SurfaceWrite::Pending);
    }

    fn begin_answer(&mut self) {
        self.record(SurfaceWrite::BeginAnswer);
    }

    fn render_frame(&mut self, frame: &Frame<'_>) {
        self.record(SurfaceWrite::Frame {
            revealed: frame.revealed.to_string(),
            html: frame.presented.html.clone(),
        });
    }

    fn scroll_to_bottom(&mut self) {
        self.record(SurfaceWrite::ScrollToBottom);
    }

    fn render_final(&mut self, answer: &Answer, view: &AnswerView) {
        self.record(SurfaceWrite::Final {
            answer: Box::new(answer.clone()),
            view: view.clone(),
        });
    }

    fn show_error(&mut self, error: &TransportError) {
        self.record(SurfaceWrite::Error {
            message: error.message.clone(),
        });
    }
}
