//! Per-question session state.

use tokio::time::Instant;

/// Lifecycle of one streamed question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Connecting,
    Streaming,
    Completed,
    Failed,
    Cancelled,
}

impl SessionPhase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionPhase::Completed | SessionPhase::Failed | SessionPhase::Cancelled
        )
    }
}

/// Mutable state of one in-flight answer.
///
/// Lengths are counted in `char`s; the revealed prefix always ends on a char boundary.
#[derive(Debug)]
pub struct StreamSession {
    query: String,
    conversation_id: Option<String>,
    started_at: Instant,
    full_text: String,
    total_chars: usize,
    displayed_chars: usize,
    displayed_bytes: usize,
    completed: bool,
    first_fragment_seen: bool,
    phase: SessionPhase,
}

impl StreamSession {
    pub fn new(query: impl Into<String>, conversation_id: Option<String>) -> Self {
        Self {
            query: query.into(),
            conversation_id,
            started_at: Instant::now(),
            full_text: String::new(),
            total_chars: 0,
            displayed_chars: 0,
            displayed_bytes: 0,
            completed: false,
            first_fragment_seen: false,
            phase: SessionPhase::Idle,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn full_text(&self) -> &str {
        &self.full_text
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn first_fragment_seen(&self) -> bool {
        self.first_fragment_seen
    }

    /// Number of chars currently revealed.
    pub fn displayed_len(&self) -> usize {
        self.displayed_chars
    }

    /// Number of chars received so far.
    pub fn total_len(&self) -> usize {
        self.total_chars
    }

    pub fn begin_connecting(&mut self) {
        self.transition(SessionPhase::Connecting);
    }

    /// Appends a fragment. Returns `true` for the first fragment of the session.
    pub fn push_fragment(&mut self, fragment: &str) -> bool {
        if self.phase.is_terminal() {
            tracing::debug!(phase = ?self.phase, "dropping fragment for finished session");
            return false;
        }
        self.full_text.push_str(fragment);
        self.total_chars += fragment.chars().count();

        if self.first_fragment_seen {
            return false;
        }
        self.first_fragment_seen = true;
        self.transition(SessionPhase::Streaming);
        true
    }

    /// Marks the text as final. Returns `false` if the session was already completed.
    pub fn mark_completed(&mut self) -> bool {
        if self.completed {
            return false;
        }
        self.completed = true;
        self.transition(SessionPhase::Completed);
        true
    }

    pub fn mark_failed(&mut self) {
        self.transition(SessionPhase::Failed);
    }

    pub fn mark_cancelled(&mut self) {
        self.transition(SessionPhase::Cancelled);
    }

    /// Reveals up to `quantum` more chars. Returns how many were revealed.
    pub fn reveal(&mut self, quantum: usize) -> usize {
        let hidden = &self.full_text[self.displayed_bytes..];
        let (count, bytes) = hidden
            .chars()
            .take(quantum)
            .fold((0, 0), |(count, bytes), ch| (count + 1, bytes + ch.len_utf8()));
        self.displayed_chars += count;
        self.displayed_bytes += bytes;
        count
    }

    /// The revealed prefix of the answer.
    pub fn revealed(&self) -> &str {
        &self.full_text[..self.displayed_bytes]
    }

    /// Reveals everything at once.
    pub fn finish_reveal(&mut self) {
        self.displayed_chars = self.total_chars;
        self.displayed_bytes = self.full_text.len();
    }

    pub fn is_drained(&self) -> bool {
        self.displayed_chars == self.total_chars
    }

    fn transition(&mut self, next: SessionPhase) {
        if self.phase == next {
            return;
        }
        tracing::debug!(
            from = ?self.phase,
            to = ?next,
            elapsed_ms = self.started_at.elapsed().as_millis() as u64,
            "session transition"
        );
        self.phase = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_fragment_moves_to_streaming() {
        let mut session = StreamSession::new("q", None);
        session.begin_connecting();
        assert_eq!(session.phase(), SessionPhase::Connecting);

        assert!(session.push_fragment("Hello "));
        assert!(!session.push_fragment("world"));

        assert_eq!(session.phase(), SessionPhase::Streaming);
        assert_eq!(session.full_text(), "Hello world");
        assert_eq!(session.total_len(), 11);
        assert!(session.first_fragment_seen());
    }

    #[test]
    fn test_completion_happens_once() {
        let mut session = StreamSession::new("q", Some("conv".to_string()));
        session.push_fragment("x");

        assert!(session.mark_completed());
        assert!(!session.mark_completed());
        assert!(session.is_completed());
        assert_eq!(session.conversation_id(), Some("conv"));
    }

    #[test]
    fn test_fragments_after_terminal_phase_are_dropped() {
        let mut session = StreamSession::new("q", None);
        session.push_fragment("kept");
        session.mark_cancelled();

        assert!(!session.push_fragment(" dropped"));
        assert_eq!(session.full_text(), "kept");
    }

    #[test]
    fn test_reveal_counts_chars_not_bytes() {
        let mut session = StreamSession::new("q", None);
        session.push_fragment("héllo wörld ✓");

        assert_eq!(session.reveal(2), 2);
        assert_eq!(session.revealed(), "hé");
        assert_eq!(session.reveal(10), 10);
        assert_eq!(session.revealed(), "héllo wörld");
        assert_eq!(session.reveal(10), 2);
        assert_eq!(session.revealed(), "héllo wörld ✓");
        assert_eq!(session.reveal(10), 0);
        assert!(session.is_drained());
    }

    #[test]
    fn test_displayed_len_never_exceeds_total() {
        let mut session = StreamSession::new("q", None);
        for fragment in ["ab", "", "cdé", "f"] {
            session.push_fragment(fragment);
            let before = session.displayed_len();
            session.reveal(3);
            assert!(session.displayed_len() >= before);
            assert!(session.displayed_len() <= session.total_len());
        }
        session.finish_reveal();
        assert_eq!(session.revealed(), "abcdéf");
        assert!(session.is_drained());
    }
}
