//! Paced reveal of streamed text.
//!
//! Fragments arrive at whatever rate the backend produces them; the scheduler
//! exposes at most one quantum of text per tick so the answer "types out"
//! smoothly. The caller owns the clock and calls [`RenderScheduler::tick`].

use super::session::StreamSession;
use super::surface::{AnswerSurface, Frame};
use crate::config::PacingConfig;
use crate::present::Presenter;

/// Per-session scroll affinity.
///
/// Auto-scroll follows the bottom edge until the user scrolls further than
/// `threshold` away from it, and resumes once they come back within it.
#[derive(Debug, Clone)]
pub struct RenderContext {
    follow_bottom: bool,
    threshold: f64,
}

impl RenderContext {
    pub fn new(threshold: f64) -> Self {
        Self {
            follow_bottom: true,
            threshold,
        }
    }

    /// Records a user scroll; `distance_from_bottom` is in surface units.
    pub fn on_user_scroll(&mut self, distance_from_bottom: f64) {
        let follow = distance_from_bottom <= self.threshold;
        if follow != self.follow_bottom {
            tracing::debug!(follow, distance_from_bottom, "auto-scroll changed");
        }
        self.follow_bottom = follow;
    }

    pub fn follows_bottom(&self) -> bool {
        self.follow_bottom
    }
}

/// Result of one scheduler tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reveal {
    /// Nothing new to show.
    Idle,
    /// This many chars were revealed.
    Advanced(usize),
    /// The session is complete and fully revealed; ticking has stopped.
    Drained,
}

#[derive(Debug)]
pub struct RenderScheduler {
    quantum: usize,
    context: RenderContext,
    drained: bool,
}

impl RenderScheduler {
    pub fn new(quantum: usize, scroll_threshold: f64) -> Self {
        Self {
            quantum: quantum.max(1),
            context: RenderContext::new(scroll_threshold),
            drained: false,
        }
    }

    pub fn from_pacing(pacing: &PacingConfig) -> Self {
        Self::new(pacing.quantum(), pacing.scroll_threshold())
    }

    pub fn context(&self) -> &RenderContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut RenderContext {
        &mut self.context
    }

    pub fn is_drained(&self) -> bool {
        self.drained
    }

    /// Reveals the next quantum and renders the revealed prefix.
    ///
    /// Once this returns [`Reveal::Drained`] every further call is a no-op.
    pub fn tick<S>(
        &mut self,
        session: &mut StreamSession,
        presenter: &Presenter,
        surface: &mut S,
    ) -> Reveal
    where
        S: AnswerSurface + ?Sized,
    {
        if self.drained {
            return Reveal::Drained;
        }

        let shown = session.revealed().len();
        let advanced = session.reveal(self.quantum);
        if advanced > 0 {
            let revealed = session.revealed();
            let presented = presenter.present_partial(revealed);
            surface.render_frame(&Frame {
                revealed,
                delta: &revealed[shown..],
                presented: &presented,
            });
            if self.context.follows_bottom() {
                surface.scroll_to_bottom();
            }
        }

        if session.is_completed() && session.is_drained() {
            self.drained = true;
            return Reveal::Drained;
        }
        if advanced > 0 {
            Reveal::Advanced(advanced)
        } else {
            Reveal::Idle
        }
    }
}
