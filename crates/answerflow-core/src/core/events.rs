//! Inputs a running session accepts from the outside: cancellation and user scrolls.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Caller-side handle for a running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    cancel: CancellationToken,
    scroll_tx: mpsc::UnboundedSender<f64>,
}

impl SessionHandle {
    /// Cancels the session. The session stops writing to its surface immediately.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Reports a user scroll; `distance_from_bottom` is in surface units.
    pub fn user_scrolled(&self, distance_from_bottom: f64) {
        // A finished session no longer listens.
        let _ = self.scroll_tx.send(distance_from_bottom);
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

/// Session-side receivers, consumed by the controller.
#[derive(Debug)]
pub struct SessionControls {
    pub(crate) cancel: CancellationToken,
    pub(crate) scroll_rx: mpsc::UnboundedReceiver<f64>,
}

/// Creates a linked handle/controls pair for one session.
pub fn session_channel() -> (SessionHandle, SessionControls) {
    let cancel = CancellationToken::new();
    let (scroll_tx, scroll_rx) = mpsc::unbounded_channel();
    (
        SessionHandle {
            cancel: cancel.clone(),
            scroll_tx,
        },
        SessionControls { cancel, scroll_rx },
    )
}
