//! Stream session controller.
//!
//! Drives one question from submission to a final [`Answer`]:
//!
//! ```text
//! Idle → Connecting → Streaming → Completed
//!            │            │
//!            └────────────┴──→ Failed (no text received)
//! ```
//!
//! Everything runs on the calling task. A single `select!` loop multiplexes the
//! transport stream, the reveal ticker, user scroll events and cancellation.

use std::fmt;
use std::pin::pin;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::events::{SessionControls, session_channel};
use super::scheduler::{RenderScheduler, Reveal};
use super::session::StreamSession;
use super::surface::AnswerSurface;
use crate::answer::{Answer, AnswerMetadata, Completion};
use crate::citations::CitationResolver;
use crate::config::{Config, PacingConfig, PresentationConfig};
use crate::present::Presenter;
use crate::transport::{AnswerTransport, FragmentStream, TransportError, TransportEvent};

/// Why a session produced no answer.
#[derive(Debug, Clone)]
pub enum StreamError {
    /// The transport failed before any text arrived.
    Transport(TransportError),
    /// The caller cancelled the session.
    Cancelled,
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamError::Transport(err) => write!(f, "{err}"),
            StreamError::Cancelled => write!(f, "Answer stream cancelled"),
        }
    }
}

impl std::error::Error for StreamError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StreamError::Transport(err) => Some(err),
            StreamError::Cancelled => None,
        }
    }
}

impl From<TransportError> for StreamError {
    fn from(err: TransportError) -> Self {
        StreamError::Transport(err)
    }
}

/// How the transport phase ended.
enum StreamEnd {
    Finished,
    Fault(TransportError),
    Cancelled,
}

/// How the post-completion reveal ended.
enum DrainEnd {
    Drained,
    TimedOut,
    Cancelled,
}

/// Runs streamed question sessions against one transport.
pub struct StreamController<T> {
    transport: T,
    presenter: Presenter,
    resolver: CitationResolver,
    pacing: PacingConfig,
    presentation: PresentationConfig,
    lookup_timeout: Duration,
}

impl<T: AnswerTransport> StreamController<T> {
    pub fn new(transport: T, config: &Config) -> Self {
        Self {
            transport,
            presenter: Presenter::default(),
            resolver: CitationResolver::new()
                .with_extra_keywords(&config.citations.extra_keywords),
            pacing: config.pacing.clone(),
            presentation: config.presentation.clone(),
            lookup_timeout: config.backend.lookup_timeout(),
        }
    }

    #[must_use]
    pub fn with_presenter(mut self, presenter: Presenter) -> Self {
        self.presenter = presenter;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn presenter(&self) -> &Presenter {
        &self.presenter
    }

    pub fn resolver(&self) -> &CitationResolver {
        &self.resolver
    }

    /// Streams the answer to `query` onto `surface`.
    ///
    /// # Errors
    /// Returns `StreamError::Transport` if the transport fails before any text
    /// arrives. A failure after text arrived resolves with
    /// `Completion::Interrupted` instead.
    pub async fn start_stream<S>(
        &self,
        query: &str,
        conversation_id: Option<&str>,
        surface: &mut S,
    ) -> Result<Answer, StreamError>
    where
        S: AnswerSurface + ?Sized,
    {
        let (_handle, controls) = session_channel();
        self.run_session(query, conversation_id, surface, controls)
            .await
    }

    /// Like [`start_stream`](Self::start_stream), with caller-side cancellation and scroll input.
    ///
    /// # Errors
    /// Returns `StreamError::Transport` if the transport fails before any text
    /// arrives, or `StreamError::Cancelled` once the session's handle is cancelled.
    pub async fn run_session<S>(
        &self,
        query: &str,
        conversation_id: Option<&str>,
        surface: &mut S,
        controls: SessionControls,
    ) -> Result<Answer, StreamError>
    where
        S: AnswerSurface + ?Sized,
    {
        let SessionControls { cancel, scroll_rx } = controls;
        let mut ticker = time::interval(self.pacing.tick());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut run = SessionRun {
            presenter: &self.presenter,
            session: StreamSession::new(query, conversation_id.map(str::to_string)),
            scheduler: RenderScheduler::from_pacing(&self.pacing),
            surface,
            cancel,
            scroll_rx,
            ticker,
        };

        if run.cancel.is_cancelled() {
            return Err(run.cancelled());
        }
        run.session.begin_connecting();
        run.surface.show_pending();

        let opened = tokio::select! {
            biased;
            () = run.cancel.cancelled() => None,
            opened = self.transport.open(query, conversation_id) => Some(opened),
        };
        let stream = match opened {
            None => return Err(run.cancelled()),
            Some(Ok(stream)) => stream,
            Some(Err(err)) => return Err(run.fail(err)),
        };

        match run.stream(stream).await {
            StreamEnd::Cancelled => Err(run.cancelled()),
            StreamEnd::Fault(err) if !run.session.first_fragment_seen() => Err(run.fail(err)),
            StreamEnd::Fault(err) => self.recover(run, err).await,
            StreamEnd::Finished => self.complete(run, query, conversation_id).await,
        }
    }

    /// Clean completion: drain the reveal, fetch companion sources, present.
    async fn complete<S>(
        &self,
        mut run: SessionRun<'_, S>,
        query: &str,
        conversation_id: Option<&str>,
    ) -> Result<Answer, StreamError>
    where
        S: AnswerSurface + ?Sized,
    {
        run.session.mark_completed();

        match run.drain(self.pacing.drain_timeout()).await {
            DrainEnd::Drained => {}
            DrainEnd::TimedOut => {
                tracing::warn!(
                    displayed = run.session.displayed_len(),
                    total = run.session.total_len(),
                    "reveal did not drain in time; force-finalizing"
                );
                run.session.finish_reveal();
            }
            DrainEnd::Cancelled => return Err(run.cancelled()),
        }

        let lookup = tokio::select! {
            biased;
            () = run.cancel.cancelled() => None,
            found = time::timeout(
                self.lookup_timeout,
                self.transport.lookup_sources(query, conversation_id),
            ) => Some(found),
        };
        let Some(lookup) = lookup else {
            return Err(run.cancelled());
        };
        let metadata = match lookup {
            Ok(Ok(found)) => found.unwrap_or_default(),
            Ok(Err(err)) => {
                tracing::warn!(error = %err, "source lookup failed; presenting without sources");
                AnswerMetadata::default()
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.lookup_timeout.as_millis() as u64,
                    "source lookup timed out; presenting without sources"
                );
                AnswerMetadata::default()
            }
        };

        let answer = Answer {
            query: query.to_string(),
            classification: metadata.classification,
            confidence: metadata.confidence,
            severity: metadata.severity,
            answer: run.session.full_text().to_string(),
            sources: metadata.sources,
            disclaimer: self.presentation.disclaimer.clone(),
            completion: Completion::Complete,
        };
        tracing::debug!(
            chars = run.session.total_len(),
            sources = answer.sources.len(),
            elapsed_ms = run.session.started_at().elapsed().as_millis() as u64,
            "answer complete"
        );
        Ok(run.finish(&self.resolver, answer))
    }

    /// Transport fault after text arrived: keep what we have.
    async fn recover<S>(
        &self,
        mut run: SessionRun<'_, S>,
        err: TransportError,
    ) -> Result<Answer, StreamError>
    where
        S: AnswerSurface + ?Sized,
    {
        tracing::warn!(
            kind = %err.kind,
            error = %err,
            received = run.session.total_len(),
            "answer stream interrupted; keeping partial text"
        );
        if !run.grace(self.pacing.interrupt_grace()).await {
            return Err(run.cancelled());
        }

        run.session.mark_completed();
        run.session.finish_reveal();
        let answer = Answer {
            query: run.session.query().to_string(),
            classification: None,
            confidence: None,
            severity: None,
            answer: run.session.full_text().to_string(),
            sources: Vec::new(),
            disclaimer: self.presentation.interrupted_disclaimer.clone(),
            completion: Completion::Interrupted,
        };
        Ok(run.finish(&self.resolver, answer))
    }
}

/// State of one running session. Dropping it drops the transport.
struct SessionRun<'a, S: ?Sized> {
    presenter: &'a Presenter,
    session: StreamSession,
    scheduler: RenderScheduler,
    surface: &'a mut S,
    cancel: CancellationToken,
    scroll_rx: mpsc::UnboundedReceiver<f64>,
    ticker: Interval,
}

impl<S: AnswerSurface + ?Sized> SessionRun<'_, S> {
    /// Consumes the transport until `end`, a fault, or cancellation.
    async fn stream(&mut self, mut stream: FragmentStream) -> StreamEnd {
        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => return StreamEnd::Cancelled,
                Some(distance) = self.scroll_rx.recv() => {
                    self.scheduler.context_mut().on_user_scroll(distance);
                }
                item = stream.next() => match item {
                    Some(Ok(TransportEvent::Fragment(text))) => {
                        if self.session.push_fragment(&text) {
                            self.surface.begin_answer();
                        }
                    }
                    Some(Ok(TransportEvent::End)) => return StreamEnd::Finished,
                    Some(Err(err)) => return StreamEnd::Fault(err),
                    None => {
                        return StreamEnd::Fault(TransportError::closed(
                            "Answer stream closed before the end event",
                        ));
                    }
                },
                _ = self.ticker.tick() => {
                    self.scheduler
                        .tick(&mut self.session, self.presenter, &mut *self.surface);
                }
            }
        }
    }

    /// Keeps ticking until the reveal catches up, bounded by `timeout`.
    async fn drain(&mut self, timeout: Duration) -> DrainEnd {
        let mut deadline = pin!(time::sleep_until(Instant::now() + timeout));
        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => return DrainEnd::Cancelled,
                Some(distance) = self.scroll_rx.recv() => {
                    self.scheduler.context_mut().on_user_scroll(distance);
                }
                () = deadline.as_mut() => return DrainEnd::TimedOut,
                _ = self.ticker.tick() => {
                    let reveal = self
                        .scheduler
                        .tick(&mut self.session, self.presenter, &mut *self.surface);
                    if reveal == Reveal::Drained {
                        return DrainEnd::Drained;
                    }
                }
            }
        }
    }

    /// Waits `delay`; returns `false` if cancelled meanwhile.
    async fn grace(&self, delay: Duration) -> bool {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => false,
            () = time::sleep(delay) => true,
        }
    }

    fn finish(&mut self, resolver: &CitationResolver, answer: Answer) -> Answer {
        let view = self.presenter.present_answer(&answer, resolver);
        self.surface.render_final(&answer, &view);
        answer
    }

    fn fail(&mut self, err: TransportError) -> StreamError {
        tracing::warn!(kind = %err.kind, error = %err, "answer stream failed");
        self.session.mark_failed();
        self.surface.show_error(&err);
        StreamError::Transport(err)
    }

    fn cancelled(&mut self) -> StreamError {
        tracing::debug!("answer stream cancelled");
        self.session.mark_cancelled();
        StreamError::Cancelled
    }
}
