//! Transport-agnostic types for the answer endpoints.

use std::fmt;
use std::future::Future;

use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::answer::AnswerMetadata;

/// Standard User-Agent header for answerflow requests.
pub const USER_AGENT: &str = concat!("answerflow/", env!("CARGO_PKG_VERSION"));

/// Events delivered by the streaming endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Literal text to append to the answer.
    Fragment(String),
    /// Terminal completion signal.
    End,
}

/// Categories of transport errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportErrorKind {
    /// Could not reach the backend.
    Connect,
    /// Connection or request timed out.
    Timeout,
    /// Backend answered with a non-success status.
    HttpStatus,
    /// The event stream failed mid-way or could not be decoded.
    Stream,
    /// The stream closed before the terminal `end` event.
    Closed,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportErrorKind::Connect => write!(f, "connect"),
            TransportErrorKind::Timeout => write!(f, "timeout"),
            TransportErrorKind::HttpStatus => write!(f, "http_status"),
            TransportErrorKind::Stream => write!(f, "stream"),
            TransportErrorKind::Closed => write!(f, "closed"),
        }
    }
}

/// Structured transport error with kind and details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportError {
    /// Error category
    pub kind: TransportErrorKind,
    /// One-line summary suitable for display
    pub message: String,
    /// Optional additional details (e.g., raw error body)
    pub details: Option<String>,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    /// Creates an HTTP status error, pulling a readable message out of JSON bodies.
    pub fn http_status(status: u16, body: &str) -> Self {
        let details = (!body.is_empty()).then(|| body.to_string());
        let detail_message = serde_json::from_str::<Value>(body).ok().and_then(|json| {
            json.get("detail")
                .or_else(|| json.get("error").and_then(|e| e.get("message")))
                .or_else(|| json.get("error"))
                .and_then(|v| v.as_str())
                .map(str::to_string)
        });
        let message = match detail_message {
            Some(msg) => format!("HTTP {status}: {msg}"),
            None => format!("HTTP {status}"),
        };
        Self {
            kind: TransportErrorKind::HttpStatus,
            message,
            details,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Timeout, message)
    }

    pub fn stream(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Stream, message)
    }

    pub fn closed(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Closed, message)
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for TransportError {}

/// Result type for transport operations.
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Boxed stream of transport events.
pub type FragmentStream = BoxStream<'static, TransportResult<TransportEvent>>;

/// Classifies a reqwest error into a transport error.
pub fn classify_reqwest_error(e: &reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::timeout(format!("Request timed out: {e}"))
    } else if e.is_connect() {
        TransportError::new(
            TransportErrorKind::Connect,
            format!("Connection failed: {e}"),
        )
    } else if e.is_decode() || e.is_body() {
        TransportError::stream(format!("Response body error: {e}"))
    } else {
        TransportError::new(TransportErrorKind::Connect, format!("Network error: {e}"))
    }
}

/// One streaming connection per call to [`AnswerTransport::open`].
pub trait AnswerTransport {
    /// Opens the answer stream for `query`.
    ///
    /// The returned stream owns the connection; dropping it closes the transport.
    fn open(
        &self,
        query: &str,
        conversation_id: Option<&str>,
    ) -> impl Future<Output = TransportResult<FragmentStream>> + Send;

    /// Fetches sources and classification for a completed answer.
    ///
    /// `Ok(None)` means the transport has no companion lookup.
    fn lookup_sources(
        &self,
        _query: &str,
        _conversation_id: Option<&str>,
    ) -> impl Future<Output = TransportResult<Option<AnswerMetadata>>> + Send {
        async { Ok(None) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_extracts_detail_message() {
        let err = TransportError::http_status(503, r#"{"detail":"index is rebuilding"}"#);
        assert_eq!(err.kind, TransportErrorKind::HttpStatus);
        assert_eq!(err.message, "HTTP 503: index is rebuilding");
        assert!(err.details.is_some());
    }

    #[test]
    fn test_http_status_with_nested_error_object() {
        let err = TransportError::http_status(400, r#"{"error":{"message":"query required"}}"#);
        assert_eq!(err.to_string(), "HTTP 400: query required");
    }

    #[test]
    fn test_http_status_with_plain_body() {
        let err = TransportError::http_status(502, "Bad Gateway");
        assert_eq!(err.message, "HTTP 502");
        assert_eq!(err.details.as_deref(), Some("Bad Gateway"));

        let err = TransportError::http_status(500, "");
        assert!(err.details.is_none());
    }
}
