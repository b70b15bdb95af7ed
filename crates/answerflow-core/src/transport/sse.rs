//! SSE parser for the answer stream.
//!
//! The backend sends default events whose payload is a literal text fragment and
//! a terminal `end` event without payload. Other named events are skipped.

use std::error::Error;
use std::pin::Pin;
use std::task::{Context, Poll};

use eventsource_stream::{EventStream, Eventsource};
use futures_util::Stream;

use super::shared::{TransportError, TransportEvent, TransportResult};

/// Name of the terminal event.
pub const END_EVENT: &str = "end";

/// SSE parser that converts a byte stream into `TransportEvent`s.
pub struct FragmentParser<S> {
    inner: EventStream<S>,
    finished: bool,
}

impl<S> FragmentParser<S> {
    pub fn new(stream: S) -> Self
    where
        S: Eventsource,
    {
        Self {
            inner: stream.eventsource(),
            finished: false,
        }
    }
}

impl<S, B, E> Stream for FragmentParser<S>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: Error + Send + Sync + 'static,
{
    type Item = TransportResult<TransportEvent>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.finished {
            return Poll::Ready(None);
        }

        loop {
            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(event))) => {
                    if let Some(parsed) = classify_event(&event.event, event.data) {
                        if parsed == TransportEvent::End {
                            self.finished = true;
                        }
                        return Poll::Ready(Some(Ok(parsed)));
                    }
                }
                Poll::Ready(Some(Err(e))) => {
                    return Poll::Ready(Some(Err(TransportError::stream(format!(
                        "SSE stream error: {e}"
                    )))));
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Maps one SSE event to a transport event; `None` means skip.
fn classify_event(event_type: &str, data: String) -> Option<TransportEvent> {
    match event_type {
        "" | "message" => {
            if data.is_empty() {
                None
            } else {
                Some(TransportEvent::Fragment(data))
            }
        }
        END_EVENT => Some(TransportEvent::End),
        other => {
            tracing::debug!(event = other, "ignoring unknown SSE event");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use futures_util::StreamExt;

    use super::*;

    const SSE_ANSWER: &str = "data: Insulin \n\n\
data: stacking occurs\n\n\
event: progress\n\
data: {\"stage\":\"retrieval\"}\n\n\
data: line one\n\
data: line two\n\n\
event: end\n\
data:\n\n";

    /// Helper to create a mock byte stream from a string
    fn mock_byte_stream(
        data: &str,
        chunk: usize,
    ) -> impl Stream<Item = std::result::Result<bytes::Bytes, std::io::Error>> {
        let chunks: Vec<_> = data
            .as_bytes()
            .chunks(chunk)
            .map(|c| Ok(bytes::Bytes::copy_from_slice(c)))
            .collect();
        futures_util::stream::iter(chunks)
    }

    async fn collect(
        stream: impl Stream<Item = TransportResult<TransportEvent>>,
    ) -> Vec<TransportEvent> {
        stream.map(|item| item.expect("valid event")).collect().await
    }

    #[tokio::test]
    async fn test_parser_maps_default_events_to_fragments() {
        let events = collect(FragmentParser::new(mock_byte_stream(SSE_ANSWER, 7))).await;

        assert_eq!(
            events,
            vec![
                TransportEvent::Fragment("Insulin ".to_string()),
                TransportEvent::Fragment("stacking occurs".to_string()),
                TransportEvent::Fragment("line one\nline two".to_string()),
                TransportEvent::End,
            ]
        );
    }

    #[tokio::test]
    async fn test_parser_stops_after_end_event() {
        let body = "data: a\n\nevent: end\ndata:\n\ndata: late\n\n";
        let events = collect(FragmentParser::new(mock_byte_stream(body, 64))).await;

        assert_eq!(
            events,
            vec![TransportEvent::Fragment("a".to_string()), TransportEvent::End]
        );
    }

    #[tokio::test]
    async fn test_parser_ends_without_end_event_on_eof() {
        let body = "data: partial\n\n";
        let events = collect(FragmentParser::new(mock_byte_stream(body, 3))).await;
        assert_eq!(events, vec![TransportEvent::Fragment("partial".to_string())]);
    }

    #[tokio::test]
    async fn test_parser_surfaces_byte_stream_errors() {
        let chunks: Vec<std::result::Result<bytes::Bytes, std::io::Error>> = vec![
            Ok(bytes::Bytes::from_static(b"data: Hello\n\n")),
            Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "reset by peer",
            )),
        ];
        let mut parser = FragmentParser::new(futures_util::stream::iter(chunks));

        assert_eq!(
            parser.next().await.unwrap().unwrap(),
            TransportEvent::Fragment("Hello".to_string())
        );
        let err = parser.next().await.unwrap().unwrap_err();
        assert_eq!(err.kind, crate::transport::TransportErrorKind::Stream);
        assert!(err.message.contains("reset by peer"));
    }

    #[test]
    fn test_classify_event_skips_empty_default_payloads() {
        assert_eq!(classify_event("message", String::new()), None);
        assert_eq!(classify_event("end", String::new()), Some(TransportEvent::End));
        assert_eq!(classify_event("heartbeat", "x".to_string()), None);
    }
}
