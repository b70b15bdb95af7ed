//! Backend transports.
//!
//! - `shared`: transport-agnostic events, errors and the `AnswerTransport` seam
//! - `sse`: server-sent events → `TransportEvent`
//! - `http`: reqwest client for the streaming, ask and source-lookup endpoints

pub mod http;
pub mod shared;
pub mod sse;

pub use http::{Endpoints, HttpBackend};
pub use shared::{
    AnswerTransport, FragmentStream, TransportError, TransportErrorKind, TransportEvent,
    TransportResult, classify_reqwest_error,
};
pub use sse::FragmentParser;
