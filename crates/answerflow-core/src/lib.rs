//! Core answerflow library (streaming sessions, citations, presentation, config).

pub mod answer;
pub mod citations;
pub mod config;
pub mod core;
pub mod present;
pub mod transport;
