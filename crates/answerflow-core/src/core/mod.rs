//! Streaming-answer runtime.
//!
//! - `session`: per-question state (`StreamSession`)
//! - `scheduler`: paced reveal and scroll affinity
//! - `surface`: the display target trait and a recording implementation
//! - `events`: cancellation and scroll input for a running session
//! - `controller`: the session state machine tying it all together

pub mod controller;
pub mod events;
pub mod scheduler;
pub mod session;
pub mod surface;

pub use controller::{StreamController, StreamError};
pub use events::{SessionControls, SessionHandle, session_channel};
pub use scheduler::{RenderContext, RenderScheduler, Reveal};
pub use session::{SessionPhase, StreamSession};
pub use surface::{AnswerSurface, Frame, RecordingSurface, SurfaceWrite};
