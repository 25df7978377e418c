//! Playback engine.
//!
//! The engine owns the single active audio session, local file or radio
//! stream, and runs its state machine on a dedicated thread. User commands
//! and asynchronous completions (normalization done, stream connected,
//! device ran dry) all funnel through one channel, so transitions appear
//! atomic to callers. Each load carries a generation token; a `stop()` or a
//! newer `load()` invalidates the outstanding one, and a stale completion
//! is discarded instead of overwriting the newer session.

mod backend;
mod engine;
mod types;

pub use engine::{Player, StartedCallback};
pub use types::{Capabilities, PlaybackState, SessionSnapshot, Source, SourceKind};
