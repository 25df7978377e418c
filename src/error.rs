//! Error taxonomy shared across the crate.
//!
//! Conversion and connection failures are plain data (cloneable, comparable)
//! because the playback engine keeps the last failure inside its shared
//! session snapshot. Library failures wrap the storage error directly.

use thiserror::Error;

/// Failures of the format normalizer and the trim/save editor.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    /// The input or target format is not one of mp3/wav/ogg, or the tool
    /// has no encoder for it.
    #[error("unsupported audio format: {0}")]
    UnsupportedFormat(String),
    /// Trim bounds must satisfy `0 <= start < end <= duration`.
    #[error("invalid trim range: {start}s..{end}s is not inside the track")]
    InvalidRange { start: f64, end: f64 },
    /// Writing the converted audio failed.
    #[error("failed to write audio output: {0}")]
    WriteFailed(String),
    /// The external conversion tool was not found at startup.
    #[error("audio conversion tool (ffmpeg) is not available")]
    ToolMissing,
}

/// Failures of the radio stream adapter.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConnectionError {
    /// Transport-level failure (DNS, refused connection, TLS).
    #[error("station unreachable: {0}")]
    Unreachable(String),
    /// The server answered with a non-success HTTP status.
    #[error("station answered with HTTP status {0}")]
    BadStatus(u16),
    /// The server closed the stream while it was being played.
    #[error("radio stream ended unexpectedly")]
    StreamEnded,
}

/// Failures of the playback engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlayerError {
    /// A capability-gated call on the wrong source kind, e.g. seeking a
    /// radio stream.
    #[error("operation not supported for the current source")]
    OperationNotSupported,
    /// No loaded session (or no active playback) to act on.
    #[error("no audio is loaded")]
    NoSession,
    /// Normalizing a local file for playback failed.
    #[error(transparent)]
    Load(#[from] ConversionError),
    /// Connecting to or keeping up with a radio stream failed.
    #[error(transparent)]
    Connect(#[from] ConnectionError),
    /// The audio device reported a failure.
    #[error("audio device failure: {0}")]
    Device(String),
    /// The engine thread is gone; the player is shutting down.
    #[error("playback engine is not running")]
    Disconnected,
}

/// Failures of the library store.
#[derive(Debug, Error)]
pub enum LibraryError {
    /// The requested track id or path has no row.
    #[error("track not found in the library")]
    NotFound,
    /// Underlying SQLite failure.
    #[error("library storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}
