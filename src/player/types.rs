use std::path::PathBuf;
use std::time::Duration;

use crate::config::Station;
use crate::error::PlayerError;

/// Lifecycle states of the playback session.
///
/// `Stopped` is terminal for the session; getting audio out again means
/// loading a new source. `Error` is recoverable the same way.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Loading,
    Playing,
    Paused,
    Stopped,
    Error,
}

/// What the engine is asked to play.
#[derive(Debug, Clone)]
pub enum Source {
    /// A local audio file, normalized before it reaches the device.
    LocalFile(PathBuf),
    /// A live station stream.
    RadioStream(Station),
}

impl Source {
    pub fn kind(&self) -> SourceKind {
        match self {
            Self::LocalFile(_) => SourceKind::LocalFile,
            Self::RadioStream(_) => SourceKind::RadioStream,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SourceKind {
    LocalFile,
    RadioStream,
}

/// What a source kind can and cannot do.
///
/// Call sites gate on these flags instead of matching on the kind by name,
/// so a new source kind only has to describe itself here.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Capabilities {
    pub supports_seek: bool,
    pub supports_pause: bool,
    pub supports_loop: bool,
    pub has_duration: bool,
}

impl SourceKind {
    pub fn capabilities(self) -> Capabilities {
        match self {
            Self::LocalFile => Capabilities {
                supports_seek: true,
                supports_pause: true,
                supports_loop: true,
                has_duration: true,
            },
            Self::RadioStream => Capabilities {
                supports_seek: false,
                supports_pause: false,
                supports_loop: false,
                has_duration: false,
            },
        }
    }
}

/// Read-only view of the playback session, published by the engine thread.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub state: PlaybackState,
    pub source: Option<SourceKind>,
    /// Track title or station name of the loaded source.
    pub name: Option<String>,
    /// Elapsed playback position. Frozen at zero for radio streams.
    pub elapsed: Duration,
    /// Total length; absent for radio streams.
    pub duration: Option<Duration>,
    /// Restart at the end of the track. Forced false for radio streams.
    pub looping: bool,
    pub volume: f32,
    /// The failure behind an `Error` state, distinguishable per kind.
    pub error: Option<PlayerError>,
}

impl SessionSnapshot {
    pub(crate) fn idle(volume: f32) -> Self {
        Self {
            state: PlaybackState::Idle,
            source: None,
            name: None,
            elapsed: Duration::ZERO,
            duration: None,
            looping: false,
            volume,
            error: None,
        }
    }

    /// Capability flags of the loaded source, if any.
    pub fn capabilities(&self) -> Option<Capabilities> {
        self.source.map(SourceKind::capabilities)
    }
}
