use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::{ConnectionError, PlayerError};
use crate::normalize::{NormalizedAudio, Normalizer};
use crate::radio::{self, RadioStream};

use super::backend::{Backend, RodioBackend};
use super::types::{PlaybackState, SessionSnapshot, Source, SourceKind};

/// Engine poll interval for elapsed-time publishing and end-of-track checks.
const TICK: Duration = Duration::from_millis(200);

/// Called exactly once per completed start of a local file, with the path
/// that was asked for. Loop restarts and pause/resume never re-fire it.
pub type StartedCallback = Box<dyn FnMut(&Path) + Send>;

/// Prepares a source off the engine thread. Production normalizes files and
/// dials stations; tests substitute controllable fakes.
pub(crate) type Loader = Arc<dyn Fn(&Source) -> Result<LoadedSource, PlayerError> + Send + Sync>;

/// A source a load worker finished preparing.
pub(crate) enum LoadedSource {
    Local {
        path: PathBuf,
        audio: NormalizedAudio,
    },
    Radio {
        stream: RadioStream,
    },
}

type Reply = Sender<Result<(), PlayerError>>;

enum EngineCmd {
    Load(Source),
    Pause(Reply),
    Resume(Reply),
    Stop(Reply),
    Seek(f64, Reply),
    SetVolume(f32, Reply),
    SetLoop(bool, Reply),
    /// Completion posted by a load worker. Stale generations are discarded.
    Loaded {
        generation: u64,
        outcome: Result<LoadedSource, PlayerError>,
    },
    Quit,
}

/// The playback engine.
///
/// A dedicated engine thread owns the single session; transport commands
/// and asynchronous load completions arrive as messages on one channel, so
/// every visible transition is serialized. Callers observe the session
/// through [`Player::snapshot`], a read-only view written only by the
/// engine thread.
pub struct Player {
    tx: Sender<EngineCmd>,
    snapshot: Arc<Mutex<SessionSnapshot>>,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl Player {
    /// Open the default audio device and start the engine.
    pub fn new(
        normalizer: Arc<Normalizer>,
        initial_volume: f32,
        on_track_started: StartedCallback,
    ) -> Result<Self, PlayerError> {
        let backend = Box::new(RodioBackend::open()?);
        let loader: Loader = Arc::new(move |source| match source {
            Source::LocalFile(path) => {
                let audio = normalizer.prepare_for_playback(path)?;
                Ok(LoadedSource::Local {
                    path: path.clone(),
                    audio,
                })
            }
            Source::RadioStream(station) => {
                let stream = radio::connect(station)?;
                Ok(LoadedSource::Radio { stream })
            }
        });
        Ok(Self::with_parts(backend, loader, initial_volume, on_track_started))
    }

    pub(crate) fn with_parts(
        backend: Box<dyn Backend>,
        loader: Loader,
        initial_volume: f32,
        on_started: StartedCallback,
    ) -> Self {
        let volume = initial_volume.clamp(0.0, 1.0);
        let (tx, rx) = mpsc::channel();
        let snapshot = Arc::new(Mutex::new(SessionSnapshot::idle(volume)));

        let engine = Engine {
            backend,
            loader,
            rx,
            tx: tx.clone(),
            snapshot: snapshot.clone(),
            on_started,
            session: None,
            generation: 0,
            volume,
        };
        let join = thread::spawn(move || engine.run());

        Self {
            tx,
            snapshot,
            join: Mutex::new(Some(join)),
        }
    }

    /// Replace the session with a new source.
    ///
    /// Returns as soon as the engine accepted the command; the session goes
    /// through `Loading` and resolves to `Playing` or `Error` asynchronously.
    pub fn load(&self, source: Source) -> Result<(), PlayerError> {
        self.tx
            .send(EngineCmd::Load(source))
            .map_err(|_| PlayerError::Disconnected)
    }

    pub fn pause(&self) -> Result<(), PlayerError> {
        self.call(EngineCmd::Pause)
    }

    pub fn resume(&self) -> Result<(), PlayerError> {
        self.call(EngineCmd::Resume)
    }

    pub fn stop(&self) -> Result<(), PlayerError> {
        self.call(EngineCmd::Stop)
    }

    /// Reposition a local file, clamped to `[0, duration]`.
    pub fn seek(&self, seconds: f64) -> Result<(), PlayerError> {
        self.call(|reply| EngineCmd::Seek(seconds, reply))
    }

    /// Set the output volume, clamped to `[0.0, 1.0]`. Takes effect
    /// immediately in any non-`Error` state, playing or paused.
    pub fn set_volume(&self, volume: f32) -> Result<(), PlayerError> {
        self.call(|reply| EngineCmd::SetVolume(volume, reply))
    }

    pub fn set_loop(&self, looping: bool) -> Result<(), PlayerError> {
        self.call(|reply| EngineCmd::SetLoop(looping, reply))
    }

    /// Read-only view of the current session.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.lock().unwrap().clone()
    }

    /// Stop the device and shut the engine thread down.
    pub fn shutdown(&self) {
        let _ = self.tx.send(EngineCmd::Quit);
        if let Ok(mut join) = self.join.lock() {
            if let Some(handle) = join.take() {
                let _ = handle.join();
            }
        }
    }

    fn call(&self, build: impl FnOnce(Reply) -> EngineCmd) -> Result<(), PlayerError> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.tx
            .send(build(reply_tx))
            .map_err(|_| PlayerError::Disconnected)?;
        reply_rx.recv().map_err(|_| PlayerError::Disconnected)?
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Mutable session state, owned by the engine thread alone.
struct Session {
    kind: SourceKind,
    name: String,
    state: PlaybackState,
    /// Keeps the decoded scratch file alive for seeks and loop restarts.
    audio: Option<NormalizedAudio>,
    duration: Option<Duration>,
    started_at: Option<Instant>,
    accumulated: Duration,
    looping: bool,
    error: Option<PlayerError>,
}

impl Session {
    fn loading(source: &Source) -> Self {
        let (kind, name) = match source {
            Source::LocalFile(path) => (
                SourceKind::LocalFile,
                path.file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("UNKNOWN")
                    .to_string(),
            ),
            Source::RadioStream(station) => (SourceKind::RadioStream, station.name.clone()),
        };
        Self {
            kind,
            name,
            state: PlaybackState::Loading,
            audio: None,
            duration: None,
            started_at: None,
            accumulated: Duration::ZERO,
            looping: false,
            error: None,
        }
    }

    fn elapsed(&self) -> Duration {
        let raw = self.accumulated + self.started_at.map_or(Duration::ZERO, |at| at.elapsed());
        match self.duration {
            Some(total) => raw.min(total),
            None => raw,
        }
    }
}

struct Engine {
    backend: Box<dyn Backend>,
    loader: Loader,
    rx: Receiver<EngineCmd>,
    tx: Sender<EngineCmd>,
    snapshot: Arc<Mutex<SessionSnapshot>>,
    on_started: StartedCallback,
    session: Option<Session>,
    /// Load generation token; bumping it invalidates in-flight loads.
    generation: u64,
    volume: f32,
}

impl Engine {
    fn run(mut self) {
        loop {
            // The snapshot is re-published before a reply goes out, so a
            // caller that saw a command return also sees its post-state.
            match self.rx.recv_timeout(TICK) {
                Ok(EngineCmd::Load(source)) => self.handle_load(source),
                Ok(EngineCmd::Pause(reply)) => {
                    let result = self.handle_pause();
                    self.publish();
                    let _ = reply.send(result);
                }
                Ok(EngineCmd::Resume(reply)) => {
                    let result = self.handle_resume();
                    self.publish();
                    let _ = reply.send(result);
                }
                Ok(EngineCmd::Stop(reply)) => {
                    let result = self.handle_stop();
                    self.publish();
                    let _ = reply.send(result);
                }
                Ok(EngineCmd::Seek(seconds, reply)) => {
                    let result = self.handle_seek(seconds);
                    self.publish();
                    let _ = reply.send(result);
                }
                Ok(EngineCmd::SetVolume(volume, reply)) => {
                    let result = self.handle_set_volume(volume);
                    self.publish();
                    let _ = reply.send(result);
                }
                Ok(EngineCmd::SetLoop(looping, reply)) => {
                    let result = self.handle_set_loop(looping);
                    self.publish();
                    let _ = reply.send(result);
                }
                Ok(EngineCmd::Loaded {
                    generation,
                    outcome,
                }) => self.handle_loaded(generation, outcome),
                Ok(EngineCmd::Quit) | Err(RecvTimeoutError::Disconnected) => {
                    self.backend.stop();
                    break;
                }
                Err(RecvTimeoutError::Timeout) => self.tick(),
            }
            self.publish();
        }
    }

    fn handle_load(&mut self, source: Source) {
        // Replacing a session stops the device first.
        self.backend.stop();
        self.generation += 1;
        let generation = self.generation;
        self.session = Some(Session::loading(&source));
        debug!(generation, kind = ?source.kind(), "loading new source");

        let loader = self.loader.clone();
        let tx = self.tx.clone();
        thread::spawn(move || {
            let outcome = loader(&source);
            // The engine may already be gone; a dead channel is fine.
            let _ = tx.send(EngineCmd::Loaded {
                generation,
                outcome,
            });
        });
    }

    fn handle_loaded(&mut self, generation: u64, outcome: Result<LoadedSource, PlayerError>) {
        if generation != self.generation {
            // A stop() or newer load() superseded this one; dropping the
            // payload also releases its scratch file or stream.
            debug!(stale = generation, current = self.generation, "discarding stale load result");
            return;
        }
        let Some(mut session) = self.session.take() else {
            return;
        };
        if session.state != PlaybackState::Loading {
            self.session = Some(session);
            return;
        }

        match outcome {
            Ok(LoadedSource::Local { path, audio }) => {
                match self.backend.play_file(audio.path(), Duration::ZERO, self.volume) {
                    Ok(()) => {
                        session.duration = Some(audio.duration());
                        session.audio = Some(audio);
                        session.state = PlaybackState::Playing;
                        session.started_at = Some(Instant::now());
                        session.accumulated = Duration::ZERO;
                        debug!(path = %path.display(), "playback started");
                        (self.on_started)(&path);
                    }
                    Err(err) => {
                        warn!(%err, "device rejected the normalized audio");
                        session.state = PlaybackState::Error;
                        session.error = Some(err);
                    }
                }
            }
            Ok(LoadedSource::Radio { stream }) => {
                debug!(station = stream.station(), "stream connected");
                match self.backend.play_stream(stream.into_reader(), self.volume) {
                    Ok(()) => {
                        session.state = PlaybackState::Playing;
                        debug!(station = %session.name, "streaming started");
                    }
                    Err(err) => {
                        warn!(%err, "device rejected the stream");
                        session.state = PlaybackState::Error;
                        session.error = Some(err);
                    }
                }
            }
            Err(err) => {
                warn!(%err, "load failed");
                session.state = PlaybackState::Error;
                session.error = Some(err);
            }
        }
        self.session = Some(session);
    }

    fn handle_pause(&mut self) -> Result<(), PlayerError> {
        let Some(session) = self.session.as_mut() else {
            return Err(PlayerError::NoSession);
        };
        if !session.kind.capabilities().supports_pause {
            return Err(PlayerError::OperationNotSupported);
        }
        if session.state != PlaybackState::Playing {
            return Ok(());
        }
        self.backend.pause();
        if let Some(at) = session.started_at.take() {
            session.accumulated += at.elapsed();
        }
        session.state = PlaybackState::Paused;
        Ok(())
    }

    fn handle_resume(&mut self) -> Result<(), PlayerError> {
        let Some(session) = self.session.as_mut() else {
            return Err(PlayerError::NoSession);
        };
        if !session.kind.capabilities().supports_pause {
            return Err(PlayerError::OperationNotSupported);
        }
        if session.state != PlaybackState::Paused {
            return Ok(());
        }
        self.backend.resume();
        session.started_at = Some(Instant::now());
        session.state = PlaybackState::Playing;
        Ok(())
    }

    fn handle_stop(&mut self) -> Result<(), PlayerError> {
        let Some(session) = self.session.as_mut() else {
            return Err(PlayerError::NoSession);
        };
        if session.state == PlaybackState::Loading {
            // Invalidate the in-flight load; its completion must not
            // resurrect this session.
            self.generation += 1;
        }
        self.backend.stop();
        session.state = PlaybackState::Stopped;
        session.started_at = None;
        session.accumulated = Duration::ZERO;
        session.error = None;
        Ok(())
    }

    fn handle_seek(&mut self, seconds: f64) -> Result<(), PlayerError> {
        let Some(session) = self.session.as_mut() else {
            return Err(PlayerError::NoSession);
        };
        if !session.kind.capabilities().supports_seek {
            return Err(PlayerError::OperationNotSupported);
        }
        if !matches!(session.state, PlaybackState::Playing | PlaybackState::Paused) {
            return Err(PlayerError::NoSession);
        }
        let (Some(audio), Some(total)) = (session.audio.as_ref(), session.duration) else {
            return Err(PlayerError::NoSession);
        };

        let target = Duration::from_secs_f64(seconds.max(0.0)).min(total);
        let scratch = audio.path().to_path_buf();
        let was_paused = session.state == PlaybackState::Paused;
        match self.backend.play_file(&scratch, target, self.volume) {
            Ok(()) => {
                if was_paused {
                    self.backend.pause();
                    session.started_at = None;
                } else {
                    session.started_at = Some(Instant::now());
                }
                session.accumulated = target;
                Ok(())
            }
            Err(err) => {
                session.state = PlaybackState::Error;
                session.error = Some(err.clone());
                Err(err)
            }
        }
    }

    fn handle_set_volume(&mut self, volume: f32) -> Result<(), PlayerError> {
        if let Some(session) = self.session.as_ref() {
            if session.state == PlaybackState::Error {
                return Err(PlayerError::OperationNotSupported);
            }
        }
        self.volume = volume.clamp(0.0, 1.0);
        self.backend.set_volume(self.volume);
        Ok(())
    }

    fn handle_set_loop(&mut self, looping: bool) -> Result<(), PlayerError> {
        let Some(session) = self.session.as_mut() else {
            return Err(PlayerError::NoSession);
        };
        if !session.kind.capabilities().supports_loop {
            return Err(PlayerError::OperationNotSupported);
        }
        session.looping = looping;
        Ok(())
    }

    /// Periodic end-of-track check, driven by the receive timeout.
    fn tick(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.state != PlaybackState::Playing || !self.backend.finished() {
            return;
        }

        match session.kind {
            SourceKind::LocalFile if session.looping => {
                // Natural end with loop on: restart at zero. Not a new
                // start, so the started callback stays quiet.
                let Some(scratch) = session.audio.as_ref().map(|a| a.path().to_path_buf()) else {
                    return;
                };
                match self.backend.play_file(&scratch, Duration::ZERO, self.volume) {
                    Ok(()) => {
                        session.accumulated = Duration::ZERO;
                        session.started_at = Some(Instant::now());
                    }
                    Err(err) => {
                        warn!(%err, "loop restart failed");
                        session.state = PlaybackState::Error;
                        session.error = Some(err);
                        session.started_at = None;
                    }
                }
            }
            SourceKind::LocalFile => {
                session.state = PlaybackState::Stopped;
                session.started_at = None;
                session.accumulated = Duration::ZERO;
            }
            SourceKind::RadioStream => {
                // The server closed the stream. Not user-initiated, so the
                // session lands in Error rather than Stopped.
                warn!(station = %session.name, "radio stream ended unexpectedly");
                session.state = PlaybackState::Error;
                session.error = Some(PlayerError::Connect(ConnectionError::StreamEnded));
                session.started_at = None;
            }
        }
    }

    fn publish(&mut self) {
        let snapshot = match &self.session {
            None => SessionSnapshot::idle(self.volume),
            Some(session) => SessionSnapshot {
                state: session.state,
                source: Some(session.kind),
                name: Some(session.name.clone()),
                elapsed: session.elapsed(),
                duration: session.duration,
                looping: session.looping,
                volume: self.volume,
                error: session.error.clone(),
            },
        };
        *self.snapshot.lock().unwrap() = snapshot;
    }
}
