use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source};

use crate::error::PlayerError;
use crate::radio::StreamReader;

/// Playback device primitives behind the engine.
///
/// The production implementation drives a rodio sink; tests substitute a
/// recording fake so the state machine runs without an audio device.
pub(crate) trait Backend: Send {
    /// Start (or restart) output of a decoded local file at `position`.
    fn play_file(&mut self, path: &Path, position: Duration, volume: f32)
        -> Result<(), PlayerError>;
    /// Start output of a live stream. The reader is consumed by the device.
    fn play_stream(&mut self, reader: StreamReader, volume: f32) -> Result<(), PlayerError>;
    fn pause(&mut self);
    fn resume(&mut self);
    fn stop(&mut self);
    fn set_volume(&mut self, volume: f32);
    /// Whether the device has run out of audio to play.
    fn finished(&self) -> bool;
}

pub(crate) struct RodioBackend {
    stream: OutputStream,
    sink: Option<Sink>,
}

impl RodioBackend {
    pub(crate) fn open() -> Result<Self, PlayerError> {
        let mut stream = OutputStreamBuilder::open_default_stream()
            .map_err(|e| PlayerError::Device(e.to_string()))?;
        // rodio logs to stderr when OutputStream is dropped. That's useful in
        // debugging, but noisy for an interactive app.
        stream.log_on_drop(false);
        Ok(Self { stream, sink: None })
    }

    fn swap_sink(&mut self, sink: Sink) {
        if let Some(old) = self.sink.take() {
            old.stop();
        }
        self.sink = Some(sink);
    }
}

impl Backend for RodioBackend {
    fn play_file(
        &mut self,
        path: &Path,
        position: Duration,
        volume: f32,
    ) -> Result<(), PlayerError> {
        let file = File::open(path)
            .map_err(|e| PlayerError::Device(format!("{}: {e}", path.display())))?;
        // `skip_duration` is the seeking primitive; Duration::ZERO is fine.
        let source = Decoder::new(BufReader::new(file))
            .map_err(|e| PlayerError::Device(e.to_string()))?
            .skip_duration(position);

        let sink = Sink::connect_new(self.stream.mixer());
        sink.set_volume(volume);
        sink.append(source);
        sink.play();
        self.swap_sink(sink);
        Ok(())
    }

    fn play_stream(&mut self, reader: StreamReader, volume: f32) -> Result<(), PlayerError> {
        let source = Decoder::new(reader).map_err(|e| PlayerError::Device(e.to_string()))?;

        let sink = Sink::connect_new(self.stream.mixer());
        sink.set_volume(volume);
        sink.append(source);
        sink.play();
        self.swap_sink(sink);
        Ok(())
    }

    fn pause(&mut self) {
        if let Some(sink) = &self.sink {
            sink.pause();
        }
    }

    fn resume(&mut self) {
        if let Some(sink) = &self.sink {
            sink.play();
        }
    }

    fn stop(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
    }

    fn set_volume(&mut self, volume: f32) {
        if let Some(sink) = &self.sink {
            sink.set_volume(volume);
        }
    }

    fn finished(&self) -> bool {
        self.sink.as_ref().map_or(true, Sink::empty)
    }
}
