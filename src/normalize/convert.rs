use std::ffi::OsStr;
use std::fs;
use std::path::Path;
use std::time::Duration;

use lofty::prelude::AudioFile;
use tempfile::TempPath;
use tracing::debug;

use crate::error::ConversionError;

use super::tool::Toolchain;

/// The audio formats the player accepts as input and as save targets.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AudioFormat {
    Mp3,
    Wav,
    Ogg,
}

impl AudioFormat {
    /// Derive the format from a file extension, case-insensitive.
    pub fn from_path(path: &Path) -> Result<Self, ConversionError> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "mp3" => Ok(Self::Mp3),
            "wav" => Ok(Self::Wav),
            "ogg" => Ok(Self::Ogg),
            _ => Err(ConversionError::UnsupportedFormat(
                path.display().to_string(),
            )),
        }
    }

    /// The ffmpeg muxer name for this format.
    fn muxer(self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Wav => "wav",
            Self::Ogg => "ogg",
        }
    }
}

/// Decoded audio in the canonical form the playback device accepts.
///
/// Owns the scratch file; dropping the handle removes it. The original
/// input file is never touched.
#[derive(Debug)]
pub struct NormalizedAudio {
    scratch: TempPath,
    duration: Duration,
}

impl NormalizedAudio {
    pub(crate) fn new(scratch: TempPath, duration: Duration) -> Self {
        Self { scratch, duration }
    }

    pub fn path(&self) -> &Path {
        &self.scratch
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}

/// An in-memory slice of audio, encoded as RIFF/WAV bytes.
#[derive(Debug)]
pub struct AudioBuffer {
    wav: Vec<u8>,
}

impl AudioBuffer {
    pub(crate) fn from_wav_bytes(wav: Vec<u8>) -> Self {
        Self { wav }
    }

    pub fn as_wav_bytes(&self) -> &[u8] {
        &self.wav
    }
}

/// Converts arbitrary supported inputs into the canonical decodable form
/// and implements the trim/save editor on top of the same tool.
pub struct Normalizer {
    tool: Option<Toolchain>,
}

impl Normalizer {
    /// Wrap the startup tool detection result. `None` keeps the normalizer
    /// alive but makes every tool-dependent call fail with `ToolMissing`.
    pub fn new(tool: Option<Toolchain>) -> Self {
        Self { tool }
    }

    /// Whether the conversion tool was found at startup.
    pub fn available(&self) -> bool {
        self.tool.is_some()
    }

    fn tool(&self) -> Result<&Toolchain, ConversionError> {
        self.tool.as_ref().ok_or(ConversionError::ToolMissing)
    }

    /// Read the duration of a local audio file from its headers.
    pub fn probe_duration(input: &Path) -> Result<Duration, ConversionError> {
        let tagged = lofty::read_from_path(input).map_err(|e| {
            ConversionError::UnsupportedFormat(format!("{}: {e}", input.display()))
        })?;
        Ok(tagged.properties().duration())
    }

    /// Decode `input` into a canonical WAV scratch file ready for playback.
    ///
    /// Only the scratch location is written; the input file stays untouched.
    pub fn prepare_for_playback(&self, input: &Path) -> Result<NormalizedAudio, ConversionError> {
        AudioFormat::from_path(input)?;
        let duration = Self::probe_duration(input)?;
        let tool = self.tool()?;

        let scratch = scratch_wav_path()?;
        let args: Vec<&OsStr> = vec![
            OsStr::new("-y"),
            OsStr::new("-i"),
            input.as_os_str(),
            OsStr::new("-f"),
            OsStr::new("wav"),
            scratch.as_os_str(),
        ];
        tool.run(&args)?;

        debug!(input = %input.display(), secs = duration.as_secs_f64(), "normalized for playback");
        Ok(NormalizedAudio::new(scratch, duration))
    }

    /// Extract the exact `[start, end)` slice of `input` as a WAV buffer.
    ///
    /// Bounds must satisfy `0 <= start < end <= duration(input)`; no padding
    /// and no fades are applied.
    pub fn trim(
        &self,
        input: &Path,
        start_secs: f64,
        end_secs: f64,
    ) -> Result<AudioBuffer, ConversionError> {
        AudioFormat::from_path(input)?;
        let duration = Self::probe_duration(input)?.as_secs_f64();
        if !(start_secs >= 0.0 && start_secs < end_secs && end_secs <= duration) {
            return Err(ConversionError::InvalidRange {
                start: start_secs,
                end: end_secs,
            });
        }
        let tool = self.tool()?;

        let scratch = scratch_wav_path()?;
        let start = format!("{start_secs}");
        let end = format!("{end_secs}");
        let args: Vec<&OsStr> = vec![
            OsStr::new("-y"),
            OsStr::new("-i"),
            input.as_os_str(),
            OsStr::new("-ss"),
            start.as_ref(),
            OsStr::new("-to"),
            end.as_ref(),
            OsStr::new("-f"),
            OsStr::new("wav"),
            scratch.as_os_str(),
        ];
        tool.run(&args)?;

        let wav = fs::read(&scratch)
            .map_err(|e| ConversionError::WriteFailed(format!("reading trim output: {e}")))?;
        Ok(AudioBuffer::from_wav_bytes(wav))
    }

    /// Encode `buffer` as `format` at `output`.
    ///
    /// WAV targets are a plain byte write and work even without the tool;
    /// compressed targets go through the encoder.
    pub fn save(
        &self,
        buffer: &AudioBuffer,
        output: &Path,
        format: AudioFormat,
    ) -> Result<(), ConversionError> {
        if format == AudioFormat::Wav {
            return fs::write(output, buffer.as_wav_bytes())
                .map_err(|e| ConversionError::WriteFailed(format!("{}: {e}", output.display())));
        }

        let tool = self.tool()?;
        let staging = tempfile::Builder::new()
            .prefix("vivace-")
            .suffix(".wav")
            .tempfile()
            .map_err(|e| ConversionError::WriteFailed(format!("creating scratch file: {e}")))?;
        fs::write(staging.path(), buffer.as_wav_bytes())
            .map_err(|e| ConversionError::WriteFailed(format!("writing scratch file: {e}")))?;

        let args: Vec<&OsStr> = vec![
            OsStr::new("-y"),
            OsStr::new("-i"),
            staging.path().as_os_str(),
            OsStr::new("-f"),
            OsStr::new(format.muxer()),
            output.as_os_str(),
        ];
        tool.run(&args)?;
        debug!(output = %output.display(), ?format, "saved audio");
        Ok(())
    }
}

fn scratch_wav_path() -> Result<TempPath, ConversionError> {
    let file = tempfile::Builder::new()
        .prefix("vivace-")
        .suffix(".wav")
        .tempfile()
        .map_err(|e| ConversionError::WriteFailed(format!("creating scratch file: {e}")))?;
    Ok(file.into_temp_path())
}
