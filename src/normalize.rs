//! Format normalization and trim/save editing.
//!
//! Every local file goes through here before it reaches the audio device:
//! the normalizer shells out to ffmpeg to decode any supported input into a
//! canonical RIFF/WAV scratch file, and the same tool backs the trim and
//! save operations. The tool is probed exactly once at startup; calls made
//! without it report `ConversionError::ToolMissing` instead of re-checking.

mod convert;
mod tool;

pub use convert::{AudioBuffer, AudioFormat, NormalizedAudio, Normalizer};
pub use tool::Toolchain;
