use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, warn};

use crate::error::ConversionError;

/// Handle to the external ffmpeg binary.
///
/// Constructed once at startup via [`Toolchain::detect`]; conversion calls
/// reuse the handle and never probe again.
#[derive(Debug, Clone)]
pub struct Toolchain {
    ffmpeg: PathBuf,
}

impl Toolchain {
    /// Check that `ffmpeg` exists and answers `-version`.
    pub fn detect(ffmpeg: &Path) -> Result<Self, ConversionError> {
        let probe = Command::new(ffmpeg)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match probe {
            Ok(status) if status.success() => {
                debug!(ffmpeg = %ffmpeg.display(), "conversion tool detected");
                Ok(Self {
                    ffmpeg: ffmpeg.to_path_buf(),
                })
            }
            Ok(status) => {
                warn!(ffmpeg = %ffmpeg.display(), ?status, "conversion tool probe failed");
                Err(ConversionError::ToolMissing)
            }
            Err(err) => {
                warn!(ffmpeg = %ffmpeg.display(), %err, "conversion tool not found");
                Err(ConversionError::ToolMissing)
            }
        }
    }

    /// Run ffmpeg with the given arguments and wait for it to finish.
    ///
    /// Banner and progress output are suppressed; stderr is kept for error
    /// reporting. A missing encoder is distinguished from plain I/O failure.
    pub(crate) fn run(&self, args: &[&OsStr]) -> Result<(), ConversionError> {
        let output = Command::new(&self.ffmpeg)
            .args(["-hide_banner", "-loglevel", "error"])
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| ConversionError::WriteFailed(format!("failed to launch ffmpeg: {e}")))?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if stderr.contains("Unknown encoder") {
            Err(ConversionError::UnsupportedFormat(stderr))
        } else {
            Err(ConversionError::WriteFailed(stderr))
        }
    }
}
