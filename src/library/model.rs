use std::env;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

/// Row id of a track in the library database.
pub type TrackId = i64;

/// A track known to the library.
#[derive(Debug, Clone)]
pub struct Track {
    pub id: TrackId,
    /// Normalized absolute path; the unique key of the row.
    pub path: PathBuf,
    pub title: String,
    /// Completed playback starts. Never decremented except by row removal.
    pub play_count: u64,
    /// Cached duration, probed from the file's tags when available.
    pub duration: Option<Duration>,
}

/// Normalize a path into the canonical absolute form used as library key.
///
/// Existing files are canonicalized (symlinks resolved). For paths that do
/// not exist yet the cleanup is lexical: made absolute against the current
/// directory, with `.` and `..` components folded away.
pub fn normalize_path(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }

    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir().unwrap_or_default().join(path)
    };

    let mut cleaned = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                cleaned.pop();
            }
            other => cleaned.push(other.as_os_str()),
        }
    }
    cleaned
}
