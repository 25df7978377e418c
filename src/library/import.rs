use std::path::Path;
use std::time::Duration;

use lofty::prelude::{AudioFile, ItemKey, TaggedFileExt};
use tracing::debug;
use walkdir::WalkDir;

use crate::config::LibrarySettings;
use crate::error::LibraryError;

use super::store::Library;

/// Walk options for [`import_dir`], derived from the library settings.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub extensions: Vec<String>,
    pub follow_links: bool,
    pub recursive: bool,
    pub max_depth: Option<usize>,
}

impl From<&LibrarySettings> for ImportOptions {
    fn from(settings: &LibrarySettings) -> Self {
        Self {
            extensions: settings.extensions.clone(),
            follow_links: settings.follow_links,
            recursive: settings.recursive,
            max_depth: settings.max_depth,
        }
    }
}

fn is_audio_file(path: &Path, options: &ImportOptions) -> bool {
    let exts: Vec<String> = options
        .extensions
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect();

    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            exts.iter().any(|e| e == &ext)
        })
        .unwrap_or(false)
}

/// Probe a file for a display title and duration.
///
/// The tag title wins when present; otherwise the file stem stands in.
/// Files whose tags cannot be read still get a title, just no duration.
pub fn probe_file(path: &Path) -> (String, Option<Duration>) {
    let default_title = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("UNKNOWN")
        .to_string();

    let mut title = default_title;
    let mut duration: Option<Duration> = None;

    if let Ok(tagged) = lofty::read_from_path(path) {
        duration = Some(tagged.properties().duration());

        if let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) {
            if let Some(v) = tag.get_string(ItemKey::TrackTitle) {
                if !v.trim().is_empty() {
                    title = v.to_string();
                }
            }
        }
    }

    (title, duration)
}

/// Walk `dir` and register every supported audio file in the library.
///
/// Existing rows keep their play counts (`add_or_update` semantics). Returns
/// the number of files registered or refreshed.
pub fn import_dir(
    library: &Library,
    dir: &Path,
    options: &ImportOptions,
) -> Result<usize, LibraryError> {
    let mut walker = WalkDir::new(dir).follow_links(options.follow_links);

    // Non-recursive = only the root directory.
    let depth_cap = if options.recursive {
        options.max_depth
    } else {
        Some(1)
    };
    if let Some(d) = depth_cap {
        walker = walker.max_depth(d);
    }

    let mut imported = 0usize;
    for entry in walker.into_iter().filter_map(Result::ok) {
        let path = entry.path();
        if path.is_file() && is_audio_file(path, options) {
            let (title, duration) = probe_file(path);
            let id = library.add_or_update(path, &title)?;
            if let Some(d) = duration {
                library.cache_duration(id, d)?;
            }
            debug!(path = %path.display(), title, "imported track");
            imported += 1;
        }
    }

    Ok(imported)
}
