use std::path::PathBuf;

use serde::Deserialize;

/// Top-level application settings loaded from `config.toml`.
///
/// File format: TOML
/// Default path (Linux/XDG): `$XDG_CONFIG_HOME/vivace/config.toml` or `~/.config/vivace/config.toml`
///
/// Precedence (highest wins):
/// 1) Environment variables (prefix `VIVACE__`, `__` as nested separator)
/// 2) Config file (if present)
/// 3) Struct defaults
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub audio: AudioSettings,
    pub tools: ToolSettings,
    pub library: LibrarySettings,
    /// Radio stations offered to the user. Loaded once at startup,
    /// immutable afterwards and never persisted by the library.
    pub stations: Vec<Station>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            audio: AudioSettings::default(),
            tools: ToolSettings::default(),
            library: LibrarySettings::default(),
            stations: default_stations(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Volume applied when the player starts (0.0 - 1.0).
    pub initial_volume: f32,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            initial_volume: 0.5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    /// Path or name of the ffmpeg binary used for conversion and editing.
    pub ffmpeg_path: PathBuf,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LibrarySettings {
    /// Location of the SQLite library database.
    pub db_path: PathBuf,
    /// File extensions to treat as audio during imports (case-insensitive, without dot).
    pub extensions: Vec<String>,
    /// Whether to follow symlinks while importing a directory.
    pub follow_links: bool,
    /// Whether to recurse into subdirectories.
    pub recursive: bool,
    /// Optional cap on directory recursion depth.
    pub max_depth: Option<usize>,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("music_library.db"),
            extensions: vec!["mp3".into(), "wav".into(), "ogg".into()],
            follow_links: true,
            recursive: true,
            max_depth: None,
        }
    }
}

/// A radio station entry: static configuration, not a library row.
#[derive(Debug, Clone, Deserialize)]
pub struct Station {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub description: String,
}

pub fn default_stations() -> Vec<Station> {
    vec![
        Station {
            name: "KQED (NPR)".to_string(),
            url: "https://streams.kqed.org".to_string(),
            description: "Your public media source for news and cultural content. Stay informed with national and local news.".to_string(),
        },
        Station {
            name: "BBC Radio 1".to_string(),
            url: "http://stream.live.vc.bbcmedia.co.uk/bbc_radio_one".to_string(),
            description: "Playing the freshest new music and the biggest tracks from the hottest artists.".to_string(),
        },
        Station {
            name: "NPR News".to_string(),
            url: "https://npr-ice.streamguys1.com/nprlive-mp3".to_string(),
            description: "Listen to breaking news and top stories from NPR on demand.".to_string(),
        },
    ]
}
