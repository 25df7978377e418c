use super::load::{default_config_path, resolve_config_path};
use super::schema::*;
use std::sync::{Mutex, OnceLock};

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK.get_or_init(|| Mutex::new(())).lock().unwrap()
}

struct EnvGuard {
    key: &'static str,
    old: Option<std::ffi::OsString>,
}

impl EnvGuard {
    fn set(key: &'static str, val: &str) -> Self {
        let old = std::env::var_os(key);
        unsafe {
            std::env::set_var(key, val);
        }
        Self { key, old }
    }

    fn remove(key: &'static str) -> Self {
        let old = std::env::var_os(key);
        unsafe {
            std::env::remove_var(key);
        }
        Self { key, old }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        match self.old.take() {
            Some(v) => unsafe {
                std::env::set_var(self.key, v);
            },
            None => unsafe {
                std::env::remove_var(self.key);
            },
        }
    }
}

#[test]
fn resolve_config_path_prefers_vivace_config_path() {
    let _lock = env_lock();
    let _g1 = EnvGuard::set("VIVACE_CONFIG_PATH", "/tmp/vivace-test-config.toml");
    assert_eq!(
        resolve_config_path().unwrap(),
        std::path::PathBuf::from("/tmp/vivace-test-config.toml")
    );
}

#[test]
fn default_config_path_prefers_xdg_config_home() {
    let _lock = env_lock();
    let _g1 = EnvGuard::set("XDG_CONFIG_HOME", "/tmp/xdg-config-home");
    let _g2 = EnvGuard::set("HOME", "/tmp/home-should-not-win");

    let p = default_config_path().unwrap();
    assert_eq!(
        p,
        std::path::PathBuf::from("/tmp/xdg-config-home")
            .join("vivace")
            .join("config.toml")
    );
}

#[test]
fn defaults_carry_the_builtin_stations() {
    let s = Settings::default();
    assert_eq!(s.stations.len(), 3);
    assert_eq!(s.stations[0].name, "KQED (NPR)");
    assert_eq!(s.stations[1].name, "BBC Radio 1");
    assert_eq!(s.stations[2].name, "NPR News");
    assert!(s.stations.iter().all(|st| st.url.starts_with("http")));
}

#[test]
fn settings_load_from_config_file_replaces_stations() {
    let _lock = env_lock();

    let dir = tempfile::tempdir().unwrap();
    let cfg_path = dir.path().join("config.toml");
    std::fs::write(
        &cfg_path,
        r#"
[audio]
initial_volume = 0.8

[tools]
ffmpeg_path = "/opt/ffmpeg/bin/ffmpeg"

[library]
db_path = "/tmp/vivace-test.db"
extensions = ["mp3"]
recursive = false
follow_links = false
max_depth = 2

[[stations]]
name = "Test FM"
url = "http://localhost:9999/stream"
description = "A stream for tests"
"#,
    )
    .unwrap();

    let _g1 = EnvGuard::set("VIVACE_CONFIG_PATH", cfg_path.to_str().unwrap());
    let _g2 = EnvGuard::remove("VIVACE__AUDIO__INITIAL_VOLUME");

    let s = Settings::load().unwrap();
    assert_eq!(s.audio.initial_volume, 0.8);
    assert_eq!(
        s.tools.ffmpeg_path,
        std::path::PathBuf::from("/opt/ffmpeg/bin/ffmpeg")
    );
    assert_eq!(s.library.db_path, std::path::PathBuf::from("/tmp/vivace-test.db"));
    assert_eq!(s.library.extensions, vec!["mp3".to_string()]);
    assert!(!s.library.recursive);
    assert!(!s.library.follow_links);
    assert_eq!(s.library.max_depth, Some(2));
    assert_eq!(s.stations.len(), 1);
    assert_eq!(s.stations[0].name, "Test FM");
    assert_eq!(s.stations[0].description, "A stream for tests");
}

#[test]
fn settings_env_overrides_config_file() {
    let _lock = env_lock();

    let dir = tempfile::tempdir().unwrap();
    let cfg_path = dir.path().join("config.toml");
    std::fs::write(
        &cfg_path,
        r#"
[audio]
initial_volume = 0.8
"#,
    )
    .unwrap();

    let _g1 = EnvGuard::set("VIVACE_CONFIG_PATH", cfg_path.to_str().unwrap());
    let _g2 = EnvGuard::set("VIVACE__AUDIO__INITIAL_VOLUME", "0.25");

    let s = Settings::load().unwrap();
    assert_eq!(s.audio.initial_volume, 0.25);
}

#[test]
fn validate_rejects_out_of_range_volume() {
    let mut s = Settings::default();
    s.audio.initial_volume = 1.5;
    assert!(s.validate().is_err());
    s.audio.initial_volume = 0.5;
    assert!(s.validate().is_ok());
}
