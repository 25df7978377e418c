use std::fs;
use std::path::Path;
use std::time::Duration;

use tempfile::tempdir;

use crate::config::LibrarySettings;
use crate::error::LibraryError;

use super::import::{import_dir, ImportOptions};
use super::model::normalize_path;
use super::store::Library;

#[test]
fn add_or_update_is_idempotent_per_path() {
    let lib = Library::open_in_memory().unwrap();

    let id1 = lib.add_or_update(Path::new("/music/a.mp3"), "A").unwrap();
    let id2 = lib.add_or_update(Path::new("/music/a.mp3"), "A").unwrap();
    let id3 = lib.add_or_update(Path::new("/music/a.mp3"), "A again").unwrap();

    assert_eq!(id1, id2);
    assert_eq!(id1, id3);

    let all = lib.list_all().unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].title, "A again");
    assert_eq!(all[0].play_count, 0);
}

#[test]
fn re_adding_keeps_the_play_count() {
    let lib = Library::open_in_memory().unwrap();
    let id = lib.add_or_update(Path::new("/music/a.mp3"), "A").unwrap();
    lib.record_play(id).unwrap();
    lib.record_play(id).unwrap();

    lib.add_or_update(Path::new("/music/a.mp3"), "Renamed").unwrap();
    let track = lib.get(id).unwrap();
    assert_eq!(track.title, "Renamed");
    assert_eq!(track.play_count, 2);
}

#[test]
fn record_play_increments_by_exactly_one() {
    let lib = Library::open_in_memory().unwrap();
    let id = lib.add_or_update(Path::new("/music/a.mp3"), "A").unwrap();

    for _ in 0..5 {
        lib.record_play(id).unwrap();
    }
    assert_eq!(lib.get(id).unwrap().play_count, 5);
}

#[test]
fn operations_on_unknown_ids_report_not_found() {
    let lib = Library::open_in_memory().unwrap();

    assert!(matches!(lib.record_play(42), Err(LibraryError::NotFound)));
    assert!(matches!(lib.remove(42), Err(LibraryError::NotFound)));
    assert!(matches!(lib.get(42), Err(LibraryError::NotFound)));
    assert!(matches!(
        lib.cache_duration(42, Duration::from_secs(1)),
        Err(LibraryError::NotFound)
    ));
    assert!(matches!(
        lib.record_play_by_path(Path::new("/nowhere.mp3")),
        Err(LibraryError::NotFound)
    ));
}

#[test]
fn remove_deletes_the_row_for_good() {
    let lib = Library::open_in_memory().unwrap();
    let id = lib.add_or_update(Path::new("/music/a.mp3"), "A").unwrap();
    lib.remove(id).unwrap();

    assert!(lib.list_all().unwrap().is_empty());
    assert!(matches!(lib.get(id), Err(LibraryError::NotFound)));
}

#[test]
fn list_all_keeps_insertion_order() {
    let lib = Library::open_in_memory().unwrap();
    lib.add_or_update(Path::new("/music/z.mp3"), "Zebra").unwrap();
    lib.add_or_update(Path::new("/music/a.mp3"), "Aardvark").unwrap();
    lib.add_or_update(Path::new("/music/m.mp3"), "Meerkat").unwrap();

    let titles: Vec<String> = lib.list_all().unwrap().into_iter().map(|t| t.title).collect();
    assert_eq!(titles, vec!["Zebra", "Aardvark", "Meerkat"]);
}

#[test]
fn find_matches_title_and_path_case_insensitive() {
    let lib = Library::open_in_memory().unwrap();
    lib.add_or_update(Path::new("/music/morning.mp3"), "Sunrise Song").unwrap();
    lib.add_or_update(Path::new("/music/evening.mp3"), "Dusk").unwrap();

    let by_title = lib.find("SUNRISE").unwrap();
    assert_eq!(by_title.len(), 1);
    assert_eq!(by_title[0].title, "Sunrise Song");

    let by_path = lib.find("Evening").unwrap();
    assert_eq!(by_path.len(), 1);
    assert_eq!(by_path[0].title, "Dusk");

    assert!(lib.find("nothing-here").unwrap().is_empty());
}

#[test]
fn cache_duration_round_trips() {
    let lib = Library::open_in_memory().unwrap();
    let id = lib.add_or_update(Path::new("/music/a.mp3"), "A").unwrap();
    lib.cache_duration(id, Duration::from_secs_f64(12.5)).unwrap();

    let track = lib.get(id).unwrap();
    assert_eq!(track.duration, Some(Duration::from_secs_f64(12.5)));
}

#[test]
fn normalize_path_folds_dot_components() {
    let p = normalize_path(Path::new("/music/./sub/../a.mp3"));
    assert_eq!(p, Path::new("/music/a.mp3"));
}

#[test]
fn import_dir_registers_audio_files_only() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("b.MP3"), b"not a real mp3").unwrap();
    fs::write(dir.path().join("a.ogg"), b"not a real ogg").unwrap();
    fs::write(dir.path().join("c.txt"), b"ignore me").unwrap();

    let lib = Library::open_in_memory().unwrap();
    let options = ImportOptions::from(&LibrarySettings::default());
    let imported = import_dir(&lib, dir.path(), &options).unwrap();

    assert_eq!(imported, 2);
    let mut titles: Vec<String> = lib.list_all().unwrap().into_iter().map(|t| t.title).collect();
    titles.sort();
    assert_eq!(titles, vec!["a", "b"]);
}

#[test]
fn import_dir_respects_recursive_false() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("root.mp3"), b"not real").unwrap();
    let sub = dir.path().join("sub");
    fs::create_dir_all(&sub).unwrap();
    fs::write(sub.join("child.mp3"), b"not real").unwrap();

    let lib = Library::open_in_memory().unwrap();
    let options = ImportOptions {
        recursive: false,
        ..ImportOptions::from(&LibrarySettings::default())
    };
    let imported = import_dir(&lib, dir.path(), &options).unwrap();

    assert_eq!(imported, 1);
    let all = lib.list_all().unwrap();
    assert_eq!(all[0].title, "root");
}

#[test]
fn import_dir_twice_does_not_duplicate_rows() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.mp3"), b"not real").unwrap();

    let lib = Library::open_in_memory().unwrap();
    let options = ImportOptions::from(&LibrarySettings::default());
    import_dir(&lib, dir.path(), &options).unwrap();
    import_dir(&lib, dir.path(), &options).unwrap();

    assert_eq!(lib.list_all().unwrap().len(), 1);
}
