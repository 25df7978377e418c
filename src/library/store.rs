use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use crate::error::LibraryError;

use super::model::{normalize_path, Track, TrackId};

/// SQLite-backed track catalog.
///
/// The connection sits behind a mutex so the store can be shared between the
/// foreground command path and the playback engine's play-count callback.
/// Every mutation is a single statement, so each call is atomic on its own.
pub struct Library {
    conn: Mutex<Connection>,
}

impl Library {
    /// Open (or create) the library database at `path`.
    pub fn open(path: &Path) -> Result<Self, LibraryError> {
        let conn = Connection::open(path)?;
        debug!(path = %path.display(), "opened library database");
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open a transient in-memory library. Used by tests and dry runs.
    pub fn open_in_memory() -> Result<Self, LibraryError> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> Result<(), LibraryError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS tracks (
                id INTEGER PRIMARY KEY,
                path TEXT NOT NULL UNIQUE,
                title TEXT NOT NULL,
                play_count INTEGER NOT NULL DEFAULT 0,
                duration_secs REAL
            )",
            [],
        )?;
        Ok(())
    }

    /// Insert a track or update the title of an existing row with the same
    /// normalized path. The play count of an existing row is left untouched,
    /// so repeated identical calls are idempotent.
    pub fn add_or_update(&self, path: &Path, title: &str) -> Result<TrackId, LibraryError> {
        let key = normalize_path(path);
        let key = key.to_string_lossy();
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO tracks (path, title) VALUES (?1, ?2)
             ON CONFLICT(path) DO UPDATE SET title = excluded.title",
            params![key, title],
        )?;
        let id = conn.query_row(
            "SELECT id FROM tracks WHERE path = ?1",
            params![key],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    /// Permanently delete a row and all state derived from it.
    pub fn remove(&self, id: TrackId) -> Result<(), LibraryError> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute("DELETE FROM tracks WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(LibraryError::NotFound);
        }
        Ok(())
    }

    /// Increment the play count by exactly one.
    pub fn record_play(&self, id: TrackId) -> Result<(), LibraryError> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE tracks SET play_count = play_count + 1 WHERE id = ?1",
            params![id],
        )?;
        if changed == 0 {
            return Err(LibraryError::NotFound);
        }
        Ok(())
    }

    /// Increment the play count of the row keyed by `path`.
    ///
    /// Convenience entry point for the playback engine's started callback,
    /// which only knows the file it loaded.
    pub fn record_play_by_path(&self, path: &Path) -> Result<(), LibraryError> {
        let key = normalize_path(path);
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE tracks SET play_count = play_count + 1 WHERE path = ?1",
            params![key.to_string_lossy()],
        )?;
        if changed == 0 {
            return Err(LibraryError::NotFound);
        }
        Ok(())
    }

    /// Cache the probed duration for a row.
    pub fn cache_duration(&self, id: TrackId, duration: Duration) -> Result<(), LibraryError> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE tracks SET duration_secs = ?2 WHERE id = ?1",
            params![id, duration.as_secs_f64()],
        )?;
        if changed == 0 {
            return Err(LibraryError::NotFound);
        }
        Ok(())
    }

    /// All tracks in insertion (rowid) order. Ordering beyond that is the
    /// ranker's job.
    pub fn list_all(&self) -> Result<Vec<Track>, LibraryError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, path, title, play_count, duration_secs FROM tracks ORDER BY id",
        )?;
        let rows = stmt.query_map([], row_to_track)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Case-insensitive containment filter over title and path.
    pub fn find(&self, query: &str) -> Result<Vec<Track>, LibraryError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, path, title, play_count, duration_secs FROM tracks
             WHERE instr(lower(title), lower(?1)) > 0
                OR instr(lower(path), lower(?1)) > 0
             ORDER BY id",
        )?;
        let rows = stmt.query_map(params![query], row_to_track)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Fetch a single row by id.
    pub fn get(&self, id: TrackId) -> Result<Track, LibraryError> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, path, title, play_count, duration_secs FROM tracks WHERE id = ?1",
            params![id],
            row_to_track,
        )
        .optional()?
        .ok_or(LibraryError::NotFound)
    }

    /// Fetch a single row by normalized path.
    pub fn find_by_path(&self, path: &Path) -> Result<Track, LibraryError> {
        let key = normalize_path(path);
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, path, title, play_count, duration_secs FROM tracks WHERE path = ?1",
            params![key.to_string_lossy()],
            row_to_track,
        )
        .optional()?
        .ok_or(LibraryError::NotFound)
    }
}

fn row_to_track(row: &Row<'_>) -> rusqlite::Result<Track> {
    let path: String = row.get(1)?;
    let play_count: i64 = row.get(3)?;
    let duration_secs: Option<f64> = row.get(4)?;
    Ok(Track {
        id: row.get(0)?,
        path: path.into(),
        title: row.get(2)?,
        play_count: play_count.max(0) as u64,
        duration: duration_secs.map(Duration::from_secs_f64),
    })
}
