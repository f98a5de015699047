//! SQLite-backed song store.

use super::models::{RatingChange, Song};
use super::schema::{SONG_COLUMNS, SONG_VERSIONED_SCHEMAS};
use super::trait_def::{SongStore, StoreError, StoreResult};
use super::validation::{validate_rating, validate_song};
use crate::sqlite_persistence::BASE_DB_VERSION;
use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

const ORDER_BY_RATING: &str = "ORDER BY rating IS NULL, rating DESC, title ASC";

#[derive(Clone)]
pub struct SqliteSongStore {
    read_pool: Vec<Arc<Mutex<Connection>>>,
    write_conn: Arc<Mutex<Connection>>,
    read_index: Arc<AtomicUsize>,
}

/// Creates the schema in an empty database, otherwise checks that the
/// database carries the current schema version and layout.
fn bootstrap_schema(conn: &Connection) -> Result<()> {
    let db_version: i64 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;

    let latest_version = SONG_VERSIONED_SCHEMAS.len();
    let latest_schema = &SONG_VERSIONED_SCHEMAS[latest_version - 1];

    let table_count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |r| r.get(0),
    )?;

    if table_count == 0 {
        info!("Creating song db schema at version {}", latest_version);
        return latest_schema.create(conn);
    }

    let expected_version = (BASE_DB_VERSION + latest_version) as i64;
    if db_version != expected_version {
        bail!(
            "Song database has schema version {}, expected {}",
            db_version,
            expected_version
        );
    }

    latest_schema
        .validate(conn)
        .context("Song database schema validation failed")
}

fn song_from_row(row: &Row) -> rusqlite::Result<Song> {
    Ok(Song {
        song_id: row.get("song_id")?,
        title: row.get("title")?,
        rating: row.get("rating")?,
        danceability: row.get("danceability")?,
        energy: row.get("energy")?,
        acousticness: row.get("acousticness")?,
        tempo: row.get("tempo")?,
        duration_ms: row.get("duration_ms")?,
        num_sections: row.get("num_sections")?,
        num_segments: row.get("num_segments")?,
        key: row.get("key")?,
        loudness: row.get("loudness")?,
        mode: row.get("mode")?,
        time_signature: row.get("time_signature")?,
        num_bars: row.get("num_bars")?,
        song_class: row.get("song_class")?,
        instrumentalness: row.get("instrumentalness")?,
        liveness: row.get("liveness")?,
        valence: row.get("valence")?,
    })
}

/// Escapes LIKE wildcards so that the term matches literally.
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

impl SqliteSongStore {
    /// Opens (creating if needed) the song database at `db_path`.
    ///
    /// `read_pool_size` read-only connections are opened next to the single
    /// write connection.
    pub fn new<P: AsRef<Path>>(db_path: P, read_pool_size: usize) -> Result<Self> {
        let db_path_ref = db_path.as_ref();

        let write_conn = Connection::open_with_flags(
            db_path_ref,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI
                | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("Failed to open song database {:?}", db_path_ref))?;

        write_conn.pragma_update(None, "journal_mode", "WAL")?;
        bootstrap_schema(&write_conn)?;

        let song_count: i64 = write_conn.query_row("SELECT COUNT(*) FROM songs", [], |r| r.get(0))?;
        info!("Opened song database with {} songs", song_count);

        let mut read_pool = Vec::with_capacity(read_pool_size.max(1));
        for _ in 0..read_pool_size.max(1) {
            let read_conn = Connection::open_with_flags(
                db_path_ref,
                rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY
                    | rusqlite::OpenFlags::SQLITE_OPEN_URI
                    | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?;
            read_pool.push(Arc::new(Mutex::new(read_conn)));
        }

        Ok(SqliteSongStore {
            write_conn: Arc::new(Mutex::new(write_conn)),
            read_pool,
            read_index: Arc::new(AtomicUsize::new(0)),
        })
    }

    fn get_read_conn(&self) -> Arc<Mutex<Connection>> {
        let index = self.read_index.fetch_add(1, Ordering::SeqCst) % self.read_pool.len();
        self.read_pool[index].clone()
    }

    fn query_songs(conn: &Connection, sql: &str, term: Option<&str>) -> StoreResult<Vec<Song>> {
        let mut stmt = conn.prepare_cached(sql)?;
        let songs = match term {
            Some(term) => stmt
                .query_map(params![term], song_from_row)?
                .collect::<Result<Vec<_>, _>>()?,
            None => stmt
                .query_map([], song_from_row)?
                .collect::<Result<Vec<_>, _>>()?,
        };
        Ok(songs)
    }

    fn find_song(conn: &Connection, song_id: &str) -> StoreResult<Option<Song>> {
        let song = conn
            .query_row(
                &format!("SELECT {} FROM songs WHERE song_id = ?1", SONG_COLUMNS),
                params![song_id],
                song_from_row,
            )
            .optional()?;
        Ok(song)
    }

    /// Writes a validated song, returning true if the row did not exist.
    fn write_song(conn: &Connection, song: &Song) -> StoreResult<bool> {
        let exists = conn
            .query_row(
                "SELECT 1 FROM songs WHERE song_id = ?1",
                params![song.song_id],
                |_| Ok(()),
            )
            .optional()?
            .is_some();

        conn.execute(
            &format!(
                "INSERT INTO songs ({}) VALUES \
                 (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19) \
                 ON CONFLICT(song_id) DO UPDATE SET \
                 title = excluded.title, rating = excluded.rating, \
                 danceability = excluded.danceability, energy = excluded.energy, \
                 acousticness = excluded.acousticness, tempo = excluded.tempo, \
                 duration_ms = excluded.duration_ms, num_sections = excluded.num_sections, \
                 num_segments = excluded.num_segments, key = excluded.key, \
                 loudness = excluded.loudness, mode = excluded.mode, \
                 time_signature = excluded.time_signature, num_bars = excluded.num_bars, \
                 song_class = excluded.song_class, instrumentalness = excluded.instrumentalness, \
                 liveness = excluded.liveness, valence = excluded.valence",
                SONG_COLUMNS
            ),
            params![
                song.song_id,
                song.title,
                song.rating,
                song.danceability,
                song.energy,
                song.acousticness,
                song.tempo,
                song.duration_ms,
                song.num_sections,
                song.num_segments,
                song.key,
                song.loudness,
                song.mode,
                song.time_signature,
                song.num_bars,
                song.song_class,
                song.instrumentalness,
                song.liveness,
                song.valence,
            ],
        )?;
        Ok(!exists)
    }

    fn upsert_in_savepoint(tx: &mut rusqlite::Transaction, song: &Song) -> StoreResult<bool> {
        validate_song(song)?;
        let savepoint = tx.savepoint()?;
        let created = Self::write_song(&savepoint, song)?;
        savepoint.commit()?;
        Ok(created)
    }
}

impl SongStore for SqliteSongStore {
    fn get_song(&self, song_id: &str) -> StoreResult<Option<Song>> {
        let conn = self.get_read_conn();
        let conn = conn.lock().unwrap();
        Self::find_song(&conn, song_id)
    }

    fn upsert_song(&self, song: &Song) -> StoreResult<bool> {
        validate_song(song)?;
        let mut conn = self.write_conn.lock().unwrap();
        let tx = conn.transaction()?;
        let created = Self::write_song(&tx, song)?;
        tx.commit()?;
        debug!("Upserted song {} (created: {})", song.song_id, created);
        Ok(created)
    }

    fn list_all(&self) -> StoreResult<Vec<Song>> {
        let conn = self.get_read_conn();
        let conn = conn.lock().unwrap();
        Self::query_songs(
            &conn,
            &format!("SELECT {} FROM songs {}", SONG_COLUMNS, ORDER_BY_RATING),
            None,
        )
    }

    fn search_by_title(&self, term: &str) -> StoreResult<Vec<Song>> {
        let conn = self.get_read_conn();
        let conn = conn.lock().unwrap();
        let pattern = like_pattern(term);
        Self::query_songs(
            &conn,
            &format!(
                "SELECT {} FROM songs WHERE title LIKE ?1 ESCAPE '\\' {}",
                SONG_COLUMNS, ORDER_BY_RATING
            ),
            Some(&pattern),
        )
    }

    fn update_rating(&self, song_id: &str, rating: i64) -> StoreResult<RatingChange> {
        validate_rating(rating)?;

        let mut conn = self.write_conn.lock().unwrap();
        let tx = conn.transaction()?;
        let mut song = Self::find_song(&tx, song_id)?
            .ok_or_else(|| StoreError::NotFound(song_id.to_string()))?;

        let old_rating = song.rating;
        song.rating = Some(rating);
        validate_song(&song)?;

        tx.execute(
            "UPDATE songs SET rating = ?1 WHERE song_id = ?2",
            params![rating, song_id],
        )?;
        tx.commit()?;

        Ok(RatingChange { song, old_rating })
    }

    fn upsert_batch(&self, songs: &[Song]) -> StoreResult<Vec<StoreResult<bool>>> {
        let mut conn = self.write_conn.lock().unwrap();
        let mut tx = conn.transaction()?;
        let outcomes = songs
            .iter()
            .map(|song| Self::upsert_in_savepoint(&mut tx, song))
            .collect::<Vec<_>>();
        tx.commit()?;
        Ok(outcomes)
    }

    fn count(&self) -> StoreResult<usize> {
        let conn = self.get_read_conn();
        let conn = conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM songs", [], |r| r.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::song_store::ValidationError;
    use tempfile::TempDir;

    fn create_tmp_store() -> (SqliteSongStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("songs.db");
        let store = SqliteSongStore::new(&db_path, 2).unwrap();
        (store, temp_dir)
    }

    fn song(id: &str, title: &str, rating: Option<i64>) -> Song {
        Song::new(id, title).with_rating(rating)
    }

    #[test]
    fn creates_schema_and_reopens() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("songs.db");
        {
            let store = SqliteSongStore::new(&db_path, 1).unwrap();
            store.upsert_song(&song("s1", "A", Some(3))).unwrap();
        }
        let store = SqliteSongStore::new(&db_path, 1).unwrap();
        assert_eq!(store.count().unwrap(), 1);

        let conn = Connection::open(&db_path).unwrap();
        let version: i64 = conn
            .query_row("PRAGMA user_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(version as usize, BASE_DB_VERSION + 1);
    }

    #[test]
    fn refuses_foreign_database() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("songs.db");
        {
            let conn = Connection::open(&db_path).unwrap();
            conn.execute("CREATE TABLE other (id TEXT)", []).unwrap();
        }
        assert!(SqliteSongStore::new(&db_path, 1).is_err());
    }

    #[test]
    fn refuses_unknown_schema_version() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("songs.db");
        drop(SqliteSongStore::new(&db_path, 1).unwrap());
        {
            let conn = Connection::open(&db_path).unwrap();
            conn.pragma_update(None, "user_version", BASE_DB_VERSION + 2)
                .unwrap();
        }
        let err = SqliteSongStore::new(&db_path, 1).err().unwrap();
        assert!(err.to_string().contains("schema version"));
    }

    #[test]
    fn upsert_reports_creation_and_replaces_all_fields() {
        let (store, _tmp) = create_tmp_store();
        let mut s = song("s1", "First", None);
        s.tempo = 90.0;
        assert!(store.upsert_song(&s).unwrap());

        let mut replacement = song("s1", "Second", Some(2));
        replacement.num_bars = 7;
        assert!(!store.upsert_song(&replacement).unwrap());

        let stored = store.get_song("s1").unwrap().unwrap();
        assert_eq!(stored, replacement);
        assert_eq!(stored.tempo, 120.0);
    }

    #[test]
    fn upsert_rejects_invalid_rating_without_writing() {
        let (store, _tmp) = create_tmp_store();
        let err = store.upsert_song(&song("s1", "A", Some(6))).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation(ValidationError::RatingOutOfRange { value: 6 })
        ));
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn missing_song_is_none() {
        let (store, _tmp) = create_tmp_store();
        assert_eq!(store.get_song("nope").unwrap(), None);
    }

    #[test]
    fn list_all_orders_by_rating_then_title() {
        let (store, _tmp) = create_tmp_store();
        store.upsert_song(&song("a", "Zeta", Some(3))).unwrap();
        store.upsert_song(&song("b", "Alpha", Some(3))).unwrap();
        store.upsert_song(&song("c", "Beta", None)).unwrap();
        store.upsert_song(&song("d", "Gamma", Some(5))).unwrap();
        store.upsert_song(&song("e", "Aardvark", None)).unwrap();

        let ids: Vec<String> = store
            .list_all()
            .unwrap()
            .into_iter()
            .map(|s| s.song_id)
            .collect();
        assert_eq!(ids, vec!["d", "b", "a", "e", "c"]);
    }

    #[test]
    fn search_is_case_insensitive_and_literal() {
        let (store, _tmp) = create_tmp_store();
        store.upsert_song(&song("a", "Hello World", Some(1))).unwrap();
        store.upsert_song(&song("b", "say hello", Some(4))).unwrap();
        store.upsert_song(&song("c", "100% Pure", None)).unwrap();
        store.upsert_song(&song("d", "100 Percent", None)).unwrap();

        let ids: Vec<String> = store
            .search_by_title("HELLO")
            .unwrap()
            .into_iter()
            .map(|s| s.song_id)
            .collect();
        assert_eq!(ids, vec!["b", "a"]);

        let hits = store.search_by_title("0%").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].song_id, "c");

        assert!(store.search_by_title("_").unwrap().is_empty());
        assert!(store.search_by_title("missing").unwrap().is_empty());
    }

    #[test]
    fn update_rating_returns_old_rating() {
        let (store, _tmp) = create_tmp_store();
        store.upsert_song(&song("s1", "A", None)).unwrap();

        let change = store.update_rating("s1", 4).unwrap();
        assert_eq!(change.old_rating, None);
        assert_eq!(change.song.rating, Some(4));

        let change = store.update_rating("s1", 2).unwrap();
        assert_eq!(change.old_rating, Some(4));
        assert_eq!(store.get_song("s1").unwrap().unwrap().rating, Some(2));
    }

    #[test]
    fn update_rating_validates_before_lookup() {
        let (store, _tmp) = create_tmp_store();
        store.upsert_song(&song("s1", "A", Some(3))).unwrap();

        for bad in [0, 6, -1] {
            assert!(matches!(
                store.update_rating("s1", bad),
                Err(StoreError::Validation(_))
            ));
        }
        assert!(matches!(
            store.update_rating("missing", 9),
            Err(StoreError::Validation(_))
        ));
        assert!(matches!(
            store.update_rating("missing", 3),
            Err(StoreError::NotFound(id)) if id == "missing"
        ));
        assert_eq!(store.get_song("s1").unwrap().unwrap().rating, Some(3));
    }

    #[test]
    fn batch_keeps_good_rows_when_one_fails() {
        let (store, _tmp) = create_tmp_store();
        store.upsert_song(&song("s2", "Old", None)).unwrap();

        let batch = vec![
            song("s1", "A", Some(1)),
            song("s2", "B", None),
            song("s3", &"x".repeat(300), None),
            song("s4", "D", Some(7)),
        ];
        let outcomes = store.upsert_batch(&batch).unwrap();

        assert!(matches!(outcomes[0], Ok(true)));
        assert!(matches!(outcomes[1], Ok(false)));
        assert!(matches!(outcomes[2], Err(StoreError::Validation(_))));
        assert!(matches!(outcomes[3], Err(StoreError::Validation(_))));

        assert_eq!(store.count().unwrap(), 2);
        assert_eq!(store.get_song("s2").unwrap().unwrap().title, "B");
    }

    #[test]
    fn batch_rolls_back_a_row_rejected_by_sqlite() {
        let (store, _tmp) = create_tmp_store();

        // NaN is bound as NULL and trips the NOT NULL constraint.
        let mut broken = song("s2", "Broken", Some(2));
        broken.energy = f64::NAN;
        let batch = vec![song("s1", "A", None), broken, song("s3", "C", Some(4))];

        let outcomes = store.upsert_batch(&batch).unwrap();
        assert!(matches!(outcomes[0], Ok(true)));
        assert!(matches!(&outcomes[1], Err(StoreError::Integrity(msg)) if msg.contains("energy")));
        assert!(matches!(outcomes[2], Ok(true)));

        assert_eq!(store.count().unwrap(), 2);
        assert_eq!(store.get_song("s2").unwrap(), None);
        assert_eq!(store.get_song("s3").unwrap().unwrap().rating, Some(4));
    }

    #[test]
    fn check_constraint_backs_validation() {
        let (store, _tmp) = create_tmp_store();
        let conn = store.write_conn.lock().unwrap();
        let err = conn
            .execute(
                "INSERT INTO songs (song_id, title, rating) VALUES ('x', 'X', 9)",
                [],
            )
            .unwrap_err();
        assert!(matches!(StoreError::from(err), StoreError::Integrity(_)));
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("a%b_c\\"), "%a\\%b\\_c\\\\%");
    }
}
