//! SongStore trait definition.

use super::models::{RatingChange, Song};
use super::validation::ValidationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Song not found: {0}")]
    NotFound(String),

    #[error("Integrity conflict: {0}")]
    Integrity(String),

    #[error("Database error: {0}")]
    Database(#[source] rusqlite::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, msg)
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StoreError::Integrity(msg.clone().unwrap_or_else(|| e.to_string()))
            }
            _ => StoreError::Database(err),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Durable storage of songs.
///
/// Every write validates the song first and is atomic per call.
pub trait SongStore: Send + Sync {
    /// Get a song by ID.
    fn get_song(&self, song_id: &str) -> StoreResult<Option<Song>>;

    /// Insert or fully replace a song. Returns true if the song was created.
    fn upsert_song(&self, song: &Song) -> StoreResult<bool>;

    /// All songs, rating descending with unrated songs last, then title ascending.
    fn list_all(&self) -> StoreResult<Vec<Song>>;

    /// Songs whose title contains `term`, ignoring case, in `list_all` order.
    fn search_by_title(&self, term: &str) -> StoreResult<Vec<Song>>;

    /// Set the rating of an existing song within one transaction.
    fn update_rating(&self, song_id: &str, rating: i64) -> StoreResult<RatingChange>;

    /// Upsert many songs in one transaction.
    ///
    /// Each song gets its own savepoint, so a failing row is rolled back
    /// alone and reported in the returned vector. The outer error means
    /// nothing was committed.
    fn upsert_batch(&self, songs: &[Song]) -> StoreResult<Vec<StoreResult<bool>>>;

    fn count(&self) -> StoreResult<usize>;
}
