//! Sorted view of the song table kept in the cache.
//!
//! Each song is stored as JSON under `song:{song_id}` and scored by rating
//! in the `songs_by_rating` sorted set. The view is derived data and can
//! always be rebuilt from the database.

use super::backend::{CacheBackend, CacheBatch, CacheResult};
use crate::song_store::Song;
use std::sync::Arc;
use tracing::{debug, warn};

pub const SONG_KEY_PREFIX: &str = "song:";
pub const SORTED_INDEX_KEY: &str = "songs_by_rating";

pub fn song_key(song_id: &str) -> String {
    format!("{}{}", SONG_KEY_PREFIX, song_id)
}

fn push_song(batch: &mut CacheBatch, song: &Song) -> CacheResult<()> {
    let json = serde_json::to_string(song)?;
    batch
        .set(song_key(&song.song_id), json)
        .zadd(SORTED_INDEX_KEY, song.song_id.as_str(), song.score());
    Ok(())
}

/// Sorted song cache over an optional backend.
///
/// Without a backend every operation succeeds and does nothing, reads
/// return an empty list.
#[derive(Clone, Default)]
pub struct SortedSongCache {
    backend: Option<Arc<dyn CacheBackend>>,
}

impl SortedSongCache {
    pub fn new(backend: Option<Arc<dyn CacheBackend>>) -> Self {
        SortedSongCache { backend }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.as_ref().map(|b| b.name()).unwrap_or("disabled")
    }

    /// Writes one song entry and its index score as a single batch.
    pub fn put(&self, song: &Song) -> CacheResult<()> {
        let Some(backend) = &self.backend else {
            return Ok(());
        };
        let mut batch = CacheBatch::new();
        push_song(&mut batch, song)?;
        backend.execute(&batch)
    }

    /// Every cached song, highest rating first.
    ///
    /// Index members whose entry is missing or can't be decoded are skipped.
    pub fn get_all_sorted(&self) -> CacheResult<Vec<Song>> {
        let Some(backend) = &self.backend else {
            return Ok(vec![]);
        };
        let song_ids = backend.zrevrange_all(SORTED_INDEX_KEY)?;
        if song_ids.is_empty() {
            return Ok(vec![]);
        }
        let keys: Vec<String> = song_ids.iter().map(|id| song_key(id)).collect();
        let entries = backend.get_many(&keys)?;

        let mut songs = Vec::with_capacity(entries.len());
        for (song_id, entry) in song_ids.iter().zip(entries) {
            let Some(json) = entry else {
                warn!("Cache index lists song {} but its entry is missing", song_id);
                continue;
            };
            match serde_json::from_str::<Song>(&json) {
                Ok(song) => songs.push(song),
                Err(err) => warn!("Skipping undecodable cache entry for {}: {}", song_id, err),
            }
        }
        Ok(songs)
    }

    /// Replaces the whole view with `songs`.
    ///
    /// The index and every entry it currently lists are deleted in the same
    /// batch that writes the new songs. Returns the number of songs written.
    pub fn rebuild_all(&self, songs: &[Song]) -> CacheResult<usize> {
        let Some(backend) = &self.backend else {
            return Ok(0);
        };
        let stale_ids = backend.zrevrange_all(SORTED_INDEX_KEY)?;

        let mut batch = CacheBatch::new();
        batch.delete(SORTED_INDEX_KEY);
        for song_id in &stale_ids {
            batch.delete(song_key(song_id));
        }
        for song in songs {
            push_song(&mut batch, song)?;
        }
        backend.execute(&batch)?;

        debug!(
            "Rebuilt song cache: {} stale entries dropped, {} songs written",
            stale_ids.len(),
            songs.len()
        );
        Ok(songs.len())
    }
}
