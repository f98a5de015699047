//! Keeps the sorted song cache consistent with the song database.
//!
//! Reads go through the cache and fall back to the database; every write
//! goes to the database first and is pushed to the cache after commit.
//! Cache failures never escape this type: they are logged, counted and
//! treated as a miss (reads) or ignored (writes).

use crate::server::metrics;
use crate::song_cache::{CacheError, SortedSongCache};
use crate::song_store::{validate_rating, RatingChange, Song, SongStore, StoreResult};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingSource {
    /// Served straight from the cache.
    Cache,
    /// The cache was empty or failing, it was rebuilt and then read.
    RebuiltCache,
    /// The cache could not serve the listing even after a rebuild.
    Store,
}

impl ListingSource {
    pub fn metric_label(&self) -> &'static str {
        match self {
            ListingSource::Cache => "hit",
            ListingSource::RebuiltCache => "rebuilt",
            ListingSource::Store => "store_fallback",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub songs: Vec<Song>,
    pub source: ListingSource,
}

#[derive(Clone)]
pub struct CacheSynchronizer {
    store: Arc<dyn SongStore>,
    cache: SortedSongCache,
}

fn log_cache_error(operation: &'static str, err: &CacheError) {
    metrics::record_cache_error(operation);
    warn!("Song cache {} failed: {}", operation, err);
}

impl CacheSynchronizer {
    pub fn new(store: Arc<dyn SongStore>, cache: SortedSongCache) -> Self {
        CacheSynchronizer { store, cache }
    }

    pub fn store(&self) -> &Arc<dyn SongStore> {
        &self.store
    }

    pub fn cache(&self) -> &SortedSongCache {
        &self.cache
    }

    fn read_cache(&self) -> Vec<Song> {
        match self.cache.get_all_sorted() {
            Ok(songs) => songs,
            Err(err) => {
                log_cache_error("read", &err);
                vec![]
            }
        }
    }

    fn rebuild_with(&self, songs: &[Song]) -> usize {
        match self.cache.rebuild_all(songs) {
            Ok(count) => count,
            Err(err) => {
                log_cache_error("rebuild", &err);
                0
            }
        }
    }

    /// All songs, highest rating first.
    ///
    /// Only a database failure is returned as an error.
    pub fn get_listing(&self) -> StoreResult<Listing> {
        let cached = self.read_cache();
        if !cached.is_empty() {
            metrics::record_cache_lookup(ListingSource::Cache.metric_label());
            return Ok(Listing {
                songs: cached,
                source: ListingSource::Cache,
            });
        }

        debug!("Song cache miss, rebuilding from database");
        let stored = self.store.list_all()?;
        self.rebuild_with(&stored);

        let rebuilt = self.read_cache();
        let listing = if rebuilt.is_empty() {
            Listing {
                songs: stored,
                source: ListingSource::Store,
            }
        } else {
            Listing {
                songs: rebuilt,
                source: ListingSource::RebuiltCache,
            }
        };
        metrics::record_cache_lookup(listing.source.metric_label());
        Ok(listing)
    }

    /// Sets a song's rating in the database, then in the cache.
    pub fn apply_rating(&self, song_id: &str, rating: i64) -> StoreResult<RatingChange> {
        validate_rating(rating)?;
        let change = self.store.update_rating(song_id, rating)?;
        metrics::record_rating_update();
        info!(
            "Rated song {}: {}",
            change.song.song_id,
            change.describe()
        );

        if let Err(err) = self.cache.put(&change.song) {
            log_cache_error("put", &err);
        }
        Ok(change)
    }

    /// Replaces the cache content with the full database content.
    ///
    /// Returns the number of cached songs, 0 when the cache is unavailable.
    pub fn rebuild_from_store(&self) -> StoreResult<usize> {
        let songs = self.store.list_all()?;
        metrics::set_songs_total(songs.len());
        let cached = self.rebuild_with(&songs);
        info!("Rebuilt song cache with {} of {} songs", cached, songs.len());
        Ok(cached)
    }
}
