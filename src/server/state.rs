use crate::rate_limit::RatingRateLimiter;
use crate::song_cache::{CacheBackend, SortedSongCache};
use crate::song_import::SongImporter;
use crate::song_store::SongStore;
use crate::song_sync::CacheSynchronizer;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedSongStore = Arc<dyn SongStore>;
pub type OptionalCacheBackend = Option<Arc<dyn CacheBackend>>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub synchronizer: CacheSynchronizer,
    pub importer: SongImporter,
    pub rate_limiter: RatingRateLimiter,
}

impl ServerState {
    pub fn new(
        config: ServerConfig,
        song_store: GuardedSongStore,
        cache_backend: OptionalCacheBackend,
    ) -> Self {
        let rate_limiter = RatingRateLimiter::for_backend(cache_backend.clone(), &config.rate_limit);
        let synchronizer =
            CacheSynchronizer::new(song_store, SortedSongCache::new(cache_backend));
        let importer = SongImporter::new(synchronizer.clone());
        ServerState {
            config,
            start_time: Instant::now(),
            synchronizer,
            importer,
            rate_limiter,
        }
    }
}
