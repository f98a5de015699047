mod backend;
mod memory_backend;
mod redis_backend;
mod sorted_cache;

pub use backend::{
    connect_cache, CacheBackend, CacheBatch, CacheError, CacheOp, CacheResult,
};
pub use memory_backend::MemoryCacheBackend;
pub use redis_backend::RedisCacheBackend;
pub use sorted_cache::{song_key, SortedSongCache, SONG_KEY_PREFIX, SORTED_INDEX_KEY};
