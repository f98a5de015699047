//! Song Catalog Server Library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod config;
pub mod rate_limit;
pub mod server;
pub mod song_cache;
pub mod song_import;
pub mod song_store;
pub mod song_sync;
pub mod sqlite_persistence;

// Re-export commonly used types for convenience
pub use server::{make_app, run_server, RequestsLoggingLevel, ServerConfig};
pub use song_cache::{connect_cache, CacheBackend, MemoryCacheBackend, SortedSongCache};
pub use song_store::{Song, SongStore, SqliteSongStore};
