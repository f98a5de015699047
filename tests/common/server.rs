//! Test server lifecycle management
//!
//! Each test gets an isolated server with its own song database.

use super::constants::*;
use super::fixtures::seed_songs;
use song_catalog_server::config::RateLimitSettings;
use song_catalog_server::server::{make_app, RequestsLoggingLevel, ServerConfig};
use song_catalog_server::song_cache::{CacheBackend, MemoryCacheBackend};
use song_catalog_server::song_store::{Song, SongStore, SqliteSongStore};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Which cache the test server runs with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestCache {
    /// A reachable in-memory cache
    Memory,
    /// No cache at all
    Disabled,
    /// A cache that refuses every command
    Unreachable,
}

/// Test server instance with an isolated database
///
/// When dropped, the server gracefully shuts down and temp resources are cleaned up.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The port the server is listening on
    pub port: u16,

    /// Song store for direct database access in tests
    pub store: Arc<SqliteSongStore>,

    /// The in-memory cache backend, unless the cache is disabled
    pub cache: Option<Arc<MemoryCacheBackend>>,

    // Private fields - keep resources alive until drop
    _temp_db_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a seeded server with an in-memory cache on a random port
    pub async fn spawn() -> Self {
        Self::spawn_with_cache(TestCache::Memory).await
    }

    pub async fn spawn_with_cache(cache: TestCache) -> Self {
        let temp_db_dir = TempDir::new().expect("Failed to create temp dir");
        let store = Arc::new(
            SqliteSongStore::new(temp_db_dir.path().join("songs.db"), 2)
                .expect("Failed to open song store"),
        );
        seed_songs(&store);

        let memory_cache = match cache {
            TestCache::Disabled => None,
            TestCache::Memory => Some(Arc::new(MemoryCacheBackend::new())),
            TestCache::Unreachable => {
                let backend = Arc::new(MemoryCacheBackend::new());
                backend.set_reachable(false);
                Some(backend)
            }
        };
        let cache_backend = memory_cache
            .clone()
            .map(|backend| backend as Arc<dyn CacheBackend>);

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let config = ServerConfig {
            port,
            requests_logging_level: RequestsLoggingLevel::None,
            rate_limit: RateLimitSettings {
                max_attempts: RATE_LIMIT_MAX_ATTEMPTS,
                window: Duration::from_secs(60),
            },
            ..ServerConfig::default()
        };

        let app = make_app(config, store.clone(), cache_backend).expect("Failed to build app");

        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            })
            .await
            .expect("Server failed");
        });

        let server = Self {
            base_url,
            port,
            store,
            cache: memory_cache,
            _temp_db_dir: temp_db_dir,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;

        server
    }

    /// Reads a song straight from the database
    ///
    /// # Panics
    ///
    /// Panics if the song does not exist.
    #[allow(dead_code)]
    pub fn stored_song(&self, song_id: &str) -> Song {
        self.store
            .get_song(song_id)
            .expect("Failed to read song")
            .unwrap_or_else(|| panic!("Song {} not found", song_id))
    }

    /// Waits for the server to become ready by polling the home endpoint
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
