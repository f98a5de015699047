use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::{fmt::Debug, path::PathBuf};
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use song_catalog_server::config::{
    AppConfig, CacheBackendKind, CliConfig, FileConfig, DEFAULT_CACHE_URL,
};
use song_catalog_server::server::{metrics, run_server, RequestsLoggingLevel, ServerConfig};
use song_catalog_server::song_cache::connect_cache;
use song_catalog_server::song_store::{SongStore, SqliteSongStore};

const READ_POOL_SIZE: usize = 4;

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to a TOML config file. Values in it override the flags below.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory holding the songs.db SQLite database.
    #[clap(long, value_parser = parse_path)]
    pub db_dir: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Where the sorted song cache and rate limit counters live.
    #[clap(long, value_enum, default_value_t = CacheBackendKind::Redis)]
    pub cache_backend: CacheBackendKind,

    /// Redis URL, used with the redis cache backend.
    #[clap(long, env = "CACHE_URL", default_value = DEFAULT_CACHE_URL)]
    pub cache_url: String,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            db_dir: self.db_dir.clone(),
            port: self.port,
            metrics_port: self.metrics_port,
            logging_level: self.logging_level.clone(),
            cache_backend: self.cache_backend,
            cache_url: self.cache_url.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config from {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let app_config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    info!("Initializing metrics...");
    metrics::init_metrics();

    let db_path = app_config.song_db_path();
    info!("Opening SQLite song database at {:?}...", db_path);
    let song_store = Arc::new(SqliteSongStore::new(&db_path, READ_POOL_SIZE)?);
    let song_count = song_store.count()?;
    metrics::set_songs_total(song_count);
    info!("{} songs in catalog", song_count);

    let cache_backend = connect_cache(&app_config.cache);
    match &cache_backend {
        Some(backend) => info!("Using {} song cache", backend.name()),
        None => info!("Running without song cache"),
    }

    let server_config = ServerConfig {
        requests_logging_level: app_config.logging_level,
        port: app_config.port,
        metrics_port: app_config.metrics_port,
        pagination: app_config.pagination,
        upload: app_config.upload,
        rate_limit: app_config.rate_limit,
    };

    info!("Ready to serve at port {}!", server_config.port);
    run_server(server_config, song_store, cache_backend).await
}
