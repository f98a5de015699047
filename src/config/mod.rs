mod file_config;

pub use file_config::{
    CacheConfig, FileConfig, PaginationConfig, RateLimitConfig, UploadConfig,
};

use crate::server::RequestsLoggingLevel;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_CACHE_URL: &str = "redis://127.0.0.1:6379";

/// Command line values, the lowest-priority configuration layer.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub cache_backend: CacheBackendKind,
    pub cache_url: String,
}

impl Default for CliConfig {
    fn default() -> Self {
        CliConfig {
            db_dir: None,
            port: 3001,
            metrics_port: 9091,
            logging_level: RequestsLoggingLevel::Path,
            cache_backend: CacheBackendKind::Redis,
            cache_url: DEFAULT_CACHE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum CacheBackendKind {
    #[default]
    Redis,
    Memory,
    Disabled,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_dir: PathBuf,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,

    pub cache: CacheSettings,
    pub rate_limit: RateLimitSettings,
    pub upload: UploadSettings,
    pub pagination: PaginationSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheSettings {
    pub backend: CacheBackendKind,
    pub url: String,
    pub connect_timeout: Duration,
    pub command_timeout: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            backend: CacheBackendKind::Redis,
            url: DEFAULT_CACHE_URL.to_string(),
            connect_timeout: Duration::from_millis(500),
            command_timeout: Duration::from_millis(250),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitSettings {
    pub max_attempts: u64,
    pub window: Duration,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            window: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadSettings {
    pub max_file_size_bytes: usize,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            max_file_size_bytes: 10 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaginationSettings {
    pub default_page_size: usize,
    pub max_page_size: usize,
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self {
            default_page_size: 10,
            max_page_size: 100,
        }
    }
}

impl AppConfig {
    /// Merges the command line with the optional TOML file, the file winning
    /// wherever it sets a value.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let cache_file = file.cache.unwrap_or_default();
        let defaults = CacheSettings::default();
        let backend = match cache_file.backend {
            Some(name) => match CacheBackendKind::from_str(&name, true) {
                Ok(kind) => kind,
                Err(_) => bail!("Unknown cache backend in config file: {}", name),
            },
            None => cli.cache_backend,
        };
        let cache = CacheSettings {
            backend,
            url: cache_file.url.unwrap_or_else(|| cli.cache_url.clone()),
            connect_timeout: cache_file
                .connect_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.connect_timeout),
            command_timeout: cache_file
                .command_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.command_timeout),
        };

        let rl_file = file.rate_limit.unwrap_or_default();
        let rl_defaults = RateLimitSettings::default();
        let rate_limit = RateLimitSettings {
            max_attempts: rl_file.max_attempts.unwrap_or(rl_defaults.max_attempts),
            window: rl_file
                .window_secs
                .map(Duration::from_secs)
                .unwrap_or(rl_defaults.window),
        };
        if rate_limit.window.is_zero() {
            bail!("rate_limit.window_secs must be greater than 0");
        }

        let upload = UploadSettings {
            max_file_size_bytes: file
                .upload
                .and_then(|u| u.max_file_size_bytes)
                .unwrap_or(UploadSettings::default().max_file_size_bytes),
        };

        let pg_file = file.pagination.unwrap_or_default();
        let pg_defaults = PaginationSettings::default();
        let pagination = PaginationSettings {
            default_page_size: pg_file
                .default_page_size
                .unwrap_or(pg_defaults.default_page_size),
            max_page_size: pg_file.max_page_size.unwrap_or(pg_defaults.max_page_size),
        };
        if pagination.default_page_size == 0
            || pagination.default_page_size > pagination.max_page_size
        {
            bail!(
                "Invalid pagination: default_page_size ({}) must be between 1 and max_page_size ({})",
                pagination.default_page_size,
                pagination.max_page_size
            );
        }

        Ok(Self {
            db_dir,
            port,
            metrics_port,
            logging_level,
            cache,
            rate_limit,
            upload,
            pagination,
        })
    }

    pub fn song_db_path(&self) -> PathBuf {
        self.db_dir.join("songs.db")
    }
}

fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
