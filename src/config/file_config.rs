use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_dir: Option<String>,
    pub port: Option<u16>,
    pub metrics_port: Option<u16>,
    pub logging_level: Option<String>,

    // Feature configs
    pub cache: Option<CacheConfig>,
    pub rate_limit: Option<RateLimitConfig>,
    pub upload: Option<UploadConfig>,
    pub pagination: Option<PaginationConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache backend to use: "redis", "memory", "disabled"
    pub backend: Option<String>,
    pub url: Option<String>,
    pub connect_timeout_ms: Option<u64>,
    pub command_timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct RateLimitConfig {
    pub max_attempts: Option<u64>,
    pub window_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct UploadConfig {
    pub max_file_size_bytes: Option<usize>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct PaginationConfig {
    pub default_page_size: Option<usize>,
    pub max_page_size: Option<usize>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_sections() {
        let config: FileConfig = toml::from_str(
            r#"
            db_dir = "/data"
            port = 8080
            logging_level = "headers"

            [cache]
            backend = "memory"
            connect_timeout_ms = 1000

            [rate_limit]
            max_attempts = 3
            window_secs = 10

            [upload]
            max_file_size_bytes = 2048

            [pagination]
            default_page_size = 20
            "#,
        )
        .unwrap();

        assert_eq!(config.db_dir.as_deref(), Some("/data"));
        assert_eq!(config.port, Some(8080));
        assert_eq!(config.metrics_port, None);
        let cache = config.cache.unwrap();
        assert_eq!(cache.backend.as_deref(), Some("memory"));
        assert_eq!(cache.connect_timeout_ms, Some(1000));
        assert_eq!(cache.url, None);
        assert_eq!(config.rate_limit.unwrap().max_attempts, Some(3));
        assert_eq!(config.upload.unwrap().max_file_size_bytes, Some(2048));
        assert_eq!(config.pagination.unwrap().max_page_size, None);
    }

    #[test]
    fn load_reports_missing_file() {
        let err = FileConfig::load(Path::new("/nonexistent/config.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn load_reports_invalid_toml() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "port = \"not a number\"").unwrap();
        let err = FileConfig::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
