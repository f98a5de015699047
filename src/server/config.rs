use super::RequestsLoggingLevel;
use crate::config::{PaginationSettings, RateLimitSettings, UploadSettings};

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub requests_logging_level: RequestsLoggingLevel,
    pub port: u16,
    pub metrics_port: u16,
    pub pagination: PaginationSettings,
    pub upload: UploadSettings,
    pub rate_limit: RateLimitSettings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            requests_logging_level: RequestsLoggingLevel::Path,
            port: 3001,
            metrics_port: 9091,
            pagination: PaginationSettings::default(),
            upload: UploadSettings::default(),
            rate_limit: RateLimitSettings::default(),
        }
    }
}
