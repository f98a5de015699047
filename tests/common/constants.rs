//! Shared constants for end-to-end tests
//!
//! When the seeded songs change, update only this file and fixtures.rs.

// ============================================================================
// Seeded Songs
// ============================================================================

/// "3AM" rated 5
pub const SONG_1_ID: &str = "5vYA1mW9g2Coh1HUFUSmlb";
pub const SONG_1_TITLE: &str = "3AM";

/// "4 Walls" rated 3
pub const SONG_2_ID: &str = "2klCjJcucgGQysgH170npL";
pub const SONG_2_TITLE: &str = "4 Walls";

/// "Blue Moon" without a rating
pub const SONG_3_ID: &str = "093PI3mdUvOSlvMYDwnV1e";
pub const SONG_3_TITLE: &str = "Blue Moon";

/// Number of songs seeded by `TestServer::spawn()`
pub const SEEDED_SONG_COUNT: usize = 3;

/// Song ID that never exists
pub const NONEXISTENT_ID: &str = "nonexistent-song-999";

// ============================================================================
// Server Settings
// ============================================================================

pub const RATE_LIMIT_MAX_ATTEMPTS: u64 = 10;

// ============================================================================
// Timeouts
// ============================================================================

/// Maximum time to wait for server to become ready (milliseconds)
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Interval between server readiness checks (milliseconds)
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;

/// HTTP request timeout (seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;
