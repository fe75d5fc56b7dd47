//! Shared constants for end-to-end tests

// ============================================================================
// Upstream fixture ids
// ============================================================================

pub const ARTIST_1_ID: i64 = 101;

pub const ARTIST_2_ID: i64 = 102;

pub const ARTIST_3_ID: i64 = 103;

pub const CONTENT_1_ID: i64 = 201;

pub const CONTENT_2_ID: i64 = 202;

pub const CONTENT_3_ID: i64 = 203;

pub const COMMUNITY_1_ID: i64 = 301;

pub const COMMUNITY_2_ID: i64 = 302;

pub const USER_1_ID: i64 = 1;

pub const USER_2_ID: i64 = 2;

// ============================================================================
// Job ids
// ============================================================================

pub const MONTHLY_RESYNC_JOB_ID: &str = "monthly_resync";

pub const SEARCH_COUNTS_RESET_JOB_ID: &str = "search_counts_reset";

// ============================================================================
// Timeouts
// ============================================================================

/// Maximum time to wait for a spawned server to answer its first request
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Polling interval while waiting for a server to become ready
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;

/// Timeout of every request made by the test client
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Timeout the stats server uses when calling the fake upstream
pub const UPSTREAM_TIMEOUT_SECS: u64 = 2;

/// Maximum time to wait for a triggered job to finish
pub const JOB_COMPLETION_TIMEOUT_MS: u64 = 10_000;
