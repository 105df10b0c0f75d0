//! Default values for apitester configuration.
//!
//! All hardcoded defaults are centralized here for easy maintenance.

// ============================================================================
// Server Defaults
// ============================================================================

/// Port the HTTP service listens on.
pub const DEFAULT_PORT: u16 = 8080;

/// Address the HTTP service binds to.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Largest request body the service accepts (2 MB).
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

// ============================================================================
// Storage Defaults
// ============================================================================

/// Root directory for suite definitions and result documents.
pub const DEFAULT_DATA_DIR: &str = "./data";

/// File holding a suite definition inside its suite directory.
pub const DEFAULT_SUITE_FILE: &str = "tests.yaml";

/// File holding the suite-level result document.
pub const DEFAULT_RESULTS_FILE: &str = "results.yaml";

/// Directory holding one history document per test case.
pub const DEFAULT_CASES_DIR: &str = "cases";

// ============================================================================
// Runner Defaults
// ============================================================================

/// Upper bound for a single outbound request (seconds).
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Header carrying `{suiteId}.{caseName}` on outbound requests.
pub const DEFAULT_CORRELATION_HEADER: &str = "x-upstream-id";

/// User agent sent to target endpoints.
pub const DEFAULT_USER_AGENT: &str = concat!("apitester/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// Config File Locations
// ============================================================================

/// Project-local config file name.
pub const LOCAL_CONFIG_FILE: &str = "apitester.toml";

/// Directory name under the user config dir.
pub const USER_CONFIG_DIR: &str = "apitester";

/// Config file name under the user config dir.
pub const USER_CONFIG_FILE: &str = "config.toml";
