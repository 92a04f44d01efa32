//! Default values applied when no flag, variable or file sets a field.

use camino::Utf8PathBuf;

#[cfg(unix)]
use dirs::home_dir;

/// Default log filter expression used by the binary.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Directory name of the fleet checkout below the home directory.
pub const DEFAULT_FLEET_DIR: &str = "whatsapp-mcp";

/// Interpreter used to launch the Python services.
pub const DEFAULT_PYTHON_BIN: &str = "python3";

/// Address the HTTP API binds to.
pub const DEFAULT_BIND_HOST: &str = "0.0.0.0";

/// Address readiness probes connect to.
pub const DEFAULT_PROBE_HOST: &str = "127.0.0.1";

/// Port served by the bridge REST API.
pub const DEFAULT_BRIDGE_PORT: u16 = 8080;

/// Port served by the HTTP API.
pub const DEFAULT_API_PORT: u16 = 8040;

/// Port served by the protocol server's SSE transport.
pub const DEFAULT_MCP_PORT: u16 = 8000;

/// Time a service is given to exit after the graceful signal.
pub const DEFAULT_GRACE_PERIOD_MS: u64 = 2_000;

/// Time allowed for the kernel to reap a service after the forceful signal.
pub const DEFAULT_KILL_WAIT_MS: u64 = 1_000;

/// Pause between launching a service and first looking for it.
pub const DEFAULT_SETTLE_MS: u64 = 2_000;

/// Pause between two readiness probes.
pub const DEFAULT_READINESS_INTERVAL_MS: u64 = 1_000;

/// Number of readiness probes made before giving up.
pub const DEFAULT_READINESS_ATTEMPTS: u32 = 60;

/// Upper bound for a single TCP connection attempt.
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 500;

/// Lines of service output echoed with a failure.
pub const DEFAULT_LOG_TAIL_LINES: usize = 20;

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binary.
pub fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Compact
}

/// Computes the directory holding the three service checkouts.
pub fn default_fleet_root() -> Utf8PathBuf {
    let mut base = home_base_directory();
    base.push(DEFAULT_FLEET_DIR);
    base
}

#[cfg(unix)]
fn home_base_directory() -> Utf8PathBuf {
    home_dir()
        .and_then(|path| Utf8PathBuf::from_path_buf(path).ok())
        .unwrap_or_else(|| Utf8PathBuf::from("/opt"))
}

#[cfg(not(unix))]
fn home_base_directory() -> Utf8PathBuf {
    Utf8PathBuf::from(".")
}
