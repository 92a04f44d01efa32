//! Shared configuration for the fleet control plane.
//!
//! [`Config`] is loaded once per invocation through `ortho_config`, which
//! layers CLI flags over `FLEET_*` environment variables over an optional
//! configuration file (`--config-path` / `FLEET_CONFIG_PATH`) over the
//! defaults in [`defaults`]. The loaded value is handed to the controller
//! explicitly; nothing in the workspace consults ambient process state to
//! discover service locations.

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub mod defaults;
mod fleet;
mod logging;
mod policy;
mod service;
mod timing;

pub use defaults::{
    DEFAULT_LOG_FILTER, default_fleet_root, default_log_filter_string, default_log_format,
};
pub use fleet::{API_SERVICE, BRIDGE_SERVICE, Fleet, FleetError, MCP_SERVICE};
pub use logging::LogFormat;
pub use policy::RunningPolicy;
pub use service::ServiceDescriptor;
pub use timing::Timings;

/// Resolved configuration for one `fleetctl` invocation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "FLEET")]
#[serde(default)]
pub struct Config {
    /// Directory containing the bridge, HTTP API and protocol server checkouts.
    #[ortho_config(default = default_fleet_root())]
    pub fleet_root: Utf8PathBuf,
    /// Directory receiving the per-service output logs. Each service logs
    /// into its own working directory when unset.
    pub log_dir: Option<Utf8PathBuf>,
    /// Interpreter used for the Python services.
    #[ortho_config(default = defaults::DEFAULT_PYTHON_BIN.to_owned())]
    pub python_bin: String,
    /// Address the HTTP API binds to.
    #[ortho_config(default = defaults::DEFAULT_BIND_HOST.to_owned())]
    pub bind_host: String,
    /// Address readiness probes connect to.
    #[ortho_config(default = defaults::DEFAULT_PROBE_HOST.to_owned())]
    pub probe_host: String,
    /// Readiness port of the bridge.
    #[ortho_config(default = defaults::DEFAULT_BRIDGE_PORT)]
    pub bridge_port: u16,
    /// Readiness port of the HTTP API.
    #[ortho_config(default = defaults::DEFAULT_API_PORT)]
    pub api_port: u16,
    /// Readiness port of the protocol server.
    #[ortho_config(default = defaults::DEFAULT_MCP_PORT)]
    pub mcp_port: u16,
    /// Milliseconds a service gets to exit after SIGTERM.
    #[ortho_config(default = defaults::DEFAULT_GRACE_PERIOD_MS)]
    pub grace_period_ms: u64,
    /// Milliseconds waited after SIGKILL before the final check.
    #[ortho_config(default = defaults::DEFAULT_KILL_WAIT_MS)]
    pub kill_wait_ms: u64,
    /// Milliseconds waited after launch before looking for the process.
    #[ortho_config(default = defaults::DEFAULT_SETTLE_MS)]
    pub settle_ms: u64,
    /// Milliseconds between readiness probes.
    #[ortho_config(default = defaults::DEFAULT_READINESS_INTERVAL_MS)]
    pub readiness_interval_ms: u64,
    /// Number of readiness probes before a start is declared failed.
    #[ortho_config(default = defaults::DEFAULT_READINESS_ATTEMPTS)]
    pub readiness_attempts: u32,
    /// Milliseconds allowed for one TCP connection attempt.
    #[ortho_config(default = defaults::DEFAULT_PROBE_TIMEOUT_MS)]
    pub probe_timeout_ms: u64,
    /// Lines of service output echoed alongside a failure.
    #[ortho_config(default = defaults::DEFAULT_LOG_TAIL_LINES)]
    pub log_tail_lines: usize,
    /// Behaviour when `start` finds a live instance.
    #[ortho_config(default = RunningPolicy::Replace)]
    pub on_running: RunningPolicy,
    /// `tracing` filter expression.
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Diagnostic log output format.
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fleet_root: default_fleet_root(),
            log_dir: None,
            python_bin: defaults::DEFAULT_PYTHON_BIN.to_owned(),
            bind_host: defaults::DEFAULT_BIND_HOST.to_owned(),
            probe_host: defaults::DEFAULT_PROBE_HOST.to_owned(),
            bridge_port: defaults::DEFAULT_BRIDGE_PORT,
            api_port: defaults::DEFAULT_API_PORT,
            mcp_port: defaults::DEFAULT_MCP_PORT,
            grace_period_ms: defaults::DEFAULT_GRACE_PERIOD_MS,
            kill_wait_ms: defaults::DEFAULT_KILL_WAIT_MS,
            settle_ms: defaults::DEFAULT_SETTLE_MS,
            readiness_interval_ms: defaults::DEFAULT_READINESS_INTERVAL_MS,
            readiness_attempts: defaults::DEFAULT_READINESS_ATTEMPTS,
            probe_timeout_ms: defaults::DEFAULT_PROBE_TIMEOUT_MS,
            log_tail_lines: defaults::DEFAULT_LOG_TAIL_LINES,
            on_running: RunningPolicy::default(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Directory containing the service checkouts.
    #[must_use]
    pub fn fleet_root(&self) -> &Utf8Path {
        &self.fleet_root
    }

    /// Directory overriding where service output logs are written.
    #[must_use]
    pub fn log_dir(&self) -> Option<&Utf8Path> {
        self.log_dir.as_deref()
    }

    /// Host used for readiness probes.
    #[must_use]
    pub fn probe_host(&self) -> &str {
        &self.probe_host
    }

    /// Filter expression for diagnostic logging.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Output format for diagnostic logging.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}
