//! Error types for service lifecycle operations.

use std::io;

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors raised while starting, stopping or inspecting a service.
///
/// Per-service failures are folded into a
/// [`LifecycleResult`](super::LifecycleResult) by the controller; only
/// output failures escape to the CLI runtime.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("working directory {path} for service '{service}' does not exist")]
    MissingWorkingDirectory { service: String, path: Utf8PathBuf },
    #[error("service '{service}' requires '{dependency}', which is not running and ready")]
    DependencyNotReady { service: String, dependency: String },
    #[error("service '{service}' depends on '{dependency}', which is not part of the fleet")]
    UnknownDependency { service: String, dependency: String },
    #[error("service '{service}' declares an empty command")]
    EmptyCommand { service: String },
    #[error("failed to run build step '{program}' for '{service}': {source}")]
    BuildSpawn {
        service: String,
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("build step for '{service}' failed ({status})")]
    BuildFailed { service: String, status: String },
    #[error("failed to launch '{program}' for '{service}': {source}")]
    LaunchFailed {
        service: String,
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("service '{service}' did not appear in the process table after launch")]
    ProcessNotObserved { service: String },
    #[error(
        "service '{service}' did not accept connections on {host}:{port} after {attempts} attempts"
    )]
    ProbeTimeout {
        service: String,
        host: String,
        port: u16,
        attempts: u32,
    },
    #[error("service '{service}' still running after the forceful signal (pids {pids:?})")]
    SurvivedKill { service: String, pids: Vec<u32> },
    #[error("stale instance of '{service}' (pids {pids:?}) survived the forceful signal")]
    StaleInstance { service: String, pids: Vec<u32> },
    #[error("failed to signal pid {pid}: {source}")]
    SignalFailed {
        pid: u32,
        #[source]
        source: io::Error,
    },
    #[error("invalid pid {pid}: {reason}")]
    InvalidPid { pid: u32, reason: &'static str },
    #[cfg(not(unix))]
    #[error("platform does not support process signalling")]
    UnsupportedPlatform,
    #[error("failed to open output log {path}: {source}")]
    OutputLog {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to serialise lifecycle output: {0}")]
    Serialise(#[source] serde_json::Error),
    #[error("failed to write lifecycle output: {0}")]
    Io(#[source] io::Error),
}
