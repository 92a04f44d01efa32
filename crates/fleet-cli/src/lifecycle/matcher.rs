//! Process-table queries keyed by command-line substrings.
//!
//! Services are launched detached and never tracked by PID, so every check
//! re-derives their identity from the live process table. A process matches
//! when its full command line (argv joined by single spaces) contains the
//! identity pattern. Unrelated processes sharing the pattern also match.

use std::thread;
use std::time::Duration;

use serde::{Serialize, Serializer};
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};
use tracing::{debug, warn};

const MATCHER_TARGET: &str = "fleetctl::matcher";

/// Snapshot of one live process. Re-queried on every check and never cached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessHandle {
    pub pid: u32,
    #[serde(rename = "uptime_secs", serialize_with = "serialize_secs")]
    pub uptime: Duration,
    pub memory_bytes: u64,
    pub cpu_percent: f32,
    pub command: String,
}

fn serialize_secs<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_secs())
}

/// Read-only predicate over the live process table.
pub trait ProcessMatcher {
    /// Returns every live process whose command line contains `pattern`,
    /// ordered by PID. Reports nothing when the table cannot be read.
    fn find(&self, pattern: &str) -> Vec<ProcessHandle>;

    /// Returns true when at least one live process matches `pattern`.
    fn is_running(&self, pattern: &str) -> bool {
        !self.find(pattern).is_empty()
    }
}

/// Substring test used by every matcher implementation.
pub(crate) fn command_matches(command_line: &str, pattern: &str) -> bool {
    !pattern.is_empty() && command_line.contains(pattern)
}

/// Keeps the handles matching `pattern`, excluding `own_pid`.
pub(crate) fn select_matches(
    candidates: impl IntoIterator<Item = ProcessHandle>,
    pattern: &str,
    own_pid: u32,
) -> Vec<ProcessHandle> {
    let mut matches: Vec<ProcessHandle> = candidates
        .into_iter()
        .filter(|handle| handle.pid != own_pid && command_matches(&handle.command, pattern))
        .collect();
    matches.sort_by_key(|handle| handle.pid);
    matches
}

/// Matcher backed by the operating system process table via `sysinfo`.
#[derive(Debug, Clone)]
pub struct SystemProcessMatcher {
    own_pid: u32,
    cpu_sample: Option<Duration>,
}

impl Default for SystemProcessMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemProcessMatcher {
    pub fn new() -> Self {
        Self {
            own_pid: std::process::id(),
            cpu_sample: None,
        }
    }

    /// Refreshes the table twice so CPU usage reflects a real interval.
    ///
    /// Without sampling every handle reports `0.0` CPU; lifecycle checks do
    /// not need the figure, status reports do.
    #[must_use]
    pub fn with_cpu_sampling(mut self) -> Self {
        self.cpu_sample = Some(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
        self
    }

    fn snapshot(&self) -> Vec<ProcessHandle> {
        let mut system = System::new();
        system.refresh_processes_specifics(ProcessesToUpdate::All, true, refresh_kind());
        if let Some(interval) = self.cpu_sample {
            thread::sleep(interval);
            system.refresh_processes_specifics(ProcessesToUpdate::All, true, refresh_kind());
        }
        system
            .processes()
            .iter()
            // Threads share their parent's command line.
            .filter(|(_, process)| process.thread_kind().is_none())
            .map(|(pid, process)| ProcessHandle {
                pid: pid.as_u32(),
                uptime: Duration::from_secs(process.run_time()),
                memory_bytes: process.memory(),
                cpu_percent: process.cpu_usage(),
                command: join_command(process.cmd()),
            })
            .collect()
    }
}

impl ProcessMatcher for SystemProcessMatcher {
    fn find(&self, pattern: &str) -> Vec<ProcessHandle> {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            warn!(
                target: MATCHER_TARGET,
                pattern, "process enumeration unsupported; treating service as not running"
            );
            return Vec::new();
        }
        let matches = select_matches(self.snapshot(), pattern, self.own_pid);
        debug!(
            target: MATCHER_TARGET,
            pattern,
            matches = matches.len(),
            "scanned process table"
        );
        matches
    }
}

fn refresh_kind() -> ProcessRefreshKind {
    ProcessRefreshKind::nothing()
        .with_cmd(UpdateKind::OnlyIfNotSet)
        .with_memory()
        .with_cpu()
}

fn join_command(argv: &[std::ffi::OsString]) -> String {
    argv.iter()
        .map(|part| part.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}
