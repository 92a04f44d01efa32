//! Service termination with graceful-then-forceful escalation.
//!
//! Every process matching the identity pattern first receives SIGTERM. After
//! the grace period the table is checked again; survivors receive SIGKILL and
//! are checked once more after a short wait.

#[cfg(unix)]
use std::io;
use std::thread;

use fleet_config::{ServiceDescriptor, Timings};
use tracing::{info, warn};

use super::error::LifecycleError;
use super::matcher::ProcessMatcher;

const SHUTDOWN_TARGET: &str = "fleetctl::lifecycle";

/// Signals used by the escalation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationSignal {
    /// SIGTERM: lets the service flush buffers and close sockets.
    Graceful,
    /// SIGKILL: cannot be caught or ignored.
    Forceful,
}

/// Delivers termination signals to processes.
pub trait ProcessSignaller {
    /// Sends `signal` to `pid`. A process that has already exited is not an
    /// error.
    fn signal(&self, pid: u32, signal: TerminationSignal) -> Result<(), LifecycleError>;
}

/// Signaller using `kill(2)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemSignaller;

impl ProcessSignaller for SystemSignaller {
    fn signal(&self, pid: u32, signal: TerminationSignal) -> Result<(), LifecycleError> {
        send_signal(pid, signal)
    }
}

/// How a stop attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StopReport {
    /// Nothing matched the identity pattern.
    AlreadyStopped,
    /// Every match exited after the graceful signal.
    Stopped { pids: Vec<u32> },
    /// Matches survived the grace period and were killed.
    ForcedStop { pids: Vec<u32> },
    /// Matches survived the forceful signal.
    StillRunning { pids: Vec<u32> },
}

/// Stops every process matching `service`'s identity pattern.
pub(crate) fn stop_service<M, S>(
    service: &ServiceDescriptor,
    matcher: &M,
    signaller: &S,
    timings: &Timings,
) -> StopReport
where
    M: ProcessMatcher + ?Sized,
    S: ProcessSignaller + ?Sized,
{
    let pattern = service.identity_pattern();
    let pids = matching_pids(matcher, pattern);
    if pids.is_empty() {
        return StopReport::AlreadyStopped;
    }

    info!(target: SHUTDOWN_TARGET, service = service.name(), ?pids, "sending graceful signal");
    signal_all(signaller, &pids, TerminationSignal::Graceful);
    thread::sleep(timings.grace_period);
    let survivors = matching_pids(matcher, pattern);
    if survivors.is_empty() {
        return StopReport::Stopped { pids };
    }

    // Only processes that already had their grace period are killed;
    // instances that appeared meanwhile get the graceful signal first.
    let (stubborn, newcomers): (Vec<u32>, Vec<u32>) =
        survivors.into_iter().partition(|pid| pids.contains(pid));
    if !newcomers.is_empty() {
        info!(
            target: SHUTDOWN_TARGET,
            service = service.name(),
            pids = ?newcomers,
            "new instances appeared during grace period"
        );
        signal_all(signaller, &newcomers, TerminationSignal::Graceful);
    }
    if !stubborn.is_empty() {
        warn!(
            target: SHUTDOWN_TARGET,
            service = service.name(),
            pids = ?stubborn,
            grace_ms = timings.grace_period.as_millis(),
            "service ignored graceful signal; escalating"
        );
        signal_all(signaller, &stubborn, TerminationSignal::Forceful);
    }
    thread::sleep(timings.kill_wait);
    let remaining = matching_pids(matcher, pattern);
    if !remaining.is_empty() {
        return StopReport::StillRunning { pids: remaining };
    }
    let forced = !stubborn.is_empty();
    let mut stopped = pids;
    stopped.extend(newcomers);
    if forced {
        StopReport::ForcedStop { pids: stopped }
    } else {
        StopReport::Stopped { pids: stopped }
    }
}

fn matching_pids<M: ProcessMatcher + ?Sized>(matcher: &M, pattern: &str) -> Vec<u32> {
    matcher
        .find(pattern)
        .into_iter()
        .map(|handle| handle.pid)
        .collect()
}

fn signal_all<S: ProcessSignaller + ?Sized>(
    signaller: &S,
    pids: &[u32],
    signal: TerminationSignal,
) {
    for &pid in pids {
        if let Err(error) = signaller.signal(pid, signal) {
            // The re-check decides the outcome; a failed delivery only shows
            // up as a survivor.
            warn!(target: SHUTDOWN_TARGET, pid, ?signal, %error, "signal delivery failed");
        }
    }
}

/// Sends a termination signal to `pid`.
///
/// # Platform Support
///
/// - **Unix**: uses `kill(2)` with SIGTERM or SIGKILL.
/// - **Non-Unix**: returns `UnsupportedPlatform`.
///
/// # Errors
///
/// Returns an error if:
/// - `pid` is zero (which would address the caller's process group) or does
///   not fit a `pid_t` (`InvalidPid`)
/// - the signal cannot be delivered for a reason other than the process
///   having already exited (`SignalFailed`), typically EPERM
pub(crate) fn send_signal(pid: u32, signal: TerminationSignal) -> Result<(), LifecycleError> {
    if pid == 0 {
        return Err(LifecycleError::InvalidPid {
            pid,
            reason: "pid 0 addresses the whole process group",
        });
    }
    let Ok(raw_pid) = i32::try_from(pid) else {
        return Err(LifecycleError::InvalidPid {
            pid,
            reason: "pid exceeds the platform pid range",
        });
    };
    deliver(pid, raw_pid, signal)
}

#[cfg(unix)]
fn deliver(pid: u32, raw_pid: i32, signal: TerminationSignal) -> Result<(), LifecycleError> {
    let raw_signal = match signal {
        TerminationSignal::Graceful => libc::SIGTERM,
        TerminationSignal::Forceful => libc::SIGKILL,
    };
    // SAFETY: `kill(2)` is memory-safe even when the PID is invalid; the
    // kernel simply returns an error.
    let result = unsafe { libc::kill(raw_pid as libc::pid_t, raw_signal) };
    if result == 0 {
        return Ok(());
    }
    let source = io::Error::last_os_error();
    if source.raw_os_error() == Some(libc::ESRCH) {
        // Exited between the table scan and the signal.
        return Ok(());
    }
    Err(LifecycleError::SignalFailed { pid, source })
}

#[cfg(not(unix))]
fn deliver(_pid: u32, _raw_pid: i32, _signal: TerminationSignal) -> Result<(), LifecycleError> {
    Err(LifecycleError::UnsupportedPlatform)
}
