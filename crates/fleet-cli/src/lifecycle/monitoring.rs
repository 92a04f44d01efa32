//! Readiness checks for launched services.
//!
//! A service is ready when at least one process matches its identity pattern
//! and, if it declares a readiness port, that port accepts TCP connections.

use std::thread;
use std::time::Duration;

use fleet_config::ServiceDescriptor;
use tracing::{debug, info};

use super::error::LifecycleError;
use super::matcher::ProcessMatcher;
use super::probe::PortProbe;

const MONITOR_TARGET: &str = "fleetctl::probe";

/// Bounded polling schedule for a readiness port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ReadinessPoll {
    /// Number of probes; a value of zero still probes once.
    pub attempts: u32,
    /// Pause between consecutive probes.
    pub interval: Duration,
}

impl ReadinessPoll {
    pub(crate) const fn effective_attempts(self) -> u32 {
        if self.attempts == 0 { 1 } else { self.attempts }
    }
}

/// Polls `host:port` until it accepts connections.
///
/// Probes exactly `poll.attempts` times, sleeping `poll.interval` between
/// probes but never after the last one. Returns the attempt number that
/// succeeded.
///
/// # Errors
///
/// Returns `ProbeTimeout` when every attempt is refused.
pub(crate) fn wait_for_port<P: PortProbe + ?Sized>(
    probe: &P,
    service: &ServiceDescriptor,
    host: &str,
    port: u16,
    poll: ReadinessPoll,
) -> Result<u32, LifecycleError> {
    let attempts = poll.effective_attempts();
    for attempt in 1..=attempts {
        if probe.is_listening(host, port) {
            info!(
                target: MONITOR_TARGET,
                service = service.name(),
                port,
                attempt,
                "readiness port accepting connections"
            );
            return Ok(attempt);
        }
        debug!(
            target: MONITOR_TARGET,
            service = service.name(),
            port,
            attempt,
            attempts,
            "readiness port not yet open"
        );
        if attempt < attempts {
            thread::sleep(poll.interval);
        }
    }
    Err(LifecycleError::ProbeTimeout {
        service: service.name().to_owned(),
        host: host.to_owned(),
        port,
        attempts,
    })
}

/// Live readiness check: matched in the process table and, when a port is
/// declared, listening on it.
pub(crate) fn is_ready<M, P>(
    service: &ServiceDescriptor,
    matcher: &M,
    probe: &P,
    host: &str,
) -> bool
where
    M: ProcessMatcher + ?Sized,
    P: PortProbe + ?Sized,
{
    if !matcher.is_running(service.identity_pattern()) {
        return false;
    }
    service
        .readiness_port()
        .is_none_or(|port| probe.is_listening(host, port))
}
