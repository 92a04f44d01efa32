//! Read-only fleet status snapshots.
//!
//! Status is a composition of the process matcher and the port probe. It
//! never signals, launches or writes anything, so it is safe to run while
//! another invocation is starting or stopping services; transient states are
//! reported exactly as observed.

use fleet_config::{Fleet, ServiceDescriptor};
use serde::Serialize;

use crate::lifecycle::{PortProbe, ProcessHandle, ProcessMatcher};

/// Observed state of one service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceState {
    Running,
    NotRunning,
}

/// Readiness port and whether it accepted a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PortStatus {
    pub port: u16,
    pub listening: bool,
}

/// Snapshot of one service at the time of the query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceStatus {
    pub service: String,
    pub state: ServiceState,
    pub processes: Vec<ProcessHandle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<PortStatus>,
    /// More than one live process matches the identity pattern.
    pub duplicate: bool,
}

impl ServiceStatus {
    pub fn is_running(&self) -> bool {
        self.state == ServiceState::Running
    }
}

/// Builds status snapshots from a matcher and a probe.
pub struct StatusReporter<'a, M: ?Sized, P: ?Sized> {
    matcher: &'a M,
    probe: &'a P,
    host: &'a str,
}

impl<'a, M, P> StatusReporter<'a, M, P>
where
    M: ProcessMatcher + ?Sized,
    P: PortProbe + ?Sized,
{
    pub fn new(matcher: &'a M, probe: &'a P, host: &'a str) -> Self {
        Self {
            matcher,
            probe,
            host,
        }
    }

    /// Reports one service.
    pub fn service(&self, service: &ServiceDescriptor) -> ServiceStatus {
        let processes = self.matcher.find(service.identity_pattern());
        let state = if processes.is_empty() {
            ServiceState::NotRunning
        } else {
            ServiceState::Running
        };
        let port = service.readiness_port().map(|port| PortStatus {
            port,
            listening: self.probe.is_listening(self.host, port),
        });
        ServiceStatus {
            service: service.name().to_owned(),
            state,
            duplicate: processes.len() > 1,
            processes,
            port,
        }
    }

    /// Reports every service in declaration order.
    pub fn fleet(&self, fleet: &Fleet) -> Vec<ServiceStatus> {
        fleet
            .services()
            .iter()
            .map(|service| self.service(service))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::support::{FakeHost, Resistance};

    fn api() -> ServiceDescriptor {
        ServiceDescriptor::new(
            "api",
            "apiserver --mode x",
            "/srv/api",
            vec![String::from("apiserver"), String::from("--mode"), String::from("x")],
        )
        .with_readiness_port(8040)
    }

    #[test]
    fn absent_service_is_not_running() {
        let host = FakeHost::new();
        let status = StatusReporter::new(&host, &host, "127.0.0.1").service(&api());
        assert_eq!(status.state, ServiceState::NotRunning);
        assert!(status.processes.is_empty());
        assert_eq!(
            status.port,
            Some(PortStatus {
                port: 8040,
                listening: false
            })
        );
        assert!(!status.duplicate);
    }

    #[test]
    fn duplicates_are_flagged_not_removed() {
        let host = FakeHost::new();
        let first = host.spawn_process("apiserver --mode x", Resistance::Cooperative);
        let second = host.spawn_process("apiserver --mode x --verbose", Resistance::Cooperative);
        host.set_port(8040, Some(0));

        let status = StatusReporter::new(&host, &host, "127.0.0.1").service(&api());
        assert!(status.is_running());
        assert!(status.duplicate);
        let pids: Vec<u32> = status.processes.iter().map(|handle| handle.pid).collect();
        assert_eq!(pids, [first, second]);
        assert!(status.port.is_some_and(|port| port.listening));
        assert!(host.signals().is_empty());
        assert!(host.launches().is_empty());
    }

    #[test]
    fn serialises_state_in_snake_case() {
        let host = FakeHost::new();
        let status = StatusReporter::new(&host, &host, "127.0.0.1").service(&api());
        let json = serde_json::to_value(&status).expect("serialise status");
        assert_eq!(json["state"], "not_running");
        assert_eq!(json["port"]["port"], 8040);
    }
}
