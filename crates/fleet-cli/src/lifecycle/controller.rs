//! High-level orchestration for fleet lifecycle commands.
//!
//! This module wires the start/stop/status flows together using the matcher,
//! probe, launcher and signaller seams, so the CLI drives a single entrypoint
//! whether it talks to the real operating system or a test double.

use std::io::Write;
use std::process::ExitCode;
use std::thread;

use camino::Utf8PathBuf;
use fleet_config::{Config, Fleet, RunningPolicy, ServiceDescriptor, Timings};
use tracing::{info, warn};

use super::error::LifecycleError;
use super::matcher::{ProcessMatcher, SystemProcessMatcher};
use super::monitoring::{ReadinessPoll, is_ready, wait_for_port};
use super::output_log::OutputLog;
use super::probe::{PortProbe, TcpPortProbe};
use super::shutdown::{ProcessSignaller, StopReport, SystemSignaller, stop_service};
use super::spawning::{ServiceLauncher, SystemLauncher};
use super::types::{LifecycleCommand, LifecycleContext, LifecycleOutput, LifecycleResult, Outcome};
use crate::output::{write_results, write_statuses};
use crate::status::{ServiceStatus, StatusReporter};

const LIFECYCLE_TARGET: &str = "fleetctl::lifecycle";

/// Knobs the controller reads on every operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerSettings {
    pub timings: Timings,
    /// Host used for readiness probes.
    pub probe_host: String,
    pub policy: RunningPolicy,
    /// Overrides the per-service log location when set.
    pub log_dir: Option<Utf8PathBuf>,
    pub tail_lines: usize,
}

impl ControllerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            timings: config.timings(),
            probe_host: config.probe_host().to_owned(),
            policy: config.on_running,
            log_dir: config.log_dir().map(Utf8PathBuf::from),
            tail_lines: config.log_tail_lines,
        }
    }
}

/// Drives services through start, stop and status.
pub struct FleetController<M, P, L, S> {
    matcher: M,
    probe: P,
    launcher: L,
    signaller: S,
    settings: ControllerSettings,
}

/// Controller bound to the real process table, network and signals.
pub type SystemController =
    FleetController<SystemProcessMatcher, TcpPortProbe, SystemLauncher, SystemSignaller>;

impl SystemController {
    /// Builds the production controller for `command`.
    ///
    /// Only `status` samples CPU usage; the sample costs one refresh
    /// interval and lifecycle checks never look at the figure.
    pub fn system(config: &Config, command: LifecycleCommand) -> Self {
        let matcher = match command {
            LifecycleCommand::Status => SystemProcessMatcher::new().with_cpu_sampling(),
            LifecycleCommand::Start | LifecycleCommand::Stop => SystemProcessMatcher::new(),
        };
        let settings = ControllerSettings::from_config(config);
        let probe = TcpPortProbe::new(settings.timings.probe_timeout);
        FleetController::new(matcher, probe, SystemLauncher, SystemSignaller, settings)
    }
}

impl<M, P, L, S> FleetController<M, P, L, S>
where
    M: ProcessMatcher,
    P: PortProbe,
    L: ServiceLauncher,
    S: ProcessSignaller,
{
    pub fn new(
        matcher: M,
        probe: P,
        launcher: L,
        signaller: S,
        settings: ControllerSettings,
    ) -> Self {
        Self {
            matcher,
            probe,
            launcher,
            signaller,
            settings,
        }
    }

    pub fn handle<W: Write, E: Write>(
        &self,
        command: LifecycleCommand,
        context: LifecycleContext<'_>,
        output: &mut LifecycleOutput<W, E>,
    ) -> Result<ExitCode, LifecycleError> {
        let results = match command {
            LifecycleCommand::Start => self.start_fleet(context.fleet),
            LifecycleCommand::Stop => self.stop_fleet(context.fleet),
            LifecycleCommand::Status => {
                let statuses = self.status(context.fleet);
                write_statuses(output, context.format, &statuses)?;
                return Ok(ExitCode::SUCCESS);
            }
        };
        write_results(output, context.format, command, &results)?;
        if results.iter().any(|result| result.outcome.is_failure()) {
            return Ok(ExitCode::FAILURE);
        }
        Ok(ExitCode::SUCCESS)
    }

    /// Starts every service in dependency order.
    ///
    /// A failure never aborts the run: independent services still start and
    /// dependants are refused by their own dependency gate.
    pub fn start_fleet(&self, fleet: &Fleet) -> Vec<LifecycleResult> {
        fleet
            .start_order()
            .map(|service| self.start(fleet, service))
            .collect()
    }

    /// Stops every service independently, in declaration order.
    pub fn stop_fleet(&self, fleet: &Fleet) -> Vec<LifecycleResult> {
        fleet
            .services()
            .iter()
            .map(|service| self.stop(service))
            .collect()
    }

    /// Snapshots every service without changing anything.
    pub fn status(&self, fleet: &Fleet) -> Vec<ServiceStatus> {
        StatusReporter::new(&self.matcher, &self.probe, &self.settings.probe_host).fleet(fleet)
    }

    pub fn start(&self, fleet: &Fleet, service: &ServiceDescriptor) -> LifecycleResult {
        let log = self.log_for(service);
        if let Err(error) = self.preflight(fleet, service) {
            warn!(target: LIFECYCLE_TARGET, service = service.name(), %error, "start refused");
            let tail = self.refusal_tail(fleet, &error, &log);
            return LifecycleResult::failed(service, Outcome::StartFailed, &error, tail);
        }
        match self.bring_up(service, &log) {
            Ok(result) => result,
            Err(error) => {
                warn!(target: LIFECYCLE_TARGET, service = service.name(), %error, "start failed");
                let tail = log.tail(self.settings.tail_lines);
                LifecycleResult::failed(service, Outcome::StartFailed, &error, tail)
            }
        }
    }

    pub fn stop(&self, service: &ServiceDescriptor) -> LifecycleResult {
        let report = stop_service(service, &self.matcher, &self.signaller, &self.settings.timings);
        match report {
            StopReport::AlreadyStopped => {
                LifecycleResult::new(service, Outcome::AlreadyStopped, "no matching process")
            }
            StopReport::Stopped { pids } => LifecycleResult::new(
                service,
                Outcome::Stopped,
                format!("pids {}", join_pids(&pids)),
            ),
            StopReport::ForcedStop { pids } => LifecycleResult::new(
                service,
                Outcome::ForcedStop,
                format!("pids {} ignored SIGTERM", join_pids(&pids)),
            ),
            StopReport::StillRunning { pids } => {
                let error = LifecycleError::SurvivedKill {
                    service: service.name().to_owned(),
                    pids,
                };
                warn!(target: LIFECYCLE_TARGET, service = service.name(), %error, "stop failed");
                let tail = self.log_for(service).tail(self.settings.tail_lines);
                LifecycleResult::failed(service, Outcome::StopFailed, &error, tail)
            }
        }
    }

    /// Checks that need no side effects: dependency readiness and the
    /// working directory.
    fn preflight(&self, fleet: &Fleet, service: &ServiceDescriptor) -> Result<(), LifecycleError> {
        if let Some(dependency) = service.depends_on() {
            let Some(predecessor) = fleet.get(dependency) else {
                return Err(LifecycleError::UnknownDependency {
                    service: service.name().to_owned(),
                    dependency: dependency.to_owned(),
                });
            };
            if !is_ready(predecessor, &self.matcher, &self.probe, &self.settings.probe_host) {
                return Err(LifecycleError::DependencyNotReady {
                    service: service.name().to_owned(),
                    dependency: dependency.to_owned(),
                });
            }
        }
        if !service.working_directory().is_dir() {
            return Err(LifecycleError::MissingWorkingDirectory {
                service: service.name().to_owned(),
                path: service.working_directory().to_path_buf(),
            });
        }
        Ok(())
    }

    fn bring_up(
        &self,
        service: &ServiceDescriptor,
        log: &OutputLog,
    ) -> Result<LifecycleResult, LifecycleError> {
        log.banner("start")?;
        if let Some(build) = service.build_command() {
            self.launcher.build(service, build, log)?;
        }
        if let Some(result) = self.reconcile_running(service)? {
            return Ok(result);
        }

        self.launcher.launch(service, log)?;
        thread::sleep(self.settings.timings.settle);
        let launched = self.matcher.find(service.identity_pattern());
        if launched.is_empty() {
            return Err(LifecycleError::ProcessNotObserved {
                service: service.name().to_owned(),
            });
        }
        let pids: Vec<u32> = launched.iter().map(|handle| handle.pid).collect();

        let Some(port) = service.readiness_port() else {
            info!(target: LIFECYCLE_TARGET, service = service.name(), ?pids, "service started");
            return Ok(LifecycleResult::new(
                service,
                Outcome::Started,
                format!("pids {}", join_pids(&pids)),
            ));
        };
        let timings = &self.settings.timings;
        let poll = ReadinessPoll {
            attempts: timings.readiness_attempts,
            interval: timings.readiness_interval,
        };
        let attempt = wait_for_port(&self.probe, service, &self.settings.probe_host, port, poll)?;
        info!(
            target: LIFECYCLE_TARGET,
            service = service.name(),
            ?pids,
            port,
            attempt,
            "service started"
        );
        Ok(LifecycleResult::new(
            service,
            Outcome::Started,
            format!("pids {}, listening on {port}", join_pids(&pids)),
        ))
    }

    /// Applies the running-instance policy to a live instance, if any.
    ///
    /// Returns a finished result when the live instance is kept.
    fn reconcile_running(
        &self,
        service: &ServiceDescriptor,
    ) -> Result<Option<LifecycleResult>, LifecycleError> {
        let live = self.matcher.find(service.identity_pattern());
        if live.is_empty() {
            return Ok(None);
        }
        let pids: Vec<u32> = live.iter().map(|handle| handle.pid).collect();
        if self.settings.policy == RunningPolicy::Keep
            && is_ready(service, &self.matcher, &self.probe, &self.settings.probe_host)
        {
            info!(
                target: LIFECYCLE_TARGET,
                service = service.name(),
                ?pids,
                "keeping live instance"
            );
            return Ok(Some(LifecycleResult::new(
                service,
                Outcome::AlreadyRunning,
                format!("pids {}", join_pids(&pids)),
            )));
        }
        info!(target: LIFECYCLE_TARGET, service = service.name(), ?pids, "replacing live instance");
        match stop_service(service, &self.matcher, &self.signaller, &self.settings.timings) {
            StopReport::StillRunning { pids } => Err(LifecycleError::StaleInstance {
                service: service.name().to_owned(),
                pids,
            }),
            StopReport::AlreadyStopped
            | StopReport::Stopped { .. }
            | StopReport::ForcedStop { .. } => Ok(None),
        }
    }

    /// A dependency refusal shows the predecessor's output; anything else
    /// shows the service's own.
    fn refusal_tail(&self, fleet: &Fleet, error: &LifecycleError, own: &OutputLog) -> String {
        let predecessor = match error {
            LifecycleError::DependencyNotReady { dependency, .. } => fleet.get(dependency),
            _ => None,
        };
        match predecessor {
            Some(predecessor) => self.log_for(predecessor).tail(self.settings.tail_lines),
            None => own.tail(self.settings.tail_lines),
        }
    }

    fn log_for(&self, service: &ServiceDescriptor) -> OutputLog {
        OutputLog::for_service(service, self.settings.log_dir.as_deref())
    }
}

fn join_pids(pids: &[u32]) -> String {
    pids.iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
