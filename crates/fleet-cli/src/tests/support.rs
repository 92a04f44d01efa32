//! Test support utilities for fleet controller coverage.
//!
//! [`FakeHost`] stands in for the operating system: it owns a fake process
//! table and port map and implements every seam the controller talks to, so
//! lifecycle scenarios run without spawning or signalling real processes.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::ffi::OsString;
use std::io::Write;
use std::rc::Rc;
use std::time::Duration;

use camino::Utf8PathBuf;
use fleet_config::{Config, RunningPolicy, ServiceDescriptor, Timings};
use rstest::fixture;
use tempfile::TempDir;

use crate::lifecycle::{
    ControllerSettings, FleetController, LifecycleError, OutputLog, PortProbe, ProcessHandle,
    ProcessMatcher, ProcessSignaller, ServiceLauncher, TerminationSignal,
};
use crate::lifecycle::select_matches;
use crate::{AppError, ConfigLoader};

/// How a fake process reacts to termination signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Resistance {
    /// Exits on SIGTERM.
    Cooperative,
    /// Ignores SIGTERM, dies on SIGKILL.
    IgnoresTerm,
    /// Survives every signal.
    Unkillable,
    /// Exits on any signal but is replaced once by a cooperative copy, like
    /// a service under a restarting supervisor.
    Respawns,
}

/// What happens when the controller launches a given service.
#[derive(Debug, Clone)]
pub(crate) struct LaunchPlan {
    /// Command line of the spawned process; defaults to the joined argv.
    pub command: Option<String>,
    pub resistance: Resistance,
    /// Refusals before the readiness port opens; `None` never opens.
    pub refusals: Option<u32>,
    /// False when the process dies before the controller can observe it.
    pub observable: bool,
}

impl Default for LaunchPlan {
    fn default() -> Self {
        Self {
            command: None,
            resistance: Resistance::Cooperative,
            refusals: Some(0),
            observable: true,
        }
    }
}

#[derive(Debug)]
struct FakeProcess {
    command: String,
    resistance: Resistance,
    port: Option<u16>,
}

#[derive(Debug, Default)]
struct HostState {
    processes: BTreeMap<u32, FakeProcess>,
    next_pid: u32,
    ports: HashMap<u16, Option<u32>>,
    plans: HashMap<String, LaunchPlan>,
    failing_builds: HashSet<String>,
    launches: Vec<String>,
    builds: Vec<String>,
    signals: Vec<(u32, TerminationSignal)>,
    probes: Vec<u16>,
}

impl HostState {
    fn spawn(&mut self, process: FakeProcess) -> u32 {
        self.next_pid += 1;
        let pid = 100 + self.next_pid;
        self.processes.insert(pid, process);
        pid
    }

    fn reap(&mut self, pid: u32) {
        if let Some(process) = self.processes.remove(&pid)
            && let Some(port) = process.port
        {
            self.ports.remove(&port);
        }
    }
}

/// Shared fake operating system.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeHost {
    state: Rc<RefCell<HostState>>,
}

impl FakeHost {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Adds a live process not started by the controller.
    pub(crate) fn spawn_process(&self, command: &str, resistance: Resistance) -> u32 {
        self.state.borrow_mut().spawn(FakeProcess {
            command: command.to_owned(),
            resistance,
            port: None,
        })
    }

    /// Adds a live process owning an open port; the port closes when the
    /// process dies.
    pub(crate) fn spawn_listening(&self, command: &str, resistance: Resistance, port: u16) -> u32 {
        let mut state = self.state.borrow_mut();
        state.ports.insert(port, Some(0));
        state.spawn(FakeProcess {
            command: command.to_owned(),
            resistance,
            port: Some(port),
        })
    }

    /// Sets how many probes `port` refuses before opening.
    pub(crate) fn set_port(&self, port: u16, refusals: Option<u32>) {
        self.state.borrow_mut().ports.insert(port, refusals);
    }

    pub(crate) fn plan_launch(&self, service: &str, plan: LaunchPlan) {
        self.state
            .borrow_mut()
            .plans
            .insert(service.to_owned(), plan);
    }

    pub(crate) fn fail_build(&self, service: &str) {
        self.state
            .borrow_mut()
            .failing_builds
            .insert(service.to_owned());
    }

    pub(crate) fn launches(&self) -> Vec<String> {
        self.state.borrow().launches.clone()
    }

    pub(crate) fn builds(&self) -> Vec<String> {
        self.state.borrow().builds.clone()
    }

    pub(crate) fn signals(&self) -> Vec<(u32, TerminationSignal)> {
        self.state.borrow().signals.clone()
    }

    pub(crate) fn probes_of(&self, port: u16) -> usize {
        self.state
            .borrow()
            .probes
            .iter()
            .filter(|probed| **probed == port)
            .count()
    }

    pub(crate) fn pids(&self) -> Vec<u32> {
        self.state.borrow().processes.keys().copied().collect()
    }

    /// Controller wired to this host.
    pub(crate) fn controller(
        &self,
        settings: ControllerSettings,
    ) -> FleetController<Self, Self, Self, Self> {
        FleetController::new(self.clone(), self.clone(), self.clone(), self.clone(), settings)
    }
}

/// Settings with zero waits and `attempts` readiness probes.
pub(crate) fn settings(attempts: u32, log_dir: &Utf8PathBuf) -> ControllerSettings {
    ControllerSettings {
        timings: Timings::immediate(attempts),
        probe_host: String::from("127.0.0.1"),
        policy: RunningPolicy::Replace,
        log_dir: Some(log_dir.join("logs")),
        tail_lines: 20,
    }
}

impl ProcessMatcher for FakeHost {
    fn find(&self, pattern: &str) -> Vec<ProcessHandle> {
        let handles: Vec<ProcessHandle> = self
            .state
            .borrow()
            .processes
            .iter()
            .map(|(pid, process)| ProcessHandle {
                pid: *pid,
                uptime: Duration::from_secs(u64::from(*pid)),
                memory_bytes: 4096,
                cpu_percent: 0.5,
                command: process.command.clone(),
            })
            .collect();
        select_matches(handles, pattern, 0)
    }
}

impl PortProbe for FakeHost {
    fn is_listening(&self, _host: &str, port: u16) -> bool {
        let mut state = self.state.borrow_mut();
        state.probes.push(port);
        match state.ports.get_mut(&port) {
            Some(Some(0)) => true,
            Some(Some(remaining)) => {
                *remaining -= 1;
                false
            }
            Some(None) | None => false,
        }
    }
}

impl ServiceLauncher for FakeHost {
    fn build(
        &self,
        service: &ServiceDescriptor,
        argv: &[String],
        log: &OutputLog,
    ) -> Result<(), LifecycleError> {
        let mut state = self.state.borrow_mut();
        state.builds.push(service.name().to_owned());
        let mut file = log.open_append()?;
        writeln!(file, "$ {}", argv.join(" ")).expect("write build log");
        if state.failing_builds.contains(service.name()) {
            writeln!(file, "compile error: undefined symbol").expect("write build log");
            return Err(LifecycleError::BuildFailed {
                service: service.name().to_owned(),
                status: String::from("exit status: 1"),
            });
        }
        Ok(())
    }

    fn launch(&self, service: &ServiceDescriptor, log: &OutputLog) -> Result<(), LifecycleError> {
        let mut state = self.state.borrow_mut();
        state.launches.push(service.name().to_owned());
        let mut file = log.open_append()?;
        writeln!(file, "{} booting", service.name()).expect("write launch log");
        let plan = state.plans.get(service.name()).cloned().unwrap_or_default();
        if !plan.observable {
            writeln!(file, "fatal: address already in use").expect("write launch log");
            return Ok(());
        }
        let command = plan
            .command
            .unwrap_or_else(|| service.start_command().join(" "));
        if let Some(port) = service.readiness_port() {
            state.ports.insert(port, plan.refusals);
        }
        state.spawn(FakeProcess {
            command,
            resistance: plan.resistance,
            port: service.readiness_port(),
        });
        Ok(())
    }
}

impl ProcessSignaller for FakeHost {
    fn signal(&self, pid: u32, signal: TerminationSignal) -> Result<(), LifecycleError> {
        let mut state = self.state.borrow_mut();
        state.signals.push((pid, signal));
        let Some((resistance, command)) = state
            .processes
            .get(&pid)
            .map(|process| (process.resistance, process.command.clone()))
        else {
            return Ok(());
        };
        let dies = match (resistance, signal) {
            (Resistance::Respawns, _) => {
                state.reap(pid);
                state.spawn(FakeProcess {
                    command,
                    resistance: Resistance::Cooperative,
                    port: None,
                });
                return Ok(());
            }
            (Resistance::Cooperative, _) => true,
            (Resistance::IgnoresTerm, TerminationSignal::Forceful) => true,
            (Resistance::IgnoresTerm, TerminationSignal::Graceful)
            | (Resistance::Unkillable, _) => false,
        };
        if dies {
            state.reap(pid);
        }
        Ok(())
    }
}

/// Scratch directory doubling as fleet root and log directory.
#[fixture]
pub(crate) fn scratch() -> (TempDir, Utf8PathBuf) {
    let dir = TempDir::new().expect("temp dir");
    let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf8 temp dir");
    (dir, path)
}

/// Descriptor whose working directory exists under `root`.
pub(crate) fn service(root: &Utf8PathBuf, name: &str, pattern: &str) -> ServiceDescriptor {
    let dir = root.join(name);
    std::fs::create_dir_all(&dir).expect("create working directory");
    ServiceDescriptor::new(
        name,
        pattern,
        dir,
        pattern.split_whitespace().map(str::to_owned).collect(),
    )
}

/// Loader returning a fixed configuration.
pub(crate) struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    pub(crate) fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self, _args: &[OsString]) -> Result<Config, AppError> {
        Ok(self.config.clone())
    }
}
