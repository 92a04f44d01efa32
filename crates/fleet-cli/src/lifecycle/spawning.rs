//! Build steps and detached service launches.
//!
//! Launches are fire-and-forget: the child is placed in its own process
//! group with output appended to the service log, and the controller drops
//! the handle immediately. Later operations find the service again through
//! the process matcher.

use std::fs::File;
use std::process::{Command, Stdio};

use fleet_config::ServiceDescriptor;
use tracing::{debug, info};

use super::error::LifecycleError;
use super::output_log::OutputLog;

const SPAWN_TARGET: &str = "fleetctl::lifecycle";

/// Runs build steps and launches services.
pub trait ServiceLauncher {
    /// Runs `argv` to completion in the service's working directory.
    fn build(
        &self,
        service: &ServiceDescriptor,
        argv: &[String],
        log: &OutputLog,
    ) -> Result<(), LifecycleError>;

    /// Starts the service's start command without waiting for it.
    fn launch(&self, service: &ServiceDescriptor, log: &OutputLog) -> Result<(), LifecycleError>;
}

/// Launcher spawning real operating system processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLauncher;

impl ServiceLauncher for SystemLauncher {
    fn build(
        &self,
        service: &ServiceDescriptor,
        argv: &[String],
        log: &OutputLog,
    ) -> Result<(), LifecycleError> {
        let (mut command, program) = prepare_command(service, argv, log)?;
        info!(target: SPAWN_TARGET, service = service.name(), program, "running build step");
        let status = command
            .status()
            .map_err(|source| LifecycleError::BuildSpawn {
                service: service.name().to_owned(),
                program: program.clone(),
                source,
            })?;
        if status.success() {
            return Ok(());
        }
        Err(LifecycleError::BuildFailed {
            service: service.name().to_owned(),
            status: status.to_string(),
        })
    }

    fn launch(&self, service: &ServiceDescriptor, log: &OutputLog) -> Result<(), LifecycleError> {
        let (mut command, program) = prepare_command(service, service.start_command(), log)?;
        detach(&mut command);
        let child = command
            .spawn()
            .map_err(|source| LifecycleError::LaunchFailed {
                service: service.name().to_owned(),
                program,
                source,
            })?;
        info!(
            target: SPAWN_TARGET,
            service = service.name(),
            pid = child.id(),
            log = %log.path(),
            "launched detached service"
        );
        // Never waited on: the service must outlive this invocation.
        drop(child);
        Ok(())
    }
}

fn prepare_command(
    service: &ServiceDescriptor,
    argv: &[String],
    log: &OutputLog,
) -> Result<(Command, String), LifecycleError> {
    let Some((program, arguments)) = argv.split_first() else {
        return Err(LifecycleError::EmptyCommand {
            service: service.name().to_owned(),
        });
    };
    let stdout = log.open_append()?;
    let stderr = clone_log(&stdout, log)?;
    let mut command = Command::new(program);
    command
        .args(arguments)
        .current_dir(service.working_directory())
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(stderr));
    debug!(
        target: SPAWN_TARGET,
        service = service.name(),
        argv = ?argv,
        cwd = %service.working_directory(),
        "prepared command"
    );
    Ok((command, program.clone()))
}

fn clone_log(file: &File, log: &OutputLog) -> Result<File, LifecycleError> {
    file.try_clone().map_err(|source| LifecycleError::OutputLog {
        path: log.path().to_path_buf(),
        source,
    })
}

#[cfg(unix)]
fn detach(command: &mut Command) {
    use std::os::unix::process::CommandExt;

    // A fresh process group keeps terminal signals aimed at the controller
    // away from the service.
    command.process_group(0);
}

#[cfg(not(unix))]
fn detach(_command: &mut Command) {}
