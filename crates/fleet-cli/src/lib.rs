//! Command-line runtime for `fleetctl`.
//!
//! The module owns argument parsing, configuration bootstrapping, telemetry
//! and dispatch to the fleet controller. The interface is designed to be
//! exercised both from the binary entrypoint and from tests where
//! configuration loading, IO streams and the controller can be substituted.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use clap::error::ErrorKind;
use fleet_config::Config;

mod cli;
mod config;
mod errors;
mod lifecycle;
pub mod output;
mod status;
mod telemetry;

pub(crate) use cli::{Cli, CliCommand};
use config::{ConfigArgumentSplit, split_config_arguments};
pub(crate) use config::{ConfigLoader, OrthoConfigLoader};
pub(crate) use errors::AppError;
use lifecycle::{
    LifecycleCommand, LifecycleContext, LifecycleError, LifecycleOutput, SystemController,
};

/// CLI flags recognised by the configuration loader.
///
/// MAINTENANCE: This list must be kept in sync with the fields of
/// `fleet_config::Config`. When adding new configuration options, update
/// this array accordingly.
const CONFIG_CLI_FLAGS: &[&str] = &[
    "--config-path",
    "--fleet-root",
    "--log-dir",
    "--python-bin",
    "--bind-host",
    "--probe-host",
    "--bridge-port",
    "--api-port",
    "--mcp-port",
    "--grace-period-ms",
    "--kill-wait-ms",
    "--settle-ms",
    "--readiness-interval-ms",
    "--readiness-attempts",
    "--probe-timeout-ms",
    "--log-tail-lines",
    "--on-running",
    "--log-filter",
    "--log-format",
];

/// Bundles the IO streams provided to the CLI runtime.
pub(crate) struct IoStreams<'a, W: Write, E: Write> {
    pub(crate) stdout: &'a mut W,
    pub(crate) stderr: &'a mut E,
    stdout_is_terminal: bool,
}

impl<'a, W: Write, E: Write> IoStreams<'a, W, E> {
    pub(crate) fn new(stdout: &'a mut W, stderr: &'a mut E, stdout_is_terminal: bool) -> Self {
        Self {
            stdout,
            stderr,
            stdout_is_terminal,
        }
    }
}

struct CliRunner<'a, 'io, W: Write, E: Write, L: ConfigLoader> {
    io: &'a mut IoStreams<'io, W, E>,
    loader: &'a L,
}

impl<'a, 'io, W, E, L> CliRunner<'a, 'io, W, E, L>
where
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    fn new(io: &'a mut IoStreams<'io, W, E>, loader: &'a L) -> Self {
        Self { io, loader }
    }

    fn run<I>(&mut self, args: I) -> ExitCode
    where
        I: IntoIterator<Item = OsString>,
    {
        self.run_with_handler(args, |command, config, context, output| {
            SystemController::system(config, command).handle(command, context, output)
        })
    }

    fn run_with_handler<I, F>(&mut self, args: I, mut handler: F) -> ExitCode
    where
        I: IntoIterator<Item = OsString>,
        F: FnMut(
            LifecycleCommand,
            &Config,
            LifecycleContext<'_>,
            &mut LifecycleOutput<&mut W, &mut E>,
        ) -> Result<ExitCode, LifecycleError>,
    {
        let args: Vec<OsString> = args.into_iter().collect();
        let split = split_config_arguments(&args);
        let cli_arguments = prepare_cli_arguments(&args, &split);

        let cli = match Cli::try_parse_from(cli_arguments) {
            Ok(cli) => cli,
            Err(error) => return self.report_usage(error),
        };

        let result = self
            .loader
            .load(&split.config_arguments)
            .and_then(|config| {
                telemetry::initialise(&config)?;
                let fleet = config.fleet()?;
                Ok((config, fleet))
            })
            .and_then(|(config, fleet)| {
                let command = LifecycleCommand::from(cli.command);
                let context = LifecycleContext {
                    fleet: &fleet,
                    format: cli.output.resolve(self.io.stdout_is_terminal),
                };
                let mut output = LifecycleOutput::new(&mut *self.io.stdout, &mut *self.io.stderr);
                handler(command, &config, context, &mut output).map_err(AppError::from)
            });

        match result {
            Ok(exit_code) => exit_code,
            Err(error) => {
                let _ = writeln!(self.io.stderr, "{error}");
                ExitCode::FAILURE
            }
        }
    }

    /// Help and version requests go to stdout and succeed; genuine usage
    /// errors go to stderr and fail.
    fn report_usage(&mut self, error: clap::Error) -> ExitCode {
        match error.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                let _ = write!(self.io.stdout, "{}", error.render());
                ExitCode::SUCCESS
            }
            _ => {
                let _ = write!(self.io.stderr, "{}", AppError::CliUsage(error));
                ExitCode::FAILURE
            }
        }
    }
}

fn prepare_cli_arguments(args: &[OsString], split: &ConfigArgumentSplit) -> Vec<OsString> {
    let mut cli_arguments: Vec<OsString> = Vec::new();
    if let Some(first) = args.first() {
        cli_arguments.push(first.clone());
    }
    if let Some(rest) = args.get(split.command_start..) {
        cli_arguments.extend(rest.iter().cloned());
    }
    cli_arguments
}

/// Runs the CLI using the provided arguments and IO handles.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E, stdout_is_terminal: bool) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let mut io = IoStreams::new(stdout, stderr, stdout_is_terminal);
    run_with_loader(args, &mut io, &OrthoConfigLoader)
}

/// Runs the CLI with a custom configuration loader.
#[must_use]
pub(crate) fn run_with_loader<I, W, E, L>(
    args: I,
    io: &mut IoStreams<'_, W, E>,
    loader: &L,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    CliRunner::new(io, loader).run(args)
}

/// Runs the CLI with a custom configuration loader and lifecycle handler.
#[cfg(test)]
pub(crate) fn run_with_handler<I, W, E, L, F>(
    args: I,
    io: &mut IoStreams<'_, W, E>,
    loader: &L,
    handler: F,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
    F: FnMut(
        LifecycleCommand,
        &Config,
        LifecycleContext<'_>,
        &mut LifecycleOutput<&mut W, &mut E>,
    ) -> Result<ExitCode, LifecycleError>,
{
    CliRunner::new(io, loader).run_with_handler(args, handler)
}

#[cfg(test)]
mod tests;
