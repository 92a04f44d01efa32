//! CLI argument definitions for `fleetctl`.
//!
//! Only the output switch and the command live here. Configuration flags are
//! split off before parsing and handed to the configuration loader.

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;

const CONFIG_HELP: &str = "\
Configuration flags must precede the command:
  --config-path <PATH>   --fleet-root <DIR>        --log-dir <DIR>
  --python-bin <BIN>     --bind-host <HOST>        --probe-host <HOST>
  --bridge-port <PORT>   --api-port <PORT>         --mcp-port <PORT>
  --grace-period-ms <MS> --kill-wait-ms <MS>       --settle-ms <MS>
  --readiness-interval-ms <MS>  --readiness-attempts <N>  --probe-timeout-ms <MS>
  --log-tail-lines <N>   --on-running <replace|keep>
  --log-filter <FILTER>  --log-format <compact|json>
Each flag can also be set through a FLEET_* environment variable.";

/// Local control plane for the bridge, HTTP API and protocol server fleet.
#[derive(Parser, Debug)]
#[command(
    name = "fleetctl",
    version,
    disable_help_subcommand = true,
    after_help = CONFIG_HELP
)]
pub(crate) struct Cli {
    /// Controls how results are rendered.
    #[arg(long, value_enum, default_value_t = OutputFormat::Auto)]
    pub(crate) output: OutputFormat,
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

/// Fleet lifecycle commands.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CliCommand {
    /// Builds and starts every service in dependency order.
    Start,
    /// Stops every service, escalating to SIGKILL when needed.
    Stop,
    /// Reports processes, resource usage and port state.
    Status,
}
