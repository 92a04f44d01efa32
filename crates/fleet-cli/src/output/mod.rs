//! Rendering of lifecycle results and status snapshots.
//!
//! Human output is a line per service (with the log tail indented under
//! failures) or an aligned status table. JSON output wraps the same data in
//! a small envelope so scripts can tell commands apart.

mod render;

use std::io::Write;

use clap::ValueEnum;
use serde::Serialize;

use crate::lifecycle::{LifecycleCommand, LifecycleError, LifecycleOutput, LifecycleResult};
use crate::status::ServiceStatus;

/// Output format selection for lifecycle commands.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    /// Selects `human` for terminal output and `json` for redirected output.
    #[default]
    Auto,
    /// Always render human-readable output.
    Human,
    /// Always emit JSON.
    Json,
}

/// Output format after resolving `auto` based on TTY detection.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResolvedOutputFormat {
    /// Human-readable lines and tables.
    Human,
    /// Pretty-printed JSON documents.
    Json,
}

impl OutputFormat {
    /// Resolves the output format based on whether stdout is a terminal.
    #[must_use]
    pub fn resolve(self, stdout_is_terminal: bool) -> ResolvedOutputFormat {
        match self {
            Self::Auto => {
                if stdout_is_terminal {
                    ResolvedOutputFormat::Human
                } else {
                    ResolvedOutputFormat::Json
                }
            }
            Self::Human => ResolvedOutputFormat::Human,
            Self::Json => ResolvedOutputFormat::Json,
        }
    }
}

#[derive(Serialize)]
struct ResultsDocument<'a> {
    command: String,
    results: &'a [LifecycleResult],
}

#[derive(Serialize)]
struct StatusDocument<'a> {
    services: &'a [ServiceStatus],
}

/// Writes start or stop results to stdout.
pub(crate) fn write_results<W: Write, E: Write>(
    output: &mut LifecycleOutput<W, E>,
    format: ResolvedOutputFormat,
    command: LifecycleCommand,
    results: &[LifecycleResult],
) -> Result<(), LifecycleError> {
    let rendered = match format {
        ResolvedOutputFormat::Human => render::render_results(results),
        ResolvedOutputFormat::Json => to_json(&ResultsDocument {
            command: command.to_string(),
            results,
        })?,
    };
    output.stdout_line(format_args!("{}", rendered.trim_end()))
}

/// Writes a status snapshot to stdout and duplicate-match warnings to
/// stderr.
pub(crate) fn write_statuses<W: Write, E: Write>(
    output: &mut LifecycleOutput<W, E>,
    format: ResolvedOutputFormat,
    statuses: &[ServiceStatus],
) -> Result<(), LifecycleError> {
    let rendered = match format {
        ResolvedOutputFormat::Human => render::render_status_table(statuses),
        ResolvedOutputFormat::Json => to_json(&StatusDocument { services: statuses })?,
    };
    output.stdout_line(format_args!("{}", rendered.trim_end()))?;
    for status in statuses.iter().filter(|status| status.duplicate) {
        output.stderr_line(format_args!(
            "warning: {} processes match service '{}'",
            status.processes.len(),
            status.service
        ))?;
    }
    Ok(())
}

fn to_json<T: Serialize>(document: &T) -> Result<String, LifecycleError> {
    serde_json::to_string_pretty(document).map_err(LifecycleError::Serialise)
}
