//! Lifecycle command types and output abstractions.
//!
//! Defines the payloads and IO wrappers shared across lifecycle commands so the
//! controller can remain agnostic of concrete writers.

use std::fmt;
use std::io::Write;

use fleet_config::{Fleet, ServiceDescriptor};
use serde::Serialize;

use super::LifecycleError;
use crate::CliCommand;
use crate::output::ResolvedOutputFormat;

/// Supported lifecycle commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleCommand {
    Start,
    Stop,
    Status,
}

impl fmt::Display for LifecycleCommand {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => formatter.write_str("start"),
            Self::Stop => formatter.write_str("stop"),
            Self::Status => formatter.write_str("status"),
        }
    }
}

impl From<CliCommand> for LifecycleCommand {
    fn from(command: CliCommand) -> Self {
        match command {
            CliCommand::Start => Self::Start,
            CliCommand::Stop => Self::Stop,
            CliCommand::Status => Self::Status,
        }
    }
}

/// Result of driving one service through a start or stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Started,
    AlreadyRunning,
    StartFailed,
    Stopped,
    AlreadyStopped,
    StopFailed,
    ForcedStop,
}

impl Outcome {
    /// Returns true for outcomes that make the invocation exit non-zero.
    pub const fn is_failure(self) -> bool {
        matches!(self, Self::StartFailed | Self::StopFailed)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Started => "started",
            Self::AlreadyRunning => "already running",
            Self::StartFailed => "start failed",
            Self::Stopped => "stopped",
            Self::AlreadyStopped => "already stopped",
            Self::StopFailed => "stop failed",
            Self::ForcedStop => "force-stopped",
        };
        formatter.write_str(label)
    }
}

/// Per-service report produced once per invocation and discarded after
/// rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LifecycleResult {
    pub service: ServiceDescriptor,
    pub outcome: Outcome,
    /// Short summary on success, tail of the service output on failure.
    pub detail: String,
    /// Why a failure happened; absent on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl LifecycleResult {
    pub fn new(service: &ServiceDescriptor, outcome: Outcome, detail: impl Into<String>) -> Self {
        Self {
            service: service.clone(),
            outcome,
            detail: detail.into(),
            reason: None,
        }
    }

    pub fn failed(
        service: &ServiceDescriptor,
        outcome: Outcome,
        reason: &LifecycleError,
        output_tail: String,
    ) -> Self {
        Self {
            service: service.clone(),
            outcome,
            detail: output_tail,
            reason: Some(reason.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        self.service.name()
    }
}

/// Per-invocation context available to lifecycle handlers.
#[derive(Debug, Clone, Copy)]
pub struct LifecycleContext<'a> {
    pub fleet: &'a Fleet,
    pub format: ResolvedOutputFormat,
}

/// Output handle abstracting over stdout/stderr writers.
pub struct LifecycleOutput<W: Write, E: Write> {
    pub stdout: W,
    pub stderr: E,
}

impl<W: Write, E: Write> LifecycleOutput<W, E> {
    pub fn new(stdout: W, stderr: E) -> Self {
        Self { stdout, stderr }
    }

    pub fn stdout_line(&mut self, args: fmt::Arguments<'_>) -> Result<(), LifecycleError> {
        self.stdout.write_fmt(args).map_err(LifecycleError::Io)?;
        self.stdout.write_all(b"\n").map_err(LifecycleError::Io)?;
        self.stdout.flush().map_err(LifecycleError::Io)
    }

    pub fn stderr_line(&mut self, args: fmt::Arguments<'_>) -> Result<(), LifecycleError> {
        self.stderr.write_fmt(args).map_err(LifecycleError::Io)?;
        self.stderr.write_all(b"\n").map_err(LifecycleError::Io)?;
        self.stderr.flush().map_err(LifecycleError::Io)
    }
}
