//! Lifecycle management for the service fleet.
//!
//! This module is split into focused submodules so each concern remains small and
//! testable:
//! - [`types`] defines the command models, per-service results and IO helpers.
//! - [`error`] captures the error surface folded into results.
//! - [`matcher`] finds services in the live process table.
//! - [`probe`] answers whether a readiness port accepts connections.
//! - [`output_log`] owns the per-service append-only log.
//! - [`spawning`] runs build steps and detached launches.
//! - [`monitoring`] provides readiness checks and bounded port polling.
//! - [`shutdown`] delivers signals and applies stop escalation.
//! - [`controller`] implements the high-level start/stop/status flows.

mod controller;
mod error;
mod matcher;
mod monitoring;
mod output_log;
mod probe;
mod shutdown;
mod spawning;
mod types;

pub use controller::{ControllerSettings, FleetController, SystemController};
pub use error::LifecycleError;
pub use matcher::{ProcessHandle, ProcessMatcher, SystemProcessMatcher};
#[cfg(test)]
pub(crate) use matcher::select_matches;
pub use output_log::OutputLog;
pub use probe::{PortProbe, TcpPortProbe};
pub use shutdown::{ProcessSignaller, SystemSignaller, TerminationSignal};
pub use spawning::{ServiceLauncher, SystemLauncher};
pub use types::{LifecycleCommand, LifecycleContext, LifecycleOutput, LifecycleResult, Outcome};
