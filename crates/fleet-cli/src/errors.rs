//! Error types for the CLI runtime.

use std::sync::Arc;

use fleet_config::FleetError;
use thiserror::Error;

use crate::lifecycle::LifecycleError;
use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error("failed to initialise telemetry: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("invalid service catalogue: {0}")]
    Fleet(#[from] FleetError),
    #[error("fleet command failed: {0}")]
    Lifecycle(#[from] LifecycleError),
}
