//! The validated, dependency-ordered service catalogue.
//!
//! The deployment catalogue (bridge, HTTP API, protocol server) is derived
//! from [`Config`] so ports, interpreter and checkout location stay tunable
//! while the shape of the fleet is fixed at build time.

use std::collections::HashSet;

use thiserror::Error;

use crate::{Config, ServiceDescriptor};

/// Name of the native bridge service.
pub const BRIDGE_SERVICE: &str = "bridge";
/// Name of the HTTP API service.
pub const API_SERVICE: &str = "api";
/// Name of the protocol server.
pub const MCP_SERVICE: &str = "mcp";

/// Validated services plus an order where every predecessor precedes its
/// dependants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fleet {
    services: Vec<ServiceDescriptor>,
    order: Vec<usize>,
}

impl Fleet {
    /// Validates the descriptors and computes their start order.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError`] for empty names, identity patterns or start
    /// commands, duplicate names, unknown dependencies and cycles.
    pub fn new(services: Vec<ServiceDescriptor>) -> Result<Self, FleetError> {
        validate(&services)?;
        let order = start_order(&services)?;
        Ok(Self { services, order })
    }

    /// Descriptors in declaration order.
    #[must_use]
    pub fn services(&self) -> &[ServiceDescriptor] {
        &self.services
    }

    /// Descriptors arranged so every predecessor precedes its dependants.
    ///
    /// Ties keep declaration order, so a catalogue that is already ordered
    /// is yielded unchanged.
    pub fn start_order(&self) -> impl Iterator<Item = &ServiceDescriptor> {
        self.order
            .iter()
            .filter_map(|index| self.services.get(*index))
    }

    /// Looks a descriptor up by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ServiceDescriptor> {
        self.services.iter().find(|service| service.name() == name)
    }

    /// Number of managed services.
    #[must_use]
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Returns true when the fleet manages nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

fn validate(services: &[ServiceDescriptor]) -> Result<(), FleetError> {
    let mut seen = HashSet::new();
    for service in services {
        if service.name().trim().is_empty() {
            return Err(FleetError::EmptyName);
        }
        if service.identity_pattern().trim().is_empty() {
            return Err(FleetError::EmptyIdentity {
                service: service.name().to_owned(),
            });
        }
        let command_empty = service
            .start_command()
            .first()
            .is_none_or(|program| program.is_empty());
        let build_empty = service
            .build_command()
            .is_some_and(|argv| argv.first().is_none_or(|program| program.is_empty()));
        if command_empty || build_empty {
            return Err(FleetError::EmptyCommand {
                service: service.name().to_owned(),
            });
        }
        if !seen.insert(service.name()) {
            return Err(FleetError::DuplicateName {
                service: service.name().to_owned(),
            });
        }
    }
    for service in services {
        if let Some(dependency) = service.depends_on()
            && !seen.contains(dependency)
        {
            return Err(FleetError::UnknownDependency {
                service: service.name().to_owned(),
                dependency: dependency.to_owned(),
            });
        }
    }
    Ok(())
}

fn start_order(services: &[ServiceDescriptor]) -> Result<Vec<usize>, FleetError> {
    let mut pending: Vec<usize> = (0..services.len()).collect();
    let mut ordered: Vec<usize> = Vec::with_capacity(pending.len());
    let name_of = |index: usize| services.get(index).map(ServiceDescriptor::name);
    while !pending.is_empty() {
        let (ready, blocked): (Vec<usize>, Vec<usize>) =
            pending.into_iter().partition(|index| {
                services
                    .get(*index)
                    .and_then(ServiceDescriptor::depends_on)
                    .is_none_or(|dependency| {
                        ordered.iter().any(|placed| name_of(*placed) == Some(dependency))
                    })
            });
        if ready.is_empty() {
            let service = blocked
                .first()
                .and_then(|index| name_of(*index))
                .unwrap_or_default()
                .to_owned();
            return Err(FleetError::DependencyCycle { service });
        }
        ordered.extend(ready);
        pending = blocked;
    }
    Ok(ordered)
}

impl Config {
    /// Builds the deployment catalogue rooted at [`Config::fleet_root`].
    ///
    /// # Errors
    ///
    /// Propagates [`FleetError`] from [`Fleet::new`].
    pub fn fleet(&self) -> Result<Fleet, FleetError> {
        let root = self.fleet_root();

        let bridge_dir = root.join("whatsapp-bridge");
        let bridge_binary = bridge_dir.join("whatsapp-bridge");
        let bridge = ServiceDescriptor::new(
            BRIDGE_SERVICE,
            bridge_binary.as_str(),
            bridge_dir.clone(),
            vec![bridge_binary.to_string()],
        )
        .with_build_command(argv(&["go", "build", "-o", "whatsapp-bridge", "."]))
        .with_readiness_port(self.bridge_port);

        let api_port = self.api_port.to_string();
        let api = ServiceDescriptor::new(
            API_SERVICE,
            "uvicorn app:app",
            root.join("whatsapp-http-server"),
            argv(&[
                &self.python_bin,
                "-m",
                "uvicorn",
                "app:app",
                "--host",
                &self.bind_host,
                "--port",
                &api_port,
            ]),
        )
        .with_readiness_port(self.api_port)
        .with_dependency(BRIDGE_SERVICE);

        let mcp = ServiceDescriptor::new(
            MCP_SERVICE,
            "main.py --transport sse",
            root.join("whatsapp-mcp-server"),
            argv(&[&self.python_bin, "main.py", "--transport", "sse"]),
        )
        .with_readiness_port(self.mcp_port)
        .with_dependency(API_SERVICE);

        Fleet::new(vec![bridge, api, mcp])
    }
}

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|part| (*part).to_owned()).collect()
}

/// Errors raised while validating a service catalogue.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FleetError {
    /// A descriptor had a blank name.
    #[error("service names must not be empty")]
    EmptyName,
    /// A descriptor had a blank identity pattern.
    #[error("service '{service}' has an empty identity pattern")]
    EmptyIdentity {
        /// Offending service.
        service: String,
    },
    /// A start or build command had no program.
    #[error("service '{service}' declares an empty command")]
    EmptyCommand {
        /// Offending service.
        service: String,
    },
    /// Two descriptors shared a name.
    #[error("service '{service}' is declared more than once")]
    DuplicateName {
        /// Repeated name.
        service: String,
    },
    /// A dependency named a service that does not exist.
    #[error("service '{service}' depends on unknown service '{dependency}'")]
    UnknownDependency {
        /// Dependant service.
        service: String,
        /// Missing predecessor.
        dependency: String,
    },
    /// Dependencies formed a loop.
    #[error("service '{service}' is part of a dependency cycle")]
    DependencyCycle {
        /// A service on the cycle.
        service: String,
    },
}
