//! Static definition of a managed service.
//!
//! A descriptor never records a PID. Services are launched out-of-band and
//! later recognised by scanning live command lines for the identity pattern.

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

/// Immutable description of one member of the fleet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceDescriptor {
    name: String,
    identity_pattern: String,
    working_directory: Utf8PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    build_command: Option<Vec<String>>,
    start_command: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    readiness_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    depends_on: Option<String>,
}

impl ServiceDescriptor {
    /// Builds a descriptor without build step, port or dependency.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        identity_pattern: impl Into<String>,
        working_directory: impl Into<Utf8PathBuf>,
        start_command: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            identity_pattern: identity_pattern.into(),
            working_directory: working_directory.into(),
            build_command: None,
            start_command,
            readiness_port: None,
            depends_on: None,
        }
    }

    /// Declares a command that must succeed before the service is launched.
    #[must_use]
    pub fn with_build_command(mut self, argv: Vec<String>) -> Self {
        self.build_command = Some(argv);
        self
    }

    /// Declares the TCP port whose listener marks the service as ready.
    #[must_use]
    pub fn with_readiness_port(mut self, port: u16) -> Self {
        self.readiness_port = Some(port);
        self
    }

    /// Declares the service that must be ready before this one starts.
    #[must_use]
    pub fn with_dependency(mut self, name: impl Into<String>) -> Self {
        self.depends_on = Some(name.into());
        self
    }

    /// Unique name used in output and log file names.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Substring recognising a running instance in the process table.
    #[must_use]
    pub fn identity_pattern(&self) -> &str {
        &self.identity_pattern
    }

    /// Directory the build and start commands run in.
    #[must_use]
    pub fn working_directory(&self) -> &Utf8Path {
        &self.working_directory
    }

    /// Optional build step argv.
    #[must_use]
    pub fn build_command(&self) -> Option<&[String]> {
        self.build_command.as_deref()
    }

    /// Argv launching the service.
    #[must_use]
    pub fn start_command(&self) -> &[String] {
        &self.start_command
    }

    /// Port polled for readiness, if any.
    #[must_use]
    pub const fn readiness_port(&self) -> Option<u16> {
        self.readiness_port
    }

    /// Name of the predecessor, if any.
    #[must_use]
    pub fn depends_on(&self) -> Option<&str> {
        self.depends_on.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_records_optional_parts() {
        let service = ServiceDescriptor::new(
            "api",
            "apiserver --mode x",
            "/srv/api",
            vec![String::from("apiserver"), String::from("--mode"), String::from("x")],
        )
        .with_readiness_port(8040)
        .with_dependency("bridge")
        .with_build_command(vec![String::from("make")]);

        assert_eq!(service.name(), "api");
        assert_eq!(service.readiness_port(), Some(8040));
        assert_eq!(service.depends_on(), Some("bridge"));
        assert_eq!(service.build_command(), Some(&[String::from("make")][..]));
        assert_eq!(service.working_directory(), Utf8Path::new("/srv/api"));
    }

    #[test]
    fn plain_descriptor_has_no_port_or_dependency() {
        let service = ServiceDescriptor::new("bridge", "bridge", "/srv", vec![String::from("b")]);
        assert!(service.readiness_port().is_none());
        assert!(service.depends_on().is_none());
        assert!(service.build_command().is_none());
    }
}
