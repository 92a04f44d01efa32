//! Unit tests for the CLI runtime.

pub(crate) mod support;

use std::ffi::OsString;
use std::io;
use std::process::ExitCode;

use camino::Utf8PathBuf;
use fleet_config::Config;
use rstest::rstest;
use tempfile::TempDir;

use self::support::{FakeHost, StaticConfigLoader, scratch, settings};
use crate::lifecycle::{LifecycleCommand, LifecycleError};
use crate::output::ResolvedOutputFormat;
use crate::{IoStreams, run_with_handler, run_with_loader};

fn args(raw: &[&str]) -> Vec<OsString> {
    raw.iter().map(OsString::from).collect()
}

struct Captured {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    exit: ExitCode,
}

impl Captured {
    fn stdout(&self) -> String {
        String::from_utf8(self.stdout.clone()).expect("stdout utf8")
    }

    fn stderr(&self) -> String {
        String::from_utf8(self.stderr.clone()).expect("stderr utf8")
    }
}

fn run_without_controller(raw: &[&str], config: Config) -> Captured {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let exit = {
        let mut io = IoStreams::new(&mut stdout, &mut stderr, false);
        run_with_handler(
            args(raw),
            &mut io,
            &StaticConfigLoader::new(config),
            |_, _, _, _| panic!("controller must not be reached"),
        )
    };
    Captured {
        stdout,
        stderr,
        exit,
    }
}

#[rstest]
#[case::help(&["fleetctl", "--help"], "Usage")]
#[case::help_lists_config_flags(&["fleetctl", "--help"], "Configuration flags must precede")]
#[case::version(&["fleetctl", "--version"], "fleetctl ")]
fn help_and_version_go_to_stdout(#[case] raw: &[&str], #[case] expected: &str) {
    let captured = run_without_controller(raw, Config::default());
    assert_eq!(captured.exit, ExitCode::SUCCESS);
    assert!(captured.stdout().contains(expected));
    assert!(captured.stderr.is_empty());
}

#[rstest]
#[case::unknown_command(&["fleetctl", "restart"])]
#[case::missing_command(&["fleetctl"])]
#[case::config_flag_after_command(&["fleetctl", "status", "--api-port", "9000"])]
#[case::bad_output_format(&["fleetctl", "--output", "yaml", "status"])]
fn usage_errors_fail_on_stderr(#[case] raw: &[&str]) {
    let captured = run_without_controller(raw, Config::default());
    assert_eq!(captured.exit, ExitCode::FAILURE);
    assert!(captured.stdout.is_empty());
    assert!(!captured.stderr().is_empty());
}

#[test]
fn invalid_catalogue_is_reported() {
    let config = Config {
        python_bin: String::new(),
        ..Config::default()
    };
    let captured = run_without_controller(&["fleetctl", "status"], config);
    assert_eq!(captured.exit, ExitCode::FAILURE);
    assert!(captured.stderr().contains("invalid service catalogue"));
}

#[rstest]
#[case::explicit_json(
    &["fleetctl", "--api-port", "9000", "--output", "json", "stop"],
    true,
    LifecycleCommand::Stop,
    ResolvedOutputFormat::Json
)]
#[case::auto_on_terminal(
    &["fleetctl", "start"],
    true,
    LifecycleCommand::Start,
    ResolvedOutputFormat::Human
)]
#[case::auto_redirected(
    &["fleetctl", "status"],
    false,
    LifecycleCommand::Status,
    ResolvedOutputFormat::Json
)]
fn dispatches_command_with_resolved_format(
    #[case] raw: &[&str],
    #[case] terminal: bool,
    #[case] expected_command: LifecycleCommand,
    #[case] expected_format: ResolvedOutputFormat,
) {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let mut seen = None;
    let exit = {
        let mut io = IoStreams::new(&mut stdout, &mut stderr, terminal);
        run_with_handler(
            args(raw),
            &mut io,
            &StaticConfigLoader::new(Config::default()),
            |command, _, context, _| {
                seen = Some((command, context.format, context.fleet.len()));
                Ok(ExitCode::SUCCESS)
            },
        )
    };
    assert_eq!(exit, ExitCode::SUCCESS);
    assert_eq!(seen, Some((expected_command, expected_format, 3)));
}

#[test]
fn lifecycle_errors_fail_the_invocation() {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let exit = {
        let mut io = IoStreams::new(&mut stdout, &mut stderr, false);
        run_with_handler(
            args(&["fleetctl", "stop"]),
            &mut io,
            &StaticConfigLoader::new(Config::default()),
            |_, _, _, _| Err(LifecycleError::Io(io::Error::other("stdout closed"))),
        )
    };
    assert_eq!(exit, ExitCode::FAILURE);
    let stderr = String::from_utf8(stderr).expect("stderr utf8");
    assert!(stderr.contains("fleet command failed"));
    assert!(stderr.contains("stdout closed"));
}

#[rstest]
fn status_of_default_fleet_through_the_runner(scratch: (TempDir, Utf8PathBuf)) {
    let (_guard, root) = scratch;
    let host = FakeHost::new();
    host.spawn_listening(
        root.join("whatsapp-bridge/whatsapp-bridge").as_str(),
        support::Resistance::Cooperative,
        8080,
    );
    let config = Config {
        fleet_root: root.clone(),
        ..Config::default()
    };
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let exit = {
        let mut io = IoStreams::new(&mut stdout, &mut stderr, false);
        run_with_handler(
            args(&["fleetctl", "--output", "human", "status"]),
            &mut io,
            &StaticConfigLoader::new(config),
            |command, _, context, output| {
                host.controller(settings(3, &root))
                    .handle(command, context, output)
            },
        )
    };
    assert_eq!(exit, ExitCode::SUCCESS);
    let stdout = String::from_utf8(stdout).expect("stdout utf8");
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 4);
    let row = |index: usize, service: &str, cell: &str| {
        lines
            .get(index)
            .is_some_and(|line| line.starts_with(service) && line.contains(cell))
    };
    assert!(row(1, "bridge", "8080 (listening)"));
    assert!(row(2, "api", "not running"));
    assert!(row(3, "mcp", "not running"));
}

#[test]
fn malformed_config_flag_fails_before_dispatch() {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let exit = {
        let mut io = IoStreams::new(&mut stdout, &mut stderr, false);
        run_with_loader(
            args(&["fleetctl", "--readiness-attempts", "plenty", "status"]),
            &mut io,
            &crate::OrthoConfigLoader,
        )
    };
    assert_eq!(exit, ExitCode::FAILURE);
    assert!(stdout.is_empty());
    let stderr = String::from_utf8(stderr).expect("stderr utf8");
    assert!(stderr.contains("failed to load configuration"), "stderr: {stderr}");
}
