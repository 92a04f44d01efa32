//! Append-only output log kept for every managed service.
//!
//! Build and run output of a service is appended to `<name>.log`, either in
//! the configured log directory or in the service's working directory. The
//! tail of this file is echoed with every failure so operators can diagnose
//! without tailing logs by hand.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};

use camino::{Utf8Path, Utf8PathBuf};
use fleet_config::ServiceDescriptor;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use super::error::LifecycleError;

/// Bytes read from the end of the log when computing a tail.
const TAIL_WINDOW: u64 = 64 * 1024;

/// Location of one service's output log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLog {
    path: Utf8PathBuf,
}

impl OutputLog {
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Resolves the log path for `service`.
    pub fn for_service(service: &ServiceDescriptor, log_dir: Option<&Utf8Path>) -> Self {
        let directory = log_dir.unwrap_or_else(|| service.working_directory());
        Self::new(directory.join(format!("{}.log", service.name())))
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Opens the log for appending, creating missing parent directories.
    pub fn open_append(&self) -> Result<File, LifecycleError> {
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| self.error(source))?;
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| self.error(source))
    }

    /// Appends a timestamped marker separating invocations.
    pub fn banner(&self, stage: &str) -> Result<(), LifecycleError> {
        let timestamp = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| String::from("unknown time"));
        let mut file = self.open_append()?;
        writeln!(file, "=== fleetctl {stage} {timestamp} ===").map_err(|source| self.error(source))
    }

    /// Returns at most `lines` trailing lines, or an empty string when the
    /// log does not exist or cannot be read.
    pub fn tail(&self, lines: usize) -> String {
        if lines == 0 {
            return String::new();
        }
        let Ok(content) = self.read_window() else {
            return String::new();
        };
        let kept: Vec<&str> = content.lines().collect();
        let start = kept.len().saturating_sub(lines);
        kept.get(start..).unwrap_or_default().join("\n")
    }

    fn read_window(&self) -> std::io::Result<String> {
        let mut file = File::open(&self.path)?;
        let length = file.metadata()?.len();
        let offset = length.saturating_sub(TAIL_WINDOW);
        file.seek(SeekFrom::Start(offset))?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        let text = String::from_utf8_lossy(&bytes).into_owned();
        if offset == 0 {
            return Ok(text);
        }
        // The window may start mid-line; drop the partial first line.
        Ok(text
            .split_once('\n')
            .map(|(_, rest)| rest.to_owned())
            .unwrap_or_default())
    }

    fn error(&self, source: std::io::Error) -> LifecycleError {
        LifecycleError::OutputLog {
            path: self.path.clone(),
            source,
        }
    }
}
