//! Human-readable rendering of lifecycle results and status tables.

use std::time::Duration;

use unicode_width::UnicodeWidthStr;

use crate::lifecycle::LifecycleResult;
use crate::status::{PortStatus, ServiceState, ServiceStatus};

const TAIL_INDENT: &str = "    | ";
const COLUMN_GAP: &str = "  ";
const HEADERS: [&str; 7] = ["SERVICE", "STATE", "PID", "UPTIME", "CPU", "MEMORY", "PORT"];

/// One line per service; failures carry the reason and the indented log tail.
#[must_use]
pub(crate) fn render_results(results: &[LifecycleResult]) -> String {
    let mut output = String::new();
    for result in results {
        let summary = match (&result.reason, result.detail.is_empty()) {
            (Some(reason), _) => format!("{}: {}: {reason}", result.name(), result.outcome),
            (None, true) => format!("{}: {}", result.name(), result.outcome),
            (None, false) => format!("{}: {} ({})", result.name(), result.outcome, result.detail),
        };
        output.push_str(&summary);
        output.push('\n');
        if result.reason.is_some() {
            for line in result.detail.lines() {
                output.push_str(TAIL_INDENT);
                output.push_str(line);
                output.push('\n');
            }
        }
    }
    output
}

/// Aligned table with one row per matching process.
#[must_use]
pub(crate) fn render_status_table(statuses: &[ServiceStatus]) -> String {
    let mut rows: Vec<[String; 7]> = Vec::new();
    for status in statuses {
        let state = state_label(status.state).to_owned();
        let port = port_label(status.port);
        if status.processes.is_empty() {
            rows.push([
                status.service.clone(),
                state,
                dash(),
                dash(),
                dash(),
                dash(),
                port,
            ]);
            continue;
        }
        for handle in &status.processes {
            rows.push([
                status.service.clone(),
                state.clone(),
                handle.pid.to_string(),
                format_uptime(handle.uptime),
                format!("{:.1}%", handle.cpu_percent),
                format_bytes(handle.memory_bytes),
                port.clone(),
            ]);
        }
    }

    let header = HEADERS.map(str::to_owned);
    let widths = column_widths(&header, &rows);
    let mut output = render_row(&header, &widths);
    for row in &rows {
        output.push_str(&render_row(row, &widths));
    }
    output
}

fn column_widths(header: &[String; 7], rows: &[[String; 7]]) -> [usize; 7] {
    let mut widths = header.each_ref().map(|cell| UnicodeWidthStr::width(cell.as_str()));
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(UnicodeWidthStr::width(cell.as_str()));
        }
    }
    widths
}

fn render_row(cells: &[String; 7], widths: &[usize; 7]) -> String {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| pad(cell, *width))
        .collect();
    let mut line = padded.join(COLUMN_GAP).trim_end().to_owned();
    line.push('\n');
    line
}

fn pad(cell: &str, width: usize) -> String {
    let fill = width.saturating_sub(UnicodeWidthStr::width(cell));
    format!("{cell}{}", " ".repeat(fill))
}

fn dash() -> String {
    String::from("-")
}

const fn state_label(state: ServiceState) -> &'static str {
    match state {
        ServiceState::Running => "running",
        ServiceState::NotRunning => "not running",
    }
}

fn port_label(port: Option<PortStatus>) -> String {
    match port {
        Some(PortStatus {
            port,
            listening: true,
        }) => format!("{port} (listening)"),
        Some(PortStatus {
            port,
            listening: false,
        }) => format!("{port} (closed)"),
        None => dash(),
    }
}

fn format_uptime(uptime: Duration) -> String {
    let secs = uptime.as_secs();
    let (days, hours, minutes, seconds) = (
        secs / 86_400,
        (secs % 86_400) / 3_600,
        (secs % 3_600) / 60,
        secs % 60,
    );
    if days > 0 {
        format!("{days}d{hours:02}h")
    } else if hours > 0 {
        format!("{hours}h{minutes:02}m")
    } else if minutes > 0 {
        format!("{minutes}m{seconds:02}s")
    } else {
        format!("{seconds}s")
    }
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS.get(unit).copied().unwrap_or("TiB"))
}
