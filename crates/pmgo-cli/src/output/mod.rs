//! Rendering of daemon snapshots for the operator.
//!
//! Status snapshots become a centred table, one row per process; process
//! details become a two-column key/value table. When JSON output is selected
//! the snapshot is printed as the daemon's data model instead.

use clap::ValueEnum;
use pmgo_daemon_types::{ProcessDescriptor, ProcessDetail, ProcessSet};
use serde::Serialize;
use tabled::builder::Builder;
use tabled::settings::object::Segment;
use tabled::settings::{Alignment, Style};
use tabled::{Table, Tabled};

/// One status table row, already formatted for display.
#[derive(Debug, Tabled)]
struct StatusRow {
    name: String,
    pid: String,
    status: String,
    uptime: String,
    restart: String,
    #[tabled(rename = "cpu %")]
    cpu: String,
    memory: String,
}

impl From<&ProcessDescriptor> for StatusRow {
    fn from(process: &ProcessDescriptor) -> Self {
        Self {
            name: process.name.clone(),
            pid: process
                .running_pid()
                .map_or_else(|| String::from("-"), |pid| pid.to_string()),
            status: process.status.to_string(),
            uptime: process.uptime.clone(),
            restart: process.restarts.to_string(),
            cpu: format!("{}", process.cpu_percent.trunc()),
            memory: format_memory(process.memory_bytes),
        }
    }
}

/// Output format selection for status and info reports.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    /// Selects `human` for terminal output and `json` for redirected output.
    Auto,
    /// Always render tables.
    #[default]
    Human,
    /// Always emit JSON.
    Json,
}

/// Output format after resolving `auto` based on TTY detection.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResolvedOutputFormat {
    Human,
    Json,
}

impl OutputFormat {
    /// Resolves the output format based on whether stdout is a terminal.
    #[must_use]
    pub const fn resolve(self, stdout_is_terminal: bool) -> ResolvedOutputFormat {
        match self {
            Self::Auto if stdout_is_terminal => ResolvedOutputFormat::Human,
            Self::Auto | Self::Json => ResolvedOutputFormat::Json,
            Self::Human => ResolvedOutputFormat::Human,
        }
    }
}

/// Renders a status snapshot.
pub fn render_status(
    snapshot: &ProcessSet,
    format: ResolvedOutputFormat,
) -> Result<String, serde_json::Error> {
    match format {
        ResolvedOutputFormat::Json => render_json(snapshot),
        ResolvedOutputFormat::Human => {
            let mut table = Table::new(snapshot.iter().map(StatusRow::from));
            table
                .with(Style::ascii())
                .modify(Segment::all(), Alignment::center());
            Ok(finish(&table))
        }
    }
}

/// Renders the detail of a single process.
pub fn render_detail(
    detail: &ProcessDetail,
    format: ResolvedOutputFormat,
) -> Result<String, serde_json::Error> {
    match format {
        ResolvedOutputFormat::Json => render_json(detail),
        ResolvedOutputFormat::Human => {
            let mut builder = Builder::default();
            for (field, value) in detail.iter() {
                builder.push_record([field, value]);
            }
            let mut table = builder.build();
            table
                .with(Style::ascii().remove_horizontal())
                .modify(Segment::all(), Alignment::left());
            Ok(finish(&table))
        }
    }
}

/// Terminates a rendered table with a newline; an empty table prints nothing.
fn finish(table: &Table) -> String {
    if table.is_empty() {
        return String::new();
    }
    let mut rendered = table.to_string();
    rendered.push('\n');
    rendered
}

fn render_json<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    let mut rendered = serde_json::to_string_pretty(value)?;
    rendered.push('\n');
    Ok(rendered)
}

/// Formats a byte count with the largest unit that keeps the value at or
/// above one.
#[must_use]
pub fn format_memory(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes;
    let mut remainder = 0;
    let mut unit = "KB";
    for candidate in UNITS {
        remainder = value % 1024;
        value /= 1024;
        unit = candidate;
        if value < 1024 {
            break;
        }
    }
    format!("{value}.{} {unit}", remainder * 10 / 1024)
}
