//! Snapshots of supervised processes as reported by the daemon.

use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a supervised process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessStatus {
    /// The process is alive.
    Running,
    /// The process was stopped by the operator.
    Stopped,
    /// The process exited unexpectedly.
    Errored,
    /// Any state the client does not recognise.
    #[default]
    #[serde(other)]
    Unknown,
}

impl ProcessStatus {
    /// Returns `true` for a live process.
    #[must_use]
    pub const fn is_running(self) -> bool {
        matches!(self, Self::Running)
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::Errored => "errored",
            Self::Unknown => "unknown",
        })
    }
}

/// One row of a status snapshot.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProcessDescriptor {
    /// Name the process is registered under.
    pub name: String,
    /// Operating system process id; `0` or absent when not running.
    #[serde(default)]
    pub pid: Option<u32>,
    /// Current lifecycle state.
    #[serde(default)]
    pub status: ProcessStatus,
    /// Human-readable uptime as formatted by the daemon.
    #[serde(default)]
    pub uptime: String,
    /// Number of automatic restarts so far.
    #[serde(default)]
    pub restarts: u32,
    /// CPU usage in percent.
    #[serde(default)]
    pub cpu_percent: f64,
    /// Resident memory in bytes.
    #[serde(default)]
    pub memory_bytes: u64,
}

impl ProcessDescriptor {
    /// Process id, treating the daemon's `0` placeholder as absent.
    #[must_use]
    pub fn running_pid(&self) -> Option<u32> {
        self.pid.filter(|pid| *pid != 0)
    }
}

/// Point-in-time status of every supervised process, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ProcessSet(BTreeMap<String, ProcessDescriptor>);

impl ProcessSet {
    /// Returns `true` when the daemon supervises nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of supervised processes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Looks up one process by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ProcessDescriptor> {
        self.0.get(name)
    }

    /// Process names in snapshot order.
    #[must_use = "iterators are lazy"]
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Descriptors in name order.
    #[must_use]
    pub fn iter(&self) -> btree_map::Values<'_, String, ProcessDescriptor> {
        self.0.values()
    }
}

impl FromIterator<ProcessDescriptor> for ProcessSet {
    fn from_iter<I: IntoIterator<Item = ProcessDescriptor>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|descriptor| (descriptor.name.clone(), descriptor))
                .collect(),
        )
    }
}

impl<'a> IntoIterator for &'a ProcessSet {
    type Item = &'a ProcessDescriptor;
    type IntoIter = btree_map::Values<'a, String, ProcessDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Full description of one process as `field → display value`.
///
/// A detail is never empty on the client side: an empty mapping from the daemon
/// means "not found" and is converted to `None` by [`ProcessDetail::non_empty`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ProcessDetail(BTreeMap<String, String>);

impl ProcessDetail {
    /// Returns `None` for the empty "not found" mapping.
    #[must_use]
    pub fn non_empty(self) -> Option<Self> {
        if self.0.is_empty() { None } else { Some(self) }
    }

    /// Display value of `field`, if the daemon reported it.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    /// Fields in alphabetical order.
    #[must_use = "iterators are lazy"]
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .map(|(field, value)| (field.as_str(), value.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for ProcessDetail
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(field, value)| (field.into(), value.into()))
                .collect(),
        )
    }
}
