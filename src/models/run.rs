//! Run and work unit models
//!
//! A run covers a requested count of independent work units and yields
//! one aggregate verdict once every unit has reached a terminal state.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Where the work units execute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Local,
    Remote,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Local => write!(f, "local"),
            RunMode::Remote => write!(f, "remote"),
        }
    }
}

/// Work unit execution status.
///
/// `Unknown` is kept distinct from `Failed`: a unit the scheduler never
/// started has different debugging implications than one that started
/// and exited non-zero. Both count against the run verdict.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

impl UnitStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            UnitStatus::Succeeded | UnitStatus::Failed | UnitStatus::Unknown
        )
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            UnitStatus::Pending => "·",
            UnitStatus::Running => "…",
            UnitStatus::Succeeded => "✓",
            UnitStatus::Failed => "✗",
            UnitStatus::Unknown => "?",
        }
    }
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UnitStatus::Pending => "pending",
            UnitStatus::Running => "running",
            UnitStatus::Succeeded => "succeeded",
            UnitStatus::Failed => "failed",
            UnitStatus::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

/// One independent execution of the test workload.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkUnit {
    /// 1-based index, unique and contiguous within a run.
    pub index: u32,

    /// Opaque handle: container name (local) or task ARN (remote).
    pub handle_id: Option<String>,

    /// Host directory the unit writes artifacts to. None in remote mode.
    pub artifact_dir: Option<PathBuf>,

    /// Current status; set to a terminal value by the aggregator.
    pub status: UnitStatus,

    /// Exit code observed at termination, when one was readable.
    pub exit_code: Option<i32>,
}

impl WorkUnit {
    pub fn pending(index: u32) -> Self {
        Self {
            index,
            handle_id: None,
            artifact_dir: None,
            status: UnitStatus::Pending,
            exit_code: None,
        }
    }

    /// Unit that never started: a local spawn failure or a scheduler
    /// placement failure. Terminal immediately, never waited upon.
    pub fn never_started(index: u32) -> Self {
        Self {
            index,
            handle_id: None,
            artifact_dir: None,
            status: UnitStatus::Unknown,
            exit_code: None,
        }
    }

    pub fn with_handle(mut self, handle: impl Into<String>) -> Self {
        self.handle_id = Some(handle.into());
        self
    }

    pub fn with_artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = Some(dir.into());
        self
    }
}

impl fmt::Display for WorkUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.exit_code {
            Some(code) => write!(f, "unit {} {} (exit {})", self.index, self.status, code),
            None => write!(f, "unit {} {}", self.index, self.status),
        }
    }
}

/// Aggregate verdict for a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Failure,
}

impl RunStatus {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunStatus::Success => 0,
            RunStatus::Failure => 1,
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Success => write!(f, "SUCCESS"),
            RunStatus::Failure => write!(f, "FAILURE"),
        }
    }
}

/// One invocation of the launcher.
#[derive(Clone, Debug)]
pub struct Run {
    pub run_id: String,
    pub mode: RunMode,
    pub requested_count: u32,
    pub root_artifact_path: Option<PathBuf>,
    pub units: Vec<WorkUnit>,
}

impl Run {
    pub fn new(mode: RunMode, requested_count: u32) -> Self {
        Self {
            run_id: new_run_id(),
            mode,
            requested_count,
            root_artifact_path: None,
            units: Vec::with_capacity(requested_count as usize),
        }
    }
}

/// Timestamp-derived run identifier, also the artifact root name.
pub fn new_run_id() -> String {
    Utc::now().format("%Y%m%d-%H%M%S").to_string()
}

/// Structured summary of a completed run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub mode: RunMode,
    pub requested_count: u32,
    pub overall: RunStatus,
    pub root_artifact_path: Option<PathBuf>,
    /// Always sorted by unit index.
    pub units: Vec<WorkUnit>,
}

impl RunReport {
    pub fn succeeded_count(&self) -> usize {
        self.units
            .iter()
            .filter(|u| u.status == UnitStatus::Succeeded)
            .count()
    }
}
