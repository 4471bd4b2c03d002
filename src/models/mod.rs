//! Data models for swarm runs
//!
//! This module contains all data structures used throughout the application.

mod run;
mod template;

pub use run::{Run, RunMode, RunReport, RunStatus, UnitStatus, WorkUnit};
pub use template::{ClusterTask, JobTemplate, ResourceLimits};
