//! Job template and cluster task models
//!
//! A job template is the read-only description of what every work unit
//! runs. The core never mutates it beyond resolving the image reference.

#![allow(dead_code)]

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Resource limits applied to local units.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// Shared-memory size for the container, e.g. "2g". Browser engines
    /// crash under the Docker default of 64m.
    pub shm_size: String,

    /// CPU limit, e.g. "2.0". None leaves the engine default.
    pub cpus: Option<String>,

    /// Memory limit, e.g. "4g". None leaves the engine default.
    pub memory: Option<String>,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            shm_size: "2g".to_string(),
            cpus: None,
            memory: None,
        }
    }
}

/// Immutable description of what a work unit runs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JobTemplate {
    /// Resolved image reference for the runnable unit.
    pub image: String,

    /// Environment passed to every unit.
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    #[serde(default)]
    pub limits: ResourceLimits,
}

impl JobTemplate {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            env: BTreeMap::new(),
            limits: ResourceLimits::default(),
        }
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = limits;
        self
    }
}

/// Remote-scheduler realization of a unit handle.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClusterTask {
    pub task_arn: String,
    pub last_status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_builder() {
        let job = JobTemplate::new("registry.example.com/e2e:latest")
            .with_env("HEADLESS", "true")
            .with_env("BASE_URL", "https://staging.example.com");

        assert_eq!(job.image, "registry.example.com/e2e:latest");
        assert_eq!(job.env.get("HEADLESS").map(String::as_str), Some("true"));
        assert_eq!(job.limits.shm_size, "2g");
    }

    #[test]
    fn test_default_limits_leave_cpu_and_memory_unset() {
        let limits = ResourceLimits::default();
        assert!(limits.cpus.is_none());
        assert!(limits.memory.is_none());
    }
}
