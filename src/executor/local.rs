//! Local work unit executor
//!
//! Starts each unit as an isolated Docker container bound to its
//! allocated artifact directories. Launching returns as soon as the
//! container process has been spawned; waiting happens elsewhere.

use std::process::Stdio;
use tokio::process::{Child, Command};
use tracing::{debug, info};

use crate::artifacts::UnitPaths;
use crate::error::SwarmError;
use crate::models::JobTemplate;

/// In-container destination for raw test results.
const RESULTS_MOUNT: &str = "/app/test-results";

/// In-container destination for the rendered HTML report.
const REPORT_MOUNT: &str = "/app/playwright-report";

/// A launched local unit: a live container process handle.
#[derive(Debug)]
pub struct LocalUnit {
    pub index: u32,
    pub container_name: String,
    pub child: Child,
}

/// Launches work units as local Docker containers.
#[derive(Clone, Debug)]
pub struct LocalExecutor {
    container_prefix: String,
    run_id: String,
}

impl LocalExecutor {
    pub fn new(container_prefix: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self {
            container_prefix: container_prefix.into(),
            run_id: run_id.into(),
        }
    }

    /// Container name for a unit; cleanup matches on the prefix.
    pub fn container_name(&self, index: u32) -> String {
        format!("{}-{}-{}", self.container_prefix, self.run_id, index)
    }

    /// Launch one unit. Returns once the container has been started,
    /// not when it has finished. Only the first unit of an interactive
    /// invocation attaches a terminal; every other unit logs to
    /// `unit.log` in its artifact directory.
    pub async fn launch(
        &self,
        job: &JobTemplate,
        index: u32,
        paths: &UnitPaths,
        interactive: bool,
    ) -> Result<LocalUnit, SwarmError> {
        let name = self.container_name(index);
        let args = docker_run_args(job, &name, paths, interactive);

        debug!("docker {}", args.join(" "));

        let mut command = Command::new("docker");
        command.args(&args).kill_on_drop(true);

        if interactive {
            command
                .stdin(Stdio::inherit())
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit());
        } else {
            let log_path = paths.dir.join("unit.log");
            let log = std::fs::File::create(&log_path).map_err(|e| {
                SwarmError::launch(format!(
                    "unit {index}: cannot open {}: {e}",
                    log_path.display()
                ))
            })?;
            let log_err = log.try_clone().map_err(|e| {
                SwarmError::launch(format!("unit {index}: cannot clone log handle: {e}"))
            })?;
            command
                .stdin(Stdio::null())
                .stdout(Stdio::from(log))
                .stderr(Stdio::from(log_err));
        }

        let child = command
            .spawn()
            .map_err(|e| SwarmError::launch(format!("unit {index}: docker run failed: {e}")))?;

        info!("unit {index} started as container {name}");

        Ok(LocalUnit {
            index,
            container_name: name,
            child,
        })
    }
}

/// Build the `docker run` argument list for one unit.
fn docker_run_args(
    job: &JobTemplate,
    name: &str,
    paths: &UnitPaths,
    interactive: bool,
) -> Vec<String> {
    let mut args = vec!["run".to_string(), "--rm".to_string()];

    if interactive {
        args.push("-it".to_string());
    }

    args.push("--name".to_string());
    args.push(name.to_string());

    args.push("--shm-size".to_string());
    args.push(job.limits.shm_size.clone());

    if let Some(cpus) = &job.limits.cpus {
        args.push("--cpus".to_string());
        args.push(cpus.clone());
    }
    if let Some(memory) = &job.limits.memory {
        args.push("--memory".to_string());
        args.push(memory.clone());
    }

    args.push("-v".to_string());
    args.push(format!("{}:{}", paths.results.display(), RESULTS_MOUNT));
    args.push("-v".to_string());
    args.push(format!("{}:{}", paths.report.display(), REPORT_MOUNT));

    for (key, value) in &job.env {
        args.push("-e".to_string());
        args.push(format!("{key}={value}"));
    }

    args.push(job.image.clone());
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn unit_paths() -> UnitPaths {
        UnitPaths {
            dir: PathBuf::from("/tmp/artifacts/20260830-101500/instance-2"),
            results: PathBuf::from("/tmp/artifacts/20260830-101500/instance-2/results"),
            report: PathBuf::from("/tmp/artifacts/20260830-101500/instance-2/report"),
        }
    }

    #[test]
    fn test_container_name_carries_prefix_run_and_index() {
        let executor = LocalExecutor::new("e2e-swarm", "20260830-101500");
        assert_eq!(executor.container_name(3), "e2e-swarm-20260830-101500-3");
    }

    #[test]
    fn test_docker_args_mount_both_artifact_dirs() {
        let job = JobTemplate::new("e2e-suite:latest").with_env("HEADLESS", "true");
        let args = docker_run_args(&job, "e2e-swarm-x-2", &unit_paths(), false);

        assert_eq!(args[0], "run");
        assert!(args.contains(&"--rm".to_string()));
        assert!(!args.contains(&"-it".to_string()));
        assert!(args.contains(&format!(
            "/tmp/artifacts/20260830-101500/instance-2/results:{RESULTS_MOUNT}"
        )));
        assert!(args.contains(&format!(
            "/tmp/artifacts/20260830-101500/instance-2/report:{REPORT_MOUNT}"
        )));
        assert!(args.contains(&"HEADLESS=true".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("e2e-suite:latest"));
    }

    #[test]
    fn test_docker_args_interactive_only_when_requested() {
        let job = JobTemplate::new("e2e-suite:latest");
        let args = docker_run_args(&job, "n", &unit_paths(), true);
        assert!(args.contains(&"-it".to_string()));
    }

    #[test]
    fn test_docker_args_optional_limits() {
        let mut job = JobTemplate::new("e2e-suite:latest");
        job.limits.cpus = Some("2.0".to_string());
        job.limits.memory = Some("4g".to_string());

        let args = docker_run_args(&job, "n", &unit_paths(), false);
        let joined = args.join(" ");
        assert!(joined.contains("--cpus 2.0"));
        assert!(joined.contains("--memory 4g"));
        assert!(joined.contains("--shm-size 2g"));
    }
}
