//! Cleanup of leftover work units
//!
//! Idempotent removal of containers left behind by interrupted runs,
//! matched by the well-known name prefix. Safe to call at any time;
//! "nothing to clean" is a success.

use std::path::PathBuf;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::SwarmError;

/// What a cleanup pass actually did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CleanupSummary {
    pub removed_containers: usize,
    pub compose_down: bool,
}

/// Removes leftover local units.
pub struct CleanupManager {
    container_prefix: String,
    compose_file: Option<PathBuf>,
}

impl CleanupManager {
    pub fn new(container_prefix: impl Into<String>, compose_file: Option<PathBuf>) -> Self {
        Self {
            container_prefix: container_prefix.into(),
            compose_file,
        }
    }

    /// Force-remove every container whose name carries the prefix, then
    /// best-effort tear down any compose-managed unit set. Only a
    /// removal command that itself fails surfaces as an error.
    pub async fn clean(&self) -> Result<CleanupSummary, SwarmError> {
        let mut summary = CleanupSummary::default();

        let filter = format!("name=^{}", self.container_prefix);
        let listing = Command::new("docker")
            .args(["ps", "-aq", "--filter", &filter])
            .output()
            .await
            .map_err(|e| SwarmError::cleanup(format!("failed to invoke docker: {e}")))?;

        if !listing.status.success() {
            let stderr = String::from_utf8_lossy(&listing.stderr);
            return Err(SwarmError::cleanup(format!(
                "docker ps failed: {}",
                stderr.trim()
            )));
        }

        let ids = parse_container_ids(&String::from_utf8_lossy(&listing.stdout));
        if ids.is_empty() {
            debug!("no leftover containers matching prefix {}", self.container_prefix);
        } else {
            let remove = Command::new("docker")
                .arg("rm")
                .arg("-f")
                .args(&ids)
                .output()
                .await
                .map_err(|e| SwarmError::cleanup(format!("failed to invoke docker: {e}")))?;

            if !remove.status.success() {
                let stderr = String::from_utf8_lossy(&remove.stderr);
                // A container that vanished between list and remove is
                // not a failure; anything else is.
                if !stderr.contains("No such container") {
                    return Err(SwarmError::cleanup(format!(
                        "docker rm failed: {}",
                        stderr.trim()
                    )));
                }
            }

            info!("removed {} leftover container(s)", ids.len());
            summary.removed_containers = ids.len();
        }

        summary.compose_down = self.compose_down().await;
        Ok(summary)
    }

    /// Best effort: a failing compose teardown never fails cleanup.
    async fn compose_down(&self) -> bool {
        let Some(compose_file) = &self.compose_file else {
            return false;
        };

        let result = Command::new("docker")
            .arg("compose")
            .arg("-f")
            .arg(compose_file)
            .args(["down", "--remove-orphans"])
            .output()
            .await;

        match result {
            Ok(output) if output.status.success() => true,
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                warn!("docker compose down failed: {}", stderr.trim());
                false
            }
            Err(e) => {
                warn!("docker compose down failed: {e}");
                false
            }
        }
    }
}

fn parse_container_ids(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_container_ids() {
        assert_eq!(
            parse_container_ids("abc123\ndef456\n"),
            vec!["abc123", "def456"]
        );
    }

    #[test]
    fn test_parse_container_ids_empty_output() {
        assert!(parse_container_ids("").is_empty());
        assert!(parse_container_ids("\n\n  \n").is_empty());
    }

    #[test]
    fn test_empty_summary_means_nothing_to_clean() {
        let summary = CleanupSummary::default();
        assert_eq!(summary.removed_containers, 0);
        assert!(!summary.compose_down);
    }
}
