//! Configuration module
//!
//! Builds the explicit configuration value object once at entry; every
//! component receives it by argument. No ambient globals.

#![allow(dead_code)]

mod env;

pub use env::EnvConfig;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::SwarmError;

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SwarmConfig {
    /// Runnable unit image reference.
    pub image: String,

    /// Root directory for local run artifacts.
    pub results_root: PathBuf,

    /// Well-known name prefix for locally launched containers; cleanup
    /// identifies leftovers by it.
    pub container_prefix: String,

    /// Shared-memory size for local units.
    pub shm_size: String,

    /// CPU limit per local unit, e.g. "2.0". None = engine default.
    pub unit_cpus: Option<String>,

    /// Memory limit per local unit, e.g. "4g". None = engine default.
    pub unit_memory: Option<String>,

    /// Delay between successive local launches, in milliseconds.
    pub stagger_ms: u64,

    /// Opt-in cap on simultaneously running local units.
    /// None = no throttling, every requested unit is in flight at once.
    pub max_in_flight: Option<usize>,

    /// Opt-in overall-run deadline in seconds. None = wait forever,
    /// matching the historical behavior.
    pub run_deadline_secs: Option<u64>,

    /// Environment forwarded to every unit.
    pub unit_env: BTreeMap<String, String>,

    /// Compose file used for best-effort cleanup, when the suite is
    /// also runnable through docker compose.
    pub compose_file: Option<PathBuf>,

    /// Image build settings for the `build` command.
    pub build: BuildConfig,

    /// Remote scheduler settings for the `scale` command.
    pub remote: RemoteConfig,
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            image: "e2e-suite:latest".to_string(),
            results_root: PathBuf::from("test-artifacts"),
            container_prefix: "e2e-swarm".to_string(),
            shm_size: "2g".to_string(),
            unit_cpus: None,
            unit_memory: None,
            stagger_ms: 750,
            max_in_flight: None,
            run_deadline_secs: None,
            unit_env: BTreeMap::new(),
            compose_file: None,
            build: BuildConfig::default(),
            remote: RemoteConfig::default(),
        }
    }
}

impl SwarmConfig {
    /// Load configuration from a YAML or JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content =
            std::fs::read_to_string(path.as_ref()).context("Failed to read config file")?;

        let config: Self = if path
            .as_ref()
            .extension()
            .map(|e| e == "yaml" || e == "yml")
            .unwrap_or(false)
        {
            serde_yaml::from_str(&content).context("Failed to parse YAML config")?
        } else {
            serde_json::from_str(&content).context("Failed to parse JSON config")?
        };

        Ok(config)
    }

    /// Save configuration to a YAML or JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = if path
            .as_ref()
            .extension()
            .map(|e| e == "yaml" || e == "yml")
            .unwrap_or(false)
        {
            serde_yaml::to_string(self).context("Failed to serialize config")?
        } else {
            serde_json::to_string_pretty(self).context("Failed to serialize config")?
        };

        std::fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }
}

/// Image build settings
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Source repository the unit image is built from.
    pub repository: String,

    /// Branch to build.
    pub branch: String,

    /// Docker build context directory.
    pub context: PathBuf,

    /// Dockerfile path, relative to the context when not absolute.
    pub dockerfile: Option<PathBuf>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            repository: String::new(),
            branch: "main".to_string(),
            context: PathBuf::from("."),
            dockerfile: None,
        }
    }
}

/// Remote scheduler settings
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Cluster identifier.
    pub cluster: String,

    /// Subnets for the awsvpc network configuration.
    pub subnets: Vec<String>,

    /// Security groups for the awsvpc network configuration.
    pub security_groups: Vec<String>,

    /// Task definition template file (JSON).
    pub template_path: Option<PathBuf>,

    /// Whether tasks get a public IP.
    pub assign_public_ip: bool,

    /// Scheduler launch type, e.g. "FARGATE".
    pub launch_type: String,
}

impl RemoteConfig {
    /// Fail fast when any value required for a remote run is missing.
    /// Nothing is launched past this point on error.
    pub fn validate(&self) -> Result<(), SwarmError> {
        if self.cluster.trim().is_empty() {
            return Err(SwarmError::config("cluster identifier is empty"));
        }
        if self.subnets.is_empty() || self.subnets.iter().any(|s| s.trim().is_empty()) {
            return Err(SwarmError::config("subnet list is empty"));
        }
        if self.security_groups.is_empty()
            || self.security_groups.iter().any(|s| s.trim().is_empty())
        {
            return Err(SwarmError::config("security group list is empty"));
        }
        let template = self
            .template_path
            .as_ref()
            .ok_or_else(|| SwarmError::config("job template path is not set"))?;
        if !template.is_file() {
            return Err(SwarmError::config(format!(
                "job template file not found: {}",
                template.display()
            )));
        }
        if self.launch_type.trim().is_empty() {
            return Err(SwarmError::config("launch type is empty"));
        }
        Ok(())
    }
}

/// Parse a unit count argument. Counts must be positive integers; this
/// runs before any unit is launched.
pub fn parse_count(raw: &str) -> Result<u32, SwarmError> {
    let count: u32 = raw
        .trim()
        .parse()
        .map_err(|_| SwarmError::config(format!("invalid unit count '{raw}'")))?;
    if count == 0 {
        return Err(SwarmError::config("unit count must be at least 1"));
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = SwarmConfig::default();
        assert_eq!(config.container_prefix, "e2e-swarm");
        assert_eq!(config.shm_size, "2g");
        assert!(config.max_in_flight.is_none());
        assert!(config.run_deadline_secs.is_none());
    }

    #[test]
    fn test_parse_count_accepts_positive_integers() {
        assert_eq!(parse_count("1").unwrap(), 1);
        assert_eq!(parse_count("25").unwrap(), 25);
        assert_eq!(parse_count(" 5 ").unwrap(), 5);
    }

    #[test]
    fn test_parse_count_rejects_garbage() {
        assert!(parse_count("abc").is_err());
        assert!(parse_count("0").is_err());
        assert!(parse_count("-3").is_err());
        assert!(parse_count("").is_err());
        assert!(parse_count("1.5").is_err());
    }

    #[test]
    fn test_remote_validation_requires_every_field() {
        let template = tempfile::NamedTempFile::new().unwrap();

        let mut remote = RemoteConfig {
            cluster: "e2e-cluster".to_string(),
            subnets: vec!["subnet-0a1b".to_string()],
            security_groups: vec!["sg-9f8e".to_string()],
            template_path: Some(template.path().to_path_buf()),
            assign_public_ip: false,
            launch_type: "FARGATE".to_string(),
        };
        assert!(remote.validate().is_ok());

        remote.cluster.clear();
        assert!(remote.validate().is_err());
        remote.cluster = "e2e-cluster".to_string();

        remote.subnets.clear();
        assert!(remote.validate().is_err());
        remote.subnets = vec!["subnet-0a1b".to_string()];

        remote.security_groups = vec!["".to_string()];
        assert!(remote.validate().is_err());
        remote.security_groups = vec!["sg-9f8e".to_string()];

        remote.template_path = Some(PathBuf::from("/nonexistent/task-def.json"));
        assert!(remote.validate().is_err());
    }

    #[test]
    fn test_load_yaml_config() {
        let mut file = tempfile::Builder::new()
            .suffix(".yaml")
            .tempfile()
            .unwrap();
        writeln!(
            file,
            "image: registry.example.com/e2e:v3\nstagger_ms: 200\nmax_in_flight: 8"
        )
        .unwrap();

        let config = SwarmConfig::load(file.path()).unwrap();
        assert_eq!(config.image, "registry.example.com/e2e:v3");
        assert_eq!(config.stagger_ms, 200);
        assert_eq!(config.max_in_flight, Some(8));
        // untouched fields keep defaults
        assert_eq!(config.container_prefix, "e2e-swarm");
    }
}
