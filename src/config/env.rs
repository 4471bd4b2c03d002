//! Environment variable configuration
//!
//! Provides environment variable overrides for configuration.

use std::env;
use std::path::PathBuf;

use super::SwarmConfig;

/// Environment variable prefix
const ENV_PREFIX: &str = "SWARM";

/// Environment configuration from environment variables
#[derive(Clone, Debug, Default)]
pub struct EnvConfig {
    /// Unit image from SWARM_IMAGE
    pub image: Option<String>,
    /// Artifact root from SWARM_RESULTS_ROOT
    pub results_root: Option<PathBuf>,
    /// Container prefix from SWARM_CONTAINER_PREFIX
    pub container_prefix: Option<String>,
    /// Launch stagger from SWARM_STAGGER_MS
    pub stagger_ms: Option<u64>,
    /// In-flight cap from SWARM_MAX_IN_FLIGHT
    pub max_in_flight: Option<usize>,
    /// Run deadline from SWARM_RUN_DEADLINE_SECS
    pub run_deadline_secs: Option<u64>,
    /// Cluster id from SWARM_CLUSTER
    pub cluster: Option<String>,
    /// Comma-separated subnets from SWARM_SUBNETS
    pub subnets: Option<Vec<String>>,
    /// Comma-separated security groups from SWARM_SECURITY_GROUPS
    pub security_groups: Option<Vec<String>>,
    /// Template file from SWARM_TEMPLATE
    pub template_path: Option<PathBuf>,
    /// Config file from SWARM_CONFIG
    pub config_file: Option<PathBuf>,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        Self {
            image: get_env("IMAGE"),
            results_root: get_env("RESULTS_ROOT").map(PathBuf::from),
            container_prefix: get_env("CONTAINER_PREFIX"),
            stagger_ms: get_env_parse("STAGGER_MS"),
            max_in_flight: get_env_parse("MAX_IN_FLIGHT"),
            run_deadline_secs: get_env_parse("RUN_DEADLINE_SECS"),
            cluster: get_env("CLUSTER"),
            subnets: get_env("SUBNETS").map(|v| split_list(&v)),
            security_groups: get_env("SECURITY_GROUPS").map(|v| split_list(&v)),
            template_path: get_env("TEMPLATE").map(PathBuf::from),
            config_file: get_env("CONFIG").map(PathBuf::from),
        }
    }

    /// Layer these overrides onto a configuration.
    pub fn apply(&self, config: &mut SwarmConfig) {
        if let Some(v) = &self.image {
            config.image = v.clone();
        }
        if let Some(v) = &self.results_root {
            config.results_root = v.clone();
        }
        if let Some(v) = &self.container_prefix {
            config.container_prefix = v.clone();
        }
        if let Some(v) = self.stagger_ms {
            config.stagger_ms = v;
        }
        if let Some(v) = self.max_in_flight {
            config.max_in_flight = Some(v);
        }
        if let Some(v) = self.run_deadline_secs {
            config.run_deadline_secs = Some(v);
        }
        if let Some(v) = &self.cluster {
            config.remote.cluster = v.clone();
        }
        if let Some(v) = &self.subnets {
            config.remote.subnets = v.clone();
        }
        if let Some(v) = &self.security_groups {
            config.remote.security_groups = v.clone();
        }
        if let Some(v) = &self.template_path {
            config.remote.template_path = Some(v.clone());
        }
    }
}

/// Get environment variable with prefix
fn get_env(name: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}_{name}")).ok()
}

/// Get and parse environment variable with prefix
fn get_env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    get_env(name).and_then(|v| v.parse().ok())
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
