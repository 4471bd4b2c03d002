//! Unit image build
//!
//! Materializes the runnable unit image from the configured source
//! repository and branch. Plumbing only; the rest of the launcher
//! consumes the resulting image reference as an opaque input.

use tokio::process::Command;
use tracing::info;

use crate::config::{BuildConfig, SwarmConfig};
use crate::error::SwarmError;

pub struct ImageBuilder {
    build: BuildConfig,
    tag: String,
}

impl ImageBuilder {
    pub fn new(config: &SwarmConfig) -> Self {
        Self {
            build: config.build.clone(),
            tag: config.image.clone(),
        }
    }

    /// Run `docker build`, passing the repository and branch through as
    /// build args. Returns the image reference on success.
    pub async fn build(&self) -> Result<String, SwarmError> {
        if self.build.repository.trim().is_empty() {
            return Err(SwarmError::config("build repository is not set"));
        }

        let args = self.docker_build_args();
        info!("building unit image {} from {}@{}", self.tag, self.build.repository, self.build.branch);

        let status = Command::new("docker")
            .args(&args)
            .status()
            .await
            .map_err(|e| SwarmError::launch(format!("failed to invoke docker: {e}")))?;

        if !status.success() {
            return Err(SwarmError::launch(format!(
                "docker build exited with {}",
                status.code().unwrap_or(-1)
            )));
        }

        info!("unit image {} built", self.tag);
        Ok(self.tag.clone())
    }

    fn docker_build_args(&self) -> Vec<String> {
        let mut args = vec![
            "build".to_string(),
            "-t".to_string(),
            self.tag.clone(),
            "--build-arg".to_string(),
            format!("REPOSITORY={}", self.build.repository),
            "--build-arg".to_string(),
            format!("BRANCH={}", self.build.branch),
        ];
        if let Some(dockerfile) = &self.build.dockerfile {
            args.push("-f".to_string());
            args.push(dockerfile.display().to_string());
        }
        args.push(self.build.context.display().to_string());
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_build_args_carry_repository_and_branch() {
        let mut config = SwarmConfig::default();
        config.image = "e2e-suite:pr-42".to_string();
        config.build.repository = "git@example.com:org/suite.git".to_string();
        config.build.branch = "release".to_string();
        config.build.dockerfile = Some(PathBuf::from("docker/Dockerfile.e2e"));

        let builder = ImageBuilder::new(&config);
        let args = builder.docker_build_args();
        let joined = args.join(" ");

        assert!(joined.starts_with("build -t e2e-suite:pr-42"));
        assert!(joined.contains("REPOSITORY=git@example.com:org/suite.git"));
        assert!(joined.contains("BRANCH=release"));
        assert!(joined.contains("-f docker/Dockerfile.e2e"));
        assert_eq!(args.last().map(String::as_str), Some("."));
    }

    #[test]
    fn test_empty_repository_is_a_config_error() {
        let config = SwarmConfig::default();
        let builder = ImageBuilder::new(&config);
        let err = tokio_test::block_on(builder.build()).unwrap_err();
        assert!(matches!(err, SwarmError::Config(_)));
    }
}
