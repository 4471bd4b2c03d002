//! Remote work unit executor
//!
//! Submits a batch of units to the cluster scheduler through the `aws`
//! CLI: register a task-definition revision with the resolved image,
//! issue one run-task request, and later wait on and describe the
//! accepted tasks. Artifacts stay internal to the remote environment,
//! so no host paths are mounted.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::RemoteConfig;
use crate::error::SwarmError;
use crate::models::{ClusterTask, UnitStatus, WorkUnit};

/// Task definition template as supplied by the caller. Only the image
/// field of each container definition is ever rewritten; every other
/// field passes through untouched.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDefinitionTemplate {
    pub container_definitions: Vec<ContainerDefinition>,
    #[serde(flatten)]
    pub rest: serde_json::Map<String, serde_json::Value>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerDefinition {
    pub image: String,
    #[serde(flatten)]
    pub rest: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterTaskDefinitionResponse {
    task_definition: RegisteredTaskDefinition,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisteredTaskDefinition {
    task_definition_arn: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunTaskResponse {
    #[serde(default)]
    pub tasks: Vec<TaskDescription>,
    #[serde(default)]
    pub failures: Vec<TaskFailure>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescribeTasksResponse {
    #[serde(default)]
    pub tasks: Vec<TaskDescription>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDescription {
    pub task_arn: String,
    pub last_status: Option<String>,
    #[serde(default)]
    pub containers: Vec<ContainerStatus>,
}

impl TaskDescription {
    /// Exit code of the unit's container, when the scheduler reported
    /// one. Multi-container tasks report the first container.
    pub fn unit_exit_code(&self) -> Option<i32> {
        self.containers.first().and_then(|c| c.exit_code)
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerStatus {
    pub name: Option<String>,
    pub exit_code: Option<i32>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskFailure {
    pub arn: Option<String>,
    pub reason: Option<String>,
    pub detail: Option<String>,
}

/// Outcome of one batch submission.
#[derive(Debug)]
pub struct RemoteBatch {
    pub accepted: Vec<ClusterTask>,
    pub failures: Vec<TaskFailure>,
}

/// Drives the cluster scheduler for a remote run.
#[derive(Clone, Debug)]
pub struct RemoteExecutor {
    remote: RemoteConfig,
}

impl RemoteExecutor {
    /// Takes a validated remote configuration; `RemoteConfig::validate`
    /// must have passed before anything here is called.
    pub fn new(remote: RemoteConfig) -> Self {
        Self { remote }
    }

    /// Register a new task-definition revision with only the image
    /// rewritten, returning the revision ARN.
    pub async fn register_revision(
        &self,
        template_path: &Path,
        image: &str,
    ) -> Result<String, SwarmError> {
        let raw = std::fs::read_to_string(template_path).map_err(|e| {
            SwarmError::config(format!(
                "cannot read job template {}: {e}",
                template_path.display()
            ))
        })?;
        let mut template: TaskDefinitionTemplate = serde_json::from_str(&raw).map_err(|e| {
            SwarmError::config(format!(
                "job template {} is not valid JSON: {e}",
                template_path.display()
            ))
        })?;

        rewrite_image(&mut template, image);

        let input = serde_json::to_string(&template)
            .map_err(|e| SwarmError::launch(format!("cannot serialize job template: {e}")))?;

        let response: RegisterTaskDefinitionResponse = aws_json(&[
            "ecs",
            "register-task-definition",
            "--cli-input-json",
            input.as_str(),
        ])
        .await
        .map_err(SwarmError::Launch)?;

        let arn = response.task_definition.task_definition_arn;
        info!("registered task definition revision {arn}");
        Ok(arn)
    }

    /// Submit one batch request for `count` copies of the revision.
    /// A whole-batch rejection is an error; per-task placement failures
    /// come back in the response and are not waited upon.
    pub async fn submit_batch(
        &self,
        revision_arn: &str,
        count: u32,
    ) -> Result<RemoteBatch, SwarmError> {
        let network = self.network_configuration();
        let count_arg = count.to_string();

        let response: RunTaskResponse = aws_json(&[
            "ecs",
            "run-task",
            "--cluster",
            self.remote.cluster.as_str(),
            "--task-definition",
            revision_arn,
            "--count",
            count_arg.as_str(),
            "--launch-type",
            self.remote.launch_type.as_str(),
            "--network-configuration",
            network.as_str(),
        ])
        .await
        .map_err(SwarmError::Launch)?;

        if response.tasks.is_empty() {
            let reasons = failure_reasons(&response.failures);
            return Err(SwarmError::launch(format!(
                "scheduler rejected the whole batch: {reasons}"
            )));
        }

        for failure in &response.failures {
            warn!(
                "task not scheduled: {}",
                failure.reason.as_deref().unwrap_or("no reason given")
            );
        }

        let accepted = response
            .tasks
            .into_iter()
            .map(|t| ClusterTask {
                task_arn: t.task_arn,
                last_status: t.last_status.unwrap_or_else(|| "PROVISIONING".to_string()),
            })
            .collect();

        Ok(RemoteBatch {
            accepted,
            failures: response.failures,
        })
    }

    /// Block until every accepted task has stopped. Delegates to the
    /// scheduler's native waiter; no polling loop of our own.
    pub async fn wait_stopped(&self, task_arns: &[String]) -> Result<(), SwarmError> {
        let mut args = vec![
            "ecs",
            "wait",
            "tasks-stopped",
            "--cluster",
            self.remote.cluster.as_str(),
            "--tasks",
        ];
        args.extend(task_arns.iter().map(String::as_str));

        aws_ok(&args).await.map_err(SwarmError::Aggregation)
    }

    /// One status query for the whole accepted set.
    pub async fn describe(&self, task_arns: &[String]) -> Result<Vec<TaskDescription>, SwarmError> {
        let mut args = vec![
            "ecs",
            "describe-tasks",
            "--cluster",
            self.remote.cluster.as_str(),
            "--tasks",
        ];
        args.extend(task_arns.iter().map(String::as_str));

        let response: DescribeTasksResponse =
            aws_json(&args).await.map_err(SwarmError::Aggregation)?;
        Ok(response.tasks)
    }

    fn network_configuration(&self) -> String {
        let public_ip = if self.remote.assign_public_ip {
            "ENABLED"
        } else {
            "DISABLED"
        };
        format!(
            "awsvpcConfiguration={{subnets=[{}],securityGroups=[{}],assignPublicIp={}}}",
            self.remote.subnets.join(","),
            self.remote.security_groups.join(","),
            public_ip
        )
    }
}

/// Rewrite the image reference of every container definition in place.
pub fn rewrite_image(template: &mut TaskDefinitionTemplate, image: &str) {
    for container in &mut template.container_definitions {
        container.image = image.to_string();
    }
}

/// Turn a batch response into the run's work units: accepted tasks are
/// `running`, placement failures are `unknown` immediately, and indices
/// stay contiguous up to the requested count so no unit is dropped.
pub fn batch_units(batch: &RemoteBatch, requested: u32) -> Vec<WorkUnit> {
    let mut units = Vec::with_capacity(requested as usize);

    for (i, task) in batch.accepted.iter().enumerate() {
        let unit = WorkUnit {
            index: i as u32 + 1,
            handle_id: Some(task.task_arn.clone()),
            artifact_dir: None,
            status: UnitStatus::Running,
            exit_code: None,
        };
        units.push(unit);
    }

    for index in batch.accepted.len() as u32 + 1..=requested {
        units.push(WorkUnit::never_started(index));
    }

    units
}

fn failure_reasons(failures: &[TaskFailure]) -> String {
    if failures.is_empty() {
        return "no failure detail returned".to_string();
    }
    failures
        .iter()
        .map(|f| f.reason.as_deref().unwrap_or("unknown reason"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Run an aws subcommand and parse its JSON output.
async fn aws_json<T: serde::de::DeserializeOwned>(args: &[&str]) -> Result<T, String> {
    let stdout = aws_capture(args).await?;
    serde_json::from_str(&stdout)
        .map_err(|e| format!("unparseable response from aws {}: {e}", args.join(" ")))
}

/// Run an aws subcommand for effect only.
async fn aws_ok(args: &[&str]) -> Result<(), String> {
    aws_capture(args).await.map(|_| ())
}

async fn aws_capture(args: &[&str]) -> Result<String, String> {
    debug!("aws {}", args.join(" "));

    let output = Command::new("aws")
        .args(args)
        .args(["--output", "json"])
        .output()
        .await
        .map_err(|e| format!("failed to invoke aws CLI: {e}"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!(
            "aws {} {} failed: {}",
            args.first().unwrap_or(&""),
            args.get(1).unwrap_or(&""),
            stderr.trim()
        ));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrite_image_touches_only_image_fields() {
        let raw = r#"{
            "family": "e2e-suite",
            "cpu": "1024",
            "memory": "4096",
            "containerDefinitions": [
                {"name": "e2e", "image": "old:1", "essential": true},
                {"name": "sidecar", "image": "old:2"}
            ]
        }"#;
        let mut template: TaskDefinitionTemplate = serde_json::from_str(raw).unwrap();

        rewrite_image(&mut template, "registry.example.com/e2e:v9");

        for container in &template.container_definitions {
            assert_eq!(container.image, "registry.example.com/e2e:v9");
        }
        // untouched fields survive the round trip
        assert_eq!(
            template.rest.get("family").and_then(|v| v.as_str()),
            Some("e2e-suite")
        );
        assert_eq!(
            template.container_definitions[0]
                .rest
                .get("essential")
                .and_then(|v| v.as_bool()),
            Some(true)
        );

        let out = serde_json::to_value(&template).unwrap();
        assert_eq!(out["cpu"], "1024");
        assert_eq!(out["containerDefinitions"][1]["name"], "sidecar");
    }

    #[test]
    fn test_run_task_response_parses_tasks_and_failures() {
        let raw = r#"{
            "tasks": [
                {"taskArn": "arn:task/1", "lastStatus": "PROVISIONING"},
                {"taskArn": "arn:task/2", "lastStatus": "PENDING"}
            ],
            "failures": [
                {"arn": null, "reason": "RESOURCE:MEMORY", "detail": null}
            ]
        }"#;
        let response: RunTaskResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.tasks.len(), 2);
        assert_eq!(response.failures.len(), 1);
        assert_eq!(
            response.failures[0].reason.as_deref(),
            Some("RESOURCE:MEMORY")
        );
    }

    #[test]
    fn test_batch_units_partial_failure_keeps_contiguous_indices() {
        let accepted: Vec<ClusterTask> = (1..=8)
            .map(|i| ClusterTask {
                task_arn: format!("arn:task/{i}"),
                last_status: "PENDING".to_string(),
            })
            .collect();
        let batch = RemoteBatch {
            accepted,
            failures: vec![
                TaskFailure {
                    arn: None,
                    reason: Some("RESOURCE:CPU".to_string()),
                    detail: None,
                },
                TaskFailure {
                    arn: None,
                    reason: Some("RESOURCE:MEMORY".to_string()),
                    detail: None,
                },
            ],
        };

        let units = batch_units(&batch, 10);

        assert_eq!(units.len(), 10);
        let indices: Vec<u32> = units.iter().map(|u| u.index).collect();
        assert_eq!(indices, (1..=10).collect::<Vec<u32>>());

        let unknown: Vec<_> = units
            .iter()
            .filter(|u| u.status == UnitStatus::Unknown)
            .collect();
        assert_eq!(unknown.len(), 2);
        assert!(unknown.iter().all(|u| u.exit_code.is_none()));
        assert!(unknown.iter().all(|u| u.handle_id.is_none()));

        let running = units
            .iter()
            .filter(|u| u.status == UnitStatus::Running)
            .count();
        assert_eq!(running, 8);
    }

    #[test]
    fn test_describe_exit_code_from_first_container() {
        let raw = r#"{
            "tasks": [
                {
                    "taskArn": "arn:task/1",
                    "lastStatus": "STOPPED",
                    "containers": [{"name": "e2e", "exitCode": 0}]
                },
                {
                    "taskArn": "arn:task/2",
                    "lastStatus": "STOPPED",
                    "containers": [{"name": "e2e"}]
                }
            ]
        }"#;
        let response: DescribeTasksResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.tasks[0].unit_exit_code(), Some(0));
        assert_eq!(response.tasks[1].unit_exit_code(), None);
    }

    #[test]
    fn test_network_configuration_rendering() {
        let executor = RemoteExecutor::new(RemoteConfig {
            cluster: "e2e-cluster".to_string(),
            subnets: vec!["subnet-a".to_string(), "subnet-b".to_string()],
            security_groups: vec!["sg-1".to_string()],
            template_path: None,
            assign_public_ip: true,
            launch_type: "FARGATE".to_string(),
        });

        assert_eq!(
            executor.network_configuration(),
            "awsvpcConfiguration={subnets=[subnet-a,subnet-b],securityGroups=[sg-1],assignPublicIp=ENABLED}"
        );
    }
}
