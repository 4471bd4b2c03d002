//! Run coordination
//!
//! Drives N executor launches, owns the fan-in wait phase, and hands
//! the collected outcomes to the aggregator. Units are fully
//! independent: one failing never cancels its siblings.

pub mod aggregate;

use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::artifacts;
use crate::config::SwarmConfig;
use crate::error::SwarmError;
use crate::executor::{batch_units, LocalExecutor, RemoteExecutor};
use crate::models::{JobTemplate, Run, RunMode, RunReport, UnitStatus, WorkUnit};

/// Orchestrates a run from launch through aggregation.
pub struct RunCoordinator {
    config: SwarmConfig,
}

impl RunCoordinator {
    pub fn new(config: SwarmConfig) -> Self {
        Self { config }
    }

    /// Run `count` units as local containers and wait for all of them.
    ///
    /// Launches are staggered to avoid a thundering-herd spike on the
    /// host and optionally capped by `max_in_flight`; by default every
    /// requested unit runs at once. An interrupt aborts the wait and
    /// kills the locally-owned containers.
    pub async fn run_local(
        &self,
        job: &JobTemplate,
        count: u32,
        interactive: bool,
    ) -> Result<RunReport, SwarmError> {
        let mut run = Run::new(RunMode::Local, count);
        let paths = artifacts::allocate(&self.config.results_root, &run.run_id, count)?;
        run.root_artifact_path = Some(paths.root.clone());

        info!(
            "run {}: launching {} local unit(s), artifacts under {}",
            run.run_id,
            count,
            paths.root.display()
        );

        let executor = LocalExecutor::new(&self.config.container_prefix, &run.run_id);
        let permits = self.config.max_in_flight.unwrap_or(count as usize).max(1);
        let semaphore = Arc::new(Semaphore::new(permits));
        let stagger = Duration::from_millis(self.config.stagger_ms);

        let mut handles: Vec<JoinHandle<WorkUnit>> = Vec::with_capacity(count as usize);
        for (i, unit_paths) in paths.units.iter().enumerate() {
            let index = i as u32 + 1;
            let executor = executor.clone();
            let job = job.clone();
            let unit_paths = unit_paths.clone();
            let semaphore = semaphore.clone();
            // Only one interactive session is meaningful at a time.
            let interactive = interactive && index == 1;
            let delay = stagger * i as u32;

            handles.push(tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return WorkUnit::never_started(index),
                };

                let launched = match executor.launch(&job, index, &unit_paths, interactive).await {
                    Ok(launched) => launched,
                    Err(e) => {
                        warn!("unit {index} never started: {e}");
                        return WorkUnit::never_started(index).with_artifact_dir(&unit_paths.dir);
                    }
                };

                let mut unit = WorkUnit::pending(index)
                    .with_handle(&launched.container_name)
                    .with_artifact_dir(&unit_paths.dir);
                unit.status = UnitStatus::Running;

                let mut child = launched.child;
                unit.exit_code = match child.wait().await {
                    Ok(status) => status.code(),
                    Err(e) => {
                        warn!("unit {index}: could not read exit status: {e}");
                        None
                    }
                };
                unit.status = aggregate::terminal_status(unit.exit_code);
                unit
            }));
        }

        let abort_handles: Vec<_> = handles.iter().map(|h| h.abort_handle()).collect();
        let mut units = Vec::with_capacity(count as usize);
        let deadline = self.config.run_deadline_secs.map(Duration::from_secs);

        let outcome = {
            let collect = async {
                // join_all keeps spawn order, so position i is unit i+1.
                let drain = async {
                    for (i, joined) in join_all(handles).await.into_iter().enumerate() {
                        units.push(recovered_unit(i as u32 + 1, joined));
                    }
                };
                match deadline {
                    Some(limit) => tokio::time::timeout(limit, drain).await.map_err(|_| {
                        SwarmError::aggregation(format!(
                            "run deadline of {}s exceeded",
                            limit.as_secs()
                        ))
                    }),
                    None => {
                        drain.await;
                        Ok(())
                    }
                }
            };
            tokio::select! {
                result = collect => result,
                _ = tokio::signal::ctrl_c() => Err(SwarmError::Interrupted),
            }
        };

        if let Err(e) = outcome {
            // Aborting the tasks kills their containers (kill_on_drop);
            // best effort, nothing to do for ones already gone.
            for handle in &abort_handles {
                handle.abort();
            }
            return Err(e);
        }

        run.units = units;
        Ok(aggregate::finalize(run))
    }

    /// Run `count` units as one batch on the remote scheduler.
    pub async fn run_remote(&self, count: u32) -> Result<RunReport, SwarmError> {
        self.config.remote.validate()?;
        let template_path = self
            .config
            .remote
            .template_path
            .clone()
            .ok_or_else(|| SwarmError::config("job template path is not set"))?;

        let mut run = Run::new(RunMode::Remote, count);
        let executor = RemoteExecutor::new(self.config.remote.clone());

        let revision = executor
            .register_revision(&template_path, &self.config.image)
            .await?;
        let batch = executor.submit_batch(&revision, count).await?;

        let mut units = batch_units(&batch, count);
        let arns: Vec<String> = batch
            .accepted
            .iter()
            .map(|t| t.task_arn.clone())
            .collect();

        info!(
            "run {}: {} task(s) accepted, {} not scheduled; waiting for completion",
            run.run_id,
            arns.len(),
            batch.failures.len()
        );

        let wait = executor.wait_stopped(&arns);
        match self.config.run_deadline_secs.map(Duration::from_secs) {
            Some(limit) => tokio::time::timeout(limit, wait).await.map_err(|_| {
                SwarmError::aggregation(format!("run deadline of {}s exceeded", limit.as_secs()))
            })??,
            None => wait.await?,
        }

        let described = executor.describe(&arns).await?;
        for task in &described {
            if let Some(unit) = units
                .iter_mut()
                .find(|u| u.handle_id.as_deref() == Some(task.task_arn.as_str()))
            {
                unit.exit_code = task.unit_exit_code();
                unit.status = aggregate::terminal_status(unit.exit_code);
            }
        }

        // Tasks the status query did not cover have no readable state.
        for unit in &mut units {
            if unit.status == UnitStatus::Running {
                warn!("unit {}: no terminal status reported", unit.index);
                unit.status = UnitStatus::Failed;
            }
        }

        run.units = units;
        Ok(aggregate::finalize(run))
    }
}

/// A worker task that panicked or was torn down never produced its
/// unit; record it as never started rather than dropping it from the
/// report.
fn recovered_unit(
    index: u32,
    joined: Result<WorkUnit, impl std::fmt::Display>,
) -> WorkUnit {
    match joined {
        Ok(unit) => {
            info!("{unit}");
            unit
        }
        Err(e) => {
            warn!("unit {index}: worker task lost: {e}");
            WorkUnit::never_started(index)
        }
    }
}
