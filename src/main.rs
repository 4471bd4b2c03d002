//! e2e-swarm - parallel end-to-end test launcher
//!
//! Runs a configurable count of independent copies of an e2e test job,
//! locally as Docker containers or remotely as a batch on a cluster
//! scheduler, waits for every unit to reach a terminal state, and
//! reduces the outcomes to one aggregate verdict.
//!
//! ## Usage
//!
//! ```bash
//! # Build the unit image
//! e2e-swarm build --repository git@example.com:org/suite.git --branch main
//!
//! # Run 5 units locally, artifacts under test-artifacts/<timestamp>/
//! e2e-swarm run 5
//!
//! # Run 25 units on the cluster scheduler
//! e2e-swarm scale 25 --cluster e2e-cluster --subnets subnet-a,subnet-b \
//!     --security-groups sg-1 --template task-def.json
//!
//! # Remove leftovers from interrupted runs
//! e2e-swarm clean
//! ```

use anyhow::Result;
use clap::Parser;
use std::io::IsTerminal;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

mod artifacts;
mod cleanup;
mod cli;
mod config;
mod coordinator;
mod error;
mod executor;
mod image;
mod models;
mod output;

use cleanup::CleanupManager;
use cli::Args;
use config::{parse_count, EnvConfig, SwarmConfig};
use coordinator::RunCoordinator;
use image::ImageBuilder;
use models::{JobTemplate, ResourceLimits, RunReport};
use output::{OutputFormat, ReportFormatter};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .init();

    let env = EnvConfig::load();
    let mut config = match args.config.as_ref().or(env.config_file.as_ref()) {
        Some(path) => SwarmConfig::load(path)?,
        None => SwarmConfig::default(),
    };
    env.apply(&mut config);

    let formatter = ReportFormatter::new(OutputFormat::parse(&args.format)?);

    match args.command {
        cli::Command::Build(build_args) => {
            build_image(config, build_args).await?;
        }
        cli::Command::Run(run_args) => {
            let report = run_local(config, run_args).await?;
            finish(&formatter, &report);
        }
        cli::Command::Scale(scale_args) => {
            let report = run_remote(config, scale_args).await?;
            finish(&formatter, &report);
        }
        cli::Command::Clean => {
            clean(config).await?;
        }
    }

    Ok(())
}

/// Print the report and exit with the aggregate verdict.
fn finish(formatter: &ReportFormatter, report: &RunReport) -> ! {
    println!("{}", formatter.format_report(report));
    std::process::exit(report.overall.exit_code());
}

async fn build_image(mut config: SwarmConfig, args: cli::BuildArgs) -> Result<()> {
    if let Some(repository) = args.repository {
        config.build.repository = repository;
    }
    if let Some(branch) = args.branch {
        config.build.branch = branch;
    }
    if let Some(tag) = args.tag {
        config.image = tag;
    }

    let tag = ImageBuilder::new(&config).build().await?;
    println!("{tag}");
    Ok(())
}

async fn run_local(mut config: SwarmConfig, args: cli::RunArgs) -> Result<RunReport> {
    let count = parse_count(&args.count)?;

    if let Some(image) = args.image {
        config.image = image;
    }
    if let Some(results_root) = args.results_root {
        config.results_root = results_root;
    }
    if let Some(stagger_ms) = args.stagger_ms {
        config.stagger_ms = stagger_ms;
    }
    if let Some(max_in_flight) = args.max_in_flight {
        config.max_in_flight = Some(max_in_flight);
    }
    if let Some(deadline) = args.deadline {
        config.run_deadline_secs = Some(deadline);
    }

    let job = job_template(&config);
    // Exactly one unit may own the terminal, and only when there is one.
    let interactive = std::io::stdin().is_terminal();

    info!("running {count} unit(s) of {} locally", job.image);

    let coordinator = RunCoordinator::new(config);
    let report = coordinator.run_local(&job, count, interactive).await?;
    Ok(report)
}

async fn run_remote(mut config: SwarmConfig, args: cli::ScaleArgs) -> Result<RunReport> {
    let count = parse_count(&args.count)?;

    if let Some(cluster) = args.cluster {
        config.remote.cluster = cluster;
    }
    if let Some(subnets) = args.subnets {
        config.remote.subnets = split_csv(&subnets);
    }
    if let Some(security_groups) = args.security_groups {
        config.remote.security_groups = split_csv(&security_groups);
    }
    if let Some(template) = args.template {
        config.remote.template_path = Some(template);
    }
    if let Some(image) = args.image {
        config.image = image;
    }
    if args.public_ip {
        config.remote.assign_public_ip = true;
    }
    if config.remote.launch_type.is_empty() {
        config.remote.launch_type = "FARGATE".to_string();
    }

    // Fail fast, before anything is launched.
    config.remote.validate()?;

    info!(
        "running {count} unit(s) of {} on cluster {}",
        config.image, config.remote.cluster
    );

    let coordinator = RunCoordinator::new(config);
    let report = coordinator.run_remote(count).await?;
    Ok(report)
}

async fn clean(config: SwarmConfig) -> Result<()> {
    let manager = CleanupManager::new(&config.container_prefix, config.compose_file.clone());
    let summary = manager.clean().await?;

    if summary.removed_containers == 0 {
        println!("nothing to clean");
    } else {
        println!("removed {} container(s)", summary.removed_containers);
    }
    Ok(())
}

fn job_template(config: &SwarmConfig) -> JobTemplate {
    let mut job = JobTemplate::new(&config.image).with_limits(ResourceLimits {
        shm_size: config.shm_size.clone(),
        cpus: config.unit_cpus.clone(),
        memory: config.unit_memory.clone(),
    });
    job.env = config.unit_env.clone();
    job
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
