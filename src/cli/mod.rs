//! CLI argument parsing
//!
//! Defines command-line interface using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Parallel end-to-end test swarm launcher
#[derive(Parser, Debug)]
#[command(name = "e2e-swarm")]
#[command(version)]
#[command(about = "Run many copies of an e2e test job and aggregate their outcomes")]
#[command(long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (table, json, json-pretty, summary)
    #[arg(short, long, global = true, default_value = "table")]
    pub format: String,

    /// Configuration file (YAML or JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the runnable unit image
    Build(BuildArgs),

    /// Run units locally and aggregate their outcomes
    Run(RunArgs),

    /// Run units on the remote cluster scheduler
    Scale(ScaleArgs),

    /// Remove leftover units from previous runs
    Clean,
}

/// Arguments for build command
#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Source repository to build the unit image from
    #[arg(short, long)]
    pub repository: Option<String>,

    /// Branch to build
    #[arg(short, long)]
    pub branch: Option<String>,

    /// Image tag for the built unit image
    #[arg(short, long)]
    pub tag: Option<String>,
}

/// Arguments for run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Number of units to run (positive integer)
    #[arg(default_value = "1")]
    pub count: String,

    /// Unit image reference
    #[arg(short, long)]
    pub image: Option<String>,

    /// Root directory for run artifacts
    #[arg(long)]
    pub results_root: Option<PathBuf>,

    /// Delay between successive launches in milliseconds
    #[arg(long)]
    pub stagger_ms: Option<u64>,

    /// Cap on simultaneously running units (default: no cap)
    #[arg(long)]
    pub max_in_flight: Option<usize>,

    /// Overall run deadline in seconds (default: none)
    #[arg(long)]
    pub deadline: Option<u64>,
}

/// Arguments for scale command
#[derive(Parser, Debug)]
pub struct ScaleArgs {
    /// Number of units to run (positive integer)
    pub count: String,

    /// Cluster identifier
    #[arg(long)]
    pub cluster: Option<String>,

    /// Comma-separated subnet ids
    #[arg(long)]
    pub subnets: Option<String>,

    /// Comma-separated security group ids
    #[arg(long)]
    pub security_groups: Option<String>,

    /// Task definition template file (JSON)
    #[arg(long)]
    pub template: Option<PathBuf>,

    /// Unit image reference
    #[arg(short, long)]
    pub image: Option<String>,

    /// Assign tasks a public IP
    #[arg(long)]
    pub public_ip: bool,
}
