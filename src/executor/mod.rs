//! Work unit executors
//!
//! Launches units locally as Docker containers or remotely through the
//! cluster scheduler. Neither variant blocks past submission.

mod local;
mod remote;

pub use local::{LocalExecutor, LocalUnit};
pub use remote::{batch_units, RemoteBatch, RemoteExecutor, TaskDescription};
