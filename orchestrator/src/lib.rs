mod command;
mod config;
mod error;
mod images;
mod job;
pub mod menu;
mod orchestrator;

pub use command::{Command, OperationStatus, Reply, GET_STATUS};
pub use config::OrchestratorConfig;
pub use error::{OrchestratorError, Result};
pub use images::collect_images;
pub use job::{ReconstructionJob, WorkflowMessage};
pub use orchestrator::Orchestrator;
