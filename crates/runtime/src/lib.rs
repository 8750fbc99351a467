//! Workflow executors
//!
//! A [`Runtime`] receives batches of tasks that belong to one workflow and
//! one direction (all creations or all deletions) and applies them to the
//! cluster it stands for.

mod error;
mod kubernetes;

pub use error::{Result, RuntimeError};
pub use kubernetes::KubernetesRuntime;

use async_trait::async_trait;
use venona_core::Task;

#[async_trait]
pub trait Runtime: Send + Sync {
    /// Brings up the resources of a workflow
    async fn start_workflow(&self, tasks: &[Task]) -> Result<()>;

    /// Tears down the resources of a workflow
    async fn terminate_workflow(&self, tasks: &[Task]) -> Result<()>;
}
