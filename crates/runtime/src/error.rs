use thiserror::Error;
use venona_core::TaskType;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Task {task_type} cannot be used to {operation} a workflow")]
    UnsupportedTask {
        task_type: TaskType,
        operation: &'static str,
    },

    #[error("Invalid {task_type} task spec: {reason}")]
    InvalidSpec { task_type: TaskType, reason: String },

    #[error("Failed to run task {task_type}: {source}")]
    Kubernetes {
        task_type: TaskType,
        #[source]
        source: kube_api::KubeError,
    },

    #[error("Failed to connect runtime {name}: {source}")]
    Connect {
        name: String,
        #[source]
        source: kube_api::KubeError,
    },
}
