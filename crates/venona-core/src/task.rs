//! Task types received from Codefresh

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of work a task asks for.
///
/// Unrecognised type strings are kept as `Unknown` so a newer control plane
/// can send task types this agent does not act on yet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskType {
    CreatePod,
    DeletePod,
    CreatePvc,
    DeletePvc,
    Unknown(String),
}

/// Whether a task brings resources up or tears them down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Creation,
    Deletion,
}

impl TaskType {
    pub fn as_str(&self) -> &str {
        match self {
            TaskType::CreatePod => "CreatePod",
            TaskType::DeletePod => "DeletePod",
            TaskType::CreatePvc => "CreatePvc",
            TaskType::DeletePvc => "DeletePvc",
            TaskType::Unknown(other) => other,
        }
    }

    /// `None` for task types the agent does not dispatch
    pub fn direction(&self) -> Option<Direction> {
        match self {
            TaskType::CreatePod | TaskType::CreatePvc => Some(Direction::Creation),
            TaskType::DeletePod | TaskType::DeletePvc => Some(Direction::Deletion),
            TaskType::Unknown(_) => None,
        }
    }
}

impl From<String> for TaskType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "CreatePod" => TaskType::CreatePod,
            "DeletePod" => TaskType::DeletePod,
            "CreatePvc" => TaskType::CreatePvc,
            "DeletePvc" => TaskType::DeletePvc,
            _ => TaskType::Unknown(value),
        }
    }
}

impl From<TaskType> for String {
    fn from(value: TaskType) -> Self {
        match value {
            TaskType::Unknown(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Creation => f.write_str("creation"),
            Direction::Deletion => f.write_str("deletion"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Name of the runtime the task targets
    #[serde(default)]
    pub re_name: String,
    /// Workflow the task belongs to, empty for tasks sent by older control planes
    #[serde(default)]
    pub workflow: String,
}

/// A unit of work for one runtime.
///
/// `spec` is the manifest to create for creation tasks and `{namespace, name}`
/// of the object to remove for deletion tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(rename = "type")]
    pub task_type: TaskType,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub spec: serde_json::Value,
}

impl Task {
    pub fn new(
        task_type: TaskType,
        workflow: impl Into<String>,
        re_name: impl Into<String>,
    ) -> Self {
        Self {
            task_type,
            metadata: Metadata {
                created_at: None,
                re_name: re_name.into(),
                workflow: workflow.into(),
            },
            spec: serde_json::Value::Null,
        }
    }

    pub fn with_spec(mut self, spec: serde_json::Value) -> Self {
        self.spec = spec;
        self
    }

    pub fn workflow(&self) -> &str {
        &self.metadata.workflow
    }

    pub fn runtime(&self) -> &str {
        &self.metadata.re_name
    }
}
