//! Runtime backed by a Kubernetes cluster

use crate::error::{Result, RuntimeError};
use crate::Runtime;
use async_trait::async_trait;
use kube_api::{KubeClient, KubeConfig, ObjectRef};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use venona_core::{RuntimeConfig, Task, TaskType};

/// Spec of a deletion task
#[derive(Debug, Deserialize)]
struct DeleteSpec {
    #[serde(default)]
    namespace: String,
    name: String,
}

/// Runs pod and volume claim tasks against one cluster.
///
/// Tasks of a batch run in order and the first failure stops the batch.
#[derive(Debug, Clone)]
pub struct KubernetesRuntime {
    name: String,
    client: KubeClient,
}

impl KubernetesRuntime {
    pub fn new(name: impl Into<String>, client: KubeClient) -> Self {
        Self {
            name: name.into(),
            client,
        }
    }

    pub fn from_config(name: &str, config: &RuntimeConfig) -> Result<Self> {
        let connect = |source| RuntimeError::Connect {
            name: name.to_string(),
            source,
        };
        let mut kube = KubeConfig::new(&config.host)
            .map_err(connect)?
            .with_token(config.token.clone());
        if let Some(crt) = config.crt.as_deref().filter(|crt| !crt.is_empty()) {
            kube = kube.with_ca_pem(crt.as_bytes());
        }
        if let Some(namespace) = config.namespace.as_deref().filter(|ns| !ns.is_empty()) {
            kube = kube.with_namespace(namespace);
        }
        Ok(Self::new(name, KubeClient::new(kube).map_err(connect)?))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    async fn create(&self, task: &Task, kind: &str) -> Result<()> {
        let manifest = manifest_for(task, kind)?;
        match self.client.create("", &manifest).await {
            Ok(object) => {
                info!(object = %object, "Created");
                Ok(())
            }
            Err(err) if err.is_already_exists() => {
                warn!(task = %task.task_type, error = %err, "Object already exists, skipping");
                Ok(())
            }
            Err(source) => Err(RuntimeError::Kubernetes {
                task_type: task.task_type.clone(),
                source,
            }),
        }
    }

    async fn delete(&self, task: &Task, kind: &str) -> Result<()> {
        let spec: DeleteSpec =
            serde_json::from_value(task.spec.clone()).map_err(|err| RuntimeError::InvalidSpec {
                task_type: task.task_type.clone(),
                reason: err.to_string(),
            })?;
        let target = ObjectRef::new("v1", kind, spec.name).in_namespace(spec.namespace);
        match self.client.delete("", &target).await {
            Ok(()) => {
                info!(object = %target, "Deleted");
                Ok(())
            }
            Err(err) if err.is_not_found() => {
                debug!(object = %target, "Already gone");
                Ok(())
            }
            Err(source) => Err(RuntimeError::Kubernetes {
                task_type: task.task_type.clone(),
                source,
            }),
        }
    }
}

/// The task spec with `apiVersion` and `kind` filled in when absent
fn manifest_for(task: &Task, kind: &str) -> Result<Value> {
    let invalid = |reason: String| RuntimeError::InvalidSpec {
        task_type: task.task_type.clone(),
        reason,
    };
    let mut manifest = task.spec.clone();
    let object = manifest
        .as_object_mut()
        .ok_or_else(|| invalid("spec is not an object".to_string()))?;
    match object.get("kind").and_then(Value::as_str) {
        Some(found) if found != kind => return Err(invalid(format!("expected {kind}, got {found}"))),
        Some(_) => {}
        None => {
            object.insert("kind".to_string(), Value::from(kind));
        }
    }
    object
        .entry("apiVersion")
        .or_insert_with(|| Value::from("v1"));
    Ok(manifest)
}

#[async_trait]
impl Runtime for KubernetesRuntime {
    #[instrument(skip(self, tasks), fields(runtime = %self.name, tasks = tasks.len()))]
    async fn start_workflow(&self, tasks: &[Task]) -> Result<()> {
        for task in tasks {
            match task.task_type {
                TaskType::CreatePod => self.create(task, "Pod").await?,
                TaskType::CreatePvc => self.create(task, "PersistentVolumeClaim").await?,
                _ => {
                    return Err(RuntimeError::UnsupportedTask {
                        task_type: task.task_type.clone(),
                        operation: "start",
                    })
                }
            }
        }
        Ok(())
    }

    #[instrument(skip(self, tasks), fields(runtime = %self.name, tasks = tasks.len()))]
    async fn terminate_workflow(&self, tasks: &[Task]) -> Result<()> {
        for task in tasks {
            match task.task_type {
                TaskType::DeletePod => self.delete(task, "Pod").await?,
                TaskType::DeletePvc => self.delete(task, "PersistentVolumeClaim").await?,
                _ => {
                    return Err(RuntimeError::UnsupportedTask {
                        task_type: task.task_type.clone(),
                        operation: "terminate",
                    })
                }
            }
        }
        Ok(())
    }
}
