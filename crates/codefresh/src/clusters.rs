//! Installer facing Codefresh API: runtime environment registration

use crate::error::{CodefreshError, Result};
use crate::transport::Transport;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, instrument};
use venona_core::endpoints;

#[derive(Debug, Clone, Default)]
pub struct ClusterApiOptions {
    pub host: String,
    pub token: String,
    pub insecure: bool,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateRequest {
    pub cluster_name: String,
    pub namespace: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub cluster_name: String,
    pub namespace: String,
    pub storage_class_name: String,
    pub is_default_storage_class: bool,
    pub mark_as_default: bool,
    /// Register the runtime as driven by a Venona agent
    pub agent: bool,
    /// Builds run their engine as a pod instead of through the docker daemon
    pub kubernetes_runner_type: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime_environment_name: Option<String>,
}

/// Server certificate issued by Codefresh for the runtime's docker daemons
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerCert {
    pub cert: String,
    pub key: String,
    pub ca: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RuntimeEnvironmentMetadata {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RuntimeEnvironment {
    pub metadata: RuntimeEnvironmentMetadata,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignRequest<'a> {
    req_subject_alt_name: &'a [String],
}

#[derive(Debug, Clone)]
pub struct ClusterApi {
    transport: Transport,
}

impl ClusterApi {
    pub fn new(opt: ClusterApiOptions) -> Result<Self> {
        if opt.token.is_empty() {
            return Err(CodefreshError::InvalidRequest {
                reason: "Codefresh token is required".to_string(),
            });
        }
        let host = if opt.host.is_empty() {
            endpoints::DEFAULT_CODEFRESH_HOST
        } else {
            opt.host.as_str()
        };
        Ok(Self {
            transport: Transport::new(host, &opt.token, opt.insecure, opt.timeout)?,
        })
    }

    pub fn host(&self) -> &str {
        self.transport.host()
    }

    /// Checks the cluster and namespace are free to be registered
    #[instrument(skip(self, request), fields(cluster = %request.cluster_name, namespace = %request.namespace))]
    pub async fn validate(&self, request: &ValidateRequest) -> Result<()> {
        require_cluster(&request.cluster_name)?;
        debug!("Validating runtime environment");
        self.transport
            .send(
                Method::POST,
                endpoints::API_CUSTOM_CLUSTERS_VALIDATE,
                Some(request),
            )
            .await?;
        Ok(())
    }

    /// Asks Codefresh to issue a server certificate for the cluster
    #[instrument(skip(self, subject_alt_names))]
    pub async fn sign(&self, cluster: &str, subject_alt_names: &[String]) -> Result<ServerCert> {
        require_cluster(cluster)?;
        debug!("Requesting server certificate");
        let data = self
            .transport
            .send(
                Method::POST,
                &endpoints::cluster_tls(cluster),
                Some(&SignRequest {
                    req_subject_alt_name: subject_alt_names,
                }),
            )
            .await?;
        Ok(serde_json::from_slice(&data)?)
    }

    #[instrument(skip(self, request), fields(cluster = %request.cluster_name))]
    pub async fn register(&self, request: &RegisterRequest) -> Result<RuntimeEnvironment> {
        require_cluster(&request.cluster_name)?;
        let data = self
            .transport
            .send(
                Method::POST,
                endpoints::API_CUSTOM_CLUSTERS_REGISTER,
                Some(request),
            )
            .await?;
        let runtime_environment: RuntimeEnvironment = serde_json::from_slice(&data)?;
        info!(
            runtime_environment = %runtime_environment.metadata.name,
            "Runtime environment registered"
        );
        Ok(runtime_environment)
    }
}

fn require_cluster(cluster: &str) -> Result<()> {
    if cluster.is_empty() {
        return Err(CodefreshError::InvalidRequest {
            reason: "cluster name is required".to_string(),
        });
    }
    Ok(())
}
