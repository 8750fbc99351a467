//! Installer configuration and the template context built from it

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use codefresh::ServerCert;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;
use venona_core::{RuntimeConfig, RuntimesConfig};

pub const APPLICATION_NAME: &str = "runner";
pub const MONITOR_APPLICATION_NAME: &str = "monitor";
pub const APP_PROXY_APPLICATION_NAME: &str = "app-proxy";
pub const ENGINE_APP_NAME: &str = "codefresh-engine";
pub const DEFAULT_STORAGE_CLASS_PREFIX: &str = "dind-local-volumes-venona";
const VENONA_IMAGE: &str = "codefresh/venona";
const VOLUME_PROVISIONER_IMAGE: &str = "codefresh/dind-volume-provisioner:v24";
const LOCAL_VOLUME_PARENT_DIR: &str = "/var/lib/codefresh/dind-volumes";

/// App proxy exposure settings
#[derive(Debug, Clone, Default)]
pub struct AppProxy {
    pub host: String,
    pub ingress_class: String,
    pub tls_secret: String,
    pub path_prefix: String,
    pub annotations: BTreeMap<String, String>,
}

/// Everything an installation needs, passed explicitly from the command line
/// through each plugin.
#[derive(Debug, Clone, Default)]
pub struct Values {
    pub namespace: String,
    pub context: String,
    pub kubeconfig_path: Option<PathBuf>,
    pub in_cluster: bool,
    /// `key1=value1,key2=value2`
    pub node_selector: String,
    /// Raw YAML list of tolerations
    pub tolerations: String,
    pub docker_registry: String,
    pub agent_id: String,
    pub agent_token: String,
    pub codefresh_host: String,
    pub codefresh_token: String,
    pub cluster_name: String,
    pub runtime_environment: String,
    /// Empty means the default local volumes storage class
    pub storage_class: String,
    pub dry_run: bool,
    pub version: String,
    pub install_monitor: bool,
    /// Builds run their engine as a pod, see the engine plugin
    pub kubernetes_runner_type: bool,
    pub app_proxy: AppProxy,
    /// Resource requirements per component (`runner`, `volume-provisioner`, `monitor`, `app-proxy`)
    pub resources: BTreeMap<String, Value>,
    /// Issued by Codefresh during the runtime environment installation
    pub server_cert: Option<ServerCert>,
    /// Connection the agent uses to reach the runtime cluster
    pub runtime_cluster: Option<RuntimeConfig>,
}

impl Values {
    pub fn uses_default_storage_class(&self) -> bool {
        self.storage_class.is_empty() || self.storage_class.starts_with(DEFAULT_STORAGE_CLASS_PREFIX)
    }

    pub fn storage_class_name(&self) -> String {
        if self.storage_class.is_empty() {
            format!("{DEFAULT_STORAGE_CLASS_PREFIX}-{}", self.namespace)
        } else {
            self.storage_class.clone()
        }
    }

    /// Runtimes file for the agent, present once the runtime environment has a name
    pub fn runtimes_config(&self) -> Option<RuntimesConfig> {
        let cluster = self.runtime_cluster.clone()?;
        if self.runtime_environment.is_empty() {
            return None;
        }
        Some(RuntimesConfig {
            runtimes: BTreeMap::from([(self.runtime_environment.clone(), cluster)]),
        })
    }

    /// Template context
    pub fn build_values(&self) -> Value {
        let tag = if self.version.is_empty() {
            "latest"
        } else {
            self.version.as_str()
        };
        let cert = self.server_cert.clone().unwrap_or_default();
        let runtimes = self
            .runtimes_config()
            .and_then(|config| config.to_yaml().ok())
            .unwrap_or_default();

        json!({
            "AppName": APPLICATION_NAME,
            "ClusterId": self.cluster_name,
            "Version": tag,
            "CodefreshHost": self.codefresh_host,
            "Token": self.agent_token,
            "Namespace": self.namespace,
            "ConfigPath": self.kubeconfig_path.as_ref().map(|p| p.display().to_string()).unwrap_or_default(),
            "Context": self.context,
            "NodeSelector": self.node_selector,
            "Tolerations": self.tolerations,
            "DockerRegistry": self.docker_registry,
            "AgentToken": self.agent_token,
            "AgentId": self.agent_id,
            "RuntimeEnvironment": self.runtime_environment,
            "RuntimesConfig": runtimes,
            "Image": { "Name": VENONA_IMAGE, "Tag": tag },
            "ServerCert": {
                "Cert": STANDARD.encode(cert.cert),
                "Key": STANDARD.encode(cert.key),
                "Ca": STANDARD.encode(cert.ca),
            },
            "Runner": { "Resources": self.resources_of(APPLICATION_NAME) },
            "CreateRbac": true,
            "Storage": {
                "Backend": "local",
                "CreateStorageClass": self.uses_default_storage_class(),
                "StorageClassName": self.storage_class_name(),
                "LocalVolumeParentDir": LOCAL_VOLUME_PARENT_DIR,
                "VolumeProvisioner": {
                    "Image": VOLUME_PROVISIONER_IMAGE,
                    "NodeSelector": self.node_selector,
                    "Tolerations": self.tolerations,
                    "Resources": self.resources_of("volume-provisioner"),
                },
            },
            "Monitor": {
                "Enabled": self.install_monitor,
                "AppName": MONITOR_APPLICATION_NAME,
                "Image": { "Name": "codefresh/agent", "Tag": "stable" },
                "Resources": self.resources_of(MONITOR_APPLICATION_NAME),
            },
            "AppProxy": {
                "AppName": APP_PROXY_APPLICATION_NAME,
                "Image": { "Name": "codefresh/cf-app-proxy", "Tag": "latest" },
                "Host": self.app_proxy.host,
                "IngressClass": self.app_proxy.ingress_class,
                "Annotations": self.app_proxy.annotations,
                "TLSSecret": self.app_proxy.tls_secret,
                "PathPrefix": self.app_proxy.path_prefix,
                "Resources": self.resources_of(APP_PROXY_APPLICATION_NAME),
            },
            "Runtime": { "EngineAppName": ENGINE_APP_NAME },
        })
    }

    fn resources_of(&self, component: &str) -> Value {
        self.resources
            .get(component)
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()))
    }
}
