use crate::plugins::{PluginBuilder, PluginType};
use crate::values::Values;
use clap::{Args, Parser, Subcommand};
use codefresh::ClusterApiOptions;
use std::path::PathBuf;
use venona_core::endpoints::DEFAULT_CODEFRESH_HOST;

const DEFAULT_NAMESPACE: &str = "default";

#[derive(Debug, Parser)]
#[command(name = "venonactl")]
#[command(about = "Venonactl - install the Venona agent and its runtime on Kubernetes")]
#[command(version = venona_core::VERSION)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Args)]
pub struct GlobalArgs {
    /// Path to the kubeconfig file, defaults to ~/.kube/config
    #[arg(long, global = true, env = "KUBECONFIG")]
    pub kubeconfig: Option<PathBuf>,

    /// Use the service account of the pod venonactl runs in
    #[arg(long, global = true)]
    pub in_cluster: bool,

    #[arg(long, global = true, env = "CODEFRESH_HOST", default_value = DEFAULT_CODEFRESH_HOST)]
    pub codefresh_host: String,

    #[arg(long, global = true, env = "CODEFRESH_TOKEN", default_value = "", hide_env_values = true)]
    pub codefresh_token: String,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Install the runtime environment and the agent
    Install(InstallArgs),
    /// Show which objects are installed
    Status(TargetArgs),
    /// Delete everything venonactl installs
    Delete(TargetArgs),
}

#[derive(Debug, Args)]
#[command(args_conflicts_with_subcommands = true, subcommand_negates_reqs = true)]
pub struct InstallArgs {
    #[command(subcommand)]
    pub target: Option<InstallTarget>,

    #[command(flatten)]
    pub full: FullInstallArgs,
}

#[derive(Debug, Subcommand)]
pub enum InstallTarget {
    /// Install and register only a runtime environment for an existing agent
    Runtime(RuntimeArgs),
}

/// Kubernetes placement shared by every command
#[derive(Debug, Clone, Args)]
pub struct KubeArgs {
    #[arg(long, env = "KUBE_NAMESPACE", default_value = DEFAULT_NAMESPACE)]
    pub kube_namespace: String,

    /// Context from the kubeconfig, defaults to the current one
    #[arg(long, env = "KUBE_CONTEXT", default_value = "")]
    pub kube_context_name: String,
}

#[derive(Debug, Clone, Args)]
pub struct FullInstallArgs {
    #[command(flatten)]
    pub kube: KubeArgs,

    /// Name the cluster is registered under in Codefresh
    #[arg(long, required_unless_present = "skip_runtime_installation")]
    pub cluster_name: Option<String>,

    /// Install only the agent, for an already registered runtime environment
    #[arg(long, requires = "runtime_environment", conflicts_with = "only_runtime_environment")]
    pub skip_runtime_installation: bool,

    #[arg(long)]
    pub runtime_environment: Option<String>,

    /// Install and register the runtime environment without the agent
    #[arg(long)]
    pub only_runtime_environment: bool,

    #[arg(long, env = "AGENT_ID", default_value = "")]
    pub agent_id: String,

    #[arg(long, env = "AGENT_TOKEN", default_value = "", hide_env_values = true)]
    pub agent_token: String,

    /// Print the manifests instead of applying them
    #[arg(long)]
    pub dry_run: bool,

    /// Agent image tag
    #[arg(long, default_value = "")]
    pub venona_version: String,

    /// Storage class for docker daemon volumes, defaults to local volumes
    #[arg(long, default_value = "")]
    pub storage_class: String,

    /// Make the registered runtime environment the account default
    #[arg(long)]
    pub set_default: bool,

    #[arg(long)]
    pub install_monitor: bool,

    /// Expose the app proxy on this host
    #[arg(long, default_value = "")]
    pub app_proxy_host: String,

    /// `key1=value1,key2=value2`
    #[arg(long, default_value = "")]
    pub kube_node_selector: String,

    /// YAML list of tolerations
    #[arg(long, default_value = "")]
    pub tolerations: String,

    #[arg(long, default_value = "")]
    pub docker_registry: String,
}

#[derive(Debug, Clone, Args)]
pub struct RuntimeArgs {
    #[command(flatten)]
    pub kube: KubeArgs,

    /// Runtime environment name, also used as the cluster name
    #[arg(long)]
    pub runtime_name: String,

    #[arg(long, env = "AGENT_ID", default_value = "")]
    pub agent_id: String,

    /// Used against Codefresh when no --codefresh-token is given
    #[arg(long, env = "AGENT_TOKEN", default_value = "", hide_env_values = true)]
    pub agent_token: String,

    #[arg(long, default_value = "")]
    pub storage_class: String,

    /// Run builds with the engine as a Kubernetes pod (alpha)
    #[arg(long)]
    pub kubernetes_runner_type: bool,

    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Args)]
pub struct TargetArgs {
    #[command(flatten)]
    pub kube: KubeArgs,

    #[arg(long, default_value = "")]
    pub storage_class: String,

    #[arg(long, default_value = "")]
    pub app_proxy_host: String,

    /// Include the engine objects of a Kubernetes runner type runtime
    #[arg(long)]
    pub kubernetes_runner_type: bool,
}

impl GlobalArgs {
    pub fn codefresh_options(&self, token: &str) -> ClusterApiOptions {
        ClusterApiOptions {
            host: self.codefresh_host.clone(),
            token: token.to_string(),
            ..ClusterApiOptions::default()
        }
    }

    fn values(&self, kube: &KubeArgs) -> Values {
        Values {
            namespace: kube.kube_namespace.clone(),
            context: kube.kube_context_name.clone(),
            kubeconfig_path: self.kubeconfig.clone(),
            in_cluster: self.in_cluster,
            codefresh_host: self.codefresh_host.clone(),
            codefresh_token: self.codefresh_token.clone(),
            ..Values::default()
        }
    }
}

impl FullInstallArgs {
    pub fn values(&self, global: &GlobalArgs) -> Values {
        let mut values = global.values(&self.kube);
        values.cluster_name = self.cluster_name.clone().unwrap_or_default();
        values.runtime_environment = self.runtime_environment.clone().unwrap_or_default();
        values.agent_id = self.agent_id.clone();
        values.agent_token = self.agent_token.clone();
        values.dry_run = self.dry_run;
        values.version = self.venona_version.clone();
        values.storage_class = self.storage_class.clone();
        values.install_monitor = self.install_monitor;
        values.app_proxy.host = self.app_proxy_host.clone();
        values.node_selector = self.kube_node_selector.clone();
        values.tolerations = self.tolerations.clone();
        values.docker_registry = self.docker_registry.clone();
        values
    }

    pub fn installs_agent(&self) -> bool {
        !self.only_runtime_environment
    }

    pub fn plugins(&self, values: &Values) -> PluginBuilder {
        let runtime = !self.skip_runtime_installation;
        let agent = self.installs_agent();
        PluginBuilder::new()
            .add_if(runtime, PluginType::RuntimeEnvironment)
            .add_if(runtime && values.uses_default_storage_class(), PluginType::VolumeProvisioner)
            .add_if(agent, PluginType::Venona)
            .add_if(agent && self.install_monitor, PluginType::Monitor)
            .add_if(agent && !self.app_proxy_host.is_empty(), PluginType::AppProxy)
    }
}

impl RuntimeArgs {
    pub fn values(&self, global: &GlobalArgs) -> Values {
        let mut values = global.values(&self.kube);
        values.cluster_name = self.runtime_name.clone();
        values.runtime_environment = self.runtime_name.clone();
        values.agent_id = self.agent_id.clone();
        values.agent_token = self.agent_token.clone();
        values.storage_class = self.storage_class.clone();
        values.kubernetes_runner_type = self.kubernetes_runner_type;
        values.dry_run = self.dry_run;
        if values.codefresh_token.is_empty() {
            values.codefresh_token = self.agent_token.clone();
        }
        values
    }

    pub fn plugins(&self, values: &Values) -> PluginBuilder {
        PluginBuilder::new()
            .add_if(values.kubernetes_runner_type, PluginType::Engine)
            .add(PluginType::RuntimeEnvironment)
            .add_if(values.uses_default_storage_class(), PluginType::VolumeProvisioner)
    }
}

impl TargetArgs {
    pub fn values(&self, global: &GlobalArgs) -> Values {
        let mut values = global.values(&self.kube);
        values.storage_class = self.storage_class.clone();
        values.app_proxy.host = self.app_proxy_host.clone();
        values.install_monitor = true;
        values.kubernetes_runner_type = self.kubernetes_runner_type;
        values
    }

    /// Every plugin, in install order
    pub fn plugins(&self, values: &Values) -> PluginBuilder {
        PluginBuilder::new()
            .add_if(values.kubernetes_runner_type, PluginType::Engine)
            .add(PluginType::RuntimeEnvironment)
            .add_if(values.uses_default_storage_class(), PluginType::VolumeProvisioner)
            .add(PluginType::Venona)
            .add(PluginType::Monitor)
            .add_if(!self.app_proxy_host.is_empty(), PluginType::AppProxy)
    }
}
