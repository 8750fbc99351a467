//! Installer plugins
//!
//! Each plugin owns the bundled templates matching its file pattern and knows
//! how to install, inspect and remove them. Plugins run in the order they
//! were added to a [`PluginBuilder`], each receiving the [`Values`] returned
//! by the one before.

mod app_proxy;
mod engine;
mod monitor;
mod runtime_environment;
mod venona;
mod volume_provisioner;

pub use app_proxy::AppProxyPlugin;
pub use engine::EnginePlugin;
pub use monitor::MonitorPlugin;
pub use runtime_environment::RuntimeEnvironmentPlugin;
pub use venona::VenonaPlugin;
pub use volume_provisioner::VolumeProvisionerPlugin;

use crate::error::{InstallerError, Result};
use crate::templates::{self, Manifest};
use crate::values::Values;
use async_trait::async_trait;
use codefresh::ClusterApiOptions;
use kube_api::{KubeClient, KubeError, ObjectRef};
use std::fmt;
use tracing::{debug, info, warn};

pub const STATUS_INSTALLED: &str = "Installed";
pub const STATUS_NOT_INSTALLED: &str = "Not installed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PluginType {
    Engine,
    RuntimeEnvironment,
    Venona,
    VolumeProvisioner,
    Monitor,
    AppProxy,
}

impl PluginType {
    pub fn name(&self) -> &'static str {
        match self {
            PluginType::Engine => "engine",
            PluginType::RuntimeEnvironment => "runtime-environment",
            PluginType::Venona => "venona",
            PluginType::VolumeProvisioner => "volume-provisioner",
            PluginType::Monitor => "monitor",
            PluginType::AppProxy => "app-proxy",
        }
    }

    /// Template file names this plugin owns
    pub fn pattern(&self) -> &'static str {
        match self {
            PluginType::Engine => r"\.engine\.yaml$",
            PluginType::RuntimeEnvironment => r"\.re\.yaml$",
            PluginType::Venona => r"\.venona\.yaml$",
            PluginType::VolumeProvisioner => r"\.vp\.yaml$",
            PluginType::Monitor => r"\.monitor\.yaml$",
            PluginType::AppProxy => r"\.app-proxy\.yaml$",
        }
    }

    fn build(self) -> Box<dyn Plugin> {
        match self {
            PluginType::Engine => Box::new(EnginePlugin),
            PluginType::RuntimeEnvironment => Box::new(RuntimeEnvironmentPlugin),
            PluginType::Venona => Box::new(VenonaPlugin),
            PluginType::VolumeProvisioner => Box::new(VolumeProvisionerPlugin),
            PluginType::Monitor => Box::new(MonitorPlugin),
            PluginType::AppProxy => Box::new(AppProxyPlugin),
        }
    }
}

impl fmt::Display for PluginType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Cluster and namespace the plugin objects live in
#[derive(Debug, Clone)]
pub struct Target {
    pub kube: KubeClient,
    pub namespace: String,
}

#[derive(Debug, Clone)]
pub struct InstallOptions {
    pub target: Target,
    pub dry_run: bool,
    pub codefresh: ClusterApiOptions,
    pub cluster_name: String,
    pub mark_as_default: bool,
    /// Register the runtime environment as driven by a Venona agent
    pub register_with_agent: bool,
    pub kubernetes_runner_type: bool,
}

/// One line of `venonactl status`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRow {
    pub kind: String,
    pub name: String,
    pub status: String,
    pub message: String,
}

impl StatusRow {
    pub fn installed(object: &ObjectRef) -> Self {
        Self {
            kind: object.kind.clone(),
            name: object.name.clone(),
            status: STATUS_INSTALLED.to_string(),
            message: String::new(),
        }
    }

    pub fn not_installed(object: &ObjectRef, message: impl Into<String>) -> Self {
        Self {
            kind: object.kind.clone(),
            name: object.name.clone(),
            status: STATUS_NOT_INSTALLED.to_string(),
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait Plugin: Send + Sync + fmt::Debug {
    fn plugin_type(&self) -> PluginType;

    fn name(&self) -> &'static str {
        self.plugin_type().name()
    }

    async fn install(&self, opt: &InstallOptions, values: Values) -> Result<Values>;

    async fn status(&self, target: &Target, values: &Values) -> Result<Vec<StatusRow>> {
        status(target, self.plugin_type(), values).await
    }

    async fn delete(&self, target: &Target, values: &Values) -> Result<()> {
        delete(target, self.plugin_type(), values).await
    }
}

/// Ordered list of plugins to run
#[derive(Debug, Default)]
pub struct PluginBuilder {
    plugins: Vec<Box<dyn Plugin>>,
}

impl PluginBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, plugin: PluginType) -> Self {
        self.plugins.push(plugin.build());
        self
    }

    pub fn add_if(self, condition: bool, plugin: PluginType) -> Self {
        if condition {
            self.add(plugin)
        } else {
            self
        }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.plugins.iter().map(|plugin| plugin.name()).collect()
    }

    pub fn get(self) -> Vec<Box<dyn Plugin>> {
        self.plugins
    }
}

/// Creates the plugin objects. Existing objects are left untouched.
pub(crate) async fn install(opt: &InstallOptions, plugin: PluginType, values: &Values) -> Result<()> {
    let manifests = templates::manifests(plugin.pattern(), &values.build_values())?;
    for manifest in &manifests {
        if opt.dry_run {
            print_manifest(manifest)?;
            continue;
        }
        match opt.target.kube.create(&opt.target.namespace, &manifest.object).await {
            Ok(object) => info!(plugin = %plugin, object = %object, "Created"),
            Err(KubeError::AlreadyExists { kind, name }) => {
                info!(plugin = %plugin, "{kind} \"{name}\" already exists, skipping");
            }
            Err(err) => {
                warn!(plugin = %plugin, file = %manifest.file, error = %err, "Installation failed");
                return Err(err.into());
            }
        }
    }
    Ok(())
}

pub(crate) async fn status(target: &Target, plugin: PluginType, values: &Values) -> Result<Vec<StatusRow>> {
    let mut rows = Vec::new();
    for manifest in templates::manifests(plugin.pattern(), &values.build_values())? {
        let object = ObjectRef::from_object(&manifest.object)?;
        match target.kube.get(&target.namespace, &object).await {
            Ok(_) => rows.push(StatusRow::installed(&object)),
            Err(KubeError::NotFound { .. }) => rows.push(StatusRow::not_installed(&object, "not found")),
            Err(KubeError::Api { message, .. }) => rows.push(StatusRow::not_installed(&object, message)),
            Err(err) => return Err(err.into()),
        }
    }
    Ok(rows)
}

/// Deletes the plugin objects in reverse install order. Missing objects are skipped.
pub(crate) async fn delete(target: &Target, plugin: PluginType, values: &Values) -> Result<()> {
    let manifests = templates::manifests(plugin.pattern(), &values.build_values())?;
    for manifest in manifests.iter().rev() {
        let object = ObjectRef::from_object(&manifest.object)?;
        match target.kube.delete(&target.namespace, &object).await {
            Ok(()) => info!(plugin = %plugin, object = %object, "Deleted"),
            Err(err) if err.is_not_found() => debug!(plugin = %plugin, object = %object, "Not found, skipping"),
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

pub(crate) async fn ensure_namespace(opt: &InstallOptions) -> Result<()> {
    if opt.dry_run {
        return Ok(());
    }
    opt.target
        .kube
        .ensure_namespace(&opt.target.namespace)
        .await
        .map_err(InstallerError::from)
}

fn print_manifest(manifest: &Manifest) -> Result<()> {
    let yaml = serde_yaml::to_string(&manifest.object).map_err(|source| InstallerError::Manifest {
        name: manifest.file.clone(),
        source,
    })?;
    println!("---\n# {}\n{}", manifest.file, yaml.trim_end());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_keeps_order() {
        let builder = PluginBuilder::new()
            .add(PluginType::RuntimeEnvironment)
            .add_if(false, PluginType::Monitor)
            .add(PluginType::Venona)
            .add_if(true, PluginType::AppProxy);

        assert_eq!(builder.names(), vec!["runtime-environment", "venona", "app-proxy"]);
    }

    #[test]
    fn test_patterns_only_match_their_plugin() {
        for (name, _) in templates::TEMPLATES {
            let owners: Vec<_> = [
                PluginType::Engine,
                PluginType::RuntimeEnvironment,
                PluginType::Venona,
                PluginType::VolumeProvisioner,
                PluginType::Monitor,
                PluginType::AppProxy,
            ]
            .into_iter()
            .filter(|plugin| regex::Regex::new(plugin.pattern()).unwrap().is_match(name))
            .collect();
            assert_eq!(owners.len(), 1, "{name} should belong to exactly one plugin");
        }
    }
}
