use super::{install, InstallOptions, Plugin, PluginType};
use crate::error::Result;
use crate::values::Values;
use async_trait::async_trait;
use tracing::info;

/// Local volumes provisioner for docker daemon caches
#[derive(Debug, Clone, Copy, Default)]
pub struct VolumeProvisionerPlugin;

#[async_trait]
impl Plugin for VolumeProvisionerPlugin {
    fn plugin_type(&self) -> PluginType {
        PluginType::VolumeProvisioner
    }

    async fn install(&self, opt: &InstallOptions, values: Values) -> Result<Values> {
        info!(storage_class = %values.storage_class_name(), "Installing volume provisioner");
        install(opt, self.plugin_type(), &values).await?;
        Ok(values)
    }
}
