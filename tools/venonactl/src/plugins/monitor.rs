use super::{ensure_namespace, install, InstallOptions, Plugin, PluginType};
use crate::error::Result;
use crate::values::Values;
use async_trait::async_trait;

/// Cluster monitor reporting workloads back to Codefresh
#[derive(Debug, Clone, Copy, Default)]
pub struct MonitorPlugin;

#[async_trait]
impl Plugin for MonitorPlugin {
    fn plugin_type(&self) -> PluginType {
        PluginType::Monitor
    }

    async fn install(&self, opt: &InstallOptions, values: Values) -> Result<Values> {
        ensure_namespace(opt).await?;
        install(opt, self.plugin_type(), &values).await?;
        Ok(values)
    }
}
