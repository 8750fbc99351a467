use super::{ensure_namespace, install, InstallOptions, Plugin, PluginType};
use crate::error::Result;
use crate::values::Values;
use async_trait::async_trait;

/// Service account and RBAC the build engine pod runs with, for runtimes of
/// the Kubernetes runner type
#[derive(Debug, Clone, Copy, Default)]
pub struct EnginePlugin;

#[async_trait]
impl Plugin for EnginePlugin {
    fn plugin_type(&self) -> PluginType {
        PluginType::Engine
    }

    async fn install(&self, opt: &InstallOptions, values: Values) -> Result<Values> {
        ensure_namespace(opt).await?;
        install(opt, self.plugin_type(), &values).await?;
        Ok(values)
    }
}
