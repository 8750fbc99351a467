use super::{ensure_namespace, install, InstallOptions, Plugin, PluginType};
use crate::error::Result;
use crate::values::Values;
use async_trait::async_trait;
use tracing::{info, warn};

/// The agent itself: service account, secret, RBAC and deployment
#[derive(Debug, Clone, Copy, Default)]
pub struct VenonaPlugin;

#[async_trait]
impl Plugin for VenonaPlugin {
    fn plugin_type(&self) -> PluginType {
        PluginType::Venona
    }

    async fn install(&self, opt: &InstallOptions, values: Values) -> Result<Values> {
        match values.runtimes_config() {
            Some(config) => info!(
                runtimes = ?config.runtimes.keys().collect::<Vec<_>>(),
                "Agent will serve runtimes"
            ),
            None => warn!("No runtime environment given, the agent will start without runtimes"),
        }
        ensure_namespace(opt).await?;
        install(opt, self.plugin_type(), &values).await?;
        Ok(values)
    }
}
