use super::{ensure_namespace, install, InstallOptions, Plugin, PluginType};
use crate::error::Result;
use crate::values::Values;
use async_trait::async_trait;
use tracing::info;

#[derive(Debug, Clone, Copy, Default)]
pub struct AppProxyPlugin;

/// Public URL of the app proxy, if it is exposed
pub fn app_proxy_url(values: &Values) -> Option<String> {
    if values.app_proxy.host.is_empty() {
        return None;
    }
    let prefix = if values.app_proxy.path_prefix.is_empty() {
        "/"
    } else {
        values.app_proxy.path_prefix.as_str()
    };
    Some(format!("https://{}{}", values.app_proxy.host, prefix))
}

#[async_trait]
impl Plugin for AppProxyPlugin {
    fn plugin_type(&self) -> PluginType {
        PluginType::AppProxy
    }

    async fn install(&self, opt: &InstallOptions, values: Values) -> Result<Values> {
        ensure_namespace(opt).await?;
        install(opt, self.plugin_type(), &values).await?;
        if let Some(url) = app_proxy_url(&values) {
            info!(url = %url, "App proxy installed");
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_proxy_url() {
        let mut values = Values::default();
        assert_eq!(app_proxy_url(&values), None);

        values.app_proxy.host = "proxy.example.com".to_string();
        assert_eq!(app_proxy_url(&values).as_deref(), Some("https://proxy.example.com/"));

        values.app_proxy.path_prefix = "/app-proxy".to_string();
        assert_eq!(
            app_proxy_url(&values).as_deref(),
            Some("https://proxy.example.com/app-proxy")
        );
    }
}
