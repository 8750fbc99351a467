use super::{ensure_namespace, install, InstallOptions, Plugin, PluginType};
use crate::error::Result;
use crate::values::Values;
use async_trait::async_trait;
use codefresh::{ClusterApi, RegisterRequest, ValidateRequest};
use tracing::info;

/// Docker daemon service and its certificates.
///
/// Installing registers the runtime environment with Codefresh and records
/// the issued server certificate and the runtime environment name in the
/// returned values.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeEnvironmentPlugin;

/// Names the docker daemon certificate must be valid for
pub fn subject_alt_names(namespace: &str) -> Vec<String> {
    vec![
        "IP:127.0.0.1".to_string(),
        "DNS:dind".to_string(),
        format!("DNS:*.dind.{namespace}"),
        format!("DNS:*.dind.{namespace}.svc"),
        "DNS:*.cf-cd.com".to_string(),
        "DNS:*.codefresh.io".to_string(),
    ]
}

#[async_trait]
impl Plugin for RuntimeEnvironmentPlugin {
    fn plugin_type(&self) -> PluginType {
        PluginType::RuntimeEnvironment
    }

    async fn install(&self, opt: &InstallOptions, mut values: Values) -> Result<Values> {
        if opt.dry_run {
            info!("Dry run, skipping runtime environment registration");
            install(opt, self.plugin_type(), &values).await?;
            return Ok(values);
        }

        let namespace = opt.target.namespace.clone();
        let api = ClusterApi::new(opt.codefresh.clone())?;
        api.validate(&ValidateRequest {
            cluster_name: opt.cluster_name.clone(),
            namespace: namespace.clone(),
        })
        .await?;

        let cert = api
            .sign(&opt.cluster_name, &subject_alt_names(&namespace))
            .await?;
        values.server_cert = Some(cert);

        ensure_namespace(opt).await?;
        install(opt, self.plugin_type(), &values).await?;

        let runtime_environment = api
            .register(&RegisterRequest {
                cluster_name: opt.cluster_name.clone(),
                namespace,
                storage_class_name: values.storage_class_name(),
                is_default_storage_class: values.uses_default_storage_class(),
                mark_as_default: opt.mark_as_default,
                agent: opt.register_with_agent,
                kubernetes_runner_type: opt.kubernetes_runner_type,
                runtime_environment_name: Some(values.runtime_environment.clone())
                    .filter(|name| !name.is_empty()),
            })
            .await?;
        values.runtime_environment = runtime_environment.metadata.name;
        Ok(values)
    }
}
