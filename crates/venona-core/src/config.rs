//! Runtime connection file shared by the installer and the agent
//!
//! `venonactl` writes it into the agent's secret, the agent reads it at
//! startup to know which clusters it may schedule work on.

use crate::error::{Result, VenonaError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Connection details for one runtime cluster
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RuntimeConfig {
    /// Kubernetes API server URL
    pub host: String,
    /// Bearer token for the API server
    pub token: String,
    /// PEM encoded CA certificate of the API server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crt: Option<String>,
    /// Namespace used when a task does not name one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RuntimesConfig {
    #[serde(default)]
    pub runtimes: BTreeMap<String, RuntimeConfig>,
}

impl RuntimesConfig {
    pub fn from_yaml(raw: &str) -> Result<Self> {
        let config: RuntimesConfig = serde_yaml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Reading runtimes configuration");
        let raw = std::fs::read_to_string(path).map_err(|source| VenonaError::ConfigRead {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&raw)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    fn validate(&self) -> Result<()> {
        if self.runtimes.is_empty() {
            return Err(VenonaError::InvalidConfig {
                reason: "no runtimes configured".to_string(),
            });
        }
        if let Some((name, _)) = self.runtimes.iter().find(|(_, rt)| rt.host.is_empty()) {
            return Err(VenonaError::InvalidConfig {
                reason: format!("runtime {name} has no host"),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
Runtimes:
  prod-cluster:
    Host: https://10.0.0.1
    Token: abc
    Crt: |
      -----BEGIN CERTIFICATE-----
      MIIB
      -----END CERTIFICATE-----
  dev-cluster:
    Host: https://10.0.0.2
    Token: def
    Namespace: builds
"#;

    #[test]
    fn test_parse_runtimes() {
        let config = RuntimesConfig::from_yaml(SAMPLE).unwrap();

        assert_eq!(config.runtimes.len(), 2);
        let prod = &config.runtimes["prod-cluster"];
        assert_eq!(prod.host, "https://10.0.0.1");
        assert!(prod.crt.as_deref().unwrap().contains("BEGIN CERTIFICATE"));
        assert_eq!(
            config.runtimes["dev-cluster"].namespace.as_deref(),
            Some("builds")
        );
    }

    #[test]
    fn test_empty_runtimes_rejected() {
        let err = RuntimesConfig::from_yaml("Runtimes: {}").unwrap_err();
        assert!(err.to_string().contains("no runtimes configured"));
    }

    #[test]
    fn test_runtime_without_host_rejected() {
        let err = RuntimesConfig::from_yaml("Runtimes:\n  a:\n    Host: ''\n    Token: t\n")
            .unwrap_err();
        assert!(err.to_string().contains("runtime a has no host"));
    }

    #[test]
    fn test_yaml_written_by_installer_reads_back() {
        let mut config = RuntimesConfig::default();
        config.runtimes.insert(
            "rt".to_string(),
            RuntimeConfig {
                host: "https://k8s".to_string(),
                token: "t".to_string(),
                crt: None,
                namespace: Some("ns".to_string()),
            },
        );

        let yaml = config.to_yaml().unwrap();
        assert!(yaml.contains("Runtimes:"));
        assert_eq!(RuntimesConfig::from_yaml(&yaml).unwrap(), config);
    }
}
