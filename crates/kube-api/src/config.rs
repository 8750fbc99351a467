//! Cluster connection settings from a kubeconfig file or the pod environment

use crate::error::{KubeError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::Url;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

const SERVICE_ACCOUNT_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";
const DEFAULT_NAMESPACE: &str = "default";

#[derive(Debug, Clone)]
pub struct KubeConfig {
    pub server: Url,
    /// Namespace used for objects that do not carry one
    pub namespace: String,
    pub token: Option<String>,
    pub ca_pem: Option<Vec<u8>>,
    /// Client certificate followed by its private key, PEM encoded
    pub identity_pem: Option<Vec<u8>>,
    pub insecure: bool,
}

impl KubeConfig {
    pub fn new(server: &str) -> Result<Self> {
        let server = Url::parse(server).map_err(|err| KubeError::Config {
            reason: format!("invalid server URL {server}: {err}"),
        })?;
        Ok(Self {
            server,
            namespace: DEFAULT_NAMESPACE.to_string(),
            token: None,
            ca_pem: None,
            identity_pem: None,
            insecure: false,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.token = (!token.is_empty()).then_some(token);
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_ca_pem(mut self, pem: impl Into<Vec<u8>>) -> Self {
        self.ca_pem = Some(pem.into());
        self
    }

    /// `$KUBECONFIG`, falling back to `~/.kube/config`
    pub fn default_path() -> Option<PathBuf> {
        std::env::var_os("KUBECONFIG")
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|home| home.join(".kube").join("config")))
    }

    /// Name of the context marked as current in the kubeconfig file
    pub fn current_context(path: &Path) -> Result<String> {
        let file = KubeconfigFile::load(path)?;
        file.current_context.ok_or_else(|| KubeError::Config {
            reason: format!("{} has no current-context", path.display()),
        })
    }

    /// Loads the given context, or the current one when `context` is `None`
    pub fn from_kubeconfig(path: &Path, context: Option<&str>) -> Result<Self> {
        let file = KubeconfigFile::load(path)?;
        let context_name = match context.filter(|name| !name.is_empty()) {
            Some(name) => name.to_string(),
            None => file.current_context.clone().ok_or_else(|| KubeError::Config {
                reason: format!("{} has no current-context", path.display()),
            })?,
        };
        debug!(context = %context_name, path = %path.display(), "Loading kubeconfig");

        let context = file
            .contexts
            .iter()
            .find(|entry| entry.name == context_name)
            .map(|entry| &entry.context)
            .ok_or_else(|| KubeError::Config {
                reason: format!("context {context_name} not found"),
            })?;
        let cluster = file
            .clusters
            .iter()
            .find(|entry| entry.name == context.cluster)
            .map(|entry| &entry.cluster)
            .ok_or_else(|| KubeError::Config {
                reason: format!("cluster {} not found", context.cluster),
            })?;
        let user = file
            .users
            .iter()
            .find(|entry| entry.name == context.user)
            .map(|entry| entry.user.clone())
            .unwrap_or_default();

        let mut config = Self::new(&cluster.server)?;
        config.insecure = cluster.insecure_skip_tls_verify;
        if let Some(namespace) = &context.namespace {
            config.namespace = namespace.clone();
        }
        config.ca_pem = match (&cluster.certificate_authority_data, &cluster.certificate_authority) {
            (Some(data), _) => Some(decode_base64("certificate-authority-data", data)?),
            (None, Some(file)) => Some(read_file(file)?),
            (None, None) => None,
        };
        config.token = match (user.token, user.token_file) {
            (Some(token), _) => Some(token),
            (None, Some(file)) => Some(String::from_utf8_lossy(&read_file(&file)?).trim().to_string()),
            (None, None) => None,
        };
        if let (Some(cert), Some(key)) = (&user.client_certificate_data, &user.client_key_data) {
            let mut identity = decode_base64("client-certificate-data", cert)?;
            identity.push(b'\n');
            identity.extend(decode_base64("client-key-data", key)?);
            config.identity_pem = Some(identity);
        }
        Ok(config)
    }

    /// Service account of the pod the process runs in
    pub fn in_cluster() -> Result<Self> {
        let host = std::env::var("KUBERNETES_SERVICE_HOST").map_err(|_| KubeError::Config {
            reason: "KUBERNETES_SERVICE_HOST is not set, not running in a cluster".to_string(),
        })?;
        let port = std::env::var("KUBERNETES_SERVICE_PORT").unwrap_or_else(|_| "443".to_string());
        let host = if host.contains(':') {
            format!("[{host}]")
        } else {
            host
        };

        let dir = Path::new(SERVICE_ACCOUNT_DIR);
        let token = String::from_utf8_lossy(&read_file(&dir.join("token"))?)
            .trim()
            .to_string();
        let namespace = read_file(&dir.join("namespace"))
            .map(|raw| String::from_utf8_lossy(&raw).trim().to_string())
            .unwrap_or_else(|_| DEFAULT_NAMESPACE.to_string());

        Ok(Self::new(&format!("https://{host}:{port}"))?
            .with_token(token)
            .with_namespace(namespace)
            .with_ca_pem(read_file(&dir.join("ca.crt"))?))
    }
}

fn decode_base64(field: &str, data: &str) -> Result<Vec<u8>> {
    STANDARD.decode(data.trim()).map_err(|err| KubeError::Config {
        reason: format!("{field} is not valid base64: {err}"),
    })
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|source| KubeError::Io {
        path: path.display().to_string(),
        source,
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct KubeconfigFile {
    #[serde(default)]
    clusters: Vec<NamedCluster>,
    #[serde(default)]
    users: Vec<NamedUser>,
    #[serde(default)]
    contexts: Vec<NamedContext>,
    #[serde(default)]
    current_context: Option<String>,
}

impl KubeconfigFile {
    fn load(path: &Path) -> Result<Self> {
        let raw = read_file(path)?;
        Ok(serde_yaml::from_slice(&raw)?)
    }
}

#[derive(Debug, Deserialize)]
struct NamedCluster {
    name: String,
    cluster: ClusterEntry,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ClusterEntry {
    server: String,
    #[serde(default)]
    certificate_authority_data: Option<String>,
    #[serde(default)]
    certificate_authority: Option<PathBuf>,
    #[serde(default)]
    insecure_skip_tls_verify: bool,
}

#[derive(Debug, Deserialize)]
struct NamedUser {
    name: String,
    #[serde(default)]
    user: UserEntry,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct UserEntry {
    #[serde(default)]
    token: Option<String>,
    #[serde(default, rename = "tokenFile")]
    token_file: Option<PathBuf>,
    #[serde(default)]
    client_certificate_data: Option<String>,
    #[serde(default)]
    client_key_data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NamedContext {
    name: String,
    context: ContextEntry,
}

#[derive(Debug, Deserialize)]
struct ContextEntry {
    cluster: String,
    #[serde(default)]
    user: String,
    #[serde(default)]
    namespace: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const KUBECONFIG: &str = r#"
apiVersion: v1
kind: Config
current-context: dev
clusters:
  - name: dev-cluster
    cluster:
      server: https://dev.example.com:6443
      certificate-authority-data: Q0FEQVRB
  - name: prod-cluster
    cluster:
      server: https://prod.example.com
      insecure-skip-tls-verify: true
users:
  - name: dev-user
    user:
      token: dev-token
  - name: prod-user
    user:
      client-certificate-data: Q0VSVA==
      client-key-data: S0VZ
contexts:
  - name: dev
    context:
      cluster: dev-cluster
      user: dev-user
      namespace: builds
  - name: prod
    context:
      cluster: prod-cluster
      user: prod-user
"#;

    fn write_kubeconfig() -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "venona-kubeconfig-{}-{:?}",
            std::process::id(),
            std::thread::current().id()
        ));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(KUBECONFIG.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_current_context_is_loaded_by_default() {
        let path = write_kubeconfig();

        let config = KubeConfig::from_kubeconfig(&path, None).unwrap();

        assert_eq!(config.server.as_str(), "https://dev.example.com:6443/");
        assert_eq!(config.namespace, "builds");
        assert_eq!(config.token.as_deref(), Some("dev-token"));
        assert_eq!(config.ca_pem.as_deref(), Some(b"CADATA".as_slice()));
        assert!(!config.insecure);
        assert_eq!(KubeConfig::current_context(&path).unwrap(), "dev");
    }

    #[test]
    fn test_named_context_with_client_certificate() {
        let path = write_kubeconfig();

        let config = KubeConfig::from_kubeconfig(&path, Some("prod")).unwrap();

        assert_eq!(config.namespace, "default");
        assert!(config.insecure);
        assert!(config.token.is_none());
        assert_eq!(config.identity_pem.as_deref(), Some(b"CERT\nKEY".as_slice()));
    }

    #[test]
    fn test_missing_context_is_a_config_error() {
        let path = write_kubeconfig();

        let err = KubeConfig::from_kubeconfig(&path, Some("staging")).unwrap_err();

        assert!(err.to_string().contains("context staging not found"));
    }

    #[test]
    fn test_empty_token_is_dropped() {
        let config = KubeConfig::new("https://k8s").unwrap().with_token("");
        assert!(config.token.is_none());
    }
}
