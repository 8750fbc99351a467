use crate::config::KubeConfig;
use crate::error::{KubeError, Result};
use crate::resource::ApiResource;
use reqwest::{Certificate, Identity, Method, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt;
use std::time::Duration;
use tracing::{debug, instrument};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Identifies one object in the cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    pub namespace: Option<String>,
}

impl ObjectRef {
    pub fn new(
        api_version: impl Into<String>,
        kind: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            api_version: api_version.into(),
            kind: kind.into(),
            name: name.into(),
            namespace: None,
        }
    }

    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        self.namespace = (!namespace.is_empty()).then_some(namespace);
        self
    }

    /// Reads `apiVersion`, `kind`, `metadata.name` and `metadata.namespace`
    pub fn from_object(object: &Value) -> Result<Self> {
        let field = |value: &Value, name: &str| -> Result<String> {
            value
                .as_str()
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .ok_or_else(|| KubeError::InvalidObject {
                    reason: format!("missing {name}"),
                })
        };
        let reference = Self::new(
            field(&object["apiVersion"], "apiVersion")?,
            field(&object["kind"], "kind")?,
            field(&object["metadata"]["name"], "metadata.name")?,
        );
        Ok(match object["metadata"]["namespace"].as_str() {
            Some(namespace) => reference.in_namespace(namespace),
            None => reference,
        })
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} \"{}\"", self.kind, self.name)
    }
}

#[derive(Debug, Deserialize, Default)]
struct StatusBody {
    #[serde(default)]
    reason: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Clone)]
pub struct KubeClient {
    base: reqwest::Url,
    namespace: String,
    token: Option<String>,
    http: reqwest::Client,
}

impl KubeClient {
    pub fn new(config: KubeConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .danger_accept_invalid_certs(config.insecure);
        if let Some(pem) = &config.ca_pem {
            builder = builder.add_root_certificate(Certificate::from_pem(pem)?);
        }
        if let Some(pem) = &config.identity_pem {
            builder = builder.identity(Identity::from_pem(pem)?);
        }
        Ok(Self {
            base: config.server,
            namespace: config.namespace,
            token: config.token,
            http: builder.build()?,
        })
    }

    /// Namespace used for objects that do not name one
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn server(&self) -> &str {
        self.base.as_str()
    }

    /// Creates `object`, in its own namespace when it has one, in `namespace` otherwise
    #[instrument(skip(self, object))]
    pub async fn create(&self, namespace: &str, object: &Value) -> Result<ObjectRef> {
        let target = ObjectRef::from_object(object)?;
        let resource = ApiResource::resolve(&target.api_version, &target.kind)?;
        let path = resource.path(self.resolve_namespace(namespace, &target), None);
        self.send(Method::POST, &path, Some(object), &target).await?;
        debug!(object = %target, "Created");
        Ok(target)
    }

    #[instrument(skip(self, target), fields(object = %target))]
    pub async fn get(&self, namespace: &str, target: &ObjectRef) -> Result<Value> {
        let resource = ApiResource::resolve(&target.api_version, &target.kind)?;
        let path = resource.path(self.resolve_namespace(namespace, target), Some(&target.name));
        self.send(Method::GET, &path, None, target).await
    }

    #[instrument(skip(self, target), fields(object = %target))]
    pub async fn delete(&self, namespace: &str, target: &ObjectRef) -> Result<()> {
        let resource = ApiResource::resolve(&target.api_version, &target.kind)?;
        let path = resource.path(self.resolve_namespace(namespace, target), Some(&target.name));
        let body = json!({ "kind": "DeleteOptions", "apiVersion": "v1", "propagationPolicy": "Background" });
        self.send(Method::DELETE, &path, Some(&body), target).await?;
        debug!("Deleted");
        Ok(())
    }

    /// Creates the namespace unless it is already there
    pub async fn ensure_namespace(&self, name: &str) -> Result<()> {
        let namespace = ObjectRef::new("v1", "Namespace", name);
        match self.get(name, &namespace).await {
            Ok(_) => Ok(()),
            Err(KubeError::NotFound { .. }) => {
                let object = json!({
                    "apiVersion": "v1",
                    "kind": "Namespace",
                    "metadata": { "name": name }
                });
                match self.create(name, &object).await {
                    Ok(_) => Ok(()),
                    Err(err) if err.is_already_exists() => Ok(()),
                    Err(err) => Err(err),
                }
            }
            Err(err) => Err(err),
        }
    }

    fn resolve_namespace<'a>(&'a self, namespace: &'a str, target: &'a ObjectRef) -> &'a str {
        target
            .namespace
            .as_deref()
            .or(Some(namespace).filter(|ns| !ns.is_empty()))
            .unwrap_or(self.namespace.as_str())
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        target: &ObjectRef,
    ) -> Result<Value> {
        // Keep any path prefix of the server, as with API servers behind a proxy
        let raw = format!("{}{}", self.base.as_str().trim_end_matches('/'), path);
        let url = reqwest::Url::parse(&raw).map_err(|err| KubeError::Config {
            reason: format!("cannot build URL {raw}: {err}"),
        })?;
        let mut request = self.http.request(method, url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let data = response.bytes().await?;
        if status.is_success() {
            if data.is_empty() {
                return Ok(Value::Null);
            }
            return Ok(serde_json::from_slice(&data)?);
        }

        let body: StatusBody = serde_json::from_slice(&data).unwrap_or_default();
        Err(match status {
            StatusCode::CONFLICT if body.reason.is_empty() || body.reason == "AlreadyExists" => {
                KubeError::AlreadyExists {
                    kind: target.kind.clone(),
                    name: target.name.clone(),
                }
            }
            StatusCode::NOT_FOUND => KubeError::NotFound {
                kind: target.kind.clone(),
                name: target.name.clone(),
            },
            _ => KubeError::Api {
                status: status.as_u16(),
                reason: body.reason,
                message: if body.message.is_empty() {
                    String::from_utf8_lossy(&data).into_owned()
                } else {
                    body.message
                },
            },
        })
    }
}
